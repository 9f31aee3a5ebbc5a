pub mod collector;
pub mod sampler;
pub mod snapshot;

pub use collector::SnapshotCollector;
pub use sampler::{FpsSink, Sampler};
pub use snapshot::{average, backfill_fps, Averaged, Snapshot};
