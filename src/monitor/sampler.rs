use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{Snapshot, SnapshotCollector};

/// State shared between the sampling loop and the fps publisher.
struct Shared {
    fps: Mutex<f64>,
    running: AtomicBool,
}

/// Cloneable handle the output reader uses to publish frame-rate values
/// into the sampler without holding the sampler itself.
#[derive(Clone)]
pub struct FpsSink {
    shared: Arc<Shared>,
}

impl FpsSink {
    pub fn update(&self, fps: f64) {
        *self.shared.fps.lock().unwrap() = fps;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running,
    Stopped,
}

/// Background periodic sampler producing a time series of snapshots.
///
/// Lifecycle is Idle -> Running -> Stopped, one transition each. The loop
/// runs on a dedicated thread; `stop()` joins it before returning, so no
/// snapshot is appended once `stop()` has returned.
pub struct Sampler {
    interval: Duration,
    shared: Arc<Shared>,
    collector: Arc<Mutex<SnapshotCollector>>,
    worker: Option<JoinHandle<Vec<Snapshot>>>,
    snapshots: Vec<Snapshot>,
    state: State,
}

impl Sampler {
    pub fn new(interval: Duration, collector: SnapshotCollector) -> Self {
        Self {
            interval,
            shared: Arc::new(Shared {
                fps: Mutex::new(0.0),
                running: AtomicBool::new(false),
            }),
            collector: Arc::new(Mutex::new(collector)),
            worker: None,
            snapshots: Vec::new(),
            state: State::Idle,
        }
    }

    pub fn fps_sink(&self) -> FpsSink {
        FpsSink {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Thread-safe setter for the current fps value. Valid in any state:
    /// before `start()` the value is buffered, after `stop()` it is
    /// accepted but never observed.
    pub fn update_fps(&self, fps: f64) {
        *self.shared.fps.lock().unwrap() = fps;
    }

    /// On-demand single capture outside the periodic loop, used for
    /// baseline sampling while the sampler is still idle.
    pub fn get_snapshot(&self) -> Snapshot {
        let mut snap = self.collector.lock().unwrap().capture();
        snap.fps = *self.shared.fps.lock().unwrap();
        snap
    }

    /// Start the periodic loop on a dedicated thread. No-op unless idle.
    pub fn start(&mut self) {
        if self.state != State::Idle {
            return;
        }
        info!("starting system sampler with a {:?} interval", self.interval);
        self.shared.running.store(true, Ordering::Relaxed);

        let shared = Arc::clone(&self.shared);
        let collector = Arc::clone(&self.collector);
        let interval = self.interval;
        self.worker = Some(thread::spawn(move || sample_loop(shared, collector, interval)));
        self.state = State::Running;
    }

    /// Signal the loop to exit and block until its thread has been joined.
    /// No-op unless running.
    pub fn stop(&mut self) {
        if self.state != State::Running {
            return;
        }
        info!("stopping system sampler");
        self.shared.running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(rows) => self.snapshots = rows,
                Err(_) => warn!("sampler thread panicked, collected snapshots were lost"),
            }
        }
        self.state = State::Stopped;
    }

    /// Snapshots collected by the loop. Stable once `stop()` has returned.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn into_snapshots(self) -> Vec<Snapshot> {
        self.snapshots
    }
}

fn sample_loop(
    shared: Arc<Shared>,
    collector: Arc<Mutex<SnapshotCollector>>,
    interval: Duration,
) -> Vec<Snapshot> {
    let mut rows = Vec::new();
    let session_start = Instant::now();

    while shared.running.load(Ordering::Relaxed) {
        let cycle_start = Instant::now();

        let mut snap = collector.lock().unwrap().capture();
        snap.elapsed_seconds = round4(cycle_start.duration_since(session_start).as_secs_f64());
        snap.fps = *shared.fps.lock().unwrap();
        rows.push(snap);

        // Best-effort cadence: an overlong cycle starts the next one
        // immediately, with no catch-up beyond that.
        if let Some(remaining) = interval.checked_sub(cycle_start.elapsed()) {
            thread::sleep(remaining);
        }
    }

    rows
}

fn round4(seconds: f64) -> f64 {
    (seconds * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuProbe;
    use std::time::Duration;

    fn test_sampler(interval_ms: u64) -> Sampler {
        Sampler::new(
            Duration::from_millis(interval_ms),
            SnapshotCollector::new(GpuProbe::Unsupported),
        )
    }

    #[test]
    fn fps_published_before_start_is_visible_in_the_first_snapshot() {
        let mut sampler = test_sampler(10);
        sampler.update_fps(42.0);
        sampler.start();
        thread::sleep(Duration::from_millis(700));
        sampler.stop();

        let rows = sampler.snapshots();
        assert!(!rows.is_empty());
        assert_eq!(rows[0].fps, 42.0);
    }

    #[test]
    fn elapsed_seconds_is_non_decreasing() {
        let mut sampler = test_sampler(10);
        sampler.start();
        thread::sleep(Duration::from_millis(900));
        sampler.stop();

        let rows = sampler.snapshots();
        assert!(rows.len() >= 2);
        assert!(rows.windows(2).all(|w| w[0].elapsed_seconds <= w[1].elapsed_seconds));
    }

    #[test]
    fn no_snapshot_is_appended_after_stop_returns() {
        let mut sampler = test_sampler(1);
        sampler.start();
        thread::sleep(Duration::from_millis(500));
        sampler.stop();

        let len_after_stop = sampler.snapshots().len();
        thread::sleep(Duration::from_millis(500));
        assert_eq!(sampler.snapshots().len(), len_after_stop);
    }

    #[test]
    fn start_and_stop_are_safe_to_call_twice() {
        let mut sampler = test_sampler(10);
        sampler.start();
        sampler.start();
        thread::sleep(Duration::from_millis(400));
        sampler.stop();
        let len = sampler.snapshots().len();
        sampler.stop();
        assert_eq!(sampler.snapshots().len(), len);
    }

    #[test]
    fn get_snapshot_works_while_idle_and_reads_the_buffered_fps() {
        let sampler = test_sampler(10);
        sampler.update_fps(7.5);
        let snap = sampler.get_snapshot();
        assert_eq!(snap.fps, 7.5);
        assert_eq!(snap.elapsed_seconds, 0.0);
    }

    #[test]
    fn update_fps_after_stop_is_accepted() {
        let mut sampler = test_sampler(10);
        sampler.start();
        thread::sleep(Duration::from_millis(300));
        sampler.stop();
        sampler.update_fps(99.0);
        assert!(sampler.snapshots().iter().all(|snap| snap.fps != 99.0));
    }
}
