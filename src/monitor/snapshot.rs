use chrono::{DateTime, Local};
use serde::Serialize;

use crate::gpu::GpuMetrics;

/// One point-in-time reading of system and GPU metrics.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Local>,
    /// Seconds since sampling began, monotonic. Stamped by the sampler,
    /// not the collector.
    pub elapsed_seconds: f64,
    /// Last frame rate published by the output reader at capture time,
    /// 0.0 until the first reading arrives.
    pub fps: f64,
    pub cpu_total_percent: f64,
    pub cpu_load_avg_1m: f64,
    pub cpu_freq_mhz: Option<f64>,
    pub ram_percent: f64,
    /// Per-core utilization, in core-index order.
    pub cpu_per_core_percent: Vec<f64>,
    pub gpu: GpuMetrics,
}

/// Per-field arithmetic means over a batch of snapshots. A field with no
/// present value anywhere in the batch stays absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Averaged {
    pub elapsed_seconds: Option<f64>,
    pub fps: Option<f64>,
    pub cpu_total_usage_percent: Option<f64>,
    pub cpu_load_avg_1m: Option<f64>,
    pub cpu_freq_current_mhz: Option<f64>,
    pub ram_usage_percent: Option<f64>,
    pub gpu_usage_percent: Option<f64>,
    pub gpu_mem_used_mb: Option<f64>,
    pub gpu_power_draw_w: Option<f64>,
    pub gpu_temp_c: Option<f64>,
}

/// Reduce a batch of snapshots to per-field means. Absent values are
/// excluded from that field's mean, not counted as zero.
pub fn average(snapshots: &[Snapshot]) -> Averaged {
    Averaged {
        elapsed_seconds: mean(snapshots.iter().map(|s| Some(s.elapsed_seconds))),
        fps: mean(snapshots.iter().map(|s| Some(s.fps))),
        cpu_total_usage_percent: mean(snapshots.iter().map(|s| Some(s.cpu_total_percent))),
        cpu_load_avg_1m: mean(snapshots.iter().map(|s| Some(s.cpu_load_avg_1m))),
        cpu_freq_current_mhz: mean(snapshots.iter().map(|s| s.cpu_freq_mhz)),
        ram_usage_percent: mean(snapshots.iter().map(|s| Some(s.ram_percent))),
        gpu_usage_percent: mean(snapshots.iter().map(|s| s.gpu.usage_percent)),
        gpu_mem_used_mb: mean(snapshots.iter().map(|s| s.gpu.mem_used_mb)),
        gpu_power_draw_w: mean(snapshots.iter().map(|s| s.gpu.power_draw_w)),
        gpu_temp_c: mean(snapshots.iter().map(|s| s.gpu.temp_c)),
    }
}

/// Mean of the present values only; `None` when none are present.
fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0u32;
    for value in values.flatten() {
        sum += value;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Back-fill zero fps samples from the last strictly positive reading.
/// Frame-rate reporting often starts or resumes late; the tail-most known
/// value is the best retroactive estimate for the gaps.
pub fn backfill_fps(snapshots: &mut [Snapshot]) {
    let last_valid = snapshots
        .iter()
        .rev()
        .map(|snap| snap.fps)
        .find(|fps| *fps > 0.0);
    if let Some(fps) = last_valid {
        for snap in snapshots.iter_mut().filter(|snap| snap.fps == 0.0) {
            snap.fps = fps;
        }
    }
}
