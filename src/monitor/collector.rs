use chrono::Local;
use std::thread;
use sysinfo::System;

use crate::gpu::GpuProbe;

use super::Snapshot;

/// Builds one snapshot from instantaneous CPU/RAM readings plus the bound
/// GPU probe.
pub struct SnapshotCollector {
    system: System,
    probe: GpuProbe,
}

impl SnapshotCollector {
    pub fn new(probe: GpuProbe) -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();
        Self { system, probe }
    }

    /// Capture one snapshot. CPU usage is computed over the window between
    /// two refreshes, so a priming refresh is taken and discarded before
    /// the reported one. `elapsed_seconds` and `fps` are stamped by the
    /// caller; the collector has no notion of session time or live fps.
    pub fn capture(&mut self) -> Snapshot {
        self.system.refresh_cpu();
        thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        self.system.refresh_cpu();
        self.system.refresh_memory();

        let cpus = self.system.cpus();
        let cpu_per_core_percent: Vec<f64> = cpus.iter().map(|cpu| cpu.cpu_usage() as f64).collect();
        let cpu_total_percent = self.system.global_cpu_info().cpu_usage() as f64;

        // Cores that report 0 MHz do not know their frequency.
        let frequencies: Vec<u64> = cpus
            .iter()
            .map(|cpu| cpu.frequency())
            .filter(|mhz| *mhz > 0)
            .collect();
        let cpu_freq_mhz = if frequencies.is_empty() {
            None
        } else {
            Some(frequencies.iter().sum::<u64>() as f64 / frequencies.len() as f64)
        };

        let total_memory = self.system.total_memory();
        let ram_percent = if total_memory > 0 {
            self.system.used_memory() as f64 / total_memory as f64 * 100.0
        } else {
            0.0
        };

        Snapshot {
            timestamp: Local::now(),
            elapsed_seconds: 0.0,
            fps: 0.0,
            cpu_total_percent,
            cpu_load_avg_1m: System::load_average().one,
            cpu_freq_mhz,
            ram_percent,
            cpu_per_core_percent,
            gpu: self.probe.metrics(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_reads_one_value_per_core() {
        let mut collector = SnapshotCollector::new(GpuProbe::Unsupported);
        let snap = collector.capture();
        assert!(!snap.cpu_per_core_percent.is_empty());
        assert!(snap.ram_percent >= 0.0 && snap.ram_percent <= 100.0);
        assert_eq!(snap.elapsed_seconds, 0.0);
        assert_eq!(snap.fps, 0.0);
    }

    #[test]
    fn unsupported_probe_leaves_gpu_fields_absent() {
        let mut collector = SnapshotCollector::new(GpuProbe::Unsupported);
        let snap = collector.capture();
        assert_eq!(snap.gpu.usage_percent, None);
        assert_eq!(snap.gpu.mem_used_mb, None);
        assert_eq!(snap.gpu.power_draw_w, None);
        assert_eq!(snap.gpu.temp_c, None);
    }

    #[test]
    fn failing_probe_degrades_to_absent_fields_without_panicking() {
        let probe = GpuProbe::Amd(crate::gpu::AmdProbe::new("/nonexistent/card9/device"));
        let mut collector = SnapshotCollector::new(probe);
        let snap = collector.capture();
        assert_eq!(snap.gpu.usage_percent, None);
        assert_eq!(snap.gpu.temp_c, None);
    }
}
