use log::warn;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::GpuMetrics;

pub(crate) const DEFAULT_DEVICE_PATH: &str = "/sys/class/drm/card0/device";

/// PCI vendor id assigned to AMD/ATI.
const AMD_PCI_VENDOR: &str = "0x1002";

const BUSY_PERCENT: &str = "gpu_busy_percent";
const VRAM_USED: &str = "mem_info_vram_used";
const POWER_AVERAGE: &str = "power1_average";
const TEMP_INPUT: &str = "temp1_input";

/// Check whether the card under `device_path` is an AMD device.
pub(crate) fn is_amd_device(device_path: &Path) -> bool {
    fs::read_to_string(device_path.join("vendor"))
        .map(|vendor| vendor.trim() == AMD_PCI_VENDOR)
        .unwrap_or(false)
}

/// Reads AMD GPU counters directly from sysfs.
///
/// A missing or unreadable counter file yields an absent field for that
/// sample only, warned once per counter to avoid log spam.
pub struct AmdProbe {
    device_path: PathBuf,
    warned: HashSet<&'static str>,
}

impl AmdProbe {
    pub fn new(device_path: impl Into<PathBuf>) -> Self {
        Self {
            device_path: device_path.into(),
            warned: HashSet::new(),
        }
    }

    pub fn metrics(&mut self) -> GpuMetrics {
        let busy_percent = self.read_counter(BUSY_PERCENT);
        let vram_bytes = self.read_counter(VRAM_USED);
        let power_microwatts = self.read_counter(POWER_AVERAGE);
        let temp_millidegrees = match self.temp_input_path() {
            Some(path) => self.read_file(TEMP_INPUT, &path),
            None => None,
        };

        GpuMetrics {
            usage_percent: busy_percent,
            mem_used_mb: vram_bytes.map(|bytes| bytes / (1024.0 * 1024.0)),
            power_draw_w: power_microwatts.map(|uw| uw / 1_000_000.0),
            temp_c: temp_millidegrees.map(|mc| mc / 1000.0),
        }
    }

    fn read_counter(&mut self, name: &'static str) -> Option<f64> {
        let path = self.device_path.join(name);
        self.read_file(name, &path)
    }

    fn read_file(&mut self, name: &'static str, path: &Path) -> Option<f64> {
        match fs::read_to_string(path) {
            Ok(raw) => raw.trim().parse().ok(),
            Err(err) => {
                if self.warned.insert(name) {
                    warn!("could not read AMD sysfs file {:?}: {}", path, err);
                }
                None
            }
        }
    }

    /// Resolve `hwmon/hwmon*/temp1_input` under the device path. The hwmon
    /// index is not stable across boots, so it is looked up per sample.
    fn temp_input_path(&self) -> Option<PathBuf> {
        let entries = fs::read_dir(self.device_path.join("hwmon")).ok()?;
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("hwmon"))
            .map(|entry| entry.path().join(TEMP_INPUT))
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }
}
