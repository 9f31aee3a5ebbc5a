pub mod amd;
pub mod intel;
pub mod nvidia;

pub use amd::AmdProbe;
pub use intel::IntelProbe;
pub use nvidia::NvidiaProbe;

use log::{info, warn};
use serde::Serialize;
use std::path::Path;

/// One GPU reading. Each field is independently absent when the active
/// probe cannot supply it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GpuMetrics {
    pub usage_percent: Option<f64>,
    pub mem_used_mb: Option<f64>,
    pub power_draw_w: Option<f64>,
    pub temp_c: Option<f64>,
}

/// Vendor-specific GPU metrics source, bound to exactly one vendor at
/// detection time and never re-detected mid-run.
pub enum GpuProbe {
    Unsupported,
    Nvidia(NvidiaProbe),
    Amd(AmdProbe),
    Intel(IntelProbe),
}

impl GpuProbe {
    /// Inspect the host once and bind to the first matching vendor, in
    /// priority order NVIDIA, Intel, AMD. A vendor whose companion tool is
    /// missing falls through to the next candidate instead of erroring.
    pub fn detect() -> Self {
        if command_exists(nvidia::QUERY_TOOL) {
            info!("NVIDIA GPU detected");
            return GpuProbe::Nvidia(NvidiaProbe::new());
        }
        if Path::new(intel::I915_MODULE_PATH).exists() {
            if command_exists(intel::SAMPLING_TOOL) {
                info!("Intel GPU detected");
                return GpuProbe::Intel(IntelProbe::new());
            }
            warn!(
                "Intel GPU detected, but '{}' is not installed or not in PATH",
                intel::SAMPLING_TOOL
            );
        }
        if amd::is_amd_device(Path::new(amd::DEFAULT_DEVICE_PATH)) {
            info!(
                "AMD GPU detected, reading sysfs counters under {}",
                amd::DEFAULT_DEVICE_PATH
            );
            return GpuProbe::Amd(AmdProbe::new(amd::DEFAULT_DEVICE_PATH));
        }
        warn!("could not detect a supported GPU vendor, GPU metrics will be unavailable");
        GpuProbe::Unsupported
    }

    pub fn vendor(&self) -> &'static str {
        match self {
            GpuProbe::Unsupported => "unsupported",
            GpuProbe::Nvidia(_) => "nvidia",
            GpuProbe::Amd(_) => "amd",
            GpuProbe::Intel(_) => "intel",
        }
    }

    /// Read current values for the four GPU fields. Never fails: a probe
    /// that cannot read degrades to absent fields for this sample only.
    pub fn metrics(&mut self) -> GpuMetrics {
        match self {
            GpuProbe::Unsupported => GpuMetrics::default(),
            GpuProbe::Nvidia(probe) => probe.metrics(),
            GpuProbe::Amd(probe) => probe.metrics(),
            GpuProbe::Intel(probe) => probe.metrics(),
        }
    }
}

/// Check if a command is available by running `which`.
pub(crate) fn command_exists(name: &str) -> bool {
    std::process::Command::new("which")
        .arg(name)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_exists_finds_shell_builtins() {
        assert!(command_exists("sh"));
    }

    #[test]
    fn command_exists_rejects_missing_tools() {
        assert!(!command_exists("definitely-not-a-real-tool-4242"));
    }

    #[test]
    fn unsupported_probe_reports_all_fields_absent() {
        let mut probe = GpuProbe::Unsupported;
        assert_eq!(probe.metrics(), GpuMetrics::default());
        assert_eq!(probe.vendor(), "unsupported");
    }
}
