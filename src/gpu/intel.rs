use log::debug;
use std::process::Command;

use super::GpuMetrics;

pub(crate) const SAMPLING_TOOL: &str = "intel_gpu_top";
pub(crate) const I915_MODULE_PATH: &str = "/sys/module/i915";

const RENDER_ROW: &str = "Render/3D";

/// Samples the renderer-engine busy percent via `intel_gpu_top` over a
/// short fixed window. The tool does not expose memory, power, or
/// temperature in this mode, so those fields are always absent.
#[derive(Debug, Default)]
pub struct IntelProbe;

impl IntelProbe {
    pub fn new() -> Self {
        Self
    }

    pub fn metrics(&mut self) -> GpuMetrics {
        // One 100 ms sample, table output to stdout.
        let output = match Command::new(SAMPLING_TOOL)
            .args(["-s", "100", "-n", "1", "-o", "-"])
            .output()
        {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!("{} exited with {}", SAMPLING_TOOL, output.status);
                return GpuMetrics::default();
            }
            Err(err) => {
                debug!("failed to run {}: {}", SAMPLING_TOOL, err);
                return GpuMetrics::default();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        GpuMetrics {
            usage_percent: parse_render_busy(&stdout),
            ..GpuMetrics::default()
        }
    }
}

/// Find the `Render/3D` row in the tool's table output and take the busy
/// percent two tokens after the row label.
fn parse_render_busy(report: &str) -> Option<f64> {
    for line in report.lines() {
        if !line.contains(RENDER_ROW) {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if let Some(idx) = parts.iter().position(|part| *part == RENDER_ROW) {
            if let Some(token) = parts.get(idx + 2) {
                if let Ok(value) = token.trim_end_matches('%').parse() {
                    return Some(value);
                }
            }
        }
    }
    None
}
