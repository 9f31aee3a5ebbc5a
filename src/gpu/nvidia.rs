use log::debug;
use std::process::Command;

use super::GpuMetrics;

pub(crate) const QUERY_TOOL: &str = "nvidia-smi";

const QUERY_ARGS: [&str; 2] = [
    "--query-gpu=utilization.gpu,memory.used,power.draw,temperature.gpu",
    "--format=csv,noheader,nounits",
];

/// Reads NVIDIA GPU metrics by invoking `nvidia-smi` once per sample.
#[derive(Debug, Default)]
pub struct NvidiaProbe;

impl NvidiaProbe {
    pub fn new() -> Self {
        Self
    }

    pub fn metrics(&mut self) -> GpuMetrics {
        let output = match Command::new(QUERY_TOOL).args(QUERY_ARGS).output() {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!("{} exited with {}", QUERY_TOOL, output.status);
                return GpuMetrics::default();
            }
            Err(err) => {
                debug!("failed to run {}: {}", QUERY_TOOL, err);
                return GpuMetrics::default();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_query_line(stdout.lines().next().unwrap_or(""))
    }
}

/// Parse one `csv,noheader,nounits` line into the four GPU fields. A field
/// reported as `N/A` becomes absent rather than zero.
fn parse_query_line(line: &str) -> GpuMetrics {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 4 {
        debug!("unexpected {} output: {:?}", QUERY_TOOL, line);
        return GpuMetrics::default();
    }

    GpuMetrics {
        usage_percent: parse_field(fields[0]),
        mem_used_mb: parse_field(fields[1]),
        power_draw_w: parse_field(fields[2]),
        temp_c: parse_field(fields[3]),
    }
}

fn parse_field(raw: &str) -> Option<f64> {
    if raw.contains("N/A") {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_query_line() {
        let metrics = parse_query_line("45, 1024, 35.50, 61");
        assert_eq!(metrics.usage_percent, Some(45.0));
        assert_eq!(metrics.mem_used_mb, Some(1024.0));
        assert_eq!(metrics.power_draw_w, Some(35.5));
        assert_eq!(metrics.temp_c, Some(61.0));
    }

    #[test]
    fn not_applicable_fields_become_absent() {
        let metrics = parse_query_line("45, 1024, [N/A], 61");
        assert_eq!(metrics.power_draw_w, None);
        assert_eq!(metrics.usage_percent, Some(45.0));
    }

    #[test]
    fn short_or_garbage_lines_degrade_to_all_absent() {
        assert_eq!(parse_query_line("45, 1024"), GpuMetrics::default());
        assert_eq!(
            parse_query_line(""),
            GpuMetrics::default()
        );
    }

    #[test]
    fn unparsable_fields_are_absent_without_poisoning_the_rest() {
        let metrics = parse_query_line("oops, 1024, 35.5, 61");
        assert_eq!(metrics.usage_percent, None);
        assert_eq!(metrics.mem_used_mb, Some(1024.0));
    }
}
