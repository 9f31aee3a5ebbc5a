use log::{info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::OutputFormat;
use crate::monitor::{Averaged, Snapshot};

/// Column order is the writer contract; downstream tooling indexes by
/// position.
pub const CSV_HEADERS: [&str; 12] = [
    "timestamp",
    "elapsed_time_s",
    "fps",
    "cpu_total_usage_percent",
    "cpu_load_avg_1m",
    "cpu_freq_current_mhz",
    "ram_usage_percent",
    "cpu_per_core_usage_percent",
    "gpu_usage_percent",
    "gpu_mem_used_mb",
    "gpu_power_draw_w",
    "gpu_temp_c",
];

/// Write the collected time series. An empty series produces no file.
pub fn write_series(
    path: &Path,
    format: OutputFormat,
    snapshots: &[Snapshot],
) -> std::io::Result<()> {
    if snapshots.is_empty() {
        warn!("no data collected, {:?} not written", path);
        return Ok(());
    }
    info!("writing {} data points to {:?}", snapshots.len(), path);
    match format {
        OutputFormat::Csv => write_csv(path, snapshots),
        OutputFormat::Json => write_json(path, snapshots),
    }
}

fn write_csv(path: &Path, snapshots: &[Snapshot]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", CSV_HEADERS.join(","))?;
    for snap in snapshots {
        writeln!(out, "{}", csv_row(snap))?;
    }
    out.flush()
}

fn write_json(path: &Path, snapshots: &[Snapshot]) -> std::io::Result<()> {
    let out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(out, snapshots).map_err(std::io::Error::from)
}

fn csv_row(snap: &Snapshot) -> String {
    let per_core = snap
        .cpu_per_core_percent
        .iter()
        .map(|core| core.to_string())
        .collect::<Vec<_>>()
        .join(",");

    [
        snap.timestamp.to_rfc3339(),
        snap.elapsed_seconds.to_string(),
        snap.fps.to_string(),
        snap.cpu_total_percent.to_string(),
        snap.cpu_load_avg_1m.to_string(),
        format_absent(snap.cpu_freq_mhz),
        snap.ram_percent.to_string(),
        // The per-core list holds commas, so the cell is quoted.
        format!("\"{}\"", per_core),
        format_absent(snap.gpu.usage_percent),
        format_absent(snap.gpu.mem_used_mb),
        format_absent(snap.gpu.power_draw_w),
        format_absent(snap.gpu.temp_c),
    ]
    .join(",")
}

/// Absent values serialize as empty cells, never as zero.
fn format_absent(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Print the before/after comparison table for the metrics worth
/// eyeballing after a run.
pub fn print_summary(before: &Averaged, after: &Averaged) {
    println!();
    println!(
        "{:<25} | {:>10} | {:>10} | {:>10}",
        "Metric", "Before", "After", "Delta"
    );
    println!("{}", "-".repeat(65));

    let rows = [
        ("gpu_mem_used_mb", before.gpu_mem_used_mb, after.gpu_mem_used_mb),
        ("gpu_power_draw_w", before.gpu_power_draw_w, after.gpu_power_draw_w),
        ("gpu_temp_c", before.gpu_temp_c, after.gpu_temp_c),
        ("ram_usage_percent", before.ram_usage_percent, after.ram_usage_percent),
        ("cpu_load_avg_1m", before.cpu_load_avg_1m, after.cpu_load_avg_1m),
    ];

    for (name, before_value, after_value) in rows {
        let delta = match (before_value, after_value) {
            (Some(b), Some(a)) => format!("{:+.3}", a - b),
            _ => "N/A".to_string(),
        };
        println!(
            "{:<25} | {:>10} | {:>10} | {:>10}",
            name,
            format_cell(before_value),
            format_cell(after_value),
            delta
        );
    }
    println!("{}", "-".repeat(65));
}

fn format_cell(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.3}", v))
        .unwrap_or_else(|| "N/A".to_string())
}
