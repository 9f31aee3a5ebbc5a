use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

mod config;
mod gpu;
mod monitor;
mod report;
mod session;

use config::{Config, OutputFormat};
use gpu::GpuProbe;
use monitor::SnapshotCollector;
use session::Outcome;

#[derive(Parser)]
#[command(name = "replay-bench")]
#[command(about = "Monitor CPU/RAM/GPU metrics and live FPS while replaying a graphics trace", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a trace and record system metrics alongside it
    Run {
        /// Path to the trace file to replay
        #[arg(short = 't', long)]
        trace_file: PathBuf,

        /// Output file for the collected time series
        #[arg(short = 'o', long, default_value = "performance_metrics.csv")]
        output_file: PathBuf,

        /// Output format: csv or json
        #[arg(long, default_value = "csv")]
        format: String,

        /// Sampling interval in seconds
        #[arg(short = 'i', long, default_value_t = 0.5)]
        interval: f64,

        /// Number of samples averaged for the cold-start baseline
        #[arg(long, default_value_t = 10)]
        cold_start_samples: usize,

        /// Delay between baseline samples in seconds (defaults to the
        /// sampling interval)
        #[arg(long)]
        baseline_delay: Option<f64>,

        /// Replay executable
        #[arg(long, default_value = "glretrace")]
        replay_bin: PathBuf,
    },
    /// Show the detected GPU vendor and a single system snapshot
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            trace_file,
            output_file,
            format,
            interval,
            cold_start_samples,
            baseline_delay,
            replay_bin,
        } => {
            anyhow::ensure!(
                interval.is_finite() && interval > 0.0,
                "Sampling interval must be a positive number of seconds"
            );
            anyhow::ensure!(
                cold_start_samples >= 1,
                "At least one cold-start sample is required"
            );
            anyhow::ensure!(
                trace_file.exists(),
                "Trace file not found at {:?}",
                trace_file
            );
            anyhow::ensure!(
                replay_available(&replay_bin),
                "Replay executable {:?} not found. Make sure it is in your PATH",
                replay_bin
            );

            let config = Config {
                replay_args: vec![
                    "-b".to_string(),
                    trace_file.to_string_lossy().into_owned(),
                ],
                replay_bin,
                interval: Duration::from_secs_f64(interval),
                baseline_samples: cold_start_samples,
                baseline_delay: Duration::from_secs_f64(baseline_delay.unwrap_or(interval)),
                output_file,
                format: format.parse::<OutputFormat>()?,
            };

            println!("Replaying trace...");
            println!("Command: {}", config.command_line());
            println!("Interval: {}s", interval);
            println!("Baseline samples: {}", cold_start_samples);

            run_session(config).await
        }
        Commands::Info => show_info(),
    }
}

/// The replay binary may be a bare command name (resolved via PATH) or an
/// explicit path.
fn replay_available(replay_bin: &std::path::Path) -> bool {
    if replay_bin.components().count() > 1 {
        return replay_bin.exists();
    }
    gpu::command_exists(&replay_bin.to_string_lossy())
}

async fn run_session(config: Config) -> anyhow::Result<()> {
    let report = session::run(&config).await?;

    // Write and summarize whatever was collected before surfacing a
    // failed outcome.
    let write_result = report::write_series(&config.output_file, config.format, &report.snapshots)
        .with_context(|| format!("Failed to write results to {:?}", config.output_file));
    report::print_summary(&report.before, &report.after);
    write_result?;

    match report.outcome {
        Outcome::Success => {
            println!("Replay finished successfully.");
            Ok(())
        }
        Outcome::ReplayFailed(code) => anyhow::bail!(
            "Replay process failed (exit code {})",
            code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
        ),
        Outcome::Interrupted => anyhow::bail!("Session interrupted by user"),
    }
}

fn show_info() -> anyhow::Result<()> {
    let probe = GpuProbe::detect();
    println!("GPU vendor: {}", probe.vendor());

    let mut collector = SnapshotCollector::new(probe);
    let snap = collector.capture();
    println!("CPU total: {:.1}%", snap.cpu_total_percent);
    println!("Cores: {}", snap.cpu_per_core_percent.len());
    println!("Load avg (1m): {:.2}", snap.cpu_load_avg_1m);
    if let Some(freq) = snap.cpu_freq_mhz {
        println!("CPU freq: {:.0} MHz", freq);
    }
    println!("RAM usage: {:.1}%", snap.ram_percent);
    if let Some(usage) = snap.gpu.usage_percent {
        println!("GPU usage: {:.1}%", usage);
    }
    if let Some(mem) = snap.gpu.mem_used_mb {
        println!("GPU memory used: {:.0} MB", mem);
    }

    Ok(())
}
