use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Resolved settings for one monitored replay session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Replay executable, e.g. `glretrace`.
    pub replay_bin: PathBuf,
    /// Arguments handed to the replay executable.
    pub replay_args: Vec<String>,
    /// Cadence of the background sampling loop.
    pub interval: Duration,
    /// Snapshots averaged into the cold-start baseline.
    pub baseline_samples: usize,
    /// Delay between baseline samples.
    pub baseline_delay: Duration,
    /// Where the time series is written.
    pub output_file: PathBuf,
    pub format: OutputFormat,
}

impl Config {
    /// Human-readable command line, for logs and errors.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.replay_bin.display().to_string()];
        parts.extend(self.replay_args.iter().cloned());
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow::anyhow!(
                "Invalid output format: {}. Valid options: csv, json",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_joins_binary_and_args() {
        let config = Config {
            replay_bin: PathBuf::from("glretrace"),
            replay_args: vec!["-b".to_string(), "demo.trace".to_string()],
            interval: Duration::from_millis(500),
            baseline_samples: 10,
            baseline_delay: Duration::from_millis(500),
            output_file: PathBuf::from("performance_metrics.csv"),
            format: OutputFormat::Csv,
        };
        assert_eq!(config.command_line(), "glretrace -b demo.trace");
    }

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
