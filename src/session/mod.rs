pub mod reader;

use log::{debug, info, warn};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::config::Config;
use crate::gpu::GpuProbe;
use crate::monitor::{average, backfill_fps, Averaged, Sampler, Snapshot, SnapshotCollector};

use reader::{pump_lines, FpsParser};

/// How long to wait for the replay process after a termination request.
const KILL_WAIT: Duration = Duration::from_secs(2);
/// How long to wait for an output reader before abandoning it.
const READER_JOIN: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to launch '{command}': {source}")]
    Launch {
        command: String,
        source: std::io::Error,
    },
    #[error("failed waiting for the replay process: {0}")]
    Wait(#[from] std::io::Error),
}

/// How the monitored run ended. Anything collected is reported either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The replay process exited non-zero.
    ReplayFailed(Option<i32>),
    /// The user cancelled the session.
    Interrupted,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Everything one session produced, ready for the writer and the summary.
pub struct SessionReport {
    pub before: Averaged,
    pub after: Averaged,
    pub snapshots: Vec<Snapshot>,
    pub outcome: Outcome,
}

/// Run one full monitored replay session: cold-start baseline, replay with
/// concurrent sampling and fps extraction, gap repair, post-run reduction.
pub async fn run(config: &Config) -> Result<SessionReport, SessionError> {
    let probe = GpuProbe::detect();
    let mut sampler = Sampler::new(config.interval, SnapshotCollector::new(probe));

    let before = baseline(&sampler, config).await;

    let command_line = config.command_line();
    info!("executing: {}", command_line);
    let mut child = Command::new(&config.replay_bin)
        .args(&config.replay_args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SessionError::Launch {
            command: command_line,
            source,
        })?;

    sampler.start();

    let parser = FpsParser::new();
    let mut readers = Vec::new();
    if let Some(stream) = child.stdout.take() {
        readers.push(tokio::spawn(pump_lines(
            stream,
            "replay",
            parser.clone(),
            sampler.fps_sink(),
        )));
    }
    if let Some(stream) = child.stderr.take() {
        readers.push(tokio::spawn(pump_lines(
            stream,
            "replay:err",
            parser.clone(),
            sampler.fps_sink(),
        )));
    }

    let outcome = wait_for_exit(&mut child).await?;

    sampler.stop();
    for handle in readers {
        // A hung reader must not hang the session; abandon it after the
        // grace period.
        if timeout(READER_JOIN, handle).await.is_err() {
            warn!("output reader did not finish within {:?}, abandoning it", READER_JOIN);
        }
    }

    let mut snapshots = sampler.into_snapshots();
    backfill_fps(&mut snapshots);
    let after = average(&snapshots);

    Ok(SessionReport {
        before,
        after,
        snapshots,
        outcome,
    })
}

/// Average several on-demand snapshots into a stable cold-start baseline,
/// before the periodic loop or the replay process exist.
async fn baseline(sampler: &Sampler, config: &Config) -> Averaged {
    info!(
        "collecting {} samples for a stable baseline",
        config.baseline_samples
    );
    let mut rows = Vec::with_capacity(config.baseline_samples);
    for n in 0..config.baseline_samples {
        debug!("baseline sample {}/{}", n + 1, config.baseline_samples);
        rows.push(sampler.get_snapshot());
        tokio::time::sleep(config.baseline_delay).await;
    }
    average(&rows)
}

/// Wait for the replay process to exit, honoring user cancellation: on
/// ctrl-c, request termination, give the process a bounded window to die,
/// and proceed to teardown regardless.
async fn wait_for_exit(child: &mut Child) -> Result<Outcome, SessionError> {
    tokio::select! {
        status = child.wait() => {
            let status = status?;
            Ok(exit_outcome(status))
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, terminating the replay process");
            if let Err(err) = child.start_kill() {
                warn!("failed to terminate the replay process: {}", err);
            }
            match timeout(KILL_WAIT, child.wait()).await {
                Ok(Ok(status)) => debug!("replay process exited with {} after termination", status),
                Ok(Err(err)) => warn!("failed waiting for the terminated replay process: {}", err),
                Err(_) => warn!("replay process did not exit within {:?}", KILL_WAIT),
            }
            Ok(Outcome::Interrupted)
        }
    }
}

fn exit_outcome(status: ExitStatus) -> Outcome {
    if status.success() {
        Outcome::Success
    } else {
        warn!("replay process finished with {}", status);
        Outcome::ReplayFailed(status.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use std::path::PathBuf;

    fn shell_config(script: &str) -> Config {
        Config {
            replay_bin: PathBuf::from("sh"),
            replay_args: vec!["-c".to_string(), script.to_string()],
            interval: Duration::from_millis(500),
            baseline_samples: 3,
            baseline_delay: Duration::from_millis(50),
            output_file: PathBuf::from("unused.csv"),
            format: OutputFormat::Csv,
        }
    }

    #[tokio::test]
    async fn session_collects_fps_from_the_live_output() {
        let config = shell_config(
            "echo '12.0 fps'; sleep 0.7; echo 'garbage'; sleep 0.7; echo '15.5 fps'; sleep 0.8",
        );
        let report = run(&config).await.expect("session runs");

        assert!(report.outcome.is_success());
        assert!(!report.snapshots.is_empty());
        assert!(report
            .snapshots
            .windows(2)
            .all(|w| w[0].elapsed_seconds <= w[1].elapsed_seconds));

        let first_low = report.snapshots.iter().position(|s| s.fps == 12.0);
        let first_high = report.snapshots.iter().position(|s| s.fps == 15.5);
        assert!(first_low.is_some(), "expected a snapshot at 12.0 fps");
        assert!(first_high.is_some(), "expected a snapshot at 15.5 fps");
        assert!(first_low.unwrap() < first_high.unwrap());

        assert!(report.after.fps.is_some());
    }

    #[tokio::test]
    async fn missing_replay_binary_is_a_launch_error() {
        let mut config = shell_config("true");
        config.replay_bin = PathBuf::from("definitely-not-a-real-binary-4242");
        config.baseline_samples = 1;

        match run(&config).await {
            Err(SessionError::Launch { command, .. }) => {
                assert!(command.contains("definitely-not-a-real-binary-4242"));
            }
            other => panic!("expected a launch error, got {:?}", other.map(|r| r.outcome)),
        }
    }

    #[tokio::test]
    async fn failing_replay_still_reports_collected_data() {
        let mut config = shell_config("echo '30 fps'; sleep 0.8; exit 3");
        config.baseline_samples = 1;

        let report = run(&config).await.expect("session completes");
        assert_eq!(report.outcome, Outcome::ReplayFailed(Some(3)));
        assert!(!report.snapshots.is_empty());
    }
}
