use log::debug;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::monitor::FpsSink;

/// Extracts a frame-rate value from a line of replay-tool output: a
/// number immediately preceding the `fps` unit token, case-insensitive.
#[derive(Debug, Clone)]
pub struct FpsParser {
    pattern: Regex,
}

impl FpsParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)(\d+\.?\d*)\s*fps").expect("fps pattern compiles"),
        }
    }

    pub fn extract(&self, line: &str) -> Option<f64> {
        let captures = self.pattern.captures(line)?;
        captures.get(1)?.as_str().parse().ok()
    }
}

impl Default for FpsParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Pump one output stream line by line until it closes: echo every line
/// and publish each frame-rate match to the sampler. Lines that match but
/// fail to parse are ignored. Runs on its own task so a blocking stream
/// never stalls the sampler or the orchestrator.
pub async fn pump_lines<R>(stream: R, tag: &str, parser: FpsParser, sink: FpsSink)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                println!("[{}] {}", tag, line);
                if let Some(fps) = parser.extract(line) {
                    sink.update(fps);
                }
            }
            Ok(None) => break,
            Err(err) => {
                debug!("error reading {} stream: {}", tag, err);
                break;
            }
        }
    }
}
