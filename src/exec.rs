//! Subprocess execution helpers
//!
//! The single sanctioned path for running external commands. Every
//! invocation is logged, output is captured, and probe-style calls get a
//! bounded timeout so a wedged binary cannot hang the session.

use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use crate::error::{Result, SetupError};

/// Poll interval while waiting for a child under a deadline
const WAIT_POLL: Duration = Duration::from_millis(50);

/// Run a command to completion, capturing stdout and stderr.
///
/// No deadline; this is reserved for the rebuild invocation, which is
/// allowed to run for minutes.
pub fn run_capture(program: &str, args: &[&str], envs: &[(&str, String)]) -> Result<Output> {
    tracing::info!("exec: {program} {args:?}");

    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let output = cmd.output().map_err(|e| {
        SetupError::external_tool(program, None, format!("failed to start: {e}"))
    })?;
    Ok(output)
}

/// Run a command with a deadline, killing it if the deadline passes.
pub fn run_capture_timeout(program: &str, args: &[&str], timeout: Duration) -> Result<Output> {
    tracing::debug!("exec (timeout {}s): {program} {args:?}", timeout.as_secs());

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SetupError::external_tool(program, None, format!("failed to start: {e}")))?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => {
                return child.wait_with_output().map_err(SetupError::from);
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SetupError::external_tool(
                        program,
                        None,
                        format!("timed out after {}s", timeout.as_secs()),
                    ));
                }
                std::thread::sleep(WAIT_POLL);
            }
            Err(e) => return Err(SetupError::from(e)),
        }
    }
}

/// Last `max` characters of a string, respecting char boundaries.
///
/// Used to bound captured error streams before they land in a stage detail.
pub fn tail_chars(s: &str, max: usize) -> &str {
    let count = s.chars().count();
    if count <= max {
        return s;
    }
    let skip = count - max;
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
