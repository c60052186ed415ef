//! External command execution
//!
//! Every toolchain step runs through the [`CommandRunner`] capability:
//! run a command with captured stdout/stderr and fail with an
//! exit-status error. The process-backed implementation streams output
//! into the build log and can enforce a per-command timeout.

mod env;
#[cfg(test)]
pub(crate) mod mock;
mod native;
mod runtime;

pub use env::ToolchainEnv;
pub use native::TokioCommandRunner;
pub use runtime::{CommandRunner, Execution};

use crate::error::{BuildpackError, BuildpackResult};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Max number of output lines to include in command error messages.
const BUILD_ERROR_TAIL_LINES: usize = 50;

/// Extract the useful tail of command output for error diagnostics.
///
/// Returns the last `BUILD_ERROR_TAIL_LINES` lines so error messages are
/// actionable without being overwhelming.
pub(crate) fn build_error_output(lines: &[String]) -> String {
    let total = lines.len();
    let tail = if total > BUILD_ERROR_TAIL_LINES {
        &lines[total - BUILD_ERROR_TAIL_LINES..]
    } else {
        lines
    };
    tail.join("\n")
}

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Returns all collected output lines in arrival order. Output is read as
/// bytes and decoded lossily, so a pipe is only finished at EOF. This is a
/// standalone async function (not behind `async_trait`) to avoid lifetime
/// issues with the `dyn Fn` callback.
pub(crate) async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_output: &(dyn Fn(&str) + Send + Sync),
) -> BuildpackResult<Vec<String>> {
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| BuildpackError::Internal("child stderr was not piped".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| BuildpackError::Internal("child stdout was not piped".to_string()))?;

    let mut stderr_reader = BufReader::new(stderr);
    let mut stdout_reader = BufReader::new(stdout);
    let mut stderr_buf = Vec::new();
    let mut stdout_buf = Vec::new();

    let mut all_output = Vec::new();
    let mut stderr_done = false;
    let mut stdout_done = false;

    // read_until keeps partial bytes in the buffer when the other branch wins
    while !stderr_done || !stdout_done {
        tokio::select! {
            read = stderr_reader.read_until(b'\n', &mut stderr_buf), if !stderr_done => {
                stderr_done = collect_line(read, &mut stderr_buf, &mut all_output, on_output)?;
            }
            read = stdout_reader.read_until(b'\n', &mut stdout_buf), if !stdout_done => {
                stdout_done = collect_line(read, &mut stdout_buf, &mut all_output, on_output)?;
            }
        }
    }

    Ok(all_output)
}

/// Record the line buffered in `buf`; returns true at EOF
fn collect_line(
    read: std::io::Result<usize>,
    buf: &mut Vec<u8>,
    all_output: &mut Vec<String>,
    on_output: &(dyn Fn(&str) + Send + Sync),
) -> BuildpackResult<bool> {
    let read = read.map_err(|e| BuildpackError::io("reading command output", e))?;
    if buf.is_empty() {
        return Ok(read == 0);
    }
    if read != 0 && buf.last() != Some(&b'\n') {
        return Ok(false);
    }

    let line = String::from_utf8_lossy(buf)
        .trim_end_matches(['\n', '\r'])
        .to_string();
    buf.clear();
    on_output(&line);
    all_output.push(line);
    Ok(read == 0)
}
