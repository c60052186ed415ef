//! Process-backed command runner
//!
//! Runs commands with `tokio::process`, streaming combined output into the
//! build log and optionally killing commands that exceed a timeout.

use crate::error::{BuildpackError, BuildpackResult};
use crate::orchestration::runtime::{CommandRunner, Execution};
use crate::orchestration::{build_error_output, stream_child_output};
use crate::ui;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Command runner that spawns real child processes
#[derive(Debug, Clone, Default)]
pub struct TokioCommandRunner {
    timeout: Option<Duration>,
    echo: bool,
}

impl TokioCommandRunner {
    /// Create a runner without a timeout that does not echo output
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill commands that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Echo every output line into the build log
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    fn command(execution: &Execution) -> Command {
        let mut cmd = Command::new(&execution.command);
        cmd.args(&execution.args)
            .envs(execution.env.vars())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = execution.dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn execute(&self, execution: &Execution) -> BuildpackResult<String> {
        debug!("Executing: {}", execution);

        let mut child = Self::command(execution)
            .spawn()
            .map_err(|e| BuildpackError::command_failed(execution.to_string(), e))?;

        let echo = self.echo;
        let on_output = move |line: &str| {
            if echo {
                ui::output(line);
            }
        };

        let run = async {
            let lines = stream_child_output(&mut child, &on_output).await?;
            let status = child
                .wait()
                .await
                .map_err(|e| BuildpackError::command_failed(execution.to_string(), e))?;
            Ok::<_, BuildpackError>((status, lines))
        };

        let (status, lines) = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, run).await {
                Ok(result) => result?,
                Err(_) => {
                    let _ = child.kill().await;
                    return Err(BuildpackError::CommandTimeout {
                        command: execution.to_string(),
                        timeout,
                    });
                }
            },
            None => run.await?,
        };

        if !status.success() {
            return Err(BuildpackError::command_exec(
                execution.to_string(),
                status.to_string(),
                build_error_output(&lines),
            ));
        }

        Ok(lines.join("\n"))
    }
}
