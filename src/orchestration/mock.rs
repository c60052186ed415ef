use crate::error::{BuildpackError, BuildpackResult};
use crate::orchestration::{CommandRunner, Execution};
use async_trait::async_trait;
use std::sync::Mutex;

pub const SOLANA_VERSION_OUTPUT: &str = "solana-cli 1.17.17 (src:27a4ead4; feat:3746964731, client:SolanaLabs)\n";

/// Command runner that records executions instead of spawning processes
pub struct MockCommandRunner {
    executions: Mutex<Vec<Execution>>,
    failures: Vec<String>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self {
            executions: Mutex::new(Vec::new()),
            failures: Vec::new(),
        }
    }

    /// Fail every command whose command line starts with `prefix`
    pub fn failing(prefix: impl Into<String>) -> Self {
        Self {
            executions: Mutex::new(Vec::new()),
            failures: vec![prefix.into()],
        }
    }

    pub fn executions(&self) -> Vec<Execution> {
        self.executions.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.executions().iter().map(ToString::to_string).collect()
    }
}

impl Default for MockCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn execute(&self, execution: &Execution) -> BuildpackResult<String> {
        self.executions.lock().unwrap().push(execution.clone());

        let line = execution.to_string();
        if self.failures.iter().any(|prefix| line.starts_with(prefix.as_str())) {
            return Err(BuildpackError::command_exec(line, "exit status: 1", "mock failure"));
        }

        if execution.command == "solana" && execution.args == ["--version"] {
            return Ok(SOLANA_VERSION_OUTPUT.to_string());
        }
        Ok(String::new())
    }
}
