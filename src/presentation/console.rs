//! Operator console
//!
//! Line-based prompts on stdin/stdout.

use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Literal answer that starts streaming. Case-sensitive.
pub const START_COMMAND: &str = "start";

/// Literal answer that ends streaming
pub const STOP_COMMAND: &str = "stop";

#[async_trait]
pub trait OperatorConsole: Send {
    /// Show `message` and read one line. `None` means input is closed.
    async fn prompt(&mut self, message: &str) -> anyhow::Result<Option<String>>;
}

pub fn is_start_command(answer: &str) -> bool {
    answer.trim() == START_COMMAND
}

pub fn is_stop_command(answer: &str) -> bool {
    answer.trim() == STOP_COMMAND
}

pub struct StdinConsole {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinConsole {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperatorConsole for StdinConsole {
    async fn prompt(&mut self, message: &str) -> anyhow::Result<Option<String>> {
        {
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "{}", message)?;
            stdout.flush()?;
        }
        Ok(self.lines.next_line().await?)
    }
}
