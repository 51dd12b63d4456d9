//! Retrying invocation of the deployment tool
//!
//! Every call to the tool carries the run suffix and the configured extra
//! options, and is retried with a fixed delay when it fails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::constants::{retry, tool};
use crate::exec::{CommandRunner, ExecError, Invocation};


/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between two consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(retry::MAX_ATTEMPTS, Duration::from_secs(retry::DELAY_SECS))
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Attempts actually made when every one fails
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Whether to try again after `attempt` (1-based) failed with `error`.
    ///
    /// Every error is retried; only the attempt budget is consulted.
    pub fn should_retry(&self, attempt: u32, _error: &ExecError) -> bool {
        attempt < self.attempts()
    }
}

/// Runs deployment tool subcommands through a [`CommandRunner`] with retry
pub struct RetryingInvoker<R> {
    runner: R,
    tool: PathBuf,
    policy: RetryPolicy,
}

impl<R: CommandRunner> RetryingInvoker<R> {
    pub fn new(runner: R, tool: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            tool: tool.into(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn tool(&self) -> &Path {
        &self.tool
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Build the tool invocation: `<tool> <subcommand...> --suffix <suffix> [--<name> <value>...]`
    pub fn invocation(
        &self,
        dir: &Path,
        subcommand: &[&str],
        suffix: &str,
        options: &BTreeMap<String, String>,
    ) -> Invocation {
        let mut invocation = Invocation::new(&self.tool, dir)
            .args(subcommand.iter().copied())
            .arg(tool::SUFFIX_FLAG)
            .arg(suffix);
        for (name, value) in options {
            invocation = invocation.arg(format!("--{}", name)).arg(value.as_str());
        }
        invocation
    }

    /// Run `invocation` until it succeeds or the attempt budget is spent
    pub async fn run(&self, invocation: &Invocation) -> Result<String, ExecError> {
        let mut attempt = 1;
        loop {
            match self.runner.run(invocation).await {
                Ok(output) => {
                    debug!(attempt, command = %invocation.command_line(), "Tool invocation succeeded");
                    return Ok(output);
                }
                Err(e) if self.policy.should_retry(attempt, &e) => {
                    warn!(
                        attempt,
                        max_attempts = self.policy.attempts(),
                        error = %e,
                        "Tool invocation failed, retrying in {:?}",
                        self.policy.delay
                    );
                    tokio::time::sleep(self.policy.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
