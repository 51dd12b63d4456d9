//! Deployment orchestration
//!
//! Drives a service through build and deployment: generates the run suffix,
//! rewrites function names, runs the runtime builds and finally calls the
//! deployment tool.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::{
    builder::{BuildError, RuntimeBuilder},
    constants::tool,
    descriptor::{DescriptorError, Functions, ServiceDescriptor},
    exec::{CommandRunner, ExecError, ProcessRunner},
    retry::{RetryPolicy, RetryingInvoker},
};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("serverless framework is not installed: `{tool}` not found on PATH")]
    ToolMissing {
        tool: String,
        #[source]
        source: which::Error,
    },

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("`{command}` failed after {attempts} attempt(s): {source}")]
    Invocation {
        command: String,
        attempts: u32,
        #[source]
        source: ExecError,
    },
}

/// Resolve a program on `PATH`
pub fn locate_tool(name: &str) -> Result<PathBuf, OrchestratorError> {
    which::which(name).map_err(|source| OrchestratorError::ToolMissing {
        tool: name.to_string(),
        source,
    })
}

/// Next run suffix: the current time in nanoseconds, kept strictly above `previous`
pub fn next_run_suffix(previous: &str) -> String {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    match previous.parse::<i64>() {
        Ok(previous) if now <= previous => previous.saturating_add(1).to_string(),
        _ => now.to_string(),
    }
}

/// Owns a parsed service and runs deploy/remove/list against it
pub struct Orchestrator<R = ProcessRunner> {
    provider: String,
    descriptor_dir: PathBuf,
    descriptor: ServiceDescriptor,
    run_suffix: String,
    options: BTreeMap<String, String>,
    invoker: RetryingInvoker<R>,
}

impl Orchestrator<ProcessRunner> {
    /// Locate `sls` and load the service in `descriptor_dir`
    pub fn new(provider: &str, descriptor_dir: impl AsRef<Path>) -> Result<Self, OrchestratorError> {
        let tool = locate_tool(tool::SLS)?;
        Self::with_runner(ProcessRunner, tool, provider, descriptor_dir)
    }
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn with_runner(
        runner: R,
        tool: impl Into<PathBuf>,
        provider: &str,
        descriptor_dir: impl AsRef<Path>,
    ) -> Result<Self, OrchestratorError> {
        let descriptor_dir = descriptor_dir.as_ref().to_path_buf();
        let descriptor = ServiceDescriptor::load(&descriptor_dir, provider)?;

        Ok(Self {
            provider: provider.to_string(),
            descriptor_dir,
            descriptor,
            run_suffix: String::new(),
            options: BTreeMap::new(),
            invoker: RetryingInvoker::new(runner, tool),
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.invoker = self.invoker.with_policy(policy);
        self
    }

    pub fn with_options(mut self, options: BTreeMap<String, String>) -> Self {
        self.options = options;
        self
    }

    /// Extra `--name value` flags passed to every tool invocation
    pub fn options_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.options
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn descriptor_dir(&self) -> &Path {
        &self.descriptor_dir
    }

    pub fn stack_id(&self) -> String {
        self.descriptor.stack_id()
    }

    pub fn project(&self) -> &str {
        &self.descriptor.provider.project
    }

    pub fn stage(&self) -> &str {
        &self.descriptor.provider.stage
    }

    /// Functions as parsed, or as renamed by the last deploy
    pub fn functions(&self) -> &Functions {
        &self.descriptor.functions
    }

    /// Suffix of the last deploy; empty before the first one
    pub fn run_suffix(&self) -> &str {
        &self.run_suffix
    }

    /// Build every runtime present and deploy the stack under a fresh suffix
    pub async fn deploy(&mut self) -> Result<(), OrchestratorError> {
        self.run_suffix = next_run_suffix(&self.run_suffix);
        self.descriptor.apply_suffix(&self.run_suffix);
        info!(
            suffix = %self.run_suffix,
            "Deploying {} ({} function(s))",
            self.stack_id(),
            self.descriptor.functions.len()
        );

        RuntimeBuilder::new(self.invoker.runner(), &self.descriptor_dir)
            .build_all()
            .await?;

        self.invoke(&["deploy", "--no-aws-s3-accelerate"]).await?;
        info!("Successfully deployed {}", self.stack_id());
        Ok(())
    }

    /// Remove the stack deployed under the current suffix
    pub async fn remove(&self) -> Result<(), OrchestratorError> {
        info!(suffix = %self.run_suffix, "Removing {}", self.stack_id());
        self.invoke(&["remove"]).await?;
        Ok(())
    }

    /// Ask the tool to list deployed functions; returns its output
    pub async fn list_functions(&self) -> Result<String, OrchestratorError> {
        self.invoke(&["deploy", "list", "functions"]).await
    }

    async fn invoke(&self, subcommand: &[&str]) -> Result<String, OrchestratorError> {
        let invocation = self.invoker.invocation(
            &self.descriptor_dir,
            subcommand,
            &self.run_suffix,
            &self.options,
        );
        self.invoker
            .run(&invocation)
            .await
            .map_err(|source| OrchestratorError::Invocation {
                command: invocation.command_line(),
                attempts: self.invoker.policy().attempts(),
                source,
            })
    }
}
