//! Command execution
//!
//! Runs external programs with their output forwarded live to the parent's
//! stdout/stderr while also capturing it in memory.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::debug;

#[cfg(test)]
pub(crate) mod testing;

/// A single external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub dir: PathBuf,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, dir: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: dir.as_ref().to_path_buf(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable on the child process only
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Human-readable command line, used in logs and error messages
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to capture stdout or stderr")]
    Capture,

    #[error("`{program}` exited with {}", describe_exit(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

impl ExecError {
    /// Output the tool reported about its failure: stderr when it wrote
    /// anything there, stdout otherwise.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            ExecError::Failed { stdout, stderr, .. } => {
                let stderr = stderr.trim();
                if stderr.is_empty() {
                    Some(stdout.trim())
                } else {
                    Some(stderr)
                }
            }
            _ => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Runs invocations to completion and returns their trimmed stdout
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    async fn run(&self, invocation: &Invocation) -> Result<String, ExecError>;
}

impl<R: CommandRunner> CommandRunner for &R {
    async fn run(&self, invocation: &Invocation) -> Result<String, ExecError> {
        (**self).run(invocation).await
    }
}

/// Runs invocations as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<String, ExecError> {
        let program = invocation.program.display().to_string();
        debug!(
            command = %invocation.command_line(),
            dir = %invocation.dir.display(),
            "Running command"
        );

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

        let stdout_copy = child
            .stdout
            .take()
            .map(|out| tokio::spawn(tee(out, tokio::io::stdout())));
        let stderr_copy = child
            .stderr
            .take()
            .map(|err| tokio::spawn(tee(err, tokio::io::stderr())));

        let status = match child.wait().await {
            Ok(status) => status,
            Err(source) => {
                for handle in [&stdout_copy, &stderr_copy].into_iter().flatten() {
                    handle.abort();
                }
                return Err(ExecError::Wait { program, source });
            }
        };

        // Copy errors are only inspected once the child has exited.
        let stdout = join_capture(stdout_copy).await;
        let stderr = join_capture(stderr_copy).await;
        let result = finish(program, status.success(), status.code(), stdout, stderr);
        if result.is_ok() {
            debug!(command = %invocation.command_line(), "Command succeeded");
        }
        result
    }
}

/// Combine exit status and captured streams; a lost stream wins over the exit status
fn finish(
    program: String,
    success: bool,
    code: Option<i32>,
    stdout: Option<Vec<u8>>,
    stderr: Option<Vec<u8>>,
) -> Result<String, ExecError> {
    let (Some(stdout), Some(stderr)) = (stdout, stderr) else {
        return Err(ExecError::Capture);
    };

    let stdout = String::from_utf8_lossy(&stdout).trim().to_string();
    if success {
        Ok(stdout)
    } else {
        Err(ExecError::Failed {
            program,
            code,
            stdout,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

/// Copy `reader` into `live` chunk by chunk, keeping a copy of everything read.
///
/// The reader is drained to EOF even after `live` fails, so the child never
/// blocks on a full pipe; the first write error is returned at the end.
async fn tee<R, W>(mut reader: R, mut live: W) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut captured = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut write_error = None;
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        captured.extend_from_slice(&chunk[..n]);
        if write_error.is_none() {
            if let Err(e) = forward(&mut live, &chunk[..n]).await {
                write_error = Some(e);
            }
        }
    }
    match write_error {
        Some(e) => Err(e),
        None => Ok(captured),
    }
}

async fn forward<W: AsyncWrite + Unpin>(live: &mut W, bytes: &[u8]) -> io::Result<()> {
    live.write_all(bytes).await?;
    live.flush().await
}

async fn join_capture(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Option<Vec<u8>> {
    let Some(handle) = handle else {
        return Some(Vec::new());
    };
    match handle.await {
        Ok(Ok(bytes)) => Some(bytes),
        Ok(Err(e)) => {
            debug!("Output copy failed: {}", e);
            None
        }
        Err(e) => {
            debug!("Output copy task did not complete: {}", e);
            None
        }
    }
}
