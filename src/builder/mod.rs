//! Per-runtime build steps
//!
//! Each runtime builds from `<descriptor dir>/<runtime dir>`. A missing
//! directory means the service does not use that runtime.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::runtime;
use crate::exec::{CommandRunner, ExecError, Invocation};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    Java8,
    Java11,
    CSharp,
    Go,
}

impl Runtime {
    /// Order in which a deploy builds runtimes
    pub const BUILD_ORDER: [Runtime; 4] = [
        Runtime::Java8,
        Runtime::Java11,
        Runtime::CSharp,
        Runtime::Go,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            Runtime::Java8 => runtime::JAVA8,
            Runtime::Java11 => runtime::JAVA11,
            Runtime::CSharp => runtime::CSHARP,
            Runtime::Go => runtime::GOLANG,
        }
    }

    pub fn source_dir(self, descriptor_dir: &Path) -> PathBuf {
        descriptor_dir.join(self.dir_name())
    }

    /// Commands run in order inside the runtime's source directory
    pub fn commands(self, source_dir: &Path) -> Vec<Invocation> {
        match self {
            Runtime::Java8 | Runtime::Java11 => {
                vec![Invocation::new("mvn", source_dir).arg("package")]
            }
            Runtime::CSharp => vec![
                Invocation::new("dotnet", source_dir).arg("restore"),
                Invocation::new("dotnet", source_dir).args([
                    "lambda",
                    "package",
                    "--configuration",
                    "release",
                    "--framework",
                    "netcoreapp2.1",
                    "--output-package",
                    "./deploy.zip",
                ]),
            ],
            Runtime::Go => vec![Invocation::new("go", source_dir)
                .args(["build", "-ldflags", "-s -w", "-o", "bin/hello", "main.go"])
                .env("GOOS", "linux")
                .env("GO111MODULE", "on")],
        }
    }

    fn is_maven(self) -> bool {
        matches!(self, Runtime::Java8 | Runtime::Java11)
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The runtime directory does not exist
    Skipped,
    Built,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to inspect {runtime} source directory {}: {source}", .path.display())]
    Inspect {
        runtime: Runtime,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{runtime} build failed running `{command}`: {source}")]
    Command {
        runtime: Runtime,
        command: String,
        #[source]
        source: ExecError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Advisory,
}

/// Classify a failed `mvn` run.
///
/// Maven can exit non-zero while only reporting warnings; those reports start
/// with `WARNING`. A run that logged `[ERROR]` or `BUILD FAILURE` on either
/// stream is always fatal, since JVM startup banners also begin with
/// `WARNING`. This depends on Maven's English wording and may not hold for
/// other versions or locales.
pub fn classify_maven_failure(error: &ExecError) -> Severity {
    let ExecError::Failed { stdout, stderr, .. } = error else {
        return Severity::Fatal;
    };
    let reported_failure = [stdout, stderr]
        .iter()
        .any(|text| text.contains("[ERROR]") || text.contains("BUILD FAILURE"));
    if reported_failure {
        return Severity::Fatal;
    }

    match error.diagnostics() {
        Some(text) if text.starts_with("WARNING") || text.starts_with("[WARNING]") => {
            Severity::Advisory
        }
        _ => Severity::Fatal,
    }
}

/// Runs build steps for the runtimes present under a descriptor directory
pub struct RuntimeBuilder<'a, R> {
    runner: &'a R,
    descriptor_dir: PathBuf,
}

impl<'a, R: CommandRunner> RuntimeBuilder<'a, R> {
    pub fn new(runner: &'a R, descriptor_dir: impl AsRef<Path>) -> Self {
        Self {
            runner,
            descriptor_dir: descriptor_dir.as_ref().to_path_buf(),
        }
    }

    /// Source directory for `runtime`, or `None` when the service doesn't use it
    pub async fn locate(&self, runtime: Runtime) -> Result<Option<PathBuf>, BuildError> {
        let path = runtime.source_dir(&self.descriptor_dir);
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(Some(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BuildError::Inspect {
                runtime,
                path,
                source,
            }),
        }
    }

    pub async fn build(&self, runtime: Runtime) -> Result<BuildOutcome, BuildError> {
        let Some(source_dir) = self.locate(runtime).await? else {
            debug!("No {} sources, skipping build", runtime);
            return Ok(BuildOutcome::Skipped);
        };

        info!("Building {} functions at {:?}", runtime, source_dir);
        for invocation in runtime.commands(&source_dir) {
            match self.runner.run(&invocation).await {
                Ok(_) => {}
                Err(e) if runtime.is_maven() && classify_maven_failure(&e) == Severity::Advisory => {
                    warn!("Ignoring advisory maven failure for {}: {}", runtime, e);
                }
                Err(source) => {
                    return Err(BuildError::Command {
                        runtime,
                        command: invocation.command_line(),
                        source,
                    })
                }
            }
        }

        info!("Successfully built {} functions", runtime);
        Ok(BuildOutcome::Built)
    }

    /// Build every runtime in [`Runtime::BUILD_ORDER`], stopping at the first failure
    pub async fn build_all(&self) -> Result<Vec<(Runtime, BuildOutcome)>, BuildError> {
        let mut outcomes = Vec::with_capacity(Runtime::BUILD_ORDER.len());
        for runtime in Runtime::BUILD_ORDER {
            let outcome = self.build(runtime).await?;
            outcomes.push((runtime, outcome));
        }
        Ok(outcomes)
    }
}
