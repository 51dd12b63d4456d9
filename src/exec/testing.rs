//! In-memory command runner for exercising callers without spawning processes

use super::{CommandRunner, ExecError, Invocation};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&Invocation, usize) -> Result<String, ExecError> + Send + Sync>;

/// Records every invocation and answers with a scripted result.
///
/// The responder receives the invocation and its zero-based call index.
pub(crate) struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    responder: Responder,
}

impl RecordingRunner {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&Invocation, usize) -> Result<String, ExecError> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    pub(crate) fn succeeding() -> Self {
        Self::new(|_, _| Ok(String::new()))
    }

    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn command_lines(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|call| call.command_line())
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<String, ExecError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(invocation.clone());
            calls.len() - 1
        };
        (self.responder)(invocation, index)
    }
}

/// A non-zero exit carrying the given stderr text
pub(crate) fn exit_failure(program: &str, stderr: &str) -> ExecError {
    ExecError::Failed {
        program: program.to_string(),
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}
