use std::io::Write;
use std::process::ExitCode;

use crate::error::{ErrorKind, RotationError};

/// Terminal result of one invocation. Reported, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    pub succeeded: bool,
    pub message: String,
    pub error_kind: Option<ErrorKind>,
}

impl RotationOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            message: message.into(),
            error_kind: None,
        }
    }

    pub fn failure(err: &RotationError) -> Self {
        Self {
            succeeded: false,
            message: err.to_string(),
            error_kind: Some(err.kind()),
        }
    }

    /// Outcome for a defect that escaped every typed error path.
    pub fn unexpected() -> Self {
        Self {
            succeeded: false,
            message: "rotation aborted by an internal error".to_string(),
            error_kind: Some(ErrorKind::Unexpected),
        }
    }

    /// `0` on success, `1` on any failure.
    pub fn exit_status(&self) -> u8 {
        if self.succeeded {
            0
        } else {
            1
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    /// The single status line printed for this outcome.
    pub fn status_line(&self) -> String {
        match self.error_kind {
            None => self.message.clone(),
            Some(kind) => format!("# Error [{kind}]: {}", self.message),
        }
    }

    pub fn report<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "{}", self.status_line())?;
        out.flush()
    }
}
