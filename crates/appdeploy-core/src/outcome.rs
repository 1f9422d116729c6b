use serde::Serialize;

use crate::operation::OperationKind;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Result of a single package-manager invocation, or of its absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OperationOutcome {
    Success,
    Failure {
        code: Option<i32>,
        message: Option<String>,
    },
    ManagerAbsent,
}

impl OperationOutcome {
    /// Classifies a process exit code. A missing code (killed by a signal) is a failure.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::Success,
            code => Self::Failure {
                code,
                message: None,
            },
        }
    }

    pub fn launch_failed(message: impl Into<String>) -> Self {
        Self::Failure {
            code: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Immutable record of one run. Built once, after the outcome is known, and the sole
/// source of both the summary line and the process exit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub kind: OperationKind,
    pub app_id: String,
    pub manager: String,
    pub manager_path: Option<String>,
    pub outcome: OperationOutcome,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output: String,
}

impl RunSummary {
    pub fn new(
        kind: OperationKind,
        app_id: impl Into<String>,
        manager: impl Into<String>,
        manager_path: Option<String>,
        outcome: OperationOutcome,
        output: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            app_id: app_id.into(),
            manager: manager.into(),
            manager_path,
            outcome,
            output: output.into(),
        }
    }

    /// Summary for a run that never reached the package manager.
    pub fn manager_absent(
        kind: OperationKind,
        app_id: impl Into<String>,
        manager: impl Into<String>,
    ) -> Self {
        Self::new(
            kind,
            app_id,
            manager,
            None,
            OperationOutcome::ManagerAbsent,
            String::new(),
        )
    }

    /// Exit code reported to the device-management agent.
    ///
    /// A missing manager is a note for install and uninstall, but means "not present" for
    /// detection.
    pub fn exit_code(&self) -> i32 {
        match (&self.outcome, self.kind) {
            (OperationOutcome::Success, _) => EXIT_SUCCESS,
            (OperationOutcome::ManagerAbsent, OperationKind::Detect) => EXIT_FAILURE,
            (OperationOutcome::ManagerAbsent, _) => EXIT_SUCCESS,
            (OperationOutcome::Failure { .. }, _) => EXIT_FAILURE,
        }
    }

    /// Status token understood by the status-line renderer.
    pub fn status(&self) -> &'static str {
        match self.outcome {
            OperationOutcome::Success => "ok",
            OperationOutcome::ManagerAbsent => "warn",
            OperationOutcome::Failure { .. } => "err",
        }
    }

    pub fn summary_line(&self) -> String {
        let app_id = &self.app_id;
        match &self.outcome {
            OperationOutcome::Success => format!("{} {app_id}", self.kind.done_label()),
            OperationOutcome::ManagerAbsent => format!(
                "{} not found; skipped {} of {app_id}",
                self.manager, self.kind
            ),
            OperationOutcome::Failure { code, message } => {
                let subject = match self.kind {
                    OperationKind::Detect => format!("{app_id} not detected"),
                    kind => format!("{kind} of {app_id} failed"),
                };
                match (code, message) {
                    (Some(code), Some(message)) => {
                        format!("{subject} with exit code {} ({message})", format_exit_code(*code))
                    }
                    (Some(code), None) => {
                        format!("{subject} with exit code {}", format_exit_code(*code))
                    }
                    (None, Some(message)) => format!("{subject}: {message}"),
                    (None, None) => format!("{subject}: exit code unavailable"),
                }
            }
        }
    }
}

/// Renders a decimal exit code, adding the HRESULT form for negative codes.
fn format_exit_code(code: i32) -> String {
    if code < 0 {
        format!("{code} (0x{:08X})", code as u32)
    } else {
        code.to_string()
    }
}
