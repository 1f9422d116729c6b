mod operation;
mod outcome;
mod profile;

pub use operation::{render_command_line, OperationKind};
pub use outcome::{OperationOutcome, RunSummary, EXIT_FAILURE, EXIT_SUCCESS};
pub use profile::{validate_app_id, AppProfile, DEFAULT_MANAGER};
