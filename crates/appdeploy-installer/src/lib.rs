mod detect;
mod elevation;
mod locator;
mod operation;
mod process;

pub use detect::classify_detection;
pub use elevation::{
    build_relaunch_plan, decide_elevation, enforce_native_architecture,
    enforce_native_architecture_with_executor, ArchitectureProbe, ElevationDecision,
    GuardOutcome, RelaunchPlan, RELAUNCH_MARKER_ENV,
};
pub use locator::{
    default_candidate_patterns, default_candidate_patterns_with_env, expand_pattern,
    locate_executable, locate_executable_from, resolve_manager_path, resolve_manager_path_in,
};
pub use operation::{run_package_operation, run_package_operation_with_executor};
pub use process::{build_manager_command, run_captured, CapturedOutput};
