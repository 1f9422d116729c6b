use std::io;
use std::path::Path;
use std::process::Command;

use appdeploy_core::{AppProfile, OperationKind, OperationOutcome, RunSummary};

use crate::detect::classify_detection;
use crate::process::{build_manager_command, run_captured, CapturedOutput};

/// Runs one package-manager operation for the profile's application.
///
/// Without a resolved manager path nothing is launched and the run is reported as
/// manager-absent.
pub fn run_package_operation(
    kind: OperationKind,
    profile: &AppProfile,
    manager_path: Option<&Path>,
) -> RunSummary {
    run_package_operation_with_executor(kind, profile, manager_path, run_captured)
}

pub fn run_package_operation_with_executor<RunCommand>(
    kind: OperationKind,
    profile: &AppProfile,
    manager_path: Option<&Path>,
    mut run_command_executor: RunCommand,
) -> RunSummary
where
    RunCommand: FnMut(&mut Command) -> io::Result<CapturedOutput>,
{
    let Some(manager_path) = manager_path else {
        log::warn!("{} not found; skipping {kind}", profile.manager);
        return RunSummary::manager_absent(kind, &profile.app_id, &profile.manager);
    };

    let args = kind.manager_args(&profile.app_id);
    log::info!(
        "running {} {}",
        manager_path.display(),
        kind.argument_string(&profile.app_id)
    );
    let mut command = build_manager_command(manager_path, &args);

    let (outcome, output) = match run_command_executor(&mut command) {
        Ok(captured) => {
            let output = captured.combined();
            if !output.is_empty() {
                log::debug!("{} output:\n{output}", profile.manager);
            }
            let outcome = match kind {
                OperationKind::Detect => classify_detection(&profile.app_id, &captured),
                _ => OperationOutcome::from_exit_code(captured.code),
            };
            (outcome, output)
        }
        Err(err) => {
            log::error!("failed to launch {}: {err}", manager_path.display());
            (
                OperationOutcome::launch_failed(format!(
                    "failed to launch {}: {err}",
                    manager_path.display()
                )),
                String::new(),
            )
        }
    };

    RunSummary::new(
        kind,
        &profile.app_id,
        &profile.manager,
        Some(manager_path.display().to_string()),
        outcome,
        output,
    )
}
