use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use appdeploy_core::{validate_app_id, AppProfile, OperationKind, RunSummary};
use appdeploy_installer::{
    decide_elevation, default_candidate_patterns, resolve_manager_path,
    run_package_operation_with_executor, ArchitectureProbe, CapturedOutput, ElevationDecision,
    GuardOutcome,
};

use crate::render::{render_section_header, render_status_line, OutputStyle, WaitSpinner};

pub(crate) const CONFIG_ENV: &str = "APPDEPLOY_CONFIG";

/// How a flow ended: either a summary to report, or an early exit decided by the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FlowResult {
    Completed(RunSummary),
    Terminated { exit_code: i32 },
}

pub(crate) fn load_profile(
    config: Option<&Path>,
    app_id: Option<&str>,
    manager: Option<&str>,
) -> Result<AppProfile> {
    let mut profile = match config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read profile: {}", path.display()))?;
            AppProfile::from_toml_str(&raw)
                .with_context(|| format!("failed to load profile: {}", path.display()))?
        }
        None => {
            let app_id = app_id.context("no profile given: pass --config or --app-id")?;
            AppProfile::new(app_id)?
        }
    };

    if let Some(app_id) = app_id {
        validate_app_id(app_id)?;
        profile.app_id = app_id.to_string();
    }
    if let Some(manager) = manager {
        profile.manager = manager.to_string();
    }
    profile.validate()?;
    Ok(profile)
}

pub(crate) fn config_path_from_env(value: Option<std::ffi::OsString>) -> Option<PathBuf> {
    value.filter(|raw| !raw.is_empty()).map(PathBuf::from)
}

pub(crate) fn candidate_patterns(profile: &AppProfile) -> Vec<PathBuf> {
    if profile.candidate_paths.is_empty() {
        default_candidate_patterns(&profile.manager)
    } else {
        profile.candidate_paths.iter().map(PathBuf::from).collect()
    }
}

/// Resolve the manager, run the operation, and return the run summary.
pub(crate) fn run_operation_flow<Resolve, RunCommand>(
    kind: OperationKind,
    profile: &AppProfile,
    resolve: Resolve,
    run_command_executor: RunCommand,
) -> RunSummary
where
    Resolve: FnOnce(&str, &[PathBuf]) -> Option<PathBuf>,
    RunCommand: FnMut(&mut Command) -> io::Result<CapturedOutput>,
{
    let patterns = candidate_patterns(profile);
    let manager_path = resolve(&profile.manager, &patterns);
    run_package_operation_with_executor(
        kind,
        profile,
        manager_path.as_deref(),
        run_command_executor,
    )
}

/// Uninstall is the only flow behind the architecture guard. The guard runs before the
/// profile is even loaded; a terminating guard skips everything else.
pub(crate) fn run_uninstall_flow<Guard, Load, Resolve, RunCommand>(
    guard: Guard,
    load: Load,
    resolve: Resolve,
    run_command_executor: RunCommand,
) -> Result<FlowResult>
where
    Guard: FnOnce() -> Result<GuardOutcome>,
    Load: FnOnce() -> Result<AppProfile>,
    Resolve: FnOnce(&str, &[PathBuf]) -> Option<PathBuf>,
    RunCommand: FnMut(&mut Command) -> io::Result<CapturedOutput>,
{
    if let GuardOutcome::Terminate { exit_code } = guard()? {
        return Ok(FlowResult::Terminated { exit_code });
    }
    let profile = load()?;
    Ok(FlowResult::Completed(run_operation_flow(
        OperationKind::Uninstall,
        &profile,
        resolve,
        run_command_executor,
    )))
}

pub(crate) fn spinning_executor(
    style: OutputStyle,
    label: &'static str,
) -> impl FnMut(&mut Command) -> io::Result<CapturedOutput> {
    move |command| {
        let spinner = WaitSpinner::start(style, label);
        let result = appdeploy_installer::run_captured(command);
        spinner.finish();
        result
    }
}

pub(crate) fn format_summary_lines(
    summary: &RunSummary,
    style: OutputStyle,
    json: bool,
) -> Result<Vec<String>> {
    if json {
        let line = serde_json::to_string(summary).context("failed to serialize run summary")?;
        return Ok(vec![line]);
    }
    Ok(vec![render_status_line(
        style,
        summary.status(),
        &summary.summary_line(),
    )])
}

/// Detection prints to stdout only when the application is present.
pub(crate) fn detection_writes_stdout(summary: &RunSummary) -> bool {
    summary.kind != OperationKind::Detect || summary.outcome.is_success()
}

pub(crate) fn format_dry_run_lines(
    kind: OperationKind,
    profile: &AppProfile,
    manager_path: Option<&Path>,
    style: OutputStyle,
) -> Vec<String> {
    match manager_path {
        Some(path) => vec![render_status_line(
            style,
            "step",
            &format!(
                "would run: {} {}",
                path.display(),
                kind.argument_string(&profile.app_id)
            ),
        )],
        None => vec![render_status_line(
            style,
            "warn",
            &RunSummary::manager_absent(kind, &profile.app_id, &profile.manager).summary_line(),
        )],
    }
}

pub(crate) fn format_doctor_lines(
    profile: &AppProfile,
    patterns: &[PathBuf],
    manager_path: Option<&Path>,
    probe: &ArchitectureProbe,
    style: OutputStyle,
) -> Vec<String> {
    let mut lines = Vec::new();
    lines.extend(render_section_header(style, "appdeploy"));
    lines.push(render_status_line(
        style,
        "step",
        &format!("app id: {}", profile.app_id),
    ));
    lines.push(render_status_line(
        style,
        "step",
        &format!("manager: {}", profile.manager),
    ));
    for pattern in patterns {
        lines.push(render_status_line(
            style,
            "step",
            &format!("candidate: {}", pattern.display()),
        ));
    }
    lines.push(match manager_path {
        Some(path) => render_status_line(style, "ok", &format!("resolved: {}", path.display())),
        None => render_status_line(style, "warn", "resolved: not found"),
    });
    let architecture = match decide_elevation(probe) {
        ElevationDecision::Continue => "native",
        ElevationDecision::Relaunch => "32-bit on 64-bit host (uninstall relaunches natively)",
        ElevationDecision::Unsupported => "32-bit host (uninstall unsupported)",
    };
    lines.push(render_status_line(
        style,
        "step",
        &format!("architecture: {architecture}"),
    ));
    lines
}

pub(crate) fn resolve_for_profile(profile: &AppProfile) -> (Vec<PathBuf>, Option<PathBuf>) {
    let patterns = candidate_patterns(profile);
    let manager_path = resolve_manager_path(&profile.manager, &patterns);
    (patterns, manager_path)
}
