use super::*;
use std::cell::Cell;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::anyhow;
use appdeploy_core::OperationOutcome;
use appdeploy_installer::{
    build_relaunch_plan, enforce_native_architecture_with_executor, CapturedOutput, GuardOutcome,
};

use crate::flows::candidate_patterns;
use crate::render::resolve_output_style;

static TEST_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_root() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let mut path = std::env::temp_dir();
    let sequence = TEST_ROOT_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.push(format!(
        "appdeploy-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ));
    fs::create_dir_all(&path).expect("must create test root");
    path
}

fn profile() -> AppProfile {
    AppProfile::new("Foo.Bar").expect("valid profile")
}

fn exited(code: i32) -> io::Result<CapturedOutput> {
    Ok(CapturedOutput {
        code: Some(code),
        stdout: String::new(),
        stderr: String::new(),
    })
}

fn resolved_to(path: &str) -> impl FnOnce(&str, &[PathBuf]) -> Option<PathBuf> + '_ {
    move |_manager: &str, _patterns: &[PathBuf]| Some(PathBuf::from(path))
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "Installed Foo.Bar"),
        "Installed Foo.Bar"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "Installed Foo.Bar"),
        "[OK] Installed Foo.Bar"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "winget not found"),
        "[WARN] winget not found"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "err", "install failed"),
        "[ERR] install failed"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "step", "manager: winget"),
        "[..] manager: winget"
    );
}

#[test]
fn resolve_output_style_follows_stdout_tty() {
    assert_eq!(resolve_output_style(true, true), OutputStyle::Rich);
    assert_eq!(resolve_output_style(true, false), OutputStyle::Rich);
    assert_eq!(resolve_output_style(false, true), OutputStyle::Plain);
}

#[test]
fn cli_parses_global_flags_and_dry_run() {
    let cli = Cli::try_parse_from([
        "appdeploy",
        "--app-id",
        "Foo.Bar",
        "--json",
        "install",
        "--dry-run",
    ])
    .expect("must parse");
    assert_eq!(cli.app_id.as_deref(), Some("Foo.Bar"));
    assert!(cli.json);
    assert!(matches!(cli.command, Commands::Install { dry_run: true }));
}

#[test]
fn cli_requires_a_command() {
    assert!(Cli::try_parse_from(["appdeploy", "--app-id", "Foo.Bar"]).is_err());
}

#[test]
fn load_profile_from_app_id_uses_default_manager() {
    let profile = load_profile(None, Some("Foo.Bar"), None).expect("must load");
    assert_eq!(profile.app_id, "Foo.Bar");
    assert_eq!(profile.manager, "winget");
}

#[test]
fn load_profile_requires_config_or_app_id() {
    let err = load_profile(None, None, None).expect_err("must fail");
    assert!(err.to_string().contains("--config or --app-id"));
}

#[test]
fn load_profile_reads_config_and_applies_overrides() {
    let root = test_root();
    let config = root.join("appdeploy.toml");
    fs::write(
        &config,
        "app_id = \"Mozilla.Firefox\"\ncandidate_paths = [\"/opt/pm/winget.exe\"]\n",
    )
    .expect("must write config");

    let loaded = load_profile(Some(&config), None, None).expect("must load");
    assert_eq!(loaded.app_id, "Mozilla.Firefox");
    assert_eq!(
        candidate_patterns(&loaded),
        vec![PathBuf::from("/opt/pm/winget.exe")]
    );

    let overridden =
        load_profile(Some(&config), Some("Foo.Bar"), Some("pm")).expect("must load");
    assert_eq!(overridden.app_id, "Foo.Bar");
    assert_eq!(overridden.manager, "pm");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn load_profile_reports_missing_config_file() {
    let root = test_root();
    let missing = root.join("absent.toml");
    let err = load_profile(Some(&missing), None, None).expect_err("must fail");
    assert!(err.to_string().contains("failed to read profile"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn load_profile_rejects_invalid_app_id_override() {
    assert!(load_profile(None, Some("Foo Bar"), None).is_err());
}

#[test]
fn config_path_from_env_ignores_empty_values() {
    assert_eq!(config_path_from_env(None), None);
    assert_eq!(config_path_from_env(Some(OsString::new())), None);
    assert_eq!(
        config_path_from_env(Some(OsString::from("/etc/appdeploy.toml"))),
        Some(PathBuf::from("/etc/appdeploy.toml"))
    );
}

#[test]
fn install_flow_success_exits_zero_with_installed_summary() {
    let summary = run_operation_flow(
        OperationKind::Install,
        &profile(),
        resolved_to("/pm/winget.exe"),
        |_command| exited(0),
    );
    assert_eq!(summary.exit_code(), 0);
    assert!(summary.summary_line().contains("Installed"));
}

#[test]
fn install_flow_failure_exits_one_with_code_in_summary() {
    let summary = run_operation_flow(
        OperationKind::Install,
        &profile(),
        resolved_to("/pm/winget.exe"),
        |_command| exited(1603),
    );
    assert_eq!(summary.exit_code(), 1);
    assert!(summary.summary_line().contains("1603"));
}

#[test]
fn install_flow_without_manager_never_launches() {
    let summary = run_operation_flow(
        OperationKind::Install,
        &profile(),
        |_manager, _patterns| None,
        |_command| -> io::Result<CapturedOutput> { panic!("must not launch") },
    );
    assert_eq!(summary.outcome, OperationOutcome::ManagerAbsent);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(
        summary.summary_line(),
        "winget not found; skipped install of Foo.Bar"
    );
}

#[test]
fn flow_resolves_against_profile_candidates() {
    let mut custom = profile();
    custom.candidate_paths = vec!["/first/pm.exe".to_string(), "/second/pm.exe".to_string()];
    let summary = run_operation_flow(
        OperationKind::Install,
        &custom,
        |manager, patterns| {
            assert_eq!(manager, "winget");
            assert_eq!(
                patterns.to_vec(),
                vec![PathBuf::from("/first/pm.exe"), PathBuf::from("/second/pm.exe")]
            );
            None
        },
        |_command| exited(0),
    );
    assert_eq!(summary.outcome, OperationOutcome::ManagerAbsent);
}

#[test]
fn uninstall_flow_stops_after_relaunch() {
    let relaunches = Cell::new(0);
    let result = run_uninstall_flow(
        || {
            let probe = ArchitectureProbe {
                process_arch: Some("x86".to_string()),
                native_arch: Some("AMD64".to_string()),
                relaunched: false,
            };
            enforce_native_architecture_with_executor(
                &probe,
                || {
                    Ok(build_relaunch_plan(
                        Path::new("/tools/appdeploy.exe"),
                        &[OsString::from("uninstall")],
                    ))
                },
                |_command| {
                    relaunches.set(relaunches.get() + 1);
                    Ok(Some(0))
                },
            )
        },
        || -> anyhow::Result<AppProfile> { panic!("profile must not load after relaunch") },
        |_manager: &str, _patterns: &[PathBuf]| -> Option<PathBuf> {
            panic!("manager must not resolve after relaunch")
        },
        |_command| -> io::Result<CapturedOutput> { panic!("must not launch after relaunch") },
    )
    .expect("flow must terminate");

    assert_eq!(relaunches.get(), 1);
    assert_eq!(result, FlowResult::Terminated { exit_code: 0 });
}

#[test]
fn uninstall_flow_runs_when_guard_proceeds() {
    let result = run_uninstall_flow(
        || Ok(GuardOutcome::Proceed),
        || Ok(profile()),
        resolved_to("/pm/winget.exe"),
        |command| {
            let first = command.get_args().next().map(|arg| arg.to_os_string());
            assert_eq!(first, Some(OsString::from("uninstall")));
            exited(0)
        },
    )
    .expect("flow must complete");

    let FlowResult::Completed(summary) = result else {
        panic!("expected completed flow");
    };
    assert_eq!(summary.summary_line(), "Uninstalled Foo.Bar");
    assert_eq!(summary.exit_code(), 0);
}

#[test]
fn uninstall_flow_propagates_guard_errors() {
    let err = run_uninstall_flow(
        || Err(anyhow!("relaunch failed")),
        || Ok(profile()),
        resolved_to("/pm/winget.exe"),
        |_command| exited(0),
    )
    .expect_err("guard error must surface");
    assert_eq!(err.to_string(), "relaunch failed");
}

#[test]
fn summary_lines_render_json_when_requested() {
    let summary = run_operation_flow(
        OperationKind::Install,
        &profile(),
        resolved_to("/pm/winget.exe"),
        |_command| exited(1603),
    );
    let lines = format_summary_lines(&summary, OutputStyle::Plain, true).expect("must render");
    let value: serde_json::Value = serde_json::from_str(&lines[0]).expect("must be json");
    assert_eq!(value["app_id"], "Foo.Bar");
    assert_eq!(value["outcome"]["code"], 1603);

    let plain = format_summary_lines(&summary, OutputStyle::Rich, false).expect("must render");
    assert_eq!(
        plain,
        vec!["[ERR] install of Foo.Bar failed with exit code 1603".to_string()]
    );
}

#[test]
fn detection_writes_stdout_only_when_detected() {
    let detected = run_operation_flow(
        OperationKind::Detect,
        &profile(),
        resolved_to("/pm/winget.exe"),
        |_command| {
            Ok(CapturedOutput {
                code: Some(0),
                stdout: "Foo  Foo.Bar  1.0\n".to_string(),
                stderr: String::new(),
            })
        },
    );
    assert!(detection_writes_stdout(&detected));
    assert_eq!(detected.exit_code(), 0);

    let missing = run_operation_flow(
        OperationKind::Detect,
        &profile(),
        |_manager, _patterns| None,
        |_command| exited(0),
    );
    assert!(!detection_writes_stdout(&missing));
    assert_eq!(missing.exit_code(), 1);
}

#[test]
fn dry_run_lines_show_command_line() {
    let lines = format_dry_run_lines(
        OperationKind::Uninstall,
        &profile(),
        Some(Path::new("/pm/winget.exe")),
        OutputStyle::Plain,
    );
    assert_eq!(
        lines,
        vec![
            "would run: /pm/winget.exe uninstall -e --id \"Foo.Bar\" --scope=machine --silent --accept-source-agreements --disable-interactivity --force"
                .to_string()
        ]
    );

    let absent = format_dry_run_lines(
        OperationKind::Install,
        &profile(),
        None,
        OutputStyle::Rich,
    );
    assert_eq!(
        absent,
        vec!["[WARN] winget not found; skipped install of Foo.Bar".to_string()]
    );
}

#[test]
fn doctor_lines_list_candidates_and_architecture() {
    let probe = ArchitectureProbe {
        process_arch: Some("x86".to_string()),
        native_arch: Some("AMD64".to_string()),
        relaunched: false,
    };
    let lines = format_doctor_lines(
        &profile(),
        &[PathBuf::from("/pm/Pkg*/winget.exe")],
        None,
        &probe,
        OutputStyle::Plain,
    );
    assert_eq!(
        lines,
        vec![
            "app id: Foo.Bar".to_string(),
            "manager: winget".to_string(),
            "candidate: /pm/Pkg*/winget.exe".to_string(),
            "resolved: not found".to_string(),
            "architecture: 32-bit on 64-bit host (uninstall relaunches natively)".to_string(),
        ]
    );
}
