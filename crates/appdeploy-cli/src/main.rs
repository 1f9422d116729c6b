use std::path::PathBuf;

use anyhow::Result;
use appdeploy_core::{AppProfile, OperationKind, RunSummary, EXIT_FAILURE, EXIT_SUCCESS};
use appdeploy_installer::{
    enforce_native_architecture, resolve_manager_path, run_captured, ArchitectureProbe,
};
use clap::{Parser, Subcommand};

mod flows;
mod render;

use flows::{
    config_path_from_env, detection_writes_stdout, format_doctor_lines, format_dry_run_lines,
    format_summary_lines, load_profile, resolve_for_profile, run_operation_flow,
    run_uninstall_flow, spinning_executor, FlowResult, CONFIG_ENV,
};
use render::{current_output_style, render_status_line, OutputStyle};

#[derive(Parser, Debug)]
#[command(name = "appdeploy")]
#[command(
    about = "Install, detect, or uninstall one application through the system package manager",
    long_about = None
)]
struct Cli {
    /// Profile file (TOML). Falls back to APPDEPLOY_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Package id, overriding the profile.
    #[arg(long)]
    app_id: Option<String>,
    /// Package manager command name, overriding the profile.
    #[arg(long)]
    manager: Option<String>,
    /// Print the run summary as JSON.
    #[arg(long)]
    json: bool,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Install {
        #[arg(long)]
        dry_run: bool,
    },
    Uninstall {
        #[arg(long)]
        dry_run: bool,
    },
    Detect,
    Doctor,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let style = current_output_style();

    let code = match run_cli(cli, style) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", render_status_line(style, "err", &format!("{err:#}")));
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run_cli(cli: Cli, style: OutputStyle) -> Result<i32> {
    let config = cli
        .config
        .or_else(|| config_path_from_env(std::env::var_os(CONFIG_ENV)));
    let load = || {
        load_profile(
            config.as_deref(),
            cli.app_id.as_deref(),
            cli.manager.as_deref(),
        )
    };

    match cli.command {
        Commands::Install { dry_run: true } => {
            print_dry_run(OperationKind::Install, &load()?, style)
        }
        Commands::Uninstall { dry_run: true } => {
            print_dry_run(OperationKind::Uninstall, &load()?, style)
        }
        Commands::Install { dry_run: false } => {
            let summary = run_operation_flow(
                OperationKind::Install,
                &load()?,
                resolve_manager_path,
                spinning_executor(style, "install"),
            );
            print_summary(&summary, style, cli.json)
        }
        Commands::Uninstall { dry_run: false } => {
            let result = run_uninstall_flow(
                enforce_native_architecture,
                load,
                resolve_manager_path,
                spinning_executor(style, "uninstall"),
            )?;
            match result {
                FlowResult::Terminated { exit_code } => Ok(exit_code),
                FlowResult::Completed(summary) => print_summary(&summary, style, cli.json),
            }
        }
        Commands::Detect => {
            let summary = run_operation_flow(
                OperationKind::Detect,
                &load()?,
                resolve_manager_path,
                run_captured,
            );
            print_summary(&summary, OutputStyle::Plain, cli.json)
        }
        Commands::Doctor => {
            let profile = load()?;
            let (patterns, manager_path) = resolve_for_profile(&profile);
            let probe = ArchitectureProbe::from_env();
            for line in
                format_doctor_lines(&profile, &patterns, manager_path.as_deref(), &probe, style)
            {
                println!("{line}");
            }
            Ok(EXIT_SUCCESS)
        }
    }
}

fn print_summary(summary: &RunSummary, style: OutputStyle, json: bool) -> Result<i32> {
    let lines = format_summary_lines(summary, style, json)?;
    let to_stdout = detection_writes_stdout(summary);
    for line in lines {
        if to_stdout {
            println!("{line}");
        } else {
            eprintln!("{line}");
        }
    }
    Ok(summary.exit_code())
}

fn print_dry_run(kind: OperationKind, profile: &AppProfile, style: OutputStyle) -> Result<i32> {
    let (_, manager_path) = resolve_for_profile(profile);
    for line in format_dry_run_lines(kind, profile, manager_path.as_deref(), style) {
        println!("{line}");
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests;
