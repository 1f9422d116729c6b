use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use appdeploy_core::{EXIT_FAILURE, EXIT_SUCCESS};

use crate::process::hide_window;

/// Set on the relaunched child so it never relaunches again.
pub const RELAUNCH_MARKER_ENV: &str = "APPDEPLOY_NATIVE_RELAUNCH";

const NATIVE_64BIT_ARCHITECTURES: &[&str] = &["AMD64", "ARM64", "IA64"];

/// Architecture indicators read from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchitectureProbe {
    /// `PROCESSOR_ARCHITECTURE`: architecture of the running process.
    pub process_arch: Option<String>,
    /// `PROCESSOR_ARCHITEW6432`: native host architecture, only set under WOW64.
    pub native_arch: Option<String>,
    pub relaunched: bool,
}

impl ArchitectureProbe {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<Lookup>(lookup: Lookup) -> Self
    where
        Lookup: Fn(&str) -> Option<String>,
    {
        Self {
            process_arch: lookup("PROCESSOR_ARCHITECTURE"),
            native_arch: lookup("PROCESSOR_ARCHITEW6432"),
            relaunched: lookup(RELAUNCH_MARKER_ENV).is_some_and(|value| value == "1"),
        }
    }

    fn is_32bit_process(&self) -> bool {
        self.process_arch
            .as_deref()
            .is_some_and(|arch| arch.eq_ignore_ascii_case("x86"))
    }

    /// True for a relaunched child that still runs as a 32-bit process.
    pub fn is_still_emulated(&self) -> bool {
        self.relaunched && self.is_32bit_process()
    }

    fn has_64bit_host(&self) -> bool {
        self.native_arch.as_deref().is_some_and(|arch| {
            NATIVE_64BIT_ARCHITECTURES
                .iter()
                .any(|native| arch.eq_ignore_ascii_case(native))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationDecision {
    Continue,
    Relaunch,
    Unsupported,
}

pub fn decide_elevation(probe: &ArchitectureProbe) -> ElevationDecision {
    if probe.relaunched || !probe.is_32bit_process() {
        return ElevationDecision::Continue;
    }
    if probe.has_64bit_host() {
        ElevationDecision::Relaunch
    } else {
        ElevationDecision::Unsupported
    }
}

/// What the guard tells the caller to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Proceed,
    Terminate { exit_code: i32 },
}

/// Re-executes the current binary with the original arguments.
///
/// Arguments are handed to the child as a vector, never through a shell, so they reach it
/// exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaunchPlan {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl RelaunchPlan {
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(RELAUNCH_MARKER_ENV, "1")
            .stdin(Stdio::null());
        hide_window(&mut command);
        command
    }
}

pub fn build_relaunch_plan(current_exe: &Path, args: &[OsString]) -> RelaunchPlan {
    RelaunchPlan {
        program: current_exe.to_path_buf(),
        args: args.to_vec(),
    }
}

/// Checks the running architecture and relaunches natively when needed.
///
/// This is a compatibility shim: a 32-bit build stays 32-bit when relaunched, so the child
/// only differs by carrying the relaunch marker. Must run before any other uninstall logic.
/// On [`GuardOutcome::Terminate`] the caller exits with the given code without doing
/// anything else.
pub fn enforce_native_architecture() -> Result<GuardOutcome> {
    let probe = ArchitectureProbe::from_env();
    enforce_native_architecture_with_executor(
        &probe,
        || {
            let current_exe =
                std::env::current_exe().context("failed to resolve current executable")?;
            let args = std::env::args_os().skip(1).collect::<Vec<_>>();
            Ok(build_relaunch_plan(&current_exe, &args))
        },
        |command| command.status().map(|status| status.code()),
    )
}

pub fn enforce_native_architecture_with_executor<Plan, RunCommand>(
    probe: &ArchitectureProbe,
    plan: Plan,
    mut run_command_executor: RunCommand,
) -> Result<GuardOutcome>
where
    Plan: FnOnce() -> Result<RelaunchPlan>,
    RunCommand: FnMut(&mut Command) -> io::Result<Option<i32>>,
{
    match decide_elevation(probe) {
        ElevationDecision::Continue => {
            if probe.is_still_emulated() {
                log::warn!(
                    "relaunched process still reports {}; continuing under 32-bit emulation",
                    probe.process_arch.as_deref().unwrap_or("x86")
                );
            }
            Ok(GuardOutcome::Proceed)
        }
        ElevationDecision::Unsupported => {
            log::warn!("32-bit host detected; uninstall requires a 64-bit host");
            Ok(GuardOutcome::Terminate {
                exit_code: EXIT_SUCCESS,
            })
        }
        ElevationDecision::Relaunch => {
            let plan = plan()?;
            log::info!("relaunching {} for the native host", plan.program.display());
            let mut command = plan.command();
            let code = run_command_executor(&mut command).with_context(|| {
                format!("failed to relaunch through {}", plan.program.display())
            })?;
            let exit_code = code.unwrap_or(EXIT_FAILURE);
            log::debug!("native relaunch exited with {exit_code}");
            Ok(GuardOutcome::Terminate { exit_code })
        }
    }
}
