use std::fmt;

use serde::{Deserialize, Serialize};

const INSTALL_FLAGS: &[&str] = &[
    "--scope=machine",
    "--silent",
    "--accept-package-agreements",
    "--accept-source-agreements",
    "--force",
];

const UNINSTALL_FLAGS: &[&str] = &[
    "--scope=machine",
    "--silent",
    "--accept-source-agreements",
    "--disable-interactivity",
    "--force",
];

const DETECT_FLAGS: &[&str] = &["--accept-source-agreements", "--disable-interactivity"];

/// The single package-manager action a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Install,
    Uninstall,
    Detect,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::Detect => "detect",
        }
    }

    /// Package-manager subcommand for this operation.
    pub fn verb(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::Detect => "list",
        }
    }

    /// Past-tense label used in the success summary.
    pub fn done_label(self) -> &'static str {
        match self {
            Self::Install => "Installed",
            Self::Uninstall => "Uninstalled",
            Self::Detect => "Detected",
        }
    }

    fn flags(self) -> &'static [&'static str] {
        match self {
            Self::Install => INSTALL_FLAGS,
            Self::Uninstall => UNINSTALL_FLAGS,
            Self::Detect => DETECT_FLAGS,
        }
    }

    /// Argument vector passed to the package manager, one element per argument.
    ///
    /// The layout is fixed: verb, exact match, id, then the operation flags.
    pub fn manager_args(self, app_id: &str) -> Vec<String> {
        let mut args = vec![
            self.verb().to_string(),
            "-e".to_string(),
            "--id".to_string(),
            app_id.to_string(),
        ];
        args.extend(self.flags().iter().map(|flag| flag.to_string()));
        args
    }

    /// Human-readable form of [`Self::manager_args`], with the id quoted.
    pub fn argument_string(self, app_id: &str) -> String {
        render_command_line(&self.manager_args(app_id))
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Joins arguments for display. Values (anything after the verb that is not a flag) are
/// wrapped in double quotes.
pub fn render_command_line(args: &[String]) -> String {
    args.iter()
        .enumerate()
        .map(|(index, arg)| {
            if index > 0 && !arg.starts_with('-') {
                format!("\"{arg}\"")
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
