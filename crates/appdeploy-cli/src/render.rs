use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn resolve_output_style(stdout_is_tty: bool, _stderr_is_tty: bool) -> OutputStyle {
    if stdout_is_tty {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub(crate) fn current_output_style() -> OutputStyle {
    resolve_output_style(
        std::io::stdout().is_terminal(),
        std::io::stderr().is_terminal(),
    )
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "err" => "[ERR]",
        _ => "[..]",
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

pub(crate) fn render_section_header(style: OutputStyle, title: &str) -> Option<String> {
    match style {
        OutputStyle::Plain => None,
        OutputStyle::Rich => Some(colorize(section_style(), &format!("== {title} =="))),
    }
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

/// Spinner shown on stderr while the package manager runs. Plain output gets none.
pub(crate) struct WaitSpinner {
    progress_bar: Option<ProgressBar>,
}

impl WaitSpinner {
    pub(crate) fn start(style: OutputStyle, label: &str) -> Self {
        if style == OutputStyle::Plain {
            return Self { progress_bar: None };
        }

        let progress_bar = ProgressBar::new_spinner();
        if let Ok(spinner_style) =
            ProgressStyle::with_template("{spinner:.cyan.bold} {msg} {elapsed}")
        {
            progress_bar.set_style(spinner_style.tick_chars(spinner_tick_chars(label)));
        }
        progress_bar.set_message(label.to_string());
        progress_bar.enable_steady_tick(Duration::from_millis(80));
        Self {
            progress_bar: Some(progress_bar),
        }
    }

    pub(crate) fn finish(mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }
}

fn spinner_tick_chars(label: &str) -> &'static str {
    match label {
        "install" => ".oO@* ",
        "uninstall" => "\\|/- ",
        _ => "|/-\\ ",
    }
}
