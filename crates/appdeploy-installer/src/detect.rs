use appdeploy_core::OperationOutcome;

use crate::process::CapturedOutput;

/// A `list` query detects the application when it exits 0 and one table row carries the id
/// as a whole column. Ids that merely contain it, such as `Foo.BarExtra` for `Foo.Bar`, do
/// not count.
pub fn classify_detection(app_id: &str, captured: &CapturedOutput) -> OperationOutcome {
    if captured.code != Some(0) {
        return OperationOutcome::from_exit_code(captured.code);
    }

    let listed = captured.stdout.lines().any(|line| {
        line.split_whitespace()
            .any(|column| column.eq_ignore_ascii_case(app_id))
    });
    if listed {
        OperationOutcome::Success
    } else {
        OperationOutcome::Failure {
            code: Some(0),
            message: Some("package not listed".to_string()),
        }
    }
}
