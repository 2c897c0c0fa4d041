//! UI helpers for CLI display.

use console::{style, StyledObject};

use phasetrack_core::StepStatus;

/// Check if color output is disabled via `NO_COLOR` env var.
#[must_use]
pub fn is_color_disabled() -> bool {
    std::env::var("NO_COLOR").is_ok()
}

/// Print a styled header.
pub fn print_header(text: &str) {
    if is_color_disabled() {
        println!("=== {text} ===");
    } else {
        println!("{}", style(format!("=== {text} ===")).bold().cyan());
    }
}

/// Print a success message.
pub fn print_success(text: &str) {
    if is_color_disabled() {
        println!("[OK] {text}");
    } else {
        println!("{} {text}", style("[OK]").green().bold());
    }
}

/// Print an error message.
pub fn print_error(text: &str) {
    if is_color_disabled() {
        eprintln!("[ERROR] {text}");
    } else {
        eprintln!("{} {text}", style("[ERROR]").red().bold());
    }
}

/// Marker glyph for a step line.
#[must_use]
pub fn status_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Done => "✓",
        StepStatus::Active => "→",
        StepStatus::Pending => "·",
    }
}

/// Step marker, colored unless `NO_COLOR` is set.
#[must_use]
pub fn styled_marker(status: StepStatus) -> String {
    let marker = status_marker(status);
    if is_color_disabled() {
        return marker.to_string();
    }
    let styled: StyledObject<&str> = match status {
        StepStatus::Done => style(marker).green(),
        StepStatus::Active => style(marker).cyan().bold(),
        StepStatus::Pending => style(marker).dim(),
    };
    styled.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_check_does_not_panic() {
        let _ = is_color_disabled();
    }

    #[test]
    fn print_functions_do_not_panic() {
        print_header("Validating links");
        print_success("");
        print_error("Something went wrong");
        print_header(&"A".repeat(1000));
    }

    #[test]
    fn markers_are_distinct() {
        let all = [StepStatus::Pending, StepStatus::Active, StepStatus::Done];
        let markers: Vec<_> = all.iter().map(|s| status_marker(*s)).collect();
        assert_eq!(markers, vec!["·", "→", "✓"]);
    }

    #[test]
    fn styled_marker_contains_glyph() {
        assert!(styled_marker(StepStatus::Done).contains('✓'));
    }
}
