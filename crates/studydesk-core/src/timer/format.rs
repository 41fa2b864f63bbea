//! Formatting helpers for the render layer.

/// `MM:SS`, zero-padded. Minutes widen past two digits only above 99.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Convert a 0.0 .. 1.0 fraction into a 0.0 .. 100.0 percentage.
pub fn progress_percent(fraction: f64) -> f64 {
    if fraction.is_nan() {
        return 0.0;
    }
    (fraction * 100.0).clamp(0.0, 100.0)
}

/// Fixed-width text progress bar, filled in proportion to `fraction`.
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((progress_percent(fraction) / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

pub fn completed_label(count: u32) -> String {
    let noun = if count == 1 { "pomodoro" } else { "pomodoros" };
    format!("Completed: {count} {noun}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_zero_padded() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(9), "00:09");
        assert_eq!(format_clock(300), "05:00");
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(3599), "59:59");
    }

    #[test]
    fn clock_widens_past_99_minutes() {
        assert_eq!(format_clock(100 * 60 + 5), "100:05");
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(progress_percent(0.5), 50.0);
        assert_eq!(progress_percent(1.5), 100.0);
        assert_eq!(progress_percent(-1.0), 0.0);
        assert_eq!(progress_percent(f64::NAN), 0.0);
    }

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(progress_bar(1.0, 4), "[####]");
        assert_eq!(progress_bar(0.5, 4), "[##--]");
        assert_eq!(progress_bar(0.0, 4), "[----]");
    }

    #[test]
    fn completed_label_pluralizes() {
        assert_eq!(completed_label(0), "Completed: 0 pomodoros");
        assert_eq!(completed_label(1), "Completed: 1 pomodoro");
        assert_eq!(completed_label(4), "Completed: 4 pomodoros");
    }
}
