//! Formatting helpers shared by the supervisor and its front ends.

/// Formats seconds as HH:MM:SS (e.g., 3725.0 -> "01:02:05"). Returns "??:??:??" for invalid inputs.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 || !seconds.is_finite() {
        return "??:??:??".to_string();
    }

    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Percentage of `total` covered by `current`, clamped to 0..=100.
/// Returns None when the total is unknown or not positive.
#[must_use]
pub fn progress_percent(current_secs: f64, total_secs: Option<f64>) -> Option<f64> {
    let total = total_secs.filter(|t| *t > 0.0 && t.is_finite())?;
    Some((current_secs / total * 100.0).clamp(0.0, 100.0))
}

/// Remaining wall-clock seconds at the given encode speed, if computable.
#[must_use]
pub fn eta_seconds(current_secs: f64, total_secs: Option<f64>, speed: f64) -> Option<f64> {
    let total = total_secs?;
    if speed > 0.01 && total > current_secs {
        Some((total - current_secs) / speed)
    } else {
        None
    }
}
