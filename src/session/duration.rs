use std::time::Duration;

/// Render an elapsed time as `Xh Ym Zs`, starting at the largest non-zero
/// unit: `12s`, `5m 12s`, `1h 0m 3s`.
pub fn format_duration(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
