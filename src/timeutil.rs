// Daily-time arithmetic shared by the countdown engine and the cron scanner.
// All values are seconds since local midnight.

use chrono::{Local, Timelike};

pub const TWELVE_HOURS: u32 = 12 * 3600;
pub const SECONDS_PER_DAY: u32 = 24 * 3600;

/// Clamp H:M:S into valid ranges and fold into seconds since midnight.
/// Result is always in [0, 86399].
pub fn to_daily_seconds(hour: i64, minute: i64, second: i64) -> u32 {
    let hours = hour.clamp(0, 23) as u32;
    let minutes = minute.clamp(0, 59) as u32;
    let seconds = second.clamp(0, 59) as u32;
    hours * 3600 + minutes * 60 + seconds
}

/// Seconds until the next occurrence of `target` within a repeating cycle.
///
/// The result is normalized into (0, cycle]: exact alignment maps to a whole
/// cycle, never 0, so loading the page at the target second does not read as
/// an instant achievement.
pub fn time_left_in_cycle(target: u32, now: u32, cycle: u32) -> u32 {
    let mut left = target as i64 - now as i64;
    let cycle = cycle as i64;
    while left <= 0 {
        left += cycle;
    }
    while left > cycle {
        left -= cycle;
    }
    left as u32
}

/// True when the remaining time passed from above `threshold` to at or below
/// it between two observations. Comparing consecutive readings instead of
/// testing for equality tolerates skipped seconds.
pub fn crossed(prev: Option<u32>, cur: u32, threshold: u32) -> bool {
    matches!(prev, Some(p) if p > threshold && cur <= threshold)
}

/// Format seconds for display: `HH:MM` at or above one hour, `MM:SS` below.
pub fn format_time(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}", hours, minutes)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Wall-clock seconds since local midnight.
pub fn current_daily_seconds() -> u32 {
    Local::now().num_seconds_from_midnight()
}
