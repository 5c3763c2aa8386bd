// Schedule derivation and active-schedule selection.
//
// One TargetTime always yields two daily occurrences 12 hours apart; the
// engine tracks whichever enabled occurrence comes up next.

use crate::models::TargetTime;
use crate::timeutil::{time_left_in_cycle, SECONDS_PER_DAY};
pub use crate::types::EnabledMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    /// "HH:MM:SS" display label.
    pub label: String,
    pub seconds: u32,
}

impl Schedule {
    fn at(seconds: u32) -> Schedule {
        let label = format!(
            "{:02}:{:02}:{:02}",
            seconds / 3600,
            (seconds % 3600) / 60,
            seconds % 60
        );
        Schedule { label, seconds }
    }
}

/// The target time and its +12h twin, ascending by seconds.
pub fn derive_schedules(target: &TargetTime) -> [Schedule; 2] {
    let twin = TargetTime {
        hour: (target.hour.clamp(0, 23) + 12) % 24,
        minute: target.minute,
        second: target.second,
    };

    let mut pair = [Schedule::at(target.seconds()), Schedule::at(twin.seconds())];
    if pair[0].seconds > pair[1].seconds {
        pair.swap(0, 1);
    }
    pair
}

/// Insert missing schedule keys as enabled. Without this a stale map could
/// leave every new schedule disabled and the countdown would never start.
pub fn ensure_schedule_keys(enabled: &mut EnabledMap, schedules: &[Schedule]) -> bool {
    let mut changed = false;
    for schedule in schedules {
        let key = schedule.seconds.to_string();
        if !enabled.contains_key(&key) {
            enabled.insert(key, true);
            changed = true;
        }
    }
    changed
}

fn is_enabled(enabled: &EnabledMap, schedule: &Schedule) -> bool {
    enabled
        .get(&schedule.seconds.to_string())
        .copied()
        .unwrap_or(true)
}

/// The enabled schedule whose next occurrence (within 24h of `now`) is
/// soonest, or None when every schedule is disabled. A zero delta counts as a
/// full day away, matching `time_left_in_cycle`. Equidistant candidates are
/// degenerate (both occurrences coincide); the ascending-order first wins.
pub fn active_schedule(
    schedules: &[Schedule],
    enabled: &EnabledMap,
    now: u32,
) -> Option<Schedule> {
    schedules
        .iter()
        .filter(|s| is_enabled(enabled, s))
        .min_by_key(|s| time_left_in_cycle(s.seconds, now, SECONDS_PER_DAY))
        .cloned()
}
