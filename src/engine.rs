// The scheduled countdown state machine: Idle -> Running -> Achieved ->
// Running (auto-restart), driven by a 1-second tick.
//
// Host capabilities (system notifications, alarm audio) are injected traits
// so the machine runs and tests without a browser. Threshold detection
// compares the previous tick's remaining time against the current one, so a
// skipped second (clock drift, tab backgrounding) cannot swallow an alert.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{mpsc, Mutex};

use crate::models::AlarmType;
use crate::timeutil::{crossed, time_left_in_cycle, TWELVE_HOURS};

/// 15-minute warning threshold, in seconds left.
pub const PRE_15_TARGET: u32 = 15 * 60;
/// 5-minute warning threshold, in seconds left.
pub const PRE_5_TARGET: u32 = 5 * 60;
/// How long the 15-minute alarm keeps sounding.
pub const ALARM_DURATION: u64 = 15;
/// How long the achievement indicator stays up.
pub const ACHIEVEMENT_DISPLAY: u64 = 10;
/// Pause between clearing the achievement and restarting the cycle.
pub const AUTO_RESTART_DELAY: u64 = 5 * 60;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PermissionState {
    /// The user has not been asked yet.
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// Host notification capability. Permission requests are fire-and-forget;
/// denial only suppresses system notifications, never the countdown.
pub trait NotificationSink: Send {
    fn permission(&self) -> PermissionState;
    fn request_permission(&mut self);
    fn notify(&mut self, title: &str, body: &str);
}

/// Host audio capability.
pub trait AudioSink: Send {
    fn play_alarm(&mut self, alarm: AlarmType);
    fn stop_alarm(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Achieved,
}

/// Which crossings have fired in the current cycle, plus the previous tick's
/// remaining time for crossing detection.
#[derive(Clone, Copy, Debug, Default)]
struct CycleMarkers {
    fired_fifteen: bool,
    fired_five: bool,
    fired_final: bool,
    prev_seconds_left: Option<u32>,
}

impl CycleMarkers {
    /// Markers for the dead zone between an achievement and the auto-restart:
    /// everything already fired, nothing may fire again.
    fn exhausted() -> CycleMarkers {
        CycleMarkers {
            fired_fifteen: true,
            fired_five: true,
            fired_final: true,
            prev_seconds_left: None,
        }
    }
}

/// Every pending deadline the engine owns, in engine ticks. `clear` is the
/// single teardown point; stop and target switches must leave no zombie
/// timer behind.
#[derive(Clone, Copy, Debug, Default)]
struct PendingTimers {
    alarm_until: Option<u64>,
    achievement_until: Option<u64>,
    restart_at: Option<u64>,
}

impl PendingTimers {
    fn clear(&mut self) {
        *self = PendingTimers::default();
    }
}

pub struct ScheduledTimer<N: NotificationSink, A: AudioSink> {
    state: EngineState,
    /// Seconds-since-midnight of the active schedule, None when all disabled.
    target: Option<u32>,
    seconds_left: u32,
    show_modal: bool,
    markers: CycleMarkers,
    timers: PendingTimers,
    ticks: u64,
    alarm_type: AlarmType,
    notifications: N,
    audio: A,
}

/// The countdown never reads 0 (`time_left_in_cycle` is in (0, cycle]), so
/// reaching the target shows up as the remaining time jumping back up.
fn crossed_zero(prev: Option<u32>, cur: u32) -> bool {
    matches!(prev, Some(p) if cur > p)
}

impl<N: NotificationSink, A: AudioSink> ScheduledTimer<N, A> {
    pub fn new(notifications: N, audio: A, alarm_type: AlarmType) -> ScheduledTimer<N, A> {
        ScheduledTimer {
            state: EngineState::Idle,
            target: None,
            seconds_left: 0,
            show_modal: false,
            markers: CycleMarkers::default(),
            timers: PendingTimers::default(),
            ticks: 0,
            alarm_type,
            notifications,
            audio,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state != EngineState::Idle
    }

    pub fn is_achieved(&self) -> bool {
        self.state == EngineState::Achieved
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn show_modal(&self) -> bool {
        self.show_modal
    }

    /// Point the engine at a new active schedule. A running engine is stopped
    /// and restarted against the new target; it never keeps ticking the old
    /// one. `None` (all schedules disabled) forces Idle.
    pub fn set_target(&mut self, target: Option<u32>, now: u32) {
        if self.target == target {
            return;
        }
        let was_running = self.is_running();
        self.stop();
        self.target = target;
        match target {
            Some(seconds) => {
                debug!("Engine target switched to {}s", seconds);
                if was_running {
                    self.start(now);
                }
            }
            None => info!("All schedules disabled, engine idle"),
        }
    }

    /// Reset the cycle and begin ticking. The first remaining time is
    /// computed here, synchronously, so the display is never stale.
    pub fn start(&mut self, now: u32) {
        let Some(target) = self.target else {
            warn!("Engine start requested without an active schedule");
            self.state = EngineState::Idle;
            return;
        };

        if self.notifications.permission() == PermissionState::Unknown {
            self.notifications.request_permission();
        }

        self.timers.clear();
        self.show_modal = false;
        self.seconds_left = time_left_in_cycle(target, now, TWELVE_HOURS);
        self.markers = CycleMarkers {
            prev_seconds_left: Some(self.seconds_left),
            ..CycleMarkers::default()
        };
        self.state = EngineState::Running;
        info!("Engine running, {}s until target", self.seconds_left);
    }

    /// Halt ticking and tear down every pending deadline.
    pub fn stop(&mut self) {
        self.timers.clear();
        self.audio.stop_alarm();
        self.show_modal = false;
        self.state = EngineState::Idle;
    }

    /// Acknowledge the 15-minute modal: silence the alarm, keep counting.
    pub fn modal_ok(&mut self) {
        self.timers.alarm_until = None;
        self.audio.stop_alarm();
        self.show_modal = false;
    }

    /// Advance the machine by one second of wall time. `now` is seconds since
    /// local midnight. Order within a tick: display update, achievement,
    /// 15-minute check, 5-minute check.
    pub fn tick(&mut self, now: u32) {
        self.ticks += 1;
        let Some(target) = self.target else {
            return;
        };

        let seconds_left = time_left_in_cycle(target, now, TWELVE_HOURS);
        self.seconds_left = seconds_left;

        if self.state == EngineState::Idle {
            return;
        }

        self.expire_deadlines(now);

        let prev = self.markers.prev_seconds_left;
        self.markers.prev_seconds_left = Some(seconds_left);

        if !self.markers.fired_final && crossed_zero(prev, seconds_left) {
            self.fire_achievement();
            return;
        }
        if self.state == EngineState::Achieved {
            return;
        }

        if !self.markers.fired_fifteen && crossed(prev, seconds_left, PRE_15_TARGET) {
            self.fire_fifteen();
        }
        if !self.markers.fired_five && crossed(prev, seconds_left, PRE_5_TARGET) {
            self.fire_five();
        }
    }

    fn expire_deadlines(&mut self, now: u32) {
        if let Some(until) = self.timers.alarm_until {
            if self.ticks >= until {
                self.timers.alarm_until = None;
                self.audio.stop_alarm();
                self.show_modal = false;
            } else {
                // keep sounding through the alarm window
                self.audio.play_alarm(self.alarm_type);
            }
        }

        if let Some(until) = self.timers.achievement_until {
            if self.ticks >= until {
                self.timers.achievement_until = None;
                self.state = EngineState::Running;
                self.markers = CycleMarkers::exhausted();
                self.timers.restart_at = Some(self.ticks + AUTO_RESTART_DELAY);
                debug!("Achievement window over, restart in {}s", AUTO_RESTART_DELAY);
            }
        }

        if let Some(at) = self.timers.restart_at {
            if self.ticks >= at {
                self.timers.restart_at = None;
                self.stop();
                self.start(now);
            }
        }
    }

    fn notify(&mut self, body: &str) {
        if self.notifications.permission() == PermissionState::Granted {
            self.notifications.notify("Timer", body);
        }
    }

    fn fire_fifteen(&mut self) {
        info!("15-minute threshold crossed");
        self.markers.fired_fifteen = true;
        self.show_modal = true;
        self.notify("15 minutes remaining");
        self.audio.play_alarm(self.alarm_type);
        self.timers.alarm_until = Some(self.ticks + ALARM_DURATION);
    }

    fn fire_five(&mut self) {
        info!("5-minute threshold crossed");
        self.markers.fired_five = true;
        self.notify("5 minutes remaining");
        self.audio.play_alarm(self.alarm_type);
    }

    fn fire_achievement(&mut self) {
        info!("Target time reached");
        self.markers.fired_final = true;
        self.state = EngineState::Achieved;
        self.notify("Target time reached");
        self.audio.play_alarm(self.alarm_type);
        self.timers.achievement_until = Some(self.ticks + ACHIEVEMENT_DISPLAY);
    }
}

/// Drive an engine with a 1-second interval until cancelled. A single task
/// owns the tick, so overlapping ticks are impossible; cancellation stops the
/// engine synchronously before the loop exits.
pub async fn run_engine<N, A, F>(
    engine: Arc<Mutex<ScheduledTimer<N, A>>>,
    mut now_fn: F,
    mut cancel: mpsc::Receiver<bool>,
) where
    N: NotificationSink,
    A: AudioSink,
    F: FnMut() -> u32 + Send,
{
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    // the first interval tick completes immediately; start() already computed
    // the initial remaining time
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                engine.lock().await.tick(now_fn());
            }
            _ = cancel.recv() => {
                engine.lock().await.stop();
                debug!("Engine loop cancelled");
                break;
            }
        }
    }
}
