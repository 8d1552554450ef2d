//! The task record and its readiness/priority model.
//!
//! Every method that depends on the current time takes an explicit `now` so
//! the whole model is testable without a real clock.
//!
//! Tasks with an interval of exactly 24 hours are "daily" tasks and get
//! window semantics: they must start within 2 hours of their start time or
//! they skip that day entirely. Everything else is a rolling-interval task,
//! due whenever `now - last_run >= interval`. The 24h marker is a sharp
//! edge inherited from the config format — a rolling task configured with
//! "24h" silently becomes daily.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use vigil_core::config::DAILY_WINDOW_SECS;

/// Runtime state shared between the dispatch loop and the execution
/// supervisor. These are the only two fields ever written off the dispatch
/// loop: the supervisor releases `running` and stamps `last_run`.
#[derive(Debug, Default)]
pub struct RunState {
    running: AtomicBool,
    last_run: Mutex<Option<DateTime<Utc>>>,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Attempt the false→true transition of the running flag. Returns false
    /// if an instance is already in flight. This CAS is the reentry guard
    /// for both scheduled and on-demand launches.
    pub fn try_acquire(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the running flag. The single release point: executed on every
    /// supervisor exit path, including failed kills.
    pub fn release(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        *self.last_run.lock().unwrap()
    }

    pub fn stamp_last_run(&self, at: DateTime<Utc>) {
        *self.last_run.lock().unwrap() = Some(at);
    }
}

/// One schedulable unit. Scheduling fields are owned and written exclusively
/// by the dispatch loop; `state` is the shared runtime half.
///
/// At most one task per pool may run at any one time. An empty pool string
/// means the task belongs to no exclusion group.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub pool: String,
    pub enabled: bool,
    /// Exactly 24h classifies the task as daily (see module docs).
    pub interval: Duration,
    /// Hard wall-clock cap on a spawned instance.
    pub timeout: std::time::Duration,
    /// Time of day the daily window opens. Ignored for rolling tasks.
    pub start_time: NaiveTime,
    pub exec: String,
    pub params: Vec<String>,
    pub state: Arc<RunState>,
}

impl Task {
    pub fn is_daily(&self) -> bool {
        self.interval == Duration::hours(24)
    }

    /// The most recent instant at which the wall clock crossed `start_time`:
    /// today if `now`'s offset from midnight has reached it, else yesterday.
    pub fn most_recent_crossing(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now_offset = Duration::seconds(now.time().num_seconds_from_midnight() as i64);
        let start_offset = Duration::seconds(self.start_time.num_seconds_from_midnight() as i64);
        let today = now - now_offset + start_offset;
        if now_offset >= start_offset {
            today
        } else {
            today - Duration::hours(24)
        }
    }

    /// Whether the task is ready to run at `now`. Disabled tasks and tasks
    /// with an in-flight instance are never due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled || self.state.is_running() {
            return false;
        }
        let last_run = self.state.last_run();
        if self.is_daily() {
            let window = Duration::seconds(DAILY_WINDOW_SECS);
            let in_window = now - self.most_recent_crossing(now) < window;
            let not_run_since = last_run.map_or(true, |lr| now - lr > window);
            in_window && not_run_since
        } else {
            last_run.map_or(true, |lr| now - lr >= self.interval)
        }
    }

    /// How far past its slot the task is. Negative means not yet due. A
    /// rolling task that has never run is maximally overdue.
    pub fn overdue_by(&self, now: DateTime<Utc>) -> Duration {
        match self.state.last_run() {
            Some(last_run) => now - last_run - self.interval,
            None if self.is_daily() => now - self.most_recent_crossing(now),
            None => Duration::MAX,
        }
    }

    /// Adopt the scheduling fields of a freshly built task while keeping
    /// this task's runtime state. This is how config reloads update a live
    /// task without losing `last_run` or an in-flight `running` flag.
    pub fn refresh_from(&mut self, fresh: Task) {
        self.pool = fresh.pool;
        self.enabled = fresh.enabled;
        self.interval = fresh.interval;
        self.timeout = fresh.timeout;
        self.start_time = fresh.start_time;
        self.exec = fresh.exec;
        self.params = fresh.params;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn daily_at(hour: u32, minute: u32) -> Task {
        Task {
            name: "daily".to_string(),
            pool: String::new(),
            enabled: true,
            interval: Duration::hours(24),
            timeout: std::time::Duration::from_secs(3600),
            start_time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
            exec: "/bin/true".to_string(),
            params: Vec::new(),
            state: Arc::new(RunState::default()),
        }
    }

    fn rolling(interval: Duration) -> Task {
        Task {
            interval,
            start_time: NaiveTime::MIN,
            ..daily_at(0, 0)
        }
    }

    fn present() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 7, 15, 5, 3, 20).unwrap()
    }

    #[test]
    fn daily_window_never_run() {
        let task = daily_at(5, 3);
        let now = present();

        assert!(!task.is_due(now - Duration::hours(5)));
        assert!(!task.is_due(now - Duration::minutes(5)));
        assert!(task.is_due(now));
        assert!(task.is_due(now + Duration::minutes(5)));
        assert!(!task.is_due(now + Duration::hours(5))); // window expired
    }

    #[test]
    fn daily_not_due_after_running_in_window() {
        let task = daily_at(5, 3);
        let now = present();
        assert!(task.is_due(now));

        // Run at the crossing: due again only after the next day's crossing.
        task.state.stamp_last_run(task.most_recent_crossing(now));
        assert!(!task.is_due(now));
        assert!(!task.is_due(now + Duration::minutes(30)));
        assert!(task.is_due(now + Duration::hours(24)));
    }

    #[test]
    fn daily_due_when_last_run_was_yesterday() {
        let task = daily_at(5, 3);
        let now = present();
        task.state.stamp_last_run(now - Duration::hours(24));
        assert!(task.is_due(now));
    }

    #[test]
    fn crossing_picks_today_or_yesterday() {
        let task = daily_at(5, 3);
        let now = present();

        let today = Utc.with_ymd_and_hms(2015, 7, 15, 5, 3, 0).unwrap();
        assert_eq!(task.most_recent_crossing(now), today);
        assert_eq!(
            task.most_recent_crossing(now - Duration::hours(5)),
            today - Duration::hours(24)
        );
    }

    #[test]
    fn rolling_due_exactly_at_interval_boundary() {
        let task = rolling(Duration::minutes(30));
        let now = present();
        task.state.stamp_last_run(now);

        assert!(!task.is_due(now));
        assert!(!task.is_due(now + Duration::minutes(29)));
        assert!(task.is_due(now + Duration::minutes(30)));
        assert!(task.is_due(now + Duration::hours(5)));
    }

    #[test]
    fn rolling_never_run_is_due_immediately() {
        let task = rolling(Duration::minutes(30));
        assert!(task.is_due(present()));
        assert_eq!(task.overdue_by(present()), Duration::MAX);
    }

    #[test]
    fn disabled_or_running_is_never_due() {
        let mut task = rolling(Duration::minutes(30));
        task.enabled = false;
        assert!(!task.is_due(present()));

        task.enabled = true;
        assert!(task.state.try_acquire());
        assert!(!task.is_due(present()));

        task.state.release();
        assert!(task.is_due(present()));
    }

    #[test]
    fn overdue_metric() {
        let task = rolling(Duration::minutes(30));
        let now = present();
        task.state.stamp_last_run(now - Duration::minutes(45));
        assert_eq!(task.overdue_by(now), Duration::minutes(15));

        task.state.stamp_last_run(now - Duration::minutes(10));
        assert_eq!(task.overdue_by(now), Duration::minutes(-20));
    }

    #[test]
    fn acquire_is_exclusive() {
        let state = RunState::default();
        assert!(state.try_acquire());
        assert!(!state.try_acquire());
        state.release();
        assert!(state.try_acquire());
    }
}
