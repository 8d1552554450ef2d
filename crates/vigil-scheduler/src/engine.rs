//! The dispatch loop: sole owner of the task list, sole origin of admission
//! decisions, and the serialization point for scheduled and on-demand
//! launches.
//!
//! One `tokio::select!` consumes three event sources: the fixed 5 s tick,
//! the on-demand trigger channel from the HTTP boundary, and a shutdown
//! watch. Because both launch paths run on this single loop, reads of the
//! running flags during admission can never race a concurrent decision.
//!
//! The loop has no failure exit: a bad config file or a bad task keeps the
//! previous in-memory state and is retried on the next tick.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use chrono::{Duration, NaiveTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use vigil_core::config::{
    self, CommandSpec, Config, FALLBACK_INTERVAL_SECS, FALLBACK_TIMEOUT_SECS, MAX_SANE_SECS,
    MIN_SANE_SECS,
};
use vigil_core::parse_duration;

use crate::{
    exec,
    select::next_runnable,
    task::{RunState, Task},
};

pub struct Dispatcher {
    config_path: PathBuf,
    overlay_path: Option<PathBuf>,
    tasks: Vec<Task>,
    variables: HashMap<String, String>,
    last_hash: String,
    trigger_rx: mpsc::Receiver<String>,
}

impl Dispatcher {
    pub fn new(
        config_path: PathBuf,
        overlay_path: Option<PathBuf>,
        trigger_rx: mpsc::Receiver<String>,
    ) -> Self {
        Self {
            config_path,
            overlay_path,
            tasks: Vec::new(),
            variables: HashMap::new(),
            last_hash: String::new(),
            trigger_rx,
        }
    }

    /// Main event loop. Runs until `shutdown` broadcasts `true`; under
    /// normal operation that never happens.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.reload_config();
        info!("dispatcher started");

        let mut tick = tokio::time::interval(std::time::Duration::from_secs(config::TICK_SECS));
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Some(task) = next_runnable(&self.tasks, Utc::now()) {
                        exec::launch(task, &self.variables);
                    }
                    self.reload_config();
                }
                Some(name) = self.trigger_rx.recv() => {
                    self.run_now(&name);
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("dispatcher shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// On-demand trigger: an explicit override of scheduling policy. The
    /// due-check and pool exclusion are bypassed; only the running-flag
    /// reentry guard inside `launch` still applies.
    fn run_now(&self, name: &str) {
        match self.tasks.iter().find(|t| t.name == name) {
            Some(task) => {
                info!(task = %name, "on-demand trigger");
                exec::launch(task, &self.variables);
            }
            None => error!(task = %name, "on-demand trigger for unknown task"),
        }
    }

    /// Reload base + overlay and fold the result into the live task set.
    /// Any load failure keeps the previous state untouched. The effective
    /// config is logged only when its content hash changes.
    fn reload_config(&mut self) {
        let mut cfg = match Config::load(&self.config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(path = %self.config_path.display(), error = %e,
                       "config load failed; keeping previous state");
                return;
            }
        };

        if let Some(overlay_path) = &self.overlay_path {
            match Config::load(overlay_path) {
                Ok(overlay) => cfg.overlay(overlay),
                Err(e) => error!(path = %overlay_path.display(), error = %e,
                                 "overlay load failed; applying base config only"),
            }
        }

        self.apply(&cfg);

        let hash = cfg.hash_signature();
        if hash != self.last_hash {
            self.last_hash = hash;
            info!(variables = ?cfg.variables, "configuration changed");
            info!(enabled = %self.enabled_list(), "enabled tasks");
        }
    }

    /// Fold a merged config into the live task set. Existing tasks are
    /// updated in place by name so `last_run` and an in-flight running flag
    /// survive every reload; destroying and recreating a task would cause a
    /// spurious run.
    fn apply(&mut self, cfg: &Config) {
        self.variables = cfg.variables.clone();

        let enabled = cfg.effective_enabled();
        for spec in &cfg.commands {
            let fresh = build_task(spec, enabled.get(spec.name.as_str()).copied().unwrap_or(false));
            match self.tasks.iter_mut().find(|t| t.name == fresh.name) {
                Some(existing) => existing.refresh_from(fresh),
                None => self.tasks.push(fresh),
            }
        }
    }

    fn enabled_list(&self) -> String {
        let names: Vec<&str> = self
            .tasks
            .iter()
            .filter(|t| t.enabled)
            .map(|t| t.name.as_str())
            .collect();
        names.join(", ")
    }
}

/// Build a task from its config spec. Validation is soft throughout: parse
/// failures fall back to documented defaults and out-of-range values are
/// logged but still applied. A config mistake must never take the
/// dispatcher down.
fn build_task(spec: &CommandSpec, enabled: bool) -> Task {
    let interval = parse_duration(&spec.interval).unwrap_or_else(|e| {
        error!(task = %spec.name, error = %e, "bad interval; falling back to 1h");
        Duration::seconds(FALLBACK_INTERVAL_SECS)
    });
    let timeout = parse_duration(&spec.timeout).unwrap_or_else(|e| {
        error!(task = %spec.name, error = %e, "bad timeout; falling back to 8h");
        Duration::seconds(FALLBACK_TIMEOUT_SECS)
    });

    let sane = Duration::seconds(MIN_SANE_SECS)..=Duration::seconds(MAX_SANE_SECS);
    if !sane.contains(&interval) {
        warn!(task = %spec.name, interval = %spec.interval, "interval outside [5s, 24h]");
    }
    if !sane.contains(&timeout) {
        warn!(task = %spec.name, timeout = %spec.timeout, "timeout outside [5s, 24h]");
    }
    if spec.name.trim().is_empty() {
        warn!(command = %spec.command, "task has an empty name");
    }
    if spec.command.trim().is_empty() {
        warn!(task = %spec.name, "task has an empty command");
    }

    // A start time only means something for daily tasks, and only when the
    // interval actually parsed as 24h.
    let mut start_time = NaiveTime::MIN;
    if interval == Duration::hours(24) && !spec.start_time.is_empty() {
        match parse_duration(&spec.start_time) {
            Ok(offset) => {
                let secs = offset.num_seconds().rem_euclid(24 * 3600) as u32;
                start_time =
                    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or(NaiveTime::MIN);
            }
            Err(e) => error!(task = %spec.name, error = %e, "bad start time for daily task"),
        }
    }

    Task {
        name: spec.name.clone(),
        pool: spec.pool.clone(),
        enabled,
        interval,
        timeout: timeout.to_std().unwrap_or(std::time::Duration::from_secs(
            FALLBACK_TIMEOUT_SECS as u64,
        )),
        start_time,
        exec: spec.command.clone(),
        params: spec.params.clone(),
        state: Arc::new(RunState::default()),
    }
}
