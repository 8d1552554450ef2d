//! Admission: pick the single best runnable task per dispatch tick.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::task::Task;

/// Return the highest-priority task that is due, not running, and whose pool
/// is free — or `None` when nothing qualifies.
///
/// Ranking: any daily task outranks any rolling task, then the most overdue
/// wins within a class. Daily tasks have a hard expiry window, so they must
/// never lose their slot to a chronically overdue rolling task.
///
/// Reading the running flags twice (once for the busy-pool set, once per
/// candidate) is safe because this function only ever runs on the dispatch
/// loop, the one place a flag can go from false to true. A flag flipping to
/// false concurrently merely makes the decision conservative.
pub fn next_runnable(tasks: &[Task], now: DateTime<Utc>) -> Option<&Task> {
    let busy_pools: HashSet<&str> = tasks
        .iter()
        .filter(|t| t.state.is_running() && !t.pool.is_empty())
        .map(|t| t.pool.as_str())
        .collect();

    tasks
        .iter()
        .filter(|t| !t.state.is_running() && t.is_due(now))
        .filter(|t| t.pool.is_empty() || !busy_pools.contains(t.pool.as_str()))
        .max_by(|a, b| {
            a.is_daily()
                .cmp(&b.is_daily())
                .then_with(|| a.overdue_by(now).cmp(&b.overdue_by(now)))
        })
}
