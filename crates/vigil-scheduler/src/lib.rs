//! `vigil-scheduler` — the scheduling and execution engine.
//!
//! # Overview
//!
//! A single dispatch loop ([`Dispatcher`]) ticks every 5 seconds, asks the
//! admission selector ([`next_runnable`]) for the one best runnable task,
//! and hands it to the execution supervisor ([`exec::launch`]), which runs
//! the external process off-loop with a hard timeout and a process-tree
//! kill. On-demand triggers arrive over a channel and are serialized through
//! the same loop.
//!
//! # Task classes
//!
//! | Class    | Marker            | Due when                                      |
//! |----------|-------------------|-----------------------------------------------|
//! | Daily    | interval == 24h   | inside a 2h window after its start time       |
//! | Rolling  | any other interval| `now - last_run >= interval`                  |
//!
//! A daily task that misses its window is skipped for the day; it never
//! runs late and never accumulates backlog.

pub mod engine;
pub mod exec;
pub mod kill;
pub mod select;
pub mod task;

pub use engine::Dispatcher;
pub use select::next_runnable;
pub use task::{RunState, Task};
