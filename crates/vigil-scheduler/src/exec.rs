//! Execution supervisor: spawns a task's external process, enforces its
//! timeout, and guarantees the running flag is released on every exit path.
//!
//! [`launch`] flips the running flag before returning, then does everything
//! else on its own tokio task — a hung job can never stall the dispatch
//! loop. There is no shell in the invocation path: `exec` is the literal
//! executable and each param is one argv entry.

use std::{collections::HashMap, process::Stdio, sync::Arc};

use chrono::Utc;
use tokio::{io::AsyncReadExt, process::Command, time::sleep};
use tracing::{debug, error, info};

use crate::{kill::kill_tree, task::Task};

/// Replace every `!NAME` token in `param` with its mapped value. Unmatched
/// tokens pass through verbatim — substitution is best-effort, never an
/// error. Longer names are substituted first so `!FOO` can never clobber a
/// `!FOO_BAR` occurrence.
pub fn substitute_variables(param: &str, variables: &HashMap<String, String>) -> String {
    let mut keys: Vec<&String> = variables.keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let mut out = param.to_string();
    for key in keys {
        out = out.replace(&format!("!{key}"), &variables[key]);
    }
    out
}

/// Launch `task`'s process with `variables` substituted into its params.
///
/// The running flag is acquired synchronously — the very next admission pass
/// must already see it, and the same CAS doubles as the reentry guard for
/// on-demand triggers. If an instance is in flight the launch is skipped.
pub fn launch(task: &Task, variables: &HashMap<String, String>) {
    if !task.state.try_acquire() {
        debug!(task = %task.name, "already running; launch skipped");
        return;
    }

    let name = task.name.clone();
    let exec = task.exec.clone();
    let params: Vec<String> = task
        .params
        .iter()
        .map(|p| substitute_variables(p, variables))
        .collect();
    let timeout = task.timeout;
    let state = Arc::clone(&task.state);

    tokio::spawn(async move {
        state.stamp_last_run(Utc::now());
        info!(task = %name, exec = %exec, params = ?params, "running");
        supervise(&name, &exec, &params, timeout).await;
        state.release();
    });
}

/// Run the process to completion or timeout. All failures are logged here
/// and absorbed — nothing propagates back toward the dispatch loop.
async fn supervise(name: &str, exec: &str, params: &[String], timeout: std::time::Duration) {
    let mut cmd = Command::new(exec);
    cmd.args(params)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    cmd.process_group(0); // own group leader, so kill_tree can signal -pid

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            error!(task = %name, exec = %exec, error = %e, "failed to spawn");
            return;
        }
    };
    let pid = child.id();

    // Drain both pipes concurrently so a chatty child never blocks on a
    // full pipe while we wait on it.
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_buf = tokio::spawn(read_all(stdout));
    let stderr_buf = tokio::spawn(read_all(stderr));

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => {
                // Success logs are just spammy.
                debug!(task = %name, "finished");
            }
            Ok(status) => {
                let out = stdout_buf.await.unwrap_or_default();
                let err = stderr_buf.await.unwrap_or_default();
                error!(
                    task = %name,
                    %status,
                    stdout = %tail(&out),
                    stderr = %tail(&err),
                    "exited with failure",
                );
            }
            Err(e) => error!(task = %name, error = %e, "wait failed"),
        },
        _ = sleep(timeout) => {
            error!(task = %name, timeout = ?timeout, "timed out; killing process tree");
            let killed = pid.map_or(false, kill_tree);
            if killed {
                // The group is already SIGKILLed; this just reaps the child.
                let _ = child.wait().await;
            } else {
                error!(task = %name, "failed to kill process tree");
            }
        }
    }
}

async fn read_all<R>(pipe: Option<R>) -> Vec<u8>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

/// Last few KiB of a captured stream, as lossy UTF-8, for diagnostics.
fn tail(buf: &[u8]) -> String {
    const MAX: usize = 4096;
    let start = buf.len().saturating_sub(MAX);
    String::from_utf8_lossy(&buf[start..]).into_owned()
}
