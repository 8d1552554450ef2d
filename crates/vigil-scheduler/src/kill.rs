//! Platform-specific process-tree termination.
//!
//! Killing only the direct child is not enough: jobs fork helpers (git is a
//! notorious offender) and those would survive as orphans. The supervisor
//! therefore spawns each job as its own process-group leader on Unix, and
//! this module signals the whole group. Elsewhere, `taskkill /T` walks the
//! tree for us.

/// Forcibly terminate the process with `pid` and all of its descendants.
/// Returns false when the attempt failed; the caller logs and moves on.
#[cfg(unix)]
pub fn kill_tree(pid: u32) -> bool {
    // The negative pid addresses the entire process group. The supervisor
    // made the child a group leader, so pgid == pid.
    unsafe { libc::kill(-(pid as i32), libc::SIGKILL) == 0 }
}

#[cfg(windows)]
pub fn kill_tree(pid: u32) -> bool {
    std::process::Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
