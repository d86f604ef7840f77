//! Orphan encoder reaping
//!
//! A best-effort sweep that force-kills every process whose executable name
//! matches the encoder's, whether or not a supervisor tracks it. Used on
//! shutdown and to release files still held open by a crashed run.

use log::{debug, info, warn};
use serde::Serialize;
use sysinfo::{Pid, System};

use std::collections::HashSet;
use std::process::{Command, Stdio};

/// Outcome of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReapSummary {
    /// Processes killed through enumeration.
    pub killed: usize,
    /// Enumeration was unavailable and the host kill-by-name tool was used.
    pub fallback_used: bool,
    /// The fallback tool reported success. Only meaningful with `fallback_used`.
    pub fallback_succeeded: bool,
}

/// Force-kills every process named `name`, except the calling process.
///
/// Matching is case-insensitive and ignores a trailing `.exe`. Processes that
/// vanish or refuse the kill are skipped. Never fails: finding nothing is a
/// summary with `killed == 0`.
pub fn reap_all(name: &str) -> ReapSummary {
    let target = normalize_name(name);
    if target.is_empty() {
        return ReapSummary::default();
    }

    if !sysinfo::IS_SUPPORTED_SYSTEM {
        return reap_with_host_tool(&target);
    }

    let mut system = System::new();
    system.refresh_processes();
    let own_pid = sysinfo::get_current_pid().ok();

    // Linux lists every thread as its own entry under the owning process name
    let threads: HashSet<Pid> = system
        .processes()
        .iter()
        .filter_map(|(pid, process)| Some((pid, process.tasks()?)))
        .flat_map(|(owner, tasks)| tasks.iter().filter(move |task| *task != owner))
        .copied()
        .collect();

    let mut killed = 0;
    for (pid, process) in system.processes() {
        if Some(*pid) == own_pid
            || threads.contains(pid)
            || normalize_name(process.name()) != target
        {
            continue;
        }
        if process.kill() {
            debug!("Killed {} (pid {pid})", process.name());
            killed += 1;
        } else {
            debug!("Could not kill {} (pid {pid}); skipping", process.name());
        }
    }

    if killed > 0 {
        info!("Reaped {killed} {target} process(es)");
    }
    ReapSummary {
        killed,
        ..ReapSummary::default()
    }
}

/// Lower-cased executable name without a trailing `.exe`.
fn normalize_name(name: &str) -> String {
    let name = name.trim().to_lowercase();
    match name.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => name,
    }
}

fn reap_with_host_tool(target: &str) -> ReapSummary {
    let mut cmd = if cfg!(windows) {
        let mut cmd = Command::new("taskkill");
        cmd.args(["/F", "/IM", &format!("{target}.exe")]);
        cmd
    } else {
        let mut cmd = Command::new("pkill");
        cmd.args(["-KILL", "-x", target]);
        cmd
    };

    let succeeded = match cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) => status.success(),
        Err(e) => {
            warn!("Kill-by-name fallback for {target} failed to run: {e}");
            false
        }
    };

    ReapSummary {
        killed: 0,
        fallback_used: true,
        fallback_succeeded: succeeded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("ffmpeg"), "ffmpeg");
        assert_eq!(normalize_name("FFmpeg.EXE"), "ffmpeg");
        assert_eq!(normalize_name(" ffmpeg.exe "), "ffmpeg");
        assert_eq!(normalize_name("ffmpeg.exe.bak"), "ffmpeg.exe.bak");
    }

    #[test]
    fn test_nothing_to_reap() {
        let summary = reap_all("vconv-no-such-process-name");
        assert_eq!(summary.killed, 0);
        assert!(!summary.fallback_used || !summary.fallback_succeeded);
    }

    #[test]
    fn test_host_tool_reports_fallback() {
        let summary = reap_with_host_tool("vconv-no-such-process-name");
        assert!(summary.fallback_used);
        assert_eq!(summary.killed, 0);
        assert!(!summary.fallback_succeeded);
    }

    #[cfg(unix)]
    #[test]
    fn test_host_tool_kills_by_name() {
        use std::os::unix::fs::PermissionsExt;
        use std::thread;
        use std::time::{Duration, Instant};

        if which::which("pkill").is_err() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let name = format!("vhost{}", std::process::id());
        let script = dir.path().join(&name);
        std::fs::write(&script, "#!/bin/sh\nwhile :; do sleep 0.1; done\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        // Other tests in this binary may fork while the script is still open
        let mut attempts = 0;
        let mut child = loop {
            match Command::new(&script).stdin(Stdio::null()).spawn() {
                Ok(child) => break child,
                Err(e) if e.raw_os_error() == Some(26) && attempts < 10 => {
                    attempts += 1;
                    thread::sleep(Duration::from_millis(50));
                }
                Err(e) => panic!("spawn {name}: {e}"),
            }
        };
        thread::sleep(Duration::from_millis(300));

        let summary = reap_with_host_tool(&name);
        assert!(summary.fallback_used);
        assert!(summary.fallback_succeeded);
        assert_eq!(summary.killed, 0);

        let deadline = Instant::now() + Duration::from_secs(5);
        let exited = loop {
            if child.try_wait().unwrap().is_some() {
                break true;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                break false;
            }
            thread::sleep(Duration::from_millis(20));
        };
        assert!(exited, "{name} survived the kill-by-name fallback");
    }

    #[test]
    fn test_empty_name_is_noop() {
        assert_eq!(reap_all("  "), ReapSummary::default());
    }
}
