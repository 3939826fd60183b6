//! Process-tree discovery and termination
//!
//! Everything platform specific about finding and killing the descendants
//! of a supervised child lives here.

use std::collections::{HashMap, VecDeque};
use std::thread;
use std::time::{Duration, Instant};

/// Time between SIGTERM and SIGKILL
pub const GRACE_PERIOD: Duration = Duration::from_millis(500);

/// How long to wait for killed processes to disappear
const REAP_WAIT: Duration = Duration::from_secs(2);

const REAP_POLL: Duration = Duration::from_millis(20);

/// Fields of one process table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProcStat {
    state: char,
    ppid: u32,
    pgrp: u32,
}

impl ProcStat {
    fn is_dead(&self) -> bool {
        matches!(self.state, 'Z' | 'X')
    }
}

/// Collect every live descendant of `root` (not including `root` itself),
/// parents before children.
pub fn descendants(root: u32) -> Vec<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (pid, stat) in process_table() {
        children.entry(stat.ppid).or_default().push(pid);
    }

    let mut found = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(pid) = queue.pop_front() {
        if let Some(kids) = children.get(&pid) {
            for &kid in kids {
                if kid != root && !found.contains(&kid) {
                    found.push(kid);
                    queue.push_back(kid);
                }
            }
        }
    }

    found
}

/// Live processes still in process group `pgid`
pub fn group_members(pgid: u32) -> Vec<u32> {
    process_table()
        .into_iter()
        .filter(|(_, stat)| stat.pgrp == pgid && !stat.is_dead())
        .map(|(pid, _)| pid)
        .collect()
}

/// Every process visible to us
#[cfg(target_os = "linux")]
fn process_table() -> Vec<(u32, ProcStat)> {
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return Vec::new();
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
        .filter_map(|pid| {
            let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
            Some((pid, parse_stat(&stat)?))
        })
        .collect()
}

#[cfg(not(target_os = "linux"))]
fn process_table() -> Vec<(u32, ProcStat)> {
    let output = match std::process::Command::new("ps")
        .args(["-A", "-o", "pid=,ppid=,pgid=,stat="])
        .output()
    {
        Ok(o) if o.status.success() => o,
        _ => return Vec::new(),
    };

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let pid = fields.next()?.parse().ok()?;
            let ppid = fields.next()?.parse().ok()?;
            let pgrp = fields.next()?.parse().ok()?;
            let state = fields.next()?.chars().next()?;
            Some((pid, ProcStat { state, ppid, pgrp }))
        })
        .collect()
}

/// Parse `/proc/<pid>/stat`.
///
/// The command name sits in parentheses and may itself contain spaces or
/// parentheses, so fields are read after the last `)`.
fn parse_stat(stat: &str) -> Option<ProcStat> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace();
    let state = fields.next()?.chars().next()?;
    let ppid = fields.next()?.parse().ok()?;
    let pgrp = fields.next()?.parse().ok()?;
    Some(ProcStat { state, ppid, pgrp })
}

/// Whether a process still exists and is not a zombie
#[cfg(target_os = "linux")]
pub fn is_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => parse_stat(&stat).is_some_and(|stat| !stat.is_dead()),
        Err(_) => false,
    }
}

/// Whether a process still exists
#[cfg(not(target_os = "linux"))]
pub fn is_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

fn signal(pid: u32, sig: libc::c_int) {
    unsafe {
        libc::kill(pid as libc::pid_t, sig);
    }
}

fn signal_group(pgid: u32, sig: libc::c_int) {
    unsafe {
        libc::killpg(pgid as libc::pid_t, sig);
    }
}

/// Terminate a process group leader and every listed member.
///
/// SIGTERM goes out first; whatever is still alive after the grace period
/// gets SIGKILL. `reap` is called between the two signals and after the
/// kill so the caller can collect its direct child.
pub fn terminate(leader: u32, members: &[u32], mut reap: impl FnMut()) {
    signal_group(leader, libc::SIGTERM);
    for &pid in members {
        signal(pid, libc::SIGTERM);
    }

    let deadline = Instant::now() + GRACE_PERIOD;
    while Instant::now() < deadline {
        reap();
        if !is_alive(leader) && members.iter().all(|&pid| !is_alive(pid)) {
            return;
        }
        thread::sleep(REAP_POLL);
    }

    signal_group(leader, libc::SIGKILL);
    for &pid in members {
        if is_alive(pid) {
            signal(pid, libc::SIGKILL);
        }
    }
    reap();

    let deadline = Instant::now() + REAP_WAIT;
    while Instant::now() < deadline && members.iter().any(|&pid| is_alive(pid)) {
        thread::sleep(REAP_POLL);
    }
}

/// Terminate whatever is left in process group `pgid` once its leader has
/// exited and been reaped. Returns the pids that were still running.
pub fn clear_group(pgid: u32) -> Vec<u32> {
    let members = group_members(pgid);
    if !members.is_empty() {
        terminate(pgid, &members, || {});
    }
    members
}
