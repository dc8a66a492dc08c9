//! ptrace-based per-process syscall profiler (Linux).
//!
//! `start` attaches to a live process and arms syscall-stop reporting with
//! `PTRACE_O_TRACESYSGOOD`; the collection routine is then polled inline
//! around the executor's `waitpid` calls. Each syscall entry/exit pair is
//! timed and folded into per-syscall counters. `stop` detaches: every
//! failure path after a successful attach detaches too, so no stopped
//! tracee is ever left behind.

use crate::error::{ProfilerErrorKind, ShellError, ShellResult};
use crate::syscalls::syscall_name;
use nix::unistd::Pid;
use std::fmt::Write as _;
use std::time::Instant;

pub const MAX_SYSCALLS: usize = 512;

#[derive(Debug, Clone, Copy)]
pub struct SyscallStat {
    pub count: u64,
    pub total_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
}

impl Default for SyscallStat {
    fn default() -> Self {
        Self {
            count: 0,
            total_ns: 0,
            min_ns: u64::MAX,
            max_ns: 0,
        }
    }
}

impl SyscallStat {
    fn record(&mut self, elapsed_ns: u64) {
        self.count += 1;
        self.total_ns += elapsed_ns;
        self.min_ns = self.min_ns.min(elapsed_ns);
        self.max_ns = self.max_ns.max(elapsed_ns);
    }

    pub fn avg_ns(&self) -> u64 {
        self.total_ns / self.count.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Attached(Pid),
}

pub struct Profiler {
    state: State,
    started: Instant,
    ended: Instant,
    per_syscall: Box<[SyscallStat; MAX_SYSCALLS]>,
    grand: SyscallStat,
}

/// Read-only copy of the accumulated numbers, for reports and tests.
pub struct ProfilerStats {
    pub attached: bool,
    pub wall_ns: u64,
    pub per_syscall: Vec<(usize, SyscallStat)>,
    pub grand: SyscallStat,
}

impl Profiler {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            state: State::Idle,
            started: now,
            ended: now,
            per_syscall: Box::new([SyscallStat::default(); MAX_SYSCALLS]),
            grand: SyscallStat::default(),
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.state, State::Attached(_))
    }

    pub fn attached_pid(&self) -> Option<Pid> {
        match self.state {
            State::Attached(pid) => Some(pid),
            State::Idle => None,
        }
    }

    /// Reset all counters.
    pub fn clear(&mut self) {
        let now = Instant::now();
        self.started = now;
        self.ended = now;
        self.per_syscall = Box::new([SyscallStat::default(); MAX_SYSCALLS]);
        self.grand = SyscallStat::default();
    }

    /// Attach to `pid` and arm syscall tracing.
    #[cfg(target_os = "linux")]
    pub fn start(&mut self, pid: Pid) -> ShellResult<()> {
        use nix::sys::ptrace;
        use nix::sys::wait::waitpid;

        if self.is_attached() {
            return Err(ShellError::profiler(
                ProfilerErrorKind::AlreadyProfiling,
                "profiler is already attached",
            ));
        }
        if pid.as_raw() <= 0 {
            return Err(ShellError::profiler(
                ProfilerErrorKind::InvalidArgument,
                "invalid pid",
            ));
        }

        self.clear();
        ptrace::attach(pid).map_err(|e| {
            ShellError::profiler(
                ProfilerErrorKind::SyscallFailed,
                format!("ptrace attach to {pid} failed: {e}"),
            )
        })?;

        // From here on, bail out through detach.
        let arm = || -> nix::Result<()> {
            waitpid(pid, None)?;
            ptrace::setoptions(pid, ptrace::Options::PTRACE_O_TRACESYSGOOD)?;
            ptrace::syscall(pid, None)?;
            Ok(())
        };
        if let Err(e) = arm() {
            let _ = ptrace::detach(pid, None);
            return Err(ShellError::profiler(
                ProfilerErrorKind::SyscallFailed,
                format!("arming syscall tracing failed: {e}"),
            ));
        }

        self.state = State::Attached(pid);
        self.started = Instant::now();
        log::debug!(target: "qsh_core::profiler", "attached to {pid}");
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    pub fn start(&mut self, _pid: Pid) -> ShellResult<()> {
        Err(ShellError::profiler(
            ProfilerErrorKind::SyscallFailed,
            "profiling not supported on this platform",
        ))
    }

    /// Detach and freeze the wall-clock interval.
    pub fn stop(&mut self) -> ShellResult<()> {
        let State::Attached(pid) = self.state else {
            return Err(ShellError::profiler(
                ProfilerErrorKind::NotProfiling,
                "profiler is not attached",
            ));
        };
        self.ended = Instant::now();
        self.state = State::Idle;

        #[cfg(target_os = "linux")]
        {
            use nix::sys::ptrace;
            use nix::sys::signal::{kill, Signal};
            use nix::sys::wait::waitpid;

            // Detach only works on a stopped tracee; if it is running,
            // stop it first and clear the stop again afterwards.
            if ptrace::detach(pid, None).is_err() {
                let _ = kill(pid, Signal::SIGSTOP);
                let _ = waitpid(pid, None);
                ptrace::detach(pid, None).map_err(|e| {
                    ShellError::profiler(
                        ProfilerErrorKind::SyscallFailed,
                        format!("ptrace detach from {pid} failed: {e}"),
                    )
                })?;
                let _ = kill(pid, Signal::SIGCONT);
            }
            log::debug!(target: "qsh_core::profiler", "detached from {pid}");
        }
        #[cfg(not(target_os = "linux"))]
        let _ = pid;
        Ok(())
    }

    /// Non-blocking collection pass: service any pending syscall stops of
    /// the tracee. Called inline around the executor's waits and at prompt
    /// time.
    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    pub fn poll(&mut self) {
        use nix::sys::ptrace;
        use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};

        let State::Attached(pid) = self.state else {
            return;
        };

        loop {
            match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::PtraceSyscall(_)) => {
                    // Syscall entry: note the number, run to exit, time it.
                    let sysno = match ptrace::getregs(pid) {
                        Ok(regs) => regs.orig_rax,
                        Err(_) => break,
                    };
                    let entered = Instant::now();
                    if ptrace::syscall(pid, None).is_err() {
                        break;
                    }
                    match waitpid(pid, None) {
                        Ok(WaitStatus::PtraceSyscall(_)) => {
                            let elapsed = entered.elapsed().as_nanos() as u64;
                            self.record(sysno, elapsed);
                            if ptrace::syscall(pid, None).is_err() {
                                break;
                            }
                        }
                        _ => break,
                    }
                }
                Ok(WaitStatus::StillAlive) => break,
                Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => {
                    // Tracee is gone; nothing left to detach from.
                    self.state = State::Idle;
                    self.ended = Instant::now();
                    break;
                }
                Ok(_) => {
                    // Some other stop (signal delivery); pass it through.
                    if ptrace::syscall(pid, None).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    }

    #[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
    pub fn poll(&mut self) {}

    fn record(&mut self, sysno: u64, elapsed_ns: u64) {
        if (sysno as usize) < MAX_SYSCALLS {
            self.per_syscall[sysno as usize].record(elapsed_ns);
            self.grand.record(elapsed_ns);
        }
    }

    pub fn stats(&self) -> ProfilerStats {
        let end = if self.is_attached() {
            Instant::now()
        } else {
            self.ended
        };
        ProfilerStats {
            attached: self.is_attached(),
            wall_ns: end.duration_since(self.started).as_nanos() as u64,
            per_syscall: self
                .per_syscall
                .iter()
                .enumerate()
                .filter(|(_, s)| s.count > 0)
                .map(|(i, s)| (i, *s))
                .collect(),
            grand: self.grand,
        }
    }

    /// Render the profiling report.
    pub fn render_report(&self) -> String {
        let stats = self.stats();
        let mut out = String::new();
        let secs = stats.wall_ns as f64 / 1e9;

        writeln!(out, "Profiling Report").unwrap();
        writeln!(out, "===============").unwrap();
        writeln!(
            out,
            "Status: {}",
            if stats.attached { "enabled" } else { "disabled" }
        )
        .unwrap();
        writeln!(out, "Total time: {secs:.6} seconds").unwrap();
        writeln!(out, "Total syscalls: {}", stats.grand.count).unwrap();

        if stats.grand.count > 0 {
            writeln!(
                out,
                "Average syscall time: {:.6} seconds",
                stats.grand.avg_ns() as f64 / 1e9
            )
            .unwrap();
            writeln!(
                out,
                "Min syscall time: {:.6} seconds",
                stats.grand.min_ns as f64 / 1e9
            )
            .unwrap();
            writeln!(
                out,
                "Max syscall time: {:.6} seconds",
                stats.grand.max_ns as f64 / 1e9
            )
            .unwrap();

            writeln!(out, "\nTop 10 System Calls:").unwrap();
            writeln!(out, "-------------------").unwrap();
            for (num, stat) in top_by_count(&stats.per_syscall, 10) {
                writeln!(
                    out,
                    "{:<20}: {} calls, avg time: {:.6} seconds",
                    syscall_name(num as u64),
                    stat.count,
                    stat.avg_ns() as f64 / 1e9
                )
                .unwrap();
            }
        }
        out
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Highest call counts first; ties ordered by syscall number ascending.
fn top_by_count(per_syscall: &[(usize, SyscallStat)], limit: usize) -> Vec<(usize, SyscallStat)> {
    let mut sorted = per_syscall.to_vec();
    sorted.sort_by(|(na, a), (nb, b)| b.count.cmp(&a.count).then(na.cmp(nb)));
    sorted.truncate(limit);
    sorted
}
