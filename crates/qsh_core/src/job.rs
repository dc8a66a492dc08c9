//! Background and suspended job tracking.
//!
//! A job is one process group: a background command or a pipeline. Entries
//! are created when the executor forks, updated from `waitpid` results
//! (either the executor's own foreground waits or the deferred SIGCHLD
//! drain), and removed once the user has been told they are done.

use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::fmt;

pub type JobId = u32;

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub pgid: Pid,
    /// First child of the group; kept for listings and legacy kill-by-pid.
    pub pid: Pid,
    pub cmd: String,
    pub running: bool,
    pub stopped: bool,
    pub status: i32,
}

impl Job {
    pub fn state_label(&self) -> &'static str {
        if self.stopped {
            "Stopped"
        } else if self.running {
            "Running"
        } else {
            "Done"
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}\t{}", self.id, self.state_label(), self.cmd)
    }
}

#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
    next_id: JobId,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a new job; ids are monotonically allocated and never reused
    /// within a session.
    pub fn add(&mut self, pgid: Pid, pid: Pid, cmd: impl Into<String>) -> JobId {
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.push(Job {
            id,
            pgid,
            pid,
            cmd: cmd.into(),
            running: true,
            stopped: false,
            status: 0,
        });
        log::debug!(target: "qsh_core::job", "job [{id}] registered, pgid {pgid}");
        id
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        let pos = self.jobs.iter().position(|j| j.id == id)?;
        Some(self.jobs.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Ids of all jobs, in registration order.
    pub fn ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|j| j.id).collect()
    }

    /// Fold a wait status into the owning job, matching by pid or by group.
    pub fn note_status(&mut self, pid: Pid, status: &WaitStatus) {
        let Some(job) = self
            .jobs
            .iter_mut()
            .find(|j| j.pid == pid || j.pgid == pid)
        else {
            return;
        };
        match status {
            WaitStatus::Exited(_, code) => {
                job.running = false;
                job.stopped = false;
                job.status = *code;
            }
            WaitStatus::Signaled(_, sig, _) => {
                job.running = false;
                job.stopped = false;
                job.status = 128 + *sig as i32;
            }
            WaitStatus::Stopped(_, _) => {
                job.running = false;
                job.stopped = true;
            }
            WaitStatus::Continued(_) => {
                job.running = true;
                job.stopped = false;
            }
            _ => {}
        }
    }

    pub fn mark_stopped(&mut self, id: JobId) {
        if let Some(job) = self.get_mut(id) {
            job.running = false;
            job.stopped = true;
        }
    }

    pub fn mark_running(&mut self, id: JobId) {
        if let Some(job) = self.get_mut(id) {
            job.running = true;
            job.stopped = false;
        }
    }

    /// Drain every pending child-status change without blocking, printing
    /// `[id] Done\tcmd` / `[id] Stopped\tcmd` notifications in interactive
    /// mode. Finished jobs are removed once reported.
    pub fn reap(&mut self, interactive: bool) {
        loop {
            let status = match waitpid(
                Pid::from_raw(-1),
                Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED),
            ) {
                Ok(WaitStatus::StillAlive) | Err(_) => break,
                Ok(s) => s,
            };
            let Some(pid) = status.pid() else { break };
            log::debug!(target: "qsh_core::job", "reaped {pid}: {status:?}");
            self.note_status(pid, &status);
            if interactive {
                if let Some(job) = self.jobs.iter().find(|j| j.pid == pid || j.pgid == pid) {
                    if !job.running {
                        println!("{job}");
                    }
                }
            }
        }
        self.jobs.retain(|j| j.running || j.stopped);
    }

    /// Send a signal to a job's process group.
    pub fn signal(&self, id: JobId, signal: Signal) -> nix::Result<()> {
        match self.get(id) {
            Some(job) => killpg(job.pgid, signal),
            None => Err(nix::errno::Errno::ESRCH),
        }
    }
}

/// Parse a `%N` job specifier (a bare integer is accepted too).
pub fn parse_job_spec(spec: &str) -> Option<JobId> {
    let digits = spec.strip_prefix('%').unwrap_or(spec);
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_not_reused() {
        let mut table = JobTable::new();
        let a = table.add(Pid::from_raw(100), Pid::from_raw(100), "a");
        let b = table.add(Pid::from_raw(200), Pid::from_raw(200), "b");
        assert_eq!((a, b), (1, 2));
        table.remove(a);
        let c = table.add(Pid::from_raw(300), Pid::from_raw(300), "c");
        assert_eq!(c, 3);
    }

    #[test]
    fn note_status_transitions() {
        let mut table = JobTable::new();
        let id = table.add(Pid::from_raw(42), Pid::from_raw(42), "sleep 5");

        table.note_status(
            Pid::from_raw(42),
            &WaitStatus::Stopped(Pid::from_raw(42), Signal::SIGTSTP),
        );
        let job = table.get(id).unwrap();
        assert!(job.stopped && !job.running);
        assert_eq!(job.state_label(), "Stopped");

        table.note_status(Pid::from_raw(42), &WaitStatus::Continued(Pid::from_raw(42)));
        assert!(table.get(id).unwrap().running);

        table.note_status(Pid::from_raw(42), &WaitStatus::Exited(Pid::from_raw(42), 3));
        let job = table.get(id).unwrap();
        assert!(!job.running && !job.stopped);
        assert_eq!(job.status, 3);
        assert_eq!(job.state_label(), "Done");
    }

    #[test]
    fn display_format_matches_listings() {
        let mut table = JobTable::new();
        let id = table.add(Pid::from_raw(7), Pid::from_raw(7), "sleep 1");
        assert_eq!(format!("{}", table.get(id).unwrap()), "[1] Running\tsleep 1");
    }

    #[test]
    fn job_spec_parsing() {
        assert_eq!(parse_job_spec("%2"), Some(2));
        assert_eq!(parse_job_spec("7"), Some(7));
        assert_eq!(parse_job_spec("%x"), None);
        assert_eq!(parse_job_spec(""), None);
    }
}
