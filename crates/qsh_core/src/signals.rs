//! Signal dispositions for the interactive shell.
//!
//! Handlers must stay async-signal-safe, so they do almost nothing:
//! keyboard signals are re-sent to the foreground process group read from
//! an atomic, and `SIGCHLD` merely raises a flag the REPL drains before the
//! next prompt. All job-table mutation happens on the main thread.

use crate::error::ShellResult;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

static FOREGROUND_PGID: AtomicI32 = AtomicI32::new(0);
static SIGCHLD_PENDING: AtomicBool = AtomicBool::new(false);

/// Publish (or clear) the process group currently in the foreground so the
/// keyboard-signal handlers know where to forward.
pub fn set_foreground(pgid: Option<nix::unistd::Pid>) {
    FOREGROUND_PGID.store(pgid.map_or(0, |p| p.as_raw()), Ordering::SeqCst);
}

pub fn foreground() -> Option<nix::unistd::Pid> {
    match FOREGROUND_PGID.load(Ordering::SeqCst) {
        0 => None,
        raw => Some(nix::unistd::Pid::from_raw(raw)),
    }
}

/// Consume the pending-SIGCHLD flag.
pub fn take_sigchld() -> bool {
    SIGCHLD_PENDING.swap(false, Ordering::SeqCst)
}

extern "C" fn forward_to_foreground(sig: libc::c_int) {
    let pgid = FOREGROUND_PGID.load(Ordering::SeqCst);
    if pgid > 0 {
        // kill(2) is async-signal-safe; negative pid targets the group.
        unsafe {
            libc::kill(-pgid, sig);
        }
    }
}

extern "C" fn note_sigchld(_sig: libc::c_int) {
    SIGCHLD_PENDING.store(true, Ordering::SeqCst);
}

/// Install the interactive shell's handlers: keyboard signals forward to
/// the foreground group, terminal-access signals are ignored, and SIGCHLD
/// is recorded with stops delivered (no SA_NOCLDSTOP).
pub fn install_shell_handlers() -> ShellResult<()> {
    let forward = SigAction::new(
        SigHandler::Handler(forward_to_foreground),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::SA_RESTART, SigSet::empty());
    let chld = SigAction::new(
        SigHandler::Handler(note_sigchld),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );

    unsafe {
        sigaction(Signal::SIGINT, &forward)?;
        sigaction(Signal::SIGQUIT, &forward)?;
        sigaction(Signal::SIGTSTP, &forward)?;
        sigaction(Signal::SIGTTIN, &ignore)?;
        sigaction(Signal::SIGTTOU, &ignore)?;
        sigaction(Signal::SIGCHLD, &chld)?;
    }
    log::debug!(target: "qsh_core::signals", "shell signal handlers installed");
    Ok(())
}

/// Restore default dispositions in a forked child, before exec.
pub fn reset_child_signals() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for sig in [
        Signal::SIGINT,
        Signal::SIGQUIT,
        Signal::SIGTSTP,
        Signal::SIGTTIN,
        Signal::SIGTTOU,
        Signal::SIGCHLD,
    ] {
        // Best effort; the child execs immediately afterwards.
        let _ = unsafe { sigaction(sig, &default) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreground_slot_round_trips() {
        set_foreground(Some(nix::unistd::Pid::from_raw(1234)));
        assert_eq!(foreground(), Some(nix::unistd::Pid::from_raw(1234)));
        set_foreground(None);
        assert_eq!(foreground(), None);
    }

    #[test]
    fn sigchld_flag_is_consumed() {
        SIGCHLD_PENDING.store(true, Ordering::SeqCst);
        assert!(take_sigchld());
        assert!(!take_sigchld());
    }
}
