//! Process-wide shell state.
//!
//! One `ShellContext` lives for the lifetime of the process and is threaded
//! explicitly through the tokenizer, parser, and executor. Signal handlers
//! never touch it; they communicate through the atomics in [`crate::signals`].

use crate::alias::Aliases;
use crate::error::{ShellError, ShellResult};
use crate::history::History;
use crate::job::JobTable;
use crate::profiler::Profiler;
use crate::signals;
use crate::vars::Variables;
use nix::sys::termios::{tcgetattr, tcsetattr, SetArg, Termios};
use nix::unistd::{getpid, getpgrp, isatty, setpgid, tcsetpgrp, Pid};
use std::os::fd::BorrowedFd;
use std::path::PathBuf;

/// File descriptor of the controlling terminal.
pub const SHELL_TERMINAL_FD: i32 = 0;

pub struct ShellContext {
    pub cwd: PathBuf,
    pub prev_cwd: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub last_status: i32,
    pub is_interactive: bool,
    pub should_exit: bool,
    pub shell_pgid: Pid,
    pub saved_tmodes: Option<Termios>,
    pub vars: Variables,
    pub aliases: Aliases,
    pub history: History,
    pub jobs: JobTable,
    pub profiler: Profiler,
}

impl ShellContext {
    /// Build the context: seed variables from the environment, resolve the
    /// home directory and history file, detect interactivity.
    pub fn new() -> ShellResult<Self> {
        let vars = Variables::from_environ();
        let home = vars
            .get("HOME")
            .map(PathBuf::from)
            .or_else(|| nix::unistd::User::from_uid(nix::unistd::getuid()).ok().flatten().map(|u| u.dir));
        let history_path = home.as_ref().map(|h| h.join(".qsh_history"));
        let cwd = std::env::current_dir()
            .map_err(|e| ShellError::system(format!("cannot determine working directory: {e}")))?;

        Ok(Self {
            cwd,
            prev_cwd: None,
            home,
            last_status: 0,
            is_interactive: isatty(SHELL_TERMINAL_FD).unwrap_or(false),
            should_exit: false,
            shell_pgid: getpgrp(),
            saved_tmodes: None,
            vars,
            aliases: Aliases::new(),
            history: History::new(history_path),
            jobs: JobTable::new(),
            profiler: Profiler::new(),
        })
    }

    /// Claim the terminal and install signal handlers. Job-control setup
    /// (own process group, terminal ownership, saved modes) only happens
    /// when stdin is a tty.
    pub fn init_interactive(&mut self) -> ShellResult<()> {
        if self.is_interactive {
            let pid = getpid();
            if self.shell_pgid != pid {
                setpgid(pid, pid)
                    .map_err(|e| ShellError::system(format!("setpgid failed: {e}")))?;
                self.shell_pgid = pid;
            }
            let term = Self::terminal_fd();
            tcsetpgrp(term, self.shell_pgid)
                .map_err(|e| ShellError::system(format!("cannot claim terminal: {e}")))?;
            self.saved_tmodes = tcgetattr(term).ok();
            log::debug!(target: "qsh_core::context", "terminal claimed by pgid {}", self.shell_pgid);
        }
        signals::install_shell_handlers()
    }

    /// Borrowed fd for termios/tcsetpgrp calls on the controlling terminal.
    pub fn terminal_fd() -> BorrowedFd<'static> {
        // Fd 0 outlives the process.
        unsafe { BorrowedFd::borrow_raw(SHELL_TERMINAL_FD) }
    }

    /// Hand the terminal back to the shell and restore its modes, after a
    /// foreground wait finishes.
    pub fn reclaim_terminal(&self) {
        if !self.is_interactive {
            return;
        }
        let term = Self::terminal_fd();
        if let Some(modes) = &self.saved_tmodes {
            let _ = tcsetattr(term, SetArg::TCSADRAIN, modes);
        }
        let _ = tcsetpgrp(term, self.shell_pgid);
    }

    /// The prompt string: `qsh:<cwd>$ `.
    pub fn prompt(&self) -> String {
        format!("qsh:{}$ ", self.cwd.display())
    }

    /// Change directory, updating `cwd`/`prev_cwd` and the `PWD`/`OLDPWD`
    /// environment entries.
    pub fn change_dir(&mut self, target: &std::path::Path) -> ShellResult<()> {
        std::env::set_current_dir(target)
            .map_err(|e| ShellError::system(format!("{}: {e}", target.display())))?;
        let new_cwd = std::env::current_dir()
            .map_err(|e| ShellError::system(format!("cannot read new directory: {e}")))?;
        let old = std::mem::replace(&mut self.cwd, new_cwd);
        let _ = self
            .vars
            .set("OLDPWD", old.display().to_string(), true);
        let _ = self
            .vars
            .set("PWD", self.cwd.display().to_string(), true);
        self.prev_cwd = Some(old);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_cwd() {
        let mut ctx = ShellContext::new().unwrap();
        ctx.cwd = PathBuf::from("/tmp");
        assert_eq!(ctx.prompt(), "qsh:/tmp$ ");
    }

    #[test]
    fn change_dir_tracks_previous() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut ctx = ShellContext::new().unwrap();
        let before = ctx.cwd.clone();
        ctx.change_dir(dir.path()).unwrap();
        assert_eq!(ctx.prev_cwd.as_deref(), Some(before.as_path()));
        // TempDir may be a symlink on some systems; compare canonicalized.
        assert_eq!(
            ctx.cwd.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
        ctx.change_dir(&before).unwrap();
    }
}
