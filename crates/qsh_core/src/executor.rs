//! Command-chain execution: internal dispatch, pipelines, redirections,
//! process groups, and foreground terminal discipline.
//!
//! The executor walks the parsed chain left to right. Pipelines fork one
//! child per stage into a shared process group wired with anonymous pipes;
//! single external commands fork into their own group; internal commands
//! run in-process with stdio saved, redirected, and restored around the
//! handler. Command failures never escape as errors: they become
//! `last_status` and the walk continues under `&&`/`||` short-circuit
//! rules.

use crate::context::ShellContext;
use crate::error::{RedirErrorKind, ShellError, ShellResult};
use crate::job::JobId;
use crate::signals;
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{close, dup, dup2, execvp, fork, getpid, getppid, pipe, setpgid, tcsetpgrp, ForkResult, Pid};
use qsh_parser::{ChainOp, Command, RedirKind, Redirection, ShellEnv};
use std::collections::HashMap;
use std::ffi::CString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::sync::Arc;

/// An internal command handler.
///
/// Internals receive the full argument vector (`args[0]` is the command
/// name) and the shell context, and write directly to the process stdio,
/// which the executor has already redirected if the node asked for it.
pub trait Builtin: Send + Sync {
    fn name(&self) -> &'static str;

    /// One-line description shown by `help`.
    fn synopsis(&self) -> &'static str;

    fn usage(&self) -> &'static str;

    fn execute(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<i32>;
}

/// Outcome of feeding one line to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineResult {
    /// Nothing to do: the line was blank or comment-only.
    Empty,
    /// The line parsed; carries the resulting status (unchanged for
    /// assignment-only lines).
    Executed(i32),
    /// Tokenizer or parser rejected the line; it was discarded.
    ParseFailed,
}

/// Which of a node's redirections apply, by pipeline position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirScope {
    All,
    InputOnly,
    None,
}

impl RedirScope {
    fn for_stage(index: usize, stage_count: usize) -> Self {
        if index + 1 == stage_count {
            RedirScope::All
        } else if index == 0 {
            RedirScope::InputOnly
        } else {
            RedirScope::None
        }
    }

    fn applies(self, kind: RedirKind) -> bool {
        match self {
            RedirScope::All => true,
            RedirScope::InputOnly => kind.is_input(),
            RedirScope::None => false,
        }
    }
}

pub struct Executor {
    builtins: HashMap<&'static str, Arc<dyn Builtin>>,
}

impl Executor {
    pub fn new() -> Self {
        Self {
            builtins: HashMap::new(),
        }
    }

    pub fn register(&mut self, builtin: Arc<dyn Builtin>) {
        self.builtins.insert(builtin.name(), builtin);
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Builtin>> {
        self.builtins.get(name).cloned()
    }

    /// `(name, synopsis, usage)` for every registered internal, sorted.
    pub fn builtin_summaries(&self) -> Vec<(&'static str, &'static str, &'static str)> {
        let mut entries: Vec<_> = self
            .builtins
            .values()
            .map(|b| (b.name(), b.synopsis(), b.usage()))
            .collect();
        entries.sort_by_key(|(name, _, _)| *name);
        entries
    }

    /// Tokenize, parse, and execute one logical line. Lexical and syntactic
    /// failures print to stderr and discard the line without touching
    /// `last_status`.
    pub fn run_line(&self, line: &str, ctx: &mut ShellContext) -> LineResult {
        let parsed = {
            let mut env = ExecEnv {
                exec: self,
                ctx: &mut *ctx,
            };
            let tokens = match qsh_parser::tokenize(line, &env) {
                Ok(tokens) => tokens,
                Err(e) => {
                    eprintln!("qsh: {e}");
                    return LineResult::ParseFailed;
                }
            };
            if tokens.is_empty() {
                return LineResult::Empty;
            }
            qsh_parser::parse_tokens(&tokens, &mut env)
        };

        match parsed {
            Err(e) => {
                eprintln!("qsh: {e}");
                LineResult::ParseFailed
            }
            Ok(None) => LineResult::Executed(ctx.last_status),
            Ok(Some(chain)) => LineResult::Executed(self.execute_chain(&chain, ctx)),
        }
    }

    /// Walk a command chain, honoring short-circuit operators. Returns the
    /// status of the last command run, which is also published to
    /// `last_status` step by step.
    pub fn execute_chain(&self, head: &Command, ctx: &mut ShellContext) -> i32 {
        let mut status = 0;
        let mut cur = Some(head);

        while let Some(node) = cur {
            // `last` is the node whose operator governs what happens next:
            // for a pipeline that is its final stage.
            let last: &Command;
            if node.op == ChainOp::Pipe {
                let stages = node.pipeline_stages();
                status = self.run_pipeline(&stages, ctx);
                last = stages[stages.len() - 1];
            } else if let Some(builtin) = self.lookup(&node.cmd) {
                status = self.run_builtin(builtin.as_ref(), node, ctx);
                last = node;
            } else {
                status = self.run_external(node, ctx);
                last = node;
            }
            ctx.last_status = status;

            match last.op {
                ChainOp::And if status != 0 => return status,
                ChainOp::Or if status == 0 => return 0,
                _ => {}
            }
            cur = last.next.as_deref();
        }
        status
    }

    /// Run an internal command, with stdio saved, redirected, and restored
    /// around the handler.
    fn run_builtin(&self, builtin: &dyn Builtin, node: &Command, ctx: &mut ShellContext) -> i32 {
        log::debug!(target: "qsh_core::executor", "internal command: {}", node.cmd);
        if node.redirs.is_empty() {
            return self.invoke_builtin(builtin, node, ctx);
        }

        let mut heredocs = match prepare_heredocs(&node.redirs, RedirScope::All) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("qsh: {e}");
                return 1;
            }
        };

        let saved: Vec<(i32, i32)> = match [0, 1, 2]
            .iter()
            .map(|&fd| dup(fd).map(|copy| (fd, copy)))
            .collect()
        {
            Ok(saved) => saved,
            Err(e) => {
                eprintln!("qsh: cannot save stdio: {e}");
                return 1;
            }
        };

        let status = match apply_redirections(&node.redirs, RedirScope::All, &mut heredocs) {
            Ok(()) => self.invoke_builtin(builtin, node, ctx),
            Err(e) => {
                eprintln!("qsh: {e}");
                1
            }
        };

        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
        for (fd, copy) in saved {
            let _ = dup2(copy, fd);
            let _ = close(copy);
        }
        status
    }

    fn invoke_builtin(&self, builtin: &dyn Builtin, node: &Command, ctx: &mut ShellContext) -> i32 {
        match builtin.execute(ctx, &node.argv) {
            Ok(status) => status,
            Err(e) => {
                eprintln!("qsh: {e}");
                1
            }
        }
    }

    /// Fork, wire, and wait for a pipeline of `k >= 2` stages sharing one
    /// process group. The pipeline's status is its rightmost stage's.
    fn run_pipeline(&self, stages: &[&Command], ctx: &mut ShellContext) -> i32 {
        let k = stages.len();
        debug_assert!(k >= 2);
        log::debug!(target: "qsh_core::executor", "pipeline of {k} stages");

        // Spool every here-document up front: the spool reads the shell's
        // stdin, which must happen before any child owns the terminal.
        let mut heredocs_per_stage: Vec<Vec<File>> = Vec::with_capacity(k);
        for (i, stage) in stages.iter().enumerate() {
            let scope = RedirScope::for_stage(i, k);
            match prepare_heredocs(&stage.redirs, scope) {
                Ok(files) => heredocs_per_stage.push(files),
                Err(e) => {
                    eprintln!("qsh: {e}");
                    return 1;
                }
            }
        }

        let mut pipes = Vec::with_capacity(k - 1);
        for _ in 0..k - 1 {
            match pipe() {
                Ok(pair) => pipes.push(pair),
                Err(e) => {
                    eprintln!("qsh: pipe: {e}");
                    return 1;
                }
            }
        }

        let mut pgid: Option<Pid> = None;
        let mut pids: Vec<Pid> = Vec::with_capacity(k);

        for (i, stage) in stages.iter().enumerate() {
            let scope = RedirScope::for_stage(i, k);
            match unsafe { fork() } {
                Ok(ForkResult::Child) => {
                    // First child leads the group; the rest join it.
                    let lead = pgid.unwrap_or(Pid::from_raw(0));
                    let _ = setpgid(Pid::from_raw(0), lead);

                    if i > 0 {
                        let _ = dup2(pipes[i - 1].0.as_raw_fd(), 0);
                    }
                    if i + 1 < k {
                        let _ = dup2(pipes[i].1.as_raw_fd(), 1);
                    }
                    for (r, w) in &pipes {
                        let _ = close(r.as_raw_fd());
                        let _ = close(w.as_raw_fd());
                    }

                    let mut heredocs = std::mem::take(&mut heredocs_per_stage[i]);
                    if let Err(e) = apply_redirections(&stage.redirs, scope, &mut heredocs) {
                        eprintln!("qsh: {e}");
                        std::process::exit(1);
                    }
                    signals::reset_child_signals();
                    exec_program(&stage.argv);
                }
                Ok(ForkResult::Parent { child }) => {
                    let lead = *pgid.get_or_insert(child);
                    // Mirror the child's setpgid; EACCES just means the
                    // child already exec'd.
                    let _ = setpgid(child, lead);
                    pids.push(child);
                }
                Err(e) => {
                    eprintln!("qsh: fork: {e}");
                    break;
                }
            }
        }

        drop(pipes);
        let Some(pgid) = pgid else { return 1 };

        let summary = stages
            .iter()
            .map(|s| s.cmd.as_str())
            .collect::<Vec<_>>()
            .join(" | ");
        let job_id = ctx.jobs.add(pgid, pids[0], summary.clone());
        self.wait_foreground(ctx, pgid, &pids, Some(job_id), &summary)
    }

    /// Fork and run one external command in its own process group. With a
    /// `Background` operator the child is registered as a job and the shell
    /// does not wait.
    fn run_external(&self, node: &Command, ctx: &mut ShellContext) -> i32 {
        // PATH probe before paying for a fork.
        if !node.cmd.contains('/') && which::which(&node.cmd).is_err() {
            eprintln!("{}: command not found", node.cmd);
            return 127;
        }

        let mut heredocs = match prepare_heredocs(&node.redirs, RedirScope::All) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("qsh: {e}");
                return 1;
            }
        };

        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
                if let Err(e) = apply_redirections(&node.redirs, RedirScope::All, &mut heredocs) {
                    eprintln!("qsh: {e}");
                    std::process::exit(1);
                }
                signals::reset_child_signals();
                exec_program(&node.argv);
            }
            Ok(ForkResult::Parent { child }) => {
                let _ = setpgid(child, child);
                drop(heredocs);
                let cmd_text = node.argv.join(" ");
                if node.op == ChainOp::Background {
                    let id = ctx.jobs.add(child, child, cmd_text);
                    log::debug!(target: "qsh_core::executor", "background job [{id}] pid {child}");
                    0
                } else {
                    self.wait_foreground(ctx, child, &[child], None, &cmd_text)
                }
            }
            Err(e) => {
                eprintln!("qsh: fork: {e}");
                1
            }
        }
    }

    /// Give the terminal to `pgid`, wait for every pid with `WUNTRACED`,
    /// then restore the saved terminal modes and reclaim the terminal.
    /// A stop suspends the whole group into the job table; completion of a
    /// registered job removes it silently.
    fn wait_foreground(
        &self,
        ctx: &mut ShellContext,
        pgid: Pid,
        pids: &[Pid],
        job_id: Option<JobId>,
        cmd_text: &str,
    ) -> i32 {
        if ctx.is_interactive {
            let _ = tcsetpgrp(ShellContext::terminal_fd(), pgid);
        }
        signals::set_foreground(Some(pgid));

        let last_pid = *pids.last().expect("pipeline has at least one pid");
        let mut remaining: Vec<Pid> = pids.to_vec();
        let mut status = 0;
        let mut stopped = false;

        while !remaining.is_empty() {
            ctx.profiler.poll();
            match waitpid(Pid::from_raw(-pgid.as_raw()), Some(WaitPidFlag::WUNTRACED)) {
                Ok(ws @ WaitStatus::Exited(pid, code)) => {
                    remaining.retain(|&p| p != pid);
                    if pid == last_pid {
                        status = code;
                    }
                    ctx.jobs.note_status(pid, &ws);
                }
                Ok(ws @ WaitStatus::Signaled(pid, sig, _)) => {
                    remaining.retain(|&p| p != pid);
                    if pid == last_pid {
                        status = 128 + sig as i32;
                    }
                    ctx.jobs.note_status(pid, &ws);
                }
                Ok(WaitStatus::Stopped(..)) => {
                    stopped = true;
                    break;
                }
                Ok(_) => continue,
                Err(Errno::EINTR) => continue,
                Err(_) => break,
            }
        }

        signals::set_foreground(None);
        ctx.reclaim_terminal();

        if stopped {
            let id = match job_id {
                Some(id) => id,
                None => ctx.jobs.add(pgid, pids[0], cmd_text),
            };
            ctx.jobs.mark_stopped(id);
            if let Some(job) = ctx.jobs.get(id) {
                println!("{job}");
            }
            // Convention: stopped foreground pipelines read as interrupted.
            148
        } else {
            if let Some(id) = job_id {
                ctx.jobs.remove(id);
            }
            status
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

/// Bring a job to the foreground, continuing it if stopped, and wait as for
/// any foreground pipeline. Used by the `fg` internal.
pub fn resume_job_foreground(ctx: &mut ShellContext, id: JobId) -> ShellResult<i32> {
    use crate::error::JobErrorKind;

    let (pgid, was_stopped) = match ctx.jobs.get(id) {
        Some(job) => (job.pgid, job.stopped),
        None => {
            return Err(ShellError::job(
                JobErrorKind::NotFound,
                format!("fg: job not found: %{id}"),
            ))
        }
    };

    if ctx.is_interactive {
        let _ = tcsetpgrp(ShellContext::terminal_fd(), pgid);
    }
    signals::set_foreground(Some(pgid));
    if was_stopped {
        nix::sys::signal::killpg(pgid, nix::sys::signal::Signal::SIGCONT).map_err(|e| {
            ShellError::job(JobErrorKind::SignalFailed, format!("fg: SIGCONT: {e}"))
        })?;
    }
    ctx.jobs.mark_running(id);

    let mut status = 0;
    let mut stopped = false;
    loop {
        ctx.profiler.poll();
        match waitpid(Pid::from_raw(-pgid.as_raw()), Some(WaitPidFlag::WUNTRACED)) {
            Ok(ws @ WaitStatus::Exited(pid, code)) => {
                status = code;
                ctx.jobs.note_status(pid, &ws);
            }
            Ok(ws @ WaitStatus::Signaled(pid, sig, _)) => {
                status = 128 + sig as i32;
                ctx.jobs.note_status(pid, &ws);
            }
            Ok(WaitStatus::Stopped(..)) => {
                stopped = true;
                break;
            }
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(_) => break, // ECHILD: every process in the group is gone
        }
    }

    signals::set_foreground(None);
    ctx.reclaim_terminal();

    if stopped {
        ctx.jobs.mark_stopped(id);
        if let Some(job) = ctx.jobs.get(id) {
            println!("{job}");
        }
        Ok(148)
    } else {
        ctx.jobs.remove(id);
        Ok(status)
    }
}

/// Block until a job's process group has fully exited (or stopped), without
/// touching the terminal. Used by the `wait` internal.
pub fn wait_for_job(ctx: &mut ShellContext, id: JobId) -> ShellResult<i32> {
    use crate::error::JobErrorKind;

    let pgid = match ctx.jobs.get(id) {
        Some(job) => job.pgid,
        None => {
            return Err(ShellError::job(
                JobErrorKind::NotFound,
                format!("wait: job not found: %{id}"),
            ))
        }
    };

    let mut status = 0;
    loop {
        match waitpid(Pid::from_raw(-pgid.as_raw()), Some(WaitPidFlag::WUNTRACED)) {
            Ok(ws @ WaitStatus::Exited(pid, code)) => {
                status = code;
                ctx.jobs.note_status(pid, &ws);
            }
            Ok(ws @ WaitStatus::Signaled(pid, sig, _)) => {
                status = 128 + sig as i32;
                ctx.jobs.note_status(pid, &ws);
            }
            Ok(WaitStatus::Stopped(..)) => {
                ctx.jobs.mark_stopped(id);
                return Ok(148);
            }
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(_) => break,
        }
    }
    ctx.jobs.remove(id);
    Ok(status)
}

/// Replace the process image; never returns. `ENOENT` is the classic
/// "command not found" and exits 127, anything else exits 1.
fn exec_program(argv: &[String]) -> ! {
    let cargs: Vec<CString> = argv
        .iter()
        .map(|a| CString::new(a.as_str()).unwrap_or_default())
        .collect();
    match execvp(&cargs[0], &cargs) {
        Err(Errno::ENOENT) => {
            eprintln!("{}: command not found", argv[0]);
            std::process::exit(127);
        }
        Err(e) => {
            eprintln!("{}: {}", argv[0], e.desc());
            std::process::exit(1);
        }
        Ok(infallible) => match infallible {},
    }
}

/// Spool each applicable here-document into an unlinked temporary file,
/// reading the shell's stdin until a line equals the delimiter.
fn prepare_heredocs(redirs: &[Redirection], scope: RedirScope) -> ShellResult<Vec<File>> {
    let mut files = Vec::new();
    for redir in redirs {
        if redir.kind == RedirKind::HereDoc && scope.applies(redir.kind) {
            files.push(spool_heredoc(&redir.target)?);
        }
    }
    Ok(files)
}

fn spool_heredoc(delimiter: &str) -> ShellResult<File> {
    let mut file = tempfile::tempfile().map_err(|e| {
        ShellError::redir(
            RedirErrorKind::HeredocFailed,
            format!("here-document spool: {e}"),
        )
    })?;
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        let n = stdin.read_line(&mut line).map_err(|e| {
            ShellError::redir(RedirErrorKind::HeredocFailed, format!("here-document: {e}"))
        })?;
        if n == 0 {
            break;
        }
        if line.trim_end_matches('\n') == delimiter {
            break;
        }
        file.write_all(line.as_bytes()).map_err(|e| {
            ShellError::redir(RedirErrorKind::HeredocFailed, format!("here-document: {e}"))
        })?;
    }
    file.seek(SeekFrom::Start(0)).map_err(|e| {
        ShellError::redir(RedirErrorKind::HeredocFailed, format!("here-document: {e}"))
    })?;
    Ok(file)
}

/// Apply a node's redirections, in order, to the current process's fds.
/// `heredocs` holds the pre-spooled files in redirection order.
fn apply_redirections(
    redirs: &[Redirection],
    scope: RedirScope,
    heredocs: &mut Vec<File>,
) -> ShellResult<()> {
    let mut heredocs = heredocs.drain(..);
    for redir in redirs {
        if !scope.applies(redir.kind) {
            continue;
        }
        match redir.kind {
            RedirKind::InFile => dup_file_to(open_redir_file(redir)?, 0)?,
            RedirKind::OutFile | RedirKind::AppendFile => {
                dup_file_to(open_redir_file(redir)?, 1)?
            }
            RedirKind::ErrFile | RedirKind::ErrAppendFile => {
                dup_file_to(open_redir_file(redir)?, 2)?
            }
            RedirKind::ErrToOut => {
                dup2(1, 2).map_err(|e| {
                    ShellError::redir(RedirErrorKind::DupFailed, format!("2>&1: {e}"))
                })?;
            }
            RedirKind::BothOut => {
                dup_file_to(open_redir_file(redir)?, 1)?;
                dup2(1, 2).map_err(|e| {
                    ShellError::redir(RedirErrorKind::DupFailed, format!("&>: {e}"))
                })?;
            }
            RedirKind::HereDoc => {
                let file = heredocs.next().ok_or_else(|| {
                    ShellError::redir(RedirErrorKind::HeredocFailed, "here-document missing")
                })?;
                dup_file_to(file, 0)?;
            }
        }
    }
    Ok(())
}

fn dup_file_to(file: File, target: i32) -> ShellResult<()> {
    dup2(file.as_raw_fd(), target).map_err(|e| {
        ShellError::redir(RedirErrorKind::DupFailed, format!("dup2: {e}"))
    })?;
    Ok(())
}

/// Open the target file for a redirection. Output forms create missing
/// parent directories (0755) and the file itself with mode 0644.
fn open_redir_file(redir: &Redirection) -> ShellResult<File> {
    use std::fs::OpenOptions;

    let result = match redir.kind {
        RedirKind::InFile => OpenOptions::new().read(true).open(&redir.target),
        RedirKind::OutFile | RedirKind::ErrFile | RedirKind::BothOut => {
            ensure_parent_dirs(&redir.target);
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o644)
                .open(&redir.target)
        }
        RedirKind::AppendFile | RedirKind::ErrAppendFile => {
            ensure_parent_dirs(&redir.target);
            OpenOptions::new()
                .write(true)
                .create(true)
                .append(true)
                .mode(0o644)
                .open(&redir.target)
        }
        RedirKind::ErrToOut | RedirKind::HereDoc => unreachable!("handled by caller"),
    };
    result.map_err(|e| {
        ShellError::redir(RedirErrorKind::OpenFailed, format!("{}: {e}", redir.target))
    })
}

fn ensure_parent_dirs(target: &str) {
    if let Some(parent) = std::path::Path::new(target).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::DirBuilder::new()
                .recursive(true)
                .mode(0o755)
                .create(parent);
        }
    }
}

/// Adapter giving the parsing layer its view of the shell: variables,
/// history, tilde homes, and subshell capture.
struct ExecEnv<'a, 'b> {
    exec: &'b Executor,
    ctx: &'a mut ShellContext,
}

impl ShellEnv for ExecEnv<'_, '_> {
    fn get_var(&self, name: &str) -> Option<String> {
        self.ctx.vars.get(name)
    }

    fn set_var(&mut self, name: &str, value: &str) {
        if let Err(e) = self.ctx.vars.set(name, value, false) {
            log::warn!(target: "qsh_core::executor", "assignment ignored: {e}");
        }
    }

    fn last_status(&self) -> i32 {
        self.ctx.last_status
    }

    fn shell_pid(&self) -> i32 {
        getpid().as_raw()
    }

    fn parent_pid(&self) -> i32 {
        getppid().as_raw()
    }

    fn history_last(&self) -> Option<String> {
        self.ctx.history.last().map(|e| e.command.clone())
    }

    fn history_at(&self, index: usize) -> Option<String> {
        self.ctx.history.get(index).map(|e| e.command.clone())
    }

    fn home_dir(&self, user: Option<&str>) -> Option<String> {
        match user {
            None => self
                .ctx
                .home
                .as_ref()
                .map(|p| p.display().to_string())
                .or_else(|| self.ctx.vars.get("HOME")),
            Some(name) => nix::unistd::User::from_name(name)
                .ok()
                .flatten()
                .map(|u| u.dir.display().to_string()),
        }
    }

    /// Subshell capture for `$(...)` and backticks: fork, pipe the child's
    /// stdout back, send its stderr to /dev/null, read to EOF, reap.
    fn capture_output(&mut self, command: &str) -> (String, i32) {
        let (read_end, write_end) = match pipe() {
            Ok(pair) => pair,
            Err(e) => {
                eprintln!("qsh: pipe: {e}");
                return (String::new(), 1);
            }
        };

        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                drop(read_end);
                let _ = dup2(write_end.as_raw_fd(), 1);
                drop(write_end);
                if let Ok(devnull) = std::fs::OpenOptions::new().write(true).open("/dev/null") {
                    let _ = dup2(devnull.as_raw_fd(), 2);
                }
                signals::reset_child_signals();
                let status = match self.exec.run_line(command, self.ctx) {
                    LineResult::Executed(status) => status,
                    LineResult::Empty => 0,
                    LineResult::ParseFailed => 1,
                };
                let _ = std::io::stdout().flush();
                std::process::exit(status);
            }
            Ok(ForkResult::Parent { child }) => {
                drop(write_end);
                let mut output = String::new();
                let mut reader = File::from(read_end);
                if let Err(e) = reader.read_to_string(&mut output) {
                    log::warn!(target: "qsh_core::executor", "substitution read: {e}");
                }
                let status = match waitpid(child, None) {
                    Ok(WaitStatus::Exited(_, code)) => code,
                    Ok(WaitStatus::Signaled(_, sig, _)) => 128 + sig as i32,
                    _ => 1,
                };
                (output, status)
            }
            Err(e) => {
                eprintln!("qsh: fork: {e}");
                (String::new(), 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirection_scope_by_stage() {
        // 3-stage pipeline: first input-only, middle none, last all.
        assert_eq!(RedirScope::for_stage(0, 3), RedirScope::InputOnly);
        assert_eq!(RedirScope::for_stage(1, 3), RedirScope::None);
        assert_eq!(RedirScope::for_stage(2, 3), RedirScope::All);
        // Single command applies everything.
        assert_eq!(RedirScope::for_stage(0, 1), RedirScope::All);
    }

    #[test]
    fn scope_filters_kinds() {
        assert!(RedirScope::InputOnly.applies(RedirKind::InFile));
        assert!(RedirScope::InputOnly.applies(RedirKind::HereDoc));
        assert!(!RedirScope::InputOnly.applies(RedirKind::OutFile));
        assert!(!RedirScope::None.applies(RedirKind::InFile));
        assert!(RedirScope::All.applies(RedirKind::ErrToOut));
    }

    #[test]
    fn registry_lookup_and_listing() {
        struct Probe;
        impl Builtin for Probe {
            fn name(&self) -> &'static str {
                "probe"
            }
            fn synopsis(&self) -> &'static str {
                "test probe"
            }
            fn usage(&self) -> &'static str {
                "probe"
            }
            fn execute(&self, _ctx: &mut ShellContext, _args: &[String]) -> ShellResult<i32> {
                Ok(0)
            }
        }

        let mut exec = Executor::new();
        exec.register(Arc::new(Probe));
        assert!(exec.lookup("probe").is_some());
        assert!(exec.lookup("missing").is_none());
        assert_eq!(exec.builtin_summaries()[0].0, "probe");
    }
}
