//! Executor integration tests: real processes, pipes, and redirections.
//!
//! These run external commands only (no internals are registered), so the
//! executor's fork/exec paths are what is under test. A process-wide lock
//! keeps child reaping from interleaving between test threads.

use qsh_core::{Executor, LineResult, ShellContext};
use std::sync::Mutex;
use tempfile::TempDir;

static FORK_LOCK: Mutex<()> = Mutex::new(());

fn run(exec: &Executor, ctx: &mut ShellContext, line: &str) -> i32 {
    match exec.run_line(line, ctx) {
        LineResult::Executed(status) => status,
        other => panic!("line {line:?} did not execute: {other:?}"),
    }
}

fn setup() -> (Executor, ShellContext, TempDir) {
    let exec = Executor::new();
    let ctx = ShellContext::new().expect("context");
    let dir = TempDir::new().expect("tempdir");
    (exec, ctx, dir)
}

#[test]
fn output_redirection_writes_file() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, dir) = setup();
    let out = dir.path().join("out.txt");

    let status = run(&exec, &mut ctx, &format!("echo 'Hello, World!' > {}", out.display()));
    assert_eq!(status, 0);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "Hello, World!\n");
}

#[test]
fn append_redirection_accumulates() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, dir) = setup();
    let out = dir.path().join("log");

    run(&exec, &mut ctx, &format!("echo one > {}", out.display()));
    run(&exec, &mut ctx, &format!("echo two >> {}", out.display()));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "one\ntwo\n");
}

#[test]
fn output_redirection_creates_parent_dirs() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, dir) = setup();
    let out = dir.path().join("a/b/out.txt");

    let status = run(&exec, &mut ctx, &format!("echo deep > {}", out.display()));
    assert_eq!(status, 0);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "deep\n");
}

#[test]
fn three_stage_pipeline() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, dir) = setup();
    let out = dir.path().join("count");

    let status = run(
        &exec,
        &mut ctx,
        &format!("echo Hello | grep Hello | wc -l > {}", out.display()),
    );
    assert_eq!(status, 0);
    assert_eq!(std::fs::read_to_string(&out).unwrap().trim(), "1");
    // Foreground pipeline jobs are reaped on completion.
    assert!(ctx.jobs.is_empty());
}

#[test]
fn pipeline_status_is_rightmost_stage() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, _dir) = setup();

    assert_eq!(run(&exec, &mut ctx, "false | true"), 0);
    assert_ne!(run(&exec, &mut ctx, "true | false"), 0);
}

#[test]
fn short_circuit_and_or() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, dir) = setup();
    let mk = |name: &str| dir.path().join(name).display().to_string();

    assert_ne!(run(&exec, &mut ctx, &format!("false && echo no > {}", mk("a"))), 0);
    assert!(!dir.path().join("a").exists());

    assert_eq!(run(&exec, &mut ctx, &format!("true || echo no > {}", mk("b"))), 0);
    assert!(!dir.path().join("b").exists());

    assert_eq!(run(&exec, &mut ctx, &format!("false || echo yes > {}", mk("c"))), 0);
    assert_eq!(std::fs::read_to_string(dir.path().join("c")).unwrap(), "yes\n");

    assert_eq!(run(&exec, &mut ctx, &format!("true && echo yes > {}", mk("d"))), 0);
    assert!(dir.path().join("d").exists());
}

#[test]
fn last_status_updates_per_node() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, _dir) = setup();

    run(&exec, &mut ctx, "false ; true");
    assert_eq!(ctx.last_status, 0);
    run(&exec, &mut ctx, "true ; false");
    assert_eq!(ctx.last_status, 1);
}

#[test]
fn command_not_found_is_127() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, _dir) = setup();
    let status = run(&exec, &mut ctx, "qsh-definitely-missing-command");
    assert_eq!(status, 127);
}

#[test]
fn stderr_redirection() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, dir) = setup();
    let err = dir.path().join("err");

    let status = run(
        &exec,
        &mut ctx,
        &format!("sh -c 'echo oops >&2' 2> {}", err.display()),
    );
    assert_eq!(status, 0);
    assert_eq!(std::fs::read_to_string(&err).unwrap(), "oops\n");
}

#[test]
fn stderr_to_stdout_follows_redirection() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, dir) = setup();
    let out = dir.path().join("all");

    let status = run(
        &exec,
        &mut ctx,
        &format!("sh -c 'echo oops >&2' > {} 2>&1", out.display()),
    );
    assert_eq!(status, 0);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "oops\n");
}

#[test]
fn both_out_redirection() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, dir) = setup();
    let out = dir.path().join("both");

    let status = run(
        &exec,
        &mut ctx,
        &format!("sh -c 'echo a; echo b >&2' &> {}", out.display()),
    );
    assert_eq!(status, 0);
    let content = std::fs::read_to_string(&out).unwrap();
    assert!(content.contains('a') && content.contains('b'));
}

#[test]
fn input_redirection() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, dir) = setup();
    let src = dir.path().join("src");
    let out = dir.path().join("out");
    std::fs::write(&src, "alpha\nbeta\n").unwrap();

    let status = run(
        &exec,
        &mut ctx,
        &format!("grep beta < {} > {}", src.display(), out.display()),
    );
    assert_eq!(status, 0);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "beta\n");
}

#[test]
fn missing_input_file_fails() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, dir) = setup();
    let status = run(
        &exec,
        &mut ctx,
        &format!("cat < {}/does-not-exist", dir.path().display()),
    );
    assert_eq!(status, 1);
}

#[test]
fn command_substitution_feeds_argv() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, dir) = setup();
    let out = dir.path().join("sub");

    let status = run(
        &exec,
        &mut ctx,
        &format!("echo $(printf inner) > {}", out.display()),
    );
    assert_eq!(status, 0);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "inner\n");
}

#[test]
fn variable_assignment_then_reference() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, dir) = setup();
    let out = dir.path().join("var");

    assert!(matches!(
        exec.run_line("QSH_E2E_X=42", &mut ctx),
        LineResult::Executed(_)
    ));
    let status = run(&exec, &mut ctx, &format!("echo $QSH_E2E_X > {}", out.display()));
    assert_eq!(status, 0);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "42\n");
}

#[test]
fn background_job_lifecycle() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, _dir) = setup();

    let status = run(&exec, &mut ctx, "sleep 0.3 &");
    assert_eq!(status, 0);
    assert_eq!(ctx.jobs.len(), 1);
    let job = ctx.jobs.iter().next().unwrap();
    assert!(job.running);
    assert_eq!(job.state_label(), "Running");

    let id = job.id;
    let wait_status = qsh_core::wait_for_job(&mut ctx, id).unwrap();
    assert_eq!(wait_status, 0);
    assert!(ctx.jobs.is_empty());
}

#[test]
fn sequential_chain_runs_all_nodes() {
    let _guard = FORK_LOCK.lock().unwrap();
    let (exec, mut ctx, dir) = setup();
    let a = dir.path().join("a");
    let b = dir.path().join("b");

    run(
        &exec,
        &mut ctx,
        &format!("echo 1 > {} ; echo 2 > {}", a.display(), b.display()),
    );
    assert_eq!(std::fs::read_to_string(&a).unwrap(), "1\n");
    assert_eq!(std::fs::read_to_string(&b).unwrap(), "2\n");
}
