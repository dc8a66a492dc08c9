//! qsh binary: CLI surface, logging setup, and the REPL driver.
//!
//! The driver reads logical lines (concatenating continuation lines while
//! a quote is open), expands the first-word alias, hands the line to the
//! executor, and records history. Deferred SIGCHLD notifications are
//! drained before each prompt.

use anyhow::Context as _;
use clap::Parser;
use qsh_core::{signals, Executor, LineResult, ShellContext};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

#[derive(Parser, Debug)]
#[command(name = "qsh", version, about = "A Unix shell with syscall profiling", long_about = None)]
struct Cli {
    /// Evaluate a single command line and exit.
    #[arg(short = 'c', value_name = "COMMAND")]
    command: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut ctx = ShellContext::new().context("failed to initialize shell")?;
    let mut exec = Executor::new();
    qsh_builtins::register_all(&mut exec);
    ctx.init_interactive()
        .context("failed to initialize terminal and signals")?;

    if let Err(e) = ctx.history.load() {
        log::warn!("history load: {e}");
    }

    if let Some(command) = cli.command {
        let status = match exec.run_line(&command, &mut ctx) {
            LineResult::Executed(status) => status,
            LineResult::Empty => 0,
            LineResult::ParseFailed => 2,
        };
        shutdown(&mut ctx);
        std::process::exit(status);
    }

    if ctx.is_interactive {
        println!();
        println!("qsh - a Unix shell with syscall profiling");
        println!("Type 'help' for a list of built-in commands");
        println!();
    }

    repl(&mut ctx, &exec)?;
    shutdown(&mut ctx);
    Ok(())
}

fn repl(ctx: &mut ShellContext, exec: &Executor) -> anyhow::Result<()> {
    let mut editor = if ctx.is_interactive {
        let mut ed = DefaultEditor::new().context("line editor init")?;
        for entry in ctx.history.iter() {
            let _ = ed.add_history_entry(&entry.command);
        }
        Some(ed)
    } else {
        None
    };

    while !ctx.should_exit {
        ctx.profiler.poll();
        if signals::take_sigchld() {
            ctx.jobs.reap(ctx.is_interactive);
        }

        let prompt = ctx.prompt();
        let Some(line) = read_logical_line(&mut editor, &prompt) else {
            // EOF (Ctrl+D or closed pipe).
            if ctx.is_interactive {
                println!();
            }
            break;
        };

        if line.trim().is_empty() {
            continue;
        }
        if let Some(ed) = &mut editor {
            let _ = ed.add_history_entry(line.as_str());
        }

        let expanded = ctx.aliases.expand(&line);
        match exec.run_line(&expanded, ctx) {
            LineResult::Executed(status) => ctx.history.add(line.as_str(), status),
            LineResult::Empty | LineResult::ParseFailed => {}
        }
        let _ = std::io::Write::flush(&mut std::io::stdout());
    }
    Ok(())
}

fn shutdown(ctx: &mut ShellContext) {
    if ctx.profiler.is_attached() {
        let _ = ctx.profiler.stop();
    }
    if let Err(e) = ctx.history.save() {
        eprintln!("qsh: {e}");
    }
    let _ = std::io::Write::flush(&mut std::io::stdout());
}

/// Read one logical line, appending continuation lines while a quote is
/// still open. Returns `None` at end of input.
fn read_logical_line(editor: &mut Option<DefaultEditor>, prompt: &str) -> Option<String> {
    let mut line = read_one(editor, prompt)?;
    while line_is_open(&line) {
        match read_one(editor, "> ") {
            Some(more) => {
                line.push('\n');
                line.push_str(&more);
            }
            None => break,
        }
    }
    Some(line)
}

fn read_one(editor: &mut Option<DefaultEditor>, prompt: &str) -> Option<String> {
    match editor {
        Some(ed) => match ed.readline(prompt) {
            Ok(line) => Some(line),
            // ^C at the prompt: present a fresh one.
            Err(ReadlineError::Interrupted) => Some(String::new()),
            Err(ReadlineError::Eof) => None,
            Err(e) => {
                log::warn!("readline: {e}");
                None
            }
        },
        None => {
            let mut buf = String::new();
            match std::io::stdin().read_line(&mut buf) {
                Ok(0) | Err(_) => None,
                Ok(_) => {
                    if buf.ends_with('\n') {
                        buf.pop();
                    }
                    Some(buf)
                }
            }
        }
    }
}

/// True while the line ends inside an open single or double quote.
fn line_is_open(line: &str) -> bool {
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;

    for c in line.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if !in_single => escaped = true,
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            _ => {}
        }
    }
    in_single || in_double
}

/// Map the `QSH_DEBUG` hex category mask onto per-module log filters;
/// `RUST_LOG` still applies for anything finer.
fn init_logging() {
    let mut builder = env_logger::Builder::from_default_env();
    let raw = std::env::var("QSH_DEBUG").ok();
    if let Some(mask) = qsh_core::debug::parse_mask(raw.as_deref()) {
        for (bit, target) in qsh_core::debug::CATEGORY_TARGETS {
            if mask & bit != 0 {
                builder.filter_module(target, log::LevelFilter::Debug);
            }
        }
    }
    builder.init();
}
