//! `echo`: write arguments to standard output.
//!
//! Supports `-n` (no trailing newline), `-e` (interpret `\n \t \r \\`),
//! and the combined forms `-ne` / `-en`.

use qsh_core::{Builtin, ShellContext, ShellResult};

pub struct EchoCommand;

impl Builtin for EchoCommand {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn synopsis(&self) -> &'static str {
        "Write arguments to standard output"
    }

    fn usage(&self) -> &'static str {
        "echo [-n] [-e] [ARG...]"
    }

    fn execute(&self, _ctx: &mut ShellContext, args: &[String]) -> ShellResult<i32> {
        print!("{}", render(&args[1..]));
        Ok(0)
    }
}

/// Build the exact output bytes, flags included. Split out for testing.
fn render(args: &[String]) -> String {
    let mut newline = true;
    let mut escapes = false;
    let mut start = 0;

    for arg in args {
        match arg.as_str() {
            "-n" => newline = false,
            "-e" => escapes = true,
            "-ne" | "-en" => {
                newline = false;
                escapes = true;
            }
            _ => break,
        }
        start += 1;
    }

    let mut out = String::new();
    for (i, arg) in args[start..].iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        if escapes {
            out.push_str(&unescape(arg));
        } else {
            out.push_str(arg);
        }
    }
    if newline {
        out.push('\n');
    }
    out
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
