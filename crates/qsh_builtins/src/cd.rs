//! `cd`: change the current working directory.
//!
//! `cd` with no argument goes to the home directory; `cd -` swaps with the
//! previous directory (printing the destination, as interactive shells do).

use qsh_core::{Builtin, ShellContext, ShellResult};
use std::path::PathBuf;

pub struct CdCommand;

impl Builtin for CdCommand {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn synopsis(&self) -> &'static str {
        "Change the current directory"
    }

    fn usage(&self) -> &'static str {
        "cd [DIR | -]"
    }

    fn execute(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<i32> {
        let target = match args.get(1).map(String::as_str) {
            None => match ctx.home.clone().or_else(|| ctx.vars.get("HOME").map(PathBuf::from)) {
                Some(home) => home,
                None => {
                    eprintln!("cd: no home directory");
                    return Ok(1);
                }
            },
            Some("-") => match ctx.prev_cwd.clone() {
                Some(prev) => {
                    println!("{}", prev.display());
                    prev
                }
                None => {
                    eprintln!("cd: no previous directory");
                    return Ok(1);
                }
            },
            Some(path) => PathBuf::from(path),
        };

        match ctx.change_dir(&target) {
            Ok(()) => Ok(0),
            Err(e) => {
                eprintln!("cd: {e}");
                Ok(1)
            }
        }
    }
}
