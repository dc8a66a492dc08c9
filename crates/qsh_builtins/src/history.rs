//! `history`: list recorded commands.
//!
//! Each entry prints its index, local timestamp, exit status, and command
//! text.

use qsh_core::{Builtin, ShellContext, ShellResult};

pub struct HistoryCommand;

impl Builtin for HistoryCommand {
    fn name(&self) -> &'static str {
        "history"
    }

    fn synopsis(&self) -> &'static str {
        "Show command history"
    }

    fn usage(&self) -> &'static str {
        "history"
    }

    fn execute(&self, ctx: &mut ShellContext, _args: &[String]) -> ShellResult<i32> {
        for (i, entry) in ctx.history.iter().enumerate() {
            println!(
                "{:5}  {}  [{}]  {}",
                i + 1,
                entry.format_time(),
                entry.exit_status,
                entry.command
            );
        }
        Ok(0)
    }
}
