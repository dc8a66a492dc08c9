//! `unset`: remove variables.

use qsh_core::{Builtin, ShellContext, ShellResult};

pub struct UnsetCommand;

impl Builtin for UnsetCommand {
    fn name(&self) -> &'static str {
        "unset"
    }

    fn synopsis(&self) -> &'static str {
        "Remove variables"
    }

    fn usage(&self) -> &'static str {
        "unset NAME..."
    }

    fn execute(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<i32> {
        for name in &args[1..] {
            ctx.vars.unset(name);
        }
        Ok(0)
    }
}
