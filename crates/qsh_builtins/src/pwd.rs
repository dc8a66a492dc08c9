//! `pwd`: print the current working directory.

use qsh_core::{Builtin, ShellContext, ShellResult};

pub struct PwdCommand;

impl Builtin for PwdCommand {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn synopsis(&self) -> &'static str {
        "Print the current directory"
    }

    fn usage(&self) -> &'static str {
        "pwd"
    }

    fn execute(&self, ctx: &mut ShellContext, _args: &[String]) -> ShellResult<i32> {
        println!("{}", ctx.cwd.display());
        Ok(0)
    }
}
