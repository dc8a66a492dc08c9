//! `true` and `false`: fixed exit statuses.

use qsh_core::{Builtin, ShellContext, ShellResult};

pub struct TrueCommand;

impl Builtin for TrueCommand {
    fn name(&self) -> &'static str {
        "true"
    }

    fn synopsis(&self) -> &'static str {
        "Return success"
    }

    fn usage(&self) -> &'static str {
        "true"
    }

    fn execute(&self, _ctx: &mut ShellContext, _args: &[String]) -> ShellResult<i32> {
        Ok(0)
    }
}

pub struct FalseCommand;

impl Builtin for FalseCommand {
    fn name(&self) -> &'static str {
        "false"
    }

    fn synopsis(&self) -> &'static str {
        "Return failure"
    }

    fn usage(&self) -> &'static str {
        "false"
    }

    fn execute(&self, _ctx: &mut ShellContext, _args: &[String]) -> ShellResult<i32> {
        Ok(1)
    }
}
