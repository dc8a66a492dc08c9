//! `jobs`: list tracked jobs.

use qsh_core::{Builtin, ShellContext, ShellResult};

pub struct JobsCommand;

impl Builtin for JobsCommand {
    fn name(&self) -> &'static str {
        "jobs"
    }

    fn synopsis(&self) -> &'static str {
        "List background and stopped jobs"
    }

    fn usage(&self) -> &'static str {
        "jobs"
    }

    fn execute(&self, ctx: &mut ShellContext, _args: &[String]) -> ShellResult<i32> {
        // Fold in any state changes children reported since the last prompt.
        ctx.jobs.reap(false);
        for job in ctx.jobs.iter() {
            println!("{job}");
        }
        Ok(0)
    }
}
