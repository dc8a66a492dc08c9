//! `bg`: continue a stopped job in the background.

use crate::fg::resolve_job;
use nix::sys::signal::Signal;
use qsh_core::{Builtin, ShellContext, ShellResult};

pub struct BgCommand;

impl Builtin for BgCommand {
    fn name(&self) -> &'static str {
        "bg"
    }

    fn synopsis(&self) -> &'static str {
        "Continue a stopped job in the background"
    }

    fn usage(&self) -> &'static str {
        "bg [%N]"
    }

    fn execute(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<i32> {
        let Some(id) = resolve_job(ctx, args.get(1)) else {
            eprintln!("bg: job not found");
            return Ok(1);
        };
        if let Err(e) = ctx.jobs.signal(id, Signal::SIGCONT) {
            eprintln!("bg: SIGCONT: {e}");
            return Ok(1);
        }
        ctx.jobs.mark_running(id);
        if let Some(job) = ctx.jobs.get(id) {
            println!("[{}] {} &", job.id, job.cmd);
        }
        Ok(0)
    }
}
