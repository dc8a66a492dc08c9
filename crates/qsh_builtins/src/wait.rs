//! `wait`: wait for background jobs to finish.

use qsh_core::{parse_job_spec, wait_for_job, Builtin, ShellContext, ShellResult};

pub struct WaitCommand;

impl Builtin for WaitCommand {
    fn name(&self) -> &'static str {
        "wait"
    }

    fn synopsis(&self) -> &'static str {
        "Wait for background jobs"
    }

    fn usage(&self) -> &'static str {
        "wait [%N]"
    }

    fn execute(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<i32> {
        match args.get(1) {
            Some(spec) => {
                let Some(id) = parse_job_spec(spec) else {
                    eprintln!("wait: invalid job spec: {spec}");
                    return Ok(1);
                };
                match wait_for_job(ctx, id) {
                    Ok(status) => Ok(status),
                    Err(e) => {
                        eprintln!("{e}");
                        Ok(1)
                    }
                }
            }
            None => {
                // Wait for everything, in registration order; the final
                // job's status is reported.
                let mut status = 0;
                for id in ctx.jobs.ids() {
                    if let Ok(s) = wait_for_job(ctx, id) {
                        status = s;
                    }
                }
                Ok(status)
            }
        }
    }
}
