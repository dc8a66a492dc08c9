//! `fg`: bring a job to the foreground.

use qsh_core::{parse_job_spec, resume_job_foreground, Builtin, JobId, ShellContext, ShellResult};

pub struct FgCommand;

impl Builtin for FgCommand {
    fn name(&self) -> &'static str {
        "fg"
    }

    fn synopsis(&self) -> &'static str {
        "Bring a job to the foreground"
    }

    fn usage(&self) -> &'static str {
        "fg [%N]"
    }

    fn execute(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<i32> {
        let Some(id) = resolve_job(ctx, args.get(1)) else {
            eprintln!("fg: job not found");
            return Ok(1);
        };
        match resume_job_foreground(ctx, id) {
            Ok(status) => Ok(status),
            Err(e) => {
                eprintln!("{e}");
                Ok(1)
            }
        }
    }
}

/// `%N` when given, otherwise the most recently registered job.
pub(crate) fn resolve_job(ctx: &ShellContext, spec: Option<&String>) -> Option<JobId> {
    match spec {
        Some(spec) => {
            let id = parse_job_spec(spec)?;
            ctx.jobs.get(id).map(|j| j.id)
        }
        None => ctx.jobs.ids().last().copied(),
    }
}
