//! `kill`: send a signal to a job or process.
//!
//! `kill [-SIG] TARGET` where `TARGET` is a `%N` job spec (signalled as a
//! process group) or a raw pid. Signals may be numeric (`-9`) or named
//! (`-KILL`, `-TERM`, `-INT`, `-HUP`, with or without the `SIG` prefix).

use nix::sys::signal::{kill as send_signal, Signal};
use nix::unistd::Pid;
use qsh_core::{parse_job_spec, Builtin, ShellContext, ShellResult};

pub struct KillCommand;

impl Builtin for KillCommand {
    fn name(&self) -> &'static str {
        "kill"
    }

    fn synopsis(&self) -> &'static str {
        "Send a signal to a job or process"
    }

    fn usage(&self) -> &'static str {
        "kill [-SIG] %N|PID"
    }

    fn execute(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<i32> {
        let mut signal = Signal::SIGTERM;
        let mut target: Option<&str> = None;

        for arg in &args[1..] {
            if let Some(spec) = arg.strip_prefix('-') {
                match parse_signal(spec) {
                    Some(sig) => signal = sig,
                    None => {
                        eprintln!("kill: invalid signal: {arg}");
                        return Ok(1);
                    }
                }
            } else {
                target = Some(arg);
            }
        }

        let Some(target) = target else {
            eprintln!("usage: {}", self.usage());
            return Ok(1);
        };

        if let Some(job_spec) = target.strip_prefix('%') {
            let id = parse_job_spec(job_spec).filter(|id| ctx.jobs.get(*id).is_some());
            let Some(id) = id else {
                eprintln!("kill: job not found");
                return Ok(1);
            };
            if let Err(e) = ctx.jobs.signal(id, signal) {
                eprintln!("kill: {e}");
                return Ok(1);
            }
            return Ok(0);
        }

        match target.parse::<i32>() {
            Ok(pid) if pid > 0 => match send_signal(Pid::from_raw(pid), signal) {
                Ok(()) => Ok(0),
                Err(e) => {
                    eprintln!("kill: ({pid}): {e}");
                    Ok(1)
                }
            },
            _ => {
                eprintln!("kill: invalid target: {target}");
                Ok(1)
            }
        }
    }
}

/// Signal spec without the leading dash: a number or a name.
fn parse_signal(spec: &str) -> Option<Signal> {
    if let Ok(num) = spec.parse::<i32>() {
        return Signal::try_from(num).ok();
    }
    let name = spec.strip_prefix("SIG").unwrap_or(spec);
    match name.to_ascii_uppercase().as_str() {
        "HUP" => Some(Signal::SIGHUP),
        "INT" => Some(Signal::SIGINT),
        "QUIT" => Some(Signal::SIGQUIT),
        "KILL" => Some(Signal::SIGKILL),
        "TERM" => Some(Signal::SIGTERM),
        "STOP" => Some(Signal::SIGSTOP),
        "CONT" => Some(Signal::SIGCONT),
        "USR1" => Some(Signal::SIGUSR1),
        "USR2" => Some(Signal::SIGUSR2),
        _ => None,
    }
}
