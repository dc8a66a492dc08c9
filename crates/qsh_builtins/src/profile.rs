//! `profile`: control the syscall profiler.
//!
//! `profile on` attaches the profiler to the shell's own process,
//! `profile off` detaches, `profile status` prints the accumulated report
//! (whose first line states enabled/disabled).

use nix::unistd::getpid;
use qsh_core::{Builtin, ShellContext, ShellResult};

pub struct ProfileCommand;

impl Builtin for ProfileCommand {
    fn name(&self) -> &'static str {
        "profile"
    }

    fn synopsis(&self) -> &'static str {
        "Manage syscall profiling"
    }

    fn usage(&self) -> &'static str {
        "profile on|off|status"
    }

    fn execute(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<i32> {
        match args.get(1).map(String::as_str) {
            Some("on") => match ctx.profiler.start(getpid()) {
                Ok(()) => {
                    println!("Profiling enabled");
                    Ok(0)
                }
                Err(e) => {
                    eprintln!("profile: {e}");
                    Ok(1)
                }
            },
            Some("off") => match ctx.profiler.stop() {
                Ok(()) => {
                    println!("Profiling disabled");
                    Ok(0)
                }
                Err(e) => {
                    eprintln!("profile: {e}");
                    Ok(1)
                }
            },
            Some("status") => {
                print!("{}", ctx.profiler.render_report());
                Ok(0)
            }
            _ => {
                eprintln!("usage: {}", self.usage());
                Ok(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_without_on_fails() {
        let mut ctx = ShellContext::new().unwrap();
        let status = ProfileCommand
            .execute(&mut ctx, &["profile".into(), "off".into()])
            .unwrap();
        assert_eq!(status, 1);
    }

    #[test]
    fn status_reports_disabled() {
        let mut ctx = ShellContext::new().unwrap();
        let status = ProfileCommand
            .execute(&mut ctx, &["profile".into(), "status".into()])
            .unwrap();
        assert_eq!(status, 0);
        assert!(!ctx.profiler.is_attached());
    }

    #[test]
    fn missing_subcommand_prints_usage() {
        let mut ctx = ShellContext::new().unwrap();
        let status = ProfileCommand
            .execute(&mut ctx, &["profile".into()])
            .unwrap();
        assert_eq!(status, 1);
    }
}
