//! `exit`: leave the shell, optionally with a status.

use qsh_core::{Builtin, ShellContext, ShellResult};

pub struct ExitCommand;

impl Builtin for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn synopsis(&self) -> &'static str {
        "Exit the shell"
    }

    fn usage(&self) -> &'static str {
        "exit [STATUS]"
    }

    fn execute(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<i32> {
        ctx.should_exit = true;
        let status = args
            .get(1)
            .and_then(|s| s.parse::<i32>().ok())
            .unwrap_or(0);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_exit_flag_and_returns_status() {
        let mut ctx = ShellContext::new().unwrap();
        let status = ExitCommand
            .execute(&mut ctx, &["exit".into(), "3".into()])
            .unwrap();
        assert!(ctx.should_exit);
        assert_eq!(status, 3);
    }

    #[test]
    fn non_numeric_argument_defaults_to_zero() {
        let mut ctx = ShellContext::new().unwrap();
        let status = ExitCommand
            .execute(&mut ctx, &["exit".into(), "soon".into()])
            .unwrap();
        assert_eq!(status, 0);
    }
}
