//! `export`: mark variables for the environment of child processes.
//!
//! Accepts `NAME` (exporting the current or inherited value) and
//! `NAME=VALUE`. With no arguments, lists exported variables.

use qsh_core::{Builtin, ShellContext, ShellResult};

pub struct ExportCommand;

impl Builtin for ExportCommand {
    fn name(&self) -> &'static str {
        "export"
    }

    fn synopsis(&self) -> &'static str {
        "Export variables to child processes"
    }

    fn usage(&self) -> &'static str {
        "export [NAME[=VALUE]...]"
    }

    fn execute(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<i32> {
        if args.len() == 1 {
            for name in ctx.vars.names() {
                if ctx.vars.is_exported(&name) {
                    let value = ctx.vars.get(&name).unwrap_or_default();
                    println!("export {name}={value}");
                }
            }
            return Ok(0);
        }

        let mut status = 0;
        for arg in &args[1..] {
            let result = match arg.split_once('=') {
                Some((name, value)) => ctx.vars.set(name, value, true),
                None => ctx.vars.export(arg),
            };
            if let Err(e) = result {
                eprintln!("export: {e}");
                status = 1;
            }
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_assignment_and_bare_name() {
        let mut ctx = ShellContext::new().unwrap();
        ExportCommand
            .execute(&mut ctx, &["export".into(), "QSH_EXP_A=v".into()])
            .unwrap();
        assert!(ctx.vars.is_exported("QSH_EXP_A"));

        ctx.vars.set("QSH_EXP_B", "w", false).unwrap();
        ExportCommand
            .execute(&mut ctx, &["export".into(), "QSH_EXP_B".into()])
            .unwrap();
        assert!(ctx.vars.is_exported("QSH_EXP_B"));

        ctx.vars.unset("QSH_EXP_A");
        ctx.vars.unset("QSH_EXP_B");
    }

    #[test]
    fn invalid_name_fails() {
        let mut ctx = ShellContext::new().unwrap();
        let status = ExportCommand
            .execute(&mut ctx, &["export".into(), "1bad=v".into()])
            .unwrap();
        assert_eq!(status, 1);
    }
}
