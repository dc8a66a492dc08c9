//! `help`: one-line descriptions of every internal command.

use qsh_core::{Builtin, ShellContext, ShellResult};

pub struct HelpCommand {
    entries: Vec<(&'static str, &'static str)>,
}

impl HelpCommand {
    /// `entries` is the full `(name, synopsis)` table, assembled at
    /// registration time so the listing always matches what is installed.
    pub fn new(mut entries: Vec<(&'static str, &'static str)>) -> Self {
        entries.sort_by_key(|(name, _)| *name);
        Self { entries }
    }
}

impl Builtin for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn synopsis(&self) -> &'static str {
        "Show help for built-in commands"
    }

    fn usage(&self) -> &'static str {
        "help"
    }

    fn execute(&self, _ctx: &mut ShellContext, _args: &[String]) -> ShellResult<i32> {
        println!("Built-in commands:");
        for (name, synopsis) in &self.entries {
            println!("  {name:<10} {synopsis}");
        }
        Ok(0)
    }
}
