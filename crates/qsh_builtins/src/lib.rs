//! Internal command implementations for qsh.
//!
//! Each internal lives in its own module and implements
//! [`qsh_core::Builtin`]; [`register_all`] installs the full set into an
//! executor, wiring the `help` listing from the same table.

mod alias;
mod bg;
mod cd;
mod echo;
mod exit;
mod export;
mod fg;
mod help;
mod history;
mod jobs;
mod kill;
mod profile;
mod pwd;
mod truefalse;
mod unset;
mod wait;

pub use alias::{AliasCommand, UnaliasCommand};
pub use bg::BgCommand;
pub use cd::CdCommand;
pub use echo::EchoCommand;
pub use exit::ExitCommand;
pub use export::ExportCommand;
pub use fg::FgCommand;
pub use help::HelpCommand;
pub use history::HistoryCommand;
pub use jobs::JobsCommand;
pub use kill::KillCommand;
pub use profile::ProfileCommand;
pub use pwd::PwdCommand;
pub use truefalse::{FalseCommand, TrueCommand};
pub use unset::UnsetCommand;
pub use wait::WaitCommand;

use qsh_core::{Builtin, Executor};
use std::sync::Arc;

/// Register every internal command.
pub fn register_all(exec: &mut Executor) {
    let commands: Vec<Arc<dyn Builtin>> = vec![
        Arc::new(AliasCommand),
        Arc::new(BgCommand),
        Arc::new(CdCommand),
        Arc::new(EchoCommand),
        Arc::new(ExitCommand),
        Arc::new(ExportCommand),
        Arc::new(FalseCommand),
        Arc::new(FgCommand),
        Arc::new(HistoryCommand),
        Arc::new(JobsCommand),
        Arc::new(KillCommand),
        Arc::new(ProfileCommand),
        Arc::new(PwdCommand),
        Arc::new(TrueCommand),
        Arc::new(UnaliasCommand),
        Arc::new(UnsetCommand),
        Arc::new(WaitCommand),
    ];

    let mut entries: Vec<(&'static str, &'static str)> = commands
        .iter()
        .map(|b| (b.name(), b.synopsis()))
        .collect();
    entries.push(("help", "Show help for built-in commands"));

    for command in commands {
        exec.register(command);
    }
    exec.register(Arc::new(HelpCommand::new(entries)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_all_installs_every_internal() {
        let mut exec = Executor::new();
        register_all(&mut exec);
        for name in [
            "cd", "exit", "pwd", "echo", "true", "false", "help", "history", "jobs", "fg",
            "bg", "wait", "kill", "export", "unset", "alias", "unalias", "profile",
        ] {
            assert!(exec.lookup(name).is_some(), "missing internal: {name}");
        }
    }
}
