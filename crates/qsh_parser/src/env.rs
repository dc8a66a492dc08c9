//! The seam between the parsing layer and the running shell.
//!
//! The tokenizer needs variable values, special parameters, and history
//! entries; the parser additionally performs variable assignments, tilde
//! lookups, and command-substitution capture. `ShellEnv` abstracts all of
//! that so this crate never depends on the executor, and so parser tests
//! can run against an in-memory mock without forking anything.

pub trait ShellEnv {
    /// Look up a shell or environment variable.
    fn get_var(&self, name: &str) -> Option<String>;

    /// Store a (non-exported) shell variable, as done for `NAME=VALUE`
    /// assignment prefixes.
    fn set_var(&mut self, name: &str, value: &str);

    /// Exit status of the most recent command (`$?`).
    fn last_status(&self) -> i32;

    /// The shell's own pid (`$$`).
    fn shell_pid(&self) -> i32;

    /// The shell's parent pid (`$!`).
    fn parent_pid(&self) -> i32;

    /// Command text of the most recent history entry (`!!`).
    fn history_last(&self) -> Option<String>;

    /// Command text of the history entry at `index` (`!N`).
    fn history_at(&self, index: usize) -> Option<String>;

    /// Home directory for tilde expansion. `None` user means the current
    /// user; an unknown user returns `None` and the tilde stays literal.
    fn home_dir(&self, user: Option<&str>) -> Option<String>;

    /// Run `command` in a capturing subshell and return its stdout bytes
    /// (as a lossless UTF-8 string) together with the exit status.
    fn capture_output(&mut self, command: &str) -> (String, i32);
}
