//! Structured error types for qsh.
//!
//! Every fallible core operation returns [`ShellResult`]. Errors carry a
//! category (with a sub-kind where callers dispatch on it) plus a
//! human-readable message; the REPL decides what becomes the exit status
//! and what merely prints.

use std::fmt;

/// Result type for all qsh core operations.
pub type ShellResult<T> = Result<T, ShellError>;

#[derive(Debug, Clone)]
pub struct ShellError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Categories of errors qsh produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Tokenizer or parser rejected the line.
    ParseError,
    /// A redirection target could not be opened or wired.
    RedirError(RedirErrorKind),
    /// Process creation or program execution failed.
    ExecError(ExecErrorKind),
    /// Job-control operation on an unknown or invalid job.
    JobError(JobErrorKind),
    /// Syscall profiler state machine or ptrace failure.
    ProfilerError(ProfilerErrorKind),
    /// History persistence and other I/O that never affects `$?`.
    IoError(IoErrorKind),
    /// Terminal, signal, or environment setup failure.
    SystemError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirErrorKind {
    OpenFailed,
    DupFailed,
    HeredocFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecErrorKind {
    CommandNotFound,
    ForkFailed,
    PipeFailed,
    WaitFailed,
    ExecFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobErrorKind {
    NotFound,
    InvalidSpec,
    SignalFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerErrorKind {
    AlreadyProfiling,
    NotProfiling,
    SyscallFailed,
    InvalidArgument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoErrorKind {
    ReadFailed,
    WriteFailed,
    HistoryLoadFailed,
    HistorySaveFailed,
}

impl ShellError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    pub fn redir(kind: RedirErrorKind, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RedirError(kind), message)
    }

    pub fn exec(kind: ExecErrorKind, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExecError(kind), message)
    }

    pub fn job(kind: JobErrorKind, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::JobError(kind), message)
    }

    pub fn profiler(kind: ProfilerErrorKind, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProfilerError(kind), message)
    }

    pub fn io(kind: IoErrorKind, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IoError(kind), message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SystemError, message)
    }
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ShellError {}

impl From<std::io::Error> for ShellError {
    fn from(e: std::io::Error) -> Self {
        ShellError::io(IoErrorKind::ReadFailed, e.to_string())
    }
}

impl From<nix::Error> for ShellError {
    fn from(e: nix::Error) -> Self {
        ShellError::system(e.to_string())
    }
}
