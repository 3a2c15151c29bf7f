use std::fmt::{self, Display};

/// Coarse classification of a failure, used by the binary to pick an exit status.
///
/// Every error surfaced by a workflow falls into exactly one category; the
/// categories never overlap so callers (boot automation, orchestrators) can
/// react to e.g. a transport outage differently from a rejected authenticator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or invalid input, detected before any device or remote call
    Configuration,
    /// Connection, TLS, or timeout failure talking to the sealing service
    Transport,
    /// The sealing service answered but refused or returned garbage
    Remote,
    /// Key-slot store failures: missing token, bad authenticator, unlock failure
    Device,
    /// Local environment failures: randomness, stdio
    Environment,
}

impl ErrorCategory {
    /// Process exit status for this category.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorCategory::Configuration => 2,
            ErrorCategory::Transport => 3,
            ErrorCategory::Remote => 4,
            ErrorCategory::Device => 5,
            ErrorCategory::Environment => 6,
        }
    }
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Remote => "remote",
            ErrorCategory::Device => "device",
            ErrorCategory::Environment => "environment",
        };
        f.write_str(name)
    }
}

/// Errors that know which [`ErrorCategory`] they belong to.
pub trait Categorized {
    fn category(&self) -> ErrorCategory;
}

impl Categorized for std::convert::Infallible {
    fn category(&self) -> ErrorCategory {
        match *self {}
    }
}
