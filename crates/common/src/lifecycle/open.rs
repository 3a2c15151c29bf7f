use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

/// States of a single `open` invocation.
///
/// ```text
/// Closed -> Checking -> AlreadyOpen
///                    -> Unlocking -> Open
///                                 -> Failed
/// ```
///
/// Any non-terminal state may also fall to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenState {
    Closed,
    Checking,
    AlreadyOpen,
    Unlocking,
    Open,
    Failed,
}

impl OpenState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OpenState::AlreadyOpen | OpenState::Open | OpenState::Failed
        )
    }

    pub fn can_transition_to(self, next: OpenState) -> bool {
        use OpenState::*;
        match (self, next) {
            (Closed, Checking) => true,
            (Checking, AlreadyOpen) | (Checking, Unlocking) => true,
            (Unlocking, Open) => true,
            (state, Failed) => !state.is_terminal(),
            _ => false,
        }
    }
}

impl Display for OpenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpenState::Closed => "closed",
            OpenState::Checking => "checking",
            OpenState::AlreadyOpen => "already-open",
            OpenState::Unlocking => "unlocking",
            OpenState::Open => "open",
            OpenState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks and logs the transitions of one `open` invocation
#[derive(Debug)]
pub(crate) struct OpenMachine {
    device: PathBuf,
    mapped_name: String,
    state: OpenState,
    history: Vec<OpenState>,
}

impl OpenMachine {
    pub(crate) fn new(device: &Path, mapped_name: &str) -> Self {
        Self {
            device: device.to_path_buf(),
            mapped_name: mapped_name.to_string(),
            state: OpenState::Closed,
            history: vec![OpenState::Closed],
        }
    }

    pub(crate) fn state(&self) -> OpenState {
        self.state
    }

    pub(crate) fn transition(&mut self, next: OpenState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid open transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(
            device = %self.device.display(),
            mapped_name = %self.mapped_name,
            from = %self.state,
            to = %next,
            "open state transition"
        );
        self.state = next;
        self.history.push(next);
    }

    pub(crate) fn finish(self, path: PathBuf) -> OpenOutcome {
        OpenOutcome {
            path,
            state: self.state,
            transitions: self.history,
        }
    }
}

/// Result of a successful `open`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOutcome {
    /// Path of the unlocked mapping
    pub path: PathBuf,
    /// Terminal state reached, either `AlreadyOpen` or `Open`
    pub state: OpenState,
    /// Every state visited, starting at `Closed`
    pub transitions: Vec<OpenState>,
}

impl OpenOutcome {
    pub fn already_open(&self) -> bool {
        self.state == OpenState::AlreadyOpen
    }
}
