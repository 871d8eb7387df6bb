use crate::CoreError;
use std::fmt;

pub const EXIT_SUCCESS: u8 = 0;
/// Anything that escapes the stage boundaries.
pub const EXIT_UNEXPECTED: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    InstallPackageManager,
    MirrorDependencies,
    Prune,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Fetch,
        Stage::InstallPackageManager,
        Stage::MirrorDependencies,
        Stage::Prune,
    ];

    pub fn exit_code(self) -> u8 {
        match self {
            Self::Fetch => 1,
            Self::InstallPackageManager => 2,
            Self::MirrorDependencies => 3,
            Self::Prune => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::InstallPackageManager => "install-pip",
            Self::MirrorDependencies => "mirror-dependencies",
            Self::Prune => "prune",
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Self::Fetch => Some(Self::InstallPackageManager),
            Self::InstallPackageManager => Some(Self::MirrorDependencies),
            Self::MirrorDependencies => Some(Self::Prune),
            Self::Prune => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Running(Stage),
    Done,
    Failed(u8),
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Running(stage) => write!(f, "{stage}"),
            Self::Done => f.write_str("done"),
            Self::Failed(code) => write!(f, "failed({code})"),
        }
    }
}

/// Stages run strictly in order; a running stage may only fail with its own
/// code, and `EXIT_UNEXPECTED` is reachable from any non-terminal state.
pub fn validate_transition(from: PipelineState, to: PipelineState) -> Result<(), CoreError> {
    let valid = match (from, to) {
        (PipelineState::Start, PipelineState::Running(Stage::Fetch)) => true,
        (PipelineState::Running(current), PipelineState::Running(next)) => {
            current.next() == Some(next)
        }
        (PipelineState::Running(Stage::Prune), PipelineState::Done) => true,
        (PipelineState::Running(stage), PipelineState::Failed(code)) => {
            code == stage.exit_code() || code == EXIT_UNEXPECTED
        }
        (PipelineState::Start, PipelineState::Failed(EXIT_UNEXPECTED)) => true,
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
