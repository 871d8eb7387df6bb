//! Provisioning pipeline for portable embeddable Python environments.
//!
//! This crate ties the schema and runtime seams together into the
//! `Provisioner`: fetch the embeddable build matching the host interpreter,
//! bootstrap pip into it, mirror the host's installed packages, and prune
//! what the environment does not need. Each stage has its own module and
//! returns a typed `StageError`; the engine maps failures onto the
//! stage-specific exit codes defined in `lifecycle`.

pub mod context;
pub mod engine;
pub mod fetch;
pub mod lifecycle;
pub mod mirror;
pub mod pathcfg;
pub mod pip;
pub mod prune;

pub use context::StageContext;
pub use engine::{ProvisionReport, Provisioner};
pub use fetch::{fetch_runtime, resolve_tag, FetchOutcome};
pub use lifecycle::{validate_transition, PipelineState, Stage, EXIT_SUCCESS, EXIT_UNEXPECTED};
pub use mirror::{mirror_dependencies, FrozenManifest, MirrorOutcome};
pub use pathcfg::{patch_path_config, patch_path_config_str};
pub use pip::{install_pip, PipOutcome};
pub use prune::{name_glob, prune, PruneReport};

use std::path::PathBuf;
use thiserror::Error;

/// Broad category of a stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Archive,
    Subprocess,
    Filesystem,
    Pattern,
}

/// Failure inside a single pipeline stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Runtime(#[from] pyport_runtime::RuntimeError),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid runtime tag: {0}")]
    Tag(#[from] pyport_schema::TagError),
    #[error("no python*._pth file found in {0}")]
    MissingPathConfig(PathBuf),
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] globset::Error),
}

impl StageError {
    pub fn kind(&self) -> ErrorKind {
        use pyport_runtime::RuntimeError as R;
        match self {
            Self::Runtime(R::Http(_) | R::NotFound(_) | R::Proxy(_)) => ErrorKind::Network,
            Self::Runtime(R::Archive(_)) | Self::MissingPathConfig(_) => ErrorKind::Archive,
            Self::Runtime(R::Spawn { .. } | R::CommandFailed { .. } | R::Tag(_)) | Self::Tag(_) => {
                ErrorKind::Subprocess
            }
            Self::Runtime(R::Io(_)) | Self::Io(_) => ErrorKind::Filesystem,
            Self::Pattern(_) => ErrorKind::Pattern,
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(#[from] pyport_schema::ConfigError),
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StageError,
    },
    #[error("invalid pipeline transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("runtime error: {0}")]
    Runtime(#[from] pyport_runtime::RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Process exit code: the failing stage's code, or `EXIT_UNEXPECTED`.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Stage { stage, .. } => stage.exit_code(),
            _ => EXIT_UNEXPECTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyport_runtime::RuntimeError;

    #[test]
    fn stage_errors_map_to_stage_exit_codes() {
        for stage in Stage::ALL {
            let err = CoreError::Stage {
                stage,
                source: StageError::MissingPathConfig(PathBuf::from("python")),
            };
            assert_eq!(err.exit_code(), stage.exit_code());
        }
    }

    #[test]
    fn other_errors_are_unexpected() {
        let err = CoreError::Io(std::io::Error::other("boom"));
        assert_eq!(err.exit_code(), EXIT_UNEXPECTED);
        let err = CoreError::InvalidTransition {
            from: "done".to_owned(),
            to: "fetch".to_owned(),
        };
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn error_kinds_follow_taxonomy() {
        let net = StageError::Runtime(RuntimeError::Http("timed out".to_owned()));
        assert_eq!(net.kind(), ErrorKind::Network);
        let archive = StageError::Runtime(RuntimeError::Archive("bad zip".to_owned()));
        assert_eq!(archive.kind(), ErrorKind::Archive);
        let sub = StageError::Runtime(RuntimeError::CommandFailed {
            command: "python.exe -m pip freeze".to_owned(),
            status: "exit status: 1".to_owned(),
            stderr: String::new(),
        });
        assert_eq!(sub.kind(), ErrorKind::Subprocess);
        let fs = StageError::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert_eq!(fs.kind(), ErrorKind::Filesystem);
    }
}
