//! Side-effecting seams for pyport: network, archives, and subprocesses.
//!
//! Every stage of the provisioning pipeline talks to the outside world
//! through the `Downloader` and `ProcessRunner` traits defined here. The
//! production implementations wrap `ureq` and `std::process`; the `mock`
//! module provides recording stand-ins so pipelines can be exercised without
//! a network or a Windows interpreter.

pub mod archive;
pub mod host;
pub mod http;
pub mod mock;
pub mod process;

pub use archive::extract_zip;
pub use http::{Downloader, HttpDownloader};
pub use process::{CommandOutput, ProcessRunner, SystemRunner};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid proxy '{0}'")]
    Proxy(String),
    #[error("archive error: {0}")]
    Archive(String),
    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("'{command}' failed with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("host interpreter: {0}")]
    Tag(#[from] pyport_schema::TagError),
}
