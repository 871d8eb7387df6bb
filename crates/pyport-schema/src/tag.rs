use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("invalid interpreter version '{0}', expected <major>.<minor>.<micro>")]
    InvalidVersion(String),
    #[error("unsupported architecture '{0}', expected amd64, win32 or arm64")]
    InvalidArchitecture(String),
    #[error("unexpected interpreter probe output: '{0}'")]
    InvalidProbeOutput(String),
}

/// Architecture suffix used in embeddable archive names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Amd64,
    Win32,
    Arm64,
}

impl Architecture {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Win32 => "win32",
            Self::Arm64 => "arm64",
        }
    }

    pub fn parse(input: &str) -> Result<Self, TagError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "amd64" | "x86_64" | "x64" => Ok(Self::Amd64),
            "win32" | "x86" | "i686" => Ok(Self::Win32),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            other => Err(TagError::InvalidArchitecture(other.to_owned())),
        }
    }

    /// Architecture of a build from its pointer width.
    pub fn from_pointer_width(is_64bit: bool) -> Self {
        if is_64bit {
            Self::Amd64
        } else {
            Self::Win32
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version and architecture of an interpreter build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeTag {
    pub version: String,
    pub architecture: Architecture,
}

impl RuntimeTag {
    pub fn new(version: &str, architecture: Architecture) -> Result<Self, TagError> {
        Ok(Self {
            version: normalize_version(version)?,
            architecture,
        })
    }

    /// Parse the two-line output of the host probe script: the dotted
    /// version, then `True` when the interpreter is a 64-bit build.
    pub fn from_probe_output(output: &str) -> Result<Self, TagError> {
        let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());
        let (Some(version), Some(is_64bit), None) = (lines.next(), lines.next(), lines.next())
        else {
            return Err(TagError::InvalidProbeOutput(output.trim().to_owned()));
        };
        let is_64bit = match is_64bit {
            "True" => true,
            "False" => false,
            _ => return Err(TagError::InvalidProbeOutput(output.trim().to_owned())),
        };
        Self::new(version, Architecture::from_pointer_width(is_64bit))
    }

    pub fn archive_file_name(&self) -> String {
        format!(
            "python-{}-embed-{}.zip",
            self.version,
            self.architecture.as_str()
        )
    }

    pub fn download_url(&self, ftp_url: &str) -> String {
        format!(
            "{}/{}/{}",
            ftp_url.trim_end_matches('/'),
            self.version,
            self.archive_file_name()
        )
    }
}

impl fmt::Display for RuntimeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.version, self.architecture)
    }
}

fn normalize_version(input: &str) -> Result<String, TagError> {
    let trimmed = input.trim();
    let parts: Vec<&str> = trimmed.split('.').collect();
    let valid = parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if valid {
        Ok(trimmed.to_owned())
    } else {
        Err(TagError::InvalidVersion(trimmed.to_owned()))
    }
}
