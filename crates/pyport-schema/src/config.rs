use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the project directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "pyport.toml";

const DEFAULT_FTP_URL: &str = "https://www.python.org/ftp/python";
const DEFAULT_GET_PIP_URL: &str = "https://bootstrap.pypa.io/get-pip.py";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("runtime.env_dir must not be empty")]
    EmptyEnvDir,
    #[error("runtime.env_dir must stay inside the project directory: '{0}'")]
    EscapingEnvDir(String),
    #[error("{field} is not an http(s) URL: '{value}'")]
    InvalidUrl { field: &'static str, value: String },
    #[error("network.timeout_secs must be greater than zero")]
    ZeroTimeout,
    #[error("host.python must not be empty")]
    EmptyHostPython,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PortableConfig {
    #[serde(default)]
    pub runtime: RuntimeSection,
    #[serde(default)]
    pub host: HostSection,
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub prune: PruneSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    /// Target directory, relative to the project directory.
    #[serde(default = "default_env_dir")]
    pub env_dir: String,
    #[serde(default = "default_ftp_url")]
    pub ftp_url: String,
    /// Overrides the version reported by the host interpreter.
    #[serde(default)]
    pub version: Option<String>,
    /// Overrides the architecture reported by the host interpreter.
    #[serde(default)]
    pub architecture: Option<String>,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            env_dir: default_env_dir(),
            ftp_url: default_ftp_url(),
            version: None,
            architecture: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HostSection {
    /// Interpreter whose version and installed packages are mirrored.
    #[serde(default = "default_host_python")]
    pub python: String,
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            python: default_host_python(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NetworkSection {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_get_pip_url")]
    pub get_pip_url: String,
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            get_pip_url: default_get_pip_url(),
            proxy: None,
        }
    }
}

/// Clean-up toggles applied after the dependencies are mirrored.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct PruneSection {
    /// Uninstall every name in `remove_packages` through pip.
    #[serde(default = "enabled")]
    pub packages: bool,
    /// Remove `Lib/site-packages/<pattern>*` for every `remove_patterns` entry.
    #[serde(default = "enabled")]
    pub patterns: bool,
    /// Remove `__pycache__` directories and `*.pyc` files.
    #[serde(default = "enabled")]
    pub cache: bool,
    #[serde(default)]
    pub share: bool,
    #[serde(default)]
    pub scripts: bool,
    /// Remove `*.dist-info` metadata, except names containing an `exceptions` entry.
    #[serde(default)]
    pub dist_info: bool,
    #[serde(default)]
    pub pip: bool,
    #[serde(default)]
    pub remove_packages: Vec<String>,
    #[serde(default)]
    pub remove_patterns: Vec<String>,
    #[serde(default)]
    pub exceptions: Vec<String>,
}

impl Default for PruneSection {
    fn default() -> Self {
        Self {
            packages: true,
            patterns: true,
            cache: true,
            share: false,
            scripts: false,
            dist_info: false,
            pip: false,
            remove_packages: Vec::new(),
            remove_patterns: Vec::new(),
            exceptions: Vec::new(),
        }
    }
}

impl PruneSection {
    /// Every toggle off; nothing is removed.
    pub fn disabled() -> Self {
        Self {
            packages: false,
            patterns: false,
            cache: false,
            ..Self::default()
        }
    }
}

impl PortableConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let env_dir = self.runtime.env_dir.trim();
        if env_dir.is_empty() {
            return Err(ConfigError::EmptyEnvDir);
        }
        let escapes = Path::new(env_dir).is_absolute()
            || Path::new(env_dir)
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir));
        if escapes {
            return Err(ConfigError::EscapingEnvDir(env_dir.to_owned()));
        }
        check_url("runtime.ftp_url", &self.runtime.ftp_url)?;
        check_url("network.get_pip_url", &self.network.get_pip_url)?;
        if self.network.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.host.python.trim().is_empty() {
            return Err(ConfigError::EmptyHostPython);
        }
        Ok(())
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            field,
            value: value.to_owned(),
        })
    }
}

fn default_env_dir() -> String {
    "python".to_owned()
}

fn default_ftp_url() -> String {
    DEFAULT_FTP_URL.to_owned()
}

fn default_get_pip_url() -> String {
    DEFAULT_GET_PIP_URL.to_owned()
}

fn default_host_python() -> String {
    if cfg!(windows) {
        "python".to_owned()
    } else {
        "python3".to_owned()
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn enabled() -> bool {
    true
}

pub fn parse_config_str(input: &str) -> Result<PortableConfig, ConfigError> {
    let config: PortableConfig = toml::from_str(input)?;
    config.validate()?;
    Ok(config)
}

pub fn parse_config_file(path: impl AsRef<Path>) -> Result<PortableConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Load the configuration for a project.
///
/// An explicit path must exist. Without one, `<project_dir>/pyport.toml` is
/// used when present and the built-in defaults otherwise.
pub fn load_config(
    project_dir: &Path,
    explicit: Option<&Path>,
) -> Result<PortableConfig, ConfigError> {
    if let Some(path) = explicit {
        return parse_config_file(path);
    }
    let candidate = project_dir.join(CONFIG_FILE_NAME);
    if candidate.is_file() {
        parse_config_file(&candidate)
    } else {
        Ok(PortableConfig::default())
    }
}
