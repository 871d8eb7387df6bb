//! Configuration, runtime tags, and directory layout for pyport.
//!
//! This crate defines the schema layer: the optional `pyport.toml`
//! configuration (`PortableConfig`), the interpreter version/architecture
//! tag used to address embeddable builds (`RuntimeTag`), and the on-disk
//! layout of a provisioned environment (`EnvLayout`).

pub mod config;
pub mod layout;
pub mod tag;

pub use config::{
    load_config, parse_config_file, parse_config_str, ConfigError, HostSection, NetworkSection,
    PortableConfig, PruneSection, RuntimeSection, CONFIG_FILE_NAME,
};
pub use layout::EnvLayout;
pub use tag::{Architecture, RuntimeTag, TagError};
