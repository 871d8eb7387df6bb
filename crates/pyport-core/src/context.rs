use pyport_runtime::{Downloader, ProcessRunner};
use pyport_schema::{EnvLayout, PortableConfig};
use std::path::Path;

/// Everything a stage needs, passed explicitly instead of read from globals.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub layout: &'a EnvLayout,
    pub config: &'a PortableConfig,
    /// Interpreter whose packages and version are mirrored.
    pub host_python: &'a Path,
    pub downloader: &'a dyn Downloader,
    pub runner: &'a dyn ProcessRunner,
    pub progress: &'a dyn Fn(&str),
}

impl StageContext<'_> {
    pub fn report(&self, msg: &str) {
        tracing::info!("{msg}");
        (self.progress)(msg);
    }
}
