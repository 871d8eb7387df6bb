//! Makes the target's installed packages match the host interpreter's.
//!
//! Both sides are captured with `pip freeze`. The target's packages are
//! uninstalled first, then the host's frozen requirements are installed, so
//! the result is the host set regardless of what the target held before.

use crate::context::StageContext;
use crate::StageError;
use pyport_runtime::host;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Requirement lines of a `pip freeze` capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrozenManifest {
    requirements: Vec<String>,
}

impl FrozenManifest {
    /// Blank lines and `#` comments are dropped; everything else is kept as
    /// pip printed it.
    pub fn parse(output: &str) -> Self {
        let requirements = output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_owned)
            .collect();
        Self { requirements }
    }

    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Write the manifest to a temporary file in `dir`. The file is removed
    /// when the returned handle drops.
    pub fn write_temp(&self, dir: &Path, prefix: &str) -> Result<NamedTempFile, StageError> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".txt")
            .tempfile_in(dir)?;
        for requirement in &self.requirements {
            writeln!(file, "{requirement}")?;
        }
        file.flush()?;
        Ok(file)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorOutcome {
    pub removed: usize,
    pub installed: usize,
}

pub fn mirror_dependencies(ctx: &StageContext<'_>) -> Result<MirrorOutcome, StageError> {
    let python = ctx.layout.python_exe();
    let root = ctx.layout.root();

    let target = FrozenManifest::parse(&host::pip_freeze(ctx.runner, &python)?);
    if target.is_empty() {
        debug!("target environment has no packages to uninstall");
    } else {
        ctx.report(&format!("uninstalling {} existing packages", target.len()));
        let manifest = target.write_temp(root, "uninstall-")?;
        ctx.runner.stream(
            &python,
            &[
                "-m".to_owned(),
                "pip".to_owned(),
                "uninstall".to_owned(),
                "-r".to_owned(),
                manifest.path().to_string_lossy().into_owned(),
                "-y".to_owned(),
            ],
        )?;
    }

    let wanted = FrozenManifest::parse(&host::pip_freeze(ctx.runner, ctx.host_python)?);
    if wanted.is_empty() {
        info!("host interpreter has no installed packages; skipping install");
    } else {
        ctx.report(&format!("installing {} packages from host", wanted.len()));
        let manifest = wanted.write_temp(root, "requirements-")?;
        ctx.runner.stream(
            &python,
            &[
                "-m".to_owned(),
                "pip".to_owned(),
                "install".to_owned(),
                "-r".to_owned(),
                manifest.path().to_string_lossy().into_owned(),
                "--no-warn-script-location".to_owned(),
            ],
        )?;
    }

    Ok(MirrorOutcome {
        removed: target.len(),
        installed: wanted.len(),
    })
}
