use crate::context::StageContext;
use crate::pathcfg::patch_path_config;
use crate::StageError;
use pyport_runtime::{extract_zip, host, ProcessRunner};
use pyport_schema::{Architecture, PortableConfig, RuntimeTag};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The target already runs the requested version; nothing was touched.
    AlreadySatisfied { version: String },
    Downloaded {
        url: String,
        path_config: PathBuf,
        files: usize,
    },
    /// A runtime with a different version was wiped before downloading.
    Recreated {
        previous: Option<String>,
        url: String,
        path_config: PathBuf,
        files: usize,
    },
}

/// Tag to provision: configured overrides first, the host interpreter for
/// whatever is left unset.
pub fn resolve_tag(
    config: &PortableConfig,
    runner: &dyn ProcessRunner,
    host_python: &Path,
) -> Result<RuntimeTag, StageError> {
    let arch_override = config
        .runtime
        .architecture
        .as_deref()
        .map(Architecture::parse)
        .transpose()?;

    if let (Some(version), Some(architecture)) = (config.runtime.version.as_deref(), arch_override)
    {
        debug!("runtime tag fully overridden by configuration");
        return Ok(RuntimeTag::new(version, architecture)?);
    }

    let probed = host::probe_tag(runner, host_python)?;
    debug!("host interpreter {} reports {probed}", host_python.display());
    let version = config
        .runtime
        .version
        .as_deref()
        .unwrap_or(&probed.version);
    Ok(RuntimeTag::new(
        version,
        arch_override.unwrap_or(probed.architecture),
    )?)
}

/// Make the target hold the embeddable runtime for `tag`.
///
/// An existing runtime reporting the same version is left alone. Any other
/// existing content is removed before the archive is downloaded, extracted
/// and its path-configuration file patched.
pub fn fetch_runtime(ctx: &StageContext<'_>, tag: &RuntimeTag) -> Result<FetchOutcome, StageError> {
    let layout = ctx.layout;
    let mut previous = None;
    let mut recreated = false;

    if layout.python_exe().is_file() {
        let installed = host::reported_version(ctx.runner, &layout.python_exe())?;
        if installed.as_deref() == Some(tag.version.as_str()) {
            ctx.report(&format!("python {} already present", tag.version));
            return Ok(FetchOutcome::AlreadySatisfied {
                version: tag.version.clone(),
            });
        }
        warn!(
            "installed runtime reports {}, expected {}; recreating {}",
            installed.as_deref().unwrap_or("no version"),
            tag.version,
            layout.root().display()
        );
        layout.recreate()?;
        previous = installed;
        recreated = true;
    } else {
        layout.initialize()?;
    }

    let url = tag.download_url(&ctx.config.runtime.ftp_url);
    ctx.report(&format!("downloading {url}"));
    let bytes = ctx.downloader.fetch(&url)?;
    debug!("downloaded {} bytes", bytes.len());

    ctx.report(&format!("extracting {}", tag.archive_file_name()));
    let files = extract_zip(&bytes, layout.root())?.len();
    info!("extracted {files} files into {}", layout.root().display());

    let path_config = layout
        .find_path_config()?
        .ok_or_else(|| StageError::MissingPathConfig(layout.root().to_path_buf()))?;
    patch_path_config(&path_config)?;
    debug!("patched {}", path_config.display());

    Ok(if recreated {
        FetchOutcome::Recreated {
            previous,
            url,
            path_config,
            files,
        }
    } else {
        FetchOutcome::Downloaded {
            url,
            path_config,
            files,
        }
    })
}
