use crate::context::StageContext;
use crate::fetch::{fetch_runtime, resolve_tag, FetchOutcome};
use crate::lifecycle::{validate_transition, PipelineState, Stage};
use crate::mirror::{mirror_dependencies, MirrorOutcome};
use crate::pip::{install_pip, PipOutcome};
use crate::prune::{prune, PruneReport};
use crate::{CoreError, StageError};
use pyport_runtime::{Downloader, ProcessRunner};
use pyport_schema::{EnvLayout, PortableConfig, RuntimeTag};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Runs the four provisioning stages against one project directory.
///
/// Configuration and the network/subprocess seams are injected; nothing is
/// read from process-global state.
pub struct Provisioner<'a> {
    config: PortableConfig,
    layout: EnvLayout,
    host_python: PathBuf,
    downloader: &'a dyn Downloader,
    runner: &'a dyn ProcessRunner,
}

/// Outcome of every stage of a successful run.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub env_dir: PathBuf,
    pub tag: RuntimeTag,
    pub fetch: FetchOutcome,
    pub pip: PipOutcome,
    pub mirror: MirrorOutcome,
    pub prune: PruneReport,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        project_dir: &Path,
        config: PortableConfig,
        downloader: &'a dyn Downloader,
        runner: &'a dyn ProcessRunner,
    ) -> Self {
        let layout = EnvLayout::for_project(project_dir, &config.runtime.env_dir);
        let host_python = PathBuf::from(&config.host.python);
        Self {
            config,
            layout,
            host_python,
            downloader,
            runner,
        }
    }

    pub fn layout(&self) -> &EnvLayout {
        &self.layout
    }

    pub fn config(&self) -> &PortableConfig {
        &self.config
    }

    /// Run every stage in order, stopping at the first failure.
    pub fn run(&self, progress: &dyn Fn(&str)) -> Result<ProvisionReport, CoreError> {
        let ctx = StageContext {
            layout: &self.layout,
            config: &self.config,
            host_python: &self.host_python,
            downloader: self.downloader,
            runner: self.runner,
            progress,
        };
        let state = Cell::new(PipelineState::Start);

        let (tag, fetch) = run_stage(&state, Stage::Fetch, || {
            let tag = resolve_tag(ctx.config, ctx.runner, ctx.host_python)?;
            ctx.report(&format!("provisioning python {tag} in {}", ctx.layout.root().display()));
            let outcome = fetch_runtime(&ctx, &tag)?;
            Ok((tag, outcome))
        })?;
        let pip = run_stage(&state, Stage::InstallPackageManager, || install_pip(&ctx))?;
        let mirror = run_stage(&state, Stage::MirrorDependencies, || mirror_dependencies(&ctx))?;
        let pruned = run_stage(&state, Stage::Prune, || prune(&ctx, &self.config.prune))?;

        validate_transition(state.get(), PipelineState::Done)?;
        state.set(PipelineState::Done);

        let env_dir = absolute(self.layout.root())?;
        info!("provisioned {}", env_dir.display());
        Ok(ProvisionReport {
            env_dir,
            tag,
            fetch,
            pip,
            mirror,
            prune: pruned,
        })
    }
}

fn run_stage<T>(
    state: &Cell<PipelineState>,
    stage: Stage,
    body: impl FnOnce() -> Result<T, StageError>,
) -> Result<T, CoreError> {
    validate_transition(state.get(), PipelineState::Running(stage))?;
    state.set(PipelineState::Running(stage));
    info!("stage {stage} started");

    match body() {
        Ok(value) => Ok(value),
        Err(source) => {
            let failed = PipelineState::Failed(stage.exit_code());
            validate_transition(state.get(), failed)?;
            state.set(failed);
            error!("stage {stage} failed ({:?}): {source}", source.kind());
            Err(CoreError::Stage { stage, source })
        }
    }
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyport_runtime::mock::{MockDownloader, MockRunner};

    #[test]
    fn layout_follows_configured_env_dir() {
        let mut config = PortableConfig::default();
        config.runtime.env_dir = "runtime".to_owned();
        let downloader = MockDownloader::new();
        let runner = MockRunner::new();
        let provisioner = Provisioner::new(Path::new("/srv/app"), config, &downloader, &runner);
        assert_eq!(provisioner.layout().root(), Path::new("/srv/app/runtime"));
    }

    #[test]
    fn probe_failure_fails_fetch_stage() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockRunner::new().fail("python3", &["-c"], "no interpreter");
        let mut config = PortableConfig::default();
        config.host.python = "python3".to_owned();
        let downloader = MockDownloader::new();
        let provisioner = Provisioner::new(dir.path(), config, &downloader, &runner);

        let err = provisioner.run(&|_: &str| {}).unwrap_err();
        assert!(matches!(err, CoreError::Stage { stage: Stage::Fetch, .. }));
        assert_eq!(err.exit_code(), 1);
        assert!(downloader.requests().is_empty());
    }
}
