use crate::context::StageContext;
use crate::StageError;
use pyport_runtime::host;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipOutcome {
    AlreadyInstalled { version: String },
    Installed,
}

/// Removes the bootstrap script when dropped.
struct ScriptGuard {
    path: PathBuf,
}

impl ScriptGuard {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScriptGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("removed {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove {}: {e}", self.path.display()),
        }
    }
}

/// Bootstrap pip into the target runtime.
///
/// When `Scripts/pip.exe` is present the stage only reports pip's version;
/// it never reinstalls, whatever that version is.
pub fn install_pip(ctx: &StageContext<'_>) -> Result<PipOutcome, StageError> {
    let layout = ctx.layout;
    let python = layout.python_exe();

    if layout.pip_exe().is_file() {
        let version = host::pip_version(ctx.runner, &python)?;
        ctx.report(&format!("{version} already installed"));
        return Ok(PipOutcome::AlreadyInstalled { version });
    }

    let url = &ctx.config.network.get_pip_url;
    ctx.report(&format!("downloading {url}"));
    let guard = ScriptGuard {
        path: layout.get_pip_path(),
    };
    let written = ctx.downloader.fetch_to_file(url, guard.path())?;
    debug!("wrote {written} bytes to {}", guard.path().display());

    ctx.report("installing pip");
    ctx.runner.stream(
        &python,
        &[
            guard.path().to_string_lossy().into_owned(),
            "--no-warn-script-location".to_owned(),
        ],
    )?;
    Ok(PipOutcome::Installed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyport_runtime::mock::{MockDownloader, MockRunner};
    use pyport_schema::{EnvLayout, PortableConfig};

    const GET_PIP: &str = "https://bootstrap.pypa.io/get-pip.py";

    fn run(
        layout: &EnvLayout,
        downloader: &MockDownloader,
        runner: &MockRunner,
    ) -> Result<PipOutcome, StageError> {
        let config = PortableConfig::default();
        let ctx = StageContext {
            layout,
            config: &config,
            host_python: Path::new("python3"),
            downloader,
            runner,
            progress: &|_: &str| {},
        };
        install_pip(&ctx)
    }

    fn env() -> (tempfile::TempDir, EnvLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = EnvLayout::new(dir.path().join("python"));
        layout.initialize().unwrap();
        fs::write(layout.python_exe(), "MZ").unwrap();
        (dir, layout)
    }

    #[test]
    fn skips_reinstall_regardless_of_version() {
        let (_dir, layout) = env();
        fs::create_dir_all(layout.scripts_dir()).unwrap();
        fs::write(layout.pip_exe(), "MZ").unwrap();

        for reported in ["pip 9.0.1 from x (python 2.7)", "pip 99.0 from y (python 3.13)"] {
            let downloader = MockDownloader::new().serve(GET_PIP, "print('pip')\n");
            let runner =
                MockRunner::new().respond("python.exe", &["-m", "pip", "--version"], reported);

            let outcome = run(&layout, &downloader, &runner).unwrap();

            assert!(matches!(outcome, PipOutcome::AlreadyInstalled { .. }));
            assert!(downloader.requests().is_empty());
            assert!(runner.invocations().iter().all(|c| !c.streamed));
        }
    }

    #[test]
    fn bootstraps_and_removes_script() {
        let (_dir, layout) = env();
        let downloader = MockDownloader::new().serve(GET_PIP, "print('pip')\n");
        let runner = MockRunner::new();

        let outcome = run(&layout, &downloader, &runner).unwrap();

        assert_eq!(outcome, PipOutcome::Installed);
        assert_eq!(downloader.requests(), vec![GET_PIP.to_owned()]);
        let calls = runner.invocations();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].streamed);
        assert!(calls[0].program.ends_with("python.exe"));
        assert_eq!(
            calls[0].args,
            vec![
                layout.get_pip_path().to_string_lossy().into_owned(),
                "--no-warn-script-location".to_owned()
            ]
        );
        assert!(!layout.get_pip_path().exists());
    }

    #[test]
    fn script_is_removed_when_bootstrap_fails() {
        let (_dir, layout) = env();
        let downloader = MockDownloader::new().serve(GET_PIP, "raise SystemExit(1)\n");
        let runner = MockRunner::new().fail("python.exe", &[], "bootstrap failed");

        let err = run(&layout, &downloader, &runner).unwrap_err();

        assert!(err.to_string().contains("bootstrap failed"));
        assert!(!layout.get_pip_path().exists());
    }

    #[test]
    fn download_failure_leaves_no_script() {
        let (_dir, layout) = env();
        let downloader = MockDownloader::new();
        let runner = MockRunner::new();

        assert!(run(&layout, &downloader, &runner).is_err());
        assert!(!layout.get_pip_path().exists());
        assert!(runner.invocations().is_empty());
    }
}
