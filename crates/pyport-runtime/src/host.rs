//! Queries against Python interpreters: version, architecture, pip freeze.

use crate::process::ProcessRunner;
use crate::RuntimeError;
use pyport_schema::RuntimeTag;
use std::path::Path;

/// Prints the dotted version, then whether the build is 64-bit.
pub const PROBE_SCRIPT: &str =
    "import sys; print('%d.%d.%d' % sys.version_info[:3]); print(sys.maxsize > 2**32)";

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

/// Version and architecture of the interpreter at `python`.
pub fn probe_tag(runner: &dyn ProcessRunner, python: &Path) -> Result<RuntimeTag, RuntimeError> {
    let out = runner.capture(python, &args(&["-c", PROBE_SCRIPT]))?;
    Ok(RuntimeTag::from_probe_output(&out.stdout)?)
}

/// Version reported by `python --version` (last whitespace-separated token).
pub fn reported_version(
    runner: &dyn ProcessRunner,
    python: &Path,
) -> Result<Option<String>, RuntimeError> {
    let out = runner.capture(python, &args(&["--version"]))?;
    Ok(out.stdout.split_whitespace().last().map(str::to_owned))
}

/// pip's self-description with the installation path dropped,
/// e.g. `pip 24.0` out of `pip 24.0 from C:\...\pip (python 3.12)`.
pub fn pip_version(runner: &dyn ProcessRunner, python: &Path) -> Result<String, RuntimeError> {
    let out = runner.capture(python, &args(&["-m", "pip", "--version"]))?;
    let line = out.stdout.trim();
    Ok(line
        .split_once(" from ")
        .map_or(line, |(head, _)| head)
        .to_owned())
}

/// Raw `pip freeze` output of the interpreter at `python`.
pub fn pip_freeze(runner: &dyn ProcessRunner, python: &Path) -> Result<String, RuntimeError> {
    Ok(runner
        .capture(python, &args(&["-m", "pip", "freeze"]))?
        .stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRunner;

    #[test]
    fn probe_tag_parses_host_output() {
        let runner = MockRunner::new().respond("python3", &["-c"], "3.12.1\nTrue\n");
        let tag = probe_tag(&runner, Path::new("python3")).unwrap();
        assert_eq!(tag.version, "3.12.1");
        assert_eq!(tag.architecture.as_str(), "amd64");

        let calls = runner.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, vec!["-c".to_owned(), PROBE_SCRIPT.to_owned()]);
    }

    #[test]
    fn probe_tag_rejects_garbage() {
        let runner = MockRunner::new().respond("python3", &["-c"], "oops");
        assert!(matches!(
            probe_tag(&runner, Path::new("python3")),
            Err(RuntimeError::Tag(_))
        ));
    }

    #[test]
    fn reported_version_takes_last_token() {
        let runner = MockRunner::new().respond("python.exe", &["--version"], "Python 3.11.9\r\n");
        assert_eq!(
            reported_version(&runner, Path::new("C:/env/python.exe")).unwrap(),
            Some("3.11.9".to_owned())
        );
    }

    #[test]
    fn pip_version_drops_location() {
        let runner = MockRunner::new().respond(
            "python.exe",
            &["-m", "pip", "--version"],
            "pip 24.0 from C:\\env\\Lib\\site-packages\\pip (python 3.12)\n",
        );
        assert_eq!(
            pip_version(&runner, Path::new("python.exe")).unwrap(),
            "pip 24.0"
        );
    }
}
