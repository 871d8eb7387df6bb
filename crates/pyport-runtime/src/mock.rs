//! Recording stand-ins for the network and subprocess seams.

use crate::http::Downloader;
use crate::process::{display_command, CommandOutput, ProcessRunner};
use crate::RuntimeError;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Serves fixed payloads by exact URL; anything else is `NotFound`.
#[derive(Default)]
pub struct MockDownloader {
    payloads: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn serve(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.payloads.insert(url.to_owned(), body.into());
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Downloader for MockDownloader {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RuntimeError> {
        self.requests
            .lock()
            .map_err(|e| RuntimeError::Http(format!("mutex poisoned: {e}")))?
            .push(url.to_owned());
        self.payloads
            .get(url)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(url.to_owned()))
    }
}

/// One recorded subprocess call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// `true` for `stream`, `false` for `capture`.
    pub streamed: bool,
}

impl Invocation {
    /// Whether the program path ends with `program` and the arguments start with `prefix`.
    pub fn matches(&self, program: &str, prefix: &[&str]) -> bool {
        self.program.ends_with(program)
            && self.args.len() >= prefix.len()
            && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }

    pub fn command_line(&self) -> String {
        display_command(&self.program, &self.args)
    }
}

type Effect = Arc<dyn Fn(&[String]) + Send + Sync>;

struct Rule {
    program: String,
    prefix: Vec<String>,
    stdout: String,
    stderr: String,
    fail: bool,
    effect: Option<Effect>,
}

/// Scripted `ProcessRunner`.
///
/// Calls are matched against rules in insertion order; the first rule whose
/// program suffix and argument prefix match decides the reply. Unmatched
/// calls succeed with empty output. Every call is recorded.
#[derive(Default)]
pub struct MockRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<Invocation>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn rule(mut self, program: &str, prefix: &[&str], rule: Rule) -> Self {
        self.rules.push(Rule {
            program: program.to_owned(),
            prefix: prefix.iter().map(|p| (*p).to_owned()).collect(),
            ..rule
        });
        self
    }

    #[must_use]
    pub fn respond(self, program: &str, prefix: &[&str], stdout: &str) -> Self {
        self.respond_stderr(program, prefix, stdout, "")
    }

    #[must_use]
    pub fn respond_stderr(
        self,
        program: &str,
        prefix: &[&str],
        stdout: &str,
        stderr: &str,
    ) -> Self {
        self.rule(
            program,
            prefix,
            Rule {
                program: String::new(),
                prefix: Vec::new(),
                stdout: stdout.to_owned(),
                stderr: stderr.to_owned(),
                fail: false,
                effect: None,
            },
        )
    }

    /// Matching calls exit non-zero with `stderr`.
    #[must_use]
    pub fn fail(self, program: &str, prefix: &[&str], stderr: &str) -> Self {
        self.rule(
            program,
            prefix,
            Rule {
                program: String::new(),
                prefix: Vec::new(),
                stdout: String::new(),
                stderr: stderr.to_owned(),
                fail: true,
                effect: None,
            },
        )
    }

    /// Matching calls succeed with empty output after running `effect` on their arguments.
    #[must_use]
    pub fn on_call(
        self,
        program: &str,
        prefix: &[&str],
        effect: impl Fn(&[String]) + Send + Sync + 'static,
    ) -> Self {
        self.rule(
            program,
            prefix,
            Rule {
                program: String::new(),
                prefix: Vec::new(),
                stdout: String::new(),
                stderr: String::new(),
                fail: false,
                effect: Some(Arc::new(effect)),
            },
        )
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn dispatch(
        &self,
        program: &Path,
        args: &[String],
        streamed: bool,
    ) -> Result<CommandOutput, RuntimeError> {
        let call = Invocation {
            program: program.to_path_buf(),
            args: args.to_vec(),
            streamed,
        };
        self.calls
            .lock()
            .map_err(|e| RuntimeError::Http(format!("mutex poisoned: {e}")))?
            .push(call.clone());

        fn prefix_of(rule: &Rule) -> Vec<&str> {
            rule.prefix.iter().map(String::as_str).collect()
        }
        let Some(rule) = self
            .rules
            .iter()
            .find(|rule| call.matches(&rule.program, &prefix_of(rule)))
        else {
            return Ok(CommandOutput::default());
        };

        if let Some(effect) = &rule.effect {
            effect(args);
        }
        if rule.fail {
            return Err(RuntimeError::CommandFailed {
                command: call.command_line(),
                status: "exit status: 1".to_owned(),
                stderr: rule.stderr.clone(),
            });
        }
        Ok(CommandOutput {
            stdout: rule.stdout.clone(),
            stderr: rule.stderr.clone(),
        })
    }
}

impl ProcessRunner for MockRunner {
    fn capture(&self, program: &Path, args: &[String]) -> Result<CommandOutput, RuntimeError> {
        self.dispatch(program, args, false)
    }

    fn stream(&self, program: &Path, args: &[String]) -> Result<(), RuntimeError> {
        self.dispatch(program, args, true).map(|_| ())
    }
}

/// Build an in-memory zip archive from `(name, contents)` pairs.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Result<Vec<u8>, RuntimeError> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    for (name, contents) in entries {
        writer
            .start_file(*name, options)
            .map_err(|e| RuntimeError::Archive(e.to_string()))?;
        writer.write_all(contents)?;
    }
    let cursor = writer
        .finish()
        .map_err(|e| RuntimeError::Archive(e.to_string()))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downloader_serves_and_records() {
        let downloader = MockDownloader::new().serve("https://example.com/a.zip", b"abc".to_vec());
        assert_eq!(downloader.fetch("https://example.com/a.zip").unwrap(), b"abc");
        assert!(matches!(
            downloader.fetch("https://example.com/missing"),
            Err(RuntimeError::NotFound(_))
        ));
        assert_eq!(
            downloader.requests(),
            vec![
                "https://example.com/a.zip".to_owned(),
                "https://example.com/missing".to_owned()
            ]
        );
    }

    #[test]
    fn downloader_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("get-pip.py");
        let downloader = MockDownloader::new().serve("https://example.com/get-pip.py", "pass\n");
        let written = downloader
            .fetch_to_file("https://example.com/get-pip.py", &dest)
            .unwrap();
        assert_eq!(written, 5);
        assert_eq!(std::fs::read_to_string(dest).unwrap(), "pass\n");
    }

    #[test]
    fn runner_first_matching_rule_wins() {
        let runner = MockRunner::new()
            .respond("python.exe", &["-m", "pip", "freeze"], "requests==2.31.0\n")
            .fail("python.exe", &["-m", "pip"], "no pip");
        let py = Path::new("env/python.exe");

        let out = runner
            .capture(py, &["-m".into(), "pip".into(), "freeze".into()])
            .unwrap();
        assert_eq!(out.stdout, "requests==2.31.0\n");

        let err = runner
            .stream(py, &["-m".into(), "pip".into(), "install".into()])
            .unwrap_err();
        assert!(err.to_string().contains("no pip"));

        let out = runner.capture(py, &["--version".into()]).unwrap();
        assert_eq!(out, CommandOutput::default());

        let calls = runner.invocations();
        assert_eq!(calls.len(), 3);
        assert!(!calls[0].streamed);
        assert!(calls[1].streamed);
        assert!(calls[1].matches("python.exe", &["-m", "pip", "install"]));
    }

    #[test]
    fn runner_effect_sees_arguments() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let runner = MockRunner::new().on_call("python.exe", &[], move |args| {
            sink.lock().unwrap().push(args.join(" "));
        });
        runner
            .stream(Path::new("python.exe"), &["get-pip.py".into()])
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["get-pip.py".to_owned()]);
    }
}
