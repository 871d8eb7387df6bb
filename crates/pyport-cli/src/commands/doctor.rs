use super::{json_pretty, Failure, EXIT_SUCCESS, EXIT_UNEXPECTED};
use pyport_core::resolve_tag;
use pyport_runtime::{host, ProcessRunner, SystemRunner};
use pyport_schema::{load_config, EnvLayout, PortableConfig};
use std::fs;
use std::path::Path;

pub fn run(
    project_dir: &Path,
    config_path: Option<&Path>,
    json_output: bool,
) -> Result<u8, Failure> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;
    let runner = SystemRunner::new();

    check_platform(&mut checks);

    match load_config(project_dir, config_path) {
        Ok(config) => {
            checks.push(Check::pass("config", "Configuration is valid"));
            check_host(&config, &runner, &mut checks, &mut all_pass);
            let layout = EnvLayout::for_project(project_dir, &config.runtime.env_dir);
            check_target(&layout, &mut checks);
        }
        Err(e) => {
            all_pass = false;
            checks.push(Check::fail("config", &format!("Configuration error: {e}")));
        }
    }

    print_results(&checks, all_pass, json_output)
}

fn check_platform(checks: &mut Vec<Check>) {
    if cfg!(windows) {
        checks.push(Check::pass("platform", "Windows host"));
    } else {
        checks.push(Check::warn(
            "platform",
            "Not a Windows host; embeddable runtimes cannot run here",
        ));
    }
}

fn check_host(
    config: &PortableConfig,
    runner: &dyn ProcessRunner,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) {
    let python = Path::new(&config.host.python);
    match resolve_tag(config, runner, python) {
        Ok(tag) => {
            checks.push(Check::pass(
                "runtime_tag",
                &format!("Target runtime: python {tag}"),
            ));
            checks.push(Check::info(
                "archive_url",
                &tag.download_url(&config.runtime.ftp_url),
            ));
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "runtime_tag",
                &format!("Cannot determine runtime from '{}': {e}", python.display()),
            ));
            return;
        }
    }

    match host::pip_version(runner, python) {
        Ok(version) => checks.push(Check::pass("host_pip", &format!("Host {version}"))),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "host_pip",
                &format!("Host pip unavailable; dependencies cannot be mirrored: {e}"),
            ));
        }
    }
}

fn check_target(layout: &EnvLayout, checks: &mut Vec<Check>) {
    if !layout.python_exe().is_file() {
        checks.push(Check::info(
            "target",
            &format!(
                "{} not provisioned (will be created on first run)",
                layout.root().display()
            ),
        ));
        return;
    }
    checks.push(Check::pass(
        "target",
        &format!("Runtime present in {}", layout.root().display()),
    ));

    match layout.find_path_config() {
        Ok(Some(path)) => {
            let patched = fs::read_to_string(&path)
                .map(|c| {
                    c.lines().any(|l| l.trim() == "..")
                        && c.lines().any(|l| l.trim() == "import site")
                })
                .unwrap_or(false);
            if patched {
                checks.push(Check::pass("path_config", "Path configuration is patched"));
            } else {
                checks.push(Check::warn(
                    "path_config",
                    &format!("{} is not patched", path.display()),
                ));
            }
        }
        Ok(None) => checks.push(Check::warn("path_config", "No python*._pth file found")),
        Err(e) => checks.push(Check::warn(
            "path_config",
            &format!("Cannot read target directory: {e}"),
        )),
    }

    if layout.pip_exe().is_file() {
        checks.push(Check::pass("target_pip", "pip is installed in the target"));
    } else {
        checks.push(Check::info("target_pip", "pip is not installed in the target"));
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, Failure> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&json)?);
    } else {
        println!("pyport doctor\n");
        for check in checks {
            println!("  {} {}", status_icon(check.status), check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_UNEXPECTED })
}

fn status_icon(status: &str) -> String {
    use console::Style;
    match status {
        "pass" => Style::new().green().apply_to("✓").to_string(),
        "fail" => Style::new().red().bold().apply_to("✗").to_string(),
        "warn" => Style::new().yellow().apply_to("⚠").to_string(),
        _ => Style::new().dim().apply_to("ℹ").to_string(),
    }
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
