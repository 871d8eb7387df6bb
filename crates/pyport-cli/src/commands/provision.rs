use super::{json_pretty, spin_fail, spin_ok, spinner, Failure, EXIT_SUCCESS};
use indicatif::ProgressBar;
use pyport_core::{CoreError, FetchOutcome, PipOutcome, ProvisionReport, Provisioner};
use pyport_runtime::{HttpDownloader, SystemRunner};
use pyport_schema::load_config;
use std::path::Path;
use std::time::Duration;

pub fn run(project_dir: &Path, config_path: Option<&Path>, json: bool) -> Result<u8, Failure> {
    let config = load_config(project_dir, config_path).map_err(CoreError::from)?;
    if !cfg!(windows) {
        tracing::warn!("embeddable Python only runs on Windows; this runtime will not run here");
    }

    let downloader = HttpDownloader::new(
        Duration::from_secs(config.network.timeout_secs),
        config.network.proxy.as_deref(),
    )
    .map_err(CoreError::from)?;
    let runner = SystemRunner::new().stdout_to_stderr(json);
    let provisioner = Provisioner::new(project_dir, config, &downloader, &runner);

    let pb = if json {
        None
    } else {
        Some(spinner("provisioning portable python..."))
    };
    let progress = |msg: &str| {
        if let Some(ref pb) = pb {
            print_step(pb, msg);
        }
    };

    let report = match provisioner.run(&progress) {
        Ok(r) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "environment provisioned");
            }
            r
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "provisioning failed");
            }
            return Err(e.into());
        }
    };

    if json {
        println!("{}", json_pretty(&report_json(&report))?);
    } else {
        print_report(&report);
    }
    Ok(EXIT_SUCCESS)
}

/// Step lines go to stdout even when the spinner is hidden (not a terminal).
fn print_step(pb: &ProgressBar, msg: &str) {
    pb.suspend(|| println!("  {msg}"));
    pb.set_message(msg.to_owned());
}

fn report_json(report: &ProvisionReport) -> serde_json::Value {
    let fetch = match &report.fetch {
        FetchOutcome::AlreadySatisfied { .. } => {
            serde_json::json!({ "status": "already_satisfied" })
        }
        FetchOutcome::Downloaded { url, files, .. } => {
            serde_json::json!({ "status": "downloaded", "url": url, "files": files })
        }
        FetchOutcome::Recreated {
            previous,
            url,
            files,
            ..
        } => serde_json::json!({
            "status": "recreated",
            "previous": previous,
            "url": url,
            "files": files,
        }),
    };
    let pip = match &report.pip {
        PipOutcome::AlreadyInstalled { version } => {
            serde_json::json!({ "status": "already_installed", "version": version })
        }
        PipOutcome::Installed => serde_json::json!({ "status": "installed" }),
    };
    serde_json::json!({
        "env_dir": report.env_dir.display().to_string(),
        "version": report.tag.version,
        "architecture": report.tag.architecture.as_str(),
        "fetch": fetch,
        "pip": pip,
        "mirror": {
            "removed": report.mirror.removed,
            "installed": report.mirror.installed,
        },
        "removed_items": report.prune.removed,
    })
}

fn print_report(report: &ProvisionReport) {
    println!(
        "python {} ({}) ready in {}",
        report.tag.version,
        report.tag.architecture,
        report.env_dir.display()
    );
    match &report.fetch {
        FetchOutcome::AlreadySatisfied { .. } => println!("runtime: already present"),
        FetchOutcome::Downloaded { files, .. } => println!("runtime: downloaded ({files} files)"),
        FetchOutcome::Recreated { previous, files, .. } => println!(
            "runtime: replaced {} ({files} files)",
            previous.as_deref().unwrap_or("unknown version")
        ),
    }
    match &report.pip {
        PipOutcome::AlreadyInstalled { version } => println!("pip: {version} (kept)"),
        PipOutcome::Installed => println!("pip: installed"),
    }
    println!(
        "packages: {} removed, {} installed",
        report.mirror.removed, report.mirror.installed
    );
    println!("removed items: {:?}", report.prune.removed);
}
