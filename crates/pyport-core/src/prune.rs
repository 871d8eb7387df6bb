use crate::context::StageContext;
use crate::StageError;
use globset::{GlobBuilder, GlobMatcher};
use pyport_schema::PruneSection;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Names of everything the pruner removed, in removal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: Vec<String>,
}

impl PruneReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

/// Apply the enabled clean-up toggles to the target environment.
///
/// Missing targets are skipped silently; only failed removals and failing
/// pip invocations are errors.
pub fn prune(ctx: &StageContext<'_>, options: &PruneSection) -> Result<PruneReport, StageError> {
    let root = ctx.layout.root();
    let packages_dir = ctx.layout.site_packages_dir();
    let mut report = PruneReport::default();

    if options.packages {
        for package in &options.remove_packages {
            if uninstall_package(ctx, package)? {
                report.removed.push(package.clone());
            }
        }
    }

    if options.patterns {
        for pattern in &options.remove_patterns {
            let glob = name_glob(&format!("{pattern}*"))?;
            report
                .removed
                .extend(remove_top_level(&packages_dir, &glob)?);
        }
    }

    if options.cache {
        if remove_recursive(root, &name_glob("__pycache__")?, &[])? {
            report.removed.push("__pycache__".to_owned());
        }
        if remove_recursive(root, &name_glob("*.pyc")?, &[])? {
            report.removed.push("*.pyc".to_owned());
        }
    }

    if options.share && remove_dir(&ctx.layout.share_dir())? {
        report.removed.push("share".to_owned());
    }

    if options.scripts && remove_dir(&ctx.layout.scripts_dir())? {
        report.removed.push("Scripts".to_owned());
    }

    if options.dist_info
        && remove_recursive(root, &name_glob("*.dist-info")?, &options.exceptions)?
    {
        report.removed.push("*.dist-info".to_owned());
    }

    if options.pip {
        report
            .removed
            .extend(remove_top_level(&packages_dir, &name_glob("pip")?)?);
        report
            .removed
            .extend(remove_top_level(&packages_dir, &name_glob("pip-*.dist-info")?)?);
    }

    if report.is_empty() {
        ctx.report("nothing to prune");
    } else {
        ctx.report(&format!("removed: {}", report.removed.join(", ")));
    }
    Ok(report)
}

/// `pip uninstall <package> -y`; counts as removed only when pip stays quiet
/// on stderr (it warns there when the package is not installed).
fn uninstall_package(ctx: &StageContext<'_>, package: &str) -> Result<bool, StageError> {
    let out = ctx.runner.capture(
        &ctx.layout.python_exe(),
        &[
            "-m".to_owned(),
            "pip".to_owned(),
            "uninstall".to_owned(),
            package.to_owned(),
            "-y".to_owned(),
        ],
    )?;
    if out.stderr.trim().is_empty() {
        info!("uninstalled {package}");
        Ok(true)
    } else {
        debug!("pip did not uninstall {package}: {}", out.stderr.trim());
        Ok(false)
    }
}

fn remove_entry(path: &Path, is_dir: bool) -> io::Result<()> {
    debug!("removing {}", path.display());
    if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Remove entries directly inside `dir` whose names match `glob`.
fn remove_top_level(dir: &Path, glob: &GlobMatcher) -> io::Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut matched = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        if glob.is_match(&file_name) {
            let name = file_name.to_string_lossy().into_owned();
            matched.push((name, entry.path(), entry.file_type()?.is_dir()));
        }
    }
    matched.sort();

    let mut removed = Vec::with_capacity(matched.len());
    for (name, path, is_dir) in matched {
        remove_entry(&path, is_dir)?;
        removed.push(name);
    }
    Ok(removed)
}

/// Remove every entry below `root` whose name matches `glob` and contains
/// none of `exceptions`. Returns whether anything was removed.
fn remove_recursive(root: &Path, glob: &GlobMatcher, exceptions: &[String]) -> io::Result<bool> {
    if !root.is_dir() {
        return Ok(false);
    }
    let mut removed = false;
    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry?;
        if !glob.is_match(entry.file_name()) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if exceptions.iter().any(|e| name.contains(e.as_str())) {
            continue;
        }
        let is_dir = entry.file_type().is_dir();
        remove_entry(entry.path(), is_dir)?;
        if is_dir {
            walker.skip_current_dir();
        }
        removed = true;
    }
    Ok(removed)
}

fn remove_dir(path: &Path) -> io::Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    remove_entry(path, true)?;
    Ok(true)
}

/// Compile a file-name glob (`*`, `?`, `[seq]`). Names compare
/// case-insensitively on Windows, where the runtime lives.
pub fn name_glob(pattern: &str) -> Result<GlobMatcher, StageError> {
    Ok(build_name_glob(pattern, cfg!(windows))?)
}

fn build_name_glob(pattern: &str, case_insensitive: bool) -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .case_insensitive(case_insensitive)
        .build()?
        .compile_matcher())
}
