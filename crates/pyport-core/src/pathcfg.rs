//! Patching of the embeddable distribution's `python*._pth` file.
//!
//! The embeddable build ships with an isolated search path and `site`
//! disabled. After patching, the interpreter also imports from the
//! environment's parent directory (`..`) and runs `import site`, so packages
//! installed by pip into `Lib/site-packages` are importable.

use std::fs;
use std::io;
use std::path::Path;

const CURRENT_DIR: &str = ".";
const PARENT_DIR: &str = "..";
const IMPORT_SITE: &str = "import site";

/// Rewrite path-configuration content.
///
/// `.` is followed by `..`, any line ending in `import site` (typically the
/// commented-out `#import site`) becomes `import site`, other lines are kept.
/// Missing entries are appended, so each of the three lines appears once.
pub fn patch_path_config_str(content: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut has_current = false;
    let mut has_site = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed == CURRENT_DIR {
            if !has_current {
                lines.push(CURRENT_DIR);
                lines.push(PARENT_DIR);
                has_current = true;
            }
        } else if trimmed == PARENT_DIR {
            // re-emitted right after `.`
        } else if trimmed.ends_with(IMPORT_SITE) {
            if !has_site {
                lines.push(IMPORT_SITE);
                has_site = true;
            }
        } else {
            lines.push(line);
        }
    }

    if !has_current {
        lines.push(CURRENT_DIR);
        lines.push(PARENT_DIR);
    }
    if !has_site {
        lines.push(IMPORT_SITE);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn patch_path_config(path: &Path) -> io::Result<()> {
    let content = fs::read_to_string(path)?;
    fs::write(path, patch_path_config_str(&content))
}
