use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory layout of a provisioned embeddable environment.
///
/// Mirrors the Windows embeddable distribution: the interpreter at the root,
/// pip's console scripts in `Scripts/`, and packages in `Lib/site-packages/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvLayout {
    root: PathBuf,
}

impl EnvLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout for `env_dir` inside `project_dir`.
    pub fn for_project(project_dir: &Path, env_dir: &str) -> Self {
        Self::new(project_dir.join(env_dir))
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn python_exe(&self) -> PathBuf {
        self.root.join("python.exe")
    }

    #[inline]
    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join("Scripts")
    }

    #[inline]
    pub fn pip_exe(&self) -> PathBuf {
        self.scripts_dir().join("pip.exe")
    }

    #[inline]
    pub fn site_packages_dir(&self) -> PathBuf {
        self.root.join("Lib").join("site-packages")
    }

    #[inline]
    pub fn share_dir(&self) -> PathBuf {
        self.root.join("share")
    }

    /// Where the pip bootstrap script is downloaded before it runs.
    #[inline]
    pub fn get_pip_path(&self) -> PathBuf {
        self.root.join("get-pip.py")
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn initialize(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    /// Remove the whole tree and recreate it empty.
    pub fn recreate(&self) -> io::Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(&self.root)
    }

    /// First `python*._pth` file in the root, by name.
    pub fn find_path_config(&self) -> io::Result<Option<PathBuf>> {
        let mut candidates = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("python") && name.ends_with("._pth") && entry.file_type()?.is_file()
            {
                candidates.push(entry.path());
            }
        }
        candidates.sort();
        Ok(candidates.into_iter().next())
    }
}
