//! Scratch directories and the manifest swap used while downloading modules.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::Result;
use crate::identifier::RepoId;
use crate::manifest::{LOCK_FILE, MANIFEST_FILE};

/// Root of all temporary pipeline data.
///
/// Layout:
/// - `repos/<host>/<owner>/<name>`: shallow clones made by measurement
/// - `gopath/pkg/mod`: module cache used by dependency resolution
/// - `fetch`: working directory for the module download tool
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the scratch tree. Calling this again is a no-op.
    pub fn ensure(&self) -> Result<()> {
        for dir in [self.repos_dir(), self.mod_cache(), self.fetch_dir()] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.root.join("repos")
    }

    /// Clone destination for one repository.
    pub fn repository_dir(&self, id: &RepoId) -> PathBuf {
        self.repos_dir().join(&id.host).join(&id.owner).join(&id.name)
    }

    /// Value for `GOPATH` while fetching.
    pub fn gopath(&self) -> PathBuf {
        self.root.join("gopath")
    }

    /// Value for `GOMODCACHE` while fetching.
    pub fn mod_cache(&self) -> PathBuf {
        self.gopath().join("pkg").join("mod")
    }

    pub fn fetch_dir(&self) -> PathBuf {
        self.root.join("fetch")
    }

    /// Remove all clones. Only call once every worker of the stage is done.
    pub fn purge_repositories(&self) -> Result<()> {
        purge(&self.repos_dir())
    }

    /// Remove all downloaded modules.
    pub fn purge_mod_cache(&self) -> Result<()> {
        make_writable(&self.mod_cache());
        purge(&self.mod_cache())
    }
}

fn purge(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    fs::create_dir_all(dir)?;
    debug!("Purged {}", dir.display());
    Ok(())
}

/// The Go module cache is written read-only; removing it needs write bits back.
fn make_writable(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if let Ok(metadata) = entry.metadata() {
            let mut permissions = metadata.permissions();
            #[allow(clippy::permissions_set_readonly_false)]
            permissions.set_readonly(false);
            let _ = fs::set_permissions(&path, permissions);
            if metadata.is_dir() {
                make_writable(&path);
            }
        }
    }
}

/// Replaces the manifest/lock pair in a directory with a throwaway pair and
/// puts the originals back when dropped, whether or not the work in between
/// succeeded.
#[derive(Debug)]
pub struct ManifestSwap {
    dir: PathBuf,
    backed_up: Vec<(PathBuf, PathBuf)>,
}

impl ManifestSwap {
    /// Back up `go.mod`/`go.sum` in `dir` (if present) and write a scratch
    /// manifest declaring `module_name`.
    pub fn install(dir: &Path, module_name: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let mut swap = Self {
            dir: dir.to_path_buf(),
            backed_up: Vec::new(),
        };

        for name in [MANIFEST_FILE, LOCK_FILE] {
            let original = dir.join(name);
            if original.exists() {
                let backup = dir.join(format!("{}.bak", name));
                fs::rename(&original, &backup)?;
                swap.backed_up.push((backup, original));
            }
        }

        fs::write(
            dir.join(MANIFEST_FILE),
            format!("module {}\n", module_name),
        )?;
        fs::write(dir.join(LOCK_FILE), "")?;
        Ok(swap)
    }

    fn restore(&mut self) -> io::Result<()> {
        for name in [MANIFEST_FILE, LOCK_FILE] {
            match fs::remove_file(self.dir.join(name)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        for (backup, original) in self.backed_up.drain(..) {
            fs::rename(&backup, &original)?;
        }
        Ok(())
    }
}

impl Drop for ManifestSwap {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!(
                "Failed to restore manifests in {}: {}",
                self.dir.display(),
                e
            );
        }
    }
}
