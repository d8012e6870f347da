// src/watch/registrar.rs

//! Recursive registration of watch roots with a [`WatchBackend`].

use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace};

use crate::errors::{Result, WatchrunError};
use crate::fs::FileSystem;
use crate::watch::filter::NameFilter;

/// Something directories can be added to for change notification.
pub trait WatchBackend {
    fn add(&mut self, path: &Path) -> Result<()>;
}

impl WatchBackend for RecommendedWatcher {
    fn add(&mut self, path: &Path) -> Result<()> {
        self.watch(path, RecursiveMode::NonRecursive)?;
        Ok(())
    }
}

/// Collecting backend, used for `--dry-run` and in tests.
impl WatchBackend for Vec<PathBuf> {
    fn add(&mut self, path: &Path) -> Result<()> {
        self.push(path.to_path_buf());
        Ok(())
    }
}

/// What a registration pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    /// Paths handed to the backend, in visit order.
    pub directories: Vec<PathBuf>,
    /// Files seen during the walk that the filter rejects.
    pub ignored_files: Vec<PathBuf>,
}

/// Walks roots and registers every non-hidden directory.
#[derive(Debug)]
pub struct PathRegistrar<'a> {
    fs: &'a dyn FileSystem,
    filter: &'a NameFilter,
}

impl<'a> PathRegistrar<'a> {
    pub fn new(fs: &'a dyn FileSystem, filter: &'a NameFilter) -> Self {
        Self { fs, filter }
    }

    /// Register one root, appending to `report`.
    ///
    /// A root that is a plain file is added as-is. Hidden directories below
    /// the root are pruned along with everything under them, as are
    /// directories matching the exclude pattern.
    pub fn register(
        &self,
        root: &Path,
        backend: &mut dyn WatchBackend,
        report: &mut Registration,
    ) -> Result<()> {
        if !self.fs.exists(root) {
            return Err(WatchrunError::NoSuchPath(root.to_path_buf()));
        }

        if !self.fs.is_dir(root) {
            backend.add(root)?;
            report.directories.push(root.to_path_buf());
            return Ok(());
        }

        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            backend.add(&dir)?;
            trace!(dir = %dir.display(), "registered directory");
            report.directories.push(dir.clone());

            let mut subdirs = Vec::new();
            for path in self.fs.read_dir(&dir)? {
                if self.fs.is_dir(&path) {
                    if is_hidden(&path) {
                        debug!(dir = %path.display(), "skipping hidden directory");
                    } else if self.filter.excludes(&path) {
                        debug!(dir = %path.display(), "skipping excluded directory");
                    } else {
                        subdirs.push(path);
                    }
                } else if !self.filter.allows(&path) {
                    debug!(path = %path.display(), "ignoring file");
                    report.ignored_files.push(path);
                }
            }

            // Reverse so the stack pops children in sorted order.
            stack.extend(subdirs.into_iter().rev());
        }

        Ok(())
    }
}

/// Register every root in order. Stops at the first failure.
pub fn register_roots(
    fs: &dyn FileSystem,
    filter: &NameFilter,
    roots: &[PathBuf],
    backend: &mut dyn WatchBackend,
) -> Result<Registration> {
    let registrar = PathRegistrar::new(fs, filter);
    let mut report = Registration::default();
    for root in roots {
        registrar.register(root, backend, &mut report)?;
    }
    Ok(report)
}

/// A directory is hidden if its base name starts with `.`, except for the
/// `.` and `..` special names.
pub fn is_hidden(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.starts_with('.') && name != "." && name != "..",
        None => false,
    }
}
