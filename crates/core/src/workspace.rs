//! Process-wide working directory and scoped cleanup of temp artifacts.
//!
//! The working directory is created (and emptied of anything a previous run
//! left behind) at startup and removed at shutdown. Requests only ever create
//! uniquely named entries inside it, so no locking is needed.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The ephemeral directory that holds per-request input and output files.
#[derive(Debug)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    /// Creates the directory if needed and purges stale entries.
    pub async fn prepare(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        let mut purged = 0usize;
        let mut entries = tokio::fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            match remove_path(&entry.path()) {
                Ok(true) => purged += 1,
                Ok(false) => {}
                Err(e) => warn!(path = %entry.path().display(), error = %e, "Failed to purge stale entry"),
            }
        }

        info!(root = %root.display(), purged, "Working directory ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocates a unique path for an uploaded file.
    ///
    /// The name keeps a sanitized copy of the original file name so that
    /// engines deriving output names from the input stay readable.
    pub fn allocate(&self, original_filename: &str) -> PathBuf {
        let id = Uuid::new_v4().simple().to_string();
        self.root
            .join(format!("{}_{}", id, sanitize_filename(original_filename)))
    }

    /// Removes the directory and everything in it.
    pub async fn teardown(&self) -> io::Result<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                info!(root = %self.root.display(), "Working directory removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Reduces an uploaded file name to a safe, single path component.
///
/// Directory parts are dropped and every character outside
/// `[A-Za-z0-9._-]` becomes `_`.
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Removes a file or directory tree. Returns `Ok(false)` when nothing existed.
///
/// Safe to call repeatedly on the same path.
pub fn remove_path(path: &Path) -> io::Result<bool> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Best-effort removal that logs instead of failing.
pub fn discard(path: &Path) {
    match remove_path(path) {
        Ok(true) => debug!(path = %path.display(), "Removed temp artifact"),
        Ok(false) => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temp artifact"),
    }
}

/// Removes every tracked path when dropped.
///
/// Used for working inputs, outputs handed to callers, and strategy-local
/// intermediates. Failures are logged, never propagated.
#[derive(Debug, Default)]
pub struct TempGuard {
    paths: Vec<PathBuf>,
}

impl TempGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a guard already tracking one path.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        let mut guard = Self::new();
        guard.track(path);
        guard
    }

    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Removes all tracked paths now. Later calls (and the drop) are no-ops.
    pub fn release(&mut self) {
        for path in self.paths.drain(..) {
            discard(&path);
        }
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        self.release();
    }
}
