//! Config file change detection

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Failed to create file watcher: {0}")]
    WatcherError(#[source] notify::Error),
    #[error("Cannot watch {path}: {reason}")]
    PathError { path: PathBuf, reason: String },
}

/// Raises a shared flag whenever the config file is written or replaced
///
/// The containing directory is watched rather than the file itself: editors
/// that save by renaming a temp file over the original would otherwise leave
/// the watch on an unlinked inode after the first save.
pub struct ConfigMonitor {
    _watcher: RecommendedWatcher,
}

/// Directory to watch and the absolute path events will report for `path`
fn watch_target(path: &Path) -> Result<(PathBuf, PathBuf), MonitorError> {
    let path_error = |reason: String| MonitorError::PathError {
        path: path.to_path_buf(),
        reason,
    };

    let name = path
        .file_name()
        .ok_or_else(|| path_error("not a file path".to_string()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let dir = dir.canonicalize().map_err(|e| path_error(e.to_string()))?;
    let file = dir.join(name);
    Ok((dir, file))
}

/// Whether `event` writes, creates or renames onto `file`
fn touches(event: &Event, file: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|p| p == file)
}

impl ConfigMonitor {
    /// Start watching `path`; the file itself need not exist yet
    ///
    /// The caller polls `changed` with [`take_changed`].
    pub fn new(path: &Path, changed: Arc<Mutex<bool>>) -> Result<Self, MonitorError> {
        let (dir, file) = watch_target(path)?;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if touches(&event, &file) => {
                if let Ok(mut flag) = changed.lock() {
                    *flag = true;
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "config watcher error"),
        })
        .map_err(MonitorError::WatcherError)?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| MonitorError::PathError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        tracing::debug!(dir = %dir.display(), "watching config directory");

        Ok(ConfigMonitor { _watcher: watcher })
    }
}

/// Read and clear a change flag; a poisoned lock reads as unchanged
pub fn take_changed(flag: &Mutex<bool>) -> bool {
    match flag.lock() {
        Ok(mut changed) => std::mem::replace(&mut *changed, false),
        Err(_) => false,
    }
}
