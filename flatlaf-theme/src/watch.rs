//! Change detection for theme source files and folders.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{ThemeError, ThemeResult};

/// Watches theme source files and custom source folders.
///
/// Events are collected in the background and picked up with
/// [SourceWatcher::poll_changes], typically once per frame or timer tick.
pub struct SourceWatcher {
    watcher: RecommendedWatcher,
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    watched: Vec<PathBuf>,
}

impl SourceWatcher {
    /// Create a watcher that watches nothing yet.
    pub fn new() -> ThemeResult<Self> {
        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(tx).map_err(ThemeError::watcher)?;

        Ok(Self {
            watcher,
            event_rx: rx,
            watched: Vec::new(),
        })
    }

    /// Start watching a file or folder.
    pub fn watch(&mut self, path: &Path) -> ThemeResult<()> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(ThemeError::watcher)?;
        self.watched.push(path.to_path_buf());
        log::debug!("Watching {:?} for theme changes", path);
        Ok(())
    }

    /// Stop watching a path.
    pub fn unwatch(&mut self, path: &Path) -> ThemeResult<()> {
        self.watcher.unwatch(path).map_err(ThemeError::watcher)?;
        self.watched.retain(|p| p != path);
        Ok(())
    }

    /// The watched paths.
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    /// Drain pending events and return the `.properties` and `.theme.json` files
    /// that changed.
    ///
    /// Non-blocking. Each path is reported once per call.
    pub fn poll_changes(&self) -> Vec<PathBuf> {
        let mut changed = Vec::new();

        while let Ok(result) = self.event_rx.try_recv() {
            match result {
                Ok(event) if is_content_change(&event.kind) => {
                    for path in event.paths {
                        if is_theme_source(&path) && !changed.contains(&path) {
                            changed.push(path);
                        }
                    }
                },
                Ok(_) => {},
                Err(e) => log::warn!("File watcher error: {}", e),
            }
        }

        changed
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    )
}

fn is_theme_source(path: &Path) -> bool {
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => name.ends_with(".properties") || name.ends_with(".theme.json"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};

    #[test]
    fn test_event_filter() {
        assert!(is_content_change(&EventKind::Create(CreateKind::File)));
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Any)));
        assert!(!is_content_change(&EventKind::Access(notify::event::AccessKind::Any)));
        assert!(is_theme_source(Path::new("/themes/FlatLaf.properties")));
        assert!(is_theme_source(Path::new("/themes/Nord.theme.json")));
        assert!(!is_theme_source(Path::new("/themes/FlatLaf.properties.swp")));
        assert!(!is_theme_source(Path::new("/themes/package.json")));
    }

    #[test]
    fn test_watch_folder() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = SourceWatcher::new().unwrap();
        watcher.watch(dir.path()).unwrap();
        assert_eq!(watcher.watched(), &[dir.path().to_path_buf()]);
        assert!(watcher.watch(&dir.path().join("missing")).is_err());
        watcher.unwatch(dir.path()).unwrap();
        assert!(watcher.watched().is_empty());
    }
}
