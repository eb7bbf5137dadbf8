//! # Theme Manager
//!
//! [ThemeManager] owns the active [UIDefaults] table. Activating a theme loads
//! a complete new table and swaps it in atomically; readers holding the old
//! snapshot keep it. If loading fails, the previous table and theme stay active.

use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};

use crate::config::ThemeConfig;
use crate::defaults::UIDefaults;
use crate::error::ThemeResult;
use crate::loader::DefaultsLoader;
use crate::theme::Theme;

/// Owns the active [UIDefaults] table and switches themes at runtime.
///
/// Activation builds a complete new table and swaps it in atomically. Readers
/// holding a snapshot from [ThemeManager::defaults] keep a consistent table
/// while a switch happens. If loading fails, the previous table stays active.
pub struct ThemeManager {
    loader: DefaultsLoader,
    defaults: ArcSwap<UIDefaults>,
    theme: ArcSwapOption<Theme>,
}

impl ThemeManager {
    /// Create a manager with an empty table.
    pub fn new(loader: DefaultsLoader) -> Self {
        Self {
            loader,
            defaults: ArcSwap::from_pointee(UIDefaults::new()),
            theme: ArcSwapOption::empty(),
        }
    }

    /// Create a manager from a configuration and activate its theme.
    ///
    /// If the configured theme can not be found or loaded, the fallback theme
    /// is activated instead.
    pub fn from_config(config: &ThemeConfig) -> ThemeResult<Self> {
        let manager = Self::new(config.loader());

        if let Some(name) = &config.theme {
            match manager.activate_by_name(name) {
                Ok(_) => return Ok(manager),
                Err(e) => log::warn!("Failed to activate theme '{}', using '{}': {}", name, config.fallback, e),
            }
        }

        manager.activate_by_name(&config.fallback)?;
        Ok(manager)
    }

    /// Load `theme` and make it the active one.
    pub fn activate(&self, theme: Theme) -> ThemeResult<Arc<UIDefaults>> {
        match self.loader.load(&theme) {
            Ok(defaults) => {
                let defaults = Arc::new(defaults);
                self.defaults.store(Arc::clone(&defaults));
                self.theme.store(Some(Arc::new(theme)));
                Ok(defaults)
            },
            Err(e) => {
                log::error!("Keeping current theme, failed to load '{}': {}", theme.name(), e);
                Err(e)
            },
        }
    }

    /// Activate a built-in theme or a `.properties` theme file.
    pub fn activate_by_name(&self, name: &str) -> ThemeResult<Arc<UIDefaults>> {
        self.activate(Theme::lookup(name)?)
    }

    /// Load the active theme again, e.g. after its files changed.
    ///
    /// Does nothing if no theme was activated yet.
    pub fn reload(&self) -> ThemeResult<Arc<UIDefaults>> {
        match self.current_theme() {
            Some(theme) => self.activate(Theme::clone(&theme)),
            None => Ok(self.defaults()),
        }
    }

    /// A snapshot of the active table.
    pub fn defaults(&self) -> Arc<UIDefaults> {
        self.defaults.load_full()
    }

    /// The active theme, if any.
    pub fn current_theme(&self) -> Option<Arc<Theme>> {
        self.theme.load_full()
    }

    /// The loader used for activation.
    pub fn loader(&self) -> &DefaultsLoader {
        &self.loader
    }

    /// Watch the custom source folders and the file levels of the active theme.
    #[cfg(feature = "watch")]
    pub fn watch_sources(&self) -> ThemeResult<crate::watch::SourceWatcher> {
        let mut watcher = crate::watch::SourceWatcher::new()?;

        for folder in self.loader.custom_sources() {
            if folder.is_dir() {
                watcher.watch(folder)?;
            } else {
                log::warn!("Not watching missing custom source folder {:?}", folder);
            }
        }
        if let Some(theme) = self.current_theme() {
            for path in theme.file_sources() {
                watcher.watch(path)?;
            }
        }

        Ok(watcher)
    }

    /// Reload the active theme if `watcher` saw a change.
    ///
    /// Returns whether a reload happened.
    #[cfg(feature = "watch")]
    pub fn reload_if_changed(&self, watcher: &crate::watch::SourceWatcher) -> ThemeResult<bool> {
        let changed = watcher.poll_changes();
        if changed.is_empty() {
            return Ok(false);
        }

        log::info!("Theme sources changed: {:?}", changed);
        self.reload()?;
        Ok(true)
    }
}

impl std::fmt::Debug for ThemeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeManager")
            .field("theme", &self.current_theme().map(|t| t.name().to_string()))
            .field("defaults", &self.defaults())
            .finish()
    }
}

/// A theme manager shared between threads.
pub type SharedThemeManager = Arc<ThemeManager>;

/// Create a shared theme manager from the environment's configuration.
pub fn create_shared_theme_manager() -> ThemeResult<SharedThemeManager> {
    ThemeManager::from_config(&ThemeConfig::from_env_or_default()).map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{LevelSource, ThemeLevel};

    fn text_theme(name: &str, text: &str) -> Theme {
        Theme::new(name, false, vec![ThemeLevel::new(name, LevelSource::Text(text.to_string()))])
    }

    #[test]
    fn test_activate_swaps_table() {
        let manager = ThemeManager::new(DefaultsLoader::new());
        assert!(manager.defaults().is_empty());

        let before = manager.defaults();
        manager.activate(text_theme("a", "Foo.bar = 1")).unwrap();
        assert_eq!(manager.defaults().get_int("Foo.bar"), Some(1));
        assert!(before.is_empty());
        assert_eq!(manager.current_theme().unwrap().name(), "a");
    }

    #[test]
    fn test_failed_activation_keeps_previous_table() {
        let manager = ThemeManager::new(DefaultsLoader::new());
        manager.activate(text_theme("good", "Foo.bar = 1")).unwrap();

        assert!(manager.activate(text_theme("bad", "Foo.background = @missing")).is_err());
        assert_eq!(manager.defaults().get_int("Foo.bar"), Some(1));
        assert_eq!(manager.current_theme().unwrap().name(), "good");
    }

    #[test]
    fn test_from_config_uses_fallback() {
        let config = ThemeConfig::new().with_theme("solarized").with_fallback("dark");
        let manager = ThemeManager::from_config(&config).unwrap();
        assert_eq!(manager.current_theme().unwrap().name(), "dark");
        assert!(!manager.defaults().is_empty());
    }

    #[test]
    fn test_reload_without_theme() {
        let manager = ThemeManager::new(DefaultsLoader::new());
        assert!(manager.reload().unwrap().is_empty());
    }
}
