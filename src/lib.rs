#![warn(missing_docs)]

//! Flat look and feel themes for Rust UI toolkits.
//!
//! This crate re-exports [flatlaf_theme] and adds a prelude and a one call
//! setup for applications.

pub use flatlaf_theme as theme;

/// A "prelude" for users of flatlaf.
///
/// ```rust
/// use flatlaf::prelude::*;
/// ```
pub mod prelude {
    pub use crate::theme::color::Color;
    pub use crate::theme::config::ThemeConfig;
    pub use crate::theme::defaults::UIDefaults;
    pub use crate::theme::error::{ThemeError, ThemeResult};
    pub use crate::theme::loader::{DefaultsAddon, DefaultsLoader, FolderAddon};
    pub use crate::theme::manager::{SharedThemeManager, ThemeManager};
    pub use crate::theme::registry::InstanceRegistry;
    pub use crate::theme::theme::{LevelSource, Theme, ThemeLevel};
    pub use crate::theme::value::{Border, Dimension, Font, FontStyle, Insets, Value};
}

use std::sync::Arc;

use crate::prelude::*;

/// Load the configured theme and return a shared manager.
///
/// The configuration comes from the environment, see [ThemeConfig::from_env_or_default].
pub fn setup() -> ThemeResult<SharedThemeManager> {
    setup_with(&ThemeConfig::from_env_or_default())
}

/// Load the theme of `config` and return a shared manager.
pub fn setup_with(config: &ThemeConfig) -> ThemeResult<SharedThemeManager> {
    let manager = ThemeManager::from_config(config)?;
    if let Some(theme) = manager.current_theme() {
        log::info!(
            "flatlaf: using theme '{}' ({} keys)",
            theme.name(),
            manager.defaults().len()
        );
    }
    Ok(Arc::new(manager))
}
