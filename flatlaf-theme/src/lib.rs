#![warn(missing_docs)]

//! # FlatLaf Theme Engine
//!
//! Loads flat look and feel themes from layered `.properties` sources into a
//! typed, string-keyed [UIDefaults](defaults::UIDefaults) table that widget
//! painters query at paint time.
//!
//! ## Overview
//!
//! A theme is a chain of levels, most generic first. Loading a theme:
//!
//! 1. merges the properties of every level and of every addon into one bag
//! 2. applies `*.suffix` globals
//! 3. resolves `@variable`, `$key` and `@@key` references
//! 4. parses each value into a typed [Value](value::Value), evaluating color
//!    functions like `darken(@background,10%)`
//! 5. writes the values into a new table
//!
//! The [ThemeManager](manager::ThemeManager) swaps the new table in atomically
//! and keeps the previous one if loading fails.
//!
//! ## Quick Start
//!
//! ```rust
//! use flatlaf_theme::loader::DefaultsLoader;
//! use flatlaf_theme::manager::ThemeManager;
//!
//! let manager = ThemeManager::new(DefaultsLoader::new());
//! manager.activate_by_name("darcula").unwrap();
//!
//! let defaults = manager.defaults();
//! let background = defaults.get_color("Panel.background");
//! assert!(background.is_some());
//! ```
//!
//! ## Theme Configuration
//!
//! ```rust
//! use flatlaf_theme::config::ThemeConfig;
//! use flatlaf_theme::manager::ThemeManager;
//!
//! let config = ThemeConfig::new()
//!     .with_theme("dark")
//!     .with_default("@accentColor", "#e65100");
//!
//! let manager = ThemeManager::from_config(&config).unwrap();
//! assert_eq!(manager.current_theme().unwrap().name(), "dark");
//! ```
//!
//! ### Environment Variables
//!
//! ```bash
//! export FLATLAF_THEME=darcula
//! export FLATLAF_THEME_CONFIG=~/.config/myapp/theme.toml
//! export FLATLAF_STRICT=false
//! ```
//!
//! ## Color Functions
//!
//! ```rust
//! use flatlaf_theme::color::Color;
//! use flatlaf_theme::color_functions::{darken, mix, spin};
//!
//! let red = Color::rgb(255, 0, 0);
//! assert_eq!(spin(red, 180.0), Color::rgb(0, 255, 255));
//! assert_eq!(mix(red, red, 0.3), red);
//! assert_eq!(darken(Color::WHITE, 100.0), Color::BLACK);
//! ```

/// Contains the [color::Color] type.
pub mod color;
/// Contains the HSL color functions and [color_functions::DerivedColor].
pub mod color_functions;
/// Contains the [config::ThemeConfig] struct for theme configuration.
pub mod config;
/// Contains the [defaults::UIDefaults] table.
pub mod defaults;
/// Contains JSON snapshots of resolved tables.
pub mod dump;
/// Contains the [error::ThemeError] type.
pub mod error;
/// Contains the IntelliJ theme importer.
pub mod intellij;
/// Contains the [loader::DefaultsLoader] and the addon trait.
pub mod loader;
/// Contains theme management and runtime switching.
pub mod manager;
/// Contains the value parser.
pub mod parser;
/// Contains the properties reader and [properties::PropertyBag].
pub mod properties;
/// Contains the [registry::InstanceRegistry] for icons, borders and other objects.
pub mod registry;
/// Contains reference resolution.
pub mod resolver;
/// Contains the [theme::Theme] chain and the built-in themes.
pub mod theme;
/// Contains the typed values.
pub mod value;
/// Contains file watching for live reload.
#[cfg(feature = "watch")]
pub mod watch;
