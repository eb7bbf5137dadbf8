//! # Theme Configuration
//!
//! Selects the theme to activate and configures the [DefaultsLoader].
//!
//! The configuration is read from, in order of increasing precedence:
//!
//! 1. built-in defaults (`light` theme, strict loading)
//! 2. the file named by `FLATLAF_THEME_CONFIG`, or `<config dir>/flatlaf/theme.toml`
//! 3. the environment variables `FLATLAF_THEME` and `FLATLAF_STRICT`
//!
//! ## Configuration File Format
//!
//! ```toml
//! [theme]
//! name = "dark"
//! fallback = "light"
//! strict = false
//! scale_factor = 1.25
//! platform = "linux"
//! custom_sources = ["/usr/share/myapp/themes"]
//!
//! [theme.defaults]
//! "@accentColor" = "#e65100"
//! "Button.arc" = "999"
//! ```
//!
//! `name` and `fallback` are built-in theme names or paths of `.properties`
//! theme files.
//!
//! ## Usage Examples
//!
//! ```rust
//! use flatlaf_theme::config::ThemeConfig;
//!
//! let config = ThemeConfig::from_toml(r#"
//! [theme]
//! name = "darcula"
//! "#).unwrap();
//!
//! let theme = config.resolve_theme().unwrap();
//! assert_eq!(theme.name(), "darcula");
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ThemeError, ThemeResult};
use crate::loader::DefaultsLoader;
use crate::properties::Platform;
use crate::theme::Theme;

/// Environment variable selecting the theme.
pub const THEME_ENV: &str = "FLATLAF_THEME";
/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "FLATLAF_THEME_CONFIG";
/// Environment variable overriding strict loading.
pub const STRICT_ENV: &str = "FLATLAF_STRICT";

/// Theme selection and loader settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// Theme to activate; the fallback is used if unset.
    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Theme activated if `theme` fails to load.
    pub fallback: String,
    /// Whether malformed values fail the activation.
    pub strict: bool,
    /// Factor scaled values are multiplied by.
    pub scale_factor: f32,
    /// Platform for `[win]`, `[mac]` and `[linux]` keys; the current one if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// Folders with `<levelName>.properties` files.
    pub custom_sources: Vec<PathBuf>,
    /// Values merged after all sources.
    #[serde(rename = "defaults")]
    pub additional_defaults: IndexMap<String, String>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            theme: None,
            fallback: "light".to_string(),
            strict: true,
            scale_factor: 1.0,
            platform: None,
            custom_sources: Vec::new(),
            additional_defaults: IndexMap::new(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    theme: ThemeConfig,
}

impl ThemeConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the theme to activate.
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    /// Set the fallback theme.
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Set strict loading.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the scale factor.
    pub fn with_scale_factor(mut self, factor: f32) -> Self {
        self.scale_factor = factor;
        self
    }

    /// Set the platform.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Add a custom source folder.
    pub fn with_custom_source(mut self, folder: impl Into<PathBuf>) -> Self {
        self.custom_sources.push(folder.into());
        self
    }

    /// Add a value merged after all sources.
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_defaults.insert(key.into(), value.into());
        self
    }

    /// The standard configuration file location, `<config dir>/flatlaf/theme.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("flatlaf").join("theme.toml"))
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ThemeResult<Self> {
        let path = path.as_ref();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            return Err(ThemeError::config(
                Some(path.to_path_buf()),
                "unsupported configuration file format, use .toml",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| ThemeError::read(path, e))?;
        Self::parse_toml(&content).map_err(|details| ThemeError::config(Some(path.to_path_buf()), details))
    }

    /// Load a configuration from TOML text.
    pub fn from_toml(content: &str) -> ThemeResult<Self> {
        Self::parse_toml(content).map_err(|details| ThemeError::config(None, details))
    }

    fn parse_toml(content: &str) -> Result<Self, String> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| e.to_string())?;
        let config = file.theme;
        if config.scale_factor.is_nan() || config.scale_factor <= 0.0 {
            return Err(format!("scale_factor must be positive, got {}", config.scale_factor));
        }
        Ok(config)
    }

    /// Serialize to TOML text in the format read by [ThemeConfig::from_toml].
    pub fn to_toml(&self) -> ThemeResult<String> {
        toml::to_string(&ConfigFile { theme: self.clone() }).map_err(|e| ThemeError::config(None, e.to_string()))
    }

    /// Build the configuration from the configuration file and the environment.
    ///
    /// A configuration file that fails to load is logged and ignored.
    pub fn from_env_or_default() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let path = var(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| Self::default_path().filter(|path| path.is_file()));

        let mut config = match path {
            Some(path) => Self::from_file(&path).unwrap_or_else(|e| {
                log::warn!("Ignoring theme configuration: {}", e);
                Self::default()
            }),
            None => Self::default(),
        };

        if let Some(theme) = var(THEME_ENV).filter(|theme| !theme.trim().is_empty()) {
            config.theme = Some(theme.trim().to_string());
        }
        if let Some(strict) = var(STRICT_ENV) {
            match parse_flag(&strict) {
                Some(strict) => config.strict = strict,
                None => log::warn!("Ignoring {}={:?}, expected true or false", STRICT_ENV, strict),
            }
        }

        config
    }

    /// Create a loader with these settings.
    pub fn loader(&self) -> DefaultsLoader {
        let mut loader = DefaultsLoader::new()
            .strict(self.strict)
            .scale_factor(self.scale_factor)
            .additional_defaults(self.additional_defaults.clone());

        if let Some(platform) = self.platform {
            loader = loader.platform(platform);
        }
        for folder in &self.custom_sources {
            loader = loader.custom_source(folder);
        }

        loader
    }

    /// Look up the configured theme, or the fallback if that fails.
    pub fn resolve_theme(&self) -> ThemeResult<Theme> {
        if let Some(name) = &self.theme {
            match Theme::lookup(name) {
                Ok(theme) => return Ok(theme),
                Err(e) => log::warn!("Using fallback theme '{}': {}", self.fallback, e),
            }
        }
        Theme::lookup(&self.fallback)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_toml() {
        let config = ThemeConfig::from_toml(
            r##"
            [theme]
            name = "dark"
            strict = false
            scale_factor = 1.5
            platform = "mac"
            custom_sources = ["/tmp/themes"]

            [theme.defaults]
            "@accentColor" = "#ff0000"
            "##,
        )
        .unwrap();

        assert_eq!(config.theme.as_deref(), Some("dark"));
        assert_eq!(config.fallback, "light");
        assert!(!config.strict);
        assert_eq!(config.scale_factor, 1.5);
        assert_eq!(config.platform, Some(Platform::MacOs));
        assert_eq!(config.custom_sources, vec![PathBuf::from("/tmp/themes")]);
        assert_eq!(config.additional_defaults.get("@accentColor").map(String::as_str), Some("#ff0000"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(ThemeConfig::from_toml("[theme]\nbogus = 1"), Err(ThemeError::Config { .. })));
        assert!(ThemeConfig::from_toml("[theme]\nscale_factor = 0.0").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ThemeConfig::new()
            .with_theme("intellij")
            .with_default("Button.arc", "999")
            .with_custom_source("/opt/themes");
        assert_eq!(ThemeConfig::from_toml(&config.to_toml().unwrap()).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("theme.toml");
        fs::write(&path, "[theme]\nname = \"darcula\"\n").unwrap();
        assert_eq!(ThemeConfig::from_file(&path).unwrap().theme.as_deref(), Some("darcula"));

        let json = dir.path().join("theme.json");
        fs::write(&json, "{}").unwrap();
        assert!(ThemeConfig::from_file(&json).is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("theme.toml");
        fs::write(&path, "[theme]\nname = \"darcula\"\nstrict = true\n").unwrap();

        let vars: HashMap<&str, String> = [
            (CONFIG_ENV, path.display().to_string()),
            (THEME_ENV, "dark".to_string()),
            (STRICT_ENV, "0".to_string()),
        ]
        .into_iter()
        .collect();

        let config = ThemeConfig::from_vars(|name| vars.get(name).cloned());
        assert_eq!(config.theme.as_deref(), Some("dark"));
        assert!(!config.strict);
    }

    #[test]
    fn test_broken_config_file_is_ignored() {
        let config = ThemeConfig::from_vars(|name| {
            (name == CONFIG_ENV).then(|| "/nonexistent/theme.toml".to_string())
        });
        assert_eq!(config, ThemeConfig::default());
    }

    #[test]
    fn test_resolve_theme_falls_back() {
        let config = ThemeConfig::new().with_theme("solarized").with_fallback("dark");
        assert_eq!(config.resolve_theme().unwrap().name(), "dark");
        assert_eq!(ThemeConfig::new().resolve_theme().unwrap().name(), "light");
    }
}
