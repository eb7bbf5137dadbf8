//! # Themes
//!
//! A [Theme] is an ordered chain of [ThemeLevel]s, most generic first. Each
//! level may carry its own properties source; sources of later levels
//! override earlier ones.
//!
//! The built-in themes share the `FlatLaf` base level:
//!
//! | Name       | Chain                                          |
//! |------------|------------------------------------------------|
//! | `light`    | `FlatLaf`, `FlatLightLaf`                      |
//! | `dark`     | `FlatLaf`, `FlatDarkLaf`                       |
//! | `intellij` | `FlatLaf`, `FlatLightLaf`, `FlatIntelliJLaf`   |
//! | `darcula`  | `FlatLaf`, `FlatDarkLaf`, `FlatDarculaLaf`     |
//!
//! A properties file can extend a built-in theme by naming it in its
//! `@baseTheme` key (default `light`). An IntelliJ `.theme.json` file extends
//! `intellij` or `darcula`, depending on whether it is dark.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ThemeError, ThemeResult};
use crate::intellij::IntelliJTheme;
use crate::properties;

const FLATLAF: &str = include_str!("../themes/FlatLaf.properties");
const FLAT_LIGHT_LAF: &str = include_str!("../themes/FlatLightLaf.properties");
const FLAT_DARK_LAF: &str = include_str!("../themes/FlatDarkLaf.properties");
const FLAT_INTELLIJ_LAF: &str = include_str!("../themes/FlatIntelliJLaf.properties");
const FLAT_DARCULA_LAF: &str = include_str!("../themes/FlatDarculaLaf.properties");

/// Key naming the built-in theme a properties file theme extends.
pub const BASE_THEME_KEY: &str = "@baseTheme";

/// Where the properties of a level come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelSource {
    /// Text compiled into the binary.
    Embedded(&'static str),
    /// A file read at load time.
    File(PathBuf),
    /// Text supplied at runtime.
    Text(String),
    /// An IntelliJ `.theme.json` file, converted at load time.
    IntelliJFile(PathBuf),
    /// IntelliJ theme JSON supplied at runtime.
    IntelliJJson(String),
    /// The level contributes nothing by itself.
    None,
}

/// One level of a theme chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeLevel {
    name: String,
    source: LevelSource,
}

impl ThemeLevel {
    /// Create a level.
    pub fn new(name: impl Into<String>, source: LevelSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    /// The level's name, e.g. `FlatDarkLaf`. Addons and custom source folders
    /// provide files named after it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The level's own source.
    pub fn source(&self) -> &LevelSource {
        &self.source
    }

    /// Read the level's own properties text.
    pub fn read_source(&self) -> ThemeResult<Option<Cow<'_, str>>> {
        match &self.source {
            LevelSource::Embedded(text) => Ok(Some(Cow::Borrowed(text))),
            LevelSource::Text(text) => Ok(Some(Cow::Borrowed(text.as_str()))),
            LevelSource::File(path) => fs::read_to_string(path)
                .map(|text| Some(Cow::Owned(text)))
                .map_err(|e| ThemeError::read(path, e)),
            LevelSource::IntelliJFile(path) => {
                Ok(Some(Cow::Owned(IntelliJTheme::from_file(path)?.to_properties_text())))
            },
            LevelSource::IntelliJJson(json) => {
                Ok(Some(Cow::Owned(IntelliJTheme::parse(json)?.to_properties_text())))
            },
            LevelSource::None => Ok(None),
        }
    }
}

/// An ordered chain of theme levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    name: String,
    dark: bool,
    levels: Vec<ThemeLevel>,
}

impl Theme {
    /// Create a theme from its levels, most generic first.
    pub fn new(name: impl Into<String>, dark: bool, levels: Vec<ThemeLevel>) -> Self {
        Self {
            name: name.into(),
            dark,
            levels,
        }
    }

    /// Names of the built-in themes.
    pub fn builtin_names() -> &'static [&'static str] {
        &["light", "dark", "intellij", "darcula"]
    }

    /// Look up a built-in theme by name, ignoring case.
    pub fn builtin(name: &str) -> ThemeResult<Self> {
        let base = ThemeLevel::new("FlatLaf", LevelSource::Embedded(FLATLAF));
        let light = || ThemeLevel::new("FlatLightLaf", LevelSource::Embedded(FLAT_LIGHT_LAF));
        let dark = || ThemeLevel::new("FlatDarkLaf", LevelSource::Embedded(FLAT_DARK_LAF));

        let theme = match name.to_ascii_lowercase().as_str() {
            "light" => Self::new("light", false, vec![base, light()]),
            "dark" => Self::new("dark", true, vec![base, dark()]),
            "intellij" => Self::new(
                "intellij",
                false,
                vec![
                    base,
                    light(),
                    ThemeLevel::new("FlatIntelliJLaf", LevelSource::Embedded(FLAT_INTELLIJ_LAF)),
                ],
            ),
            "darcula" => Self::new(
                "darcula",
                true,
                vec![
                    base,
                    dark(),
                    ThemeLevel::new("FlatDarculaLaf", LevelSource::Embedded(FLAT_DARCULA_LAF)),
                ],
            ),
            _ => return Err(ThemeError::not_found(name)),
        };

        Ok(theme)
    }

    /// Load a theme from a properties file that extends a built-in theme.
    ///
    /// The theme and its extra level are named after the file stem; the file
    /// is read again whenever the theme is loaded.
    pub fn from_file(path: impl AsRef<Path>) -> ThemeResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ThemeError::read(path, e))?;

        let base_name = properties::parse(&text)
            .map_err(|e| ThemeError::config(Some(path.to_path_buf()), e.0))?
            .into_iter()
            .rev()
            .find(|(key, _)| key == BASE_THEME_KEY)
            .map(|(_, value)| value)
            .unwrap_or_else(|| "light".to_string());

        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("custom")
            .to_string();

        let base = Self::builtin(base_name.trim()).map_err(|_| {
            ThemeError::config(
                Some(path.to_path_buf()),
                format!("unknown base theme '{}'", base_name.trim()),
            )
        })?;

        log::debug!("Theme '{}' extends '{}'", name, base.name);

        let mut levels = base.levels;
        levels.push(ThemeLevel::new(name.clone(), LevelSource::File(path.to_path_buf())));
        Ok(Self::new(name, base.dark, levels))
    }

    /// Build the theme of an IntelliJ theme on top of `intellij` or `darcula`.
    ///
    /// `source` is the level the converted properties are read from, usually
    /// the theme's own file or JSON.
    pub fn from_intellij(theme: &IntelliJTheme, source: LevelSource) -> Self {
        let base = ThemeLevel::new("FlatLaf", LevelSource::Embedded(FLATLAF));
        let mut levels = if theme.is_dark() {
            vec![
                base,
                ThemeLevel::new("FlatDarkLaf", LevelSource::Embedded(FLAT_DARK_LAF)),
                ThemeLevel::new("FlatDarculaLaf", LevelSource::Embedded(FLAT_DARCULA_LAF)),
            ]
        } else {
            vec![
                base,
                ThemeLevel::new("FlatLightLaf", LevelSource::Embedded(FLAT_LIGHT_LAF)),
                ThemeLevel::new("FlatIntelliJLaf", LevelSource::Embedded(FLAT_INTELLIJ_LAF)),
            ]
        };

        log::debug!("IntelliJ theme '{}' extends '{}'", theme.name(), levels[2].name());

        levels.push(ThemeLevel::new(theme.name(), source));
        Self::new(theme.name(), theme.is_dark(), levels)
    }

    /// Load an IntelliJ `.theme.json` file. The file is read again whenever
    /// the theme is loaded.
    pub fn from_intellij_file(path: impl AsRef<Path>) -> ThemeResult<Self> {
        let path = path.as_ref();
        let theme = IntelliJTheme::from_file(path)?;
        Ok(Self::from_intellij(&theme, LevelSource::IntelliJFile(path.to_path_buf())))
    }

    /// Find a theme by built-in name, or load it if `name` is the path of a
    /// `.properties` or `.theme.json` file.
    pub fn lookup(name: &str) -> ThemeResult<Self> {
        if name.ends_with(".properties") {
            Self::from_file(name)
        } else if name.ends_with(".theme.json") {
            Self::from_intellij_file(name)
        } else {
            Self::builtin(name)
        }
    }

    /// Paths of all file levels, e.g. to watch them for changes.
    pub fn file_sources(&self) -> Vec<&Path> {
        self.levels
            .iter()
            .filter_map(|level| match &level.source {
                LevelSource::File(path) | LevelSource::IntelliJFile(path) => Some(path.as_path()),
                _ => None,
            })
            .collect()
    }

    /// Append a level to the end of the chain.
    pub fn with_level(mut self, level: ThemeLevel) -> Self {
        self.levels.push(level);
        self
    }

    /// The theme's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is a dark theme, which enables `[dark]` keys.
    pub fn is_dark(&self) -> bool {
        self.dark
    }

    /// The levels, most generic first.
    pub fn levels(&self) -> &[ThemeLevel] {
        &self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_chains() {
        let darcula = Theme::builtin("Darcula").unwrap();
        assert!(darcula.is_dark());
        let names: Vec<&str> = darcula.levels().iter().map(ThemeLevel::name).collect();
        assert_eq!(names, vec!["FlatLaf", "FlatDarkLaf", "FlatDarculaLaf"]);

        for name in Theme::builtin_names() {
            assert!(Theme::builtin(name).is_ok());
        }
        assert!(matches!(Theme::builtin("solarized"), Err(ThemeError::ThemeNotFound { .. })));
    }

    #[test]
    fn test_embedded_sources_parse() {
        for name in Theme::builtin_names() {
            for level in Theme::builtin(name).unwrap().levels() {
                let text = level.read_source().unwrap().unwrap();
                assert!(properties::parse(&text).is_ok(), "level {}", level.name());
            }
        }
    }

    #[test]
    fn test_from_file_extends_base_theme() {
        let mut file = tempfile::Builder::new().suffix(".properties").tempfile().unwrap();
        writeln!(file, "@baseTheme = dark").unwrap();
        writeln!(file, "@accentColor = #ff0000").unwrap();

        let theme = Theme::from_file(file.path()).unwrap();
        assert!(theme.is_dark());
        assert_eq!(theme.levels().len(), 3);
        assert!(matches!(theme.levels()[2].source(), LevelSource::File(_)));
    }

    #[test]
    fn test_from_file_rejects_unknown_base() {
        let mut file = tempfile::Builder::new().suffix(".properties").tempfile().unwrap();
        writeln!(file, "@baseTheme = neon").unwrap();
        assert!(matches!(Theme::from_file(file.path()), Err(ThemeError::Config { .. })));
    }

    #[test]
    fn test_intellij_file_extends_darcula() {
        let mut file = tempfile::Builder::new().suffix(".theme.json").tempfile().unwrap();
        writeln!(file, r##"{{ "name": "Night Owl", "dark": true, "ui": {{ "Panel.background": "#011627" }} }}"##).unwrap();

        let path = file.path().to_str().unwrap();
        let theme = Theme::lookup(path).unwrap();
        assert_eq!(theme.name(), "Night Owl");
        assert!(theme.is_dark());
        assert_eq!(theme.levels()[2].name(), "FlatDarculaLaf");
        assert_eq!(theme.file_sources(), vec![file.path()]);

        let text = theme.levels()[3].read_source().unwrap().unwrap();
        assert!(text.contains("Panel.background = #011627"));
    }

    #[test]
    fn test_missing_file_source() {
        let level = ThemeLevel::new("Gone", LevelSource::File(PathBuf::from("/nonexistent/Gone.properties")));
        assert!(matches!(level.read_source(), Err(ThemeError::Read { .. })));
        assert_eq!(ThemeLevel::new("Empty", LevelSource::None).read_source().unwrap(), None);
    }
}
