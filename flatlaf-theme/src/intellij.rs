//! # IntelliJ Themes
//!
//! Imports IntelliJ platform `.theme.json` files. A theme is converted into
//! properties text and loaded as the last level on top of the `intellij` or
//! `darcula` chain, so it goes through the same reference resolution and value
//! parsing as every other source.
//!
//! The conversion:
//!
//! - `colors` become named colors. Values naming one are replaced by its hex
//!   value and every named color is also written as `ColorPalette.<name>`.
//! - `ui` objects are flattened into dotted keys. `os.default`, `os.windows`,
//!   `os.mac` and `os.linux` alternatives become `[win]`, `[mac]` and
//!   `[linux]` keys. A top level `"*"` object becomes `*.suffix` globals.
//! - IntelliJ keys with a different name are renamed, values that do not
//!   parse are logged and dropped.
//! - `icons.ColorPalette` colors are written as they are, checkbox colors are
//!   mapped onto the `CheckBox.icon` keys.
//!
//! ## Usage Examples
//!
//! ```rust
//! use flatlaf_theme::intellij::IntelliJTheme;
//! use flatlaf_theme::loader::DefaultsLoader;
//! use flatlaf_theme::theme::{LevelSource, Theme};
//!
//! let json = r##"{
//!     "name": "Arc Orange",
//!     "dark": false,
//!     "colors": { "accent": "#f57900" },
//!     "ui": { "*": { "selectionBackground": "accent" } }
//! }"##;
//!
//! let intellij = IntelliJTheme::parse(json).unwrap();
//! let theme = Theme::from_intellij(&intellij, LevelSource::IntelliJJson(json.to_string()));
//! let defaults = DefaultsLoader::new().load(&theme).unwrap();
//!
//! assert_eq!(
//!     defaults.get_color("List.selectionBackground").map(|c| c.to_hex()).as_deref(),
//!     Some("#f57900")
//! );
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::color::Color;
use crate::error::{ThemeError, ThemeResult};
use crate::parser::ValueParser;
use crate::properties::{self, PropertyBag};
use crate::registry::InstanceRegistry;
use crate::resolver::Resolver;

/// Keys that have no counterpart and are dropped.
const IGNORED_KEYS: &[&str] = &[
    "ComboBox.padding",
    "Spinner.padding",
    "Tree.leftChildIndent",
    "Tree.rightChildIndent",
];

/// IntelliJ keys and the keys they are stored under. An empty name drops the key.
const KEY_MAPPING: &[(&str, &str)] = &[
    ("ComboBox.background", ""),
    ("ComboBox.nonEditableBackground", "ComboBox.background"),
    ("ComboBox.ArrowButton.background", "ComboBox.buttonEditableBackground"),
    ("ComboBox.ArrowButton.disabledIconColor", "ComboBox.buttonDisabledArrowColor"),
    ("ComboBox.ArrowButton.iconColor", "ComboBox.buttonArrowColor"),
    ("ComboBox.ArrowButton.nonEditableBackground", "ComboBox.buttonBackground"),
    ("Component.inactiveErrorFocusColor", "Component.error.borderColor"),
    ("Component.errorFocusColor", "Component.error.focusedBorderColor"),
    ("Component.inactiveWarningFocusColor", "Component.warning.borderColor"),
    ("Component.warningFocusColor", "Component.warning.focusedBorderColor"),
    ("Link.activeForeground", "Component.linkColor"),
    ("Menu.border", "Menu.margin"),
    ("MenuItem.border", "MenuItem.margin"),
    ("PopupMenu.border", "PopupMenu.borderInsets"),
    ("ProgressBar.background", ""),
    ("ProgressBar.foreground", ""),
    ("ProgressBar.trackColor", "ProgressBar.background"),
    ("ProgressBar.progressColor", "ProgressBar.foreground"),
    ("ScrollBar.trackColor", "ScrollBar.track"),
    ("ScrollBar.thumbColor", "ScrollBar.thumb"),
    ("Separator.separatorColor", "Separator.foreground"),
    ("Slider.trackWidth", ""),
    ("TitlePane.infoForeground", "TitlePane.foreground"),
    ("TitlePane.inactiveInfoForeground", "TitlePane.inactiveForeground"),
];

/// `(target, source)`: the target takes the source's value if the theme sets the source.
const KEY_COPYING: &[(&str, &str)] = &[
    ("ComboBox.buttonSeparatorColor", "Component.borderColor"),
    ("ComboBox.buttonDisabledSeparatorColor", "Component.disabledBorderColor"),
    ("CheckBoxMenuItem.margin", "MenuItem.margin"),
    ("RadioButtonMenuItem.margin", "MenuItem.margin"),
    ("MenuItem.underlineSelectionColor", "TabbedPane.underlineColor"),
    ("Menu.selectionBackground", "List.selectionBackground"),
    ("MenuItem.selectionBackground", "List.selectionBackground"),
    ("CheckBoxMenuItem.selectionBackground", "List.selectionBackground"),
    ("RadioButtonMenuItem.selectionBackground", "List.selectionBackground"),
    ("ProgressBar.selectionForeground", "ProgressBar.background"),
    ("ProgressBar.selectionBackground", "ProgressBar.foreground"),
    ("Slider.trackValueColor", "ProgressBar.foreground"),
    ("Slider.thumbColor", "ProgressBar.foreground"),
    ("Slider.trackColor", "ProgressBar.background"),
    ("Spinner.buttonSeparatorColor", "Component.borderColor"),
    ("Spinner.buttonDisabledSeparatorColor", "Component.disabledBorderColor"),
    ("TabbedPane.selectedBackground", "DefaultTabs.underlinedTabBackground"),
    ("TabbedPane.selectedForeground", "DefaultTabs.underlinedTabForeground"),
    ("TabbedPane.inactiveUnderlineColor", "DefaultTabs.inactiveUnderlineColor"),
    ("TitlePane.inactiveBackground", "TitlePane.background"),
    ("ToggleButton.tab.underlineColor", "TabbedPane.underlineColor"),
    ("ToggleButton.tab.disabledUnderlineColor", "TabbedPane.disabledUnderlineColor"),
    ("ToggleButton.tab.selectedBackground", "TabbedPane.selectedBackground"),
    ("ToggleButton.tab.hoverBackground", "TabbedPane.hoverColor"),
    ("ToggleButton.tab.focusBackground", "TabbedPane.focusColor"),
    ("Spinner.buttonBackground", "ComboBox.buttonEditableBackground"),
    ("Spinner.buttonArrowColor", "ComboBox.buttonArrowColor"),
    ("Spinner.buttonDisabledArrowColor", "ComboBox.buttonDisabledArrowColor"),
];

const CHECKBOX_KEY_MAPPING: &[(&str, &str)] = &[
    ("Checkbox.Background.Default", "CheckBox.icon.background"),
    ("Checkbox.Background.Disabled", "CheckBox.icon.disabledBackground"),
    ("Checkbox.Border.Default", "CheckBox.icon.borderColor"),
    ("Checkbox.Border.Disabled", "CheckBox.icon.disabledBorderColor"),
    ("Checkbox.Focus.Thin.Default", "CheckBox.icon.focusedBorderColor"),
    ("Checkbox.Focus.Wide", "CheckBox.icon.focusColor"),
    ("Checkbox.Foreground.Disabled", "CheckBox.icon.disabledCheckmarkColor"),
    ("Checkbox.Background.Selected", "CheckBox.icon.selectedBackground"),
    ("Checkbox.Border.Selected", "CheckBox.icon.selectedBorderColor"),
    ("Checkbox.Foreground.Selected", "CheckBox.icon.checkmarkColor"),
    ("Checkbox.Focus.Thin.Selected", "CheckBox.icon.focusedSelectedBorderColor"),
];

/// Dark checkbox colors that are also used for their counterpart.
const CHECKBOX_DUPLICATE_COLORS: &[(&str, &str)] = &[
    ("Checkbox.Background.Default.Dark", "Checkbox.Background.Selected.Dark"),
    ("Checkbox.Border.Default.Dark", "Checkbox.Border.Selected.Dark"),
    ("Checkbox.Focus.Thin.Default.Dark", "Checkbox.Focus.Thin.Selected.Dark"),
    ("Checkbox.Background.Selected.Dark", "Checkbox.Background.Default.Dark"),
    ("Checkbox.Border.Selected.Dark", "Checkbox.Border.Default.Dark"),
    ("Checkbox.Focus.Thin.Selected.Dark", "Checkbox.Focus.Thin.Default.Dark"),
];

/// Focused checkbox borders get this alpha in dark themes.
const DARK_FOCUSED_BORDER_ALPHA: u8 = 0xa6;

/// Text components that share the text field background unless the theme sets their own.
const TEXT_BACKGROUND_KEYS: &[&str] = &[
    "FormattedTextField.background",
    "PasswordField.background",
    "EditorPane.background",
    "TextArea.background",
    "TextPane.background",
    "Spinner.background",
];

/// Platform alternatives of a value and the key prefix each one gets.
const OS_ALTERNATIVES: &[(&str, &str)] = &[
    ("os.default", ""),
    ("os.windows", "[win]"),
    ("os.mac", "[mac]"),
    ("os.linux", "[linux]"),
];

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

#[derive(Deserialize)]
struct ThemeJson {
    name: String,
    #[serde(default)]
    dark: JsonValue,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    colors: Map<String, JsonValue>,
    #[serde(default)]
    ui: Map<String, JsonValue>,
    #[serde(default)]
    icons: Map<String, JsonValue>,
}

/// A parsed IntelliJ `.theme.json` theme.
#[derive(Debug, Clone)]
pub struct IntelliJTheme {
    name: String,
    dark: bool,
    author: Option<String>,
    named_colors: IndexMap<String, Color>,
    ui: Map<String, JsonValue>,
    color_palette: Map<String, JsonValue>,
}

impl IntelliJTheme {
    /// Parse the JSON text of a theme.
    pub fn parse(json: &str) -> ThemeResult<Self> {
        Self::parse_from(json, None)
    }

    /// Read and parse a `.theme.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> ThemeResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| ThemeError::read(path, e))?;
        Self::parse_from(&json, Some(path))
    }

    fn parse_from(json: &str, path: Option<&Path>) -> ThemeResult<Self> {
        let raw: ThemeJson = serde_json::from_str(json).map_err(|e| {
            ThemeError::config(path.map(Path::to_path_buf), format!("invalid IntelliJ theme: {}", e))
        })?;

        let dark = match &raw.dark {
            JsonValue::Bool(dark) => *dark,
            JsonValue::String(dark) => dark.eq_ignore_ascii_case("true"),
            _ => false,
        };

        let mut named_colors = IndexMap::new();
        for (name, value) in &raw.colors {
            match value.as_str().map(Color::parse_hex) {
                Some(Ok(color)) => {
                    named_colors.insert(name.clone(), color);
                },
                _ => log::warn!("Ignoring invalid color '{}' of theme '{}': {}", name, raw.name, value),
            }
        }

        let color_palette = raw
            .icons
            .get("ColorPalette")
            .and_then(JsonValue::as_object)
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            name: raw.name,
            dark,
            author: raw.author,
            named_colors,
            ui: raw.ui,
            color_palette,
        })
    }

    /// The theme's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is a dark theme.
    pub fn is_dark(&self) -> bool {
        self.dark
    }

    /// The theme's author, if given.
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Colors of the `colors` object by name.
    pub fn named_colors(&self) -> &IndexMap<String, Color> {
        &self.named_colors
    }

    /// Convert the theme into raw properties, in load order.
    pub fn to_properties(&self) -> Vec<(String, String)> {
        let empty = PropertyBag::new();
        let parser = ValueParser::new(Resolver::new(&empty), Arc::new(InstanceRegistry::new()));
        let mut converter = Converter {
            theme: self,
            parser,
            entries: IndexMap::new(),
            ui_keys: HashSet::new(),
            set_keys: HashSet::new(),
        };
        converter.convert();
        converter.entries.into_iter().collect()
    }

    /// Convert the theme into properties text.
    pub fn to_properties_text(&self) -> String {
        properties::to_text(self.to_properties())
    }

    fn color_of(&self, value: &str) -> Option<Color> {
        self.named_colors
            .get(value)
            .copied()
            .or_else(|| Color::parse_hex(value).ok())
    }
}

struct Converter<'t, 'p> {
    theme: &'t IntelliJTheme,
    parser: ValueParser<'p>,
    entries: IndexMap<String, String>,
    /// IntelliJ keys the theme sets, before renaming.
    ui_keys: HashSet<String>,
    /// Keys written for every platform, after renaming.
    set_keys: HashSet<String>,
}

impl<'t> Converter<'t, '_> {
    fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    fn convert(&mut self) {
        let theme = self.theme;

        self.put("Component.isIntelliJTheme", "true");
        self.put("Button.paintShadow", "true");
        self.put("Button.shadowWidth", if theme.dark { "2" } else { "1" });

        for (name, color) in &theme.named_colors {
            self.put(format!("ColorPalette.{}", name), color.to_hex());
        }

        for (key, value) in &theme.ui {
            self.apply(key.clone(), value, "");
        }

        self.apply_color_palette();
        self.apply_checkbox_colors();
        self.apply_copies();
    }

    fn apply(&mut self, key: String, value: &JsonValue, prefix: &str) {
        let raw = match value {
            JsonValue::Object(map) => {
                if OS_ALTERNATIVES.iter().any(|(os, _)| map.contains_key(*os)) {
                    for (os, os_prefix) in OS_ALTERNATIVES {
                        if let Some(value) = map.get(*os) {
                            self.apply(key.clone(), value, os_prefix);
                        }
                    }
                } else {
                    for (child, value) in map {
                        self.apply(format!("{}.{}", key, child), value, prefix);
                    }
                }
                return;
            },
            JsonValue::String(s) => s.clone(),
            JsonValue::Number(n) => n.to_string(),
            JsonValue::Bool(b) => b.to_string(),
            JsonValue::Null | JsonValue::Array(_) => {
                log::debug!("Ignoring unsupported value of '{}' in theme '{}'", key, self.theme.name);
                return;
            },
        };
        if raw.is_empty() {
            return;
        }

        self.ui_keys.insert(key.clone());

        if key.ends_with(".border") || key.ends_with(".rowHeight") || IGNORED_KEYS.contains(&key.as_str()) {
            return;
        }
        let key = match lookup(KEY_MAPPING, &key) {
            Some("") => return,
            Some(mapped) => mapped.to_string(),
            None => key,
        };

        let value = self.convert_value(&key, &raw);
        if let Err(e) = self.parser.parse(&key, &value) {
            log::warn!("Ignoring value of theme '{}': {}", self.theme.name, e);
            return;
        }

        if prefix.is_empty() {
            self.set_keys.insert(key.clone());
        }
        self.put(format!("{}{}", prefix, key), value);
    }

    fn convert_value(&self, key: &str, raw: &str) -> String {
        if let Some(color) = self.theme.named_colors.get(raw) {
            return color.to_hex();
        }

        let valid_or_raw = |candidate: String| {
            if Color::parse_hex(&candidate).is_ok() {
                candidate
            } else {
                raw.to_string()
            }
        };

        if !raw.starts_with('#') && (key.ends_with("ground") || key.ends_with("Color")) {
            return valid_or_raw(format!("#{}", raw));
        }
        if let Some(color) = raw.strip_prefix('#').filter(|rest| rest.starts_with('#')) {
            return valid_or_raw(color.to_string());
        }
        if key.ends_with(".border") || key.ends_with("Border") {
            let parts: Vec<&str> = raw.split(',').collect();
            if parts.len() == 5 && !parts[4].starts_with('#') {
                return format!("{},#{}", parts[..4].join(","), parts[4]);
            }
        }

        raw.to_string()
    }

    fn apply_color_palette(&mut self) {
        let theme = self.theme;
        for (key, value) in &theme.color_palette {
            let Some(value) = value.as_str() else {
                continue;
            };
            if key.starts_with("Checkbox.") {
                continue;
            }

            let key = if theme.dark { key.strip_suffix(".Dark").unwrap_or(key) } else { key };
            if let Some(color) = theme.color_of(value) {
                self.put(key, color.to_hex());
            }
        }
    }

    /// Checkbox keys of light themes style the filled checkbox variant.
    fn checkbox_key(&self, key: &str) -> String {
        match key.strip_prefix("CheckBox.icon.") {
            Some(rest) if !self.theme.dark => format!("CheckBox.icon[filled].{}", rest),
            _ => key.to_string(),
        }
    }

    fn put_checkbox_color(&mut self, key: &str, color: Color) {
        let key = self.checkbox_key(key);
        let color = if self.theme.dark && key.contains("focused") && key.ends_with("BorderColor") {
            color.with_alpha(DARK_FOCUSED_BORDER_ALPHA)
        } else {
            color
        };
        self.put(key, color.to_hex());
    }

    fn apply_checkbox_colors(&mut self) {
        let theme = self.theme;
        let strip_dark = |key: &'t str| -> &'t str {
            if theme.dark {
                key.strip_suffix(".Dark").unwrap_or(key)
            } else {
                key
            }
        };

        let mut modified = false;
        for (key, value) in &theme.color_palette {
            let Some(value) = value.as_str() else {
                continue;
            };
            if !key.starts_with("Checkbox.") {
                continue;
            }

            // IntelliJ paints these two white whatever the theme says
            let value = if key == "Checkbox.Background.Default" || key == "Checkbox.Foreground.Selected" {
                "#ffffff"
            } else {
                value
            };
            let duplicate = lookup(CHECKBOX_DUPLICATE_COLORS, key);

            let Some(target) = lookup(CHECKBOX_KEY_MAPPING, strip_dark(key)) else {
                continue;
            };
            modified = true;

            let Some(color) = theme.color_of(value) else {
                continue;
            };
            self.put_checkbox_color(target, color);
            if let Some(second) = duplicate.and_then(|key| lookup(CHECKBOX_KEY_MAPPING, strip_dark(key))) {
                self.put_checkbox_color(second, color);
            }
        }

        if modified {
            self.put("CheckBox.icon.focusWidth", "null");
            self.put("CheckBox.icon.hoverBorderColor", "$?CheckBox.icon.focusedBorderColor");
            self.put("CheckBox.icon[filled].focusWidth", "null");
            self.put(
                "CheckBox.icon[filled].hoverBorderColor",
                "$?CheckBox.icon[filled].focusedBorderColor",
            );
            self.put(
                "CheckBox.icon[filled].focusedSelectedBackground",
                "$?CheckBox.icon[filled].selectedBackground",
            );
        }
    }

    fn apply_copies(&mut self) {
        let theme = self.theme;

        for (target, source) in KEY_COPYING {
            if self.set_keys.contains(*source) {
                self.put(*target, format!("${}", source));
            }
        }

        self.put("Button.disabledBackground", "$Panel.background");
        self.put("ToggleButton.disabledBackground", "$Panel.background");

        if !self.ui_keys.contains("Button.focusedBorderColor") && self.set_keys.contains("Component.focusedBorderColor") {
            self.put("Button.focusedBorderColor", "$Component.focusedBorderColor");
            self.set_keys.insert("Button.focusedBorderColor".to_string());
        }
        if self.set_keys.contains("Button.focusedBorderColor") {
            self.put("Button.hoverBorderColor", "$Button.focusedBorderColor");
        }

        if self.set_keys.contains("TextField.background") {
            self.put("ComboBox.editableBackground", "$TextField.background");
            for key in TEXT_BACKGROUND_KEYS {
                if !self.ui_keys.contains(*key) {
                    self.put(*key, "$TextField.background");
                }
            }
        }

        if !self.ui_keys.contains("ToggleButton.foreground") && self.set_keys.contains("Button.foreground") {
            self.put("ToggleButton.foreground", "$Button.foreground");
        }

        let desktop = if theme.dark { "lighten" } else { "darken" };
        self.put(
            "Desktop.background",
            format!("{}($Panel.background,5%,autoInverse)", desktop),
        );

        if theme.author.as_deref() == Some("Mallowigi") {
            self.put("List.background", "$Tree.background");
            self.put("Table.background", "$Tree.background");
        }
    }
}
