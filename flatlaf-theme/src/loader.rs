//! # Defaults Loader
//!
//! Builds a [UIDefaults] table from a [Theme]:
//!
//! 1. every level of the chain contributes its own source, followed by the
//!    sources addons provide for that level (ascending priority)
//! 2. folders from [DefaultsLoader::custom_source] contribute a file named
//!    `<levelName>.properties` per level
//! 3. [DefaultsLoader::additional_default] values are merged last
//! 4. `*.suffix` globals are removed from the bag and applied to every key
//!    ending in `.suffix`
//! 5. every remaining value is resolved and parsed into the table
//!
//! Keys starting with `@` are variables. They are not put into the table but
//! kept in [UIDefaults::variables].
//!
//! ## Usage Examples
//!
//! ```rust
//! use flatlaf_theme::loader::DefaultsLoader;
//! use flatlaf_theme::theme::Theme;
//!
//! let defaults = DefaultsLoader::new()
//!     .additional_default("@accentColor", "#e65100")
//!     .load(&Theme::builtin("dark").unwrap())
//!     .unwrap();
//!
//! assert!(defaults.get_color("Button.default.background").is_some());
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::color::Color;
use crate::defaults::UIDefaults;
use crate::error::{ThemeError, ThemeResult};
use crate::parser::{SystemColorGetter, ValueParser};
use crate::properties::{KeyPrefixFilter, Platform, PropertyBag};
use crate::registry::InstanceRegistry;
use crate::resolver::{is_variable_reference, Resolver, VARIABLE_PREFIX};
use crate::theme::{Theme, ThemeLevel};

/// Prefix of global keys.
pub const GLOBAL_PREFIX: &str = "*.";

/// Default priority of addons.
pub const DEFAULT_ADDON_PRIORITY: i32 = 10000;

/// A plugin contributing properties to theme levels.
pub trait DefaultsAddon: Send + Sync {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Properties text for `level`, or `None` if the addon has nothing for it.
    fn defaults(&self, level: &ThemeLevel) -> io::Result<Option<String>>;

    /// Addons with a lower priority are loaded first.
    fn priority(&self) -> i32 {
        DEFAULT_ADDON_PRIORITY
    }

    /// Called after the table is complete, in priority order.
    fn after_defaults_loading(&self, _defaults: &mut UIDefaults) {}
}

/// An addon that serves `<levelName>.properties` files from a folder.
#[derive(Debug, Clone)]
pub struct FolderAddon {
    name: String,
    folder: PathBuf,
    priority: i32,
}

impl FolderAddon {
    /// Create an addon reading from `folder`.
    pub fn new(name: impl Into<String>, folder: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            folder: folder.into(),
            priority: DEFAULT_ADDON_PRIORITY,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl DefaultsAddon for FolderAddon {
    fn name(&self) -> &str {
        &self.name
    }

    fn defaults(&self, level: &ThemeLevel) -> io::Result<Option<String>> {
        read_level_file(&self.folder, level)
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

fn read_level_file(folder: &Path, level: &ThemeLevel) -> io::Result<Option<String>> {
    let path = folder.join(format!("{}.properties", level.name()));
    if !path.is_file() {
        return Ok(None);
    }
    fs::read_to_string(path).map(Some)
}

/// Loads themes into [UIDefaults] tables.
#[derive(Clone)]
pub struct DefaultsLoader {
    addons: Vec<Arc<dyn DefaultsAddon>>,
    custom_sources: Vec<PathBuf>,
    additional_defaults: IndexMap<String, String>,
    platform: Platform,
    strict: bool,
    scale_factor: f32,
    registry: Arc<InstanceRegistry>,
    system_colors: Option<SystemColorGetter>,
    base_defaults: Option<UIDefaults>,
}

impl Default for DefaultsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultsLoader {
    /// Create a strict loader for the current platform.
    pub fn new() -> Self {
        Self {
            addons: Vec::new(),
            custom_sources: Vec::new(),
            additional_defaults: IndexMap::new(),
            platform: Platform::current(),
            strict: true,
            scale_factor: 1.0,
            registry: Arc::new(InstanceRegistry::new()),
            system_colors: None,
            base_defaults: None,
        }
    }

    /// Add an addon.
    pub fn addon(mut self, addon: impl DefaultsAddon + 'static) -> Self {
        self.addons.push(Arc::new(addon));
        self
    }

    /// Add a folder with `<levelName>.properties` files loaded after all addons.
    pub fn custom_source(mut self, folder: impl Into<PathBuf>) -> Self {
        self.custom_sources.push(folder.into());
        self
    }

    /// Add a value merged after all sources.
    pub fn additional_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_defaults.insert(key.into(), value.into());
        self
    }

    /// Add values merged after all sources.
    pub fn additional_defaults<I, K, V>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.additional_defaults
            .extend(defaults.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the platform used for `[win]`, `[mac]` and `[linux]` keys.
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Whether malformed values fail the load (`true`) or are logged and skipped.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the factor scaled values are multiplied by.
    pub fn scale_factor(mut self, factor: f32) -> Self {
        self.scale_factor = factor;
        self
    }

    /// Set the registry used to build icons, borders and other instances.
    pub fn registry(mut self, registry: InstanceRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Set the getter answering `systemColor()`.
    pub fn system_colors<F>(mut self, getter: F) -> Self
    where
        F: Fn(&str) -> Option<Color> + Send + Sync + 'static,
    {
        self.system_colors = Some(Arc::new(getter));
        self
    }

    /// Start every table from these values. Globals apply to their keys too.
    pub fn base_defaults(mut self, defaults: UIDefaults) -> Self {
        self.base_defaults = Some(defaults);
        self
    }

    /// The configured custom source folders.
    pub fn custom_sources(&self) -> &[PathBuf] {
        &self.custom_sources
    }

    /// Whether the loader is strict.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    fn sorted_addons(&self) -> Vec<&Arc<dyn DefaultsAddon>> {
        let mut addons: Vec<_> = self.addons.iter().collect();
        addons.sort_by_key(|addon| addon.priority());
        addons
    }

    /// Merge all sources of `theme` into one bag, before globals are applied.
    ///
    /// Sources that can not be read or parsed are logged and skipped.
    pub fn load_properties(&self, theme: &Theme) -> PropertyBag {
        let filter = KeyPrefixFilter::new(theme.is_dark(), self.platform);
        let addons = self.sorted_addons();
        let mut bag = PropertyBag::new();

        for level in theme.levels() {
            match level.read_source() {
                Ok(Some(text)) => load_text(&mut bag, &text, &filter, level.name()),
                Ok(None) => {},
                Err(e) => log::warn!("Skipping source of level '{}': {}", level.name(), e),
            }

            for addon in &addons {
                match addon.defaults(level) {
                    Ok(Some(text)) => {
                        let origin = format!("{} ({})", addon.name(), level.name());
                        load_text(&mut bag, &text, &filter, &origin);
                    },
                    Ok(None) => {},
                    Err(e) => log::warn!(
                        "Addon '{}' failed to provide defaults for '{}': {}",
                        addon.name(),
                        level.name(),
                        e
                    ),
                }
            }
        }

        for folder in &self.custom_sources {
            for level in theme.levels() {
                match read_level_file(folder, level) {
                    Ok(Some(text)) => {
                        let origin = folder.join(format!("{}.properties", level.name()));
                        load_text(&mut bag, &text, &filter, &origin.display().to_string());
                    },
                    Ok(None) => {},
                    Err(e) => log::warn!(
                        "Skipping custom defaults for '{}' in {:?}: {}",
                        level.name(),
                        folder,
                        e
                    ),
                }
            }
        }

        for (key, value) in &self.additional_defaults {
            if let Some(key) = filter.apply(key) {
                bag.insert(key, value.as_str());
            }
        }

        bag
    }

    /// Load `theme` into a new table.
    ///
    /// Unresolved references and reference cycles fail immediately. Malformed
    /// values fail with [ThemeError::Malformed] listing all of them if the
    /// loader is strict, and are logged and skipped otherwise.
    pub fn load(&self, theme: &Theme) -> ThemeResult<UIDefaults> {
        log::debug!("Loading theme '{}'", theme.name());

        let mut bag = self.load_properties(theme);
        let mut defaults = self.base_defaults.clone().unwrap_or_default();
        defaults.set_scale_factor(self.scale_factor);

        let base_keys: Vec<String> = defaults.keys().into_iter().map(String::from).collect();
        apply_globals(&mut bag, &base_keys)?;

        let mut variables = IndexMap::new();
        let mut errors = Vec::new();
        {
            let resolver = Resolver::new(&bag);
            let parser = ValueParser::new(resolver, Arc::clone(&self.registry))
                .with_system_colors(self.system_colors.clone());

            for (key, raw) in bag.iter() {
                if key.starts_with(VARIABLE_PREFIX) {
                    variables.insert(key.to_string(), raw.to_string());
                    continue;
                }

                let value = resolver.resolve_key(key, raw)?;
                match parser.parse(key, &value) {
                    Ok(entry) => defaults.put_entry(key, entry),
                    Err(e) if e.is_reference_error() => return Err(e),
                    Err(e) if self.strict => errors.push(e),
                    Err(e) => log::error!("{}", e),
                }
            }
        }

        if !errors.is_empty() {
            return Err(ThemeError::Malformed {
                theme: theme.name().to_string(),
                errors,
            });
        }

        defaults.set_variables(variables);

        for addon in self.sorted_addons() {
            addon.after_defaults_loading(&mut defaults);
        }

        log::info!("Loaded theme '{}' with {} keys", theme.name(), defaults.len());
        Ok(defaults)
    }
}

fn load_text(bag: &mut PropertyBag, text: &str, filter: &KeyPrefixFilter, origin: &str) {
    match bag.load(text, filter) {
        Ok(count) => log::trace!("Loaded {} properties from {}", count, origin),
        Err(e) => log::warn!("Skipping malformed properties from {}: {}", origin, e),
    }
}

/// Remove `*.suffix` globals from `bag` and apply them.
///
/// A global overrides every bag key and every key in `base_keys` whose last
/// dot segment is `suffix`. A bag key keeps its own value unless that value is
/// a bare variable reference such as `@background`. Variables are never
/// overridden.
///
/// Returns the resolved globals by suffix.
pub fn apply_globals(bag: &mut PropertyBag, base_keys: &[String]) -> ThemeResult<IndexMap<String, String>> {
    let raw_globals: Vec<(String, String)> = bag
        .iter()
        .filter(|(key, _)| key.starts_with(GLOBAL_PREFIX))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    if raw_globals.is_empty() {
        return Ok(IndexMap::new());
    }

    bag.retain(|key, _| !key.starts_with(GLOBAL_PREFIX));

    let mut globals = IndexMap::new();
    {
        let resolver = Resolver::new(&*bag);
        for (key, value) in &raw_globals {
            let resolved = resolver.resolve_key(key, value)?;
            globals.insert(key[GLOBAL_PREFIX.len()..].to_string(), resolved);
        }
    }

    let global_for = |key: &str| -> Option<&String> {
        let (_, suffix) = key.rsplit_once('.')?;
        globals.get(suffix)
    };

    let mut overrides = Vec::new();
    for (key, value) in bag.iter() {
        if key.starts_with(VARIABLE_PREFIX) || !is_variable_reference(value) {
            continue;
        }
        if let Some(global) = global_for(key) {
            overrides.push((key.to_string(), global.clone()));
        }
    }
    for key in base_keys {
        if bag.contains_key(key) {
            continue;
        }
        if let Some(global) = global_for(key) {
            overrides.push((key.clone(), global.clone()));
        }
    }

    log::debug!("Applying {} globals to {} keys", globals.len(), overrides.len());
    bag.extend(overrides);

    Ok(globals)
}

impl fmt::Debug for DefaultsLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultsLoader")
            .field("addons", &self.addons.iter().map(|a| a.name()).collect::<Vec<_>>())
            .field("custom_sources", &self.custom_sources)
            .field("additional_defaults", &self.additional_defaults)
            .field("platform", &self.platform)
            .field("strict", &self.strict)
            .field("scale_factor", &self.scale_factor)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::LevelSource;
    use crate::value::Value;

    fn theme(levels: &[(&str, &str)]) -> Theme {
        Theme::new(
            "test",
            false,
            levels
                .iter()
                .map(|(name, text)| ThemeLevel::new(*name, LevelSource::Text(text.to_string())))
                .collect(),
        )
    }

    #[test]
    fn test_globals_soft_defaults() {
        let mut bag: PropertyBag = [
            ("@base", "#ff0000"),
            ("Button.background", "@base"),
            ("Label.background", "#0000ff"),
            ("*.background", "#00ff00"),
        ]
        .into_iter()
        .collect();

        let globals = apply_globals(&mut bag, &[]).unwrap();
        assert_eq!(globals.get("background").map(String::as_str), Some("#00ff00"));
        assert_eq!(bag.get("Button.background"), Some("#00ff00"));
        assert_eq!(bag.get("Label.background"), Some("#0000ff"));
        assert_eq!(bag.get("@base"), Some("#ff0000"));
        assert!(!bag.contains_key("*.background"));
    }

    #[test]
    fn test_globals_reach_base_keys() {
        let mut bag: PropertyBag = [("@fg", "#111111"), ("*.foreground", "@fg")].into_iter().collect();
        apply_globals(&mut bag, &["Tree.foreground".to_string(), "foreground".to_string()]).unwrap();
        assert_eq!(bag.get("Tree.foreground"), Some("#111111"));
        assert!(!bag.contains_key("foreground"));
    }

    #[test]
    fn test_later_levels_override() {
        let defaults = DefaultsLoader::new()
            .load(&theme(&[("Base", "Foo.bar = 1\nFoo.baz = 1"), ("Child", "Foo.bar = 2")]))
            .unwrap();
        assert_eq!(defaults.get_int("Foo.bar"), Some(2));
        assert_eq!(defaults.get_int("Foo.baz"), Some(1));
    }

    struct StaticAddon {
        name: &'static str,
        priority: i32,
        text: &'static str,
    }

    impl DefaultsAddon for StaticAddon {
        fn name(&self) -> &str {
            self.name
        }

        fn defaults(&self, level: &ThemeLevel) -> io::Result<Option<String>> {
            Ok((level.name() == "Base").then(|| self.text.to_string()))
        }

        fn priority(&self) -> i32 {
            self.priority
        }
    }

    #[test]
    fn test_addons_load_by_priority_within_level() {
        let defaults = DefaultsLoader::new()
            .addon(StaticAddon { name: "late", priority: 20, text: "Foo.bar = late" })
            .addon(StaticAddon { name: "early", priority: 10, text: "Foo.bar = early\nFoo.baz = early" })
            .load(&theme(&[("Base", "Foo.baz = base"), ("Child", "Foo.baz = child")]))
            .unwrap();
        assert_eq!(defaults.get_string("Foo.bar").as_deref(), Some("late"));
        assert_eq!(defaults.get_string("Foo.baz").as_deref(), Some("child"));
    }

    #[test]
    fn test_variables_are_kept_out_of_table() {
        let defaults = DefaultsLoader::new()
            .load(&theme(&[("Base", "@accent = #ff0000\nFoo.background = @accent")]))
            .unwrap();
        assert!(!defaults.contains_key("@accent"));
        assert_eq!(defaults.variables().get("@accent").map(String::as_str), Some("#ff0000"));
        assert_eq!(defaults.get_color("Foo.background"), Some(Color::RED));
    }

    #[test]
    fn test_strict_aggregates_malformed_values() {
        let err = DefaultsLoader::new()
            .load(&theme(&[("Base", "Foo.margin = 1,2\nBar.margin = 1,2,3\nOk.margin = 1,2,3,4")]))
            .unwrap_err();
        match err {
            ThemeError::Malformed { theme, errors } => {
                assert_eq!(theme, "test");
                assert_eq!(errors.len(), 2);
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_lenient_skips_malformed_values() {
        let defaults = DefaultsLoader::new()
            .strict(false)
            .load(&theme(&[("Base", "Foo.margin = 1,2\nOk.margin = 1,2,3,4")]))
            .unwrap();
        assert!(!defaults.contains_key("Foo.margin"));
        assert!(defaults.contains_key("Ok.margin"));
    }

    #[test]
    fn test_unresolved_reference_is_fatal_even_when_lenient() {
        let err = DefaultsLoader::new()
            .strict(false)
            .load(&theme(&[("Base", "Foo.background = @missing")]))
            .unwrap_err();
        assert!(matches!(err, ThemeError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_key_prefixes_follow_theme_mode() {
        let text = "[light]Foo.bar = light\n[dark]Foo.bar = dark\n[win][dark]Foo.baz = 1";
        let light = DefaultsLoader::new().platform(Platform::Linux).load(&theme(&[("Base", text)])).unwrap();
        assert_eq!(light.get_string("Foo.bar").as_deref(), Some("light"));

        let dark_theme = Theme::new("test", true, theme(&[("Base", text)]).levels().to_vec());
        let dark = DefaultsLoader::new().platform(Platform::Windows).load(&dark_theme).unwrap();
        assert_eq!(dark.get_string("Foo.bar").as_deref(), Some("dark"));
        assert_eq!(dark.get_int("Foo.baz"), Some(1));
    }

    #[test]
    fn test_base_defaults_and_additional_defaults() {
        let mut base = UIDefaults::new();
        base.put("Legacy.background", Value::Color(Color::BLACK));
        base.put("Legacy.text", "kept");

        let defaults = DefaultsLoader::new()
            .base_defaults(base)
            .additional_default("*.background", "#ff0000")
            .additional_default("Foo.bar", "3")
            .load(&theme(&[("Base", "Foo.bar = 1")]))
            .unwrap();
        assert_eq!(defaults.get_color("Legacy.background"), Some(Color::RED));
        assert_eq!(defaults.get_string("Legacy.text").as_deref(), Some("kept"));
        assert_eq!(defaults.get_int("Foo.bar"), Some(3));
    }
}
