//! # UI Defaults
//!
//! The flat key/value table produced by loading a theme. Widget painters query
//! it by key and must tolerate absent keys.
//!
//! Entries are either plain [Value]s or [LazyValue]s. A lazy value runs its
//! thunk the first time the entry is read and caches the result; it is used
//! for objects built by the instance registry, for line borders and for
//! `lazy(...)` references to other keys.
//!
//! ## Usage Examples
//!
//! ```rust
//! use flatlaf_theme::color::Color;
//! use flatlaf_theme::defaults::UIDefaults;
//! use flatlaf_theme::value::{Insets, Value};
//!
//! let mut defaults = UIDefaults::new();
//! defaults.put("Button.background", Color::rgb(0x4b, 0x6e, 0xaf));
//! defaults.put("Button.margin", Insets::new(2, 14, 2, 14));
//!
//! assert_eq!(defaults.get_color("Button.background"), Some(Color::rgb(0x4b, 0x6e, 0xaf)));
//! assert_eq!(defaults.get_insets("Button.margin"), Some(Insets::new(2, 14, 2, 14)));
//! assert_eq!(defaults.get_or("Button.missing", Value::Int(3)), Value::Int(3));
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use crate::color::Color;
use crate::color_functions::DerivedColor;
use crate::value::{Border, Dimension, Font, GrayFilter, Insets, Instance, Value, DEFAULT_FONT_KEY};

/// Longest chain of base fonts followed when deriving a font.
const MAX_FONT_DEPTH: usize = 16;

type Thunk = Box<dyn Fn(&UIDefaults) -> Value + Send + Sync>;

thread_local! {
    static EVALUATING: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// A value computed on first read and cached afterwards.
pub struct LazyValue {
    cell: OnceCell<Value>,
    thunk: Thunk,
}

impl LazyValue {
    /// Create a lazy value from a thunk.
    pub fn new<F>(thunk: F) -> Self
    where
        F: Fn(&UIDefaults) -> Value + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            thunk: Box::new(thunk),
        }
    }

    /// Whether the thunk already ran.
    pub fn is_evaluated(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Evaluate the thunk at most once and return the cached value.
    ///
    /// If the thunk reads (directly or transitively) the entry it belongs to,
    /// the inner read yields [Value::Null] and an error is logged.
    pub fn get(&self, defaults: &UIDefaults) -> Value {
        if let Some(value) = self.cell.get() {
            return value.clone();
        }

        let id = self as *const Self as usize;
        let entered = EVALUATING.with(|set| set.borrow_mut().insert(id));
        if !entered {
            log::error!("Recursive lazy value detected, returning null");
            return Value::Null;
        }

        let _guard = EvaluatingGuard(id);
        // other threads reading the entry meanwhile block until the thunk is done
        self.cell.get_or_init(|| (self.thunk)(defaults)).clone()
    }
}

/// Clears the re-entrancy mark of a lazy value, also when its thunk panics.
struct EvaluatingGuard(usize);

impl Drop for EvaluatingGuard {
    fn drop(&mut self) {
        EVALUATING.with(|set| set.borrow_mut().remove(&self.0));
    }
}

impl fmt::Debug for LazyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("LazyValue").field(value).finish(),
            None => f.write_str("LazyValue(<pending>)"),
        }
    }
}

/// An entry of the table.
#[derive(Debug, Clone)]
pub enum Entry {
    /// A ready value.
    Value(Value),
    /// A value computed on first read.
    Lazy(Arc<LazyValue>),
}

impl Entry {
    /// Create a lazy entry from a thunk.
    pub fn lazy<F>(thunk: F) -> Self
    where
        F: Fn(&UIDefaults) -> Value + Send + Sync + 'static,
    {
        Self::Lazy(Arc::new(LazyValue::new(thunk)))
    }
}

impl From<Value> for Entry {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// The resolved UI defaults of a theme.
#[derive(Clone)]
pub struct UIDefaults {
    entries: HashMap<String, Entry>,
    variables: IndexMap<String, String>,
    scale_factor: f32,
}

impl Default for UIDefaults {
    fn default() -> Self {
        Self::new()
    }
}

impl UIDefaults {
    /// Create an empty table with scale factor 1.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            variables: IndexMap::new(),
            scale_factor: 1.0,
        }
    }

    /// Get a value, evaluating lazy entries.
    ///
    /// Returns `None` for missing keys and for lazy entries that produce null.
    pub fn get(&self, key: &str) -> Option<Value> {
        let value = match self.entries.get(key)? {
            Entry::Value(value) => value.clone(),
            Entry::Lazy(lazy) => lazy.get(self),
        };
        (!value.is_null()).then_some(value)
    }

    /// Get a value or the caller's default.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// The raw entry of a key, without evaluating it.
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Put a value. Putting [Value::Null] removes the key.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.put_entry(key, Entry::Value(value.into()));
    }

    /// Put an entry. A null value removes the key.
    pub fn put_entry(&mut self, key: impl Into<String>, entry: Entry) {
        let key = key.into();
        match entry {
            Entry::Value(Value::Null) => {
                self.entries.remove(&key);
            },
            entry => {
                self.entries.insert(key, entry);
            },
        }
    }

    /// Remove a key.
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.entries.remove(key)
    }

    /// Whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// The theme variables (`@name` to raw value), kept for later consumers
    /// such as per-component style strings.
    pub fn variables(&self) -> &IndexMap<String, String> {
        &self.variables
    }

    /// Replace the theme variables.
    pub fn set_variables(&mut self, variables: IndexMap<String, String>) {
        self.variables = variables;
    }

    /// The factor scaled values are multiplied by.
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// Set the scale factor.
    pub fn set_scale_factor(&mut self, factor: f32) {
        self.scale_factor = factor;
    }

    fn get_plain(&self, key: &str) -> Option<Value> {
        match self.get(key)? {
            Value::Scaled(scaled) => Some(scaled.scale(self.scale_factor)),
            value => Some(value),
        }
    }

    /// A color or the color of a derived color.
    pub fn get_color(&self, key: &str) -> Option<Color> {
        self.get(key)?.as_color()
    }

    /// A derived color, with its function chain.
    pub fn get_derived_color(&self, key: &str) -> Option<DerivedColor> {
        match self.get(key)? {
            Value::DerivedColor(derived) => Some(derived),
            _ => None,
        }
    }

    /// An integer; scaled integers are scaled.
    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.get_plain(key)? {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    /// A float; integers are widened and scaled floats are scaled.
    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.get_plain(key)? {
            Value::Float(v) => Some(v),
            Value::Int(v) => Some(v as f32),
            _ => None,
        }
    }

    /// A boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    /// A character.
    pub fn get_char(&self, key: &str) -> Option<char> {
        match self.get(key)? {
            Value::Char(c) => Some(c),
            _ => None,
        }
    }

    /// A string.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Insets; scaled insets are scaled.
    pub fn get_insets(&self, key: &str) -> Option<Insets> {
        match self.get_plain(key)? {
            Value::Insets(v) => Some(v),
            _ => None,
        }
    }

    /// A dimension; scaled dimensions are scaled.
    pub fn get_dimension(&self, key: &str) -> Option<Dimension> {
        match self.get_plain(key)? {
            Value::Dimension(v) => Some(v),
            _ => None,
        }
    }

    /// A border.
    pub fn get_border(&self, key: &str) -> Option<Border> {
        match self.get(key)? {
            Value::Border(border) => Some(border),
            Value::Instance(instance) => Some(Border::Instance { instance }),
            _ => None,
        }
    }

    /// A registry-built instance.
    pub fn get_instance(&self, key: &str) -> Option<Instance> {
        match self.get(key)? {
            Value::Instance(instance) => Some(instance),
            Value::Border(Border::Instance { instance }) => Some(instance),
            _ => None,
        }
    }

    /// Gray filter parameters.
    pub fn get_gray_filter(&self, key: &str) -> Option<GrayFilter> {
        match self.get(key)? {
            Value::GrayFilter(v) => Some(v),
            _ => None,
        }
    }

    /// A concrete font.
    ///
    /// The font spec stored under `key` is applied to its base font, which is
    /// the font under its `$baseFontKey` or under `defaultFont`. The base of
    /// `defaultFont` itself is [Font::default].
    pub fn get_font(&self, key: &str) -> Option<Font> {
        self.derive_font(key, 0)
    }

    fn derive_font(&self, key: &str, depth: usize) -> Option<Font> {
        let Value::Font(spec) = self.get(key)? else {
            return None;
        };

        let base_key = spec.base_font_key.as_deref().unwrap_or(DEFAULT_FONT_KEY);
        let base = if base_key == key || depth >= MAX_FONT_DEPTH {
            if depth >= MAX_FONT_DEPTH {
                log::error!("Base font chain of '{}' is too deep", key);
            }
            Font::default()
        } else {
            self.derive_font(base_key, depth + 1).unwrap_or_default()
        };

        Some(spec.derive(&base))
    }
}

impl fmt::Debug for UIDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UIDefaults")
            .field("entries", &self.entries.len())
            .field("variables", &self.variables.len())
            .field("scale_factor", &self.scale_factor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FontSize, FontSpec, FontStyle, Scaled};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_put_null_removes() {
        let mut defaults = UIDefaults::new();
        defaults.put("a", 1);
        assert!(defaults.contains_key("a"));
        defaults.put("a", Value::Null);
        assert!(!defaults.contains_key("a"));
        assert_eq!(defaults.get("a"), None);
    }

    #[test]
    fn test_lazy_evaluated_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut defaults = UIDefaults::new();
        defaults.put_entry(
            "lazy",
            Entry::lazy(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Value::Int(42)
            }),
        );

        assert_eq!(defaults.get_int("lazy"), Some(42));
        assert_eq!(defaults.get_int("lazy"), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lazy_evaluated_once_across_threads() {
        use std::sync::Barrier;
        use std::thread;
        use std::time::Duration;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut defaults = UIDefaults::new();
        defaults.put_entry(
            "slow",
            Entry::lazy(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(100));
                Value::Int(7)
            }),
        );

        let defaults = Arc::new(defaults);
        let barrier = Arc::new(Barrier::new(4));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let defaults = Arc::clone(&defaults);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    defaults.get_int("slow")
                })
            })
            .collect();

        for reader in readers {
            assert_eq!(reader.join().unwrap(), Some(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lazy_reads_other_keys() {
        let mut defaults = UIDefaults::new();
        defaults.put("List.background", Color::WHITE);
        defaults.put_entry(
            "Tree.background",
            Entry::lazy(|d| d.get_or("List.background", Value::Null)),
        );
        assert_eq!(defaults.get_color("Tree.background"), Some(Color::WHITE));
    }

    #[test]
    fn test_recursive_lazy_yields_null() {
        let mut defaults = UIDefaults::new();
        defaults.put_entry("a", Entry::lazy(|d| d.get_or("b", Value::Int(1))));
        defaults.put_entry("b", Entry::lazy(|d| d.get_or("a", Value::Int(2))));

        // a -> b -> a (recursive, null) so b falls back to 2
        assert_eq!(defaults.get_int("a"), Some(2));
        assert_eq!(defaults.get_int("b"), Some(2));
    }

    #[test]
    fn test_scaled_getters() {
        let mut defaults = UIDefaults::new();
        defaults.set_scale_factor(2.0);
        defaults.put("a", Value::Scaled(Scaled::Int(3)));
        defaults.put("b", Value::Scaled(Scaled::Float(1.5)));
        defaults.put("c", Value::Scaled(Scaled::Insets(Insets::new(1, 1, 1, 1))));
        defaults.put("d", Value::Int(3));

        assert_eq!(defaults.get_int("a"), Some(6));
        assert_eq!(defaults.get_float("b"), Some(3.0));
        assert_eq!(defaults.get_insets("c"), Some(Insets::new(2, 2, 2, 2)));
        assert_eq!(defaults.get_int("d"), Some(3));
        assert_eq!(defaults.get_float("d"), Some(3.0));
    }

    #[test]
    fn test_font_derivation_chain() {
        let mut defaults = UIDefaults::new();
        defaults.put(DEFAULT_FONT_KEY, Font::new("Inter", FontStyle::empty(), 13.0));
        defaults.put(
            "h1.font",
            FontSpec {
                add_style: FontStyle::BOLD,
                size: FontSize::Scaled(2.0),
                ..FontSpec::default()
            },
        );
        defaults.put(
            "h1.italic.font",
            FontSpec {
                base_font_key: Some("h1.font".to_string()),
                add_style: FontStyle::ITALIC,
                ..FontSpec::default()
            },
        );

        assert_eq!(
            defaults.get_font("h1.font"),
            Some(Font::new("Inter", FontStyle::BOLD, 26.0))
        );
        assert_eq!(
            defaults.get_font("h1.italic.font"),
            Some(Font::new("Inter", FontStyle::BOLD | FontStyle::ITALIC, 26.0))
        );
        assert_eq!(defaults.get_font("missing"), None);
    }

    #[test]
    fn test_typed_getter_mismatch() {
        let mut defaults = UIDefaults::new();
        defaults.put("s", "text");
        assert_eq!(defaults.get_color("s"), None);
        assert_eq!(defaults.get_string("s").as_deref(), Some("text"));
    }
}
