//! # Properties Files
//!
//! Reader for the `.properties` text format used by theme files, plus the
//! [PropertyBag] the cascade loader merges all sources into.
//!
//! Supported syntax:
//!
//! - `#` and `!` comment lines
//! - `key=value`, `key:value` and `key value` separators
//! - backslash continuation lines (leading whitespace of the next line is dropped)
//! - `\uXXXX`, `\t`, `\n`, `\r` and `\f` escapes; any other escaped character
//!   stands for itself, so `\=` and `\:` can be used in keys
//!
//! Keys may start with one or more bracketed prefixes (`[dark]`, `[mac]`, ...).
//! The [KeyPrefixFilter] strips enabled prefixes and drops keys whose prefix is
//! disabled while a source is loaded.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Prefix of keys that are kept verbatim and stored as strings.
pub const STYLE_PREFIX: &str = "[style]";

/// Parse properties text into key/value pairs in file order.
///
/// Duplicate keys are all returned; the caller decides which one wins.
pub fn parse(text: &str) -> Result<Vec<(String, String)>, ParseError> {
    let mut pairs = Vec::new();

    for line in logical_lines(text) {
        let (raw_key, raw_value) = split_key_value(&line);
        let key = unescape(raw_key)?;
        let value = unescape(raw_value)?;
        pairs.push((key, value));
    }

    Ok(pairs)
}

/// Format key/value pairs as properties text that [parse] reads back unchanged.
pub fn to_text<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut text = String::new();
    for (key, value) in pairs {
        escape_into(&mut text, key.as_ref(), true);
        text.push_str(" = ");
        escape_into(&mut text, value.as_ref(), false);
        text.push('\n');
    }
    text
}

fn escape_into(out: &mut String, raw: &str, key: bool) {
    for (i, c) in raw.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0c' => out.push_str("\\f"),
            ' ' if key || i == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' if key => {
                out.push('\\');
                out.push(c);
            },
            _ => out.push(c),
        }
    }
}

/// Join continuation lines and drop blank and comment lines.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut continued = false;

    for physical in text.lines() {
        let trimmed = physical.trim_start_matches([' ', '\t', '\x0c']);

        if !continued
            && (trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!'))
        {
            continue;
        }

        // an odd number of trailing backslashes continues the line
        let backslashes = trimmed.chars().rev().take_while(|&c| c == '\\').count();
        if backslashes % 2 == 1 {
            current.push_str(&trimmed[..trimmed.len() - 1]);
            continued = true;
        } else {
            current.push_str(trimmed);
            lines.push(std::mem::take(&mut current));
            continued = false;
        }
    }

    if continued {
        lines.push(current);
    }

    lines
}

fn split_key_value(line: &str) -> (&str, &str) {
    let bytes = line.as_bytes();
    let mut key_end = line.len();
    let mut escaped = false;

    for (i, &c) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            b'\\' => escaped = true,
            b'=' | b':' | b' ' | b'\t' | b'\x0c' => {
                key_end = i;
                break;
            },
            _ => {},
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches([' ', '\t', '\x0c']);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches([' ', '\t', '\x0c']);
    }

    (key, rest)
}

fn unescape(raw: &str) -> Result<String, ParseError> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = (hex.len() == 4)
                    .then(|| u32::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .and_then(char::from_u32)
                    .ok_or_else(|| ParseError::new(format!("malformed \\uXXXX escape '\\u{}'", hex)))?;
                out.push(code);
            },
            Some(other) => out.push(other),
            None => {},
        }
    }

    Ok(out)
}

/// Operating system family used for `[win]`, `[mac]` and `[linux]` key prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Windows, enables `[win]`.
    Windows,
    /// macOS, enables `[mac]`.
    MacOs,
    /// Linux, enables `[linux]`.
    Linux,
    /// Anything else, enables no platform prefix.
    Other,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }

    /// The key prefix enabled by this platform.
    pub fn key_prefix(&self) -> Option<&'static str> {
        match self {
            Self::Windows => Some("[win]"),
            Self::MacOs => Some("[mac]"),
            Self::Linux => Some("[linux]"),
            Self::Other => None,
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

/// Strips enabled key prefixes and rejects keys with disabled ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPrefixFilter {
    dark: bool,
    platform: Platform,
}

impl KeyPrefixFilter {
    /// Create a filter for a light or dark theme on the given platform.
    pub fn new(dark: bool, platform: Platform) -> Self {
        Self { dark, platform }
    }

    fn is_enabled(&self, prefix: &str) -> bool {
        let mode = if self.dark { "[dark]" } else { "[light]" };
        prefix == mode || self.platform.key_prefix() == Some(prefix)
    }

    /// Apply the filter to a key.
    ///
    /// Returns the key without its enabled prefixes, or `None` if the key must
    /// be ignored. `[style]` and everything after it is kept as is.
    pub fn apply(&self, key: &str) -> Option<String> {
        let mut key = key;

        while key.starts_with('[') {
            let close = key.find(']')?;
            let prefix = &key[..=close];

            if prefix == STYLE_PREFIX {
                break;
            }
            if !self.is_enabled(prefix) {
                return None;
            }
            key = &key[close + 1..];
        }

        Some(key.to_string())
    }
}

/// Raw, unresolved key/value pairs merged from all sources of a theme chain.
///
/// Later inserts overwrite earlier values for the same key but keep the key's
/// original position, so iteration order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBag {
    entries: IndexMap<String, String>,
}

impl PropertyBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` and merge it into the bag, filtering keys through `filter`.
    ///
    /// Returns the number of entries taken from the text.
    pub fn load(&mut self, text: &str, filter: &KeyPrefixFilter) -> Result<usize, ParseError> {
        let mut count = 0;
        for (key, value) in parse(text)? {
            if let Some(key) = filter.apply(&key) {
                self.entries.insert(key, value);
                count += 1;
            }
        }
        Ok(count)
    }

    /// Get the raw value of a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or overwrite a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key)
    }

    /// Whether the bag contains a key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keep only the entries for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(&str, &str) -> bool) {
        self.entries.retain(|k, v| f(k, v));
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for PropertyBag {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.entries.insert(k.into(), v.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators_and_comments() {
        let text = "\
# comment
! also a comment

a=1
b : 2
c 3
d=
  e = spaced value
";
        let pairs = parse(text).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
                ("d".to_string(), String::new()),
                ("e".to_string(), "spaced value".to_string()),
            ]
        );
    }

    #[test]
    fn test_continuation_lines() {
        let text = "Button.border = 1,2,\\\n    3,4\nnext=x\n";
        let pairs = parse(text).unwrap();
        assert_eq!(pairs[0], ("Button.border".to_string(), "1,2,3,4".to_string()));
        assert_eq!(pairs[1], ("next".to_string(), "x".to_string()));
    }

    #[test]
    fn test_escaped_backslash_does_not_continue() {
        let pairs = parse("path=C:\\\\\nother=1").unwrap();
        assert_eq!(pairs[0].1, "C:\\");
        assert_eq!(pairs[1].0, "other");
    }

    #[test]
    fn test_escapes() {
        let pairs = parse("a\\=b=\\u0041\\tz\nkey\\ with\\ space=\\x").unwrap();
        assert_eq!(pairs[0], ("a=b".to_string(), "A\tz".to_string()));
        assert_eq!(pairs[1], ("key with space".to_string(), "x".to_string()));
    }

    #[test]
    fn test_malformed_unicode_escape() {
        assert!(parse("a=\\u12").is_err());
        assert!(parse("a=\\uzzzz").is_err());
    }

    #[test]
    fn test_to_text_reads_back() {
        let pairs = vec![
            ("Foo.bar", "1,2,3,4"),
            ("key with = and :", " leading space"),
            ("#hash", "back\\slash\ttab"),
            ("*.background", "#ffffff"),
        ];
        let text = to_text(pairs.iter().copied());
        let parsed = parse(&text).unwrap();
        let expected: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_key_prefix_filter() {
        let filter = KeyPrefixFilter::new(true, Platform::MacOs);
        assert_eq!(filter.apply("[dark]Button.background").as_deref(), Some("Button.background"));
        assert_eq!(filter.apply("[light]Button.background"), None);
        assert_eq!(filter.apply("[dark][mac]a").as_deref(), Some("a"));
        assert_eq!(filter.apply("[dark][win]a"), None);
        assert_eq!(filter.apply("[unknown]a"), None);
        assert_eq!(filter.apply("[dark"), None);
        assert_eq!(filter.apply("[style]Button.x").as_deref(), Some("[style]Button.x"));
        assert_eq!(filter.apply("[dark][style]Button.x").as_deref(), Some("[style]Button.x"));
        assert_eq!(filter.apply("plain").as_deref(), Some("plain"));
    }

    #[test]
    fn test_later_loads_overwrite() {
        let filter = KeyPrefixFilter::new(false, Platform::Linux);
        let mut bag = PropertyBag::new();
        bag.load("a=1\nb=2", &filter).unwrap();
        bag.load("a=3\n[dark]b=4\n[light]c=5", &filter).unwrap();

        assert_eq!(bag.get("a"), Some("3"));
        assert_eq!(bag.get("b"), Some("2"));
        assert_eq!(bag.get("c"), Some("5"));
        assert_eq!(bag.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
