//! Variable and property reference resolution.
//!
//! A raw value is indirect if it starts with one of the reference markers:
//!
//! | Syntax      | Looks up                         |
//! |-------------|----------------------------------|
//! | `@name`     | the variable key `@name`         |
//! | `$key`      | the property `key`               |
//! | `@@key`     | the property `key`               |
//! | `$?key` ... | same, but a missing key is `null`|
//!
//! Resolution follows references until a value that is not itself a reference
//! is reached.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{ThemeError, ThemeResult};
use crate::properties::PropertyBag;

/// Marker of variable keys and variable references.
pub const VARIABLE_PREFIX: &str = "@";
/// Marker of property references.
pub const PROPERTY_PREFIX: &str = "$";
/// Alternative marker of property references.
pub const PROPERTY_PREFIX_ALT: &str = "@@";
/// Marker that makes a reference optional.
pub const OPTIONAL_PREFIX: &str = "?";

/// Something raw values can be looked up in.
pub trait VariableLookup {
    /// The raw value for a key, if present.
    fn lookup(&self, key: &str) -> Option<&str>;
}

impl VariableLookup for PropertyBag {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key)
    }
}

impl VariableLookup for IndexMap<String, String> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl VariableLookup for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// A parsed reference: the key to look up and whether it may be missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The key to look up (`@name` for variables, the plain key for properties).
    pub key: String,
    /// Whether a missing key resolves to `null` instead of failing.
    pub optional: bool,
}

impl Reference {
    /// Parse a trimmed value as reference. Returns `None` for direct values.
    pub fn parse(value: &str) -> Option<Self> {
        let (rest, variable) = if let Some(rest) = value.strip_prefix(PROPERTY_PREFIX_ALT) {
            (rest, false)
        } else if let Some(rest) = value.strip_prefix(PROPERTY_PREFIX) {
            (rest, false)
        } else if let Some(rest) = value.strip_prefix(VARIABLE_PREFIX) {
            (rest, true)
        } else {
            return None;
        };

        let (rest, optional) = match rest.strip_prefix(OPTIONAL_PREFIX) {
            Some(rest) => (rest, true),
            None => (rest, false),
        };

        if rest.is_empty() {
            return None;
        }

        let key = if variable {
            format!("{}{}", VARIABLE_PREFIX, rest)
        } else {
            rest.to_string()
        };

        Some(Self { key, optional })
    }
}

/// Whether a raw value is nothing but a variable reference like `@accentColor`.
pub fn is_variable_reference(value: &str) -> bool {
    matches!(Reference::parse(value.trim()), Some(r) if r.key.starts_with(VARIABLE_PREFIX))
}

/// Resolves references against a lookup source.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    source: &'a dyn VariableLookup,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over a lookup source.
    pub fn new(source: &'a dyn VariableLookup) -> Self {
        Self { source }
    }

    /// Resolve a value that does not belong to a known key.
    pub fn resolve(&self, value: &str) -> ThemeResult<String> {
        self.resolve_chain(value, &mut Vec::new())
    }

    /// Resolve the value of `key`.
    ///
    /// The key starts the reference chain, so a value referencing its own key
    /// is reported as cycle.
    pub fn resolve_key(&self, key: &str, value: &str) -> ThemeResult<String> {
        self.resolve_chain(value, &mut vec![key.to_string()])
    }

    fn resolve_chain(&self, value: &str, chain: &mut Vec<String>) -> ThemeResult<String> {
        let value = value.trim();
        let Some(reference) = Reference::parse(value) else {
            return Ok(value.to_string());
        };

        if chain.contains(&reference.key) {
            chain.push(reference.key);
            return Err(ThemeError::ReferenceCycle {
                chain: std::mem::take(chain),
            });
        }

        match self.source.lookup(&reference.key) {
            Some(next) => {
                chain.push(reference.key);
                self.resolve_chain(next, chain)
            },
            None if reference.optional => Ok("null".to_string()),
            None => Err(ThemeError::UnresolvedReference {
                key: reference.key,
                chain: std::mem::take(chain),
            }),
        }
    }
}
