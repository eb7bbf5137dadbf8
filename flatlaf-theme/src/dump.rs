//! JSON snapshots of resolved tables, for diffing themes and debugging.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::defaults::UIDefaults;
use crate::value::Value;

/// A serializable view of a [UIDefaults] table.
///
/// Lazy entries are evaluated while the snapshot is taken. Keys are sorted.
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    /// Name of the theme the table was loaded from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<&'a str>,
    /// The table's scale factor.
    pub scale_factor: f32,
    /// Raw theme variables.
    pub variables: &'a IndexMap<String, String>,
    /// All values by key.
    pub values: BTreeMap<&'a str, Value>,
}

impl<'a> Snapshot<'a> {
    /// Take a snapshot of `defaults`.
    pub fn new(defaults: &'a UIDefaults, theme: Option<&'a str>) -> Self {
        let values = defaults
            .keys()
            .into_iter()
            .filter_map(|key| defaults.get(key).map(|value| (key, value)))
            .collect();

        Self {
            theme,
            scale_factor: defaults.scale_factor(),
            variables: defaults.variables(),
            values,
        }
    }

    /// Pretty printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Pretty printed JSON of `defaults`.
pub fn to_json(defaults: &UIDefaults, theme: Option<&str>) -> serde_json::Result<String> {
    Snapshot::new(defaults, theme).to_json()
}
