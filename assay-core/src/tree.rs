//! The per-property error tree returned by validation calls.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Validation failures for one property of one instance.
///
/// `children` holds failures from nested records and sequence elements.
/// A node with no failed constraints and no children is never emitted —
/// passing properties produce no noise in the tree. `constraints` preserves
/// rule declaration order regardless of the completion order of concurrent
/// checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationError {
    /// Instance the property belongs to. Omitted when the call disables
    /// target detail.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target: Option<Value>,
    /// Property that failed.
    pub property: String,
    /// Value that failed. Omitted when the call disables value detail or
    /// the property was absent.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<Value>,
    /// Failed constraint name → resolved message.
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub constraints: IndexMap<String, String>,
    /// Errors from nested records or sequence elements.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<ValidationError>,
    /// Context payloads from the failing rules, keyed like `constraints`.
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub contexts: IndexMap<String, Value>,
}

impl ValidationError {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ..Self::default()
        }
    }

    /// True when the node carries no failures and no failing descendants.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty() && self.children.is_empty()
    }

    /// Total number of failed constraints in this node and all descendants.
    pub fn failure_count(&self) -> usize {
        self.constraints.len()
            + self
                .children
                .iter()
                .map(ValidationError::failure_count)
                .sum::<usize>()
    }

    /// Dotted property paths of every failing node, depth-first.
    pub fn failing_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_paths("", &mut paths);
        paths
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        let path = if prefix.is_empty() {
            self.property.clone()
        } else {
            format!("{prefix}.{}", self.property)
        };
        if !self.constraints.is_empty() {
            out.push(path.clone());
        }
        for child in &self.children {
            child.collect_paths(&path, out);
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "property `{}` failed:", self.property)?;
        for (name, message) in &self.constraints {
            write!(f, " {name} ({message});")?;
        }
        if !self.children.is_empty() {
            write!(f, " {} child error(s)", self.children.len())?;
        }
        Ok(())
    }
}
