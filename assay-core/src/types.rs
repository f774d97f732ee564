//! Record type identifiers.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Names a record type in the metadata registry.
///
/// Rules are declared against a `TypeRef` rather than a runtime type:
/// instances are plain JSON objects, so the caller names the type a rule
/// set belongs to and the registry's supertype links supply inheritance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(Cow<'static, str>);

impl TypeRef {
    /// Build a `TypeRef` from a static identifier without allocating.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for TypeRef {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&TypeRef> for TypeRef {
    fn from(t: &TypeRef) -> Self {
        t.clone()
    }
}
