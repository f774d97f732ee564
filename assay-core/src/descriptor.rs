//! Registration records for custom constraint implementations.

use crate::types::TypeRef;

/// Registration record for one custom constraint implementation.
///
/// Names are not required to be unique: registering twice under the same
/// name is allowed and the most recent registration wins on lookup,
/// matching the registry's append-only accumulation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintDescriptor {
    /// Implementation type the constraint factory resolves.
    pub implementation: TypeRef,
    /// Lookup and display name.
    pub name: String,
    /// Whether `validate` suspends; async constraints are only reachable
    /// through `validate_async`.
    pub is_async: bool,
}

impl ConstraintDescriptor {
    /// Build a descriptor. An empty or absent `name` is derived from the
    /// implementation identifier via [`derive_constraint_name`].
    pub fn new(implementation: impl Into<TypeRef>, name: Option<String>, is_async: bool) -> Self {
        let implementation = implementation.into();
        let name = name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| derive_constraint_name(implementation.name()));
        Self {
            implementation,
            name,
            is_async,
        }
    }
}

/// Convert a CamelCase type identifier to its registry name.
///
/// Maximal runs of uppercase letters collapse into one lowercased segment
/// and the leading underscore is stripped: `IsLongerThan` →
/// `is_longer_than`, `HTTPCheck` → `httpcheck`.
pub fn derive_constraint_name(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    let mut chars = ident.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
            while let Some(&next) = chars.peek() {
                if next.is_ascii_uppercase() {
                    out.push(next.to_ascii_lowercase());
                    chars.next();
                } else {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out.strip_prefix('_').map(str::to_string).unwrap_or(out)
}
