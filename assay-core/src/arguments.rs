//! Context handed to constraint implementations.

use serde_json::Value;

use crate::types::TypeRef;

/// Everything a constraint implementation may inspect besides the value
/// under test.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintArguments<'a> {
    /// Property value being validated. `None` when the property is absent
    /// from the instance.
    pub value: Option<&'a Value>,
    /// Arguments the rule was declared with.
    pub constraints: &'a [Value],
    /// The whole instance the property belongs to.
    pub object: &'a Value,
    /// Declared record type of the instance.
    pub target: &'a TypeRef,
    /// Name of the property under validation.
    pub property: &'a str,
}
