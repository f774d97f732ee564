//! The rule metadata model: one validation check bound to one property of
//! one record type.
//!
//! Rules are built through the per-kind constructors below and appended to
//! a registry; they are immutable from then on. The constructors are the
//! registration front end — static initialization code calls them once per
//! declared check, the engine consumes them on every validation call.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::TypeRef;

/// Closed set of rule categories the engine knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    CustomValidation,
    NestedValidation,
    Whitelist,
    ConditionalValidation,
    IsDefined,
    Equals,
    NotEquals,
    IsEmpty,
    IsNotEmpty,
    IsIn,
    IsNotIn,
    IsBoolean,
    IsDate,
    IsNumber,
    IsInt,
    IsString,
    IsDateString,
    IsArray,
    IsEnum,
}

impl RuleKind {
    /// Canonical name, used as the key in a failed-constraints map.
    ///
    /// `CustomValidation` rules are reported under the registered name of
    /// their constraint instead; this name is only a fallback for them.
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::CustomValidation => "custom_validation",
            RuleKind::NestedValidation => "nested_validation",
            RuleKind::Whitelist => "whitelist",
            RuleKind::ConditionalValidation => "conditional_validation",
            RuleKind::IsDefined => "is_defined",
            RuleKind::Equals => "equals",
            RuleKind::NotEquals => "not_equals",
            RuleKind::IsEmpty => "is_empty",
            RuleKind::IsNotEmpty => "is_not_empty",
            RuleKind::IsIn => "is_in",
            RuleKind::IsNotIn => "is_not_in",
            RuleKind::IsBoolean => "is_boolean",
            RuleKind::IsDate => "is_date",
            RuleKind::IsNumber => "is_number",
            RuleKind::IsInt => "is_int",
            RuleKind::IsString => "is_string",
            RuleKind::IsDateString => "is_date_string",
            RuleKind::IsArray => "is_array",
            RuleKind::IsEnum => "is_enum",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Predicate guarding sibling rules: `(instance, property value) -> bool`.
pub type ConditionFn = dyn Fn(&Value, Option<&Value>) -> bool + Send + Sync;

/// Acceptance options for `IsNumber`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberOptions {
    pub allow_nan: bool,
    pub allow_infinity: bool,
    /// Maximum digits after the decimal point.
    pub max_decimal_places: Option<u32>,
}

/// Parameters attached to a rule, shaped by its [`RuleKind`].
///
/// The variant must match the kind. The engine rejects a mismatch with a
/// `MalformedRule` fault instead of guessing — a wrong variant is a
/// registration-time bug, not bad input data.
#[derive(Clone)]
pub enum ConstraintParams {
    /// Kinds that take no parameters.
    None,
    /// A single comparison value (`Equals`, `NotEquals`).
    Comparison(Value),
    /// A set of allowed or forbidden values (`IsIn`, `IsNotIn`, `IsEnum`).
    ValueSet(Vec<Value>),
    /// Numeric acceptance options (`IsNumber`).
    Number(NumberOptions),
    /// Predicate guarding every other rule on the property
    /// (`ConditionalValidation`).
    Condition(Arc<ConditionFn>),
    /// Record type to descend into (`NestedValidation`).
    Nested(TypeRef),
    /// Custom constraint implementation plus its declared arguments
    /// (`CustomValidation`).
    Custom {
        implementation: TypeRef,
        arguments: Vec<Value>,
    },
}

impl ConstraintParams {
    /// Parameter values exposed to message templates as `$constraint1..N`.
    pub fn template_values(&self) -> Vec<Value> {
        match self {
            ConstraintParams::Comparison(v) => vec![v.clone()],
            ConstraintParams::ValueSet(vs) => vs.clone(),
            ConstraintParams::Custom { arguments, .. } => arguments.clone(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for ConstraintParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintParams::None => f.write_str("None"),
            ConstraintParams::Comparison(v) => f.debug_tuple("Comparison").field(v).finish(),
            ConstraintParams::ValueSet(vs) => f.debug_tuple("ValueSet").field(vs).finish(),
            ConstraintParams::Number(o) => f.debug_tuple("Number").field(o).finish(),
            ConstraintParams::Condition(_) => f.write_str("Condition(..)"),
            ConstraintParams::Nested(t) => f.debug_tuple("Nested").field(t).finish(),
            ConstraintParams::Custom {
                implementation,
                arguments,
            } => f
                .debug_struct("Custom")
                .field("implementation", implementation)
                .field("arguments", arguments)
                .finish(),
        }
    }
}

/// Declaration-site options shared by every rule kind.
#[derive(Debug, Clone, Default)]
pub struct RuleOptions {
    /// Message template overriding the constraint's default message.
    /// Supports `$property`, `$value`, `$target` and `$constraint1`..`$constraintN`.
    pub message: Option<String>,
    /// Groups this rule participates in. Empty means the rule runs on every
    /// call that does not restrict groups.
    pub groups: Vec<String>,
    /// Run regardless of the groups requested by the call.
    pub always: bool,
    /// Apply the check to each element of a sequence-valued property.
    pub each: bool,
    /// Opaque payload copied into errors produced by this rule.
    pub context: Option<Value>,
}

/// One validation rule bound to one property of one record type.
///
/// Immutable once registered: the registry only appends, never mutates.
/// `target` is the declaring type — subtypes inherit the rule through the
/// registry's supertype links.
#[derive(Debug, Clone)]
pub struct Rule {
    kind: RuleKind,
    target: TypeRef,
    property: String,
    params: ConstraintParams,
    options: RuleOptions,
}

impl Rule {
    pub fn new(
        kind: RuleKind,
        target: impl Into<TypeRef>,
        property: impl Into<String>,
        params: ConstraintParams,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
            property: property.into(),
            params,
            options: RuleOptions::default(),
        }
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn target(&self) -> &TypeRef {
        &self.target
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn params(&self) -> &ConstraintParams {
        &self.params
    }

    pub fn options(&self) -> &RuleOptions {
        &self.options
    }

    // ── Option setters ──

    pub fn with_options(mut self, options: RuleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.options.message = Some(message.into());
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn always(mut self) -> Self {
        self.options.always = true;
        self
    }

    pub fn each(mut self) -> Self {
        self.options.each = true;
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.options.context = Some(context);
        self
    }

    // ── Per-kind constructors (the registration front end) ──

    pub fn is_defined(target: impl Into<TypeRef>, property: impl Into<String>) -> Self {
        Self::new(RuleKind::IsDefined, target, property, ConstraintParams::None)
    }

    pub fn equals(
        target: impl Into<TypeRef>,
        property: impl Into<String>,
        comparison: Value,
    ) -> Self {
        Self::new(
            RuleKind::Equals,
            target,
            property,
            ConstraintParams::Comparison(comparison),
        )
    }

    pub fn not_equals(
        target: impl Into<TypeRef>,
        property: impl Into<String>,
        comparison: Value,
    ) -> Self {
        Self::new(
            RuleKind::NotEquals,
            target,
            property,
            ConstraintParams::Comparison(comparison),
        )
    }

    pub fn is_empty(target: impl Into<TypeRef>, property: impl Into<String>) -> Self {
        Self::new(RuleKind::IsEmpty, target, property, ConstraintParams::None)
    }

    pub fn is_not_empty(target: impl Into<TypeRef>, property: impl Into<String>) -> Self {
        Self::new(RuleKind::IsNotEmpty, target, property, ConstraintParams::None)
    }

    pub fn is_in(
        target: impl Into<TypeRef>,
        property: impl Into<String>,
        values: Vec<Value>,
    ) -> Self {
        Self::new(
            RuleKind::IsIn,
            target,
            property,
            ConstraintParams::ValueSet(values),
        )
    }

    pub fn is_not_in(
        target: impl Into<TypeRef>,
        property: impl Into<String>,
        values: Vec<Value>,
    ) -> Self {
        Self::new(
            RuleKind::IsNotIn,
            target,
            property,
            ConstraintParams::ValueSet(values),
        )
    }

    pub fn is_boolean(target: impl Into<TypeRef>, property: impl Into<String>) -> Self {
        Self::new(RuleKind::IsBoolean, target, property, ConstraintParams::None)
    }

    pub fn is_date(target: impl Into<TypeRef>, property: impl Into<String>) -> Self {
        Self::new(RuleKind::IsDate, target, property, ConstraintParams::None)
    }

    pub fn is_number(
        target: impl Into<TypeRef>,
        property: impl Into<String>,
        options: NumberOptions,
    ) -> Self {
        Self::new(
            RuleKind::IsNumber,
            target,
            property,
            ConstraintParams::Number(options),
        )
    }

    pub fn is_int(target: impl Into<TypeRef>, property: impl Into<String>) -> Self {
        Self::new(RuleKind::IsInt, target, property, ConstraintParams::None)
    }

    pub fn is_string(target: impl Into<TypeRef>, property: impl Into<String>) -> Self {
        Self::new(RuleKind::IsString, target, property, ConstraintParams::None)
    }

    pub fn is_date_string(target: impl Into<TypeRef>, property: impl Into<String>) -> Self {
        Self::new(
            RuleKind::IsDateString,
            target,
            property,
            ConstraintParams::None,
        )
    }

    pub fn is_array(target: impl Into<TypeRef>, property: impl Into<String>) -> Self {
        Self::new(RuleKind::IsArray, target, property, ConstraintParams::None)
    }

    pub fn is_enum(
        target: impl Into<TypeRef>,
        property: impl Into<String>,
        allowed: Vec<Value>,
    ) -> Self {
        Self::new(
            RuleKind::IsEnum,
            target,
            property,
            ConstraintParams::ValueSet(allowed),
        )
    }

    /// Descend into the property's value, validating it as `child` records.
    /// Combine with [`Rule::each`] to validate every element of a sequence.
    pub fn nested(
        target: impl Into<TypeRef>,
        property: impl Into<String>,
        child: impl Into<TypeRef>,
    ) -> Self {
        Self::new(
            RuleKind::NestedValidation,
            target,
            property,
            ConstraintParams::Nested(child.into()),
        )
    }

    /// Mark the property as known without attaching any check, so that
    /// whitelist validation does not strip or reject it.
    pub fn allow(target: impl Into<TypeRef>, property: impl Into<String>) -> Self {
        Self::new(RuleKind::Whitelist, target, property, ConstraintParams::None)
    }

    /// Guard every other rule on the property behind `condition`. A false
    /// result suppresses the property entirely for that call.
    pub fn when(
        target: impl Into<TypeRef>,
        property: impl Into<String>,
        condition: impl Fn(&Value, Option<&Value>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(
            RuleKind::ConditionalValidation,
            target,
            property,
            ConstraintParams::Condition(Arc::new(condition)),
        )
    }

    /// Conditional rule whose predicate is "property present and non-null":
    /// sibling rules only run when the property is actually set.
    pub fn optional(target: impl Into<TypeRef>, property: impl Into<String>) -> Self {
        let property = property.into();
        let key = property.clone();
        Self::new(
            RuleKind::ConditionalValidation,
            target,
            property,
            ConstraintParams::Condition(Arc::new(move |instance: &Value, _value| {
                !matches!(instance.get(&key), None | Some(Value::Null))
            })),
        )
    }

    /// Delegate to a registered custom constraint implementation.
    pub fn custom(
        target: impl Into<TypeRef>,
        property: impl Into<String>,
        implementation: impl Into<TypeRef>,
    ) -> Self {
        Self::custom_with_args(target, property, implementation, Vec::new())
    }

    pub fn custom_with_args(
        target: impl Into<TypeRef>,
        property: impl Into<String>,
        implementation: impl Into<TypeRef>,
        arguments: Vec<Value>,
    ) -> Self {
        Self::new(
            RuleKind::CustomValidation,
            target,
            property,
            ConstraintParams::Custom {
                implementation: implementation.into(),
                arguments,
            },
        )
    }
}
