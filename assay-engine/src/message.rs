//! Failure message resolution and template substitution.
//!
//! Precedence: rule message template → constraint default message →
//! per-kind fallback. Every layer goes through the same substitution over
//! `$property`, `$value`, `$target` and `$constraint1`..`$constraintN`.

use serde_json::Value;

use assay_core::{Rule, RuleKind, TypeRef};

pub(crate) struct MessageArgs<'a> {
    pub property: &'a str,
    pub target: &'a TypeRef,
    pub value: Option<&'a Value>,
    pub constraints: &'a [Value],
}

pub(crate) fn resolve(
    rule: &Rule,
    constraint_default: Option<String>,
    args: &MessageArgs<'_>,
) -> String {
    let template = match (&rule.options().message, constraint_default) {
        (Some(m), _) => m.clone(),
        (None, Some(m)) => m,
        (None, None) => fallback(rule.kind(), rule.options().each),
    };
    substitute(&template, args)
}

/// Generic per-kind fallback, prefixed for `each` rules the same way the
/// rest of the message layer is.
pub(crate) fn fallback(kind: RuleKind, each: bool) -> String {
    let body = match kind {
        RuleKind::IsDefined => "$property must be defined",
        RuleKind::Equals => "$property must be equal to $constraint1",
        RuleKind::NotEquals => "$property should not be equal to $constraint1",
        RuleKind::IsEmpty => "$property must be empty",
        RuleKind::IsNotEmpty => "$property should not be empty",
        RuleKind::IsIn => "$property must be one of the allowed values",
        RuleKind::IsNotIn => "$property should not be one of the restricted values",
        RuleKind::IsBoolean => "$property must be a boolean value",
        RuleKind::IsDate => "$property must be a date",
        RuleKind::IsNumber => "$property must be a number",
        RuleKind::IsInt => "$property must be an integer number",
        RuleKind::IsString => "$property must be a string",
        RuleKind::IsDateString => "$property must be a date string",
        RuleKind::IsArray => "$property must be an array",
        RuleKind::IsEnum => "$property must be a valid enum value",
        RuleKind::NestedValidation => "nested property $property must be an object",
        RuleKind::CustomValidation => "$property failed custom validation",
        RuleKind::Whitelist | RuleKind::ConditionalValidation => "$property is invalid",
    };
    if each {
        format!("each value in {body}")
    } else {
        body.to_string()
    }
}

pub(crate) fn unknown_property_message(property: &str) -> String {
    format!("property {property} should not exist")
}

fn substitute(template: &str, args: &MessageArgs<'_>) -> String {
    let mut out = template.to_string();
    // Highest index first so `$constraint10` is not clobbered by
    // `$constraint1`.
    for (idx, constraint) in args.constraints.iter().enumerate().rev() {
        let token = format!("$constraint{}", idx + 1);
        if out.contains(&token) {
            out = out.replace(&token, &render(constraint));
        }
    }
    if out.contains("$property") {
        out = out.replace("$property", args.property);
    }
    if out.contains("$target") {
        out = out.replace("$target", args.target.name());
    }
    if out.contains("$value") {
        let rendered = args.value.map(render).unwrap_or_default();
        out = out.replace("$value", &rendered);
    }
    out
}

/// Strings render bare; everything else renders as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
