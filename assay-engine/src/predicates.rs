//! Built-in rule predicates: pure, stateless checks per kind.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use assay_core::{AssayError, AssayResult, ConstraintParams, NumberOptions, Rule, RuleKind};

/// Evaluate a built-in rule kind against a property value.
///
/// `Err` means the rule's parameter variant does not match its kind — a
/// registration-time defect, never a data error.
pub(crate) fn evaluate(rule: &Rule, value: Option<&Value>) -> AssayResult<bool> {
    match rule.kind() {
        RuleKind::IsDefined => {
            no_params(rule)?;
            Ok(is_defined(value))
        }
        RuleKind::Equals => Ok(value == Some(comparison(rule)?)),
        RuleKind::NotEquals => Ok(value != Some(comparison(rule)?)),
        RuleKind::IsEmpty => {
            no_params(rule)?;
            Ok(is_empty(value))
        }
        RuleKind::IsNotEmpty => {
            no_params(rule)?;
            Ok(!is_empty(value))
        }
        RuleKind::IsIn => Ok(is_in(value, value_set(rule)?)),
        RuleKind::IsNotIn => Ok(!is_in(value, value_set(rule)?)),
        RuleKind::IsBoolean => {
            no_params(rule)?;
            Ok(matches!(value, Some(Value::Bool(_))))
        }
        RuleKind::IsDate => {
            no_params(rule)?;
            Ok(is_date(value))
        }
        RuleKind::IsNumber => Ok(is_number(value, number_options(rule)?)),
        RuleKind::IsInt => {
            no_params(rule)?;
            Ok(is_int(value))
        }
        RuleKind::IsString => {
            no_params(rule)?;
            Ok(matches!(value, Some(Value::String(_))))
        }
        RuleKind::IsDateString => {
            no_params(rule)?;
            Ok(is_date_string(value))
        }
        RuleKind::IsArray => {
            no_params(rule)?;
            Ok(matches!(value, Some(Value::Array(_))))
        }
        RuleKind::IsEnum => Ok(is_in(value, value_set(rule)?)),
        other => Err(malformed(
            rule,
            format!("`{other}` is not a built-in predicate kind"),
        )),
    }
}

pub(crate) fn malformed(rule: &Rule, reason: impl Into<String>) -> AssayError {
    AssayError::MalformedRule {
        kind: rule.kind().name(),
        target: rule.target().to_string(),
        property: rule.property().to_string(),
        reason: reason.into(),
    }
}

fn no_params(rule: &Rule) -> AssayResult<()> {
    match rule.params() {
        ConstraintParams::None => Ok(()),
        _ => Err(malformed(rule, "expected no parameters")),
    }
}

fn comparison(rule: &Rule) -> AssayResult<&Value> {
    match rule.params() {
        ConstraintParams::Comparison(v) => Ok(v),
        _ => Err(malformed(rule, "expected a single comparison value")),
    }
}

fn value_set(rule: &Rule) -> AssayResult<&[Value]> {
    match rule.params() {
        ConstraintParams::ValueSet(vs) => Ok(vs),
        _ => Err(malformed(rule, "expected a set of values")),
    }
}

fn number_options(rule: &Rule) -> AssayResult<&NumberOptions> {
    match rule.params() {
        ConstraintParams::Number(o) => Ok(o),
        _ => Err(malformed(rule, "expected number options")),
    }
}

fn is_defined(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

fn is_in(value: Option<&Value>, set: &[Value]) -> bool {
    value.is_some_and(|v| set.contains(v))
}

fn is_number(value: Option<&Value>, options: &NumberOptions) -> bool {
    let Some(Value::Number(n)) = value else {
        return false;
    };
    // JSON numbers are always finite, so allow_nan / allow_infinity never
    // reject here; they exist for declaration parity.
    match options.max_decimal_places {
        Some(max) => decimal_places(n) <= max,
        None => true,
    }
}

fn decimal_places(n: &serde_json::Number) -> u32 {
    if n.is_i64() || n.is_u64() {
        return 0;
    }
    let Some(f) = n.as_f64() else {
        return 0;
    };
    let text = format!("{f}");
    match text.split_once('.') {
        Some((_, frac)) => frac.len() as u32,
        None => 0,
    }
}

fn is_int(value: Option<&Value>) -> bool {
    let Some(Value::Number(n)) = value else {
        return false;
    };
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
}

fn is_date(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if DateTime::parse_from_rfc3339(s).is_ok())
}

fn is_date_string(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => {
            DateTime::parse_from_rfc3339(s).is_ok()
                || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        }
        _ => false,
    }
}
