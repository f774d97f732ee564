//! Synchronous engine behavior: rule selection, evaluation, whitelisting,
//! nesting, and fault surfacing.

use std::sync::Arc;

use serde_json::{json, Value};

use assay_core::{
    AssayError, ConstraintArguments, ConstraintDescriptor, ConstraintParams, FaultPolicy,
    IConstraint, Rule, RuleKind, ValidateOptions,
};
use assay_engine::{MetadataRegistry, StaticConstraintFactory, Validator};

/// Helper: validator over a fresh registry plus a handle on its factory.
fn harness() -> (Arc<MetadataRegistry>, Arc<StaticConstraintFactory>, Validator) {
    let registry = Arc::new(MetadataRegistry::new());
    let factory = Arc::new(StaticConstraintFactory::new());
    let validator = Validator::new(Arc::clone(&registry), factory.clone());
    (registry, factory, validator)
}

struct MinLength;

impl IConstraint for MinLength {
    fn validate(&self, args: &ConstraintArguments<'_>) -> anyhow::Result<bool> {
        let min = args.constraints.first().and_then(Value::as_u64).unwrap_or(0) as usize;
        Ok(args
            .value
            .and_then(Value::as_str)
            .is_some_and(|s| s.chars().count() >= min))
    }

    fn default_message(&self, _args: &ConstraintArguments<'_>) -> Option<String> {
        Some("$property is too short".to_string())
    }
}

struct AlwaysFaults;

impl IConstraint for AlwaysFaults {
    fn validate(&self, _args: &ConstraintArguments<'_>) -> anyhow::Result<bool> {
        Err(anyhow::anyhow!("backend unavailable"))
    }
}

// ─── Basic evaluation ───

#[test]
fn passing_instance_yields_empty_tree() {
    let (registry, _, validator) = harness();
    registry.add_rules([
        Rule::is_string("User", "name"),
        Rule::is_int("User", "age"),
    ]);

    let outcome = validator
        .validate("User", &json!({"name": "Ada", "age": 36}), &ValidateOptions::new())
        .unwrap();
    assert!(outcome.is_valid());
    assert!(outcome.sanitized.is_none(), "no sanitized copy without whitelist");
}

#[test]
fn failing_rule_produces_exactly_one_entry() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::is_string("User", "name"));

    let outcome = validator
        .validate("User", &json!({"name": 42}), &ValidateOptions::new())
        .unwrap();
    assert_eq!(outcome.errors.len(), 1);
    let node = &outcome.errors[0];
    assert_eq!(node.property, "name");
    assert_eq!(node.constraints.len(), 1);
    assert_eq!(node.constraints["is_string"], "name must be a string");
    assert_eq!(node.value, Some(json!(42)));
}

#[test]
fn empty_rule_set_round_trips_any_instance() {
    let (_, _, validator) = harness();
    let outcome = validator
        .validate("Unknown", &json!({"anything": [1, 2, 3]}), &ValidateOptions::new())
        .unwrap();
    assert!(outcome.is_valid());
}

#[test]
fn top_level_non_object_is_a_fault() {
    let (_, _, validator) = harness();
    let err = validator
        .validate("User", &json!("not an object"), &ValidateOptions::new())
        .unwrap_err();
    assert!(matches!(err, AssayError::NotAnObject { .. }));
}

#[test]
fn is_defined_fails_on_absent_and_null() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::is_defined("User", "email"));

    for instance in [json!({}), json!({"email": null})] {
        let outcome = validator
            .validate("User", &instance, &ValidateOptions::new())
            .unwrap();
        assert_eq!(outcome.errors.len(), 1, "instance: {instance}");
        assert!(outcome.errors[0].constraints.contains_key("is_defined"));
    }
}

#[test]
fn equals_and_not_equals_are_complements() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::equals("Doc", "kind", json!("report")));
    registry.add_rule(Rule::not_equals("Doc", "status", json!("deleted")));

    let outcome = validator
        .validate(
            "Doc",
            &json!({"kind": "report", "status": "active"}),
            &ValidateOptions::new(),
        )
        .unwrap();
    assert!(outcome.is_valid());

    let outcome = validator
        .validate(
            "Doc",
            &json!({"kind": "memo", "status": "deleted"}),
            &ValidateOptions::new(),
        )
        .unwrap();
    assert_eq!(outcome.errors.len(), 2);
}

#[test]
fn each_applies_builtin_to_every_element() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::is_string("Post", "tags").each());

    let outcome = validator
        .validate("Post", &json!({"tags": ["a", "b"]}), &ValidateOptions::new())
        .unwrap();
    assert!(outcome.is_valid());

    let outcome = validator
        .validate("Post", &json!({"tags": ["a", 7]}), &ValidateOptions::new())
        .unwrap();
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(
        outcome.errors[0].constraints["is_string"],
        "each value in tags must be a string"
    );
}

// ─── Groups and conditions ───

#[test]
fn group_restricted_rule_only_runs_for_matching_groups() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::is_string("User", "password").with_groups(["create"]));

    let bad = json!({"password": 123});
    let under_update = validator
        .validate("User", &bad, &ValidateOptions::new().with_groups(["update"]))
        .unwrap();
    assert!(under_update.is_valid(), "rule must be skipped under `update`");

    let under_create = validator
        .validate("User", &bad, &ValidateOptions::new().with_groups(["create"]))
        .unwrap();
    assert_eq!(under_create.errors.len(), 1);

    let ungrouped = validator.validate("User", &bad, &ValidateOptions::new()).unwrap();
    assert_eq!(ungrouped.errors.len(), 1, "unset call groups activate every rule");
}

#[test]
fn always_rule_runs_under_any_group() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::is_defined("User", "id").always());

    let outcome = validator
        .validate("User", &json!({}), &ValidateOptions::new().with_groups(["whatever"]))
        .unwrap();
    assert_eq!(outcome.errors.len(), 1);
}

#[test]
fn false_condition_suppresses_every_sibling_rule() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::when("User", "age", |instance, _value| {
        instance.get("wants_age_checked") == Some(&json!(true))
    }));
    registry.add_rule(Rule::is_int("User", "age"));
    registry.add_rule(Rule::is_defined("User", "age"));

    let outcome = validator
        .validate(
            "User",
            &json!({"wants_age_checked": false, "age": "nine"}),
            &ValidateOptions::new(),
        )
        .unwrap();
    assert!(outcome.is_valid(), "false predicate must short-circuit the property");

    let outcome = validator
        .validate(
            "User",
            &json!({"wants_age_checked": true, "age": "nine"}),
            &ValidateOptions::new(),
        )
        .unwrap();
    assert_eq!(outcome.errors.len(), 1, "true predicate has no effect beyond allowing rules");
}

#[test]
fn optional_guard_skips_absent_property_only() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::optional("User", "nickname"));
    registry.add_rule(Rule::is_string("User", "nickname"));

    let absent = validator
        .validate("User", &json!({}), &ValidateOptions::new())
        .unwrap();
    assert!(absent.is_valid());

    let wrong_type = validator
        .validate("User", &json!({"nickname": 9}), &ValidateOptions::new())
        .unwrap();
    assert_eq!(wrong_type.errors.len(), 1);
}

#[test]
fn skip_missing_properties_exempts_is_defined() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::is_string("User", "bio"));
    registry.add_rule(Rule::is_defined("User", "email"));

    let outcome = validator
        .validate("User", &json!({}), &ValidateOptions::new().skip_missing())
        .unwrap();
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].property, "email");
}

// ─── Whitelisting ───

#[test]
fn whitelist_strips_unknown_properties_from_sanitized_output() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::is_string("User", "name"));

    let outcome = validator
        .validate(
            "User",
            &json!({"name": "Ada", "extra": 1}),
            &ValidateOptions::new().whitelist(),
        )
        .unwrap();
    assert!(outcome.is_valid(), "plain whitelist strips silently");
    let sanitized = outcome.sanitized.expect("whitelist produces sanitized copy");
    assert_eq!(sanitized, json!({"name": "Ada"}));
}

#[test]
fn forbid_non_whitelisted_reports_unknown_property() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::is_string("User", "name"));

    let outcome = validator
        .validate(
            "User",
            &json!({"name": "Ada", "extra": 1}),
            &ValidateOptions::new().forbid_non_whitelisted(),
        )
        .unwrap();
    assert_eq!(outcome.errors.len(), 1);
    let node = &outcome.errors[0];
    assert_eq!(node.property, "extra");
    assert_eq!(
        node.constraints["unknown_property"],
        "property extra should not exist"
    );
    assert_eq!(outcome.sanitized.unwrap(), json!({"name": "Ada"}));
}

#[test]
fn allow_rule_marks_property_as_known() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::is_string("User", "name"));
    registry.add_rule(Rule::allow("User", "metadata"));

    let outcome = validator
        .validate(
            "User",
            &json!({"name": "Ada", "metadata": {"any": "shape"}}),
            &ValidateOptions::new().forbid_non_whitelisted(),
        )
        .unwrap();
    assert!(outcome.is_valid());
    assert_eq!(
        outcome.sanitized.unwrap(),
        json!({"name": "Ada", "metadata": {"any": "shape"}})
    );
}

// ─── Nested descent ───

#[test]
fn nested_object_failures_become_children() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::nested("User", "profile", "Profile"));
    registry.add_rule(Rule::is_int("Profile", "age"));

    let outcome = validator
        .validate(
            "User",
            &json!({"profile": {"age": "nine"}}),
            &ValidateOptions::new(),
        )
        .unwrap();
    assert_eq!(outcome.errors.len(), 1);
    let node = &outcome.errors[0];
    assert_eq!(node.property, "profile");
    assert!(node.constraints.is_empty());
    assert_eq!(node.children.len(), 1);
    assert_eq!(node.children[0].property, "age");
    assert!(node.children[0].constraints.contains_key("is_int"));
}

#[test]
fn nested_each_yields_one_child_per_failing_index() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::nested("Order", "items", "Item").each());
    registry.add_rule(Rule::is_string("Item", "sku"));

    let outcome = validator
        .validate(
            "Order",
            &json!({"items": [{"sku": "a"}, {"sku": 2}, {"sku": "c"}]}),
            &ValidateOptions::new(),
        )
        .unwrap();
    assert_eq!(outcome.errors.len(), 1);
    let node = &outcome.errors[0];
    assert_eq!(node.children.len(), 1, "only the invalid element produces a child");
    assert_eq!(node.children[0].property, "1");
    assert_eq!(node.children[0].children[0].property, "sku");
}

#[test]
fn nested_non_object_value_fails_the_constraint() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::nested("User", "profile", "Profile"));

    let outcome = validator
        .validate("User", &json!({"profile": "oops"}), &ValidateOptions::new())
        .unwrap();
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].constraints.contains_key("nested_validation"));
}

#[test]
fn nested_descent_skips_absent_and_null() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::nested("User", "profile", "Profile"));
    registry.add_rule(Rule::is_int("Profile", "age"));

    for instance in [json!({}), json!({"profile": null})] {
        let outcome = validator
            .validate("User", &instance, &ValidateOptions::new())
            .unwrap();
        assert!(outcome.is_valid(), "instance: {instance}");
    }
}

#[test]
fn whitelist_strips_recursively_through_nested_descent() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::nested("User", "profile", "Profile"));
    registry.add_rule(Rule::is_int("Profile", "age"));

    let outcome = validator
        .validate(
            "User",
            &json!({"profile": {"age": 36, "debug": true}}),
            &ValidateOptions::new().whitelist(),
        )
        .unwrap();
    assert_eq!(outcome.sanitized.unwrap(), json!({"profile": {"age": 36}}));
}

// ─── Inheritance ───

#[test]
fn subtype_inherits_rules_and_runs_its_own_first() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::is_string("User", "name"));
    registry.set_supertype("Admin", "User");
    registry.add_rule(Rule::is_defined("Admin", "clearance"));

    let outcome = validator
        .validate("Admin", &json!({"name": 1}), &ValidateOptions::new())
        .unwrap();
    assert_eq!(outcome.errors.len(), 2);
    // Most-derived-first: the Admin rule's property comes before User's.
    assert_eq!(outcome.errors[0].property, "clearance");
    assert_eq!(outcome.errors[1].property, "name");
}

// ─── Custom constraints ───

#[test]
fn custom_constraint_runs_with_declared_arguments() {
    let (registry, factory, validator) = harness();
    registry.add_constraint_descriptor(ConstraintDescriptor::new("MinLength", None, false));
    factory.register_sync("MinLength", Arc::new(MinLength));
    registry.add_rule(Rule::custom_with_args("User", "name", "MinLength", vec![json!(3)]));

    let outcome = validator
        .validate("User", &json!({"name": "Ada"}), &ValidateOptions::new())
        .unwrap();
    assert!(outcome.is_valid());

    let outcome = validator
        .validate("User", &json!({"name": "Al"}), &ValidateOptions::new())
        .unwrap();
    assert_eq!(outcome.errors.len(), 1);
    // Keyed by the derived registry name; default message from the
    // implementation, substituted.
    assert_eq!(outcome.errors[0].constraints["min_length"], "name is too short");
}

#[test]
fn rule_message_overrides_constraint_default() {
    let (registry, factory, validator) = harness();
    registry.add_constraint_descriptor(ConstraintDescriptor::new("MinLength", None, false));
    factory.register_sync("MinLength", Arc::new(MinLength));
    registry.add_rule(
        Rule::custom_with_args("User", "name", "MinLength", vec![json!(5)])
            .with_message("$property needs at least $constraint1 characters"),
    );

    let outcome = validator
        .validate("User", &json!({"name": "Ada"}), &ValidateOptions::new())
        .unwrap();
    assert_eq!(
        outcome.errors[0].constraints["min_length"],
        "name needs at least 5 characters"
    );
}

#[test]
fn unregistered_constraint_is_a_fault_not_an_empty_tree() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::custom("User", "name", "NeverRegistered"));

    let err = validator
        .validate("User", &json!({"name": "Ada"}), &ValidateOptions::new())
        .unwrap_err();
    assert!(matches!(err, AssayError::ConstraintNotRegistered { name } if name == "NeverRegistered"));
}

#[test]
fn descriptor_without_instance_is_also_unregistered() {
    let (registry, _, validator) = harness();
    registry.add_constraint_descriptor(ConstraintDescriptor::new("MinLength", None, false));
    registry.add_rule(Rule::custom("User", "name", "MinLength"));

    let err = validator
        .validate("User", &json!({"name": "Ada"}), &ValidateOptions::new())
        .unwrap_err();
    assert!(matches!(err, AssayError::ConstraintNotRegistered { name } if name == "min_length"));
}

#[test]
fn faulting_constraint_propagates_by_default() {
    let (registry, factory, validator) = harness();
    registry.add_constraint_descriptor(ConstraintDescriptor::new("AlwaysFaults", None, false));
    factory.register_sync("AlwaysFaults", Arc::new(AlwaysFaults));
    registry.add_rule(Rule::custom("User", "name", "AlwaysFaults"));

    let err = validator
        .validate("User", &json!({"name": "Ada"}), &ValidateOptions::new())
        .unwrap_err();
    assert!(matches!(err, AssayError::ConstraintFaulted { ref name, .. } if name == "always_faults"));
}

#[test]
fn faulting_constraint_can_be_recorded_as_failure() {
    let (registry, factory, validator) = harness();
    registry.add_constraint_descriptor(ConstraintDescriptor::new("AlwaysFaults", None, false));
    factory.register_sync("AlwaysFaults", Arc::new(AlwaysFaults));
    registry.add_rule(Rule::custom("User", "name", "AlwaysFaults"));

    let outcome = validator
        .validate(
            "User",
            &json!({"name": "Ada"}),
            &ValidateOptions::new().with_fault_policy(FaultPolicy::TreatAsFailure),
        )
        .unwrap();
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(
        outcome.errors[0].constraints["always_faults"],
        "backend unavailable"
    );
}

// ─── Faults and error detail ───

#[test]
fn malformed_params_surface_immediately() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::new(
        RuleKind::Equals,
        "User",
        "kind",
        ConstraintParams::None,
    ));

    let err = validator
        .validate("User", &json!({"kind": "x"}), &ValidateOptions::new())
        .unwrap_err();
    assert!(matches!(err, AssayError::MalformedRule { kind: "equals", .. }));
}

#[test]
fn error_detail_flags_control_payload() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::is_string("User", "name"));

    let full = validator
        .validate("User", &json!({"name": 1}), &ValidateOptions::new())
        .unwrap();
    assert!(full.errors[0].target.is_some());
    assert!(full.errors[0].value.is_some());

    let bare = validator
        .validate(
            "User",
            &json!({"name": 1}),
            &ValidateOptions::new().without_target().without_value(),
        )
        .unwrap();
    assert!(bare.errors[0].target.is_none());
    assert!(bare.errors[0].value.is_none());
}

#[test]
fn context_payload_is_copied_into_errors() {
    let (registry, _, validator) = harness();
    registry.add_rule(
        Rule::is_string("User", "name").with_context(json!({"error_code": "E_NAME"})),
    );

    let outcome = validator
        .validate("User", &json!({"name": 1}), &ValidateOptions::new())
        .unwrap();
    assert_eq!(
        outcome.errors[0].contexts["is_string"],
        json!({"error_code": "E_NAME"})
    );
}

#[test]
fn reject_mode_wraps_the_tree() {
    let (registry, _, validator) = harness();
    registry.add_rule(Rule::is_string("User", "name"));

    let err = validator
        .validate_or_reject("User", &json!({"name": 1}), &ValidateOptions::new())
        .unwrap_err();
    let AssayError::ValidationFailed { errors } = err else {
        panic!("expected ValidationFailed");
    };
    assert_eq!(errors.len(), 1);

    let ok = validator
        .validate_or_reject("User", &json!({"name": "Ada"}), &ValidateOptions::new())
        .unwrap();
    assert!(ok.is_valid());
}
