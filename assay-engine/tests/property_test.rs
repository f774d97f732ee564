//! Property tests for predicate complements and the empty-registry round
//! trip.

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::Value;

use assay_core::{Rule, ValidateOptions};
use assay_engine::{MetadataRegistry, StaticConstraintFactory, Validator};

fn validator_with(rules: Vec<Rule>) -> Validator {
    let registry = Arc::new(MetadataRegistry::new());
    registry.add_rules(rules);
    Validator::new(registry, Arc::new(StaticConstraintFactory::new()))
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
    ]
}

proptest! {
    #[test]
    fn is_in_and_is_not_in_are_exact_complements(
        v in scalar(),
        set in prop::collection::vec(scalar(), 0..6),
    ) {
        let validator = validator_with(vec![
            Rule::is_in("T", "inside", set.clone()),
            Rule::is_not_in("T", "outside", set.clone()),
        ]);
        let instance = serde_json::json!({"inside": v.clone(), "outside": v});
        let outcome = validator
            .validate("T", &instance, &ValidateOptions::new())
            .unwrap();

        let in_failed = outcome.errors.iter().any(|e| e.property == "inside");
        let not_in_failed = outcome.errors.iter().any(|e| e.property == "outside");
        prop_assert_ne!(
            in_failed, not_in_failed,
            "exactly one of is_in / is_not_in must fail for any value and set"
        );
    }

    #[test]
    fn equals_and_not_equals_are_exact_complements(a in scalar(), b in scalar()) {
        let validator = validator_with(vec![
            Rule::equals("T", "same", b.clone()),
            Rule::not_equals("T", "diff", b),
        ]);
        let instance = serde_json::json!({"same": a.clone(), "diff": a});
        let outcome = validator
            .validate("T", &instance, &ValidateOptions::new())
            .unwrap();

        let equals_failed = outcome.errors.iter().any(|e| e.property == "same");
        let not_equals_failed = outcome.errors.iter().any(|e| e.property == "diff");
        prop_assert_ne!(equals_failed, not_equals_failed);
    }

    #[test]
    fn zero_registered_rules_accept_any_instance(
        entries in prop::collection::btree_map("[a-z]{1,8}", scalar(), 0..5),
    ) {
        let validator = validator_with(Vec::new());
        let instance = Value::Object(entries.into_iter().collect());
        let outcome = validator
            .validate("T", &instance, &ValidateOptions::new())
            .unwrap();
        prop_assert!(outcome.is_valid());
    }

    #[test]
    fn a_satisfying_value_never_produces_an_entry(s in "[a-z]{0,12}") {
        let validator = validator_with(vec![Rule::is_string("T", "text")]);
        let instance = serde_json::json!({"text": s});
        let outcome = validator
            .validate("T", &instance, &ValidateOptions::new())
            .unwrap();
        prop_assert!(outcome.is_valid());
    }
}
