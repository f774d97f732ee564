//! Registry semantics: accumulation order, inheritance, descriptor lookup.

use std::sync::Arc;

use assay_core::{ConstraintDescriptor, Rule, TypeRef};
use assay_engine::MetadataRegistry;

// ─── Rule accumulation ───

#[test]
fn rules_keep_declaration_order_and_duplicates() {
    let registry = MetadataRegistry::new();
    registry.add_rule(Rule::is_string("User", "name"));
    registry.add_rule(Rule::is_not_empty("User", "name"));
    registry.add_rule(Rule::is_string("User", "name"));

    let rules = registry.rules_for(&TypeRef::from_static("User"), false);
    assert_eq!(rules.len(), 3, "append-only, never deduplicated");
    assert_eq!(rules[0].kind().name(), "is_string");
    assert_eq!(rules[1].kind().name(), "is_not_empty");
}

#[test]
fn unknown_type_has_no_rules() {
    let registry = MetadataRegistry::new();
    assert!(registry.rules_for(&TypeRef::from_static("Nobody"), true).is_empty());
    assert!(!registry.has_rules(&TypeRef::from_static("Nobody")));
}

// ─── Inheritance ───

#[test]
fn inherited_rules_come_after_own_rules() {
    let registry = MetadataRegistry::new();
    registry.add_rule(Rule::is_string("Base", "id"));
    registry.set_supertype("Mid", "Base");
    registry.add_rule(Rule::is_string("Mid", "label"));
    registry.set_supertype("Leaf", "Mid");
    registry.add_rule(Rule::is_string("Leaf", "detail"));

    let props: Vec<String> = registry
        .rules_for(&TypeRef::from_static("Leaf"), true)
        .iter()
        .map(|r| r.property().to_string())
        .collect();
    assert_eq!(props, ["detail", "label", "id"], "most-derived-first");

    let own_only = registry.rules_for(&TypeRef::from_static("Leaf"), false);
    assert_eq!(own_only.len(), 1);
}

#[test]
fn supertype_cycles_terminate() {
    let registry = MetadataRegistry::new();
    registry.add_rule(Rule::is_string("A", "a"));
    registry.add_rule(Rule::is_string("B", "b"));
    registry.set_supertype("A", "B");
    registry.set_supertype("B", "A");

    let rules = registry.rules_for(&TypeRef::from_static("A"), true);
    assert_eq!(rules.len(), 2, "each type visited once");
}

// ─── Constraint descriptors ───

#[test]
fn last_registered_descriptor_wins() {
    let registry = MetadataRegistry::new();
    registry.add_constraint_descriptor(ConstraintDescriptor::new(
        "FirstImpl",
        Some("checker".into()),
        false,
    ));
    registry.add_constraint_descriptor(ConstraintDescriptor::new(
        "SecondImpl",
        Some("checker".into()),
        true,
    ));

    let d = registry.descriptor_by_name("checker").unwrap();
    assert_eq!(d.implementation, TypeRef::from_static("SecondImpl"));
    assert!(d.is_async);
}

#[test]
fn descriptor_lookup_by_implementation_type() {
    let registry = MetadataRegistry::new();
    registry.add_constraint_descriptor(ConstraintDescriptor::new("UserExists", None, true));

    let d = registry
        .descriptor_for(&TypeRef::from_static("UserExists"))
        .unwrap();
    assert_eq!(d.name, "user_exists");
    assert!(registry.descriptor_by_name("user_exists").is_some());
    assert!(registry.descriptor_by_name("missing").is_none());
}

// ─── Lifecycle ───

#[test]
fn reset_clears_everything() {
    let registry = MetadataRegistry::new();
    registry.add_rule(Rule::is_string("User", "name"));
    registry.add_constraint_descriptor(ConstraintDescriptor::new("UserExists", None, false));
    registry.set_supertype("Admin", "User");

    registry.reset();
    assert!(registry.rules_for(&TypeRef::from_static("Admin"), true).is_empty());
    assert!(registry.descriptor_by_name("user_exists").is_none());
}

#[test]
fn global_registry_is_a_singleton() {
    let a = MetadataRegistry::global();
    let b = MetadataRegistry::global();
    assert!(Arc::ptr_eq(&a, &b));
}
