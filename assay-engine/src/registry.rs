//! Process-wide metadata store — concurrent access via DashMap.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use assay_core::{ConstraintDescriptor, Rule, TypeRef};

static GLOBAL: OnceLock<Arc<MetadataRegistry>> = OnceLock::new();

/// Store of validation rules and constraint descriptors.
///
/// The intended lifecycle is write-once-then-read-only: populated during an
/// initialization phase, then read by every validation call. Late
/// registration stays safe — every map is guarded for concurrent access —
/// but a call that already started is not required to observe rules added
/// mid-flight.
#[derive(Default)]
pub struct MetadataRegistry {
    /// Ordered rule lists keyed by declaring type.
    rules: DashMap<TypeRef, Vec<Arc<Rule>>>,
    /// Constraint descriptors by registered name. Insertion overwrites, so
    /// the most recent registration wins.
    descriptors_by_name: DashMap<String, ConstraintDescriptor>,
    /// Constraint descriptors by implementation type.
    descriptors_by_impl: DashMap<TypeRef, ConstraintDescriptor>,
    /// Inheritance links: child type → supertype.
    supertypes: DashMap<TypeRef, TypeRef>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry instance.
    pub fn global() -> Arc<MetadataRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(MetadataRegistry::new())))
    }

    /// Append a rule to its target type's ordered list. Never deduplicates.
    pub fn add_rule(&self, rule: Rule) {
        self.rules
            .entry(rule.target().clone())
            .or_default()
            .push(Arc::new(rule));
    }

    pub fn add_rules(&self, rules: impl IntoIterator<Item = Rule>) {
        for rule in rules {
            self.add_rule(rule);
        }
    }

    /// Register a custom constraint descriptor under its name and its
    /// implementation type. Duplicate names are allowed; the last
    /// registration wins on lookup.
    pub fn add_constraint_descriptor(&self, descriptor: ConstraintDescriptor) {
        self.descriptors_by_name
            .insert(descriptor.name.clone(), descriptor.clone());
        self.descriptors_by_impl
            .insert(descriptor.implementation.clone(), descriptor);
    }

    /// Declare that `child` inherits the rules of `parent`.
    pub fn set_supertype(&self, child: impl Into<TypeRef>, parent: impl Into<TypeRef>) {
        self.supertypes.insert(child.into(), parent.into());
    }

    /// Rules registered for `target`, in declaration order. With
    /// `include_inherited`, supertype rules follow in most-derived-first
    /// order, so subtype rules run before inherited ones. Cycles in the
    /// supertype chain terminate the walk.
    pub fn rules_for(&self, target: &TypeRef, include_inherited: bool) -> Vec<Arc<Rule>> {
        let mut out = Vec::new();
        let mut seen: HashSet<TypeRef> = HashSet::new();
        let mut current = Some(target.clone());
        while let Some(t) = current.take() {
            if !seen.insert(t.clone()) {
                break;
            }
            if let Some(rules) = self.rules.get(&t) {
                out.extend(rules.iter().cloned());
            }
            if !include_inherited {
                break;
            }
            current = self.supertypes.get(&t).map(|p| p.clone());
        }
        out
    }

    /// Most-recently-registered descriptor under `name`.
    pub fn descriptor_by_name(&self, name: &str) -> Option<ConstraintDescriptor> {
        self.descriptors_by_name.get(name).map(|d| d.clone())
    }

    /// Descriptor for an implementation type.
    pub fn descriptor_for(&self, implementation: &TypeRef) -> Option<ConstraintDescriptor> {
        self.descriptors_by_impl.get(implementation).map(|d| d.clone())
    }

    /// True when `target` has at least one registered rule, own or
    /// inherited.
    pub fn has_rules(&self, target: &TypeRef) -> bool {
        !self.rules_for(target, true).is_empty()
    }

    /// Clear everything. Test isolation only; production code registers
    /// once at startup and never tears down.
    pub fn reset(&self) {
        self.rules.clear();
        self.descriptors_by_name.clear();
        self.descriptors_by_impl.clear();
        self.supertypes.clear();
    }
}
