//! Validator — orchestrates rule selection, execution, and aggregation.
//!
//! One validation call runs as a tree of independent subtasks, one per
//! property per recursion level. Subtasks share only the read-only registry
//! and rule set, so concurrent execution needs no locks. The final tree's
//! property order follows rule declaration order, never completion order:
//! concurrent checks are joined, then placed by their original indices.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use assay_core::{
    AssayError, AssayResult, ConstraintArguments, ConstraintInstance, ConstraintParams,
    FaultPolicy, IAsyncConstraint, IConstraint, IConstraintFactory, Rule, RuleKind, TypeRef,
    ValidateOptions, ValidationError,
};

use crate::message::{self, MessageArgs};
use crate::predicates;
use crate::registry::MetadataRegistry;
use crate::resolver::ConstraintResolver;

/// Result of a validation call.
///
/// Validation failures are data, not errors: a call that ran to completion
/// returns `Ok` with whatever the rules found. `sanitized` is a deep copy
/// of the instance with non-whitelisted properties stripped, present iff
/// the call enabled whitelisting.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub errors: Vec<ValidationError>,
    pub sanitized: Option<Value>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The validation execution engine.
pub struct Validator {
    registry: Arc<MetadataRegistry>,
    resolver: ConstraintResolver,
}

impl Validator {
    pub fn new(registry: Arc<MetadataRegistry>, factory: Arc<dyn IConstraintFactory>) -> Self {
        let resolver = ConstraintResolver::new(Arc::clone(&registry), factory);
        Self { registry, resolver }
    }

    /// Validator over the process-wide registry.
    pub fn with_global_registry(factory: Arc<dyn IConstraintFactory>) -> Self {
        Self::new(MetadataRegistry::global(), factory)
    }

    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    /// Validate `instance` as a record of type `target`, synchronously.
    ///
    /// Fails with `AsyncConstraintInSyncCall` if any applicable rule
    /// resolves to an async constraint; such rule sets require
    /// [`Validator::validate_async`].
    pub fn validate(
        &self,
        target: impl Into<TypeRef>,
        instance: &Value,
        options: &ValidateOptions,
    ) -> AssayResult<ValidationOutcome> {
        let target = target.into();
        debug!(target_type = %target, groups = ?options.groups, "validating instance");
        let (errors, sanitized) = self.run_sync(&target, instance, options)?;
        debug!(target_type = %target, error_count = errors.len(), "validation finished");
        Ok(ValidationOutcome { errors, sanitized })
    }

    /// Validate `instance` as a record of type `target`, awaiting async
    /// constraints. Checks for one property launch together; properties at
    /// one level join before the level above finalizes.
    ///
    /// Cancellation is best-effort: dropping the returned future abandons
    /// in-flight constraint checks without interrupting them, and their
    /// results are discarded.
    pub async fn validate_async(
        &self,
        target: impl Into<TypeRef>,
        instance: &Value,
        options: &ValidateOptions,
    ) -> AssayResult<ValidationOutcome> {
        let target = target.into();
        debug!(target_type = %target, groups = ?options.groups, "validating instance (async)");
        let (errors, sanitized) = self.run_async(&target, instance, options).await?;
        debug!(target_type = %target, error_count = errors.len(), "validation finished");
        Ok(ValidationOutcome { errors, sanitized })
    }

    /// Like [`Validator::validate`], but a non-empty tree becomes an
    /// `AssayError::ValidationFailed` carrying it.
    pub fn validate_or_reject(
        &self,
        target: impl Into<TypeRef>,
        instance: &Value,
        options: &ValidateOptions,
    ) -> AssayResult<ValidationOutcome> {
        reject_on_errors(self.validate(target, instance, options)?)
    }

    /// Like [`Validator::validate_async`], but a non-empty tree becomes an
    /// `AssayError::ValidationFailed` carrying it.
    pub async fn validate_async_or_reject(
        &self,
        target: impl Into<TypeRef>,
        instance: &Value,
        options: &ValidateOptions,
    ) -> AssayResult<ValidationOutcome> {
        reject_on_errors(self.validate_async(target, instance, options).await?)
    }

    // ── Synchronous walk ──

    fn run_sync(
        &self,
        target: &TypeRef,
        instance: &Value,
        options: &ValidateOptions,
    ) -> AssayResult<(Vec<ValidationError>, Option<Value>)> {
        let obj = as_object(instance)?;
        let all_rules = self.registry.rules_for(target, true);
        let plans = build_plans(&all_rules, options);
        let mut errors = Vec::new();
        let mut sanitized = options.whitelist.then(|| obj.clone());
        for plan in &plans {
            let value = obj.get(plan.property);
            if !conditionals_pass(plan, instance, value)? {
                trace!(property = plan.property, "conditional guard suppressed property");
                continue;
            }
            let report = self.check_property_sync(target, instance, plan, value, options)?;
            apply_report(
                &mut errors,
                &mut sanitized,
                plan.property,
                value,
                instance,
                options,
                report,
            );
        }
        apply_whitelist(&all_rules, obj, instance, options, &mut errors, &mut sanitized);
        Ok((errors, sanitized.map(Value::Object)))
    }

    fn check_property_sync(
        &self,
        target: &TypeRef,
        instance: &Value,
        plan: &PropertyPlan<'_>,
        value: Option<&Value>,
        options: &ValidateOptions,
    ) -> AssayResult<PropertyReport> {
        let mut report = PropertyReport::default();
        let missing = is_missing(value);
        for rule in &plan.rules {
            if skip_for_missing(rule, missing, options) {
                continue;
            }
            match rule.kind() {
                RuleKind::Whitelist => {}
                RuleKind::NestedValidation => {
                    self.check_nested_sync(target, instance, rule, value, options, &mut report)?
                }
                RuleKind::CustomValidation => {
                    self.check_custom_sync(target, instance, rule, value, options, &mut report)?
                }
                _ => check_builtin(target, rule, value, &mut report)?,
            }
        }
        Ok(report)
    }

    fn check_custom_sync(
        &self,
        target: &TypeRef,
        instance: &Value,
        rule: &Rule,
        value: Option<&Value>,
        options: &ValidateOptions,
        report: &mut PropertyReport,
    ) -> AssayResult<()> {
        let ConstraintParams::Custom {
            implementation,
            arguments,
        } = rule.params()
        else {
            return Err(predicates::malformed(
                rule,
                "expected custom constraint parameters",
            ));
        };
        let resolved = self.resolver.resolve(implementation)?;
        let constraint = match &resolved.instance {
            ConstraintInstance::Sync(c) if !resolved.descriptor.is_async => Arc::clone(c),
            _ => {
                return Err(AssayError::AsyncConstraintInSyncCall {
                    name: resolved.descriptor.name,
                })
            }
        };
        let args = ConstraintArguments {
            value,
            constraints: arguments,
            object: instance,
            target,
            property: rule.property(),
        };
        match run_custom_sync_check(&*constraint, &args, rule.options().each) {
            Ok(true) => {}
            Ok(false) => {
                let default = constraint.default_message(&args);
                report.push_failure(
                    rule,
                    resolved.descriptor.name.clone(),
                    default,
                    target,
                    value,
                );
            }
            Err(fault) => handle_fault(rule, &resolved.descriptor.name, fault, options, report)?,
        }
        Ok(())
    }

    fn check_nested_sync(
        &self,
        target: &TypeRef,
        instance: &Value,
        rule: &Rule,
        value: Option<&Value>,
        options: &ValidateOptions,
        report: &mut PropertyReport,
    ) -> AssayResult<()> {
        let ConstraintParams::Nested(child_type) = rule.params() else {
            return Err(predicates::malformed(rule, "expected a nested record type"));
        };
        match value {
            // Requiredness is IsDefined's job; nested descent skips holes.
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) if rule.options().each => {
                let mut sanitized_items = options.whitelist.then(Vec::new);
                for (idx, item) in items.iter().enumerate() {
                    if !item.is_object() {
                        report.children.push(non_object_element_node(
                            idx, item, instance, target, rule, options,
                        ));
                        if let Some(v) = sanitized_items.as_mut() {
                            v.push(item.clone());
                        }
                        continue;
                    }
                    let (child_errors, child_san) = self.run_sync(child_type, item, options)?;
                    if !child_errors.is_empty() {
                        report
                            .children
                            .push(element_node(idx, item, instance, options, child_errors));
                    }
                    if let Some(v) = sanitized_items.as_mut() {
                        v.push(child_san.unwrap_or_else(|| item.clone()));
                    }
                }
                if let Some(v) = sanitized_items {
                    report.sanitized_child = Some(Value::Array(v));
                }
            }
            Some(v @ Value::Object(_)) => {
                let (child_errors, child_san) = self.run_sync(child_type, v, options)?;
                report.children.extend(child_errors);
                if let Some(s) = child_san {
                    report.sanitized_child = Some(s);
                }
            }
            Some(_) => {
                report.push_failure(
                    rule,
                    RuleKind::NestedValidation.name().to_string(),
                    None,
                    target,
                    value,
                );
            }
        }
        Ok(())
    }

    // ── Asynchronous walk ──

    fn run_async<'a>(
        &'a self,
        target: &'a TypeRef,
        instance: &'a Value,
        options: &'a ValidateOptions,
    ) -> BoxFuture<'a, AssayResult<(Vec<ValidationError>, Option<Value>)>> {
        async move {
            let obj = as_object(instance)?;
            let all_rules = self.registry.rules_for(target, true);
            let plans = build_plans(&all_rules, options);
            // One subtask per property, joined in declaration order. A
            // fault in any subtask cancels the rest and propagates.
            let property_futures = plans.iter().map(|plan| {
                let value = obj.get(plan.property);
                async move {
                    if !conditionals_pass(plan, instance, value)? {
                        trace!(property = plan.property, "conditional guard suppressed property");
                        return Ok(PropertyReport::default());
                    }
                    self.check_property_async(target, instance, plan, value, options)
                        .await
                }
            });
            let reports = future::try_join_all(property_futures).await?;
            let mut errors = Vec::new();
            let mut sanitized = options.whitelist.then(|| obj.clone());
            for (plan, report) in plans.iter().zip(reports) {
                apply_report(
                    &mut errors,
                    &mut sanitized,
                    plan.property,
                    obj.get(plan.property),
                    instance,
                    options,
                    report,
                );
            }
            apply_whitelist(&all_rules, obj, instance, options, &mut errors, &mut sanitized);
            Ok((errors, sanitized.map(Value::Object)))
        }
        .boxed()
    }

    async fn check_property_async(
        &self,
        target: &TypeRef,
        instance: &Value,
        plan: &PropertyPlan<'_>,
        value: Option<&Value>,
        options: &ValidateOptions,
    ) -> AssayResult<PropertyReport> {
        let missing = is_missing(value);
        let rule_futures = plan
            .rules
            .iter()
            .filter(|rule| !skip_for_missing(rule, missing, options))
            .map(|rule| self.check_rule_async(target, instance, rule, value, options));
        let fragments = future::try_join_all(rule_futures).await?;
        let mut report = PropertyReport::default();
        for fragment in fragments {
            report.merge(fragment);
        }
        Ok(report)
    }

    async fn check_rule_async(
        &self,
        target: &TypeRef,
        instance: &Value,
        rule: &Rule,
        value: Option<&Value>,
        options: &ValidateOptions,
    ) -> AssayResult<PropertyReport> {
        let mut report = PropertyReport::default();
        match rule.kind() {
            RuleKind::Whitelist => {}
            RuleKind::NestedValidation => {
                self.check_nested_async(target, instance, rule, value, options, &mut report)
                    .await?
            }
            RuleKind::CustomValidation => {
                self.check_custom_async(target, instance, rule, value, options, &mut report)
                    .await?
            }
            _ => check_builtin(target, rule, value, &mut report)?,
        }
        Ok(report)
    }

    async fn check_custom_async(
        &self,
        target: &TypeRef,
        instance: &Value,
        rule: &Rule,
        value: Option<&Value>,
        options: &ValidateOptions,
        report: &mut PropertyReport,
    ) -> AssayResult<()> {
        let ConstraintParams::Custom {
            implementation,
            arguments,
        } = rule.params()
        else {
            return Err(predicates::malformed(
                rule,
                "expected custom constraint parameters",
            ));
        };
        let resolved = self.resolver.resolve(implementation)?;
        let args = ConstraintArguments {
            value,
            constraints: arguments,
            object: instance,
            target,
            property: rule.property(),
        };
        let outcome = match &resolved.instance {
            ConstraintInstance::Sync(c) => run_custom_sync_check(&**c, &args, rule.options().each),
            ConstraintInstance::Async(c) => {
                run_custom_async_check(&**c, &args, rule.options().each).await
            }
        };
        match outcome {
            Ok(true) => {}
            Ok(false) => {
                let default = match &resolved.instance {
                    ConstraintInstance::Sync(c) => c.default_message(&args),
                    ConstraintInstance::Async(c) => c.default_message(&args),
                };
                report.push_failure(
                    rule,
                    resolved.descriptor.name.clone(),
                    default,
                    target,
                    value,
                );
            }
            Err(fault) => handle_fault(rule, &resolved.descriptor.name, fault, options, report)?,
        }
        Ok(())
    }

    async fn check_nested_async(
        &self,
        target: &TypeRef,
        instance: &Value,
        rule: &Rule,
        value: Option<&Value>,
        options: &ValidateOptions,
        report: &mut PropertyReport,
    ) -> AssayResult<()> {
        let ConstraintParams::Nested(child_type) = rule.params() else {
            return Err(predicates::malformed(rule, "expected a nested record type"));
        };
        match value {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) if rule.options().each => {
                // Elements validate independently and join before this
                // node finalizes; element order is positional, never
                // completion order.
                let element_futures = items.iter().map(|item| async move {
                    if item.is_object() {
                        self.run_async(child_type, item, options)
                            .await
                            .map(|(errors, sanitized)| Some((errors, sanitized)))
                    } else {
                        Ok(None)
                    }
                });
                let outcomes = future::try_join_all(element_futures).await?;
                let mut sanitized_items = options.whitelist.then(Vec::new);
                for (idx, (item, outcome)) in items.iter().zip(outcomes).enumerate() {
                    match outcome {
                        None => {
                            report.children.push(non_object_element_node(
                                idx, item, instance, target, rule, options,
                            ));
                            if let Some(v) = sanitized_items.as_mut() {
                                v.push(item.clone());
                            }
                        }
                        Some((child_errors, child_san)) => {
                            if !child_errors.is_empty() {
                                report.children.push(element_node(
                                    idx,
                                    item,
                                    instance,
                                    options,
                                    child_errors,
                                ));
                            }
                            if let Some(v) = sanitized_items.as_mut() {
                                v.push(child_san.unwrap_or_else(|| item.clone()));
                            }
                        }
                    }
                }
                if let Some(v) = sanitized_items {
                    report.sanitized_child = Some(Value::Array(v));
                }
            }
            Some(v @ Value::Object(_)) => {
                let (child_errors, child_san) = self.run_async(child_type, v, options).await?;
                report.children.extend(child_errors);
                if let Some(s) = child_san {
                    report.sanitized_child = Some(s);
                }
            }
            Some(_) => {
                report.push_failure(
                    rule,
                    RuleKind::NestedValidation.name().to_string(),
                    None,
                    target,
                    value,
                );
            }
        }
        Ok(())
    }
}

// ── Plans and applicability ──

struct PropertyPlan<'a> {
    property: &'a str,
    conditionals: Vec<&'a Arc<Rule>>,
    rules: Vec<&'a Arc<Rule>>,
}

fn build_plans<'a>(rules: &'a [Arc<Rule>], options: &ValidateOptions) -> Vec<PropertyPlan<'a>> {
    let mut plans: IndexMap<&'a str, PropertyPlan<'a>> = IndexMap::new();
    for rule in rules {
        if !rule_applies(rule, &options.groups) {
            trace!(property = rule.property(), kind = %rule.kind(), "group filter skipped rule");
            continue;
        }
        let plan = plans.entry(rule.property()).or_insert_with(|| PropertyPlan {
            property: rule.property(),
            conditionals: Vec::new(),
            rules: Vec::new(),
        });
        if rule.kind() == RuleKind::ConditionalValidation {
            plan.conditionals.push(rule);
        } else {
            plan.rules.push(rule);
        }
    }
    plans.into_values().collect()
}

fn rule_applies(rule: &Rule, groups: &[String]) -> bool {
    if groups.is_empty() || rule.options().always {
        return true;
    }
    rule.options().groups.iter().any(|g| groups.contains(g))
}

fn conditionals_pass(
    plan: &PropertyPlan<'_>,
    instance: &Value,
    value: Option<&Value>,
) -> AssayResult<bool> {
    for rule in &plan.conditionals {
        let ConstraintParams::Condition(condition) = rule.params() else {
            return Err(predicates::malformed(rule, "expected a condition predicate"));
        };
        if !condition(instance, value) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_missing(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn skip_for_missing(rule: &Rule, missing: bool, options: &ValidateOptions) -> bool {
    options.skip_missing_properties && missing && rule.kind() != RuleKind::IsDefined
}

// ── Per-rule checks shared by both walks ──

struct Failure {
    name: String,
    message: String,
    context: Option<Value>,
}

#[derive(Default)]
struct PropertyReport {
    failures: Vec<Failure>,
    children: Vec<ValidationError>,
    sanitized_child: Option<Value>,
}

impl PropertyReport {
    fn push_failure(
        &mut self,
        rule: &Rule,
        name: String,
        constraint_default: Option<String>,
        target: &TypeRef,
        value: Option<&Value>,
    ) {
        let params = rule.params().template_values();
        let args = MessageArgs {
            property: rule.property(),
            target,
            value,
            constraints: &params,
        };
        let message = message::resolve(rule, constraint_default, &args);
        self.failures.push(Failure {
            name,
            message,
            context: rule.options().context.clone(),
        });
    }

    fn merge(&mut self, other: PropertyReport) {
        self.failures.extend(other.failures);
        self.children.extend(other.children);
        if other.sanitized_child.is_some() {
            self.sanitized_child = other.sanitized_child;
        }
    }
}

fn check_builtin(
    target: &TypeRef,
    rule: &Rule,
    value: Option<&Value>,
    report: &mut PropertyReport,
) -> AssayResult<()> {
    let passed = if rule.options().each {
        match value {
            Some(Value::Array(items)) => {
                let mut ok = true;
                for item in items {
                    if !predicates::evaluate(rule, Some(item))? {
                        ok = false;
                        break;
                    }
                }
                ok
            }
            _ => predicates::evaluate(rule, value)?,
        }
    } else {
        predicates::evaluate(rule, value)?
    };
    if !passed {
        report.push_failure(
            rule,
            rule.kind().name().to_string(),
            None,
            target,
            value,
        );
    }
    Ok(())
}

fn run_custom_sync_check(
    constraint: &dyn IConstraint,
    args: &ConstraintArguments<'_>,
    each: bool,
) -> anyhow::Result<bool> {
    if each {
        if let Some(Value::Array(items)) = args.value {
            for item in items {
                let elem = ConstraintArguments {
                    value: Some(item),
                    ..*args
                };
                if !constraint.validate(&elem)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
    }
    constraint.validate(args)
}

async fn run_custom_async_check(
    constraint: &dyn IAsyncConstraint,
    args: &ConstraintArguments<'_>,
    each: bool,
) -> anyhow::Result<bool> {
    if each {
        if let Some(Value::Array(items)) = args.value {
            for item in items {
                let elem = ConstraintArguments {
                    value: Some(item),
                    ..*args
                };
                if !constraint.validate(&elem).await? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
    }
    constraint.validate(args).await
}

fn handle_fault(
    rule: &Rule,
    name: &str,
    fault: anyhow::Error,
    options: &ValidateOptions,
    report: &mut PropertyReport,
) -> AssayResult<()> {
    match options.fault_policy {
        FaultPolicy::Propagate => Err(AssayError::ConstraintFaulted {
            name: name.to_string(),
            property: rule.property().to_string(),
            source: fault,
        }),
        FaultPolicy::TreatAsFailure => {
            warn!(
                constraint = name,
                property = rule.property(),
                error = %fault,
                "constraint faulted; recorded as failed constraint"
            );
            report.failures.push(Failure {
                name: name.to_string(),
                message: fault.to_string(),
                context: rule.options().context.clone(),
            });
            Ok(())
        }
    }
}

// ── Node assembly ──

fn apply_report(
    errors: &mut Vec<ValidationError>,
    sanitized: &mut Option<Map<String, Value>>,
    property: &str,
    value: Option<&Value>,
    instance: &Value,
    options: &ValidateOptions,
    report: PropertyReport,
) {
    if !report.failures.is_empty() || !report.children.is_empty() {
        let mut node = ValidationError::new(property);
        node.target = options
            .error_detail
            .include_target
            .then(|| instance.clone());
        if options.error_detail.include_value {
            node.value = value.cloned();
        }
        for failure in report.failures {
            if let Some(ctx) = failure.context {
                node.contexts.insert(failure.name.clone(), ctx);
            }
            node.constraints.insert(failure.name, failure.message);
        }
        node.children = report.children;
        errors.push(node);
    }
    if let (Some(map), Some(child)) = (sanitized.as_mut(), report.sanitized_child) {
        map.insert(property.to_string(), child);
    }
}

fn element_node(
    idx: usize,
    element: &Value,
    parent: &Value,
    options: &ValidateOptions,
    children: Vec<ValidationError>,
) -> ValidationError {
    let mut node = ValidationError::new(idx.to_string());
    node.target = options.error_detail.include_target.then(|| parent.clone());
    node.value = options.error_detail.include_value.then(|| element.clone());
    node.children = children;
    node
}

fn non_object_element_node(
    idx: usize,
    element: &Value,
    parent: &Value,
    target: &TypeRef,
    rule: &Rule,
    options: &ValidateOptions,
) -> ValidationError {
    let mut node = element_node(idx, element, parent, options, Vec::new());
    let params = rule.params().template_values();
    let args = MessageArgs {
        property: rule.property(),
        target,
        value: Some(element),
        constraints: &params,
    };
    node.constraints.insert(
        RuleKind::NestedValidation.name().to_string(),
        message::resolve(rule, None, &args),
    );
    node
}

fn apply_whitelist(
    all_rules: &[Arc<Rule>],
    obj: &Map<String, Value>,
    instance: &Value,
    options: &ValidateOptions,
    errors: &mut Vec<ValidationError>,
    sanitized: &mut Option<Map<String, Value>>,
) {
    if !options.whitelist {
        return;
    }
    let known: HashSet<&str> = all_rules.iter().map(|r| r.property()).collect();
    for (key, value) in obj {
        if known.contains(key.as_str()) {
            continue;
        }
        trace!(property = %key, "stripping non-whitelisted property");
        if options.forbid_non_whitelisted {
            let mut node = ValidationError::new(key.clone());
            node.target = options
                .error_detail
                .include_target
                .then(|| instance.clone());
            node.value = options.error_detail.include_value.then(|| value.clone());
            node.constraints.insert(
                "unknown_property".to_string(),
                message::unknown_property_message(key),
            );
            errors.push(node);
        }
        if let Some(map) = sanitized.as_mut() {
            map.remove(key);
        }
    }
}

fn as_object(instance: &Value) -> AssayResult<&Map<String, Value>> {
    instance.as_object().ok_or_else(|| AssayError::NotAnObject {
        actual: json_kind(instance),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn reject_on_errors(outcome: ValidationOutcome) -> AssayResult<ValidationOutcome> {
    if outcome.is_valid() {
        Ok(outcome)
    } else {
        Err(AssayError::ValidationFailed {
            errors: outcome.errors,
        })
    }
}
