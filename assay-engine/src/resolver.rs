//! Resolution of `CustomValidation` rules to live constraint instances.

use std::sync::Arc;

use dashmap::DashMap;

use assay_core::{
    AssayError, AssayResult, ConstraintDescriptor, ConstraintInstance, IAsyncConstraint,
    IConstraint, IConstraintFactory, TypeRef,
};

use crate::registry::MetadataRegistry;

/// A descriptor paired with the instance the factory produced for it.
pub struct ResolvedConstraint {
    pub descriptor: ConstraintDescriptor,
    pub instance: ConstraintInstance,
}

/// Looks up constraint descriptors in the registry and obtains
/// implementation instances from the injected factory.
pub struct ConstraintResolver {
    registry: Arc<MetadataRegistry>,
    factory: Arc<dyn IConstraintFactory>,
}

impl ConstraintResolver {
    pub fn new(registry: Arc<MetadataRegistry>, factory: Arc<dyn IConstraintFactory>) -> Self {
        Self { registry, factory }
    }

    /// Resolve an implementation type to a descriptor and a live instance.
    ///
    /// Fails with `ConstraintNotRegistered` when the type was never
    /// registered or the factory cannot produce an instance for it.
    pub fn resolve(&self, implementation: &TypeRef) -> AssayResult<ResolvedConstraint> {
        let descriptor = self.registry.descriptor_for(implementation).ok_or_else(|| {
            AssayError::ConstraintNotRegistered {
                name: implementation.name().to_string(),
            }
        })?;
        let instance = self.factory.get_or_create(implementation).ok_or_else(|| {
            AssayError::ConstraintNotRegistered {
                name: descriptor.name.clone(),
            }
        })?;
        Ok(ResolvedConstraint {
            descriptor,
            instance,
        })
    }
}

/// `IConstraintFactory` backed by instances registered up front.
///
/// Embedding applications with a dependency-injection container supply
/// their own factory; this one covers constraints constructed at startup.
#[derive(Default)]
pub struct StaticConstraintFactory {
    instances: DashMap<TypeRef, ConstraintInstance>,
}

impl StaticConstraintFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_sync(
        &self,
        implementation: impl Into<TypeRef>,
        constraint: Arc<dyn IConstraint>,
    ) {
        self.instances
            .insert(implementation.into(), ConstraintInstance::Sync(constraint));
    }

    pub fn register_async(
        &self,
        implementation: impl Into<TypeRef>,
        constraint: Arc<dyn IAsyncConstraint>,
    ) {
        self.instances
            .insert(implementation.into(), ConstraintInstance::Async(constraint));
    }
}

impl IConstraintFactory for StaticConstraintFactory {
    fn get_or_create(&self, implementation: &TypeRef) -> Option<ConstraintInstance> {
        self.instances.get(implementation).map(|i| i.clone())
    }
}
