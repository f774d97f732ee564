//! Constraint capability traits and the constraint-factory boundary.

use std::sync::Arc;

use async_trait::async_trait;

use crate::arguments::ConstraintArguments;
use crate::types::TypeRef;

/// A synchronous custom constraint implementation.
///
/// `Ok(false)` is a normal validation failure and becomes an entry in the
/// error tree. `Err` is an implementation fault; the caller's fault policy
/// decides whether it propagates or is recorded as a failed constraint.
pub trait IConstraint: Send + Sync {
    fn validate(&self, args: &ConstraintArguments<'_>) -> anyhow::Result<bool>;

    /// Message used when the rule declares none. Supports the same
    /// `$property`-style substitution as rule messages.
    fn default_message(&self, _args: &ConstraintArguments<'_>) -> Option<String> {
        None
    }
}

/// An asynchronous custom constraint implementation.
#[async_trait]
pub trait IAsyncConstraint: Send + Sync {
    async fn validate(&self, args: &ConstraintArguments<'_>) -> anyhow::Result<bool>;

    fn default_message(&self, _args: &ConstraintArguments<'_>) -> Option<String> {
        None
    }
}

/// A resolved constraint implementation, sync or async.
#[derive(Clone)]
pub enum ConstraintInstance {
    Sync(Arc<dyn IConstraint>),
    Async(Arc<dyn IAsyncConstraint>),
}

impl ConstraintInstance {
    pub fn is_async(&self) -> bool {
        matches!(self, ConstraintInstance::Async(_))
    }
}

/// Produces constraint instances for the engine.
///
/// This is the dependency-injection boundary: the engine never constructs
/// implementations itself, so constraints may carry whatever external
/// dependencies the embedding application wires in. Instantiation is
/// synchronous; only `validate` may suspend.
pub trait IConstraintFactory: Send + Sync {
    fn get_or_create(&self, implementation: &TypeRef) -> Option<ConstraintInstance>;
}
