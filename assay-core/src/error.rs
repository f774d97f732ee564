//! Configuration-class faults.
//!
//! Data-validation failures are never faults: they come back as
//! [`ValidationError`] trees in a normal return value. Everything in
//! [`AssayError`] indicates a programming or configuration defect the
//! caller can only fix by changing code, and always propagates — even from
//! deep inside nested or async recursion.

use crate::tree::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum AssayError {
    /// A `CustomValidation` rule names an implementation that was never
    /// registered, or the constraint factory cannot produce it.
    #[error("custom constraint `{name}` is not registered")]
    ConstraintNotRegistered { name: String },

    /// A rule's parameter variant does not match its kind's required shape.
    #[error("malformed rule `{kind}` on `{target}.{property}`: {reason}")]
    MalformedRule {
        kind: &'static str,
        target: String,
        property: String,
        reason: String,
    },

    /// A custom constraint's `validate` raised an unexpected fault and the
    /// call's fault policy is to propagate.
    #[error("constraint `{name}` faulted on `{property}`")]
    ConstraintFaulted {
        name: String,
        property: String,
        #[source]
        source: anyhow::Error,
    },

    /// A synchronous `validate` call reached an async custom constraint;
    /// the caller must use `validate_async`.
    #[error("async constraint `{name}` reached through synchronous validate; use validate_async")]
    AsyncConstraintInSyncCall { name: String },

    /// The top-level instance is not a JSON object.
    #[error("validation target must be an object, got {actual}")]
    NotAnObject { actual: &'static str },

    /// Reject-mode carrier: validation ran to completion and found errors.
    #[error("validation failed with {} error(s)", .errors.len())]
    ValidationFailed { errors: Vec<ValidationError> },
}

pub type AssayResult<T> = Result<T, AssayError>;
