//! # assay-core
//!
//! Foundation crate for the assay validation engine.
//! Defines the metadata model (rules, constraint descriptors), the
//! constraint traits, per-call options, and the error tree.
//! The execution engine in `assay-engine` depends on this.

pub mod arguments;
pub mod descriptor;
pub mod error;
pub mod options;
pub mod rule;
pub mod traits;
pub mod tree;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use arguments::ConstraintArguments;
pub use descriptor::{derive_constraint_name, ConstraintDescriptor};
pub use error::{AssayError, AssayResult};
pub use options::{ErrorDetail, FaultPolicy, ValidateOptions};
pub use rule::{ConditionFn, ConstraintParams, NumberOptions, Rule, RuleKind, RuleOptions};
pub use traits::{ConstraintInstance, IAsyncConstraint, IConstraint, IConstraintFactory};
pub use tree::ValidationError;
pub use types::TypeRef;
