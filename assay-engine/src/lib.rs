//! # assay-engine
//!
//! Validation execution engine over the `assay-core` metadata model.
//!
//! ## Components
//! 1. **Registry** — process-wide store of rules and constraint
//!    descriptors, keyed by record type with supertype links
//! 2. **Resolver** — turns `CustomValidation` rules into live constraint
//!    instances through an injected factory
//! 3. **Executor** — selects applicable rules per property, runs them
//!    (sync or async), descends into nested records and sequences, and
//!    aggregates a per-property error tree
//!
//! ## Execution guarantees
//! - Error-tree property order follows rule declaration order, never the
//!   completion order of concurrent checks
//! - Data failures are returned as trees; configuration defects
//!   (unregistered constraints, malformed rules) propagate as faults

pub mod executor;
pub mod registry;
pub mod resolver;

mod message;
mod predicates;

pub use executor::{ValidationOutcome, Validator};
pub use registry::MetadataRegistry;
pub use resolver::{ConstraintResolver, ResolvedConstraint, StaticConstraintFactory};
