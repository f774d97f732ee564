//! Per-call validation options.

/// How a fault raised inside a custom constraint is surfaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Propagate as `AssayError::ConstraintFaulted`, aborting the call.
    #[default]
    Propagate,
    /// Record the fault as a failed constraint on the property and keep
    /// going.
    TreatAsFailure,
}

/// Which instance data is copied into produced errors.
#[derive(Debug, Clone, Copy)]
pub struct ErrorDetail {
    pub include_target: bool,
    pub include_value: bool,
}

impl Default for ErrorDetail {
    fn default() -> Self {
        Self {
            include_target: true,
            include_value: true,
        }
    }
}

/// Options for a single validation call.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Groups to activate. Empty activates every rule whose own group list
    /// is unrestricted; rules marked `always` run regardless.
    pub groups: Vec<String>,
    /// Skip every rule except `IsDefined` on absent or null properties.
    pub skip_missing_properties: bool,
    /// Strip properties with no registered rule from the sanitized value.
    pub whitelist: bool,
    /// Report non-whitelisted properties as errors instead of stripping
    /// them silently. Only meaningful together with `whitelist`.
    pub forbid_non_whitelisted: bool,
    /// Error payload detail.
    pub error_detail: ErrorDetail,
    /// What to do when a custom constraint faults.
    pub fault_policy: FaultPolicy,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn skip_missing(mut self) -> Self {
        self.skip_missing_properties = true;
        self
    }

    pub fn whitelist(mut self) -> Self {
        self.whitelist = true;
        self
    }

    /// Implies `whitelist`.
    pub fn forbid_non_whitelisted(mut self) -> Self {
        self.whitelist = true;
        self.forbid_non_whitelisted = true;
        self
    }

    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    pub fn without_target(mut self) -> Self {
        self.error_detail.include_target = false;
        self
    }

    pub fn without_value(mut self) -> Self {
        self.error_detail.include_value = false;
        self
    }
}
