//! Resource descriptors: the unit of convergence
//!
//! Each descriptor carries a stable id, a side-effect-free detection
//! predicate answering "is the desired state already present?", and an apply
//! action that is only invoked when detection says no. Criticality decides
//! whether a failure aborts the run or becomes a warning.

use serde::Serialize;

use crate::error::{ConvergeError, Result};

/// What kind of host state a descriptor owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    PackageSet,
    FileOverlay,
    Symlink,
    LinePatch,
    TemplatedUnit,
    RemoteDownload,
}

/// Whether a resource's failure aborts the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Criticality {
    Fatal,
    WarnAndContinue,
}

impl Criticality {
    pub fn from_fatal_flag(fatal: bool) -> Self {
        if fatal {
            Criticality::Fatal
        } else {
            Criticality::WarnAndContinue
        }
    }
}

type DetectFn = Box<dyn Fn() -> Result<bool>>;
type ApplyFn = Box<dyn Fn() -> Result<()>>;

/// One convergeable resource
pub struct ResourceDescriptor {
    /// Stable idempotency key, also the name used in logs and the summary
    pub id: String,
    pub kind: ResourceKind,
    pub criticality: Criticality,
    detect: DetectFn,
    apply: ApplyFn,
}

impl ResourceDescriptor {
    pub fn new(
        id: impl Into<String>,
        kind: ResourceKind,
        criticality: Criticality,
        detect: impl Fn() -> Result<bool> + 'static,
        apply: impl Fn() -> Result<()> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            criticality,
            detect: Box::new(detect),
            apply: Box::new(apply),
        }
    }

    /// Evaluate the detection predicate (cheap, side-effect-free)
    pub fn detect(&self) -> Result<bool> {
        (self.detect)()
    }

    /// Run the apply action; callers gate this on a false detection
    pub fn apply(&self) -> Result<()> {
        (self.apply)()
    }
}

impl std::fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("criticality", &self.criticality)
            .finish_non_exhaustive()
    }
}

/// Outcome of converging one descriptor
#[derive(Debug)]
pub struct ConvergenceResult {
    /// Whether the apply action ran
    pub applied: bool,
    pub error: Option<ConvergeError>,
}

impl ConvergenceResult {
    pub fn converged(applied: bool) -> Self {
        Self {
            applied,
            error: None,
        }
    }

    pub fn failed(applied: bool, error: ConvergeError) -> Self {
        Self {
            applied,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criticality_from_flag() {
        assert_eq!(Criticality::from_fatal_flag(true), Criticality::Fatal);
        assert_eq!(
            Criticality::from_fatal_flag(false),
            Criticality::WarnAndContinue
        );
    }

    #[test]
    fn test_descriptor_debug_omits_closures() {
        let descriptor = ResourceDescriptor::new(
            "base-packages",
            ResourceKind::PackageSet,
            Criticality::Fatal,
            || Ok(true),
            || Ok(()),
        );
        let debug = format!("{descriptor:?}");
        assert!(debug.contains("base-packages"));
        assert!(debug.contains("PackageSet"));
    }
}
