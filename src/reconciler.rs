//! Check-then-apply convergence of a single resource
//!
//! The contract: detection true means no side effect at all (the idempotence
//! guarantee); detection false triggers apply followed by a re-detection,
//! and a still-false re-detection is a convergence failure in its own right.

use crate::error::ConvergeError;
use crate::resource::{ConvergenceResult, ResourceDescriptor};

/// Converge one descriptor toward its desired state
pub fn converge(descriptor: &ResourceDescriptor) -> ConvergenceResult {
    match descriptor.detect() {
        Ok(true) => ConvergenceResult::converged(false),
        Ok(false) => apply_and_verify(descriptor),
        Err(e) => ConvergenceResult::failed(false, e),
    }
}

fn apply_and_verify(descriptor: &ResourceDescriptor) -> ConvergenceResult {
    if let Err(e) = descriptor.apply() {
        return ConvergenceResult::failed(
            false,
            ConvergeError::ApplyFailed {
                resource: descriptor.id.clone(),
                reason: e.to_string(),
            },
        );
    }

    // Convergence postcondition: the apply action must have produced the
    // state the predicate looks for.
    match descriptor.detect() {
        Ok(true) => ConvergenceResult::converged(true),
        Ok(false) => ConvergenceResult::failed(
            true,
            ConvergeError::NotConverged {
                resource: descriptor.id.clone(),
            },
        ),
        Err(e) => ConvergenceResult::failed(true, e),
    }
}
