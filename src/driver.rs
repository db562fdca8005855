//! Provisioning driver: sequence the catalog and report a summary
//!
//! Resources are converged one at a time in catalog order. A fatal
//! descriptor's failure halts the run immediately with a partial summary;
//! non-fatal failures accumulate as warnings and the run continues. A second
//! full run over a converged host performs zero mutating actions.

use serde::Serialize;

use crate::progress::ProgressDisplay;
use crate::reconciler;
use crate::resource::{Criticality, ResourceDescriptor};

/// One non-fatal failure, kept for the summary so nothing is silently lost
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub resource: String,
    pub message: String,
}

/// Outcome of a whole provisioning run
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    /// Resources whose apply action ran
    pub applied: Vec<String>,
    /// Resources already converged (no side effect)
    pub skipped: Vec<String>,
    pub warnings: Vec<Warning>,
    /// Set when a fatal descriptor failed and the run halted
    pub fatal: Option<Warning>,
}

impl Summary {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// Exit-code contract: only a fatal failure makes the run unsuccessful
    pub fn is_success(&self) -> bool {
        self.fatal.is_none()
    }

    pub fn push_warning(&mut self, resource: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Warning {
            resource: resource.into(),
            message: message.into(),
        });
    }
}

/// Converge the catalog in order
pub fn run(resources: &[ResourceDescriptor], with_progress: bool) -> Summary {
    let progress = with_progress.then(|| ProgressDisplay::new(resources.len() as u64));
    let mut summary = Summary::default();

    for descriptor in resources {
        if let Some(ref pb) = progress {
            pb.update_resource(&descriptor.id);
        }

        let result = reconciler::converge(descriptor);
        if result.applied {
            summary.applied.push(descriptor.id.clone());
        } else if result.error.is_none() {
            summary.skipped.push(descriptor.id.clone());
        }

        if let Some(error) = result.error {
            match descriptor.criticality {
                Criticality::Fatal => {
                    summary.fatal = Some(Warning {
                        resource: descriptor.id.clone(),
                        message: error.to_string(),
                    });
                    if let Some(ref pb) = progress {
                        pb.abandon();
                    }
                    return summary;
                }
                Criticality::WarnAndContinue => {
                    summary.push_warning(&descriptor.id, error.to_string());
                }
            }
        }

        if let Some(ref pb) = progress {
            pb.inc();
        }
    }

    if let Some(ref pb) = progress {
        pb.finish();
    }
    summary
}
