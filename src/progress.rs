//! Progress bar display for the provisioning sequence

use indicatif::{ProgressBar, ProgressStyle};

/// Progress display over the resource catalog
pub struct ProgressDisplay {
    resource_pb: ProgressBar,
}

impl ProgressDisplay {
    /// Create a new progress display with total resource count
    pub fn new(total_resources: u64) -> Self {
        let style = ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let resource_pb = ProgressBar::new(total_resources);
        resource_pb.set_style(style);

        Self { resource_pb }
    }

    /// Update to show the resource currently converging
    pub fn update_resource(&self, resource_id: &str) {
        self.resource_pb.set_message(resource_id.to_string());
    }

    /// Increment resource progress
    pub fn inc(&self) {
        self.resource_pb.inc(1);
    }

    /// Finish normally
    pub fn finish(&self) {
        self.resource_pb.finish_and_clear();
    }

    /// Abandon on fatal error
    pub fn abandon(&self) {
        self.resource_pb.abandon();
    }
}
