use std::sync::Mutex;

use async_trait::async_trait;

use super::{ComputeClient, ComputeError};

/// Records compute operations in memory for assertions in tests.
#[derive(Default)]
pub struct RecordingComputeClient {
    deleted_runtimes: Mutex<Vec<String>>,
    unlinked_billing: Mutex<Vec<String>>,
    failing_projects: Mutex<Vec<String>>,
}

impl RecordingComputeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deleted_runtimes(&self) -> Vec<String> {
        self.deleted_runtimes
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn unlinked_billing(&self) -> Vec<String> {
        self.unlinked_billing
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }

    /// Fail every operation against this cloud project.
    pub fn fail_for(&self, cloud_project: impl Into<String>) {
        if let Ok(mut failing) = self.failing_projects.lock() {
            failing.push(cloud_project.into());
        }
    }

    fn check_failing(&self, cloud_project: &str) -> Result<(), ComputeError> {
        let failing = self
            .failing_projects
            .lock()
            .map(|f| f.iter().any(|p| p == cloud_project))
            .unwrap_or(false);
        if failing {
            return Err(ComputeError::Status {
                status: 500,
                body: "synthetic compute failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ComputeClient for RecordingComputeClient {
    async fn delete_runtimes(&self, cloud_project: &str) -> Result<(), ComputeError> {
        self.check_failing(cloud_project)?;
        if let Ok(mut deleted) = self.deleted_runtimes.lock() {
            deleted.push(cloud_project.to_string());
        }
        Ok(())
    }

    async fn unlink_billing_account(&self, cloud_project: &str) -> Result<(), ComputeError> {
        self.check_failing(cloud_project)?;
        if let Ok(mut unlinked) = self.unlinked_billing.lock() {
            unlinked.push(cloud_project.to_string());
        }
        Ok(())
    }
}
