use std::{
    collections::HashMap,
    sync::Mutex,
};

use async_trait::async_trait;

use super::{CostSource, CostSourceError};

/// In-memory cost source for tests.
///
/// Serves a fixed cost table and can be flipped into a failing mode to
/// exercise error handling.
pub struct StaticCostSource {
    costs: Mutex<HashMap<String, f64>>,
    fail: Mutex<bool>,
}

impl StaticCostSource {
    pub fn new(costs: HashMap<String, f64>) -> Self {
        Self {
            costs: Mutex::new(costs),
            fail: Mutex::new(false),
        }
    }

    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    /// Set the live cost for one project.
    pub fn set_cost(&self, project: impl Into<String>, cost: f64) {
        if let Ok(mut costs) = self.costs.lock() {
            costs.insert(project.into(), cost);
        }
    }

    /// Make subsequent fetches fail with a synthetic error.
    pub fn set_failing(&self, fail: bool) {
        if let Ok(mut flag) = self.fail.lock() {
            *flag = fail;
        }
    }
}

#[async_trait]
impl CostSource for StaticCostSource {
    async fn fetch_costs(
        &self,
        cloud_projects: &[String],
    ) -> Result<HashMap<String, f64>, CostSourceError> {
        if self.fail.lock().map(|f| *f).unwrap_or(false) {
            return Err(CostSourceError::Status {
                status: 503,
                body: "synthetic failure".into(),
            });
        }

        let costs = self
            .costs
            .lock()
            .map_err(|_| CostSourceError::Decode("cost table poisoned".into()))?;

        Ok(cloud_projects
            .iter()
            .filter_map(|p| costs.get(p).map(|c| (p.clone(), *c)))
            .collect())
    }
}
