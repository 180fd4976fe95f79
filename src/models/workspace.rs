use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceActiveStatus {
    #[default]
    Active,
    Deleted,
}

impl WorkspaceActiveStatus {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    /// Parse from database string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for WorkspaceActiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a workspace's compute access is currently enabled.
///
/// Flipped to `Inactive` when the creator's aggregate cost exceeds their
/// credit limit, or when their credits expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingAccessStatus {
    #[default]
    Active,
    Inactive,
}

impl BillingAccessStatus {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Parse from database string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for BillingAccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub namespace: String,
    /// Cloud project backing this workspace. None for non-cloud-billed
    /// workspaces, which never appear in billing-export queries.
    pub cloud_project: Option<String>,
    pub creator_id: Uuid,
    pub billing_account: String,
    pub active_status: WorkspaceActiveStatus,
    pub last_modified_time: DateTime<Utc>,
    pub billing_access_status: BillingAccessStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateWorkspace {
    pub namespace: String,
    pub cloud_project: Option<String>,
    pub creator_id: Uuid,
    pub billing_account: String,
}

/// Read model joining a workspace with its cached cost snapshot.
///
/// One per workspace whose creator is in the current user batch. This is the
/// unit the staleness filter and reconciler operate on. A workspace with no
/// cost-cache row reads as cost 0.0 and `cached_cost_update_time` None.
#[derive(Debug, Clone)]
pub struct WorkspaceCostRecord {
    pub workspace_id: Uuid,
    pub cloud_project: Option<String>,
    pub creator_id: Uuid,
    pub billing_account: String,
    pub cached_cost: f64,
    pub cached_cost_update_time: Option<DateTime<Utc>>,
    pub active_status: WorkspaceActiveStatus,
    pub workspace_last_modified_time: DateTime<Utc>,
    pub billing_access_status: BillingAccessStatus,
}

/// A single cost-cache write produced by the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct CostUpdate {
    pub workspace_id: Uuid,
    pub cost: f64,
    pub update_time: DateTime<Utc>,
}
