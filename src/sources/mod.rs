//! Data-source collaborators consumed by the sync pipeline.
//!
//! The traits describe what the pipeline needs from the provider; [`gcp::GcpClient`]
//! implements them against the Google Cloud REST APIs.

pub mod gcp;
pub mod types;

use async_trait::async_trait;

use crate::errors::InventoryError;
use crate::model::{Principal, Role};
pub use types::{RawAsset, RawBinding, RawCondition, RawMembership, RawPolicy, RawPolicyRecord};

#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Predefined and custom role definitions, each with its full permission set.
    async fn fetch_roles(&self, scope: &str) -> Result<Vec<Role>, InventoryError>;

    /// Organization, folder and project assets under `scope`.
    async fn fetch_hierarchy_assets(&self, scope: &str) -> Result<Vec<RawAsset>, InventoryError>;

    async fn fetch_service_account_assets(
        &self,
        scope: &str,
    ) -> Result<Vec<RawAsset>, InventoryError>;

    async fn fetch_groups(&self, customer_id: &str) -> Result<Vec<Principal>, InventoryError>;

    async fn fetch_users(&self, customer_id: &str) -> Result<Vec<Principal>, InventoryError>;

    /// One record per resource carrying its attached bindings.
    async fn fetch_iam_policies(&self, scope: &str)
        -> Result<Vec<RawPolicyRecord>, InventoryError>;
}

/// Lists the direct memberships of a single group. Shared across the
/// membership resolver's tasks, so implementations must be `Send + Sync`.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    async fn list_memberships(&self, group_id: &str)
        -> Result<Vec<RawMembership>, InventoryError>;
}
