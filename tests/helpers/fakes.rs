use std::collections::HashMap;

use async_trait::async_trait;
use iam_inventory::errors::InventoryError;
use iam_inventory::model::{Principal, PrincipalKind, Role};
use iam_inventory::normalize::identity::{
    FOLDER_ASSET_TYPE, ORGANIZATION_ASSET_TYPE, PROJECT_ASSET_TYPE, SERVICE_ACCOUNT_ASSET_TYPE,
};
use iam_inventory::sources::types::EntityKey;
use iam_inventory::sources::{
    InventorySource, MembershipSource, RawAsset, RawBinding, RawCondition, RawMembership,
    RawPolicy, RawPolicyRecord,
};

/// In-memory organization, built up with the `with_*` methods.
#[derive(Default, Clone)]
pub struct FakeInventory {
    roles: Vec<Role>,
    users: Vec<Principal>,
    groups: Vec<Principal>,
    hierarchy: Vec<RawAsset>,
    service_accounts: Vec<RawAsset>,
    policies: Vec<RawPolicyRecord>,
}

impl FakeInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, id: &str, title: &str, permissions: &[&str]) -> Self {
        self.roles.push(Role {
            id: id.to_string(),
            title: title.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    pub fn with_user(mut self, id: &str, email: &str) -> Self {
        self.users
            .push(Principal::new(id, email, PrincipalKind::User));
        self
    }

    pub fn with_group(mut self, id: &str, email: &str) -> Self {
        self.groups
            .push(Principal::new(id, email, PrincipalKind::Group));
        self
    }

    pub fn with_organization(mut self, number: &str, domain: &str) -> Self {
        self.hierarchy.push(RawAsset {
            name: format!("//cloudresourcemanager.googleapis.com/organizations/{number}"),
            asset_type: ORGANIZATION_ASSET_TYPE.to_string(),
            display_name: domain.to_string(),
            ..Default::default()
        });
        self
    }

    pub fn with_folder(mut self, number: &str, name: &str, parent: &str) -> Self {
        self.hierarchy.push(RawAsset {
            name: format!("//cloudresourcemanager.googleapis.com/folders/{number}"),
            asset_type: FOLDER_ASSET_TYPE.to_string(),
            display_name: name.to_string(),
            parent_full_resource_name: format!("//cloudresourcemanager.googleapis.com/{parent}"),
            ..Default::default()
        });
        self
    }

    pub fn with_project(mut self, number: &str, project_id: &str, parent: &str) -> Self {
        self.hierarchy.push(RawAsset {
            name: format!("//cloudresourcemanager.googleapis.com/projects/{project_id}"),
            asset_type: PROJECT_ASSET_TYPE.to_string(),
            project: format!("projects/{number}"),
            display_name: project_id.to_string(),
            parent_full_resource_name: format!("//cloudresourcemanager.googleapis.com/{parent}"),
            ..Default::default()
        });
        self
    }

    pub fn with_hierarchy_asset(mut self, asset: RawAsset) -> Self {
        self.hierarchy.push(asset);
        self
    }

    pub fn with_service_account(mut self, project_id: &str, email: &str) -> Self {
        self.service_accounts.push(RawAsset {
            name: format!("//iam.googleapis.com/projects/{project_id}/serviceAccounts/{email}"),
            asset_type: SERVICE_ACCOUNT_ASSET_TYPE.to_string(),
            project: format!("projects/{project_id}"),
            ..Default::default()
        });
        self
    }

    /// An empty policy on a project resource; add grants with [`Self::with_binding`].
    pub fn with_project_policy(
        mut self,
        project_number: &str,
        folder: Option<&str>,
        organization: &str,
    ) -> Self {
        self.policies.push(RawPolicyRecord {
            resource: format!("//cloudresourcemanager.googleapis.com/projects/{project_number}"),
            asset_type: PROJECT_ASSET_TYPE.to_string(),
            project: format!("projects/{project_number}"),
            folders: folder.map(|f| vec![f.to_string()]).unwrap_or_default(),
            organization: organization.to_string(),
            policy: RawPolicy::default(),
        });
        self
    }

    /// Append a binding to the most recently added policy.
    pub fn with_binding(mut self, role: &str, members: &[&str], condition: Option<&str>) -> Self {
        let record = self
            .policies
            .last_mut()
            .expect("with_binding needs a policy to attach to");
        record.policy.bindings.push(RawBinding {
            role: role.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            condition: condition.map(|title| RawCondition {
                title: title.to_string(),
                expression: "request.time < timestamp('2030-01-01T00:00:00Z')".to_string(),
            }),
        });
        self
    }
}

#[async_trait]
impl InventorySource for FakeInventory {
    async fn fetch_roles(&self, _scope: &str) -> Result<Vec<Role>, InventoryError> {
        Ok(self.roles.clone())
    }

    async fn fetch_hierarchy_assets(&self, _scope: &str) -> Result<Vec<RawAsset>, InventoryError> {
        Ok(self.hierarchy.clone())
    }

    async fn fetch_service_account_assets(
        &self,
        _scope: &str,
    ) -> Result<Vec<RawAsset>, InventoryError> {
        Ok(self.service_accounts.clone())
    }

    async fn fetch_groups(&self, _customer_id: &str) -> Result<Vec<Principal>, InventoryError> {
        Ok(self.groups.clone())
    }

    async fn fetch_users(&self, _customer_id: &str) -> Result<Vec<Principal>, InventoryError> {
        Ok(self.users.clone())
    }

    async fn fetch_iam_policies(
        &self,
        _scope: &str,
    ) -> Result<Vec<RawPolicyRecord>, InventoryError> {
        Ok(self.policies.clone())
    }
}

/// Canned group memberships. Groups listed in `failing` answer with a 403.
#[derive(Default)]
pub struct FakeDirectory {
    memberships: HashMap<String, Vec<RawMembership>>,
    failing: Vec<String>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// `group` is the group resource name (`groups/<id>`), `member` the raw member id.
    pub fn with_member(mut self, group: &str, member: &str, member_key: &str) -> Self {
        self.memberships
            .entry(group.to_string())
            .or_default()
            .push(RawMembership {
                name: format!("{group}/memberships/{member}"),
                preferred_member_key: EntityKey {
                    id: member_key.to_string(),
                },
            });
        self
    }

    pub fn failing(mut self, group: &str) -> Self {
        self.failing.push(group.to_string());
        self
    }
}

#[async_trait]
impl MembershipSource for FakeDirectory {
    async fn list_memberships(
        &self,
        group_id: &str,
    ) -> Result<Vec<RawMembership>, InventoryError> {
        if self.failing.iter().any(|g| g == group_id) {
            return Err(InventoryError::Remote {
                operation: format!("list memberships of {group_id}"),
                status: 403,
                body: "permission denied".to_string(),
            });
        }
        Ok(self.memberships.get(group_id).cloned().unwrap_or_default())
    }
}
