use serde_json::Value;

use crate::errors::InventoryError;
use crate::model::{Hierarchy, HierarchyKind, Principal, PrincipalKind, Role};
use crate::sources::RawAsset;

pub const RESOURCE_MANAGER_PREFIX: &str = "//cloudresourcemanager.googleapis.com/";
pub const PROJECT_NAME_PREFIX: &str = "//cloudresourcemanager.googleapis.com/projects/";
pub const IAM_PREFIX: &str = "//iam.googleapis.com/";

pub const ORGANIZATION_ASSET_TYPE: &str = "cloudresourcemanager.googleapis.com/Organization";
pub const FOLDER_ASSET_TYPE: &str = "cloudresourcemanager.googleapis.com/Folder";
pub const PROJECT_ASSET_TYPE: &str = "cloudresourcemanager.googleapis.com/Project";
pub const SERVICE_ACCOUNT_ASSET_TYPE: &str = "iam.googleapis.com/ServiceAccount";
pub const CUSTOM_ROLE_ASSET_TYPE: &str = "iam.googleapis.com/Role";

/// The asset subtypes accepted as hierarchy nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyAssetType {
    Organization,
    Folder,
    Project,
}

impl HierarchyAssetType {
    pub const ALL: [HierarchyAssetType; 3] = [
        HierarchyAssetType::Folder,
        HierarchyAssetType::Project,
        HierarchyAssetType::Organization,
    ];

    pub fn parse(asset_type: &str) -> Option<Self> {
        match asset_type {
            ORGANIZATION_ASSET_TYPE => Some(HierarchyAssetType::Organization),
            FOLDER_ASSET_TYPE => Some(HierarchyAssetType::Folder),
            PROJECT_ASSET_TYPE => Some(HierarchyAssetType::Project),
            _ => None,
        }
    }

    pub fn asset_type(&self) -> &'static str {
        match self {
            HierarchyAssetType::Organization => ORGANIZATION_ASSET_TYPE,
            HierarchyAssetType::Folder => FOLDER_ASSET_TYPE,
            HierarchyAssetType::Project => PROJECT_ASSET_TYPE,
        }
    }
}

impl From<HierarchyAssetType> for HierarchyKind {
    fn from(value: HierarchyAssetType) -> Self {
        match value {
            HierarchyAssetType::Organization => HierarchyKind::Organization,
            HierarchyAssetType::Folder => HierarchyKind::Folder,
            HierarchyAssetType::Project => HierarchyKind::Project,
        }
    }
}

fn trim_prefix(value: &str, prefix: &str) -> String {
    value.strip_prefix(prefix).unwrap_or(value).to_string()
}

/// Convert a resource-manager asset into a hierarchy node.
///
/// Projects are keyed by `projects/<number>` and named by project id; folders and
/// organizations are keyed by their relative resource name and use the display name.
pub fn normalize_hierarchy(asset: &RawAsset) -> Result<Hierarchy, InventoryError> {
    let asset_type = HierarchyAssetType::parse(&asset.asset_type).ok_or_else(|| {
        InventoryError::UnknownAssetType {
            asset_type: asset.asset_type.clone(),
            name: asset.name.clone(),
        }
    })?;

    let (id, name) = match asset_type {
        HierarchyAssetType::Project => (
            asset.project.clone(),
            trim_prefix(&asset.name, PROJECT_NAME_PREFIX),
        ),
        HierarchyAssetType::Folder | HierarchyAssetType::Organization => (
            trim_prefix(&asset.name, RESOURCE_MANAGER_PREFIX),
            asset.display_name.clone(),
        ),
    };

    Ok(Hierarchy {
        id,
        name,
        kind: asset_type.into(),
        parent_id: trim_prefix(&asset.parent_full_resource_name, RESOURCE_MANAGER_PREFIX),
    })
}

/// Normalize every asset, failing on the first unrecognized subtype.
pub fn normalize_hierarchies(assets: &[RawAsset]) -> Result<Vec<Hierarchy>, InventoryError> {
    assets.iter().map(normalize_hierarchy).collect()
}

/// Service accounts are identified by their email, the last segment of the
/// resource name.
pub fn normalize_service_account(asset: &RawAsset) -> Principal {
    let email = asset.name.rsplit('/').next().unwrap_or_default();
    Principal::new(email, email, PrincipalKind::ServiceAccount)
}

pub fn normalize_service_accounts(assets: &[RawAsset]) -> Vec<Principal> {
    assets.iter().map(normalize_service_account).collect()
}

/// Custom roles arrive as resource-search assets with their permissions in
/// `additionalAttributes.includedPermissions`.
pub fn normalize_custom_role(asset: &RawAsset) -> Role {
    let permissions = match asset.additional_attributes.get("includedPermissions") {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };

    Role {
        id: trim_prefix(&asset.name, IAM_PREFIX),
        title: asset.display_name.clone(),
        permissions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn asset(asset_type: &str, name: &str) -> RawAsset {
        RawAsset {
            name: name.to_string(),
            asset_type: asset_type.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_project_uses_project_number_and_id() {
        let mut project = asset(
            PROJECT_ASSET_TYPE,
            "//cloudresourcemanager.googleapis.com/projects/my-project",
        );
        project.project = "projects/123456".to_string();
        project.display_name = "My Project".to_string();
        project.parent_full_resource_name =
            "//cloudresourcemanager.googleapis.com/folders/42".to_string();

        let node = normalize_hierarchy(&project).expect("Failed to normalize project");

        assert_eq!(node.id, "projects/123456");
        assert_eq!(node.name, "my-project");
        assert_eq!(node.kind, HierarchyKind::Project);
        assert_eq!(node.parent_id, "folders/42");
    }

    #[test]
    fn test_folder_and_organization_use_display_name() {
        let mut folder = asset(
            FOLDER_ASSET_TYPE,
            "//cloudresourcemanager.googleapis.com/folders/42",
        );
        folder.display_name = "Engineering".to_string();
        folder.parent_full_resource_name =
            "//cloudresourcemanager.googleapis.com/organizations/7".to_string();

        let mut org = asset(
            ORGANIZATION_ASSET_TYPE,
            "//cloudresourcemanager.googleapis.com/organizations/7",
        );
        org.display_name = "example.com".to_string();

        let nodes = normalize_hierarchies(&[folder, org]).expect("Failed to normalize");

        assert_eq!(nodes[0].id, "folders/42");
        assert_eq!(nodes[0].name, "Engineering");
        assert_eq!(nodes[0].kind, HierarchyKind::Folder);
        assert_eq!(nodes[0].parent_id, "organizations/7");

        assert_eq!(nodes[1].id, "organizations/7");
        assert_eq!(nodes[1].name, "example.com");
        assert_eq!(nodes[1].kind, HierarchyKind::Organization);
        assert_eq!(nodes[1].parent_id, "");
    }

    #[test]
    fn test_unknown_asset_type_is_rejected() {
        let bucket = asset(
            "storage.googleapis.com/Bucket",
            "//storage.googleapis.com/my-bucket",
        );
        let folder = asset(
            FOLDER_ASSET_TYPE,
            "//cloudresourcemanager.googleapis.com/folders/1",
        );

        let err = normalize_hierarchies(&[folder, bucket]).unwrap_err();
        match err {
            InventoryError::UnknownAssetType { asset_type, name } => {
                assert_eq!(asset_type, "storage.googleapis.com/Bucket");
                assert_eq!(name, "//storage.googleapis.com/my-bucket");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let mut folder = asset(
            FOLDER_ASSET_TYPE,
            "//cloudresourcemanager.googleapis.com/folders/9",
        );
        folder.display_name = "Ops".to_string();

        let first = normalize_hierarchy(&folder).expect("first");
        let second = normalize_hierarchy(&folder).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn test_asset_type_round_trip() {
        for kind in HierarchyAssetType::ALL {
            assert_eq!(HierarchyAssetType::parse(kind.asset_type()), Some(kind));
        }
        assert_eq!(HierarchyAssetType::parse("cloudresourcemanager.googleapis.com/project"), None);
    }

    #[test]
    fn test_service_account_email_from_resource_name() {
        let sa = asset(
            SERVICE_ACCOUNT_ASSET_TYPE,
            "//iam.googleapis.com/projects/my-project/serviceAccounts/deployer@my-project.iam.gserviceaccount.com",
        );

        let principal = normalize_service_account(&sa);
        assert_eq!(principal.id, "deployer@my-project.iam.gserviceaccount.com");
        assert_eq!(principal.name, principal.id);
        assert_eq!(principal.kind, PrincipalKind::ServiceAccount);
    }

    #[test]
    fn test_custom_role_permissions() {
        let mut role = asset(
            CUSTOM_ROLE_ASSET_TYPE,
            "//iam.googleapis.com/organizations/7/roles/bucketReader",
        );
        role.display_name = "Bucket Reader".to_string();
        role.additional_attributes.insert(
            "includedPermissions".to_string(),
            json!(["storage.buckets.get", 12, "storage.objects.list"]),
        );

        let normalized = normalize_custom_role(&role);
        assert_eq!(normalized.id, "organizations/7/roles/bucketReader");
        assert_eq!(normalized.title, "Bucket Reader");
        assert_eq!(
            normalized.permissions,
            vec!["storage.buckets.get".to_string(), "storage.objects.list".to_string()]
        );
    }

    #[test]
    fn test_custom_role_without_permissions() {
        let role = asset(
            CUSTOM_ROLE_ASSET_TYPE,
            "//iam.googleapis.com/projects/p/roles/empty",
        );
        assert!(normalize_custom_role(&role).permissions.is_empty());
    }
}
