use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A resource-search result (`searchAllResources`), restricted to the fields
/// the normalizers read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAsset {
    /// Full resource name, e.g. `//cloudresourcemanager.googleapis.com/folders/123`
    pub name: String,
    /// e.g. `cloudresourcemanager.googleapis.com/Project`
    pub asset_type: String,
    /// `projects/<number>` for project-scoped assets
    pub project: String,
    pub display_name: String,
    pub parent_full_resource_name: String,
    pub additional_attributes: Map<String, Value>,
}

/// An IAM-policy search result: one resource with its attached policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPolicyRecord {
    pub resource: String,
    pub asset_type: String,
    pub project: String,
    pub folders: Vec<String>,
    pub organization: String,
    pub policy: RawPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPolicy {
    pub bindings: Vec<RawBinding>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBinding {
    pub role: String,
    pub members: Vec<String>,
    pub condition: Option<RawCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCondition {
    pub title: String,
    pub expression: String,
}

/// A Cloud Identity membership, named `groups/<group>/memberships/<member>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMembership {
    pub name: String,
    pub preferred_member_key: EntityKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityKey {
    pub id: String,
}
