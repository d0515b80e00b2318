use serde::{Deserialize, Serialize};
use std::fmt;

/// A role definition with its full permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub title: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrincipalKind {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "group")]
    Group,
    #[serde(rename = "serviceAccount")]
    ServiceAccount,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "user",
            PrincipalKind::Group => "group",
            PrincipalKind::ServiceAccount => "serviceAccount",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identity that can be granted roles.
///
/// `id` keeps the provider's native format: an email for service accounts,
/// `groups/<id>` for groups and the numeric directory id for users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub kind: PrincipalKind,
}

impl Principal {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: PrincipalKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

/// `child_id` is a direct member of group `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalRelationship {
    pub parent_id: String,
    pub child_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyKind {
    Organization,
    Folder,
    Project,
}

impl HierarchyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HierarchyKind::Organization => "organization",
            HierarchyKind::Folder => "folder",
            HierarchyKind::Project => "project",
        }
    }
}

impl fmt::Display for HierarchyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organization, folder or project node of the resource hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub id: String,
    pub name: String,
    pub kind: HierarchyKind,
    pub parent_id: String,
}

/// One role granted to one principal on one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIamPermission {
    pub resource_id: String,
    pub principal_id: String,
    pub role_id: String,
    /// Condition title, empty for unconditional grants.
    pub conditional: String,
    pub asset_type: String,
    /// Nearest enclosing project, folder or organization.
    pub hierarchy_id: String,
}
