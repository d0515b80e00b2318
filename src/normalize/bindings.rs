use crate::model::ResourceIamPermission;
use crate::sources::RawPolicyRecord;

/// Members starting with this prefix (`projectOwner:`, `projectEditor:`,
/// `projectViewer:`) are convenience grants injected by the provider.
pub const INJECTED_MEMBER_PREFIX: &str = "project";

/// Nearest enclosing hierarchy node: the project, else the organization when
/// the resource sits in no folder, else the first folder.
pub fn attribute_hierarchy(record: &RawPolicyRecord) -> &str {
    if !record.project.is_empty() {
        &record.project
    } else {
        match record.folders.first() {
            None => &record.organization,
            Some(folder) => folder,
        }
    }
}

pub fn is_injected_member(member: &str) -> bool {
    member.starts_with(INJECTED_MEMBER_PREFIX)
}

/// `user:alice@example.com` yields `alice@example.com`; a member without a
/// kind (`allUsers`) is returned unchanged.
pub fn member_identity(member: &str) -> &str {
    match member.split_once(':') {
        Some((_, identity)) => identity,
        None => member,
    }
}

/// Flatten one policy record into a row per (resource, principal, role).
pub fn normalize_policy(record: &RawPolicyRecord) -> Vec<ResourceIamPermission> {
    let hierarchy_id = attribute_hierarchy(record);
    let mut rows = Vec::new();

    for binding in &record.policy.bindings {
        let conditional = binding
            .condition
            .as_ref()
            .map(|c| c.title.clone())
            .unwrap_or_default();

        for member in &binding.members {
            if is_injected_member(member) {
                continue;
            }
            rows.push(ResourceIamPermission {
                resource_id: record.resource.clone(),
                principal_id: member_identity(member).to_string(),
                role_id: binding.role.clone(),
                conditional: conditional.clone(),
                asset_type: record.asset_type.clone(),
                hierarchy_id: hierarchy_id.to_string(),
            });
        }
    }

    rows
}

pub fn normalize_policies(records: &[RawPolicyRecord]) -> Vec<ResourceIamPermission> {
    records.iter().flat_map(normalize_policy).collect()
}
