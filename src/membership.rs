//! Concurrent expansion of group memberships.
//!
//! One task is spawned per group; every task lists that group's members on its
//! own and the results are merged once all of them have finished. A group whose
//! listing fails is logged and contributes nothing, without affecting the others.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::InventoryError;
use crate::model::{Principal, PrincipalKind, PrincipalRelationship};
use crate::sources::{MembershipSource, RawMembership};

/// Edges and member principals discovered while expanding groups.
///
/// Nothing is deduplicated here: a member of several groups shows up once per
/// group, and the store's principal upsert absorbs the repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipResolution {
    pub relationships: Vec<PrincipalRelationship>,
    pub principals: Vec<Principal>,
    /// Groups whose membership listing failed.
    pub failed_groups: Vec<String>,
}

impl MembershipResolution {
    fn extend(&mut self, other: MembershipResolution) {
        self.relationships.extend(other.relationships);
        self.principals.extend(other.principals);
        self.failed_groups.extend(other.failed_groups);
    }
}

/// Directory user ids are numeric, group ids contain lowercase letters.
pub fn classify_member(member_id: &str) -> PrincipalKind {
    if member_id.chars().any(|c| c.is_ascii_lowercase()) {
        PrincipalKind::Group
    } else {
        PrincipalKind::User
    }
}

/// Turn `groups/<group>/memberships/<member>` into an edge plus the member principal.
pub fn parse_membership(
    membership: &RawMembership,
) -> Result<(PrincipalRelationship, Principal), InventoryError> {
    let segments: Vec<&str> = membership.name.split('/').collect();
    if segments.len() < 4 {
        return Err(InventoryError::MalformedRecord {
            kind: "membership name",
            value: membership.name.clone(),
        });
    }

    let parent_id = format!("{}/{}", segments[0], segments[1]);
    let member = segments[3];
    let kind = classify_member(member);
    let child_id = match kind {
        PrincipalKind::Group => format!("groups/{member}"),
        _ => member.to_string(),
    };

    let principal = Principal::new(
        child_id.clone(),
        membership.preferred_member_key.id.clone(),
        kind,
    );
    Ok((PrincipalRelationship { parent_id, child_id }, principal))
}

async fn resolve_group(
    source: &dyn MembershipSource,
    group_id: &str,
) -> Result<MembershipResolution, InventoryError> {
    let memberships = source.list_memberships(group_id).await?;

    let mut resolution = MembershipResolution::default();
    for membership in &memberships {
        let (relationship, principal) = parse_membership(membership)?;
        resolution.relationships.push(relationship);
        resolution.principals.push(principal);
    }
    Ok(resolution)
}

/// Expand the direct memberships of every group in parallel.
///
/// There is no bound on the number of in-flight listings; the source is
/// expected to apply its own rate limiting. Dropping the returned future aborts
/// the outstanding tasks.
pub async fn resolve_memberships(
    groups: &[Principal],
    source: Arc<dyn MembershipSource>,
) -> MembershipResolution {
    let mut tasks = JoinSet::new();
    for group in groups {
        let source = Arc::clone(&source);
        let group = group.clone();
        tasks.spawn(async move {
            let result = resolve_group(source.as_ref(), &group.id).await;
            (group, result)
        });
    }

    // Wait for every task before merging anything.
    let mut outcomes = Vec::with_capacity(groups.len());
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined);
    }

    let mut resolution = MembershipResolution::default();
    for outcome in outcomes {
        match outcome {
            Ok((group, Ok(members))) => {
                debug!(
                    group = %group.id,
                    members = members.relationships.len(),
                    "Listed group members"
                );
                resolution.extend(members);
            }
            Ok((group, Err(e))) => {
                warn!(
                    group = %group.id,
                    name = %group.name,
                    error = %e,
                    "Failed to list members, skipping group"
                );
                resolution.failed_groups.push(group.id);
            }
            Err(e) => {
                error!(error = %e, "Membership task did not run to completion");
            }
        }
    }

    info!(
        groups = groups.len(),
        failed = resolution.failed_groups.len(),
        relationships = resolution.relationships.len(),
        "Resolved group memberships"
    );

    resolution
}
