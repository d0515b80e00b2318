//! Orchestrates one full inventory sync.
//!
//! Phases run strictly in order and never overlap; the first failing phase stops
//! the run and its error is returned to the caller.

use std::fmt;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::{error, info};

use crate::errors::InventoryError;
use crate::membership::resolve_memberships;
use crate::normalize::{normalize_hierarchies, normalize_policies, normalize_service_accounts};
use crate::settings::organization_scope;
use crate::sources::{InventorySource, MembershipSource};
use crate::storage;

/// Which organization and directory customer to inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncScope {
    pub organization_id: String,
    pub customer_id: String,
}

impl SyncScope {
    pub fn new(organization_id: impl Into<String>, customer_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            customer_id: customer_id.into(),
        }
    }

    pub fn asset_scope(&self) -> String {
        organization_scope(&self.organization_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Roles,
    Principals,
    Hierarchy,
    ServiceAccounts,
    Bindings,
}

impl SyncPhase {
    pub const ORDER: [SyncPhase; 5] = [
        SyncPhase::Roles,
        SyncPhase::Principals,
        SyncPhase::Hierarchy,
        SyncPhase::ServiceAccounts,
        SyncPhase::Bindings,
    ];
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Roles => "roles",
            SyncPhase::Principals => "principals",
            SyncPhase::Hierarchy => "hierarchy",
            SyncPhase::ServiceAccounts => "service accounts",
            SyncPhase::Bindings => "bindings",
        };
        f.write_str(name)
    }
}

/// Rows written by a completed sync.
///
/// Principal counts only include ids that were new to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub roles: u64,
    pub users: u64,
    pub groups: u64,
    pub relationships: u64,
    pub discovered_principals: u64,
    pub failed_groups: Vec<String>,
    pub hierarchies: u64,
    pub service_accounts: u64,
    pub bindings: u64,
}

fn phase_failed(phase: SyncPhase) -> impl FnOnce(&InventoryError) {
    move |e| error!(%phase, error = %e, "Sync phase failed, stopping")
}

/// Run every phase against `db`, in order: roles, principals and groups,
/// hierarchy, service accounts, bindings.
pub async fn run_sync<S>(
    db: &DatabaseConnection,
    source: &S,
    members: Arc<dyn MembershipSource>,
    scope: &SyncScope,
) -> Result<SyncReport, InventoryError>
where
    S: InventorySource + ?Sized,
{
    let asset_scope = scope.asset_scope();
    let mut report = SyncReport::default();
    info!(scope = %asset_scope, customer = %scope.customer_id, "Starting sync");

    // Roles and their permission edges land in a single transaction.
    info!(phase = %SyncPhase::Roles, "Starting phase");
    report.roles = sync_roles(db, source, &asset_scope)
        .await
        .inspect_err(phase_failed(SyncPhase::Roles))?;

    info!(phase = %SyncPhase::Principals, "Starting phase");
    sync_principals(db, source, members, &scope.customer_id, &mut report)
        .await
        .inspect_err(phase_failed(SyncPhase::Principals))?;

    info!(phase = %SyncPhase::Hierarchy, "Starting phase");
    report.hierarchies = sync_hierarchy(db, source, &asset_scope)
        .await
        .inspect_err(phase_failed(SyncPhase::Hierarchy))?;

    info!(phase = %SyncPhase::ServiceAccounts, "Starting phase");
    report.service_accounts = sync_service_accounts(db, source, &asset_scope)
        .await
        .inspect_err(phase_failed(SyncPhase::ServiceAccounts))?;

    info!(phase = %SyncPhase::Bindings, "Starting phase");
    report.bindings = sync_bindings(db, source, &asset_scope)
        .await
        .inspect_err(phase_failed(SyncPhase::Bindings))?;

    info!(?report, "Sync complete");
    Ok(report)
}

async fn sync_roles<S: InventorySource + ?Sized>(
    db: &DatabaseConnection,
    source: &S,
    scope: &str,
) -> Result<u64, InventoryError> {
    let roles = source.fetch_roles(scope).await?;
    let inserted = storage::insert_roles(db, &roles).await?;
    info!(fetched = roles.len(), inserted, "Stored roles");
    Ok(inserted)
}

async fn sync_principals<S: InventorySource + ?Sized>(
    db: &DatabaseConnection,
    source: &S,
    members: Arc<dyn MembershipSource>,
    customer_id: &str,
    report: &mut SyncReport,
) -> Result<(), InventoryError> {
    let users = source.fetch_users(customer_id).await?;
    report.users = storage::upsert_principals(db, &users).await?;
    info!(fetched = users.len(), inserted = report.users, "Stored users");

    let groups = source.fetch_groups(customer_id).await?;
    report.groups = storage::upsert_principals(db, &groups).await?;
    info!(fetched = groups.len(), inserted = report.groups, "Stored groups");

    let resolution = resolve_memberships(&groups, members).await;
    report.relationships =
        storage::insert_principal_relationships(db, &resolution.relationships).await?;
    report.discovered_principals = storage::upsert_principals(db, &resolution.principals).await?;
    report.failed_groups = resolution.failed_groups;
    info!(
        relationships = report.relationships,
        discovered = report.discovered_principals,
        "Stored group memberships"
    );
    Ok(())
}

async fn sync_hierarchy<S: InventorySource + ?Sized>(
    db: &DatabaseConnection,
    source: &S,
    scope: &str,
) -> Result<u64, InventoryError> {
    let assets = source.fetch_hierarchy_assets(scope).await?;
    let nodes = normalize_hierarchies(&assets)?;
    let inserted = storage::insert_hierarchies(db, &nodes).await?;
    info!(inserted, "Stored hierarchy");
    Ok(inserted)
}

async fn sync_service_accounts<S: InventorySource + ?Sized>(
    db: &DatabaseConnection,
    source: &S,
    scope: &str,
) -> Result<u64, InventoryError> {
    let assets = source.fetch_service_account_assets(scope).await?;
    let accounts = normalize_service_accounts(&assets);
    let inserted = storage::upsert_principals(db, &accounts).await?;
    info!(fetched = accounts.len(), inserted, "Stored service accounts");
    Ok(inserted)
}

async fn sync_bindings<S: InventorySource + ?Sized>(
    db: &DatabaseConnection,
    source: &S,
    scope: &str,
) -> Result<u64, InventoryError> {
    let records = source.fetch_iam_policies(scope).await?;
    let bindings = normalize_policies(&records);
    let inserted = storage::insert_resource_iam_permissions(db, &bindings).await?;
    info!(records = records.len(), inserted, "Stored bindings");
    Ok(inserted)
}
