use crate::entities;
use crate::errors::InventoryError;
use crate::model::{
    Hierarchy, HierarchyKind, Principal, PrincipalKind, PrincipalRelationship,
    ResourceIamPermission, Role,
};
use crate::settings::Database as DbCfg;
use migration::{Migrator, MigratorTrait};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info};

/// Applied after the schema: crash-safe commits, WAL for concurrent readers,
/// an 80 MB page cache and in-memory temp tables.
pub const PRAGMAS: [&str; 4] = [
    "PRAGMA synchronous = FULL",
    "PRAGMA journal_mode = WAL",
    "PRAGMA cache_size = -80000",
    "PRAGMA temp_store = MEMORY",
];

/// Open the store, create the schema if needed and apply the pragmas.
///
/// A sync is the only writer, so the pool holds a single connection and the
/// per-connection pragmas stay in effect for the whole run.
pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, InventoryError> {
    let db = open(cfg).await?;
    Migrator::up(&db, None).await?;
    for pragma in PRAGMAS {
        db.execute_unprepared(pragma).await?;
    }
    info!(url = %cfg.url, "Store initialized");
    Ok(db)
}

/// Connect to an existing store without touching its schema.
pub async fn open(cfg: &DbCfg) -> Result<DatabaseConnection, InventoryError> {
    let mut opts = ConnectOptions::new(cfg.url.clone());
    opts.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opts).await?;
    Ok(db)
}

// Writers

/// Insert roles and their permission edges in one transaction.
///
/// Both the role and each `(role_id, permission_id)` edge are insert-or-ignore,
/// so roles reported by several sources collapse into one. Any failure rolls
/// back the whole batch. Returns the number of roles newly written.
pub async fn insert_roles(db: &DatabaseConnection, roles: &[Role]) -> Result<u64, InventoryError> {
    use entities::{role, role_permission};

    let txn = db.begin().await?;
    let mut inserted = 0;
    let mut edges = 0;

    for r in roles {
        let model = role::ActiveModel {
            id: Set(r.id.clone()),
            title: Set(r.title.clone()),
        };
        inserted += role::Entity::insert(model)
            .on_conflict(OnConflict::column(role::Column::Id).do_nothing().to_owned())
            .exec_without_returning(&txn)
            .await
            .map_err(|e| InventoryError::storage("insert role", &r.id, e))?;

        for permission in &r.permissions {
            let edge = role_permission::ActiveModel {
                role_id: Set(r.id.clone()),
                permission_id: Set(permission.clone()),
            };
            edges += role_permission::Entity::insert(edge)
                .on_conflict(
                    OnConflict::columns([
                        role_permission::Column::RoleId,
                        role_permission::Column::PermissionId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(|e| {
                    InventoryError::storage("insert role permission", format!("{}/{}", r.id, permission), e)
                })?;
        }
    }

    txn.commit().await?;
    debug!(roles = inserted, permissions = edges, "Roles committed");
    Ok(inserted)
}

/// Insert principals, silently keeping the existing row when the id is known.
/// Returns the number of principals newly written.
pub async fn upsert_principals(
    db: &DatabaseConnection,
    principals: &[Principal],
) -> Result<u64, InventoryError> {
    use entities::principal::{ActiveModel, Column, Entity};

    let mut inserted = 0;
    for p in principals {
        let model = ActiveModel {
            id: Set(p.id.clone()),
            name: Set(p.name.clone()),
            kind: Set(p.kind.as_str().to_string()),
        };
        inserted += Entity::insert(model)
            .on_conflict(OnConflict::column(Column::Id).do_nothing().to_owned())
            .exec_without_returning(db)
            .await
            .map_err(|e| InventoryError::storage("upsert principal", &p.id, e))?;
    }
    Ok(inserted)
}

/// Plain insert: the caller syncs hierarchy assets at most once per store.
pub async fn insert_hierarchies(
    db: &DatabaseConnection,
    hierarchies: &[Hierarchy],
) -> Result<u64, InventoryError> {
    use entities::hierarchy::{ActiveModel, Entity};

    for h in hierarchies {
        let model = ActiveModel {
            id: Set(h.id.clone()),
            name: Set(h.name.clone()),
            kind: Set(h.kind.as_str().to_string()),
            parent_id: Set(h.parent_id.clone()),
        };
        Entity::insert(model)
            .exec_without_returning(db)
            .await
            .map_err(|e| InventoryError::storage("insert hierarchy", &h.id, e))?;
    }
    Ok(hierarchies.len() as u64)
}

/// Plain insert with no uniqueness: re-running against a populated store
/// duplicates edges.
pub async fn insert_principal_relationships(
    db: &DatabaseConnection,
    relationships: &[PrincipalRelationship],
) -> Result<u64, InventoryError> {
    use entities::principal_hierarchy::{ActiveModel, Entity};

    for r in relationships {
        let model = ActiveModel {
            parent_id: Set(r.parent_id.clone()),
            child_id: Set(r.child_id.clone()),
            ..Default::default()
        };
        Entity::insert(model)
            .exec_without_returning(db)
            .await
            .map_err(|e| {
                InventoryError::storage(
                    "insert principal relationship",
                    format!("{} -> {}", r.parent_id, r.child_id),
                    e,
                )
            })?;
    }
    Ok(relationships.len() as u64)
}

/// Append binding rows. Every row is independent; nothing is deduplicated.
pub async fn insert_resource_iam_permissions(
    db: &DatabaseConnection,
    permissions: &[ResourceIamPermission],
) -> Result<u64, InventoryError> {
    use entities::resource_role_principal::{ActiveModel, Entity};

    for p in permissions {
        let model = ActiveModel {
            resource_id: Set(p.resource_id.clone()),
            principal_id: Set(p.principal_id.clone()),
            role_id: Set(p.role_id.clone()),
            conditional: Set(p.conditional.clone()),
            asset_type: Set(p.asset_type.clone()),
            hierarchy_id: Set(p.hierarchy_id.clone()),
            ..Default::default()
        };
        Entity::insert(model)
            .exec_without_returning(db)
            .await
            .map_err(|e| {
                InventoryError::storage(
                    "insert binding",
                    format!("{} {} {}", p.resource_id, p.role_id, p.principal_id),
                    e,
                )
            })?;
    }
    Ok(permissions.len() as u64)
}

// Readers

pub async fn get_principal(
    db: &DatabaseConnection,
    id: &str,
) -> Result<Option<Principal>, InventoryError> {
    use entities::principal::{Column, Entity};

    match Entity::find().filter(Column::Id.eq(id)).one(db).await? {
        Some(model) => Ok(Some(Principal {
            kind: parse_principal_kind(&model.kind)?,
            id: model.id,
            name: model.name,
        })),
        None => Ok(None),
    }
}

pub async fn count_principals(db: &DatabaseConnection) -> Result<u64, InventoryError> {
    Ok(entities::Principal::find().count(db).await?)
}

pub async fn get_role_permissions(
    db: &DatabaseConnection,
    role_id: &str,
) -> Result<Vec<String>, InventoryError> {
    use entities::role_permission::{Column, Entity};

    let edges = Entity::find()
        .filter(Column::RoleId.eq(role_id))
        .order_by_asc(Column::PermissionId)
        .all(db)
        .await?;
    Ok(edges.into_iter().map(|e| e.permission_id).collect())
}

pub async fn list_hierarchies(db: &DatabaseConnection) -> Result<Vec<Hierarchy>, InventoryError> {
    use entities::hierarchy::{Column, Entity};

    let models = Entity::find().order_by_asc(Column::Id).all(db).await?;
    models
        .into_iter()
        .map(|m| {
            Ok(Hierarchy {
                kind: parse_hierarchy_kind(&m.kind)?,
                id: m.id,
                name: m.name,
                parent_id: m.parent_id,
            })
        })
        .collect()
}

pub async fn list_principal_relationships(
    db: &DatabaseConnection,
) -> Result<Vec<PrincipalRelationship>, InventoryError> {
    use entities::principal_hierarchy::{Column, Entity};

    let models = Entity::find().order_by_asc(Column::Id).all(db).await?;
    Ok(models
        .into_iter()
        .map(|m| PrincipalRelationship {
            parent_id: m.parent_id,
            child_id: m.child_id,
        })
        .collect())
}

/// Bindings granted to `principal_id`, in insertion order.
pub async fn get_bindings_for_principal(
    db: &DatabaseConnection,
    principal_id: &str,
) -> Result<Vec<ResourceIamPermission>, InventoryError> {
    use entities::resource_role_principal::{Column, Entity};

    let models = Entity::find()
        .filter(Column::PrincipalId.eq(principal_id))
        .order_by_asc(Column::Id)
        .all(db)
        .await?;
    Ok(models
        .into_iter()
        .map(|m| ResourceIamPermission {
            resource_id: m.resource_id,
            principal_id: m.principal_id,
            role_id: m.role_id,
            conditional: m.conditional,
            asset_type: m.asset_type,
            hierarchy_id: m.hierarchy_id,
        })
        .collect())
}

fn parse_principal_kind(value: &str) -> Result<PrincipalKind, InventoryError> {
    match value {
        "user" => Ok(PrincipalKind::User),
        "group" => Ok(PrincipalKind::Group),
        "serviceAccount" => Ok(PrincipalKind::ServiceAccount),
        other => Err(InventoryError::MalformedRecord {
            kind: "principal type",
            value: other.to_string(),
        }),
    }
}

fn parse_hierarchy_kind(value: &str) -> Result<HierarchyKind, InventoryError> {
    match value {
        "organization" => Ok(HierarchyKind::Organization),
        "folder" => Ok(HierarchyKind::Folder),
        "project" => Ok(HierarchyKind::Project),
        other => Err(InventoryError::MalformedRecord {
            kind: "hierarchy type",
            value: other.to_string(),
        }),
    }
}
