use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Enable foreign keys for SQLite
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Sqlite {
            manager
                .get_connection()
                .execute_unprepared("PRAGMA foreign_keys = ON")
                .await?;
        }

        // Create role table
        manager
            .create_table(
                Table::create()
                    .table(Role::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Role::Id).string().not_null().primary_key())
                    .col(string(Role::Title))
                    .to_owned(),
            )
            .await?;

        // Create role_permission table
        manager
            .create_table(
                Table::create()
                    .table(RolePermission::Table)
                    .if_not_exists()
                    .col(string(RolePermission::RoleId))
                    .col(string(RolePermission::PermissionId))
                    .primary_key(
                        Index::create()
                            .col(RolePermission::RoleId)
                            .col(RolePermission::PermissionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_permission_role")
                            .from(RolePermission::Table, RolePermission::RoleId)
                            .to(Role::Table, Role::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create principal table
        manager
            .create_table(
                Table::create()
                    .table(Principal::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Principal::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(Principal::Name))
                    .col(string(Principal::Type))
                    .to_owned(),
            )
            .await?;

        // Create principal_hierarchy table (group -> member edges, duplicates allowed)
        manager
            .create_table(
                Table::create()
                    .table(PrincipalHierarchy::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PrincipalHierarchy::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(PrincipalHierarchy::ParentId))
                    .col(string(PrincipalHierarchy::ChildId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_principal_hierarchy_parent")
                    .table(PrincipalHierarchy::Table)
                    .col(PrincipalHierarchy::ParentId)
                    .to_owned(),
            )
            .await?;

        // Create hierarchy table
        manager
            .create_table(
                Table::create()
                    .table(Hierarchy::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Hierarchy::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(Hierarchy::Name))
                    .col(string(Hierarchy::Type))
                    .col(string(Hierarchy::ParentId))
                    .to_owned(),
            )
            .await?;

        // Create resource_role_principal table (append-only bindings)
        manager
            .create_table(
                Table::create()
                    .table(ResourceRolePrincipal::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ResourceRolePrincipal::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(ResourceRolePrincipal::ResourceId))
                    .col(string(ResourceRolePrincipal::PrincipalId))
                    .col(string(ResourceRolePrincipal::RoleId))
                    .col(string(ResourceRolePrincipal::Conditional))
                    .col(string(ResourceRolePrincipal::AssetType))
                    .col(string(ResourceRolePrincipal::HierarchyId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_resource_role_principal_principal")
                    .table(ResourceRolePrincipal::Table)
                    .col(ResourceRolePrincipal::PrincipalId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ResourceRolePrincipal::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Hierarchy::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PrincipalHierarchy::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Principal::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RolePermission::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Role::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Role {
    Table,
    Id,
    Title,
}

#[derive(DeriveIden)]
enum RolePermission {
    Table,
    RoleId,
    PermissionId,
}

#[derive(DeriveIden)]
enum Principal {
    Table,
    Id,
    Name,
    Type,
}

#[derive(DeriveIden)]
enum PrincipalHierarchy {
    Table,
    Id,
    ParentId,
    ChildId,
}

#[derive(DeriveIden)]
enum Hierarchy {
    Table,
    Id,
    Name,
    Type,
    ParentId,
}

#[derive(DeriveIden)]
enum ResourceRolePrincipal {
    Table,
    Id,
    ResourceId,
    PrincipalId,
    RoleId,
    Conditional,
    AssetType,
    HierarchyId,
}
