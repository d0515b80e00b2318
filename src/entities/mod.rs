pub mod hierarchy;
pub mod principal;
pub mod principal_hierarchy;
pub mod resource_role_principal;
pub mod role;
pub mod role_permission;

pub use hierarchy::Entity as Hierarchy;
pub use principal::Entity as Principal;
pub use principal_hierarchy::Entity as PrincipalHierarchy;
pub use resource_role_principal::Entity as ResourceRolePrincipal;
pub use role::Entity as Role;
pub use role_permission::Entity as RolePermission;
