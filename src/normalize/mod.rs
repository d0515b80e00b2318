//! Pure conversions from provider records into the relational model.

pub mod bindings;
pub mod identity;

pub use bindings::{normalize_policies, normalize_policy};
pub use identity::{
    normalize_custom_role, normalize_hierarchies, normalize_hierarchy, normalize_service_account,
    normalize_service_accounts,
};
