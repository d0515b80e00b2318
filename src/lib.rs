//! IAM inventory - snapshots a Google Cloud organization's IAM configuration
//!
//! Roles, principals, group memberships, the resource hierarchy and resource-level
//! role bindings are normalized into a small relational store that can be queried
//! offline or exported to CSV. All modules are exposed for integration tests.

pub mod entities;
pub mod errors;
pub mod export;
pub mod membership;
pub mod model;
pub mod normalize;
pub mod settings;
pub mod sources;
pub mod storage;
pub mod sync;
pub mod upload;
