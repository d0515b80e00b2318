use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::InventoryError;

/// Environment variable consulted when no access token is configured.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub database: Database,
    #[serde(default)]
    pub gcp: Gcp,
    #[serde(default)]
    pub export: Export,
    #[serde(default)]
    pub upload: Upload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    /// SeaORM/SQLx connection string, e.g. sqlite://iam-inventory.db?mode=rwc
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Gcp {
    /// Numeric Google Cloud organization id, with or without the `organizations/` prefix
    pub organization_id: Option<String>,
    /// Google Workspace / Cloud Identity customer id
    pub workspace_customer_id: Option<String>,
    /// Project billed for Directory API and Cloud Identity API quota
    pub quota_project_id: Option<String>,
    /// OAuth2 bearer token; falls back to GOOGLE_OAUTH_ACCESS_TOKEN
    pub access_token: Option<String>,
    #[serde(default)]
    pub endpoints: Endpoints,
}

/// REST API base URLs. Overridable so tests can target a local server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    pub cloud_asset: String,
    pub iam: String,
    pub cloud_identity: String,
    pub admin_directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    /// Directory receiving one CSV file per table. Recreated on every export.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub bucket: Option<String>,
    /// File or flat directory to upload
    pub src_path: PathBuf,
    /// Cloud Storage base URL
    pub endpoint: String,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: "sqlite://iam-inventory.db?mode=rwc".to_string(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            cloud_asset: "https://cloudasset.googleapis.com/v1".to_string(),
            iam: "https://iam.googleapis.com/v1".to_string(),
            cloud_identity: "https://cloudidentity.googleapis.com/v1".to_string(),
            admin_directory: "https://admin.googleapis.com/admin/directory/v1".to_string(),
        }
    }
}

impl Default for Export {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./export"),
        }
    }
}

impl Default for Upload {
    fn default() -> Self {
        Self {
            bucket: None,
            src_path: PathBuf::from("./export"),
            endpoint: "https://storage.googleapis.com".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        let endpoints = Endpoints::default();
        let mut builder = config::Config::builder()
            .set_default("database.url", Database::default().url)
            .into_diagnostic()?
            .set_default("gcp.endpoints.cloud_asset", endpoints.cloud_asset)
            .into_diagnostic()?
            .set_default("gcp.endpoints.iam", endpoints.iam)
            .into_diagnostic()?
            .set_default("gcp.endpoints.cloud_identity", endpoints.cloud_identity)
            .into_diagnostic()?
            .set_default("gcp.endpoints.admin_directory", endpoints.admin_directory)
            .into_diagnostic()?
            .set_default(
                "export.dir",
                Export::default().dir.to_string_lossy().to_string(),
            )
            .into_diagnostic()?
            .set_default(
                "upload.src_path",
                Upload::default().src_path.to_string_lossy().to_string(),
            )
            .into_diagnostic()?
            .set_default("upload.endpoint", Upload::default().endpoint)
            .into_diagnostic()?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: IAM_INVENTORY__GCP__ORGANIZATION_ID=123, etc.
        builder =
            builder.add_source(config::Environment::with_prefix("IAM_INVENTORY").separator("__"));

        let cfg = builder.build().into_diagnostic()?;
        let s: Settings = cfg.try_deserialize().into_diagnostic()?;
        Ok(s)
    }

    /// Cloud Asset search scope, e.g. `organizations/123456789`.
    pub fn asset_scope(&self) -> Option<String> {
        self.gcp.organization_id.as_deref().map(organization_scope)
    }

    /// The configured access token, or the one exported in the environment.
    pub fn access_token(&self) -> Result<String, InventoryError> {
        self.gcp
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok().filter(|t| !t.is_empty()))
            .ok_or(InventoryError::MissingCredentials)
    }
}

pub fn organization_scope(organization_id: &str) -> String {
    if organization_id.starts_with("organizations/") {
        organization_id.to_string()
    } else {
        format!("organizations/{organization_id}")
    }
}
