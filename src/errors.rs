use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum InventoryError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(iam_inventory::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(code(iam_inventory::config))]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(iam_inventory::serde))]
    Serde(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    #[diagnostic(code(iam_inventory::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("Failed to {operation} `{key}`: {source}")]
    #[diagnostic(
        code(iam_inventory::storage),
        help("Ingestion expects a fresh store or one previously written by this tool")
    )]
    Storage {
        operation: &'static str,
        key: String,
        #[source]
        source: sea_orm::DbErr,
    },

    #[error("HTTP error: {0}")]
    #[diagnostic(code(iam_inventory::http))]
    Http(#[from] reqwest::Error),

    #[error("{operation} failed with status {status}: {body}")]
    #[diagnostic(code(iam_inventory::remote))]
    Remote {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("CSV error: {0}")]
    #[diagnostic(code(iam_inventory::csv))]
    Csv(#[from] csv::Error),

    #[error("Unknown hierarchy asset type `{asset_type}` for `{name}`")]
    #[diagnostic(
        code(iam_inventory::unknown_asset_type),
        help("Only organization, folder and project assets can be ingested as hierarchy nodes")
    )]
    UnknownAssetType { asset_type: String, name: String },

    #[error("Malformed {kind}: `{value}`")]
    #[diagnostic(code(iam_inventory::malformed_record))]
    MalformedRecord { kind: &'static str, value: String },

    #[error("No Google Cloud access token configured")]
    #[diagnostic(
        code(iam_inventory::missing_credentials),
        help("Set gcp.access_token, IAM_INVENTORY__GCP__ACCESS_TOKEN or GOOGLE_OAUTH_ACCESS_TOKEN (e.g. from `gcloud auth print-access-token`)")
    )]
    MissingCredentials,

    #[error("{0}")]
    #[diagnostic(code(iam_inventory::other))]
    Other(String),
}

impl InventoryError {
    /// Wrap a storage error with the operation and record key that triggered it.
    pub fn storage(operation: &'static str, key: impl Into<String>, source: sea_orm::DbErr) -> Self {
        InventoryError::Storage {
            operation,
            key: key.into(),
            source,
        }
    }
}
