use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use iam_inventory::settings::Settings;
use iam_inventory::sources::gcp::GcpClient;
use iam_inventory::sync::{run_sync, SyncScope};
use iam_inventory::upload::{upload_path, GcsObjectStore};
use iam_inventory::{export, storage};
use miette::{miette, Result};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "iam-inventory",
    version,
    about = "Snapshot Google Cloud IAM configuration into a relational store"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch roles, principals, hierarchy and bindings into the store
    Dump {
        #[arg(long, env = "GCP_ORGANIZATION_ID")]
        organization_id: Option<String>,
        #[arg(long, env = "WORKSPACE_CUSTOMER_ID")]
        workspace_customer_id: Option<String>,
        #[arg(long, env = "GCP_QUOTA_PROJECT_ID")]
        quota_project_id: Option<String>,
        #[arg(long)]
        database_url: Option<String>,
    },
    /// Write every table of the store as CSV
    Export {
        #[arg(long)]
        database_url: Option<String>,
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
    /// Upload a file or a flat directory to a Cloud Storage bucket
    Upload {
        #[arg(long)]
        bucket: Option<String>,
        #[arg(long)]
        src_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let mut settings = Settings::load(&cli.config)?;

    match cli.command {
        Command::Dump {
            organization_id,
            workspace_customer_id,
            quota_project_id,
            database_url,
        } => {
            if organization_id.is_some() {
                settings.gcp.organization_id = organization_id;
            }
            if workspace_customer_id.is_some() {
                settings.gcp.workspace_customer_id = workspace_customer_id;
            }
            if quota_project_id.is_some() {
                settings.gcp.quota_project_id = quota_project_id;
            }
            if let Some(url) = database_url {
                settings.database.url = url;
            }
            dump(settings).await
        }
        Command::Export {
            database_url,
            export_dir,
        } => {
            if let Some(url) = database_url {
                settings.database.url = url;
            }
            if let Some(dir) = export_dir {
                settings.export.dir = dir;
            }
            let db = storage::open(&settings.database).await?;
            let written = export::export_tables(&db, &settings.export.dir).await?;
            tracing::info!(files = written.len(), "Export finished");
            Ok(())
        }
        Command::Upload { bucket, src_path } => {
            if bucket.is_some() {
                settings.upload.bucket = bucket;
            }
            if let Some(path) = src_path {
                settings.upload.src_path = path;
            }
            upload(settings).await
        }
    }
}

async fn dump(settings: Settings) -> Result<()> {
    let organization_id = settings
        .gcp
        .organization_id
        .clone()
        .ok_or_else(|| miette!("organization id is required (--organization-id)"))?;
    let customer_id = settings
        .gcp
        .workspace_customer_id
        .clone()
        .ok_or_else(|| miette!("workspace customer id is required (--workspace-customer-id)"))?;
    let quota_project_id = settings
        .gcp
        .quota_project_id
        .clone()
        .ok_or_else(|| miette!("quota project id is required (--quota-project-id)"))?;

    let token = settings.access_token()?;
    let client = GcpClient::new(
        token,
        Some(quota_project_id),
        settings.gcp.endpoints.clone(),
    )?;

    // init storage (database)
    let db = storage::init(&settings.database).await?;

    let scope = SyncScope::new(organization_id, customer_id);
    let report = run_sync(&db, &client, Arc::new(client.clone()), &scope).await?;

    if !report.failed_groups.is_empty() {
        tracing::warn!(
            groups = ?report.failed_groups,
            "Some group memberships could not be listed"
        );
    }
    tracing::info!(?report, "Dump finished");
    Ok(())
}

async fn upload(settings: Settings) -> Result<()> {
    let bucket = settings
        .upload
        .bucket
        .clone()
        .ok_or_else(|| miette!("bucket is required (--bucket)"))?;
    let token = settings.access_token()?;
    let store = GcsObjectStore::new(settings.upload.endpoint.clone(), bucket, token)?;

    let uploaded = upload_path(&store, &settings.upload.src_path).await?;
    tracing::info!(objects = uploaded.len(), "Upload finished");
    Ok(())
}
