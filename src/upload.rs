//! Uploads export files to object storage.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::errors::InventoryError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, name: &str, data: Vec<u8>) -> Result<(), InventoryError>;
}

/// Cloud Storage bucket written through the JSON API media upload.
pub struct GcsObjectStore {
    http: Client,
    endpoint: String,
    bucket: String,
    access_token: String,
}

impl GcsObjectStore {
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, InventoryError> {
        let http = Client::builder()
            .user_agent(concat!("iam-inventory/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            access_token: access_token.into(),
        })
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn put_object(&self, name: &str, data: Vec<u8>) -> Result<(), InventoryError> {
        let url = format!("{}/upload/storage/v1/b/{}/o", self.endpoint, self.bucket);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "media"), ("name", name)])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InventoryError::Remote {
                operation: format!("upload gs://{}/{}", self.bucket, name),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

async fn upload_file(
    store: &dyn ObjectStore,
    path: &Path,
    name: String,
) -> Result<String, InventoryError> {
    let data = tokio::fs::read(path).await?;
    let size = data.len();
    store.put_object(&name, data).await?;
    info!(object = %name, bytes = size, "Uploaded file");
    Ok(name)
}

fn object_name(path: &Path) -> Result<String, InventoryError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| InventoryError::Other(format!("No file name in {}", path.display())))
}

/// Upload a single file under its base name, or every regular file directly
/// inside a directory under its file name. Subdirectories are skipped.
///
/// Returns the uploaded object names.
pub async fn upload_path(
    store: &dyn ObjectStore,
    path: &Path,
) -> Result<Vec<String>, InventoryError> {
    let metadata = tokio::fs::metadata(path).await?;
    if !metadata.is_dir() {
        let name = object_name(path)?;
        return Ok(vec![upload_file(store, path, name).await?]);
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        } else {
            debug!(path = %entry.path().display(), "Skipping non-file entry");
        }
    }
    files.sort();

    let mut uploaded = Vec::with_capacity(files.len());
    for file in files {
        let name = object_name(&file)?;
        uploaded.push(upload_file(store, &file, name).await?);
    }
    Ok(uploaded)
}
