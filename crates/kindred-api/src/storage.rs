use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

/// Gallery uploads on local disk.
///
/// Each upload is stored flat as `{dir}/{uuid}_{sanitised name}` and is
/// reachable at `{public_url}/uploads/{file}`.
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
    public_url: String,
}

impl BlobStore {
    pub fn new(dir: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        info!("Upload directory: {}", self.dir.display());
        Ok(())
    }

    /// Write `data` under a fresh unique name and return its public URL.
    pub async fn put(&self, original_name: &str, data: &[u8]) -> Result<String> {
        fs::create_dir_all(&self.dir).await?;

        let file_name = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(original_name));
        let mut file = fs::File::create(self.dir.join(&file_name)).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(self.url_for(&file_name))
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/uploads/{}", self.public_url, file_name)
    }
}

/// Keep only the final path component and replace anything outside
/// `[A-Za-z0-9._-]`, so a client name can never escape the upload dir.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
