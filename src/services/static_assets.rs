use crate::error::ServiceError;
use crate::registry::{CapabilityUnavailable, ManagedService, ServiceResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const INDEX_FILE: &str = "index.html";

/// Built frontend bundle served from disk
pub struct StaticAssets {
    dir: PathBuf,
}

impl StaticAssets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }
}

#[async_trait]
impl ManagedService for StaticAssets {
    fn name(&self) -> &str {
        super::STATIC_ASSETS
    }

    async fn probe(&self) -> Result<(), CapabilityUnavailable> {
        match tokio::fs::metadata(&self.dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(CapabilityUnavailable::new(format!(
                "{} is not a directory",
                self.dir.display()
            ))),
            Err(_) => Err(CapabilityUnavailable::new(format!(
                "static directory {} not found",
                self.dir.display()
            ))),
        }
    }

    async fn initialize(&self) -> ServiceResult<()> {
        if tokio::fs::try_exists(self.index_path()).await? {
            info!("Serving frontend from {}", self.dir.display());
        } else {
            warn!(
                "{} has no {}; only /static assets will be served",
                self.dir.display(),
                INDEX_FILE
            );
        }
        Ok(())
    }

    async fn health_check(&self) -> ServiceResult<Option<String>> {
        let meta = tokio::fs::metadata(&self.dir).await.map_err(|e| {
            ServiceError::new(format!("{} unreadable: {}", self.dir.display(), e))
        })?;
        if !meta.is_dir() {
            return Err(ServiceError::new(format!(
                "{} is no longer a directory",
                self.dir.display()
            )));
        }

        let index = tokio::fs::try_exists(self.index_path()).await.unwrap_or(false);
        Ok(Some(if index {
            "index present".to_string()
        } else {
            "index missing".to_string()
        }))
    }
}
