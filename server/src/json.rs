use std::io;
use std::path::{Path, PathBuf};

use kernel::UploadRecord;
use tokio::fs;

use crate::domain::Storage;
use crate::error::StoreError;

const EMPTY: &str = "[]";

/// Metadata store kept as a single JSON array in one file.
///
/// Every mutation rewrites the whole file. Callers that share a `JsonFile`
/// between requests are expected to serialize access themselves.
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn save(&self, records: &[UploadRecord]) -> Result<(), StoreError> {
        let content = serde_json::to_vec(records)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

impl Storage for JsonFile {
    type Err = StoreError;

    async fn initialize(&self) -> Result<(), Self::Err> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let empty = match fs::metadata(&self.path).await {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };
        if empty {
            fs::write(&self.path, EMPTY).await?;
            tracing::info!("metadata file {} initialized", self.path.display());
        }
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<UploadRecord>, Self::Err> {
        let content = fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&content)?)
    }

    async fn append(&mut self, record: UploadRecord) -> Result<(), Self::Err> {
        let mut records = self.load_all().await?;
        records.push(record);
        self.save(&records).await
    }

    async fn remove(&mut self, file: &str, name: &str) -> Result<UploadRecord, Self::Err> {
        let mut records = self.load_all().await?;
        let index = records
            .iter()
            .position(|r| r.file == file && r.name == name)
            .ok_or(StoreError::NotFound)?;
        let removed = records.remove(index);
        self.save(&records).await?;
        Ok(removed)
    }
}
