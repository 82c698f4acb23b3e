//! Loads a persisted analysis for display: the record plus both stored blobs,
//! materialized as local files.
//!
//! Materialized blobs follow a scoped-acquisition discipline: acquired on
//! successful read, backed by a named temp file, and released when the value
//! drops — on normal teardown and on every early-exit path alike.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::gateway::{BlobStore as _, Gateway, RecordStore as _};
use crate::models::{record_key, AnalysisRecord};

/// A blob copied to local disk for display. The backing file is deleted when
/// this value drops.
#[derive(Debug)]
pub struct MaterializedBlob {
    file: NamedTempFile,
    size: u64,
}

impl MaterializedBlob {
    fn from_bytes(bytes: &[u8]) -> Result<Self, AppError> {
        let mut file = NamedTempFile::new()
            .map_err(|e| AppError::Storage(format!("materialize blob: {e}")))?;
        file.write_all(bytes)
            .and_then(|()| file.flush())
            .map_err(|e| AppError::Storage(format!("materialize blob: {e}")))?;

        Ok(Self {
            file,
            size: bytes.len() as u64,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// One loaded analysis, ready for display.
#[derive(Debug)]
pub struct RecordView {
    pub record: AnalysisRecord,
    pub resume: MaterializedBlob,
    pub image: MaterializedBlob,
}

/// Fetches and decodes a record. Absent key → `None`.
pub async fn load_record(
    gateway: &Gateway,
    id: Uuid,
) -> Result<Option<AnalysisRecord>, AppError> {
    let raw = match gateway.records.get(&record_key(id)).await? {
        Some(raw) => raw,
        None => return Ok(None),
    };

    let record: AnalysisRecord = serde_json::from_str(&raw)
        .map_err(|e| AppError::Storage(format!("corrupt record {id}: {e}")))?;
    Ok(Some(record))
}

/// Fetches a record and materializes both of its blobs. If any read fails,
/// whatever was already materialized is released before the error returns.
pub async fn load_view(gateway: &Gateway, id: Uuid) -> Result<Option<RecordView>, AppError> {
    let record = match load_record(gateway, id).await? {
        Some(record) => record,
        None => return Ok(None),
    };

    let resume_bytes = gateway.blobs.read(&record.resume_blob_path).await?;
    let resume = MaterializedBlob::from_bytes(&resume_bytes)?;

    let image_bytes = gateway.blobs.read(&record.image_blob_path).await?;
    let image = MaterializedBlob::from_bytes(&image_bytes)?;

    debug!(
        id = %id,
        resume_bytes = resume.size(),
        image_bytes = image.size(),
        "materialized record view"
    );

    Ok(Some(RecordView {
        record,
        resume,
        image,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::{MemoryBlobStore, MemoryRecordStore};
    use crate::gateway::{BlobStore, Identity, Inference, PlatformProbe, RecordStore};
    use crate::models::{AnalysisOutcome, User};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Arc;

    struct AlwaysUp;

    #[async_trait]
    impl PlatformProbe for AlwaysUp {
        async fn check(&self) -> Result<(), AppError> {
            Ok(())
        }
    }

    struct SignedIn;

    #[async_trait]
    impl Identity for SignedIn {
        async fn is_signed_in(&self) -> Result<bool, AppError> {
            Ok(true)
        }
        async fn current_user(&self) -> Result<User, AppError> {
            Ok(User::new("ada"))
        }
        async fn sign_in(&self) -> Result<(), AppError> {
            Ok(())
        }
        async fn sign_out(&self) -> Result<(), AppError> {
            Ok(())
        }
    }

    struct NoInference;

    #[async_trait]
    impl Inference for NoInference {
        async fn score(&self, _blob_path: &str, _instructions: &str) -> Result<String, AppError> {
            Err(AppError::Inference("not configured".into()))
        }
    }

    fn memory_gateway() -> Gateway {
        Gateway {
            probe: Arc::new(AlwaysUp),
            identity: Arc::new(SignedIn),
            blobs: Arc::new(MemoryBlobStore::new()),
            records: Arc::new(MemoryRecordStore::new()),
            inference: Arc::new(NoInference),
        }
    }

    async fn seed_record(gateway: &Gateway, with_image_blob: bool) -> Uuid {
        let resume = gateway
            .blobs
            .upload(Bytes::from_static(b"%PDF- resume bytes"), "resume.pdf")
            .await
            .unwrap();
        let image_path = if with_image_blob {
            gateway
                .blobs
                .upload(Bytes::from_static(b"\x89PNG image bytes"), "resume.png")
                .await
                .unwrap()
                .path
        } else {
            "uploads/missing.png".to_string()
        };

        let record = AnalysisRecord {
            id: Uuid::new_v4(),
            resume_blob_path: resume.path,
            image_blob_path: image_path,
            company_name: "Acme".to_string(),
            job_title: "Engineer".to_string(),
            job_description: "Build things".to_string(),
            outcome: AnalysisOutcome::Pending,
        };
        gateway
            .records
            .set(
                &record_key(record.id),
                &serde_json::to_string(&record).unwrap(),
            )
            .await
            .unwrap();
        record.id
    }

    #[tokio::test]
    async fn test_load_view_materializes_both_blobs() {
        let gateway = memory_gateway();
        let id = seed_record(&gateway, true).await;

        let view = load_view(&gateway, id).await.unwrap().unwrap();

        assert_eq!(view.record.id, id);
        assert!(view.resume.path().exists());
        assert!(view.image.path().exists());
        assert_eq!(
            std::fs::read(view.resume.path()).unwrap(),
            b"%PDF- resume bytes"
        );
        assert_eq!(view.resume.size(), 18);
    }

    #[tokio::test]
    async fn test_dropping_view_releases_materialized_files() {
        let gateway = memory_gateway();
        let id = seed_record(&gateway, true).await;

        let view = load_view(&gateway, id).await.unwrap().unwrap();
        let resume_path = view.resume.path().to_path_buf();
        let image_path = view.image.path().to_path_buf();
        assert!(resume_path.exists());
        assert!(image_path.exists());

        drop(view);

        assert!(!resume_path.exists());
        assert!(!image_path.exists());
    }

    #[tokio::test]
    async fn test_missing_record_loads_as_none() {
        let gateway = memory_gateway();
        assert!(load_view(&gateway, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_image_blob_fails_after_releasing_resume() {
        let gateway = memory_gateway();
        let id = seed_record(&gateway, false).await;

        let err = load_view(&gateway, id).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_a_storage_error() {
        let gateway = memory_gateway();
        let id = Uuid::new_v4();
        gateway
            .records
            .set(&record_key(id), "not json at all")
            .await
            .unwrap();

        let err = load_record(&gateway, id).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
