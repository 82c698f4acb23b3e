//! Bulk deletion of everything the engine has stored: every blob, then the
//! whole record namespace.
//!
//! Two-phase but not transactional. Deletes run sequentially and the first
//! failure aborts the whole operation, including the flush: a partial wipe
//! keeps its records so the surviving blobs stay enumerable, instead of
//! flushing and stranding them with nothing pointing at them.

use tracing::{info, warn};

use crate::errors::AppError;
use crate::gateway::{BlobStore as _, Gateway, RecordStore as _};

/// What a completed wipe removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WipeReport {
    pub blobs_deleted: usize,
    pub records_flushed: bool,
}

/// Deletes every stored blob, then flushes the record namespace.
pub async fn wipe_all(gateway: &Gateway) -> Result<WipeReport, AppError> {
    let blobs = gateway.blobs.list("").await?;
    info!(count = blobs.len(), "wiping stored blobs");

    let mut blobs_deleted = 0;
    for blob in &blobs {
        if let Err(err) = gateway.blobs.delete(&blob.path).await {
            warn!(path = %blob.path, error = %err, "wipe aborted mid-delete");
            return Err(err);
        }
        blobs_deleted += 1;
    }

    gateway.records.flush().await?;
    info!(blobs_deleted, "wipe complete");

    Ok(WipeReport {
        blobs_deleted,
        records_flushed: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::{MemoryBlobStore, MemoryRecordStore};
    use crate::gateway::{BlobHandle, BlobStore, Identity, Inference, PlatformProbe, RecordStore};
    use crate::models::User;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::{Arc, Mutex};

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

    /// Blob store whose Nth delete fails.
    struct FlakyDeleteStore {
        inner: MemoryBlobStore,
        fail_delete_call: usize,
        deletes: Mutex<usize>,
    }

    #[async_trait]
    impl BlobStore for FlakyDeleteStore {
        async fn upload(&self, bytes: Bytes, name: &str) -> Result<BlobHandle, AppError> {
            self.inner.upload(bytes, name).await
        }

        async fn read(&self, path: &str) -> Result<Bytes, AppError> {
            self.inner.read(path).await
        }

        async fn delete(&self, path: &str) -> Result<(), AppError> {
            let call = {
                let mut deletes = self.deletes.lock().unwrap();
                *deletes += 1;
                *deletes
            };
            if call == self.fail_delete_call {
                return Err(AppError::Storage("delete refused".into()));
            }
            self.inner.delete(path).await
        }

        async fn list(&self, dir: &str) -> Result<Vec<BlobHandle>, AppError> {
            self.inner.list(dir).await
        }
    }

    fn gateway_with(
        blobs: Arc<dyn BlobStore>,
        records: Arc<MemoryRecordStore>,
    ) -> Gateway {
        Gateway {
            probe: Arc::new(AlwaysUp),
            identity: Arc::new(SignedIn),
            blobs,
            records,
            inference: Arc::new(NoInference),
        }
    }

    async fn seed_blobs(blobs: &dyn BlobStore, count: usize) {
        for i in 0..count {
            blobs
                .upload(Bytes::from_static(b"%PDF- payload"), &format!("file-{i}.pdf"))
                .await
                .unwrap();
        }
    }

    async fn seed_records(records: &MemoryRecordStore, count: usize) {
        for i in 0..count {
            records
                .set(&format!("record:{i}"), "{\"status\":\"pending\"}")
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_wipe_deletes_all_blobs_then_flushes_records() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let records = Arc::new(MemoryRecordStore::new());
        seed_blobs(blobs.as_ref(), 3).await;
        seed_records(&records, 5).await;

        let report = wipe_all(&gateway_with(blobs.clone(), records.clone()))
            .await
            .unwrap();

        assert_eq!(
            report,
            WipeReport {
                blobs_deleted: 3,
                records_flushed: true,
            }
        );
        assert!(blobs.is_empty());
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_aborts_before_flush() {
        // 3 blobs, 5 records, the second delete fails: exactly one blob is
        // gone, the error surfaces, and the flush never runs.
        let blobs = Arc::new(FlakyDeleteStore {
            inner: MemoryBlobStore::new(),
            fail_delete_call: 2,
            deletes: Mutex::new(0),
        });
        let records = Arc::new(MemoryRecordStore::new());
        seed_blobs(&blobs.inner, 3).await;
        seed_records(&records, 5).await;

        let err = wipe_all(&gateway_with(blobs.clone(), records.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(blobs.inner.len(), 2);
        assert_eq!(records.len(), 5);
    }

    #[tokio::test]
    async fn test_wipe_of_empty_store_reports_zero() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let records = Arc::new(MemoryRecordStore::new());

        let report = wipe_all(&gateway_with(blobs, records)).await.unwrap();

        assert_eq!(report.blobs_deleted, 0);
        assert!(report.records_flushed);
    }
}
