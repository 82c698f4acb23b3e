//! S3/MinIO-backed blob store, the self-hosted alternative to the platform's
//! file capability. Selected via `BLOB_BACKEND=s3`.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use chrono::DateTime;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::gateway::{BlobHandle, BlobStore};

pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, bytes: Bytes, name: &str) -> Result<BlobHandle, AppError> {
        // Prefix with a fresh UUID so repeated uploads of the same file name
        // never overwrite each other.
        let key = format!("uploads/{}-{name}", Uuid::new_v4());
        let size = bytes.len() as u64;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("put_object {key}: {e}")))?;

        debug!(key, size, "uploaded blob to s3");

        Ok(BlobHandle {
            path: key,
            name: name.to_string(),
            size,
            modified: None,
        })
    }

    async fn read(&self, path: &str) -> Result<Bytes, AppError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("get_object {path}: {e}")))?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("read body {path}: {e}")))?;

        Ok(data.into_bytes())
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("delete_object {path}: {e}")))?;

        Ok(())
    }

    async fn list(&self, dir: &str) -> Result<Vec<BlobHandle>, AppError> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(dir)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("list_objects {dir}: {e}")))?;

        let handles = response
            .contents()
            .iter()
            .filter_map(|object| {
                let path = object.key()?.to_string();
                let name = path.rsplit('/').next().unwrap_or(&path).to_string();
                Some(BlobHandle {
                    name,
                    size: object.size().unwrap_or(0).max(0) as u64,
                    modified: object.last_modified().and_then(|t| {
                        DateTime::from_timestamp(t.secs(), t.subsec_nanos())
                    }),
                    path,
                })
            })
            .collect();

        Ok(handles)
    }
}
