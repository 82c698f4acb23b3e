//! Typed capability surface over the remote platform.
//!
//! Four capability groups (identity, blobs, records, inference) plus a cheap
//! reachability probe, each behind a minimal trait so alternate backends can
//! be substituted without touching the session store or the pipeline. This
//! module carries no behavior of its own.

pub mod memory;
pub mod redis;
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::User;

/// Handle returned by blob stores on upload and list; opaque identity used
/// for later read/delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobHandle {
    pub path: String,
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Reachability probe used by the session bootstrap poll. Must be cheap and
/// side-effect free.
#[async_trait]
pub trait PlatformProbe: Send + Sync {
    async fn check(&self) -> Result<(), AppError>;
}

/// Identity capability: sign-in/out and current-user lookup.
#[async_trait]
pub trait Identity: Send + Sync {
    async fn is_signed_in(&self) -> Result<bool, AppError>;
    async fn current_user(&self) -> Result<User, AppError>;
    async fn sign_in(&self) -> Result<(), AppError>;
    async fn sign_out(&self) -> Result<(), AppError>;
}

/// Blob storage capability.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, bytes: Bytes, name: &str) -> Result<BlobHandle, AppError>;
    async fn read(&self, path: &str) -> Result<Bytes, AppError>;
    async fn delete(&self, path: &str) -> Result<(), AppError>;
    /// Lists blobs under `dir`; an empty `dir` lists the whole namespace.
    async fn list(&self, dir: &str) -> Result<Vec<BlobHandle>, AppError>;
}

/// Key-value record capability.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    /// Clears EVERY key in the namespace, not just keys the caller wrote.
    async fn flush(&self) -> Result<(), AppError>;
}

/// Inference capability. Submits a stored document plus an instruction
/// template and returns the model's raw feedback payload; parsing that payload
/// into a `Feedback` value is the caller's step.
#[async_trait]
pub trait Inference: Send + Sync {
    async fn score(&self, blob_path: &str, instructions: &str) -> Result<String, AppError>;
}

/// Aggregate of one backend per capability, cloned freely and shared across
/// the session store, the pipeline, and the wipe/review operations.
#[derive(Clone)]
pub struct Gateway {
    pub probe: Arc<dyn PlatformProbe>,
    pub identity: Arc<dyn Identity>,
    pub blobs: Arc<dyn BlobStore>,
    pub records: Arc<dyn RecordStore>,
    pub inference: Arc<dyn Inference>,
}
