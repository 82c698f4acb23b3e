//! In-process gateway backends.
//!
//! Used by the test suites of the session store, pipeline, wipe, and review
//! modules, and handy for local development without a reachable platform.
//! Both stores serialize access behind a mutex the way the platform serializes
//! operations on the same key/path.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use crate::errors::AppError;
use crate::gateway::{BlobHandle, BlobStore, RecordStore};

/// Blob store holding payloads in a `BTreeMap` keyed by path.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, (String, Bytes)>>,
    counter: Mutex<u64>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, bytes: Bytes, name: &str) -> Result<BlobHandle, AppError> {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let path = format!("uploads/{counter:04}-{name}");
        drop(counter);

        let size = bytes.len() as u64;
        self.blobs
            .lock()
            .unwrap()
            .insert(path.clone(), (name.to_string(), bytes));

        Ok(BlobHandle {
            path,
            name: name.to_string(),
            size,
            modified: Some(Utc::now()),
        })
    }

    async fn read(&self, path: &str) -> Result<Bytes, AppError> {
        self.blobs
            .lock()
            .unwrap()
            .get(path)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| AppError::Storage(format!("no blob at {path}")))
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.blobs
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| AppError::Storage(format!("no blob at {path}")))
    }

    async fn list(&self, dir: &str) -> Result<Vec<BlobHandle>, AppError> {
        let blobs = self.blobs.lock().unwrap();
        Ok(blobs
            .iter()
            .filter(|(path, _)| path.starts_with(dir))
            .map(|(path, (name, bytes))| BlobHandle {
                path: path.clone(),
                name: name.clone(),
                size: bytes.len() as u64,
                modified: None,
            })
            .collect())
    }
}

/// Record store over a plain map. `flush` drops every key, matching the
/// namespace-wide contract of the platform's key-value capability.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<String, String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        self.records.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn flush(&self) -> Result<(), AppError> {
        self.records.lock().unwrap().clear();
        Ok(())
    }
}
