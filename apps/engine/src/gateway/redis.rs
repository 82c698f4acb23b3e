//! Redis-backed record store, the self-hosted alternative to the platform's
//! key-value capability. Selected via `RECORD_BACKEND=redis`.
//!
//! `flush` maps to `FLUSHDB`: the whole logical database is cleared, which is
//! exactly the namespace-wide contract of the record store. Point the URL at
//! a dedicated database index; anything else living there will be wiped too.

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::errors::AppError;
use crate::gateway::RecordStore;

pub struct RedisRecordStore {
    client: redis::Client,
}

impl RedisRecordStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, AppError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Storage(format!("redis connect: {e}")))
    }
}

#[async_trait]
impl RecordStore for RedisRecordStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.connection().await?;
        conn.get(key)
            .await
            .map_err(|e| AppError::Storage(format!("redis GET {key}: {e}")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .set(key, value)
            .await
            .map_err(|e| AppError::Storage(format!("redis SET {key}: {e}")))?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), AppError> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Storage(format!("redis FLUSHDB: {e}")))?;
        Ok(())
    }
}
