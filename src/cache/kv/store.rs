//! Backend-agnostic key-value store abstraction for the slow tier.
//!
//! Concrete backend is Redis (`ConnectionManager`); an in-process fake
//! backs the unit tests for the chunked-format logic above it.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

#[derive(Debug, Clone)]
pub enum KvError {
    Connection(String),
    Backend(String),
}

impl std::fmt::Display for KvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KvError::Connection(msg) => write!(f, "kv store connection error: {}", msg),
            KvError::Backend(msg) => write!(f, "kv store backend error: {}", msg),
        }
    }
}

impl std::error::Error for KvError {}

/// The minimal operations the chunked-KV format needs from a backend.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn set(&self, key: &str, value: Bytes, ttl_ms: u64) -> Result<(), KvError>;
    async fn get(&self, key: &str) -> Result<Option<Bytes>, KvError>;
    async fn delete(&self, key: &str) -> Result<(), KvError>;
}

/// Redis-backed implementation. Values are stored as plain strings with
/// `SET ... PX <ttl_ms>`.
pub struct RedisKvStore {
    connection: ConnectionManager,
}

impl RedisKvStore {
    pub async fn connect(redis_url: &str) -> Result<Self, KvError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| KvError::Connection(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| KvError::Connection(e.to_string()))?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn set(&self, key: &str, value: Bytes, ttl_ms: u64) -> Result<(), KvError> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value.to_vec(), ttl_ms.max(1) / 1000 + 1)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, KvError> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(|e| KvError::Backend(e.to_string()))?;
        Ok(value.map(Bytes::from))
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key).await.map_err(|e| KvError::Backend(e.to_string()))
    }
}

/// In-process fake, used by the write/read unit tests without a live
/// Redis instance.
#[derive(Default)]
pub struct FakeKvStore {
    entries: Mutex<HashMap<String, Bytes>>,
}

impl FakeKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl KvStore for FakeKvStore {
    async fn set(&self, key: &str, value: Bytes, _ttl_ms: u64) -> Result<(), KvError> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, KvError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_store_round_trips_a_value() {
        let store = FakeKvStore::new();
        store.set("k", Bytes::from_static(b"hello"), 60_000).await.unwrap();
        let got = store.get("k").await.unwrap();
        assert_eq!(got, Some(Bytes::from_static(b"hello")));
    }

    #[tokio::test]
    async fn fake_store_miss_returns_none() {
        let store = FakeKvStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn fake_store_delete_removes_entry() {
        let store = FakeKvStore::new();
        store.set("k", Bytes::from_static(b"v"), 60_000).await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
