//! Session cache: a disposable, reconstructible projection of user ∪
//! profile, never a source of truth.
//!
//! Write paths that mutate user or profile rows must invalidate before
//! reporting success; the TTL only bounds staleness for readers that forgot.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::store::CachedProfile;

#[async_trait]
pub trait ProfileCache: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<CachedProfile>>;
    async fn set(&self, user_id: Uuid, profile: &CachedProfile, ttl: Duration) -> Result<()>;
    async fn invalidate(&self, user_id: Uuid) -> Result<()>;
}

fn cache_key(user_id: Uuid) -> String {
    format!("user:{user_id}")
}

/// Redis-backed cache used in production.
pub struct RedisCache {
    conn: Arc<RwLock<ConnectionManager>>,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("invalid redis url")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("failed to connect to redis")?;

        Ok(Self {
            conn: Arc::new(RwLock::new(conn)),
        })
    }
}

#[async_trait]
impl ProfileCache for RedisCache {
    async fn get(&self, user_id: Uuid) -> Result<Option<CachedProfile>> {
        let mut conn = self.conn.write().await;
        let value: Option<String> = conn
            .get(cache_key(user_id))
            .await
            .context("failed to read cached profile")?;

        match value {
            Some(json) => {
                let profile = serde_json::from_str(&json)
                    .context("failed to deserialize cached profile")?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, user_id: Uuid, profile: &CachedProfile, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(profile).context("failed to serialize profile")?;
        let mut conn = self.conn.write().await;
        conn.set_ex::<_, _, ()>(cache_key(user_id), json, ttl.as_secs())
            .await
            .context("failed to cache profile")?;
        Ok(())
    }

    async fn invalidate(&self, user_id: Uuid) -> Result<()> {
        let mut conn = self.conn.write().await;
        conn.del::<_, ()>(cache_key(user_id))
            .await
            .context("failed to invalidate cached profile")?;
        Ok(())
    }
}

/// In-process cache for tests and cache-free deployments.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<Uuid, (CachedProfile, Instant)>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileCache for MemoryCache {
    async fn get(&self, user_id: Uuid) -> Result<Option<CachedProfile>> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (_, deadline)| *deadline > Instant::now());
        Ok(entries.get(&user_id).map(|(profile, _)| profile.clone()))
    }

    async fn set(&self, user_id: Uuid, profile: &CachedProfile, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(user_id, (profile.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn invalidate(&self, user_id: Uuid) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.remove(&user_id);
        Ok(())
    }
}
