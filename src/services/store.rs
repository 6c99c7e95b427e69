//! Keyed job state. The single source of truth for pollers.
//!
//! Writers never need a store-wide lock: each transition is validated against
//! the job's current status and committed under that job's own guard (a map
//! entry lock in memory, a compare-and-set script in Redis). Writes against a
//! terminal job are rejected.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::models::job::{Job, JobUpdate, TransitionError};

const JOB_PREFIX: &str = "content_gen:job:";

/// Only overwrite when the stored status is still the one the caller read.
const CAS_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
  return -1
end
if cjson.decode(current)['status'] ~= ARGV[1] then
  return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'KEEPTTL')
return 1
"#;

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert `job` unless its id exists. Returns `false` if it did.
    async fn create(&self, job: &Job) -> Result<bool, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Apply a monotonic update and return the new snapshot.
    async fn transition(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError>;

    /// Remove a job that never reached the broker.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// In-process store for mock mode and tests.
#[derive(Default)]
pub struct InMemoryResultStore {
    jobs: DashMap<Uuid, Job>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn create(&self, job: &Job) -> Result<bool, StoreError> {
        match self.jobs.entry(job.id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(job.clone());
                Ok(true)
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.get(&id).map(|job| job.clone()))
    }

    async fn transition(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError> {
        let mut job = self.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        job.apply(update)?;
        Ok(job.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.jobs.remove(&id);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Redis store: one JSON document per job, expiring after `ttl_secs`.
pub struct RedisResultStore {
    client: redis::Client,
    ttl_secs: u64,
    cas: redis::Script,
}

impl RedisResultStore {
    pub fn new(redis_url: &str, ttl_secs: u64) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(StoreError::Redis)?;
        Ok(Self {
            client,
            ttl_secs,
            cas: redis::Script::new(CAS_SCRIPT),
        })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::Redis)
    }

    fn key(id: Uuid) -> String {
        format!("{JOB_PREFIX}{id}")
    }
}

#[async_trait]
impl ResultStore for RedisResultStore {
    async fn create(&self, job: &Job) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(job)?;
        let created: Option<String> = redis::cmd("SET")
            .arg(Self::key(job.id))
            .arg(payload)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await?;
        Ok(created.is_some())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn.get(Self::key(id)).await?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(StoreError::from))
            .transpose()
    }

    async fn transition(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError> {
        let mut job = self.get(id).await?.ok_or(StoreError::NotFound(id))?;
        let read_status = job.status;
        job.apply(update)?;

        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(&job)?;
        let outcome: i64 = self
            .cas
            .key(Self::key(id))
            .arg(read_status.to_string())
            .arg(payload)
            .invoke_async(&mut conn)
            .await?;

        match outcome {
            1 => Ok(job),
            0 => Err(StoreError::Conflict(id)),
            _ => Err(StoreError::NotFound(id)),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(Self::key(id)).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Job {0} was modified concurrently")]
    Conflict(Uuid),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
