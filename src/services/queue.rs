use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::content::ContentRequest;

const QUEUE_KEY: &str = "content_gen:jobs";
const PROCESSING_KEY: &str = "content_gen:processing";
const DEDUP_PREFIX: &str = "content_gen:dedup:";

/// Claim the dedup key and push in one step, so a failed push never leaves
/// a claimed id behind.
const ENQUEUE_SCRIPT: &str = r#"
if redis.call('SET', KEYS[1], 1, 'NX', 'EX', ARGV[1]) then
  redis.call('LPUSH', KEYS[2], ARGV[2])
  return 1
end
return 0
"#;

/// Message handed from the gateway to a worker, keyed by `job_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub job_id: Uuid,
    pub request: ContentRequest,
    pub provider_name: String,
}

/// Durable hand-off between submission and execution.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Enqueue `job`. Returns `false` when a message with the same id was
    /// already accepted, in which case nothing is enqueued.
    async fn enqueue(&self, job: &QueuedJob) -> Result<bool, QueueError>;

    /// Take the next message, if any, without waiting.
    async fn dequeue(&self) -> Result<Option<QueuedJob>, QueueError>;

    /// Acknowledge a dequeued message.
    async fn complete(&self, job: &QueuedJob) -> Result<(), QueueError>;

    /// Messages waiting to be picked up.
    async fn depth(&self) -> Result<u64, QueueError>;

    async fn health_check(&self) -> Result<(), QueueError>;
}

/// Redis-backed broker with a processing list for in-flight messages.
pub struct RedisBroker {
    client: redis::Client,
    dedup_ttl_secs: u64,
    enqueue: redis::Script,
}

impl RedisBroker {
    pub fn new(redis_url: &str, dedup_ttl_secs: u64) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self {
            client,
            dedup_ttl_secs,
            enqueue: redis::Script::new(ENQUEUE_SCRIPT),
        })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn enqueue(&self, job: &QueuedJob) -> Result<bool, QueueError> {
        let mut conn = self.connection().await?;

        let payload = serde_json::to_string(job).map_err(QueueError::Serialize)?;
        let pushed: i64 = self
            .enqueue
            .key(format!("{DEDUP_PREFIX}{}", job.job_id))
            .key(QUEUE_KEY)
            .arg(self.dedup_ttl_secs)
            .arg(payload)
            .invoke_async(&mut conn)
            .await
            .map_err(QueueError::Redis)?;

        if pushed == 0 {
            tracing::debug!(job_id = %job.job_id, "Duplicate job id, not enqueued");
            return Ok(false);
        }
        Ok(true)
    }

    async fn dequeue(&self) -> Result<Option<QueuedJob>, QueueError> {
        let mut conn = self.connection().await?;
        let result: Option<String> = conn
            .rpoplpush(QUEUE_KEY, PROCESSING_KEY)
            .await
            .map_err(QueueError::Redis)?;

        match result {
            Some(payload) => {
                let job: QueuedJob = serde_json::from_str(&payload).map_err(QueueError::Serialize)?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn complete(&self, job: &QueuedJob) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(job).map_err(QueueError::Serialize)?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.connection().await?;
        let depth: u64 = conn.llen(QUEUE_KEY).await.map_err(QueueError::Redis)?;
        Ok(depth)
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }
}

/// Process-local broker for mock mode and tests.
///
/// Job ids are remembered for `dedup_ttl`, matching the Redis dedup keys.
pub struct InMemoryBroker {
    inner: Mutex<InMemoryQueue>,
    dedup_ttl: Duration,
}

#[derive(Default)]
struct InMemoryQueue {
    pending: VecDeque<QueuedJob>,
    in_flight: Vec<QueuedJob>,
    seen: HashSet<Uuid>,
    /// Insertion order of `seen`, oldest first
    seen_order: VecDeque<(Instant, Uuid)>,
}

impl InMemoryQueue {
    fn forget_expired(&mut self, ttl: Duration) {
        let now = Instant::now();
        while let Some((at, id)) = self.seen_order.front().copied() {
            if now.duration_since(at) < ttl {
                break;
            }
            self.seen_order.pop_front();
            self.seen.remove(&id);
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::with_dedup_ttl(Duration::from_secs(24 * 60 * 60))
    }

    pub fn with_dedup_ttl(dedup_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(InMemoryQueue::default()),
            dedup_ttl,
        }
    }

    /// Messages dequeued but not yet acknowledged.
    pub async fn in_flight(&self) -> usize {
        self.inner.lock().await.in_flight.len()
    }

    /// Job ids currently held for deduplication.
    pub async fn remembered_ids(&self) -> usize {
        let mut queue = self.inner.lock().await;
        queue.forget_expired(self.dedup_ttl);
        queue.seen.len()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn enqueue(&self, job: &QueuedJob) -> Result<bool, QueueError> {
        let mut queue = self.inner.lock().await;
        queue.forget_expired(self.dedup_ttl);
        if !queue.seen.insert(job.job_id) {
            return Ok(false);
        }
        queue.seen_order.push_back((Instant::now(), job.job_id));
        queue.pending.push_back(job.clone());
        Ok(true)
    }

    async fn dequeue(&self) -> Result<Option<QueuedJob>, QueueError> {
        let mut queue = self.inner.lock().await;
        let next = queue.pending.pop_front();
        if let Some(job) = &next {
            queue.in_flight.push(job.clone());
        }
        Ok(next)
    }

    async fn complete(&self, job: &QueuedJob) -> Result<(), QueueError> {
        let mut queue = self.inner.lock().await;
        if let Some(pos) = queue.in_flight.iter().position(|j| j.job_id == job.job_id) {
            queue.in_flight.remove(pos);
        }
        Ok(())
    }

    async fn depth(&self) -> Result<u64, QueueError> {
        Ok(self.inner.lock().await.pending.len() as u64)
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
