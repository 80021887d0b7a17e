//! Redis-backed token-bucket gatekeeper.
//!
//! The bucket state for each key lives in a Redis hash and is updated by a
//! Lua script, so the check-and-consume step is atomic per key and limits
//! hold across gateway replicas.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;

use crate::{Error, Result};

use super::{Decision, Gatekeeper, Key, Limit};

/// Refill up to `burst` tokens at `rate` per `period`, consume one if
/// available, otherwise report the wait until one accrues. Bucket state
/// expires after two idle periods.
const TOKEN_BUCKET: &str = r"
local bucket = redis.call('HMGET', KEYS[1], 'tokens', 'ts')
local rate = tonumber(ARGV[1])
local burst = tonumber(ARGV[2])
local period_ms = tonumber(ARGV[3])
local now_ms = tonumber(ARGV[4])

local tokens = tonumber(bucket[1])
local ts = tonumber(bucket[2])
if tokens == nil then
  tokens = burst
  ts = now_ms
end

local elapsed = math.max(0, now_ms - ts)
tokens = math.min(burst, tokens + elapsed * rate / period_ms)

local allowed = 0
local wait_ms = 0
if tokens >= 1 then
  allowed = 1
  tokens = tokens - 1
else
  wait_ms = math.ceil((1 - tokens) * period_ms / rate)
end

redis.call('HSET', KEYS[1], 'tokens', tokens, 'ts', now_ms)
redis.call('PEXPIRE', KEYS[1], period_ms * 2)

return {allowed, wait_ms}
";

/// [`Gatekeeper`] implementation over a shared Redis instance.
#[derive(Clone)]
pub struct RedisGatekeeper {
    conn: ConnectionManager,
    script: Script,
}

impl RedisGatekeeper {
    /// Connect to Redis at `url` and verify the connection with a ping.
    ///
    /// # Errors
    ///
    /// Returns an error when the connection cannot be established or the
    /// ping fails.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let mut conn = ConnectionManager::new(client).await?;

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        Ok(Self {
            conn,
            script: Script::new(TOKEN_BUCKET),
        })
    }
}

#[async_trait]
impl Gatekeeper for RedisGatekeeper {
    async fn allow(&self, key: &Key, limit: &Limit) -> Result<Decision> {
        let period_ms = limit.period.as_millis();
        if limit.rate == 0 || period_ms == 0 {
            return Err(Error::Internal(format!(
                "invalid limit for bucket {}: rate and period must be positive",
                key.bucket()
            )));
        }

        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let mut conn = self.conn.clone();
        let (allowed, wait_ms): (u64, u64) = self
            .script
            .key(key.bucket())
            .arg(limit.rate)
            .arg(limit.burst)
            .arg(period_ms as u64)
            .arg(now_ms)
            .invoke_async(&mut conn)
            .await?;

        Ok(Decision {
            allowed: allowed == 1,
            retry_after: Duration::from_millis(wait_ms),
        })
    }
}
