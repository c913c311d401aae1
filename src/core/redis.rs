use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, RedisError};
use tokio::sync::RwLock;

const FIXED_WINDOW_SCRIPT: &str = r#"
    local current = redis.call("INCR", KEYS[1])
    if current == 1 then
        redis.call("EXPIRE", KEYS[1], ARGV[1])
    end
    return current
"#;

#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

#[derive(Debug, Clone)]
pub(crate) enum RedisHealth {
    Healthy,
    Disconnected,
    Unhealthy(String),
}

/// Fixed-window limiter buckets.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RateLimitScope<'a> {
    Login(&'a str),
    Run(&'a str),
}

impl RateLimitScope<'_> {
    pub(crate) fn key(&self) -> String {
        match self {
            Self::Login(email) => format!("rl:login:{}", email.to_lowercase()),
            Self::Run(submission_id) => format!("rl:run:{submission_id}"),
        }
    }
}

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::new(RwLock::new(None)) }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let client = Client::open(self.url.clone())?;
        let manager = ConnectionManager::new(client).await?;
        *self.manager.write().await = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        *self.manager.write().await = None;
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let manager = { self.manager.read().await.clone() };
        let Some(mut manager) = manager else {
            return RedisHealth::Disconnected;
        };

        match cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    /// Returns `Ok(true)` while the caller is under `limit` hits per window.
    /// Without a connection every call is allowed.
    pub(crate) async fn rate_limit(
        &self,
        scope: RateLimitScope<'_>,
        limit: u64,
        window_seconds: u64,
    ) -> Result<bool, RedisError> {
        let manager = { self.manager.read().await.clone() };
        let Some(mut manager) = manager else {
            return Ok(true);
        };

        let current: i64 = redis::Script::new(FIXED_WINDOW_SCRIPT)
            .key(scope.key())
            .arg(window_seconds as i64)
            .invoke_async(&mut manager)
            .await?;

        Ok(current <= limit as i64)
    }

    /// Limiter check for request handlers: Redis failures never block a request.
    pub(crate) async fn allow(
        &self,
        scope: RateLimitScope<'_>,
        limit: u64,
        window_seconds: u64,
    ) -> bool {
        match self.rate_limit(scope, limit, window_seconds).await {
            Ok(allowed) => allowed,
            Err(err) => {
                tracing::warn!(error = %err, key = %scope.key(), "Rate limit check failed");
                true
            }
        }
    }
}
