use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::execution::ExecutionClient;
use crate::services::testcase_generation::TestcaseGenerator;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    execution: ExecutionClient,
    generator: Option<Arc<dyn TestcaseGenerator>>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        redis: RedisHandle,
        execution: ExecutionClient,
        generator: Option<Arc<dyn TestcaseGenerator>>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, redis, execution, generator }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn execution(&self) -> &ExecutionClient {
        &self.inner.execution
    }

    /// `None` when no generator endpoint is configured.
    pub(crate) fn generator(&self) -> Option<&dyn TestcaseGenerator> {
        self.inner.generator.as_deref()
    }
}
