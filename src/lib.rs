pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};
use crate::services::execution::{ExecutionClient, Judge0Service};
use crate::services::testcase_generation::{OpenAiTestcaseGenerator, TestcaseGenerator};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; continuing without rate limits");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let judge0 = Judge0Service::from_settings(&settings)?;
    let execution = ExecutionClient::from_settings(&settings, Arc::new(judge0));

    let generator = OpenAiTestcaseGenerator::from_settings(&settings)?
        .map(|generator| Arc::new(generator) as Arc<dyn TestcaseGenerator>);
    if generator.is_none() {
        tracing::warn!("OPENAI_API_KEY not configured; testcase generation is disabled");
    }

    let state = AppState::new(settings, db_pool, redis.clone(), execution, generator);

    if let Err(err) = core::bootstrap::ensure_superuser(&state).await {
        tracing::error!(error = %err, "Failed to ensure default superuser");
    }
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        judge0 = %state.settings().execution().judge0_url,
        "CodeAssess API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}
