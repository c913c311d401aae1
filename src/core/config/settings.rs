use super::parsing::{
    env_optional, env_or_default, is_http_url, parse_bool, parse_cors_origins, parse_environment,
    parse_u16, parse_u32, parse_u64, parse_usize,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, AiSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings,
    ExecutionSettings, GenerationSettings, RedisSettings, RuntimeSettings, SecuritySettings,
    ServerHost, ServerPort, ServerSettings, Settings, SubmissionSettings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("CODEASSESS_HOST", "0.0.0.0");
        let port = env_or_default("CODEASSESS_PORT", "4000");

        let environment = parse_environment(
            env_optional("CODEASSESS_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("CODEASSESS_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "CodeAssess API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "codeassess");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "codeassess_db");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let judge0_url = env_or_default("JUDGE0_URL", "http://localhost:2358");
        let judge0_key = env_or_default("JUDGE0_KEY", "");
        let judge0_host = env_or_default("JUDGE0_HOST", "");
        let poll_interval_ms =
            parse_u64("JUDGE0_POLL_INTERVAL_MS", env_or_default("JUDGE0_POLL_INTERVAL_MS", "500"))?;
        let poll_timeout_seconds = parse_u64(
            "JUDGE0_POLL_TIMEOUT_SECONDS",
            env_or_default("JUDGE0_POLL_TIMEOUT_SECONDS", "20"),
        )?;
        let request_timeout_seconds = parse_u64(
            "JUDGE0_REQUEST_TIMEOUT_SECONDS",
            env_or_default("JUDGE0_REQUEST_TIMEOUT_SECONDS", "10"),
        )?;

        let openai_api_key = env_or_default("OPENAI_API_KEY", "");
        let openai_base_url = env_or_default("OPENAI_BASE_URL", "");
        let ai_model = env_or_default("AI_MODEL", "gpt-4o-mini");
        let ai_max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "2000"))?;
        let ai_request_timeout =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "120"))?;

        let run_delay_ms = parse_u64(
            "GENERATION_RUN_DELAY_MS",
            env_or_default("GENERATION_RUN_DELAY_MS", "500"),
        )?;
        let visible_quota = parse_usize(
            "GENERATION_VISIBLE_QUOTA",
            env_or_default("GENERATION_VISIBLE_QUOTA", "3"),
        )?;
        let default_normal_count = parse_usize(
            "GENERATION_NORMAL_COUNT",
            env_or_default("GENERATION_NORMAL_COUNT", "3"),
        )?;
        let default_edge_count =
            parse_usize("GENERATION_EDGE_COUNT", env_or_default("GENERATION_EDGE_COUNT", "2"))?;
        let default_random_count = parse_usize(
            "GENERATION_RANDOM_COUNT",
            env_or_default("GENERATION_RANDOM_COUNT", "2"),
        )?;

        let run_rate_limit =
            parse_u64("RUN_RATE_LIMIT", env_or_default("RUN_RATE_LIMIT", "10"))?;
        let run_rate_window_seconds = parse_u64(
            "RUN_RATE_WINDOW_SECONDS",
            env_or_default("RUN_RATE_WINDOW_SECONDS", "60"),
        )?;

        let first_superuser_email =
            env_or_default("FIRST_SUPERUSER_EMAIL", "admin@codeassess.local");
        let first_superuser_password = env_or_default("FIRST_SUPERUSER_PASSWORD", "");
        let first_superuser_name = env_or_default("FIRST_SUPERUSER_NAME", "Administrator");

        let log_level = env_or_default("CODEASSESS_LOG_LEVEL", "info");
        let json = env_optional("CODEASSESS_LOG_JSON")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);
        let prometheus_enabled = env_optional("PROMETHEUS_ENABLED")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            execution: ExecutionSettings {
                judge0_url,
                judge0_key,
                judge0_host,
                poll_interval_ms,
                poll_timeout_seconds,
                request_timeout_seconds,
            },
            ai: AiSettings {
                openai_api_key,
                openai_base_url,
                ai_model,
                ai_max_tokens,
                ai_request_timeout,
            },
            generation: GenerationSettings {
                run_delay_ms,
                visible_quota,
                default_normal_count,
                default_edge_count,
                default_random_count,
            },
            submission: SubmissionSettings { run_rate_limit, run_rate_window_seconds },
            admin: AdminSettings {
                first_superuser_email,
                first_superuser_password,
                first_superuser_name,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn execution(&self) -> &ExecutionSettings {
        &self.execution
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn generation(&self) -> &GenerationSettings {
        &self.generation
    }

    pub(crate) fn submission(&self) -> &SubmissionSettings {
        &self.submission
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !is_http_url(&self.execution.judge0_url) {
            return Err(ConfigError::InvalidValue {
                field: "JUDGE0_URL",
                value: self.execution.judge0_url.clone(),
            });
        }

        if self.execution.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "JUDGE0_POLL_INTERVAL_MS",
                value: "0".to_string(),
            });
        }

        if self.execution.poll_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "JUDGE0_POLL_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.submission.run_rate_window_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RUN_RATE_WINDOW_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if super::parsing::env_optional("JUDGE0_URL").is_none() {
            return Err(ConfigError::MissingSecret("JUDGE0_URL"));
        }
        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.admin.first_superuser_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_SUPERUSER_PASSWORD"));
        }

        Ok(())
    }
}
