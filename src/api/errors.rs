use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::evaluation::EvaluationError;
use crate::services::execution::ExecutionError;
use crate::services::submission_lifecycle::LifecycleError;
use crate::services::testcase_generation::GenerationError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    code: &'static str,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    Unauthorized(&'static str),
    Forbidden(&'static str),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    /// The execution or generator service failed.
    BadGateway(String),
    /// An execution run did not reach a terminal status in time.
    GatewayTimeout(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::TooManyRequests(_) => "rate_limited",
            Self::BadGateway(_) => "upstream_error",
            Self::GatewayTimeout(_) => "upstream_timeout",
            Self::Internal(_) => "internal_error",
        }
    }

    fn into_detail(self) -> String {
        match self {
            Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::TooManyRequests(message) => message.to_string(),
            Self::BadRequest(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::BadGateway(message)
            | Self::GatewayTimeout(message)
            | Self::Internal(message) => message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let is_auth = matches!(self, Self::Unauthorized(_));

        // Internal errors were already logged with their cause by `ApiError::internal`.
        if let Self::BadGateway(message) | Self::GatewayTimeout(message) = &self {
            tracing::warn!(error = %message, code, "Upstream failure");
        }

        let body = ErrorResponse { status: status.as_u16(), code, detail: self.into_detail() };
        let mut response = (status, Json(body)).into_response();
        if is_auth {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

fn upstream(err: &ExecutionError, message: String) -> ApiError {
    if err.is_indeterminate() {
        ApiError::GatewayTimeout(message)
    } else {
        ApiError::BadGateway(message)
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::ProblemNotFound => Self::NotFound("Problem not found".to_string()),
            LifecycleError::NotFound => Self::NotFound("Submission not found".to_string()),
            LifecycleError::Forbidden => Self::Forbidden("Not allowed to view this submission"),
            LifecycleError::NotAssigned => Self::Forbidden("Problem is not assigned to you"),
            LifecycleError::AlreadySubmitted => {
                Self::Conflict("Submission already submitted".to_string())
            }
            LifecycleError::TestcasesChanged => {
                Self::Conflict("Testcases changed during grading, submit again".to_string())
            }
            LifecycleError::NoTestcases => Self::Conflict("Problem has no testcases".to_string()),
            LifecycleError::NoVisibleTestcases => {
                Self::BadRequest("Problem has no visible testcases to run".to_string())
            }
            LifecycleError::UnsupportedLanguage(language) => {
                Self::BadRequest(format!("Unsupported language: {language}"))
            }
            LifecycleError::RateLimited => {
                Self::TooManyRequests("Too many run requests, try again later")
            }
            LifecycleError::Upstream { testcase_id, source } => {
                let message = format!("Execution failed on testcase {testcase_id}: {source}");
                upstream(&source, message)
            }
            LifecycleError::Database(err) => Self::internal(err, "Database error"),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::NotConfigured => {
                Self::BadGateway("Testcase generator is not configured".to_string())
            }
            GenerationError::UnsupportedLanguage(language) => {
                Self::BadRequest(format!("Unsupported reference language: {language}"))
            }
            err @ GenerationError::NoVisibleTestcases => Self::BadRequest(err.to_string()),
            err @ (GenerationError::Upstream(_) | GenerationError::InvalidResponse(_)) => {
                Self::BadGateway(err.to_string())
            }
        }
    }
}

impl From<EvaluationError> for ApiError {
    fn from(err: EvaluationError) -> Self {
        match err {
            err @ EvaluationError::InvalidScore => Self::BadRequest(err.to_string()),
            EvaluationError::NotFound => Self::NotFound("Submission not found".to_string()),
            EvaluationError::Database(err) => Self::internal(err, "Failed to save evaluation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;

    use super::ApiError;
    use crate::services::evaluation::EvaluationError;
    use crate::services::execution::ExecutionError;
    use crate::services::submission_lifecycle::LifecycleError;
    use crate::test_support::read_json;

    #[tokio::test]
    async fn body_carries_machine_code() {
        let response = ApiError::Conflict("Submission already submitted".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = read_json(response).await;
        assert_eq!(body["status"], 409);
        assert_eq!(body["code"], "conflict");
        assert_eq!(body["detail"], "Submission already submitted");
    }

    #[tokio::test]
    async fn internal_errors_hide_the_cause() {
        let response = ApiError::internal("relation \"users\" does not exist", "Database error")
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["code"], "internal_error");
        assert_eq!(body["detail"], "Database error");
    }

    #[tokio::test]
    async fn unauthorized_sets_challenge_header() {
        let response = ApiError::Unauthorized("Invalid authentication credentials").into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    }

    #[test]
    fn upstream_failures_map_to_gateway_codes() {
        assert_eq!(ApiError::BadGateway(String::new()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::BadGateway(String::new()).code(), "upstream_error");
        assert_eq!(ApiError::GatewayTimeout(String::new()).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ApiError::GatewayTimeout(String::new()).code(), "upstream_timeout");
    }

    #[test]
    fn lifecycle_errors_map_to_taxonomy() {
        let cases = [
            (LifecycleError::NotFound, StatusCode::NOT_FOUND),
            (LifecycleError::Forbidden, StatusCode::FORBIDDEN),
            (LifecycleError::AlreadySubmitted, StatusCode::CONFLICT),
            (LifecycleError::NoTestcases, StatusCode::CONFLICT),
            (LifecycleError::TestcasesChanged, StatusCode::CONFLICT),
            (LifecycleError::NoVisibleTestcases, StatusCode::BAD_REQUEST),
            (LifecycleError::UnsupportedLanguage("go".into()), StatusCode::BAD_REQUEST),
            (LifecycleError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn submit_timeouts_are_gateway_timeouts() {
        let timeout = LifecycleError::Upstream {
            testcase_id: "tc-1".to_string(),
            source: ExecutionError::Timeout {
                token: "tok".to_string(),
                waited: Duration::from_secs(20),
            },
        };
        let rejected = LifecycleError::Upstream {
            testcase_id: "tc-1".to_string(),
            source: ExecutionError::SubmissionRejected("{}".to_string()),
        };

        assert_eq!(ApiError::from(timeout).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ApiError::from(rejected).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn invalid_evaluation_score_is_validation_error() {
        let err = ApiError::from(EvaluationError::InvalidScore);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "validation_error");
    }
}
