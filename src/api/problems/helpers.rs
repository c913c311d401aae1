use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::models::Problem;
use crate::repositories;
use crate::services::execution::Language;

pub(super) async fn fetch_problem(state: &AppState, problem_id: &str) -> Result<Problem, ApiError> {
    repositories::problems::find_by_id(state.db(), problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch problem"))?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))
}

pub(super) async fn ensure_problem_exists(
    state: &AppState,
    problem_id: &str,
) -> Result<(), ApiError> {
    let exists = repositories::problems::exists(state.db(), problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch problem"))?;
    if exists {
        Ok(())
    } else {
        Err(ApiError::NotFound("Problem not found".to_string()))
    }
}

/// Canonical key for a reference language, rejecting unsupported ones.
pub(super) fn reference_language(key: &str) -> Result<&'static str, ApiError> {
    Language::from_key(key.trim())
        .map(Language::as_str)
        .map_err(|_| ApiError::BadRequest(format!("Unsupported reference language: {key}")))
}

pub(super) async fn ensure_title_free(
    state: &AppState,
    title: &str,
    except_id: Option<&str>,
) -> Result<(), ApiError> {
    let taken = repositories::problems::title_taken(state.db(), title, except_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check problem title"))?;
    if taken {
        Err(ApiError::Conflict("Problem with this title already exists".to_string()))
    } else {
        Ok(())
    }
}

pub(super) fn title_conflict_or_internal(err: sqlx::Error, context: &str) -> ApiError {
    if repositories::is_unique_violation(&err) {
        ApiError::Conflict("Problem with this title already exists".to_string())
    } else {
        ApiError::internal(err, context)
    }
}

#[cfg(test)]
mod tests {
    use super::reference_language;

    #[test]
    fn reference_language_is_normalised() {
        assert_eq!(reference_language(" Python ").ok(), Some("python"));
        assert_eq!(reference_language("CPP").ok(), Some("cpp"));
        assert!(reference_language("cobol").is_err());
    }
}
