use axum::{Json, extract::State, response::IntoResponse};

use crate::AppState;
use crate::db::queries;
use crate::error::AppError;
use crate::middleware::AuthUser;

pub async fn get_billing(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = queries::get_billing_profile(&state.db, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("no billing profile stored".to_string()))?;

    Ok(Json(profile))
}

/// Insert-or-update of the caller's billing snapshot, keyed on the user.
pub async fn put_billing(
    State(state): State<AppState>,
    user: AuthUser,
    Json(profile): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    if !profile.is_object() {
        return Err(AppError::Validation(
            "billing profile must be a JSON object".to_string(),
        ));
    }

    let stored = queries::upsert_billing_profile(&state.db, user.user_id, &profile).await?;
    Ok(Json(stored))
}
