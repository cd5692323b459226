use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::attempt_dto::SetAnswerRequest;
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn check_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let response = state.attempt_service.check(assessment_id, user_id).await?;
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let response = state.attempt_service.start(assessment_id, user_id).await?;
    tracing::info!(assessment_id = %assessment_id, attempt_id = %response.attempt_id, "attempt created");
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn resume_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let response = state.attempt_service.resume(attempt_id, user_id).await?;
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn set_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<SetAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let response = state
        .answer_service
        .set_answer(attempt_id, req.option_id, user_id)
        .await?;
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn end_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let response = state.attempt_service.end(attempt_id, user_id).await?;
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn score_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let response = state.attempt_service.score(attempt_id, user_id).await?;
    Ok(Json(response).into_response())
}
