use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::ExecutionLog;
use crate::auth::Identity;
use crate::error::ServiceError;
use crate::handler::AppState;
use crate::model::RecordExecution;

pub async fn record_execution(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<RecordExecution>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let Json(payload) = payload?;
    let language = payload.language.clone();
    ExecutionLog::new(&state.db).record(&identity, payload).await?;
    tracing::info!(user_id = %identity.subject, language = %language, "recorded execution");
    Ok(StatusCode::NO_CONTENT.into_response())
}
