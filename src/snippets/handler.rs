//! HTTP handlers for snippets, stars and comments

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::{Engagement, Snippets};
use crate::api::{APIResponse, Count, Created, PaginationParams, Starred};
use crate::auth::Identity;
use crate::error::ServiceError;
use crate::handler::AppState;
use crate::model::{CreateComment, CreateSnippet};

fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(APIResponse { data })).into_response()
}

fn created(id: i64) -> Response {
    (StatusCode::CREATED, Json(APIResponse { data: Created { id } })).into_response()
}

// ============================================================================
// Snippets
// ============================================================================

pub async fn create_snippet(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<CreateSnippet>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let Json(payload) = payload?;
    let id = Snippets::new(&state.db).create_snippet(&identity, payload).await?;
    tracing::info!(snippet_id = id, user_id = %identity.subject, "created snippet");
    Ok(created(id))
}

pub async fn delete_snippet(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> Result<Response, ServiceError> {
    Snippets::new(&state.db)
        .delete_snippet(&identity, id)
        .await
        .inspect_err(|e| tracing::warn!(snippet_id = id, error = %e, "failed to delete snippet"))?;
    tracing::info!(snippet_id = id, user_id = %identity.subject, "deleted snippet");
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn list_snippets(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    let snippets = Snippets::new(&state.db).list_snippets(params.into_page()).await?;
    Ok(success(snippets))
}

pub async fn get_snippet(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, ServiceError> {
    let snippet = Snippets::new(&state.db).get_snippet_by_id(id).await?;
    Ok(success(snippet))
}

pub async fn star_count(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, ServiceError> {
    let count = Snippets::new(&state.db).star_count(id).await?;
    Ok(success(Count { count }))
}

pub async fn comment_count(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, ServiceError> {
    let count = Snippets::new(&state.db).comment_count(id).await?;
    Ok(success(Count { count }))
}

// ============================================================================
// Stars
// ============================================================================

pub async fn toggle_star(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> Result<Response, ServiceError> {
    let starred = Engagement::new(&state.db).toggle_star(&identity, id).await?;
    tracing::info!(snippet_id = id, user_id = %identity.subject, starred, "toggled star");
    Ok(success(Starred { starred }))
}

pub async fn is_starred(
    State(state): State<AppState>,
    identity: Option<Identity>,
    Path(id): Path<i64>,
) -> Result<Response, ServiceError> {
    let starred = Engagement::new(&state.db).is_starred(identity.as_ref(), id).await?;
    Ok(success(Starred { starred }))
}

// ============================================================================
// Comments
// ============================================================================

pub async fn add_comment(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
    payload: Result<Json<CreateComment>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let Json(payload) = payload?;
    let comment_id = Engagement::new(&state.db)
        .add_comment(&identity, id, &payload.content)
        .await?;
    tracing::info!(snippet_id = id, comment_id, "added comment");
    Ok(created(comment_id))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    let comments = Engagement::new(&state.db)
        .list_comments(id, params.into_page())
        .await?;
    Ok(success(comments))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> Result<Response, ServiceError> {
    Engagement::new(&state.db).delete_comment(&identity, id).await?;
    tracing::info!(comment_id = id, user_id = %identity.subject, "deleted comment");
    Ok(StatusCode::NO_CONTENT.into_response())
}
