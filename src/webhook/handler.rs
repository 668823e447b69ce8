use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::events::{USER_CREATED, UserCreated, WebhookEvent};
use super::signature::{SignatureHeaders, WebhookVerifier};
use crate::api::APIResponse;
use crate::error::ServiceError;
use crate::handler::AppState;
use crate::snippets::Snippets;

#[derive(Debug, Serialize)]
struct WebhookAck {
    status: &'static str,
}

fn ack(status: &'static str) -> Response {
    (StatusCode::OK, Json(APIResponse { data: WebhookAck { status } })).into_response()
}

pub async fn identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ServiceError> {
    let secret = state.webhook_secret.as_deref().ok_or_else(|| {
        ServiceError::ConfigurationError("webhook signing secret is not configured".to_string())
    })?;
    let verifier = WebhookVerifier::new(secret)?;

    let signature = SignatureHeaders::from_headers(&headers)
        .ok_or_else(|| ServiceError::BadRequest("missing signature headers".to_string()))?;

    if let Err(e) = verifier.verify(&signature, &body) {
        tracing::warn!(message_id = %signature.id, error = %e, "rejected webhook");
        return Err(e);
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("malformed webhook body: {}", e)))?;

    if event.event_type != USER_CREATED {
        tracing::debug!(event_type = %event.event_type, "ignoring webhook event");
        return Ok(ack("ignored"));
    }

    let user = UserCreated::from_event(event)?.into_sync_user()?;
    let user_id = user.user_id.clone();

    match Snippets::new(&state.db).sync_user(user).await {
        Ok(inserted) => {
            tracing::info!(user_id = %user_id, inserted, "synced user");
            Ok(ack("user synced"))
        }
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "failed to sync user");
            Err(e)
        }
    }
}
