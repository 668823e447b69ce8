use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::APIResponse;
use crate::auth::TokenVerifier;
use crate::db::Database;
use crate::{executions, snippets, webhook};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<TokenVerifier>,
    pub webhook_secret: Option<Arc<str>>,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    replica: bool,
}

pub async fn healthcheck(State(state): State<AppState>) -> Response {
    info!("got healthcheck request");
    let health = Health {
        status: "ok",
        replica: state.db.is_synced(),
    };
    (StatusCode::OK, Json(APIResponse { data: health })).into_response()
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", get(healthcheck))
        .merge(snippets::routes())
        .merge(executions::routes())
        .merge(webhook::routes())
        .layer(cors)
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::testing::{bearer, test_state};
    use super::*;
    use crate::model::SyncUser;
    use crate::snippets::Snippets;

    async fn seeded() -> (AppState, Router) {
        let state = test_state(None).await;
        let store = Snippets::new(&state.db);
        for (id, name) in [("user_ann", "Ann Lee"), ("user_ben", "Ben Ng")] {
            store
                .sync_user(SyncUser {
                    user_id: id.to_string(),
                    email: format!("{}@example.com", id),
                    name: name.to_string(),
                })
                .await
                .unwrap();
        }
        let app = router(state.clone());
        (state, app)
    }

    async fn call(app: &Router, method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("authorization", bearer(user));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_healthcheck() {
        let (_, app) = seeded().await;
        let (status, body) = call(&app, "GET", "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_requires_bearer_token() {
        let (_, app) = seeded().await;
        let payload = json!({"language": "rust", "code": "fn main() {}", "title": "hi"});
        let (status, body) = call(&app, "POST", "/snippets", None, Some(payload)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthenticated");
    }

    #[tokio::test]
    async fn test_snippet_lifecycle() {
        let (_, app) = seeded().await;
        let payload = json!({"language": "rust", "code": "fn main() {}", "title": "hello"});

        let (status, body) = call(&app, "POST", "/snippets", Some("user_ann"), Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = call(&app, "GET", &format!("/snippets/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user_name"], "Ann Lee");

        let (status, body) = call(&app, "GET", "/snippets", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let comment = json!({"content": "neat"});
        let (status, _) = call(&app, "POST", &format!("/snippets/{id}/comments"), Some("user_ben"), Some(comment)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(&app, "POST", &format!("/snippets/{id}/star"), Some("user_ben"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["starred"], true);

        let (_, body) = call(&app, "GET", &format!("/snippets/{id}/stars/count"), None, None).await;
        assert_eq!(body["data"]["count"], 1);
        let (_, body) = call(&app, "GET", &format!("/snippets/{id}/comments/count"), None, None).await;
        assert_eq!(body["data"]["count"], 1);

        let (status, _) = call(&app, "DELETE", &format!("/snippets/{id}"), Some("user_ben"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&app, "DELETE", &format!("/snippets/{id}"), Some("user_ann"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(&app, "GET", &format!("/snippets/{id}"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NotFound: Snippet");

        let (_, body) = call(&app, "GET", &format!("/snippets/{id}/comments/count"), None, None).await;
        assert_eq!(body["data"]["count"], 0);
    }

    #[tokio::test]
    async fn test_is_starred_without_identity_is_false() {
        let (state, app) = seeded().await;
        let id = Snippets::new(&state.db)
            .create_snippet(
                &crate::auth::Identity::new("user_ann"),
                crate::model::CreateSnippet {
                    language: "go".to_string(),
                    code: "package main".to_string(),
                    title: "go".to_string(),
                },
            )
            .await
            .unwrap();

        call(&app, "POST", &format!("/snippets/{id}/star"), Some("user_ann"), None).await;

        let (status, body) = call(&app, "GET", &format!("/snippets/{id}/star"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["starred"], false);

        let (_, body) = call(&app, "GET", &format!("/snippets/{id}/star"), Some("user_ann"), None).await;
        assert_eq!(body["data"]["starred"], true);
    }

    #[tokio::test]
    async fn test_comments_on_missing_snippet() {
        let (_, app) = seeded().await;
        let (status, _) = call(&app, "POST", "/snippets/99/comments", Some("user_ann"), Some(json!({"content": "?"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&app, "GET", "/snippets/99/comments", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_envelope() {
        let (_, app) = seeded().await;

        let request = Request::builder()
            .method("POST")
            .uri("/snippets")
            .header("authorization", bearer("user_ann"))
            .body(Body::from(r#"{"language": "rust"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("BadRequest"));

        let (status, body) = call(&app, "POST", "/executions", Some("user_ann"), Some(json!({"code": 1}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("BadRequest"));
    }

    #[tokio::test]
    async fn test_record_execution() {
        let (_, app) = seeded().await;
        let payload = json!({"language": "python", "code": "print(2)", "output": "2\n"});

        let (status, _) = call(&app, "POST", "/executions", None, Some(payload.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, "POST", "/executions", Some("user_ann"), Some(payload)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
