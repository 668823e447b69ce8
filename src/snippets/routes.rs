use axum::{
    Router,
    routing::{delete, get, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/snippets", get(handler::list_snippets))
        .route("/snippets", post(handler::create_snippet))
        .route("/snippets/:id", get(handler::get_snippet))
        .route("/snippets/:id", delete(handler::delete_snippet))
        .route("/snippets/:id/star", get(handler::is_starred))
        .route("/snippets/:id/star", post(handler::toggle_star))
        .route("/snippets/:id/stars/count", get(handler::star_count))
        .route("/snippets/:id/comments", get(handler::list_comments))
        .route("/snippets/:id/comments", post(handler::add_comment))
        .route("/snippets/:id/comments/count", get(handler::comment_count))
        .route("/comments/:id", delete(handler::delete_comment))
}
