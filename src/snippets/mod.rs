//! Snippets
//!
//! Snippet CRUD, the user records snippets are owned by, and engagement
//! (stars and comments). Deleting a snippet removes its comments and stars
//! in the same transaction.

mod engagement;
mod handler;
mod routes;
mod store;

pub use engagement::Engagement;
pub use routes::routes;
pub use store::Snippets;
