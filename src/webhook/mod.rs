//! Identity provider webhook
//!
//! Verifies signed events from the identity provider and mirrors newly
//! created users into the local `users` table. A failed sync answers 500 so
//! the provider redelivers; verification failures answer 400 and are final.

mod events;
mod handler;
mod routes;
mod signature;

pub use events::{USER_CREATED, UserCreated, WebhookEvent};
pub use routes::routes;
pub use signature::{SignatureHeaders, TOLERANCE_SECONDS, WebhookVerifier};
