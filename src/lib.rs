use std::error::Error;

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod executions;
pub mod handler;
pub mod model;
pub mod preferences;
pub mod snippets;
pub mod webhook;

pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
