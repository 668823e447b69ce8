//! Execution log
//!
//! Append-only record of code runs. Nothing here reads the records back;
//! reporting happens elsewhere.

mod handler;
mod lib;
mod routes;

pub use lib::*;
pub use routes::routes;

pub fn migrations() -> &'static [(&'static str, &'static str)] {
    &[(
        "executions_001_schema.sql",
        include_str!("migrations/001_schema.sql"),
    )]
}
