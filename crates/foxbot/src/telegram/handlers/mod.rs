//! Dispatcher handler tree and the command/callback implementations.

pub mod commands;
pub mod schema;
pub mod types;

pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
