//! Fox Fury core - user store and game rules for the tap-to-earn bot
//!
//! This library carries everything the bot and the Mini App API share:
//! the SQLite user store, the game economy configuration, error types
//! and logging setup. It knows nothing about Telegram unless the
//! `telegram` feature is enabled (which only adds an error conversion).
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors and logging
//! - `storage`: The SQLite user store and its migrations

pub mod core;
pub mod storage;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use crate::storage::{create_pool, get_connection, DbConnection, DbPool};
