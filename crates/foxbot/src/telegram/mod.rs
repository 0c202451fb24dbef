//! Telegram front-end: bot setup, dispatcher schema, menu rendering and
//! the Mini App HTTP API.

pub mod bot;
pub mod handlers;
pub mod menu;
pub mod webapp;

// Re-exports for the binary and integration tests
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use webapp::{create_webapp_router, run_webapp_server, WebAppState};
