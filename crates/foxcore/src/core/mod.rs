//! Core utilities, configuration, and common functionality

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{Config, GameConfig};
pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_startup_configuration};
