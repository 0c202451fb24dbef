//! Handler types and dependencies

use std::sync::Arc;

use foxcore::config::Config;
use foxcore::storage::db::DbPool;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
///
/// Cloned into every dispatcher branch; both fields are `Arc`s, so a
/// clone is two reference bumps.
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub config: Arc<Config>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(db_pool: Arc<DbPool>, config: Arc<Config>) -> Self {
        Self { db_pool, config }
    }
}
