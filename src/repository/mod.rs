pub mod database;
pub mod session_repository;

use sqlx::SqlitePool;
use std::sync::Arc;

pub use session_repository::{SessionPersistence, SessionRepository};

#[derive(Clone)]
pub struct Repository {
    pub pool: Arc<SqlitePool>,
    pub sessions: SessionRepository,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        let pool = Arc::new(pool);
        Self {
            sessions: SessionRepository::new(pool.clone()),
            pool,
        }
    }
}
