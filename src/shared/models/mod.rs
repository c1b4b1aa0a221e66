use sqlx::{MySql, Pool};
use thiserror::Error;

pub mod sms_callback;
pub mod voice_callback;

pub use sms_callback::SmsCallback;
pub use voice_callback::VoiceCallback;

// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(sqlx::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("General error: {0}")]
    General(#[from] anyhow::Error),
    #[error("Unique constraint violation: {0}")]
    Unique(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        // MySQL unique constraint violation (error code 1062)
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                if code == "23000" || code == "1062" {
                    return DatabaseError::Unique(db_err.message().to_string());
                }
            }
        }
        DatabaseError::Connection(err)
    }
}

// Application state shared by the REST and MCP services
#[derive(Clone)]
pub struct AppState {
    pub db: std::sync::Arc<Pool<MySql>>,
}

impl AppState {
    pub fn new(db: Pool<MySql>) -> Self {
        Self {
            db: std::sync::Arc::new(db),
        }
    }
}
