use diesel_async::pooled_connection::PoolError;
use shared::DomainError;
use thiserror::Error;

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    /// The hardware row would leave its `0..=total` range; the unit of work
    /// was rolled back.
    #[error("ledger for hardware {hardware_id} is out of balance")]
    LedgerConflict { hardware_id: i32 },
}

impl From<bb8::RunError<PoolError>> for ServiceError {
    fn from(error: bb8::RunError<PoolError>) -> Self {
        Self::Pool(error.to_string())
    }
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::Database(_) => "database",
            Self::Pool(_) => "unavailable",
            Self::LedgerConflict { .. } => "ledger_conflict",
        }
    }

    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}
