use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("{entity} not found: {id}")]
    NotFoundError { entity: &'static str, id: String },
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFundsError {
        requested: Decimal,
        available: Decimal,
    },
    #[error("Conflict: {0}")]
    ConflictError(String),
    #[error("Stale {entity} version for {id}")]
    StaleVersion { entity: &'static str, id: String },
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Repository error: {0}")]
    RepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFoundError {
            entity,
            id: id.to_string(),
        }
    }

    pub fn stale(entity: &'static str, id: impl ToString) -> Self {
        Self::StaleVersion {
            entity,
            id: id.to_string(),
        }
    }

    pub fn repository(message: impl Into<String>) -> Self {
        Self::RepositoryError(Box::new(std::io::Error::other(message.into())))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::RepositoryError(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        Self::RepositoryError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
