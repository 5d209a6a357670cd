use thiserror::Error;

use axie_ledger::LedgerError;

/// Common error types used across the node
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<rocksdb::Error> for NodeError {
    fn from(err: rocksdb::Error) -> Self {
        NodeError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for NodeError {
    fn from(err: std::io::Error) -> Self {
        NodeError::Storage(err.to_string())
    }
}

impl From<bincode::Error> for NodeError {
    fn from(err: bincode::Error) -> Self {
        NodeError::Storage(err.to_string())
    }
}

pub type NodeResult<T> = Result<T, NodeError>;
