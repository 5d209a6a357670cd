use thiserror::Error;

/// Errors produced by the ledger core
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("Account already exists: {0}")]
    AccountExists(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        LedgerError::Storage(err.to_string())
    }

    /// True for rejections the caller can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        !matches!(self, LedgerError::Storage(_))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::MalformedRequest(err.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::InsufficientFunds {
            required: 30,
            available: 20,
        };
        assert_eq!(err.to_string(), "Insufficient funds: required 30, available 20");
        assert!(err.is_client_error());

        let err = LedgerError::storage("lock timeout");
        assert_eq!(err.to_string(), "Storage error: lock timeout");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<i64>("nope").unwrap_err();
        let err: LedgerError = json_err.into();

        assert!(matches!(err, LedgerError::MalformedRequest(_)));
    }
}
