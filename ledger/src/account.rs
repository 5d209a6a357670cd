use serde::{Serialize, Deserialize};
use std::fmt;

use crate::errors::LedgerError;

/// Opaque identity of a ledger account holder.
///
/// Always non-empty. Construction is the only place an empty identity can be
/// rejected, so everything past this point can assume a usable key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, LedgerError> {
        let id = id.into();
        if id.is_empty() {
            return Err(LedgerError::Unauthorized);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key used by byte-oriented stores
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Point-in-time view of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub balance: i64,
    pub holdings: i64,
}

impl Account {
    pub fn new(user_id: UserId, balance: i64, holdings: i64) -> Self {
        Self {
            user_id,
            balance,
            holdings,
        }
    }
}

/// Outcome of a committed purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub user_id: UserId,
    pub amount: i64,
    /// Balance after the debit
    pub balance: i64,
    /// Holdings after the credit
    pub holdings: i64,
}
