//! Storage seam consumed by the purchase executor.
//!
//! A store hands out transactions. Every mutation of a balance or a holdings
//! record happens inside one, and a transaction that is dropped without
//! `commit` leaves no trace.

use crate::account::UserId;
use crate::errors::LedgerResult;

/// Shared handle to a persistent balance/holdings ledger
pub trait LedgerStore: Send + Sync {
    type Txn<'a>: LedgerTxn
    where
        Self: 'a;

    /// Start a transaction scoped to the caller
    fn begin(&self) -> LedgerResult<Self::Txn<'_>>;

    /// Unguarded read of the committed balance
    fn balance(&self, user: &UserId) -> LedgerResult<Option<i64>>;

    /// Unguarded read of the committed holdings
    fn holdings(&self, user: &UserId) -> LedgerResult<Option<i64>>;
}

/// A single all-or-nothing unit of work against a [`LedgerStore`].
///
/// The `*_for_update` reads take an exclusive lock on the record for the
/// lifetime of the transaction. Implementations roll back on drop.
pub trait LedgerTxn {
    fn balance_for_update(&mut self, user: &UserId) -> LedgerResult<Option<i64>>;

    fn holdings_for_update(&mut self, user: &UserId) -> LedgerResult<Option<i64>>;

    fn upsert_balance(&mut self, user: &UserId, balance: i64) -> LedgerResult<()>;

    fn upsert_holdings(&mut self, user: &UserId, holdings: i64) -> LedgerResult<()>;

    fn commit(self) -> LedgerResult<()>;

    fn rollback(self) -> LedgerResult<()>;
}
