use anyhow::{Result, Context};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, Transaction, TransactionDB, TransactionDBOptions};
use std::path::Path;
use tracing::info;

use axie_ledger::{LedgerError, LedgerResult, LedgerStore, LedgerTxn, UserId};

use crate::utils::{decode_amount, encode_amount};

/// Persistent ledger storage using a RocksDB `TransactionDB`
///
/// Balances and holdings live in separate column families keyed by user id.
/// Transactions use pessimistic locking: `get_for_update_cf` takes an
/// exclusive lock on the key until commit or rollback, and a waiter gives up
/// after the configured lock timeout.
pub struct Storage {
    db: TransactionDB,
}

pub const CF_BALANCES: &str = "balances";
pub const CF_HOLDINGS: &str = "holdings";
pub const CF_META: &str = "meta";

const COLUMN_FAMILIES: [&str; 3] = [CF_BALANCES, CF_HOLDINGS, CF_META];

impl Storage {
    /// Open (or create) storage
    ///
    /// # Arguments
    /// * `path` - Directory path for database files
    /// * `lock_timeout_ms` - How long a transaction waits for a locked account
    pub fn new(path: impl AsRef<Path>, lock_timeout_ms: i64) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory {:?}", path))?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_keep_log_file_num(10);
        opts.set_bytes_per_sync(1048576);

        let mut txn_opts = TransactionDBOptions::default();
        txn_opts.set_txn_lock_timeout(lock_timeout_ms);

        let cfs = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));

        let db = TransactionDB::open_cf_descriptors(&opts, &txn_opts, path, cfs)
            .context("Failed to open RocksDB")?;

        info!("Storage initialized at {:?}", path);
        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &TransactionDB {
        &self.db
    }

    pub(crate) fn column(&self, name: &str) -> LedgerResult<&ColumnFamily> {
        self.db.cf_handle(name)
            .ok_or_else(|| LedgerError::Storage(format!("{} column family not found", name)))
    }

    fn read_amount(&self, cf_name: &str, user: &UserId) -> LedgerResult<Option<i64>> {
        let cf = self.column(cf_name)?;
        let value = self.db.get_cf(cf, user.as_bytes()).map_err(LedgerError::storage)?;
        value.map(|bytes| decode_record(cf_name, user, &bytes)).transpose()
    }
}

impl LedgerStore for Storage {
    type Txn<'a> = StorageTxn<'a>;

    fn begin(&self) -> LedgerResult<StorageTxn<'_>> {
        Ok(StorageTxn {
            txn: self.db.transaction(),
            balances: self.column(CF_BALANCES)?,
            holdings: self.column(CF_HOLDINGS)?,
        })
    }

    fn balance(&self, user: &UserId) -> LedgerResult<Option<i64>> {
        self.read_amount(CF_BALANCES, user)
    }

    fn holdings(&self, user: &UserId) -> LedgerResult<Option<i64>> {
        self.read_amount(CF_HOLDINGS, user)
    }
}

/// One RocksDB transaction over the ledger column families.
///
/// Dropping it without `commit` discards its writes and releases its locks.
pub struct StorageTxn<'a> {
    txn: Transaction<'a, TransactionDB>,
    balances: &'a ColumnFamily,
    holdings: &'a ColumnFamily,
}

impl<'a> StorageTxn<'a> {
    fn read_for_update(&self, cf: &ColumnFamily, cf_name: &str, user: &UserId) -> LedgerResult<Option<i64>> {
        let value = self.txn
            .get_for_update_cf(cf, user.as_bytes(), true)
            .map_err(LedgerError::storage)?;
        value.map(|bytes| decode_record(cf_name, user, &bytes)).transpose()
    }
}

impl<'a> LedgerTxn for StorageTxn<'a> {
    fn balance_for_update(&mut self, user: &UserId) -> LedgerResult<Option<i64>> {
        self.read_for_update(self.balances, CF_BALANCES, user)
    }

    fn holdings_for_update(&mut self, user: &UserId) -> LedgerResult<Option<i64>> {
        self.read_for_update(self.holdings, CF_HOLDINGS, user)
    }

    fn upsert_balance(&mut self, user: &UserId, balance: i64) -> LedgerResult<()> {
        self.txn
            .put_cf(self.balances, user.as_bytes(), encode_amount(balance))
            .map_err(LedgerError::storage)
    }

    fn upsert_holdings(&mut self, user: &UserId, holdings: i64) -> LedgerResult<()> {
        self.txn
            .put_cf(self.holdings, user.as_bytes(), encode_amount(holdings))
            .map_err(LedgerError::storage)
    }

    fn commit(self) -> LedgerResult<()> {
        self.txn.commit().map_err(LedgerError::storage)
    }

    fn rollback(self) -> LedgerResult<()> {
        self.txn.rollback().map_err(LedgerError::storage)
    }
}

fn decode_record(cf_name: &str, user: &UserId, bytes: &[u8]) -> LedgerResult<i64> {
    decode_amount(bytes).ok_or_else(|| {
        LedgerError::Storage(format!(
            "Corrupt {} record for {}: {} bytes",
            cf_name,
            user,
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axie_ledger::LedgerExecutor;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn open(dir: &TempDir) -> Storage {
        Storage::new(dir.path(), 5_000).unwrap()
    }

    #[test]
    fn test_storage_initialization() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path(), 1_000);
        assert!(storage.is_ok());
    }

    #[test]
    fn test_commit_and_rollback() {
        let temp_dir = TempDir::new().unwrap();
        let storage = open(&temp_dir);
        let alice = user("alice");

        let mut txn = storage.begin().unwrap();
        txn.upsert_balance(&alice, 100).unwrap();
        txn.commit().unwrap();
        assert_eq!(storage.balance(&alice).unwrap(), Some(100));

        let mut txn = storage.begin().unwrap();
        txn.upsert_balance(&alice, 1).unwrap();
        txn.upsert_holdings(&alice, 99).unwrap();
        txn.rollback().unwrap();

        assert_eq!(storage.balance(&alice).unwrap(), Some(100));
        assert_eq!(storage.holdings(&alice).unwrap(), None);
    }

    #[test]
    fn test_abandoned_transaction_not_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let alice = user("alice");

        {
            let storage = open(&temp_dir);
            let executor = LedgerExecutor::new(Arc::new(storage));
            executor.open_account(&alice, 100).unwrap();

            // balance written, process goes away before the holdings write
            let mut txn = executor.store().begin().unwrap();
            txn.balance_for_update(&alice).unwrap();
            txn.upsert_balance(&alice, 70).unwrap();
        }

        let storage = open(&temp_dir);
        assert_eq!(storage.balance(&alice).unwrap(), Some(100));
        assert_eq!(storage.holdings(&alice).unwrap(), None);
    }

    #[test]
    fn test_purchase_scenarios() {
        let temp_dir = TempDir::new().unwrap();
        let executor = LedgerExecutor::new(Arc::new(open(&temp_dir)));

        let alice = user("alice");
        executor.open_account(&alice, 100).unwrap();
        executor.purchase(&alice, 30).unwrap();
        assert_eq!(executor.store().balance(&alice).unwrap(), Some(70));
        assert_eq!(executor.store().holdings(&alice).unwrap(), Some(30));

        let bob = user("bob");
        executor.open_account(&bob, 25).unwrap();
        executor.purchase(&bob, 5).unwrap();
        let result = executor.purchase(&bob, 30);
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(executor.store().balance(&bob).unwrap(), Some(20));
        assert_eq!(executor.store().holdings(&bob).unwrap(), Some(5));

        let carol = user("carol");
        executor.open_account(&carol, 50).unwrap();
        assert_eq!(executor.store().holdings(&carol).unwrap(), None);
        executor.purchase(&carol, 10).unwrap();
        assert_eq!(executor.store().holdings(&carol).unwrap(), Some(10));
    }

    #[test]
    fn test_purchases_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let alice = user("alice");

        {
            let executor = LedgerExecutor::new(Arc::new(open(&temp_dir)));
            executor.open_account(&alice, 100).unwrap();
            executor.purchase(&alice, 60).unwrap();
        }

        let executor = LedgerExecutor::new(Arc::new(open(&temp_dir)));
        let account = executor.account(&alice).unwrap();
        assert_eq!((account.balance, account.holdings), (40, 60));
    }

    #[test]
    fn test_concurrent_purchases_never_overspend() {
        let temp_dir = TempDir::new().unwrap();
        let executor = LedgerExecutor::new(Arc::new(open(&temp_dir)));
        let alice = user("alice");
        executor.open_account(&alice, 100).unwrap();

        let outcomes: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..12)
                .map(|_| scope.spawn(|| executor.purchase(&alice, 30)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 3);
        assert!(outcomes
            .iter()
            .all(|r| r.is_ok() || matches!(r, Err(LedgerError::InsufficientFunds { .. }))));

        let account = executor.account(&alice).unwrap();
        assert_eq!(account.balance, 10);
        assert_eq!(account.holdings, 90);
    }

    #[test]
    fn test_lock_timeout_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path(), 50).unwrap();
        let alice = user("alice");

        let mut holder = storage.begin().unwrap();
        holder.balance_for_update(&alice).unwrap();

        let mut waiter = storage.begin().unwrap();
        let result = waiter.balance_for_update(&alice);
        assert!(matches!(result, Err(LedgerError::Storage(_))));

        drop(waiter);
        holder.rollback().unwrap();
    }

    #[test]
    fn test_corrupt_record_reported() {
        let temp_dir = TempDir::new().unwrap();
        let storage = open(&temp_dir);
        let alice = user("alice");

        let cf = storage.column(CF_BALANCES).unwrap();
        storage.db().put_cf(cf, alice.as_bytes(), [1u8, 2, 3]).unwrap();

        assert!(matches!(storage.balance(&alice), Err(LedgerError::Storage(_))));
    }
}
