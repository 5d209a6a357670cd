use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, Mutex, MutexGuard, RwLock};

use crate::account::UserId;
use crate::errors::{LedgerError, LedgerResult};
use crate::store::{LedgerStore, LedgerTxn};

#[derive(Debug, Default)]
struct Records {
    balances: HashMap<UserId, i64>,
    holdings: HashMap<UserId, i64>,
}

/// In-process ledger store
///
/// Committed records sit behind a `RwLock`. Transactions lock whole accounts
/// through a lock table, so two transactions on different users never wait
/// on each other, and two on the same user run one after the other.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: RwLock<Records>,
    locked: Mutex<HashSet<UserId>>,
    released: Condvar,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_table(&self) -> MutexGuard<'_, HashSet<UserId>> {
        // The table only holds ids; a panic elsewhere cannot leave it torn.
        self.locked.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LedgerStore for MemoryLedger {
    type Txn<'a> = MemoryTxn<'a>;

    fn begin(&self) -> LedgerResult<MemoryTxn<'_>> {
        Ok(MemoryTxn {
            ledger: self,
            held: Vec::new(),
            balances: HashMap::new(),
            holdings: HashMap::new(),
        })
    }

    fn balance(&self, user: &UserId) -> LedgerResult<Option<i64>> {
        let records = self.records.read()
            .map_err(|_| LedgerError::storage("ledger records poisoned"))?;
        Ok(records.balances.get(user).copied())
    }

    fn holdings(&self, user: &UserId) -> LedgerResult<Option<i64>> {
        let records = self.records.read()
            .map_err(|_| LedgerError::storage("ledger records poisoned"))?;
        Ok(records.holdings.get(user).copied())
    }
}

/// Transaction over a [`MemoryLedger`]
///
/// Writes are staged locally and only reach the shared records on commit.
pub struct MemoryTxn<'a> {
    ledger: &'a MemoryLedger,
    held: Vec<UserId>,
    balances: HashMap<UserId, i64>,
    holdings: HashMap<UserId, i64>,
}

impl<'a> MemoryTxn<'a> {
    fn lock_account(&mut self, user: &UserId) {
        if self.held.contains(user) {
            return;
        }

        let mut table = self.ledger.lock_table();
        while table.contains(user) {
            table = self.ledger.released
                .wait(table)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        table.insert(user.clone());
        self.held.push(user.clone());
    }

    fn release(&mut self) {
        if self.held.is_empty() {
            return;
        }

        let mut table = self.ledger.lock_table();
        for user in self.held.drain(..) {
            table.remove(&user);
        }
        drop(table);
        self.ledger.released.notify_all();
    }

    fn committed(&self, user: &UserId, holdings: bool) -> LedgerResult<Option<i64>> {
        if holdings {
            self.ledger.holdings(user)
        } else {
            self.ledger.balance(user)
        }
    }
}

impl<'a> LedgerTxn for MemoryTxn<'a> {
    fn balance_for_update(&mut self, user: &UserId) -> LedgerResult<Option<i64>> {
        self.lock_account(user);
        match self.balances.get(user) {
            Some(staged) => Ok(Some(*staged)),
            None => self.committed(user, false),
        }
    }

    fn holdings_for_update(&mut self, user: &UserId) -> LedgerResult<Option<i64>> {
        self.lock_account(user);
        match self.holdings.get(user) {
            Some(staged) => Ok(Some(*staged)),
            None => self.committed(user, true),
        }
    }

    fn upsert_balance(&mut self, user: &UserId, balance: i64) -> LedgerResult<()> {
        self.lock_account(user);
        self.balances.insert(user.clone(), balance);
        Ok(())
    }

    fn upsert_holdings(&mut self, user: &UserId, holdings: i64) -> LedgerResult<()> {
        self.lock_account(user);
        self.holdings.insert(user.clone(), holdings);
        Ok(())
    }

    fn commit(mut self) -> LedgerResult<()> {
        {
            let mut records = self.ledger.records.write()
                .map_err(|_| LedgerError::storage("ledger records poisoned"))?;
            records.balances.extend(self.balances.drain());
            records.holdings.extend(self.holdings.drain());
        }
        self.release();
        Ok(())
    }

    fn rollback(mut self) -> LedgerResult<()> {
        self.balances.clear();
        self.holdings.clear();
        self.release();
        Ok(())
    }
}

impl<'a> Drop for MemoryTxn<'a> {
    fn drop(&mut self) {
        self.release();
    }
}
