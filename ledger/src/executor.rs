use std::sync::Arc;
use tracing::{info, warn, error, debug};

use crate::account::{Account, Receipt, UserId};
use crate::errors::{LedgerError, LedgerResult};
use crate::store::{LedgerStore, LedgerTxn};
use crate::validation::ValidatedPurchase;

/// Ledger transaction executor
///
/// Moves tokens out of a balance and into holdings as one unit. The balance
/// check and both writes run inside a single store transaction that holds the
/// account lock, so concurrent purchases by the same user serialize instead
/// of spending the same balance twice.
pub struct LedgerExecutor<S> {
    store: Arc<S>,
}

impl<S> Clone for LedgerExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: LedgerStore> LedgerExecutor<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Execute a purchase that already passed request validation
    pub fn execute(&self, purchase: &ValidatedPurchase) -> LedgerResult<Receipt> {
        self.purchase(&purchase.user_id, purchase.amount)
    }

    /// Debit `amount` from the user's balance and credit it to their holdings.
    ///
    /// Either both records change or neither does.
    pub fn purchase(&self, user: &UserId, amount: i64) -> LedgerResult<Receipt> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let mut txn = self.store.begin()?;

        let receipt = match apply_purchase(&mut txn, user, amount) {
            Ok(receipt) => receipt,
            Err(e) => {
                abort(txn, user);
                if e.is_client_error() {
                    debug!("Purchase rejected for {}: {}", user, e);
                } else {
                    error!("Purchase failed for {}: {}", user, e);
                }
                return Err(e);
            }
        };

        if let Err(e) = txn.commit() {
            error!("Purchase commit failed for {}: {}", user, e);
            return Err(e);
        }

        info!(
            "Purchase committed for {}: amount={} balance={} holdings={}",
            user, amount, receipt.balance, receipt.holdings
        );
        Ok(receipt)
    }

    /// Create the balance record for a new account
    pub fn open_account(&self, user: &UserId, initial_balance: i64) -> LedgerResult<()> {
        if initial_balance < 0 {
            return Err(LedgerError::InvalidAmount(initial_balance));
        }

        let mut txn = self.store.begin()?;

        match txn.balance_for_update(user) {
            Ok(None) => {}
            Ok(Some(_)) => {
                abort(txn, user);
                return Err(LedgerError::AccountExists(user.to_string()));
            }
            Err(e) => {
                abort(txn, user);
                return Err(e);
            }
        }

        if let Err(e) = txn.upsert_balance(user, initial_balance) {
            abort(txn, user);
            return Err(e);
        }
        txn.commit()?;

        info!("Opened account {} with balance {}", user, initial_balance);
        Ok(())
    }

    /// Consistent snapshot of one account; missing records read as zero
    pub fn account(&self, user: &UserId) -> LedgerResult<Account> {
        let mut txn = self.store.begin()?;

        let snapshot = txn.balance_for_update(user).and_then(|balance| {
            let holdings = txn.holdings_for_update(user)?;
            Ok(Account::new(user.clone(), balance.unwrap_or(0), holdings.unwrap_or(0)))
        });

        abort(txn, user);
        snapshot
    }
}

fn apply_purchase<T: LedgerTxn>(txn: &mut T, user: &UserId, amount: i64) -> LedgerResult<Receipt> {
    // A missing balance record is the same as an empty balance.
    let balance = txn.balance_for_update(user)?.unwrap_or(0);
    if amount > balance {
        return Err(LedgerError::InsufficientFunds {
            required: amount,
            available: balance,
        });
    }

    let holdings = txn.holdings_for_update(user)?.unwrap_or(0);
    let new_holdings = holdings.checked_add(amount)
        .ok_or_else(|| LedgerError::Storage(format!("Holdings overflow for {}", user)))?;
    let new_balance = balance - amount;

    txn.upsert_balance(user, new_balance)?;
    txn.upsert_holdings(user, new_holdings)?;

    Ok(Receipt {
        user_id: user.clone(),
        amount,
        balance: new_balance,
        holdings: new_holdings,
    })
}

/// Roll back a transaction that is being abandoned anyway.
fn abort<T: LedgerTxn>(txn: T, user: &UserId) {
    if let Err(e) = txn.rollback() {
        warn!("Rollback failed for {}: {}", user, e);
    }
}
