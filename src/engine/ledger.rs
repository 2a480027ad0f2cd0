//! Balance ledger.
//!
//! Reads go straight to the store. Mutations take a per-key async lock for
//! the whole load → modify → save cycle, so two callers touching the same
//! `(employee, leave type, year)` run one after the other while different
//! keys proceed in parallel.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::error::LedgerError;
use super::locks::KeyedLocks;
use super::state::BalanceEntry;
use crate::Days;
use crate::model::BalanceKey;
use crate::store::LeaveStore;

pub struct BalanceLedger<S> {
    store: Arc<S>,
    locks: KeyedLocks<BalanceKey>,
}

impl<S: LeaveStore> BalanceLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Current record for `key`, if any.
    pub async fn balance(&self, key: BalanceKey) -> Result<Option<BalanceEntry>, LedgerError> {
        Ok(self.store.load_balance(key).await?)
    }

    /// Available days for `key`.
    ///
    /// A missing record is an error, not a zero balance: records only come
    /// into existence with the first accrual, and a new employee without one
    /// should be visible as such.
    pub async fn available_for(&self, key: BalanceKey) -> Result<Days, LedgerError> {
        self.balance(key)
            .await?
            .map(|entry| entry.available())
            .ok_or(LedgerError::NoBalanceRecord(key))
    }

    /// Credit `amount` days, creating the record at zero if absent.
    ///
    /// `amount` must be positive and must not overflow the allocated total.
    pub async fn apply_accrual(
        &self,
        key: BalanceKey,
        amount: Days,
    ) -> Result<BalanceEntry, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { key, amount });
        }

        let _guard = self.locks.lock(key).await;

        let mut entry = match self.store.load_balance(key).await? {
            Some(entry) => entry,
            None => {
                debug!(%key, "creating balance record");
                BalanceEntry::empty(key)
            }
        };
        if entry.total_allocated().checked_add(amount).is_none() {
            return Err(LedgerError::InvalidAmount { key, amount });
        }
        entry.allocate(amount);
        self.store.save_balance(entry.clone()).await?;

        info!(%key, amount = %amount, available = %entry.available(), "accrual applied");
        Ok(entry)
    }

    /// Move `days` from available to used.
    pub async fn reserve(&self, key: BalanceKey, days: Days) -> Result<BalanceEntry, LedgerError> {
        let _guard = self.locks.lock(key).await;
        self.take(key, days).await
    }

    /// Reserve `days`, then run `commit` while the key is still locked.
    ///
    /// When `commit` fails the days are given back before the lock is
    /// released, so a retry starts from the balance it saw the first time.
    /// The outer error is the reservation's, the inner one is `commit`'s.
    pub(super) async fn reserve_with<T, E>(
        &self,
        key: BalanceKey,
        days: Days,
        commit: impl Future<Output = Result<T, E>>,
    ) -> Result<Result<T, E>, LedgerError> {
        let _guard = self.locks.lock(key).await;
        let mut entry = self.take(key, days).await?;

        let result = commit.await;
        if result.is_err() {
            entry.release(days);
            if let Err(e) = self.store.save_balance(entry).await {
                error!(%key, days = %days, reason = %e, "reserved days could not be given back");
                return Err(e.into());
            }
            debug!(%key, days = %days, "reservation undone");
        }
        Ok(result)
    }

    /// Check and consume `days`; the caller holds the key lock.
    async fn take(&self, key: BalanceKey, days: Days) -> Result<BalanceEntry, LedgerError> {
        if !days.is_positive() {
            return Err(LedgerError::InvalidAmount { key, amount: days });
        }

        let mut entry = self
            .store
            .load_balance(key)
            .await?
            .ok_or(LedgerError::NoBalanceRecord(key))?;

        if days > entry.available() {
            return Err(LedgerError::InsufficientBalance {
                key,
                available: entry.available(),
                requested: days,
            });
        }

        entry.consume(days);
        self.store.save_balance(entry.clone()).await?;

        info!(%key, days = %days, available = %entry.available(), "days reserved");
        Ok(entry)
    }
}
