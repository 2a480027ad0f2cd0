use serde::{Deserialize, Serialize};

use crate::Days;
use crate::model::BalanceKey;

/// Allocated and used days of one leave type for one employee and year.
///
/// `available` is never stored: it is always `total_allocated - used`.
/// Only the ledger mutates an entry, and it keeps `used <= total_allocated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    key: BalanceKey,
    total_allocated: Days,
    used: Days,
}

impl BalanceEntry {
    pub fn new(key: BalanceKey, total_allocated: Days, used: Days) -> Self {
        Self {
            key,
            total_allocated,
            used,
        }
    }

    /// A zero balance, the baseline for a key's first accrual.
    pub fn empty(key: BalanceKey) -> Self {
        Self::new(key, Days::ZERO, Days::ZERO)
    }

    pub fn key(&self) -> BalanceKey {
        self.key
    }

    pub fn total_allocated(&self) -> Days {
        self.total_allocated
    }

    pub fn used(&self) -> Days {
        self.used
    }

    pub fn available(&self) -> Days {
        self.total_allocated - self.used
    }

    pub(super) fn allocate(&mut self, amount: Days) {
        self.total_allocated += amount;
    }

    pub(super) fn consume(&mut self, days: Days) {
        self.used += days;
    }

    /// Undo a `consume` of the same amount.
    pub(super) fn release(&mut self, days: Days) {
        self.used -= days;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> BalanceKey {
        BalanceKey::new(1, 1, 2025)
    }

    #[test]
    fn empty_entry_is_zero() {
        let entry = BalanceEntry::empty(key());
        assert_eq!(entry.total_allocated(), Days::ZERO);
        assert_eq!(entry.used(), Days::ZERO);
        assert_eq!(entry.available(), Days::ZERO);
    }

    #[test]
    fn available_is_allocated_minus_used() {
        let entry = BalanceEntry::new(key(), Days::whole(10), Days::whole(3));
        assert_eq!(entry.available(), Days::whole(7));
    }

    #[test]
    fn allocate_and_consume_keep_available_derived() {
        let mut entry = BalanceEntry::empty(key());
        entry.allocate(Days::from_float(1.5));
        entry.consume(Days::whole(1));
        assert_eq!(entry.total_allocated(), Days::from_float(1.5));
        assert_eq!(entry.used(), Days::whole(1));
        assert_eq!(entry.available(), Days::from_float(0.5));

        entry.release(Days::whole(1));
        assert_eq!(entry.used(), Days::ZERO);
        assert_eq!(entry.available(), Days::from_float(1.5));
    }
}
