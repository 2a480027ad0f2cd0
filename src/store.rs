//! Persistence seam.
//!
//! The leave core never talks to a database directly; everything it reads or
//! writes goes through a [`LeaveStore`]. [`MemoryStore`] keeps it all in
//! process and backs the CLI and the tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

use crate::engine::BalanceEntry;
use crate::model::{
    AccrualLogEntry, BalanceKey, EmployeeId, LeaveRequest, LeaveStatus, LeaveType, RequestId,
};

/// Failure reported by the persistence backend. Passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("leave request {0} already exists")]
    DuplicateRequest(RequestId),
    #[error("leave request {0} does not exist")]
    MissingRequest(RequestId),
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn load_balance(&self, key: BalanceKey) -> Result<Option<BalanceEntry>, StoreError>;

    async fn save_balance(&self, entry: BalanceEntry) -> Result<(), StoreError>;

    async fn insert_request(&self, request: LeaveRequest) -> Result<(), StoreError>;

    async fn load_request(&self, id: RequestId) -> Result<Option<LeaveRequest>, StoreError>;

    async fn update_request_status(
        &self,
        id: RequestId,
        status: LeaveStatus,
    ) -> Result<(), StoreError>;

    async fn append_accrual_log(&self, entry: AccrualLogEntry) -> Result<(), StoreError>;

    async fn list_active_employees(&self) -> Result<Vec<EmployeeId>, StoreError>;

    async fn list_leave_types(&self) -> Result<Vec<LeaveType>, StoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    leave_types: Vec<LeaveType>,
    /// Employee id to active flag.
    employees: BTreeMap<EmployeeId, bool>,
    balances: HashMap<BalanceKey, BalanceEntry>,
    requests: BTreeMap<RequestId, LeaveRequest>,
    accrual_log: Vec<AccrualLogEntry>,
}

/// In-process [`LeaveStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // writes never span a panic point, so poisoned tables are still consistent
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_leave_type(&self, leave_type: LeaveType) {
        let mut tables = self.tables();
        tables.leave_types.retain(|t| t.id != leave_type.id);
        tables.leave_types.push(leave_type);
    }

    pub fn add_employee(&self, employee: EmployeeId, active: bool) {
        self.tables().employees.insert(employee, active);
    }

    /// Seed a balance directly, bypassing the ledger.
    pub fn put_balance(&self, entry: BalanceEntry) {
        self.tables().balances.insert(entry.key(), entry);
    }

    /// All balances, ordered by key.
    pub fn balances(&self) -> Vec<BalanceEntry> {
        let mut balances: Vec<_> = self.tables().balances.values().cloned().collect();
        balances.sort_by_key(|b| b.key());
        balances
    }

    pub fn requests(&self) -> Vec<LeaveRequest> {
        self.tables().requests.values().cloned().collect()
    }

    pub fn accrual_log(&self) -> Vec<AccrualLogEntry> {
        self.tables().accrual_log.clone()
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    async fn load_balance(&self, key: BalanceKey) -> Result<Option<BalanceEntry>, StoreError> {
        Ok(self.tables().balances.get(&key).cloned())
    }

    async fn save_balance(&self, entry: BalanceEntry) -> Result<(), StoreError> {
        self.tables().balances.insert(entry.key(), entry);
        Ok(())
    }

    async fn insert_request(&self, request: LeaveRequest) -> Result<(), StoreError> {
        let mut tables = self.tables();
        if tables.requests.contains_key(&request.id) {
            return Err(StoreError::DuplicateRequest(request.id));
        }
        tables.requests.insert(request.id, request);
        Ok(())
    }

    async fn load_request(&self, id: RequestId) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.tables().requests.get(&id).cloned())
    }

    async fn update_request_status(
        &self,
        id: RequestId,
        status: LeaveStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables();
        let request = tables
            .requests
            .get_mut(&id)
            .ok_or(StoreError::MissingRequest(id))?;
        request.status = status;
        Ok(())
    }

    async fn append_accrual_log(&self, entry: AccrualLogEntry) -> Result<(), StoreError> {
        self.tables().accrual_log.push(entry);
        Ok(())
    }

    async fn list_active_employees(&self) -> Result<Vec<EmployeeId>, StoreError> {
        Ok(self
            .tables()
            .employees
            .iter()
            .filter(|(_, active)| **active)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn list_leave_types(&self) -> Result<Vec<LeaveType>, StoreError> {
        Ok(self.tables().leave_types.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Days;
    use chrono::NaiveDate;

    fn request(id: RequestId) -> LeaveRequest {
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        LeaveRequest {
            id,
            employee: 1,
            leave_type: 1,
            start: day,
            end: day,
            days_requested: 1,
            reason: "Dentist".into(),
            status: LeaveStatus::Pending,
        }
    }

    #[tokio::test]
    async fn only_active_employees_are_listed() {
        let store = MemoryStore::new();
        store.add_employee(3, true);
        store.add_employee(1, true);
        store.add_employee(2, false);
        assert_eq!(store.list_active_employees().await.unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn duplicate_request_id_is_rejected() {
        let store = MemoryStore::new();
        store.insert_request(request(1)).await.unwrap();
        assert_eq!(
            store.insert_request(request(1)).await,
            Err(StoreError::DuplicateRequest(1))
        );
    }

    #[tokio::test]
    async fn update_status_of_missing_request_fails() {
        let store = MemoryStore::new();
        assert_eq!(
            store.update_request_status(9, LeaveStatus::Approved).await,
            Err(StoreError::MissingRequest(9))
        );
    }

    #[tokio::test]
    async fn leave_type_is_replaced_by_id() {
        let store = MemoryStore::new();
        let mut annual = LeaveType {
            id: 1,
            name: "Annual".into(),
            max_per_year: Days::whole(18),
            accrual_rate: Days::from_float(1.5),
        };
        store.add_leave_type(annual.clone());
        annual.accrual_rate = Days::whole(2);
        store.add_leave_type(annual);

        let types = store.list_leave_types().await.unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].accrual_rate, Days::whole(2));
    }

    #[tokio::test]
    async fn balance_round_trips_through_store() {
        let store = MemoryStore::new();
        let key = BalanceKey::new(1, 1, 2025);
        assert_eq!(store.load_balance(key).await.unwrap(), None);

        let entry = BalanceEntry::new(key, Days::whole(10), Days::whole(3));
        store.save_balance(entry.clone()).await.unwrap();
        assert_eq!(store.load_balance(key).await.unwrap(), Some(entry));
    }
}
