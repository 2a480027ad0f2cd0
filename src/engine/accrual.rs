//! Monthly accrual batch.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use tracing::{info, warn};

use super::error::{AccrualError, LedgerError};
use super::ledger::BalanceLedger;
use crate::Days;
use crate::model::{AccrualLogEntry, BalanceKey, EmployeeId, LeaveType, LeaveTypeId};
use crate::store::LeaveStore;

/// Decides how many days an employee earns per run for a leave type.
pub trait AccrualPolicy: Send + Sync {
    fn amount(&self, employee: EmployeeId, leave_type: &LeaveType, as_of: NaiveDate) -> Days;
}

/// The leave type's configured rate, optionally overridden per employee.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredRates {
    overrides: HashMap<(EmployeeId, LeaveTypeId), Days>,
}

impl ConfiguredRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(
        mut self,
        employee: EmployeeId,
        leave_type: LeaveTypeId,
        rate: Days,
    ) -> Self {
        self.overrides.insert((employee, leave_type), rate);
        self
    }
}

impl AccrualPolicy for ConfiguredRates {
    fn amount(&self, employee: EmployeeId, leave_type: &LeaveType, _as_of: NaiveDate) -> Days {
        self.overrides
            .get(&(employee, leave_type.id))
            .copied()
            .unwrap_or(leave_type.accrual_rate)
    }
}

/// One employee / leave type pair the run could not credit.
#[derive(Debug)]
pub struct AccrualFailure {
    pub employee: EmployeeId,
    pub leave_type: LeaveTypeId,
    pub error: LedgerError,
}

/// Outcome of a run: what was credited and what was not.
#[derive(Debug)]
pub struct AccrualReport {
    pub as_of: NaiveDate,
    pub applied: Vec<AccrualLogEntry>,
    pub failures: Vec<AccrualFailure>,
}

impl AccrualReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Credit every active employee for every leave type that accrues.
///
/// Listing employees or leave types failing aborts the run. Anything that goes
/// wrong for a single pair is recorded in the report and the run moves on.
/// Running twice for the same period credits twice.
pub async fn run_monthly_accrual<S: LeaveStore>(
    store: &S,
    ledger: &BalanceLedger<S>,
    policy: &dyn AccrualPolicy,
    as_of: NaiveDate,
) -> Result<AccrualReport, AccrualError> {
    let employees = store.list_active_employees().await?;
    let leave_types: Vec<LeaveType> = store
        .list_leave_types()
        .await?
        .into_iter()
        .filter(|t| t.accrual_rate.is_positive())
        .collect();

    let reason = format!("Monthly accrual for {}", as_of.format("%B %Y"));
    let mut report = AccrualReport {
        as_of,
        applied: Vec::new(),
        failures: Vec::new(),
    };

    for &employee in &employees {
        for leave_type in &leave_types {
            let amount = policy.amount(employee, leave_type, as_of);
            let key = BalanceKey::new(employee, leave_type.id, as_of.year());

            let result = match ledger.apply_accrual(key, amount).await {
                Ok(_) => {
                    let entry = AccrualLogEntry {
                        employee,
                        leave_type: leave_type.id,
                        accrual_date: as_of,
                        accrued: amount,
                        reason: reason.clone(),
                    };
                    // the balance is already credited; a lost audit line is still a failure
                    store
                        .append_accrual_log(entry.clone())
                        .await
                        .map(|()| entry)
                        .map_err(LedgerError::from)
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(entry) => report.applied.push(entry),
                Err(error) => {
                    warn!(
                        employee,
                        leave_type = leave_type.id,
                        reason = %error,
                        "accrual skipped"
                    );
                    report.failures.push(AccrualFailure {
                        employee,
                        leave_type: leave_type.id,
                        error,
                    });
                }
            }
        }
    }

    info!(
        %as_of,
        employees = employees.len(),
        applied = report.applied.len(),
        failed = report.failures.len(),
        "accrual run finished"
    );
    Ok(report)
}
