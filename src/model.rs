//! Core domain types for leave management.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Days;

/// Employee identifier.
pub type EmployeeId = u32;

/// Leave type identifier.
pub type LeaveTypeId = u16;

/// Leave request identifier.
pub type RequestId = u32;

/// Reference data for a kind of leave (annual, sick, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveType {
    pub id: LeaveTypeId,
    pub name: String,
    /// Maximum days that may be taken in one accrual year.
    pub max_per_year: Days,
    /// Days credited per monthly accrual run.
    pub accrual_rate: Days,
}

/// Unique key of a balance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BalanceKey {
    pub employee: EmployeeId,
    pub leave_type: LeaveTypeId,
    pub year: i32,
}

impl BalanceKey {
    pub fn new(employee: EmployeeId, leave_type: LeaveTypeId, year: i32) -> Self {
        Self {
            employee,
            leave_type,
            year,
        }
    }
}

impl fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "employee {} / leave type {} / {}",
            self.employee, self.leave_type, self.year
        )
    }
}

/// Lifecycle of a leave request.
///
/// Only `Pending` can move; every other state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn can_transition_to(&self, to: LeaveStatus) -> bool {
        *self == Self::Pending && to.is_terminal()
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated input for a leave request, as a form would submit it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaveCandidate {
    pub id: RequestId,
    pub employee: EmployeeId,
    pub leave_type: Option<LeaveTypeId>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub reason: String,
}

/// A validated leave request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: RequestId,
    pub employee: EmployeeId,
    pub leave_type: LeaveTypeId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Inclusive day count between `start` and `end`.
    pub days_requested: u32,
    pub reason: String,
    pub status: LeaveStatus,
}

impl LeaveRequest {
    /// Balance record the request draws from. The start date decides the year.
    pub fn balance_key(&self) -> BalanceKey {
        use chrono::Datelike;
        BalanceKey::new(self.employee, self.leave_type, self.start.year())
    }
}

/// An input to the leave engine.
#[derive(Debug, Clone)]
pub enum Command {
    /// Validate a candidate and store it as a pending request.
    Submit(LeaveCandidate),
    /// Approve a pending request, reserving its days.
    Approve { request: RequestId },
    /// Reject a pending request.
    Reject { request: RequestId },
    /// Withdraw a pending request.
    Cancel { request: RequestId },
    /// Run the monthly accrual as of the given date.
    Accrue { as_of: NaiveDate },
}

/// Append-only audit line written for every applied accrual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualLogEntry {
    pub employee: EmployeeId,
    pub leave_type: LeaveTypeId,
    pub accrual_date: NaiveDate,
    pub accrued: Days,
    pub reason: String,
}
