//! Error types for leave processing.

use chrono::NaiveDate;
use thiserror::Error;

use crate::Days;
use crate::model::{BalanceKey, LeaveStatus, RequestId};
use crate::rate_limit::RateLimited;
use crate::store::StoreError;

/// Top-level error returned by [`LeaveEngine::apply`](super::LeaveEngine::apply).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("leave request rejected: {0}")]
    Request(#[from] RequestError),

    #[error("{0}")]
    Workflow(#[from] WorkflowError),

    #[error("accrual run failed: {0}")]
    Accrual(#[from] AccrualError),
}

/// Date-range validation failure. Only the first failing rule is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRangeError {
    #[error("start and end dates are required")]
    MissingDate,
    #[error("start date {start} is after end date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
    #[error("start date {start} is in the past (today is {today})")]
    PastDate { start: NaiveDate, today: NaiveDate },
    #[error("end date {end} is too far in the future (latest allowed is {latest})")]
    TooFarFuture { end: NaiveDate, latest: NaiveDate },
    #[error("leave spans {days} days, the maximum is {max}")]
    DurationTooLong { days: i64, max: u32 },
}

/// Balance ledger failure.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no balance record for {0}")]
    NoBalanceRecord(BalanceKey),
    #[error("insufficient leave balance for {key}: available {available}, requested {requested}")]
    InsufficientBalance {
        key: BalanceKey,
        available: Days,
        requested: Days,
    },
    #[error("invalid amount {amount} for {key}")]
    InvalidAmount { key: BalanceKey, amount: Days },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error while assembling or submitting a leave request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Dates(#[from] DateRangeError),
    #[error("leave type is required")]
    MissingLeaveType,
    #[error("reason is required")]
    MissingReason,
    #[error("reason is {len} characters long, the maximum is {max}")]
    ReasonTooLong { len: usize, max: usize },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    RateLimited(#[from] RateLimited),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error while moving a request through approval.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("leave request {0} not found")]
    RequestNotFound(RequestId),
    #[error("leave request {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: RequestId,
        from: LeaveStatus,
        to: LeaveStatus,
    },
    #[error("approval of leave request {id} failed: {source}")]
    Ledger { id: RequestId, source: LedgerError },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error that aborts a whole accrual run. Per-employee failures are
/// reported in [`AccrualReport`](super::AccrualReport) instead.
#[derive(Debug, Error)]
pub enum AccrualError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
