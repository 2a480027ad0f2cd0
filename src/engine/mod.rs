//! Leave processing engine.
//!
//! The engine owns the balance ledger and drives the request lifecycle:
//! submission (validation and a balance check), approval, rejection and
//! cancellation, plus the monthly accrual run. It also consumes an async
//! stream of commands for batch use.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use tokio_stream::{Stream, StreamExt};
use tracing::{error, info};

use crate::Days;
use crate::clock::Clock;
use crate::model::{
    BalanceKey, Command, EmployeeId, LeaveCandidate, LeaveRequest, LeaveStatus, RequestId,
};
use crate::rate_limit::RateLimiter;
use crate::store::LeaveStore;

mod accrual;
pub use accrual::{AccrualFailure, AccrualPolicy, AccrualReport, ConfiguredRates};

mod assemble;
pub use assemble::sanitize_reason;

mod error;
pub use error::{
    AccrualError, DateRangeError, EngineError, LedgerError, RequestError, WorkflowError,
};

mod ledger;
pub use ledger::BalanceLedger;

mod locks;
use locks::KeyedLocks;

mod state;
pub use state::BalanceEntry;

mod validate;
pub use validate::{DateRange, LeavePolicy, validate};

/// The leave processing engine.
pub struct LeaveEngine<S> {
    store: Arc<S>,
    ledger: BalanceLedger<S>,
    clock: Arc<dyn Clock>,
    policy: LeavePolicy,
    rates: Box<dyn AccrualPolicy>,
    /// Submission limit per employee, if any
    limiter: Option<Mutex<RateLimiter>>,
    /// Serializes status changes of the same request
    transitions: KeyedLocks<RequestId>,
}

/// Public API
impl<S: LeaveStore> LeaveEngine<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: BalanceLedger::new(Arc::clone(&store)),
            store,
            clock,
            policy: LeavePolicy::default(),
            rates: Box::new(ConfiguredRates::new()),
            limiter: Some(Mutex::new(RateLimiter::default())),
            transitions: KeyedLocks::new(),
        }
    }

    pub fn with_policy(mut self, policy: LeavePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_accrual_policy(mut self, rates: impl AccrualPolicy + 'static) -> Self {
        self.rates = Box::new(rates);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(Mutex::new(limiter));
        self
    }

    /// Accept every submission. For batch imports, where many rows share one
    /// business date and the clock does not move between them.
    pub fn without_rate_limiter(mut self) -> Self {
        self.limiter = None;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &BalanceLedger<S> {
        &self.ledger
    }

    /// Return the balance record for `key`, if any.
    pub async fn balance(&self, key: BalanceKey) -> Result<Option<BalanceEntry>, LedgerError> {
        self.ledger.balance(key).await
    }

    /// Build a pending request from `candidate` without storing it.
    pub async fn assemble(&self, candidate: LeaveCandidate) -> Result<LeaveRequest, RequestError> {
        assemble::assemble(&self.ledger, &self.policy, candidate, self.clock.today()).await
    }

    /// Rate-limit, assemble and store a new pending request.
    pub async fn submit(&self, candidate: LeaveCandidate) -> Result<LeaveRequest, RequestError> {
        if let Some(limiter) = &self.limiter {
            let limit_key = format!("leave-request:{}", candidate.employee);
            limiter
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .check(&limit_key, self.clock.now())?;
        }

        let request = self.assemble(candidate).await?;
        self.store.insert_request(request.clone()).await?;
        Ok(request)
    }

    /// Approve a pending request.
    ///
    /// The balance is checked again here: it may have shrunk since the
    /// request was submitted. On failure the request stays pending.
    pub async fn approve(&self, id: RequestId) -> Result<LeaveRequest, WorkflowError> {
        self.transition(id, LeaveStatus::Approved).await
    }

    pub async fn reject(&self, id: RequestId) -> Result<LeaveRequest, WorkflowError> {
        self.transition(id, LeaveStatus::Rejected).await
    }

    pub async fn cancel(&self, id: RequestId) -> Result<LeaveRequest, WorkflowError> {
        self.transition(id, LeaveStatus::Cancelled).await
    }

    /// Credit the monthly accrual for every active employee.
    pub async fn run_monthly_accrual(
        &self,
        as_of: NaiveDate,
    ) -> Result<AccrualReport, AccrualError> {
        accrual::run_monthly_accrual(&*self.store, &self.ledger, &*self.rates, as_of).await
    }

    /// Run the engine with the given command stream
    pub async fn run(&self, mut stream: impl Stream<Item = Command> + Unpin) {
        while let Some(command) = stream.next().await {
            // a failed command must not stop the batch; apply already logged it
            let _ = self.apply(command).await;
        }
    }

    /// Apply a single command on top of the current state
    pub async fn apply(&self, command: Command) -> Result<(), EngineError> {
        match command {
            Command::Submit(candidate) => {
                let (id, employee) = (candidate.id, candidate.employee);
                let result = self.submit(candidate).await;
                Self::log_result("submit", id, Some(employee), &result);
                result?;
            }
            Command::Approve { request } => {
                let result = self.approve(request).await;
                Self::log_result("approve", request, None, &result);
                result?;
            }
            Command::Reject { request } => {
                let result = self.reject(request).await;
                Self::log_result("reject", request, None, &result);
                result?;
            }
            Command::Cancel { request } => {
                let result = self.cancel(request).await;
                Self::log_result("cancel", request, None, &result);
                result?;
            }
            Command::Accrue { as_of } => {
                let result = self.run_monthly_accrual(as_of).await;
                if let Err(e) = &result {
                    error!(%as_of, reason = %e, "accrual run aborted");
                }
                result?;
            }
        }
        Ok(())
    }
}

/// Private API
impl<S: LeaveStore> LeaveEngine<S> {
    /// Small helper to log `apply` results
    fn log_result<E: std::fmt::Display>(
        action: &str,
        request: RequestId,
        employee: Option<EmployeeId>,
        result: &Result<LeaveRequest, E>,
    ) {
        match result {
            Ok(applied) => {
                info!(
                    request = %request,
                    employee = %applied.employee,
                    leave_type = %applied.leave_type,
                    days = %applied.days_requested,
                    status = %applied.status,
                    "{action} applied"
                );
            }
            Err(e) => match employee {
                Some(employee) => info!(
                    request = %request,
                    employee = %employee,
                    reason = %e,
                    "{action} skipped"
                ),
                None => info!(request = %request, reason = %e, "{action} skipped"),
            },
        }
    }

    /// Move a pending request to `to`:
    /// - Ensure the request exists and is still pending
    /// - Persist the new status, reserving the days first when approving
    ///   and giving them back if the save fails
    async fn transition(
        &self,
        id: RequestId,
        to: LeaveStatus,
    ) -> Result<LeaveRequest, WorkflowError> {
        let _guard = self.transitions.lock(id).await;

        let mut request = self
            .store
            .load_request(id)
            .await?
            .ok_or(WorkflowError::RequestNotFound(id))?;

        if !request.status.can_transition_to(to) {
            return Err(WorkflowError::InvalidTransition {
                id,
                from: request.status,
                to,
            });
        }

        let saved = if to == LeaveStatus::Approved {
            // status is saved under the balance lock; a failed save gives the days back
            self.ledger
                .reserve_with(
                    request.balance_key(),
                    Days::from(request.days_requested),
                    self.store.update_request_status(id, to),
                )
                .await
                .map_err(|source| WorkflowError::Ledger { id, source })?
        } else {
            self.store.update_request_status(id, to).await
        };
        saved?;

        request.status = to;
        Ok(request)
    }
}
