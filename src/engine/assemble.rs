//! Turning a form submission into a pending leave request.

use chrono::{Datelike, NaiveDate};

use super::error::{LedgerError, RequestError};
use super::ledger::BalanceLedger;
use super::validate::LeavePolicy;
use crate::Days;
use crate::model::{BalanceKey, LeaveCandidate, LeaveRequest, LeaveStatus};
use crate::store::LeaveStore;

/// Strip markup and quote characters, trim, and cut to the policy's hard limit.
pub fn sanitize_reason(raw: &str, policy: &LeavePolicy) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
        .collect();
    stripped
        .trim()
        .chars()
        .take(policy.reason_truncate_chars)
        .collect()
}

/// Validate `candidate` and check it against the ledger.
///
/// Steps, stopping at the first failure:
/// - date range
/// - leave type present
/// - reason present and short enough once sanitized
/// - enough available days in the start year's balance
///
/// Nothing is reserved here; that happens on approval.
pub async fn assemble<S: LeaveStore>(
    ledger: &BalanceLedger<S>,
    policy: &LeavePolicy,
    candidate: LeaveCandidate,
    today: NaiveDate,
) -> Result<LeaveRequest, RequestError> {
    let range = policy.validate(candidate.start, candidate.end, today)?;

    let leave_type = candidate.leave_type.ok_or(RequestError::MissingLeaveType)?;

    let reason = sanitize_reason(&candidate.reason, policy);
    if reason.is_empty() {
        return Err(RequestError::MissingReason);
    }
    let len = reason.chars().count();
    if len > policy.reason_max_chars {
        return Err(RequestError::ReasonTooLong {
            len,
            max: policy.reason_max_chars,
        });
    }

    let days_requested = range.days();
    let key = BalanceKey::new(candidate.employee, leave_type, range.start().year());
    let available = ledger.available_for(key).await?;
    let requested = Days::from(days_requested);
    if requested > available {
        return Err(LedgerError::InsufficientBalance {
            key,
            available,
            requested,
        }
        .into());
    }

    Ok(LeaveRequest {
        id: candidate.id,
        employee: candidate.employee,
        leave_type,
        start: range.start(),
        end: range.end(),
        days_requested,
        reason,
        status: LeaveStatus::Pending,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::engine::{BalanceEntry, DateRangeError};
    use crate::store::MemoryStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()
    }

    fn candidate(reason: &str) -> LeaveCandidate {
        let tomorrow = today() + Duration::days(1);
        LeaveCandidate {
            id: 1,
            employee: 7,
            leave_type: Some(2),
            start: Some(tomorrow),
            end: Some(tomorrow + Duration::days(2)),
            reason: reason.to_string(),
        }
    }

    fn ledger_with_available(days: i64) -> BalanceLedger<MemoryStore> {
        let store = MemoryStore::new();
        store.put_balance(BalanceEntry::new(
            BalanceKey::new(7, 2, 2025),
            Days::whole(days),
            Days::ZERO,
        ));
        BalanceLedger::new(Arc::new(store))
    }

    async fn run(
        ledger: &BalanceLedger<MemoryStore>,
        candidate: LeaveCandidate,
    ) -> Result<LeaveRequest, RequestError> {
        assemble(ledger, &LeavePolicy::default(), candidate, today()).await
    }

    #[test]
    fn sanitize_strips_markup_and_trims() {
        let policy = LeavePolicy::default();
        assert_eq!(
            sanitize_reason("  <b>\"Family\" event's</b>  ", &policy),
            "bFamily events/b"
        );
    }

    #[test]
    fn sanitize_truncates_to_hard_limit() {
        let policy = LeavePolicy::default();
        let long = "a".repeat(1500);
        assert_eq!(sanitize_reason(&long, &policy).chars().count(), 1000);
    }

    #[tokio::test]
    async fn assembles_pending_request() {
        let ledger = ledger_with_available(10);
        let request = run(&ledger, candidate("Family event")).await.unwrap();

        assert_eq!(request.days_requested, 3);
        assert_eq!(request.status, LeaveStatus::Pending);
        assert_eq!(request.reason, "Family event");
        assert_eq!(request.leave_type, 2);

        // nothing reserved at submission
        assert_eq!(
            ledger
                .available_for(BalanceKey::new(7, 2, 2025))
                .await
                .unwrap(),
            Days::whole(10)
        );
    }

    #[tokio::test]
    async fn insufficient_balance_mentions_available_days() {
        let ledger = ledger_with_available(2);
        let err = run(&ledger, candidate("Family event")).await.unwrap_err();
        assert!(matches!(
            err,
            RequestError::Ledger(LedgerError::InsufficientBalance { available, .. })
                if available == Days::whole(2)
        ));
        assert!(err.to_string().contains("available 2"), "{err}");
    }

    #[tokio::test]
    async fn date_errors_come_first() {
        let ledger = ledger_with_available(10);
        let mut c = candidate("");
        c.leave_type = None;
        c.start = None;
        assert!(matches!(
            run(&ledger, c).await,
            Err(RequestError::Dates(DateRangeError::MissingDate))
        ));
    }

    #[tokio::test]
    async fn missing_leave_type() {
        let ledger = ledger_with_available(10);
        let mut c = candidate("Family event");
        c.leave_type = None;
        assert!(matches!(
            run(&ledger, c).await,
            Err(RequestError::MissingLeaveType)
        ));
    }

    #[tokio::test]
    async fn reason_of_only_markup_is_missing() {
        let ledger = ledger_with_available(10);
        assert!(matches!(
            run(&ledger, candidate(" <\"'> ")).await,
            Err(RequestError::MissingReason)
        ));
    }

    #[tokio::test]
    async fn reason_length_checked_after_sanitization() {
        let ledger = ledger_with_available(10);

        // 500 letters wrapped in markup: fine once stripped
        let wrapped = format!("<{}>", "a".repeat(500));
        assert!(run(&ledger, candidate(&wrapped)).await.is_ok());

        let mut c = candidate(&"a".repeat(501));
        c.id = 2;
        assert!(matches!(
            run(&ledger, c).await,
            Err(RequestError::ReasonTooLong { len: 501, max: 500 })
        ));
    }

    #[tokio::test]
    async fn missing_balance_record_passes_through() {
        let ledger = BalanceLedger::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            run(&ledger, candidate("Family event")).await,
            Err(RequestError::Ledger(LedgerError::NoBalanceRecord(_)))
        ));
    }
}
