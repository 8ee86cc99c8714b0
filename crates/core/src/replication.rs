//! Replication outcome policy.
//!
//! A write fans out to every configured account. The primary account must
//! succeed and its value is authoritative; every other account is best effort
//! and its failures become partial-replication warnings.

use crate::result::OperationError;
use crate::store::{AccountRole, StoreError};

/// How an account's failure affects the aggregate outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    BestEffort,
}

impl AccountRole {
    /// Primary is required, every other account is best effort.
    pub fn requirement(self) -> Requirement {
        match self {
            AccountRole::Primary => Requirement::Required,
            AccountRole::Secondary => Requirement::BestEffort,
        }
    }
}

/// Result of one operation on one account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountOutcome<T> {
    pub role: AccountRole,
    pub account: String,
    pub result: Result<T, StoreError>,
}

impl<T> AccountOutcome<T> {
    pub fn new(role: AccountRole, account: impl Into<String>, result: Result<T, StoreError>) -> Self {
        Self {
            role,
            account: account.into(),
            result,
        }
    }
}

/// Aggregated outcome across all accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationResult<T> {
    /// The required account's value, present only when it succeeded.
    pub value: Option<T>,
    /// Fatal errors from required accounts and warnings from the others.
    pub errors: Vec<OperationError>,
}

impl<T> ReplicationResult<T> {
    pub fn is_success(&self) -> bool {
        self.value.is_some()
    }
}

/// Folds per-account outcomes into one result.
///
/// Values of best-effort accounts are dropped; callers that need them must
/// inspect the outcomes before aggregating.
pub fn aggregate<T>(outcomes: Vec<AccountOutcome<T>>) -> ReplicationResult<T> {
    let mut value = None;
    let mut errors = Vec::new();

    for outcome in outcomes {
        match (outcome.role.requirement(), outcome.result) {
            (Requirement::Required, Ok(v)) => value = Some(v),
            (Requirement::Required, Err(err)) => {
                errors.push(OperationError::from_store(&err, outcome.role));
            }
            (Requirement::BestEffort, Ok(_)) => {}
            (Requirement::BestEffort, Err(err)) => {
                errors.push(OperationError::partial_replication(&err, outcome.role));
            }
        }
    }

    ReplicationResult { value, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{ErrorKind, Severity};

    fn failure() -> StoreError {
        StoreError::Request {
            status: 500,
            code: "InternalError".to_string(),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_primary_only_success() {
        let result = aggregate(vec![AccountOutcome::new(AccountRole::Primary, "p", Ok(1))]);

        assert_eq!(result.value, Some(1));
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_both_succeed_primary_value_wins() {
        let result = aggregate(vec![
            AccountOutcome::new(AccountRole::Secondary, "s", Ok(2)),
            AccountOutcome::new(AccountRole::Primary, "p", Ok(1)),
        ]);

        assert_eq!(result.value, Some(1));
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_secondary_failure_is_warning() {
        let result = aggregate(vec![
            AccountOutcome::new(AccountRole::Primary, "p", Ok(1)),
            AccountOutcome::new(AccountRole::Secondary, "s", Err(failure())),
        ]);

        assert!(result.is_success());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::PartialReplication);
        assert_eq!(result.errors[0].severity, Severity::Warning);
        assert_eq!(result.errors[0].code.as_deref(), Some("InternalError"));
    }

    #[test]
    fn test_primary_failure_is_fatal_even_if_secondary_succeeds() {
        let result = aggregate(vec![
            AccountOutcome::new(AccountRole::Primary, "p", Err::<i32, _>(failure())),
            AccountOutcome::new(AccountRole::Secondary, "s", Ok(2)),
        ]);

        assert!(!result.is_success());
        assert_eq!(result.value, None);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::Store);
        assert!(result.errors[0].is_fatal());
    }

    #[test]
    fn test_both_fail_reports_both() {
        let result = aggregate(vec![
            AccountOutcome::new(AccountRole::Primary, "p", Err::<i32, _>(failure())),
            AccountOutcome::new(AccountRole::Secondary, "s", Err(failure())),
        ]);

        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].is_fatal());
        assert!(!result.errors[1].is_fatal());
    }
}
