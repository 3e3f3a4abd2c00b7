//! Transfer State Machine
//!
//! A transfer runs inside one database transaction, so these states are never
//! persisted or observed by other callers. They exist so the coordinator can
//! report where a failed transfer stopped.

use std::fmt;

/// ```text
/// VALIDATED → DEBIT_APPLIED → DEBIT_RECORDED → CREDIT_APPLIED → CREDIT_RECORDED → COMMITTED
///     └──────────────┴───────────────┴───────────────┴───────────────┴──→ ROLLED_BACK
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    Validated,
    DebitApplied,
    DebitStatementWritten,
    CreditApplied,
    CreditStatementWritten,
    Committed,
    RolledBack,
}

impl TransferState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Committed | TransferState::RolledBack)
    }

    /// Next state on the success path, `None` from a terminal state
    pub fn next(&self) -> Option<TransferState> {
        match self {
            TransferState::Validated => Some(TransferState::DebitApplied),
            TransferState::DebitApplied => Some(TransferState::DebitStatementWritten),
            TransferState::DebitStatementWritten => Some(TransferState::CreditApplied),
            TransferState::CreditApplied => Some(TransferState::CreditStatementWritten),
            TransferState::CreditStatementWritten => Some(TransferState::Committed),
            TransferState::Committed | TransferState::RolledBack => None,
        }
    }

    /// Whether `to` is a legal transition from this state
    pub fn can_transition(&self, to: TransferState) -> bool {
        match to {
            TransferState::RolledBack => !self.is_terminal(),
            other => self.next() == Some(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Validated => "VALIDATED",
            TransferState::DebitApplied => "DEBIT_APPLIED",
            TransferState::DebitStatementWritten => "DEBIT_RECORDED",
            TransferState::CreditApplied => "CREDIT_APPLIED",
            TransferState::CreditStatementWritten => "CREDIT_RECORDED",
            TransferState::Committed => "COMMITTED",
            TransferState::RolledBack => "ROLLED_BACK",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Committed.is_terminal());
        assert!(TransferState::RolledBack.is_terminal());
        assert!(!TransferState::Validated.is_terminal());
        assert!(!TransferState::CreditStatementWritten.is_terminal());
    }

    #[test]
    fn test_success_path_reaches_committed() {
        let mut state = TransferState::Validated;
        let mut steps = 0;
        while let Some(next) = state.next() {
            assert!(state.can_transition(next));
            state = next;
            steps += 1;
        }
        assert_eq!(state, TransferState::Committed);
        assert_eq!(steps, 5);
    }

    #[test]
    fn test_rollback_allowed_from_any_live_state() {
        assert!(TransferState::Validated.can_transition(TransferState::RolledBack));
        assert!(TransferState::CreditApplied.can_transition(TransferState::RolledBack));
        assert!(!TransferState::Committed.can_transition(TransferState::RolledBack));
    }

    #[test]
    fn test_no_skipping_legs() {
        assert!(!TransferState::Validated.can_transition(TransferState::CreditApplied));
        assert!(!TransferState::DebitApplied.can_transition(TransferState::Committed));
    }
}
