use crate::money::Money;
use crate::schemas::MemberId;
use thiserror::Error;

/// Why an expense record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpenseViolation {
    #[error("amount {0} is not positive")]
    NonPositiveAmount(Money),
    #[error("split_among is empty")]
    EmptySplit,
    #[error("payer {0} is not a member of the group")]
    UnknownPayer(MemberId),
    #[error("split member {0} is not a member of the group")]
    UnknownSplitMember(MemberId),
    #[error("split member {0} is listed more than once")]
    DuplicateSplitMember(MemberId),
    #[error("amount overflows the group ledger")]
    LedgerOverflow,
}

/// Failures of the settlement engine. Neither is retryable: the inputs are
/// defective.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("invalid expense {expense_id}: {violation}")]
    InvalidExpense {
        expense_id: String,
        violation: ExpenseViolation,
    },

    #[error("unbalanced ledger: member {member_id} left with {residual}")]
    UnbalancedLedger { member_id: MemberId, residual: Money },
}
