use crate::balance::{compute_balances, Balances};
use crate::error::{ExpenseViolation, SettlementError};
use crate::money::Money;
use crate::schemas::{Group, GroupExpense, MemberId};
use crate::settlement::SettlementResolver;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SettlementEntry {
    pub debtor_id: MemberId,
    pub debtor_name: String,
    pub creditor_id: MemberId,
    pub creditor_name: String,
    pub amount: Money,
}

/// Response for a group-settlement request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub group: Group,
    pub total_expenses: Money,
    pub member_balances: Balances,
    pub settlements: Vec<SettlementEntry>,
}

/// Runs the balance calculator and the resolver over one group's ledger.
pub fn settle_group(
    group: &Group,
    expenses: &[GroupExpense],
    resolver: &SettlementResolver,
) -> Result<GroupSummary, SettlementError> {
    let member_balances = compute_balances(group, expenses).map_err(|err| {
        if let SettlementError::InvalidExpense { expense_id, violation } = &err {
            tracing::warn!(group_id = %group.id, %expense_id, %violation, "rejected expense");
        }
        err
    })?;
    let total_expenses = sum_amounts(expenses).map_err(|err| {
        tracing::warn!(group_id = %group.id, error = %err, "expense total overflowed");
        err
    })?;
    let settlements = resolver.resolve(&member_balances).map_err(|err| {
        tracing::warn!(group_id = %group.id, error = %err, "could not settle group");
        err
    })?;

    let name_of = |id: &str| {
        group
            .member(id)
            .map(|member| member.name.clone())
            .unwrap_or_default()
    };
    let settlements = settlements
        .into_iter()
        .map(|settlement| SettlementEntry {
            debtor_name: name_of(&settlement.debtor_id),
            creditor_name: name_of(&settlement.creditor_id),
            debtor_id: settlement.debtor_id,
            creditor_id: settlement.creditor_id,
            amount: settlement.amount,
        })
        .collect();

    tracing::debug!(group_id = %group.id, expenses = expenses.len(), "settled group");

    Ok(GroupSummary {
        group: group.clone(),
        total_expenses,
        member_balances,
        settlements,
    })
}

fn sum_amounts(expenses: &[GroupExpense]) -> Result<Money, SettlementError> {
    expenses.iter().try_fold(Money::ZERO, |total, expense| {
        total
            .checked_add(expense.amount)
            .ok_or_else(|| SettlementError::InvalidExpense {
                expense_id: expense.id.clone(),
                violation: ExpenseViolation::LedgerOverflow,
            })
    })
}
