use crate::error::{ExpenseViolation, SettlementError};
use crate::money::Money;
use crate::schemas::{Group, GroupExpense, MemberId};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;

/// Net position of every member of a group, in membership order.
///
/// Positive means the group owes the member, negative means the member owes
/// the group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Balances(IndexMap<MemberId, Money>);

impl Balances {
    pub fn get(&self, id: &str) -> Option<Money> {
        self.0.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Money)> + '_ {
        self.0.iter().map(|(member, balance)| (member.as_str(), *balance))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> Money {
        self.0.values().copied().sum()
    }
}

/// Repeated ids are merged into their first position.
impl FromIterator<(MemberId, Money)> for Balances {
    fn from_iter<I: IntoIterator<Item = (MemberId, Money)>>(iter: I) -> Self {
        let mut balances = IndexMap::new();
        for (member, balance) in iter {
            *balances.entry(member).or_insert(Money::ZERO) += balance;
        }
        Balances(balances)
    }
}

/// Checks the structural rules of a single expense against its group.
pub fn validate_expense(group: &Group, expense: &GroupExpense) -> Result<(), SettlementError> {
    check_expense(group, expense).map_err(|violation| SettlementError::InvalidExpense {
        expense_id: expense.id.clone(),
        violation,
    })
}

fn check_expense(group: &Group, expense: &GroupExpense) -> Result<(), ExpenseViolation> {
    if !expense.amount.is_positive() {
        return Err(ExpenseViolation::NonPositiveAmount(expense.amount));
    }
    if expense.split_among.is_empty() {
        return Err(ExpenseViolation::EmptySplit);
    }
    if !group.is_member(&expense.paid_by) {
        return Err(ExpenseViolation::UnknownPayer(expense.paid_by.clone()));
    }
    let mut seen = HashSet::with_capacity(expense.split_among.len());
    for member in &expense.split_among {
        if !group.is_member(member) {
            return Err(ExpenseViolation::UnknownSplitMember(member.clone()));
        }
        if !seen.insert(member.as_str()) {
            return Err(ExpenseViolation::DuplicateSplitMember(member.clone()));
        }
    }
    Ok(())
}

/// Computes every member's net balance from the group's expense ledger.
///
/// The payer is credited with the full amount and each member of the split
/// is debited an equal share, with leftover cents going to the first members
/// of `split_among`. Members without any activity appear with a zero balance.
pub fn compute_balances(
    group: &Group,
    expenses: &[GroupExpense],
) -> Result<Balances, SettlementError> {
    for expense in expenses {
        validate_expense(group, expense)?;
    }

    let mut balances: IndexMap<MemberId, Money> = group
        .members
        .iter()
        .map(|member| (member.id.clone(), Money::ZERO))
        .collect();

    for expense in expenses {
        apply_expense(&mut balances, expense).ok_or_else(|| SettlementError::InvalidExpense {
            expense_id: expense.id.clone(),
            violation: ExpenseViolation::LedgerOverflow,
        })?;
    }

    Ok(Balances(balances))
}

// Membership was checked beforehand, so every lookup hits. `None` means a
// running balance left the representable range.
fn apply_expense(balances: &mut IndexMap<MemberId, Money>, expense: &GroupExpense) -> Option<()> {
    if let Some(payer) = balances.get_mut(expense.paid_by.as_str()) {
        *payer = payer.checked_add(expense.amount)?;
    }
    let shares = expense.amount.split_evenly(expense.split_among.len());
    for (member, share) in expense.split_among.iter().zip(shares) {
        if let Some(balance) = balances.get_mut(member.as_str()) {
            *balance = balance.checked_sub(share)?;
        }
    }
    Some(())
}
