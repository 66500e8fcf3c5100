use crate::balance::Balances;
use crate::error::SettlementError;
use crate::money::Money;
use crate::schemas::MemberId;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A single payment from a debtor to a creditor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub debtor_id: MemberId,
    pub creditor_id: MemberId,
    pub amount: Money,
}

// Heap entry for one side of the matching. The largest outstanding amount
// comes out first; among equal amounts the earlier member wins.
#[derive(Debug, PartialEq, Eq)]
struct Party {
    outstanding: Money,
    position: usize,
    id: MemberId,
}

impl Ord for Party {
    fn cmp(&self, other: &Self) -> Ordering {
        self.outstanding
            .cmp(&other.outstanding)
            .then_with(|| other.position.cmp(&self.position))
    }
}

impl PartialOrd for Party {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Greedy largest-pair matcher turning balances into payments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettlementResolver {
    tolerance: Money,
}

impl SettlementResolver {
    /// Balances whose magnitude is at most `tolerance` count as settled.
    pub fn new(tolerance: Money) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    pub fn tolerance(&self) -> Money {
        self.tolerance
    }

    /// Produces the payments that bring every balance back to zero.
    ///
    /// Each round pairs the largest creditor with the largest debtor and
    /// moves the smaller of the two amounts. Whoever still has more than the
    /// tolerance outstanding goes back into the queue. Anything left once one
    /// side runs out means the balances did not sum to zero.
    pub fn resolve(&self, balances: &Balances) -> Result<Vec<Settlement>, SettlementError> {
        let mut creditors = BinaryHeap::new();
        let mut debtors = BinaryHeap::new();

        for (position, (id, balance)) in balances.iter().enumerate() {
            if balance.abs() <= self.tolerance {
                continue;
            }
            let party = Party {
                outstanding: balance.abs(),
                position,
                id: id.to_string(),
            };
            if balance.is_positive() {
                creditors.push(party);
            } else {
                debtors.push(party);
            }
        }

        let mut settlements = Vec::new();
        while !creditors.is_empty() && !debtors.is_empty() {
            let (Some(mut creditor), Some(mut debtor)) = (creditors.pop(), debtors.pop()) else {
                break;
            };
            let amount = creditor.outstanding.min(debtor.outstanding);
            settlements.push(Settlement {
                debtor_id: debtor.id.clone(),
                creditor_id: creditor.id.clone(),
                amount,
            });
            creditor.outstanding -= amount;
            debtor.outstanding -= amount;

            if creditor.outstanding > self.tolerance {
                creditors.push(creditor);
            }
            if debtor.outstanding > self.tolerance {
                debtors.push(debtor);
            }
        }

        if let Some(creditor) = creditors.pop() {
            return Err(SettlementError::UnbalancedLedger {
                member_id: creditor.id,
                residual: creditor.outstanding,
            });
        }
        if let Some(debtor) = debtors.pop() {
            return Err(SettlementError::UnbalancedLedger {
                member_id: debtor.id,
                residual: -debtor.outstanding,
            });
        }

        Ok(settlements)
    }
}

/// Resolves settlements requiring the balances to cancel out exactly.
pub fn resolve_settlements(balances: &Balances) -> Result<Vec<Settlement>, SettlementError> {
    SettlementResolver::default().resolve(balances)
}
