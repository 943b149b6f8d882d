//! Turns a balance into the transfer that would settle it.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::{Amount, BalanceResult, PartyId};

/// How balances are rounded when recommending a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundingPolicy {
    /// Balances within this distance of zero count as settled.
    pub threshold: Decimal,
    /// The number of decimal places in the smallest unit of the currency,
    /// e.g. 2 for cents.
    pub minor_unit_scale: u32,
}

impl RoundingPolicy {
    /// Half a cent: the largest error that rounding to cents can introduce.
    pub const DEFAULT_THRESHOLD: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

    /// Round `amount` up to the next whole minor unit, e.g. 10.001 to 10.01.
    ///
    /// Rounding up means whoever is owed money never gets less than they are
    /// owed.
    pub fn round_up(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.minor_unit_scale, RoundingStrategy::ToPositiveInfinity)
    }
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            minor_unit_scale: Amount::MINOR_UNIT_SCALE,
        }
    }
}

/// Who should pay whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Direction {
    /// The party who owes money.
    pub from: PartyId,
    /// The party who is owed money.
    pub to: PartyId,
}

/// The transfer that would settle a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettlementRecommendation {
    /// Who should pay whom, or `None` if nothing is owed.
    pub direction: Option<Direction>,
    /// How much should be paid, rounded up to the minor unit. Zero if nothing
    /// is owed.
    pub amount: Decimal,
}

impl SettlementRecommendation {
    /// Recommend a settlement for a raw net balance, where a positive balance
    /// means `party_b` owes `party_a`.
    pub fn from_net_balance(
        net_balance: Decimal,
        party_a: PartyId,
        party_b: PartyId,
        policy: &RoundingPolicy,
    ) -> Self {
        let direction = if net_balance < -policy.threshold {
            Some(Direction {
                from: party_a,
                to: party_b,
            })
        } else if net_balance > policy.threshold {
            Some(Direction {
                from: party_b,
                to: party_a,
            })
        } else {
            None
        };

        match direction {
            Some(direction) => Self {
                direction: Some(direction),
                amount: policy.round_up(net_balance.abs()),
            },
            None => Self::settled(),
        }
    }

    /// The recommendation for a balance that needs no settlement.
    pub fn settled() -> Self {
        Self {
            direction: None,
            amount: Decimal::ZERO,
        }
    }

    /// Whether the balance is settled within the rounding threshold.
    pub fn is_settled(&self) -> bool {
        self.direction.is_none()
    }
}

/// Recommend the transfer that would settle `balance`.
///
/// Balances within [RoundingPolicy::threshold] of zero are treated as settled
/// instead of comparing against exactly zero. Otherwise the party with the
/// negative position should pay the other the absolute balance, rounded up
/// to the minor unit.
pub fn recommend_settlement(
    balance: &BalanceResult,
    policy: &RoundingPolicy,
) -> SettlementRecommendation {
    let recommendation = SettlementRecommendation::from_net_balance(
        balance.net_balance,
        balance.party_a,
        balance.party_b,
        policy,
    );

    tracing::debug!(
        net_balance = %balance.net_balance,
        amount = %recommendation.amount,
        settled = recommendation.is_settled(),
        "Recommended settlement"
    );

    recommendation
}
