//! Computes who owes whom for a period.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    Error, Expense, Parties, PartyId, Period, Settlement, SplitPolicy,
    money::{checked_add, checked_sub},
};

/// The outstanding balance between the two parties for a period.
///
/// This is always derived from the full list of expenses and settlements of a
/// period and never stored.
///
/// The sign of [BalanceResult::net_balance] is relative to party A: a positive
/// balance means party B owes party A, a negative balance means party A owes
/// party B.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceResult {
    /// Party A, the reference point for the sign of the balances.
    pub party_a: PartyId,
    /// Party B.
    pub party_b: PartyId,
    /// The sum of every expense split 50/50.
    pub total_equal: Decimal,
    /// What each party should have paid towards the 50/50 expenses.
    pub fair_share: Decimal,
    /// The 50/50 expenses paid by party A.
    pub paid_equal_a: Decimal,
    /// The 50/50 expenses paid by party B.
    pub paid_equal_b: Decimal,
    /// The 100% expenses paid by party A, which party B owes in full.
    pub owed_full_a: Decimal,
    /// The 100% expenses paid by party B, which party A owes in full.
    pub owed_full_b: Decimal,
    /// Party A's position from expenses alone, before any settlement.
    pub expense_balance: Decimal,
    /// The total transferred from party A to party B.
    pub settled_a_to_b: Decimal,
    /// The total transferred from party B to party A.
    pub settled_b_to_a: Decimal,
    /// The balance still outstanding after settlements.
    pub net_balance: Decimal,
}

impl BalanceResult {
    /// The net balance from the point of view of `party`: positive when the
    /// other party owes `party` money.
    ///
    /// # Errors
    /// Returns [Error::UnknownPayer] if `party` is neither party A nor B.
    pub fn net_balance_for(&self, party: PartyId) -> Result<Decimal, Error> {
        if party == self.party_a {
            Ok(self.net_balance)
        } else if party == self.party_b {
            Ok(-self.net_balance)
        } else {
            Err(Error::UnknownPayer(party))
        }
    }
}

/// Calculate the outstanding balance between the two parties.
///
/// `expenses` and `settlements` must be every record of a single period.
/// Expenses split 50/50 are pooled and each party's fair share is half the
/// pool. Expenses marked 100% are owed in full by the party who did not pay.
/// Settlements then move the balance towards zero: money sent from A to B
/// reduces what A owes B and vice versa.
///
/// No expenses and no settlements gives a balance of zero.
///
/// # Errors
/// This function will return a:
/// - [Error::UnknownPayer] if a record references someone other than the two parties,
/// - [Error::SelfSettlement] if a settlement is from a party to themselves,
/// - [Error::PeriodMismatch] if the records do not all share a period,
/// - or [Error::AmountOverflow] if the totals are too large to represent.
pub fn calculate_balance(
    expenses: &[Expense],
    settlements: &[Settlement],
    parties: &Parties,
) -> Result<BalanceResult, Error> {
    let party_a = parties.a().id;
    let party_b = parties.b().id;

    let mut period_check = PeriodCheck::default();

    let mut total_equal = Decimal::ZERO;
    let mut paid_equal_a = Decimal::ZERO;
    let mut paid_equal_b = Decimal::ZERO;
    let mut owed_full_a = Decimal::ZERO;
    let mut owed_full_b = Decimal::ZERO;

    for expense in expenses {
        period_check.check(expense.period)?;
        let amount = expense.amount.as_decimal();
        let paid_by_a = is_party_a(expense.payer, parties)?;

        match (expense.split_policy, paid_by_a) {
            (SplitPolicy::Equal, true) => {
                paid_equal_a = checked_add(paid_equal_a, amount)?;
                total_equal = checked_add(total_equal, amount)?;
            }
            (SplitPolicy::Equal, false) => {
                paid_equal_b = checked_add(paid_equal_b, amount)?;
                total_equal = checked_add(total_equal, amount)?;
            }
            (SplitPolicy::PayerOwedFull, true) => {
                owed_full_a = checked_add(owed_full_a, amount)?;
            }
            (SplitPolicy::PayerOwedFull, false) => {
                owed_full_b = checked_add(owed_full_b, amount)?;
            }
        }
    }

    let fair_share = total_equal / Decimal::TWO;
    let expense_balance = checked_sub(
        checked_add(checked_sub(paid_equal_a, fair_share)?, owed_full_a)?,
        owed_full_b,
    )?;

    let mut settled_a_to_b = Decimal::ZERO;
    let mut settled_b_to_a = Decimal::ZERO;

    for settlement in settlements {
        period_check.check(settlement.period)?;

        if settlement.from == settlement.to {
            return Err(Error::SelfSettlement);
        }

        let amount = settlement.amount.as_decimal();

        // The recipient must be a known party too.
        parties.get(settlement.to)?;

        if is_party_a(settlement.from, parties)? {
            settled_a_to_b = checked_add(settled_a_to_b, amount)?;
        } else {
            settled_b_to_a = checked_add(settled_b_to_a, amount)?;
        }
    }

    let net_balance = checked_sub(
        checked_add(expense_balance, settled_a_to_b)?,
        settled_b_to_a,
    )?;

    tracing::debug!(
        expense_count = expenses.len(),
        settlement_count = settlements.len(),
        total_equal = %total_equal,
        expense_balance = %expense_balance,
        net_balance = %net_balance,
        "Calculated balance"
    );

    Ok(BalanceResult {
        party_a,
        party_b,
        total_equal,
        fair_share,
        paid_equal_a,
        paid_equal_b,
        owed_full_a,
        owed_full_b,
        expense_balance,
        settled_a_to_b,
        settled_b_to_a,
        net_balance,
    })
}

fn is_party_a(party: PartyId, parties: &Parties) -> Result<bool, Error> {
    Ok(parties.get(party)?.id == parties.a().id)
}

/// Makes sure every record seen belongs to the period of the first record.
#[derive(Default)]
struct PeriodCheck {
    expected: Option<Period>,
}

impl PeriodCheck {
    fn check(&mut self, found: Period) -> Result<(), Error> {
        match self.expected {
            None => {
                self.expected = Some(found);
                Ok(())
            }
            Some(expected) if expected == found => Ok(()),
            Some(expected) => Err(Error::PeriodMismatch { expected, found }),
        }
    }
}

#[cfg(test)]
mod calculate_balance_tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{
        Month,
        macros::{date, datetime},
    };

    use crate::{
        Amount, Error, Expense, Parties, Party, PartyId, Period, Settlement, SplitPolicy,
        balance::calculate_balance,
    };

    fn parties() -> Parties {
        Parties::new(vec![
            Party::new(PartyId::new(1), "Alex").unwrap(),
            Party::new(PartyId::new(2), "Sam").unwrap(),
        ])
        .unwrap()
    }

    fn expense(payer: i64, amount: Decimal, split_policy: SplitPolicy) -> Expense {
        Expense {
            id: 0,
            amount: Amount::new(amount).unwrap(),
            payer: PartyId::new(payer),
            split_policy,
            period: Period::new(2025, Month::October),
            date: date!(2025 - 10 - 12),
            description: String::new(),
            category: None,
            location: None,
        }
    }

    fn settlement(from: i64, to: i64, amount: Decimal) -> Settlement {
        Settlement {
            id: 0,
            from: PartyId::new(from),
            to: PartyId::new(to),
            amount: Amount::new(amount).unwrap(),
            period: Period::new(2025, Month::October),
            sequence: 0,
            recorded_at: datetime!(2025 - 11 - 01 12:00 UTC),
        }
    }

    #[test]
    fn no_expenses_is_zero() {
        let result = calculate_balance(&[], &[], &parties()).unwrap();

        assert_eq!(result.net_balance, Decimal::ZERO);
        assert_eq!(result.total_equal, Decimal::ZERO);
    }

    #[test]
    fn shared_and_full_expenses_combine() {
        let expenses = [
            expense(1, dec!(100), SplitPolicy::Equal),
            expense(2, dec!(40), SplitPolicy::PayerOwedFull),
        ];

        let result = calculate_balance(&expenses, &[], &parties()).unwrap();

        assert_eq!(result.total_equal, dec!(100));
        assert_eq!(result.fair_share, dec!(50));
        assert_eq!(result.owed_full_b, dec!(40));
        assert_eq!(result.expense_balance, dec!(10));
        assert_eq!(result.net_balance, dec!(10));
    }

    #[test]
    fn matching_settlement_clears_balance() {
        let expenses = [
            expense(1, dec!(100), SplitPolicy::Equal),
            expense(2, dec!(40), SplitPolicy::PayerOwedFull),
        ];
        let settlements = [settlement(2, 1, dec!(10))];

        let result = calculate_balance(&expenses, &settlements, &parties()).unwrap();

        assert_eq!(result.settled_b_to_a, dec!(10));
        assert_eq!(result.net_balance, Decimal::ZERO);
    }

    #[test]
    fn equal_expense_paid_by_b_means_a_owes_half() {
        let expenses = [expense(2, dec!(30), SplitPolicy::Equal)];

        let result = calculate_balance(&expenses, &[], &parties()).unwrap();

        assert_eq!(result.net_balance, dec!(-15));
    }

    #[test]
    fn full_expense_paid_by_a_is_owed_in_full() {
        let expenses = [expense(1, dec!(19.99), SplitPolicy::PayerOwedFull)];

        let result = calculate_balance(&expenses, &[], &parties()).unwrap();

        assert_eq!(result.total_equal, Decimal::ZERO);
        assert_eq!(result.net_balance, dec!(19.99));
    }

    #[test]
    fn huge_totals_fail_instead_of_panicking() {
        let expenses = [
            expense(1, Decimal::MAX, SplitPolicy::Equal),
            expense(2, Decimal::MAX, SplitPolicy::Equal),
        ];

        let result = calculate_balance(&expenses, &[], &parties());

        assert_eq!(result, Err(Error::AmountOverflow));
    }

    #[test]
    fn huge_settlements_fail_instead_of_panicking() {
        let expenses = [expense(2, Decimal::MAX, SplitPolicy::PayerOwedFull)];
        let settlements = [settlement(2, 1, Decimal::MAX)];

        let result = calculate_balance(&expenses, &settlements, &parties());

        assert_eq!(result, Err(Error::AmountOverflow));
    }

    #[test]
    fn odd_cent_split_keeps_half_cent() {
        let expenses = [expense(1, dec!(0.01), SplitPolicy::Equal)];

        let result = calculate_balance(&expenses, &[], &parties()).unwrap();

        assert_eq!(result.net_balance, dec!(0.005));
    }

    #[test]
    fn settlement_from_a_reduces_what_a_owes() {
        let expenses = [expense(2, dec!(50), SplitPolicy::PayerOwedFull)];
        let settlements = [settlement(1, 2, dec!(20))];

        let result = calculate_balance(&expenses, &settlements, &parties()).unwrap();

        assert_eq!(result.expense_balance, dec!(-50));
        assert_eq!(result.net_balance, dec!(-30));
    }

    #[test]
    fn overpaying_flips_the_direction() {
        let expenses = [expense(2, dec!(50), SplitPolicy::PayerOwedFull)];
        let settlements = [settlement(1, 2, dec!(60))];

        let result = calculate_balance(&expenses, &settlements, &parties()).unwrap();

        assert_eq!(result.net_balance, dec!(10));
    }

    #[test]
    fn swapping_parties_negates_balance() {
        let expenses = [
            expense(1, dec!(12.34), SplitPolicy::Equal),
            expense(2, dec!(56.78), SplitPolicy::Equal),
            expense(2, dec!(9.10), SplitPolicy::PayerOwedFull),
        ];
        let settlements = [settlement(1, 2, dec!(3))];

        let forward = calculate_balance(&expenses, &settlements, &parties()).unwrap();
        let backward = calculate_balance(&expenses, &settlements, &parties().swapped()).unwrap();

        assert_eq!(forward.net_balance, -backward.net_balance);
    }

    #[test]
    fn net_balance_for_party_b_is_negated() {
        let expenses = [expense(1, dec!(100), SplitPolicy::Equal)];

        let result = calculate_balance(&expenses, &[], &parties()).unwrap();

        assert_eq!(result.net_balance_for(PartyId::new(1)), Ok(dec!(50)));
        assert_eq!(result.net_balance_for(PartyId::new(2)), Ok(dec!(-50)));
        assert_eq!(
            result.net_balance_for(PartyId::new(3)),
            Err(Error::UnknownPayer(PartyId::new(3)))
        );
    }

    #[test]
    fn fails_on_unknown_payer() {
        let expenses = [
            expense(1, dec!(10), SplitPolicy::Equal),
            expense(3, dec!(10), SplitPolicy::Equal),
        ];

        let result = calculate_balance(&expenses, &[], &parties());

        assert_eq!(result, Err(Error::UnknownPayer(PartyId::new(3))));
    }

    #[test]
    fn fails_on_settlement_with_stranger() {
        let settlements = [settlement(1, 3, dec!(10))];

        let result = calculate_balance(&[], &settlements, &parties());

        assert_eq!(result, Err(Error::UnknownPayer(PartyId::new(3))));
    }

    #[test]
    fn fails_on_self_settlement() {
        let settlements = [settlement(2, 2, dec!(10))];

        let result = calculate_balance(&[], &settlements, &parties());

        assert_eq!(result, Err(Error::SelfSettlement));
    }

    #[test]
    fn fails_on_mixed_periods() {
        let mut november = expense(1, dec!(10), SplitPolicy::Equal);
        november.period = Period::new(2025, Month::November);
        let expenses = [expense(1, dec!(10), SplitPolicy::Equal), november];

        let result = calculate_balance(&expenses, &[], &parties());

        assert_eq!(
            result,
            Err(Error::PeriodMismatch {
                expected: Period::new(2025, Month::October),
                found: Period::new(2025, Month::November),
            })
        );
    }
}
