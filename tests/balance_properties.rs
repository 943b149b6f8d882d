use proptest::prelude::*;
use rust_decimal::Decimal;
use splitbook::{
    Amount, Error, Expense, NewSettlement, Parties, Party, PartyId, Period, RoundingPolicy,
    Settlement, SplitPolicy, calculate_balance, recommend_settlement,
};
use time::{
    Month,
    macros::{date, datetime},
};

const ALEX: PartyId = PartyId::new(1);
const SAM: PartyId = PartyId::new(2);

fn parties() -> Parties {
    Parties::new(vec![
        Party::new(ALEX, "Alex").expect("valid party"),
        Party::new(SAM, "Sam").expect("valid party"),
    ])
    .expect("two distinct parties")
}

fn october() -> Period {
    Period::new(2025, Month::October)
}

/// Build expenses from amounts in cents, the smallest amount an expense can
/// have.
fn expenses(cents: &[u32], payer_is_b: &[bool], full_split: &[bool]) -> Vec<Expense> {
    cents
        .iter()
        .enumerate()
        .map(|(index, cents)| Expense {
            id: index as i64 + 1,
            amount: Amount::new(Decimal::new(i64::from(*cents), 2)).expect("positive amount"),
            payer: if payer_is_b.get(index).copied().unwrap_or(false) {
                SAM
            } else {
                ALEX
            },
            split_policy: if full_split.get(index).copied().unwrap_or(false) {
                SplitPolicy::PayerOwedFull
            } else {
                SplitPolicy::Equal
            },
            period: october(),
            date: date!(2025 - 10 - 15),
            description: String::new(),
            category: None,
            location: None,
        })
        .collect()
}

fn record(new_settlement: NewSettlement, sequence: u32) -> Settlement {
    Settlement {
        id: i64::from(sequence) + 1,
        from: new_settlement.from,
        to: new_settlement.to,
        amount: new_settlement.amount,
        period: new_settlement.period,
        sequence,
        recorded_at: new_settlement.recorded_at,
    }
}

#[test]
fn no_expenses_means_no_balance() {
    let balance = calculate_balance(&[], &[], &parties()).expect("balance");

    assert_eq!(balance.net_balance, Decimal::ZERO);
    assert!(recommend_settlement(&balance, &RoundingPolicy::default()).is_settled());
}

#[test]
fn sub_cent_expense_cannot_reach_the_ledger() {
    assert_eq!(
        "10.001".parse::<Amount>(),
        Err(Error::SubMinorUnitAmount(Decimal::new(10_001, 3)))
    );
}

proptest! {
    #[test]
    fn fractions_of_a_cent_are_rejected(
        mantissa in 1i64..=1_000_000_000,
        scale in 3u32..=6,
    ) {
        let value = Decimal::new(mantissa, scale);
        prop_assume!(value.normalize().scale() > 2);

        prop_assert_eq!(Amount::new(value), Err(Error::SubMinorUnitAmount(value)));
    }

    #[test]
    fn swapping_parties_negates_balance(
        cents in prop::collection::vec(1u32..=1_000_000, 0..=30),
        payer_is_b in prop::collection::vec(any::<bool>(), 0..=30),
        full_split in prop::collection::vec(any::<bool>(), 0..=30),
    ) {
        let expenses = expenses(&cents, &payer_is_b, &full_split);
        let parties = parties();

        let balance = calculate_balance(&expenses, &[], &parties).expect("balance");
        let swapped = calculate_balance(&expenses, &[], &parties.swapped()).expect("balance");

        prop_assert_eq!(balance.net_balance, -swapped.net_balance);
        prop_assert_eq!(
            balance.net_balance_for(ALEX).expect("known party"),
            swapped.net_balance_for(ALEX).expect("known party")
        );
    }

    #[test]
    fn positions_sum_to_zero(
        cents in prop::collection::vec(1u32..=1_000_000, 0..=30),
        payer_is_b in prop::collection::vec(any::<bool>(), 0..=30),
        full_split in prop::collection::vec(any::<bool>(), 0..=30),
    ) {
        let expenses = expenses(&cents, &payer_is_b, &full_split);

        let balance = calculate_balance(&expenses, &[], &parties()).expect("balance");

        let alex = balance.net_balance_for(ALEX).expect("known party");
        let sam = balance.net_balance_for(SAM).expect("known party");
        prop_assert_eq!(alex + sam, Decimal::ZERO);
    }

    #[test]
    fn recording_recommendation_settles_period(
        cents in prop::collection::vec(1u32..=1_000_000, 1..=30),
        payer_is_b in prop::collection::vec(any::<bool>(), 1..=30),
        full_split in prop::collection::vec(any::<bool>(), 1..=30),
    ) {
        let expenses = expenses(&cents, &payer_is_b, &full_split);
        let parties = parties();
        let policy = RoundingPolicy::default();

        let before = calculate_balance(&expenses, &[], &parties).expect("balance");
        let recommendation = recommend_settlement(&before, &policy);

        let settlements: Vec<Settlement> = NewSettlement::from_recommendation(
            &recommendation,
            october(),
            datetime!(2025 - 11 - 01 09:00 UTC),
        )
        .map(|new_settlement| record(new_settlement, 0))
        .into_iter()
        .collect();

        let after = calculate_balance(&expenses, &settlements, &parties).expect("balance");

        prop_assert!(after.net_balance.abs() <= policy.threshold);
        prop_assert!(recommend_settlement(&after, &policy).is_settled());
    }

    #[test]
    fn exact_settlement_zeroes_balance(
        cents in prop::collection::vec(1u32..=1_000_000, 1..=30),
        payer_is_b in prop::collection::vec(any::<bool>(), 1..=30),
        full_split in prop::collection::vec(any::<bool>(), 1..=30),
    ) {
        let expenses = expenses(&cents, &payer_is_b, &full_split);
        let parties = parties();

        let before = calculate_balance(&expenses, &[], &parties).expect("balance");
        prop_assume!(before.net_balance != Decimal::ZERO);
        // Half-cent balances cannot be paid exactly.
        prop_assume!(before.net_balance.normalize().scale() <= Amount::MINOR_UNIT_SCALE);

        let (from, to) = if before.net_balance > Decimal::ZERO {
            (SAM, ALEX)
        } else {
            (ALEX, SAM)
        };
        let settlement = record(
            NewSettlement {
                from,
                to,
                amount: Amount::new(before.net_balance.abs()).expect("positive amount"),
                period: october(),
                recorded_at: datetime!(2025 - 11 - 01 09:00 UTC),
            },
            0,
        );

        let after = calculate_balance(&expenses, &[settlement], &parties).expect("balance");

        prop_assert_eq!(after.net_balance, Decimal::ZERO);
    }
}
