//! Summaries of a period: totals, the balance and the recommended settlement.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
};

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    BalanceResult, Error, Expense, Parties, Period, RoundingPolicy, Settlement,
    SettlementRecommendation, SplitPolicy, calculate_balance, expense::get_expenses_for_period,
    money::checked_add, party::get_parties, recommend_settlement, settlement::get_settlements,
};

/// The name used for expenses without a category.
pub const UNCATEGORISED: &str = "Uncategorised";

/// The name used for expenses without a location.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Reads the records needed to summarize a period.
pub trait PeriodSource {
    /// The two parties of the ledger.
    fn parties(&self) -> Result<Parties, Error>;

    /// Every expense filed under `period`.
    fn expenses(&self, period: Period) -> Result<Vec<Expense>, Error>;

    /// Every settlement recorded for `period`.
    fn settlements(&self, period: Period) -> Result<Vec<Settlement>, Error>;
}

/// Reads period records straight from a SQLite database.
#[derive(Debug, Clone, Copy)]
pub struct SQLitePeriodSource<'a> {
    connection: &'a Connection,
}

impl<'a> SQLitePeriodSource<'a> {
    /// Create a source that reads from `connection`.
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }
}

impl PeriodSource for SQLitePeriodSource<'_> {
    fn parties(&self) -> Result<Parties, Error> {
        get_parties(self.connection)
    }

    fn expenses(&self, period: Period) -> Result<Vec<Expense>, Error> {
        get_expenses_for_period(period, self.connection)
    }

    fn settlements(&self, period: Period) -> Result<Vec<Settlement>, Error> {
        get_settlements(period, self.connection)
    }
}

/// Remembers what a [PeriodSource] returned so each record set is only read
/// once.
///
/// Create one for a single computation and drop it afterwards. It never sees
/// writes made after a read, so it must not outlive the computation.
#[derive(Debug)]
pub struct ReadThroughCache<S> {
    source: S,
    parties: RefCell<Option<Parties>>,
    expenses: RefCell<HashMap<Period, Vec<Expense>>>,
    settlements: RefCell<HashMap<Period, Vec<Settlement>>>,
}

impl<S: PeriodSource> ReadThroughCache<S> {
    /// Wrap `source` in an empty cache.
    pub fn new(source: S) -> Self {
        Self {
            source,
            parties: RefCell::new(None),
            expenses: RefCell::new(HashMap::new()),
            settlements: RefCell::new(HashMap::new()),
        }
    }
}

impl<S: PeriodSource> PeriodSource for ReadThroughCache<S> {
    fn parties(&self) -> Result<Parties, Error> {
        if let Some(parties) = self.parties.borrow().as_ref() {
            return Ok(parties.clone());
        }

        let parties = self.source.parties()?;
        *self.parties.borrow_mut() = Some(parties.clone());

        Ok(parties)
    }

    fn expenses(&self, period: Period) -> Result<Vec<Expense>, Error> {
        if let Some(expenses) = self.expenses.borrow().get(&period) {
            return Ok(expenses.clone());
        }

        let expenses = self.source.expenses(period)?;
        self.expenses.borrow_mut().insert(period, expenses.clone());

        Ok(expenses)
    }

    fn settlements(&self, period: Period) -> Result<Vec<Settlement>, Error> {
        if let Some(settlements) = self.settlements.borrow().get(&period) {
            return Ok(settlements.clone());
        }

        let settlements = self.source.settlements(period)?;
        self.settlements
            .borrow_mut()
            .insert(period, settlements.clone());

        Ok(settlements)
    }
}

/// Everything there is to know about the money spent in a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    /// The period being summarized.
    pub period: Period,
    /// The two parties of the ledger.
    pub parties: Parties,
    /// The expenses of the period, oldest first.
    pub expenses: Vec<Expense>,
    /// The settlements of the period, in the order recorded.
    pub settlements: Vec<Settlement>,
    /// The sum of all expenses, whether split 50/50 or 100%.
    pub total_expenses: Decimal,
    /// The sum of the expenses split 50/50.
    pub shared_total: Decimal,
    /// Everything party A paid for.
    pub paid_by_a: Decimal,
    /// Everything party B paid for.
    pub paid_by_b: Decimal,
    /// Total spent per category.
    pub by_category: BTreeMap<String, Decimal>,
    /// Total spent per location.
    pub by_location: BTreeMap<String, Decimal>,
    /// Who owes whom.
    pub balance: BalanceResult,
    /// The transfer that would settle the balance.
    pub recommendation: SettlementRecommendation,
    /// Whether a settlement has been recorded, which closes the period to
    /// changes.
    pub is_settled: bool,
}

/// Summarize the expenses and settlements of `period`.
///
/// # Errors
/// Returns any error from reading `source` or from [calculate_balance].
pub fn summarize_period<S: PeriodSource>(
    source: &S,
    period: Period,
    policy: &RoundingPolicy,
) -> Result<PeriodSummary, Error> {
    let parties = source.parties()?;
    let expenses = source.expenses(period)?;
    let settlements = source.settlements(period)?;

    let balance = calculate_balance(&expenses, &settlements, &parties)?;
    let recommendation = recommend_settlement(&balance, policy);

    let mut total_expenses = Decimal::ZERO;
    let mut shared_total = Decimal::ZERO;
    let mut paid_by_a = Decimal::ZERO;
    let mut paid_by_b = Decimal::ZERO;
    let mut by_category = BTreeMap::new();
    let mut by_location = BTreeMap::new();

    for expense in &expenses {
        let amount = expense.amount.as_decimal();
        total_expenses = checked_add(total_expenses, amount)?;

        if expense.split_policy == SplitPolicy::Equal {
            shared_total = checked_add(shared_total, amount)?;
        }

        if expense.payer == parties.a().id {
            paid_by_a = checked_add(paid_by_a, amount)?;
        } else {
            paid_by_b = checked_add(paid_by_b, amount)?;
        }

        let category = expense.category.as_deref().unwrap_or(UNCATEGORISED);
        add_to_bucket(&mut by_category, category, amount)?;

        let location = expense.location.as_deref().unwrap_or(UNKNOWN_LOCATION);
        add_to_bucket(&mut by_location, location, amount)?;
    }

    let is_settled = !settlements.is_empty();

    Ok(PeriodSummary {
        period,
        parties,
        expenses,
        settlements,
        total_expenses,
        shared_total,
        paid_by_a,
        paid_by_b,
        by_category,
        by_location,
        balance,
        recommendation,
        is_settled,
    })
}

fn add_to_bucket(
    buckets: &mut BTreeMap<String, Decimal>,
    name: &str,
    amount: Decimal,
) -> Result<(), Error> {
    let total = buckets.entry(name.to_owned()).or_insert(Decimal::ZERO);
    *total = checked_add(*total, amount)?;

    Ok(())
}

/// Summarize several periods, reading each record set at most once.
///
/// # Errors
/// Returns the first error from [summarize_period].
pub fn summarize_periods<S: PeriodSource>(
    source: S,
    periods: &[Period],
    policy: &RoundingPolicy,
) -> Result<Vec<PeriodSummary>, Error> {
    let cache = ReadThroughCache::new(source);

    periods
        .iter()
        .map(|period| summarize_period(&cache, *period, policy))
        .collect()
}


#[cfg(test)]
mod read_through_cache_tests {
    use std::cell::Cell;

    use crate::{
        Error, Expense, Parties, Party, PartyId, Period, Settlement,
        summary::{PeriodSource, ReadThroughCache},
    };
    use time::Month;

    #[derive(Default)]
    struct CountingSource {
        party_reads: Cell<u32>,
        expense_reads: Cell<u32>,
        settlement_reads: Cell<u32>,
    }

    impl PeriodSource for &CountingSource {
        fn parties(&self) -> Result<Parties, Error> {
            self.party_reads.set(self.party_reads.get() + 1);
            Parties::new(vec![
                Party::new(PartyId::new(1), "Alex")?,
                Party::new(PartyId::new(2), "Sam")?,
            ])
        }

        fn expenses(&self, _period: Period) -> Result<Vec<Expense>, Error> {
            self.expense_reads.set(self.expense_reads.get() + 1);
            Ok(Vec::new())
        }

        fn settlements(&self, _period: Period) -> Result<Vec<Settlement>, Error> {
            self.settlement_reads.set(self.settlement_reads.get() + 1);
            Ok(Vec::new())
        }
    }

    #[test]
    fn reads_each_record_set_once() {
        let source = CountingSource::default();
        let cache = ReadThroughCache::new(&source);
        let october = Period::new(2025, Month::October);

        for _ in 0..3 {
            cache.parties().unwrap();
            cache.expenses(october).unwrap();
            cache.settlements(october).unwrap();
        }

        assert_eq!(source.party_reads.get(), 1);
        assert_eq!(source.expense_reads.get(), 1);
        assert_eq!(source.settlement_reads.get(), 1);
    }

    #[test]
    fn caches_periods_separately() {
        let source = CountingSource::default();
        let cache = ReadThroughCache::new(&source);

        cache.expenses(Period::new(2025, Month::October)).unwrap();
        cache.expenses(Period::new(2025, Month::November)).unwrap();
        cache.expenses(Period::new(2025, Month::October)).unwrap();

        assert_eq!(source.expense_reads.get(), 2);
    }

    #[test]
    fn does_not_cache_errors() {
        struct FailingSource {
            reads: Cell<u32>,
        }

        impl PeriodSource for &FailingSource {
            fn parties(&self) -> Result<Parties, Error> {
                self.reads.set(self.reads.get() + 1);
                Err(Error::InvalidPartyCount(3))
            }

            fn expenses(&self, _period: Period) -> Result<Vec<Expense>, Error> {
                Ok(Vec::new())
            }

            fn settlements(&self, _period: Period) -> Result<Vec<Settlement>, Error> {
                Ok(Vec::new())
            }
        }

        let source = FailingSource {
            reads: Cell::new(0),
        };
        let cache = ReadThroughCache::new(&source);

        assert_eq!(cache.parties(), Err(Error::InvalidPartyCount(3)));
        assert_eq!(cache.parties(), Err(Error::InvalidPartyCount(3)));
        assert_eq!(source.reads.get(), 2);
    }
}
