use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use time::{Date, Duration, OffsetDateTime};

use splitbook::{
    Amount, Expense, NewSettlement, Period, RecordMode, RoundingPolicy, SQLitePeriodSource,
    SplitPolicy, create_expense, create_parties, open_db, record_settlement, summarize_period,
};

/// A utility for creating a test database for splitbook.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
///
/// Last month gets a handful of expenses and is settled, this month is left
/// open with a few expenses of its own.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = open_db(output_path)?;

    println!("Creating parties...");
    let parties = create_parties("Alex", "Sam", &conn)?;
    let alex = parties.a().id;
    let sam = parties.b().id;

    let today = OffsetDateTime::now_utc().date();
    let this_month = today.replace_day(1)?;
    let last_month = (this_month - Duration::days(1)).replace_day(1)?;

    println!("Creating expenses...");
    let expenses = [
        (last_month, "120.00", alex, SplitPolicy::Equal, "Weekly shop", "Groceries", "Market"),
        (last_month, "64.30", sam, SplitPolicy::Equal, "Power bill", "Utilities", "Online"),
        (last_month, "25.00", alex, SplitPolicy::PayerOwedFull, "Sam's half of the gift", "Gifts", "Mall"),
        (last_month, "38.75", sam, SplitPolicy::Equal, "Takeaways", "Eating out", "Noodle Bar"),
        (this_month, "88.20", sam, SplitPolicy::Equal, "Weekly shop", "Groceries", "Market"),
        (this_month, "15.00", alex, SplitPolicy::PayerOwedFull, "Movie ticket", "Entertainment", "Cinema"),
    ];

    for (month, amount, payer, split_policy, description, category, location) in expenses {
        create_expense(
            Expense::build(amount.parse::<Amount>()?, payer, spread(month, description))
                .split_policy(split_policy)
                .description(description)
                .category(Some(category))
                .location(Some(location)),
            &conn,
        )?;
    }

    println!("Settling last month...");
    let last_period = Period::from_date(last_month);
    let summary = summarize_period(
        &SQLitePeriodSource::new(&conn),
        last_period,
        &RoundingPolicy::default(),
    )?;

    if let Some(settlement) = NewSettlement::from_recommendation(
        &summary.recommendation,
        last_period,
        OffsetDateTime::now_utc(),
    ) {
        record_settlement(settlement, RecordMode::FirstOnly, &conn)?;
    }

    println!(
        "Created {} expenses, last month's balance was {}.",
        expenses.len(),
        summary.balance.net_balance.round_dp(2)
    );

    println!("Success!");

    Ok(())
}

/// Pick a day early in `month` so every sample expense lands in the month.
fn spread(month: Date, description: &str) -> Date {
    let offset = (description.len() % 20) as i64;

    month + Duration::days(offset)
}
