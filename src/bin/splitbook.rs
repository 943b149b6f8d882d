use std::{
    error::Error,
    path::PathBuf,
    process::exit,
    sync::{Arc, Mutex},
};

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use time::{Date, OffsetDateTime, macros::format_description};

use splitbook::{
    Amount, Config, DEFAULT_TIMEZONE, Expense, ExpenseId, NewSettlement, Parties, PartyId, Period,
    PeriodSummary, RecordMode, SQLitePeriodSource, SQLiteSettlementRecorder, Settlement,
    SettlementRecommendation, SettlementRecorder, SplitPolicy, create_expense, create_parties,
    delete_expense, get_expenses_for_period, get_parties, open_db, setup_logging,
    summarize_period, summarize_periods,
};

/// Track expenses shared between two people and settle up each month.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database.
    #[arg(long, env = "SPLITBOOK_DB_PATH", default_value = "splitbook.db", global = true)]
    db_path: PathBuf,

    /// Canonical timezone used to work out today's date, e.g. "Pacific/Auckland".
    #[arg(long, env = "SPLITBOOK_TIMEZONE", default_value = DEFAULT_TIMEZONE, global = true)]
    timezone: String,

    /// Log more detail. Repeat for even more, e.g. -vv.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set up the two people sharing expenses.
    Init {
        /// Name of the first person.
        #[arg(long)]
        party_a: String,

        /// Name of the second person.
        #[arg(long)]
        party_b: String,
    },

    /// Log an expense.
    Add {
        /// Name of the person who paid.
        #[arg(long)]
        payer: String,

        /// How much was paid, e.g. 12.50.
        #[arg(long)]
        amount: Amount,

        /// "equal" to share the cost 50/50, "full" if the other person owes all of it.
        #[arg(long, default_value = "equal")]
        split: SplitPolicy,

        /// When the money was spent as YYYY-MM-DD. Defaults to today.
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,

        /// What the money was spent on.
        #[arg(long, default_value = "")]
        description: String,

        /// A category such as "Groceries".
        #[arg(long)]
        category: Option<String>,

        /// Where the money was spent.
        #[arg(long)]
        location: Option<String>,
    },

    /// Delete an expense from a period that has not been settled.
    Delete {
        /// The ID of the expense.
        #[arg(long)]
        id: ExpenseId,
    },

    /// List the expenses of a period.
    List {
        /// The period as YYYY-MM. Defaults to the current month.
        #[arg(long)]
        period: Option<Period>,
    },

    /// Show who owes whom for a period.
    Balance {
        /// The period as YYYY-MM. Defaults to the current month.
        #[arg(long)]
        period: Option<Period>,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Record the recommended transfer and close the period.
    Settle {
        /// The period as YYYY-MM. Defaults to the current month.
        #[arg(long)]
        period: Option<Period>,

        /// Record another settlement for a period that was already settled.
        #[arg(long)]
        resettle: bool,
    },

    /// Remove the most recent settlement of a period.
    Unsettle {
        /// The period as YYYY-MM. Defaults to the current month.
        #[arg(long)]
        period: Option<Period>,
    },

    /// Show the balances of a range of periods.
    History {
        /// The first period as YYYY-MM.
        #[arg(long)]
        from: Period,

        /// The last period as YYYY-MM.
        #[arg(long)]
        to: Period,

        /// Print the summaries as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
}

fn main() {
    let args = Args::parse();

    setup_logging(args.verbose);

    if let Err(error) = run(args) {
        eprintln!("Error: {error}");
        exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = Config::new(args.db_path, &args.timezone)?;
    let connection = open_db(&config.db_path)?;

    match args.command {
        Command::Init { party_a, party_b } => {
            let parties = create_parties(&party_a, &party_b, &connection)?;
            println!(
                "Sharing expenses between {} and {}.",
                parties.a().name,
                parties.b().name
            );
        }
        Command::Add {
            payer,
            amount,
            split,
            date,
            description,
            category,
            location,
        } => {
            let parties = get_parties(&connection)?;
            let payer = parties.by_name(&payer)?;
            let date = match date {
                Some(date) => date,
                None => config.today()?,
            };

            let expense = create_expense(
                Expense::build(amount, payer.id, date)
                    .split_policy(split)
                    .description(&description)
                    .category(category.as_deref())
                    .location(location.as_deref()),
                &connection,
            )?;

            println!(
                "Added expense #{}: {} paid {} ({}) in {}.",
                expense.id, payer.name, expense.amount, expense.split_policy, expense.period
            );
        }
        Command::Delete { id } => {
            delete_expense(id, &connection)?;
            println!("Deleted expense #{id}.");
        }
        Command::List { period } => {
            let period = period_or_current(period, &config)?;
            let parties = get_parties(&connection)?;
            let expenses = get_expenses_for_period(period, &connection)?;

            if expenses.is_empty() {
                println!("No expenses in {period}.");
            }

            for expense in expenses {
                println!(
                    "#{:<5} {}  {:>10}  {:<12} {:<5} {}",
                    expense.id,
                    expense.date,
                    expense.amount,
                    name_of(expense.payer, &parties),
                    expense.split_policy,
                    expense.description
                );
            }
        }
        Command::Balance { period, json } => {
            let period = period_or_current(period, &config)?;
            let summary =
                summarize_period(&SQLitePeriodSource::new(&connection), period, &config.rounding)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Command::Settle { period, resettle } => {
            let period = period_or_current(period, &config)?;
            settle(period, resettle, &config, connection)?;
        }
        Command::Unsettle { period } => {
            let period = period_or_current(period, &config)?;
            let parties = get_parties(&connection)?;
            let recorder = SQLiteSettlementRecorder::new(Arc::new(Mutex::new(connection)));

            match recorder.remove_latest_settlement(period)? {
                Some(settlement) => println!(
                    "Removed settlement of {} from {} to {}. {} is open again.",
                    settlement.amount,
                    name_of(settlement.from, &parties),
                    name_of(settlement.to, &parties),
                    period
                ),
                None => println!("{period} has not been settled."),
            }
        }
        Command::History { from, to, json } => {
            let periods = Period::range_inclusive(from, to);
            let summaries = summarize_periods(
                SQLitePeriodSource::new(&connection),
                &periods,
                &config.rounding,
            )?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if summaries.is_empty() {
                println!("{to} is before {from}.");
            } else {
                for summary in &summaries {
                    println!(
                        "{}  spent {:>10}  {}{}",
                        summary.period,
                        summary.total_expenses,
                        describe_recommendation(&summary.recommendation, &summary.parties),
                        if summary.is_settled { " [settled]" } else { "" }
                    );
                }
            }
        }
    }

    Ok(())
}

fn settle(
    period: Period,
    resettle: bool,
    config: &Config,
    connection: Connection,
) -> Result<(), Box<dyn Error>> {
    let summary =
        summarize_period(&SQLitePeriodSource::new(&connection), period, &config.rounding)?;

    let Some(settlement) = NewSettlement::from_recommendation(
        &summary.recommendation,
        period,
        OffsetDateTime::now_utc(),
    ) else {
        println!("Nothing to settle for {period}.");
        return Ok(());
    };

    let mode = if resettle {
        RecordMode::Resettle
    } else {
        RecordMode::FirstOnly
    };

    let recorder = SQLiteSettlementRecorder::new(Arc::new(Mutex::new(connection)));

    match recorder.record_settlement(settlement, mode) {
        Ok(settlement) => print_settlement(&settlement, &summary.parties),
        Err(error) if error.is_retryable() => {
            println!("{period} has already been settled.");
            for settlement in recorder.get_settlements(period)? {
                print_settlement(&settlement, &summary.parties);
            }
            println!("Use --resettle to record another settlement.");
        }
        Err(error) => return Err(error.into()),
    }

    Ok(())
}

fn period_or_current(period: Option<Period>, config: &Config) -> Result<Period, splitbook::Error> {
    match period {
        Some(period) => Ok(period),
        None => config.current_period(),
    }
}

fn name_of(id: PartyId, parties: &Parties) -> &str {
    parties
        .get(id)
        .map(|party| party.name.as_str())
        .unwrap_or("?")
}

fn describe_recommendation(recommendation: &SettlementRecommendation, parties: &Parties) -> String {
    match recommendation.direction {
        Some(direction) => format!(
            "{} owes {} {}",
            name_of(direction.from, parties),
            name_of(direction.to, parties),
            recommendation.amount
        ),
        None => "all square".to_owned(),
    }
}

fn print_settlement(settlement: &Settlement, parties: &Parties) {
    println!(
        "Settlement #{} for {}: {} paid {} {} on {}.",
        settlement.sequence,
        settlement.period,
        name_of(settlement.from, parties),
        name_of(settlement.to, parties),
        settlement.amount,
        settlement.recorded_at.date()
    );
}

fn print_summary(summary: &PeriodSummary) {
    let parties = &summary.parties;

    println!(
        "{}{}",
        summary.period,
        if summary.is_settled { " (settled)" } else { "" }
    );
    println!(
        "Spent {} in {} expenses, {} of it shared 50/50.",
        summary.total_expenses,
        summary.expenses.len(),
        summary.shared_total
    );
    println!("  {} paid {}", parties.a().name, summary.paid_by_a);
    println!("  {} paid {}", parties.b().name, summary.paid_by_b);

    if !summary.by_category.is_empty() {
        println!("By category:");
        for (category, total) in &summary.by_category {
            println!("  {category:<20} {total:>10}");
        }
    }

    if !summary.by_location.is_empty() {
        println!("By location:");
        for (location, total) in &summary.by_location {
            println!("  {location:<20} {total:>10}");
        }
    }

    for settlement in &summary.settlements {
        print_settlement(settlement, parties);
    }

    println!(
        "Balance: {}.",
        describe_recommendation(&summary.recommendation, parties)
    );
}
