use std::{collections::HashMap, error::Error, fs, path::PathBuf, process::exit, sync::Arc};

use clap::Parser;
use rusqlite::Connection;
use time::{Date, macros::format_description};

use family_ledger::{
    Session, SqliteDocumentStore, Store, SyncAdapter, UserId, format_currency, get_local_offset,
    local_today, recent_expenses,
    views::{DashboardSummary, Timeframe, TimeframeReport},
};

/// How many of the latest expenses to list.
const RECENT_EXPENSE_COUNT: usize = 5;

/// Print a spending report for a user's family.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The ID of the user to report for.
    #[arg(long)]
    user_id: String,

    /// The period to summarize.
    #[arg(long, value_enum, default_value_t = Timeframe::Month)]
    timeframe: Timeframe,

    /// A day in the period to summarize, e.g. "2024-03-01". Defaults to today.
    #[arg(long, value_parser = parse_date)]
    date: Option<Date>,

    /// The canonical name of the local timezone, e.g. "Pacific/Auckland".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,

    /// Also write the user's data as JSON to this path.
    #[arg(long)]
    export: Option<PathBuf>,
}

fn parse_date(text: &str) -> Result<Date, String> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|error| format!("expected a date like 2024-03-01: {error}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let offset = get_local_offset(&args.timezone)?;
    let connection = Connection::open(&args.db_path)?;
    let documents = SqliteDocumentStore::new(connection)?;
    let session = Session::new(
        SyncAdapter::new(Arc::new(documents), offset),
        Store::default(),
    );

    session.sign_in(&UserId::new(&args.user_id)).await?;
    let snapshot = session.store().snapshot();

    let Some(user) = &snapshot.current_user else {
        eprintln!("No user found with the ID {:?}.", args.user_id);
        exit(1);
    };
    let Some(family) = &snapshot.current_family else {
        eprintln!("{} has not joined a family yet.", user.name);
        exit(1);
    };

    let currency = user.currency;
    let today = args.date.unwrap_or_else(|| local_today(offset));
    let member_names: HashMap<_, _> = snapshot
        .users
        .iter()
        .map(|member| (member.id.clone(), member.name.as_str()))
        .collect();

    let summary = DashboardSummary::new(&snapshot.expenses, today);
    println!("{} ({} members)", family.name, family.members.len());
    println!("  All time:   {}", format_currency(summary.total, currency));
    println!("  Today:      {}", format_currency(summary.today, currency));
    println!("  This month: {}", format_currency(summary.this_month, currency));
    println!(
        "  Last month: {} ({:+.1}%)",
        format_currency(summary.last_month, currency),
        summary.month_change_percent
    );

    let report = TimeframeReport::new(&snapshot.expenses, args.timeframe, today);
    println!();
    println!(
        "This {} ({} to {}): {} over {} expenses",
        report.timeframe,
        report.range.start,
        report.range.end,
        format_currency(report.total, currency),
        report.count
    );

    println!("By category:");
    for group in &report.categories {
        println!(
            "  {:<16}{:>14}{:>8.1}%",
            group.key.to_string(),
            format_currency(group.amount, currency),
            group.percentage
        );
    }

    println!("By member:");
    for group in &report.members {
        let name = member_names
            .get(&group.key)
            .copied()
            .unwrap_or(group.key.as_str());
        println!(
            "  {:<16}{:>14}{:>8.1}%",
            name,
            format_currency(group.amount, currency),
            group.percentage
        );
    }

    println!("Recent expenses:");
    for expense in recent_expenses(&snapshot.expenses, RECENT_EXPENSE_COUNT) {
        println!(
            "  {}  {:<24}{:>14}",
            expense.date,
            expense.title,
            format_currency(expense.amount, currency)
        );
    }

    if let Some(path) = &args.export {
        let json = session.export().await?;
        fs::write(path, json)?;
        println!("Exported data to {path:?}");
    }

    session.sign_out();

    Ok(())
}
