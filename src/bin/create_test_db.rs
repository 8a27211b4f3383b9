use std::error::Error;
use std::path::Path;
use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime, UtcOffset};

use family_ledger::{
    Currency, ExpenseCategory, ExpenseForm, FamilyDraft, NewMember, SqliteDocumentStore,
    SyncAdapter, UserId,
};

/// A utility for creating a test database with a demo family for family_ledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// (title, amount, category, location, days ago, spent by)
const DEMO_EXPENSES: [(&str, &str, ExpenseCategory, &str, i64, &str); 8] = [
    ("Groceries", "82.40", ExpenseCategory::Food, "Supermarket", 0, "alice"),
    ("Bus pass", "45.00", ExpenseCategory::Transportation, "Station", 1, "bob"),
    ("Electricity", "120.15", ExpenseCategory::Utilities, "Online", 3, "alice"),
    ("Cinema", "24.00", ExpenseCategory::Entertainment, "Town centre", 5, "bob"),
    ("Rent", "950.00", ExpenseCategory::Housing, "Online", 9, "alice"),
    ("Dentist", "60.00", ExpenseCategory::Healthcare, "Clinic", 16, "bob"),
    ("School books", "35.99", ExpenseCategory::Education, "Bookshop", 34, "alice"),
    ("Train tickets", "89.50", ExpenseCategory::Travel, "Station", 40, "bob"),
];

/// Create and populate a database for manual testing.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
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
    let conn = Connection::open(output_path)?;
    let documents = SqliteDocumentStore::new(conn)?;
    let adapter = SyncAdapter::new(Arc::new(documents), UtcOffset::UTC);

    println!("Creating demo family...");
    let family = adapter
        .create_family_with_member(
            FamilyDraft {
                name: "The Demo Family".to_owned(),
                default_currency: Currency::USD,
            },
            &demo_member("alice", "Alice"),
        )
        .await?;
    adapter
        .join_existing_family(&family.id, &demo_member("bob", "Bob"))
        .await?;

    println!("Creating demo expenses...");
    let today = OffsetDateTime::now_utc().date();
    for (title, amount, category, location, days_ago, user_id) in DEMO_EXPENSES {
        let date = today - Duration::days(days_ago);
        let draft = ExpenseForm {
            title: title.to_owned(),
            amount: amount.to_owned(),
            location: location.to_owned(),
            date: date.to_string(),
            category,
            notes: String::new(),
        }
        .validate(UtcOffset::UTC)?;

        adapter
            .create_expense(&draft, &UserId::new(user_id), &family.id)
            .await?;
    }

    println!(
        "Success! Sign in as 'alice' or 'bob', or join with the code {}.",
        family.join_code
    );

    Ok(())
}

fn demo_member(id: &str, name: &str) -> NewMember {
    NewMember {
        id: UserId::new(id),
        name: name.to_owned(),
        email: Some(format!("{id}@example.com")),
    }
}
