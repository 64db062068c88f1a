use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;
use time::{Date, macros::format_description};

use carteira_rs::{Plan, check_subscription, get_user_by_email, set_subscription};

/// A utility for granting or cancelling a registered user's plan.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DB_PATH")]
    db_path: String,

    /// The email the user logs in with.
    #[arg(long)]
    email: String,

    /// The plan to grant, "solo" or "casal". Leave out to cancel the plan.
    #[arg(long)]
    plan: Option<Plan>,

    /// The last day the plan is valid, e.g. 2025-12-31.
    #[arg(long, value_parser = parse_date, required_if_eq_any = [("plan", "solo"), ("plan", "casal")])]
    until: Option<Date>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);

    if !db_path.is_file() {
        print_error(format!("File does not exist at {db_path:#?}!"));
        exit(1);
    }

    let connection = Connection::open(db_path)?;
    let user = get_user_by_email(args.email.trim(), &connection)?;

    match args.plan {
        Some(plan) => println!("Granting the {plan} plan to {}", user.email),
        None => println!("Cancelling the plan of {}", user.email),
    }

    set_subscription(user.id, args.plan, args.until, &connection)?;

    let today = time::OffsetDateTime::now_utc().date();
    let status = check_subscription(user.id, today, &connection)?;
    println!(
        "Subscription updated: subscribed = {}, ends = {}",
        status.subscribed,
        status
            .subscription_end
            .map(|end| end.to_string())
            .unwrap_or_else(|| "never set".to_owned())
    );

    Ok(())
}

fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
}

fn print_error(error: impl ToString) {
    eprintln!("\x1b[31;1m{}\x1b[0m", error.to_string())
}
