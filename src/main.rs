use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use tally_core::{
    spending, AlertService, Clock, LedgerStore, MemoryStore, PostingService, ReconcileService,
    TransferRequest, TransferService,
};
use tally_domain::UserId;
use tally_store_json::BookStorage;

mod config;

/// Real-time clock backed by the system UTC time source.
#[derive(Debug, Default, Clone, Copy)]
struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "Ledger consistency engine for a personal finance book"
)]
struct Cli {
    /// Path to the book file (defaults to the platform data directory).
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Acting user; may be omitted when every account has the same owner.
    #[arg(long, global = true)]
    owner: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post every due recurring occurrence up to a date
    Tick {
        /// Posting horizon (YYYY-MM-DD); defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Move money between two accounts as one balanced pair
    Transfer {
        from: Uuid,
        to: Uuid,
        amount: f64,
        /// Transfer date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        title: Option<String>,
    },
    /// List past transfers, newest first
    Transfers {
        #[arg(long, default_value_t = tally_core::transfer::DEFAULT_TRANSFER_LIMIT)]
        limit: usize,
    },
    /// Record a statement against an account's cleared balance
    Reconcile {
        account: Uuid,
        statement_date: NaiveDate,
        statement_balance: f64,
    },
    /// List past statements for an account
    Statements { account: Uuid },
    /// Show derived balances for every account
    Balances,
    /// Show the budget alert feed
    Alerts {
        #[arg(long)]
        unread: bool,
        #[arg(long, default_value_t = tally_core::alerts::DEFAULT_ALERT_LIMIT)]
        limit: usize,
    },
    /// Mark one alert (or all of them) as read
    AlertRead {
        id: Option<Uuid>,
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
    /// Recently posted recurring occurrences, newest first
    Posted {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let clock = SystemClock;
    let storage = BookStorage::new(config::book_path(cli.file.clone()));
    tracing::debug!(path = %storage.path().display(), "using book file");
    let book = storage.load().context("loading book")?;
    let mut store = MemoryStore::new(book);

    match cli.command {
        Commands::Tick { as_of } => {
            let as_of = as_of.unwrap_or_else(|| clock.today());
            let outcome = PostingService::advance(&mut store, as_of, &clock)?;
            for posting in &outcome.posted {
                println!("posted rule {} for {}", posting.rule_id, posting.due_date);
            }
            for alert in &outcome.alerts {
                println!(
                    "alert: budget {} crossed {}% ({:.2}% used)",
                    alert.budget_id, alert.threshold, alert.percent_used
                );
            }
            println!(
                "{} occurrence(s) posted, {} alert(s) raised",
                outcome.posted.len(),
                outcome.alerts.len()
            );
        }
        Commands::Transfer {
            from,
            to,
            amount,
            date,
            title,
        } => {
            let owner = resolve_owner(&store, cli.owner)?;
            let result = TransferService::create(
                &mut store,
                owner,
                TransferRequest {
                    from_account: from,
                    to_account: to,
                    amount,
                    date: date.unwrap_or_else(|| clock.today()),
                    title: title.unwrap_or_default(),
                },
            )?;
            println!(
                "transfer {}: {:.2} from {} to {}",
                result.transfer_group, amount, from, to
            );
        }
        Commands::Transfers { limit } => {
            let owner = resolve_owner(&store, cli.owner)?;
            for record in TransferService::list(&store, owner, limit)? {
                println!(
                    "{}  {:.2}  {} -> {}",
                    record.date, record.amount, record.from_account, record.to_account
                );
            }
        }
        Commands::Reconcile {
            account,
            statement_date,
            statement_balance,
        } => {
            let owner = resolve_owner(&store, cli.owner)?;
            let statement = ReconcileService::reconcile(
                &mut store,
                owner,
                account,
                statement_date,
                statement_balance,
                &clock,
            )?;
            println!(
                "cleared {:.2}, statement {:.2}, difference {:.2}",
                statement.cleared_balance, statement.statement_balance, statement.difference
            );
        }
        Commands::Statements { account } => {
            let owner = resolve_owner(&store, cli.owner)?;
            for statement in ReconcileService::statements(&store, owner, account)? {
                println!(
                    "{}  statement {:.2}  cleared {:.2}  difference {:.2}",
                    statement.statement_date,
                    statement.statement_balance,
                    statement.cleared_balance,
                    statement.difference
                );
            }
        }
        Commands::Balances => {
            let today = clock.today();
            for account in store.book().accounts.clone() {
                let balance = spending::account_balance(&store, &account)?;
                let cleared = spending::cleared_balance(&store, &account, today)?;
                println!(
                    "{}  {}  balance {:.2}  cleared {:.2}",
                    account.id, account.name, balance, cleared
                );
            }
        }
        Commands::Alerts { unread, limit } => {
            let owner = resolve_owner(&store, cli.owner)?;
            let feed = AlertService::feed(&store, owner, unread, limit)?;
            for alert in &feed.alerts {
                let marker = if alert.is_read { " " } else { "*" };
                println!(
                    "{} {}  {}% of budget {} ({:.2}% used, {:.2} spent)",
                    marker,
                    alert.period,
                    alert.threshold,
                    alert.budget_id,
                    alert.percent_used,
                    alert.total_spent
                );
            }
            println!("{} unread", feed.unread_count);
        }
        Commands::AlertRead { id, all } => {
            let owner = resolve_owner(&store, cli.owner)?;
            match (id, all) {
                (Some(id), _) => AlertService::mark_read(&mut store, owner, id)?,
                (None, true) => AlertService::mark_all_read(&mut store, owner)?,
                (None, false) => bail!("pass an alert id or --all"),
            }
        }
        Commands::Posted { limit } => {
            for event in store.recent_post_events(limit)? {
                println!(
                    "{}  rule {}  transaction {}",
                    event.due_date, event.rule_id, event.transaction_id
                );
            }
        }
    }

    storage.save(store.book()).context("saving book")?;
    Ok(())
}

/// Picks the acting user: an explicit flag, otherwise the sole account owner.
fn resolve_owner(store: &MemoryStore, requested: Option<Uuid>) -> Result<UserId> {
    if let Some(owner) = requested {
        return Ok(owner);
    }
    let mut owners: Vec<UserId> = store.book().accounts.iter().map(|a| a.owner).collect();
    owners.sort();
    owners.dedup();
    match owners.as_slice() {
        [only] => Ok(*only),
        [] => bail!("no accounts on file; pass --owner"),
        _ => bail!("accounts belong to multiple owners; pass --owner"),
    }
}
