use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::application::BookLedgerService;
use crate::domain::Book;
use crate::storage::SqliteStore;

/// Bookledger - lending and sales ledger for a book catalog
#[derive(Parser)]
#[command(name = "bookledger")]
#[command(about = "Manage a catalog of books kept as key-value ledger state")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "BOOKLEDGER_DATABASE", default_value = "bookledger.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init {
        /// Also load the starting catalog
        #[arg(long)]
        seed: bool,
    },

    /// Load the starting catalog, overwriting those books
    Seed,

    /// Add a new book
    #[command(allow_negative_numbers = true)]
    Create {
        id: String,
        title: String,
        num_avail: i64,
        num_borrow: i64,
        /// Current borrowers, in order
        borrowers: Vec<String>,
    },

    /// Print a book as JSON
    Read { id: String },

    /// Replace every field of an existing book
    #[command(allow_negative_numbers = true)]
    Update {
        id: String,
        title: String,
        num_avail: i64,
        num_borrow: i64,
        /// Current borrowers, in order (must match num_borrow)
        borrowers: Vec<String>,
    },

    /// Remove a book
    Delete { id: String },

    /// Print whether a book exists
    Exists { id: String },

    /// Sell one available copy
    Purchase { id: String },

    /// Lend one copy to a borrower
    Borrow { id: String, borrower: String },

    /// Take back a copy from a borrower
    Return { id: String, borrower: String },

    /// Print every book as a JSON array
    List,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let service = match self.command {
            Commands::Init { .. } => BookLedgerService::init(&self.database).await?,
            _ => BookLedgerService::connect(&self.database)
                .await
                .with_context(|| format!("Failed to open database '{}'", self.database))?,
        };
        run_command(&service, &self.database, self.command).await
    }
}

async fn run_command(
    service: &BookLedgerService<SqliteStore>,
    database: &str,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Init { seed } => {
            if seed {
                service.init_ledger().await?;
            }
            info!(database, seeded = seed, "database initialized");
            println!("Database initialized: {}", database);
        }

        Commands::Seed => {
            service.init_ledger().await?;
            committed();
        }

        Commands::Create {
            id,
            title,
            num_avail,
            num_borrow,
            borrowers,
        } => {
            service
                .create_book(&id, &title, num_avail, num_borrow, borrowers)
                .await?;
            committed();
        }

        Commands::Read { id } => {
            let book = service.read_book(&id).await?;
            print_json(&book)?;
        }

        Commands::Update {
            id,
            title,
            num_avail,
            num_borrow,
            borrowers,
        } => {
            service
                .update_book(&id, &title, num_avail, num_borrow, borrowers)
                .await?;
            committed();
        }

        Commands::Delete { id } => {
            service.delete_book(&id).await?;
            committed();
        }

        Commands::Exists { id } => {
            println!("{}", service.book_exists(&id).await?);
        }

        Commands::Purchase { id } => {
            service.purchase_book(&id).await?;
            committed();
        }

        Commands::Borrow { id, borrower } => {
            service.borrow_book(&id, &borrower).await?;
            committed();
        }

        Commands::Return { id, borrower } => {
            service.return_book(&id, &borrower).await?;
            committed();
        }

        Commands::List => {
            let books: Vec<Book> = service.list_all_books().await?;
            print_json(&books)?;
        }
    }

    Ok(())
}

fn committed() {
    println!("committed");
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode result")?;
    println!("{}", json);
    Ok(())
}
