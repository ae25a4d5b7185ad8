pub mod audit;
pub mod calendar;
pub mod clients;
pub mod dashboard;
pub mod import;
pub mod init;
pub mod margin;
pub mod reconcile;
pub mod report;
pub mod sample;
pub mod status;
pub mod trades;
pub mod whoami;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::backend::{BackendError, Caller};
use crate::db::get_connection;
use crate::domains::Domain;
use crate::error::{DeskError, Result};
use crate::models::Principal;
use crate::normalize::{log_technical_error, normalize_backend_error};
use crate::permissions::{CapabilityMap, Permissions};
use crate::settings::{load_settings, Settings};
use crate::store::SqliteBackend;

/// An opened data directory plus the identity acting on it.
pub(crate) struct Desk {
    pub conn: Connection,
    pub caller: Caller,
}

impl Desk {
    pub fn open(map: &CapabilityMap, role_override: Option<&str>) -> Result<Self> {
        let settings = load_settings();
        let db_path = settings.db_path();
        if !db_path.exists() {
            return Err(DeskError::Other(
                "Database not found. Run `compliance-desk init` to set up.".into(),
            ));
        }
        Ok(Self {
            conn: get_connection(&db_path)?,
            caller: caller(map, &settings, role_override),
        })
    }

    pub fn backend(&self) -> SqliteBackend<'_> {
        SqliteBackend::new(&self.conn, self.caller.clone())
    }
}

pub(crate) fn caller(map: &CapabilityMap, settings: &Settings, role_override: Option<&str>) -> Caller {
    let role = role_override.unwrap_or(&settings.role);
    Caller {
        principal: Principal::new(&settings.user_name),
        permissions: Permissions::resolve(map, role),
    }
}

pub(crate) fn parse_domain(raw: &str) -> Result<Domain> {
    Domain::parse(raw).ok_or_else(|| DeskError::UnknownDomain(raw.to_string()))
}

/// Backend write failures go through the normalizer before reaching the user.
pub(crate) fn rejected(context: &'static str) -> impl Fn(BackendError) -> DeskError {
    move |e| {
        let normalized = normalize_backend_error(&e);
        log_technical_error(&normalized, Some(context));
        DeskError::Backend(normalized)
    }
}

#[derive(Parser)]
#[command(
    name = "compliance-desk",
    version,
    about = "Compliance desk for a securities brokerage: bulk CSV ingestion and record keeping."
)]
pub struct Cli {
    /// Act as this business role for one invocation (e.g. "Accountant")
    #[arg(long, global = true)]
    pub role: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory, record who you are and initialize the database.
    Init {
        /// Path for desk data (default: ~/Documents/compliance-desk)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Name recorded as the creator of uploaded records
        #[arg(long)]
        user: Option<String>,
        /// Profile role stored in settings
        #[arg(long = "profile-role")]
        profile_role: Option<String>,
    },
    /// Show the acting identity, its capabilities and visible sections.
    Whoami {
        /// Only report whether the acting role holds this capability (e.g. create_trades)
        #[arg(long)]
        check: Option<String>,
    },
    /// Validate a CSV file and submit every row to the desk in one batch.
    Import {
        /// clients, collateral, margin, statements or trades
        domain: String,
        /// Path to the CSV file
        file: String,
    },
    /// Parse a CSV file and show its first rows without submitting.
    Preview {
        domain: String,
        file: String,
        /// Number of rows to show
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
    /// Save the sample CSV template for a domain.
    Sample {
        domain: String,
        /// File or directory to write to, or `-` for stdout (default: current directory)
        #[arg(long)]
        output: Option<String>,
        /// Fetch the template from this URL instead of the bundled copy
        #[arg(long)]
        url: Option<String>,
    },
    /// Manage client KYC records.
    Clients {
        #[command(subcommand)]
        command: ClientsCommands,
    },
    /// Manage trades.
    Trades {
        #[command(subcommand)]
        command: TradesCommands,
    },
    /// Margin snapshots.
    Margin {
        #[command(subcommand)]
        command: MarginCommands,
    },
    /// Pledged collateral.
    Collateral {
        #[command(subcommand)]
        command: CollateralCommands,
    },
    /// Uploaded bank statement rows.
    Statements {
        #[command(subcommand)]
        command: StatementsCommands,
    },
    /// Reconciliation runs.
    Reconcile {
        #[command(subcommand)]
        command: ReconcileCommands,
    },
    /// Regulatory filing deadlines.
    Calendar {
        #[command(subcommand)]
        command: CalendarCommands,
    },
    /// List report templates, or generate one.
    Report {
        /// Template key, e.g. trade-activity (omit to list templates)
        template: Option<String>,
        /// Export as CSV to this file or directory, or `-` for stdout
        #[arg(long)]
        output: Option<String>,
    },
    /// Headline counts for the desk.
    Dashboard,
    /// Show recent audit entries.
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show settings and record counts.
    Status,
    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ClientsCommands {
    /// Add a single client.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        pan: String,
        #[arg(long)]
        address: String,
    },
    /// Replace a client's name, PAN and address.
    Update {
        id: u64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        pan: String,
        #[arg(long)]
        address: String,
    },
    /// List all clients.
    List,
    /// Show one client.
    Show { id: u64 },
}

#[derive(Subcommand)]
pub enum TradesCommands {
    /// Enter a single trade.
    Add {
        #[arg(long = "client")]
        client_code: String,
        #[arg(long = "date")]
        trade_date: String,
        #[arg(long)]
        exchange: String,
        #[arg(long)]
        segment: String,
        #[arg(long)]
        security: String,
        /// BUY or SELL
        #[arg(long)]
        side: String,
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        price: String,
        #[arg(long = "order-id")]
        order_id: String,
        #[arg(long = "trade-id")]
        trade_id: String,
    },
    /// List trades, optionally for one client code.
    List {
        #[arg(long = "client")]
        client_code: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum MarginCommands {
    /// Record one margin snapshot.
    Add {
        #[arg(long)]
        available: String,
        #[arg(long)]
        used: String,
        #[arg(long)]
        date: String,
    },
    List,
}

#[derive(Subcommand)]
pub enum CollateralCommands {
    List,
}

#[derive(Subcommand)]
pub enum StatementsCommands {
    List {
        /// Only rows from this reconciliation run
        #[arg(long)]
        run: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum ReconcileCommands {
    /// List reconciliation runs, newest first.
    Runs,
}

#[derive(Subcommand)]
pub enum CalendarCommands {
    /// Add a regulatory deadline.
    Add {
        #[arg(long)]
        title: String,
        /// Due date, e.g. 2025-03-31
        #[arg(long)]
        due: String,
        /// SEBI, NSE, BSE, MCX, NCDEX, RBI or Other
        #[arg(long, default_value = crate::calendar::DEFAULT_CATEGORY)]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List deadlines by due date, flagging overdue ones.
    List,
    /// Mark a deadline Pending or Submitted.
    Update {
        id: u64,
        #[arg(long)]
        status: String,
    },
}
