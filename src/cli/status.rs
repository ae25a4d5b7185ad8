use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::{load_settings, settings_file_exists};

const COUNTED: &[(&str, &str)] = &[
    ("Clients:", "clients"),
    ("Collateral:", "collateral"),
    ("Margin:", "margin_snapshots"),
    ("Statements:", "statement_rows"),
    ("Recon runs:", "reconciliation_runs"),
    ("Trades:", "trades"),
    ("Deadlines:", "regulatory_deadlines"),
    ("Audit:", "audit_entries"),
];

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("User:       {}", if settings.user_name.is_empty() { "(not set)" } else { &settings.user_name });
    println!("Role:       {}", settings.role);
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    if !settings_file_exists() {
        println!("Settings:   (defaults, no settings file)");
    }

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        println!();
        for (label, table) in COUNTED {
            let count: i64 = conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?;
            println!("{label:<13} {count}");
        }
    } else {
        println!();
        println!("Database not found. Run `compliance-desk init` to set up.");
    }

    Ok(())
}
