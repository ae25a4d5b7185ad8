use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const DB_FILE: &str = "desk.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS clients (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    pan TEXT NOT NULL,
    address TEXT NOT NULL,
    documents TEXT NOT NULL DEFAULT '[]',
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS collateral (
    id INTEGER PRIMARY KEY,
    client_id INTEGER NOT NULL,
    security_name TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    pledge_date INTEGER NOT NULL,
    market_value REAL NOT NULL,
    recorded_by TEXT NOT NULL,
    recorded_at INTEGER NOT NULL,
    FOREIGN KEY (client_id) REFERENCES clients(id)
);

CREATE TABLE IF NOT EXISTS margin_snapshots (
    id INTEGER PRIMARY KEY,
    date INTEGER NOT NULL,
    margin_available REAL NOT NULL,
    margin_used REAL NOT NULL,
    snapshot_time INTEGER NOT NULL,
    recorded_by TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reconciliation_runs (
    id INTEGER PRIMARY KEY,
    row_count INTEGER NOT NULL,
    date_range_start INTEGER,
    date_range_end INTEGER,
    closing_balance REAL,
    uploaded_by TEXT NOT NULL,
    uploaded_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS statement_rows (
    id INTEGER PRIMARY KEY,
    run_id INTEGER NOT NULL,
    date INTEGER NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    balance REAL NOT NULL,
    recorded_by TEXT NOT NULL,
    FOREIGN KEY (run_id) REFERENCES reconciliation_runs(id)
);

CREATE TABLE IF NOT EXISTS trades (
    id INTEGER PRIMARY KEY,
    client_code TEXT NOT NULL,
    trade_date INTEGER NOT NULL,
    exchange TEXT NOT NULL,
    segment TEXT NOT NULL,
    security TEXT NOT NULL,
    side TEXT NOT NULL CHECK (side IN ('BUY', 'SELL')),
    quantity INTEGER NOT NULL,
    price REAL NOT NULL,
    order_id TEXT NOT NULL,
    trade_id TEXT NOT NULL UNIQUE,
    recorded_by TEXT NOT NULL,
    recorded_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS regulatory_deadlines (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    due_date INTEGER NOT NULL,
    category TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Pending' CHECK (status IN ('Pending', 'Submitted')),
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_entries (
    id INTEGER PRIMARY KEY,
    action TEXT NOT NULL,
    user TEXT NOT NULL,
    details TEXT NOT NULL,
    entry_time INTEGER NOT NULL
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "clients",
            "collateral",
            "margin_snapshots",
            "reconciliation_runs",
            "statement_rows",
            "trades",
            "regulatory_deadlines",
            "audit_entries",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_trade_side_is_constrained() {
        let (_dir, conn) = test_db();
        let result = conn.execute(
            "INSERT INTO trades (client_code, trade_date, exchange, segment, security, side, quantity, price, order_id, trade_id, recorded_by, recorded_at) \
             VALUES ('C1', 0, 'NSE', 'EQ', 'INFY', 'HOLD', 1, 1.0, 'O1', 'T1', 'alice', 0)",
            [],
        );
        assert!(result.is_err());
    }
}
