use rusqlite::{Connection, OptionalExtension, Row};

use crate::backend::{Backend, BackendError, BackendResult, Caller};
use crate::models::{
    AuditEntry, ClientId, ClientUpload, CollateralRecord, DashboardMetrics, DeadlineId,
    DeadlineStatus, KycDocument, MarginSnapshot, NewDeadline, Principal, ReconciliationRun,
    RegulatoryDeadline, Stamp, StatementRow, Timestamp, Trade, TradeSide,
};
use crate::permissions::Capability;
use crate::validation::validate_pan;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn now_nanos() -> Timestamp {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

fn check_pan(pan: &str) -> BackendResult<()> {
    if validate_pan(pan) {
        Ok(())
    } else {
        Err(BackendError::Rejected(format!(
            "Invalid argument: PAN '{pan}' does not match the expected format"
        )))
    }
}

fn sql_int(value: u64, field: &str) -> BackendResult<i64> {
    i64::try_from(value)
        .map_err(|_| BackendError::Rejected(format!("Invalid argument: {field} out of range ({value})")))
}

fn record_audit(conn: &Connection, user: &Principal, action: &str, details: &str) -> BackendResult<()> {
    conn.execute(
        "INSERT INTO audit_entries (action, user, details, entry_time) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![action, user.as_str(), details, now_nanos()],
    )?;
    Ok(())
}

fn client_exists(conn: &Connection, id: i64) -> BackendResult<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM clients WHERE id = ?1")?;
    Ok(stmt.exists([id])?)
}

fn kyc_from_row(row: &Row) -> rusqlite::Result<KycDocument> {
    let documents: String = row.get(4)?;
    let created_by: String = row.get(5)?;
    Ok(KycDocument {
        id: row.get::<_, i64>(0)? as ClientId,
        name: row.get(1)?,
        pan: row.get(2)?,
        address: row.get(3)?,
        documents: serde_json::from_str(&documents).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
        created_by: Stamp::Set(Principal::new(&created_by)),
        created_at: Stamp::Set(row.get(6)?),
        updated_at: Stamp::Set(row.get(7)?),
    })
}

fn trade_from_row(row: &Row) -> rusqlite::Result<Trade> {
    let side: String = row.get(5)?;
    let side = TradeSide::parse(&side).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(5, "side".to_string(), rusqlite::types::Type::Text)
    })?;
    Ok(Trade {
        client_code: row.get(0)?,
        trade_date: row.get(1)?,
        exchange: row.get(2)?,
        segment: row.get(3)?,
        security: row.get(4)?,
        side,
        quantity: row.get::<_, i64>(6)? as u64,
        price: row.get(7)?,
        order_id: row.get(8)?,
        trade_id: row.get(9)?,
    })
}

fn deadline_from_row(row: &Row) -> rusqlite::Result<RegulatoryDeadline> {
    let status: String = row.get(5)?;
    let status = DeadlineStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(5, "status".to_string(), rusqlite::types::Type::Text)
    })?;
    let created_by: String = row.get(6)?;
    Ok(RegulatoryDeadline {
        id: row.get::<_, i64>(0)? as DeadlineId,
        title: row.get(1)?,
        description: row.get(2)?,
        due_date: row.get(3)?,
        category: row.get(4)?,
        status,
        created_by: Stamp::Set(Principal::new(&created_by)),
        created_at: Stamp::Set(row.get(7)?),
    })
}

fn count(conn: &Connection, sql: &str) -> BackendResult<u64> {
    let n: i64 = conn.query_row(sql, [], |r| r.get(0))?;
    Ok(n.max(0) as u64)
}

// ---------------------------------------------------------------------------
// SQLite backend
// ---------------------------------------------------------------------------

/// Local implementation of the records backend. It authorizes every call
/// against the caller's capabilities and stamps identity and time itself.
pub struct SqliteBackend<'c> {
    conn: &'c Connection,
    caller: Caller,
}

impl<'c> SqliteBackend<'c> {
    pub fn new(conn: &'c Connection, caller: Caller) -> Self {
        Self { conn, caller }
    }

    fn authorize(&self, capability: Capability) -> BackendResult<()> {
        if self.caller.permissions.can(capability) {
            Ok(())
        } else {
            Err(BackendError::Unauthorized(format!(
                "{} ({}) lacks {}",
                self.caller.principal,
                self.caller.permissions.role().name(),
                capability.key()
            )))
        }
    }

    fn insert_trade(&self, conn: &Connection, trade: &Trade, now: Timestamp) -> BackendResult<()> {
        conn.execute(
            "INSERT INTO trades (client_code, trade_date, exchange, segment, security, side, quantity, price, order_id, trade_id, recorded_by, recorded_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                trade.client_code,
                trade.trade_date,
                trade.exchange,
                trade.segment,
                trade.security,
                trade.side.as_str(),
                sql_int(trade.quantity, "quantity")?,
                trade.price,
                trade.order_id,
                trade.trade_id,
                self.caller.principal.as_str(),
                now,
            ],
        )?;
        Ok(())
    }
}

impl Backend for SqliteBackend<'_> {
    fn bulk_upload_clients(&mut self, clients: Vec<ClientUpload>) -> BackendResult<()> {
        self.authorize(Capability::CreateClients)?;
        for client in &clients {
            check_pan(&client.pan)?;
        }
        let tx = self.conn.unchecked_transaction()?;
        let now = now_nanos();
        for client in &clients {
            let documents = serde_json::to_string(&client.documents)
                .map_err(|e| BackendError::Rejected(format!("Deserialization failed: {e}")))?;
            tx.execute(
                "INSERT INTO clients (name, pan, address, documents, created_by, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![
                    client.name,
                    client.pan,
                    client.address,
                    documents,
                    self.caller.principal.as_str(),
                    now
                ],
            )?;
        }
        record_audit(
            &tx,
            &self.caller.principal,
            "bulk_upload_clients",
            &format!("Uploaded {} clients", clients.len()),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn bulk_upload_collateral(&mut self, records: Vec<CollateralRecord>) -> BackendResult<()> {
        self.authorize(Capability::ManageMargin)?;
        let tx = self.conn.unchecked_transaction()?;
        let now = now_nanos();
        for record in &records {
            let client_id = sql_int(record.client_id, "client_id")?;
            if !client_exists(&tx, client_id)? {
                return Err(BackendError::NotFound(format!("client {client_id}")));
            }
            tx.execute(
                "INSERT INTO collateral (client_id, security_name, quantity, pledge_date, market_value, recorded_by, recorded_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    client_id,
                    record.security_name,
                    sql_int(record.quantity, "quantity")?,
                    record.pledge_date,
                    record.market_value,
                    self.caller.principal.as_str(),
                    now
                ],
            )?;
        }
        record_audit(
            &tx,
            &self.caller.principal,
            "bulk_upload_collateral",
            &format!("Uploaded {} collateral records", records.len()),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn bulk_upload_margin_snapshots(&mut self, snapshots: Vec<MarginSnapshot>) -> BackendResult<()> {
        self.authorize(Capability::ManageMargin)?;
        let tx = self.conn.unchecked_transaction()?;
        let now = now_nanos();
        for snapshot in &snapshots {
            tx.execute(
                "INSERT INTO margin_snapshots (date, margin_available, margin_used, snapshot_time, recorded_by) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    snapshot.date,
                    snapshot.margin_available,
                    snapshot.margin_used,
                    now,
                    self.caller.principal.as_str()
                ],
            )?;
        }
        record_audit(
            &tx,
            &self.caller.principal,
            "bulk_upload_margin_snapshots",
            &format!("Uploaded {} margin snapshots", snapshots.len()),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn bulk_upload_statement_rows(&mut self, rows: Vec<StatementRow>) -> BackendResult<()> {
        self.authorize(Capability::ManageReconciliation)?;
        let tx = self.conn.unchecked_transaction()?;
        let now = now_nanos();
        let start = rows.iter().map(|r| r.date).min();
        let end = rows.iter().map(|r| r.date).max();
        let closing = rows.last().map(|r| r.balance);
        tx.execute(
            "INSERT INTO reconciliation_runs (row_count, date_range_start, date_range_end, closing_balance, uploaded_by, uploaded_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                rows.len() as i64,
                start,
                end,
                closing,
                self.caller.principal.as_str(),
                now
            ],
        )?;
        let run_id = tx.last_insert_rowid();
        for row in &rows {
            tx.execute(
                "INSERT INTO statement_rows (run_id, date, description, amount, balance, recorded_by) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    run_id,
                    row.date,
                    row.description,
                    row.amount,
                    row.balance,
                    self.caller.principal.as_str()
                ],
            )?;
        }
        record_audit(
            &tx,
            &self.caller.principal,
            "bulk_upload_statement_rows",
            &format!("Reconciliation run {run_id}: {} statement rows", rows.len()),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn bulk_upload_trades(&mut self, trades: Vec<Trade>) -> BackendResult<()> {
        self.authorize(Capability::CreateTrades)?;
        let tx = self.conn.unchecked_transaction()?;
        let now = now_nanos();
        for trade in &trades {
            self.insert_trade(&tx, trade, now)?;
        }
        record_audit(
            &tx,
            &self.caller.principal,
            "bulk_upload_trades",
            &format!("Uploaded {} trades", trades.len()),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn create_client(&mut self, name: &str, pan: &str, address: &str) -> BackendResult<ClientId> {
        self.authorize(Capability::CreateClients)?;
        check_pan(pan)?;
        let now = now_nanos();
        self.conn.execute(
            "INSERT INTO clients (name, pan, address, created_by, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            rusqlite::params![name, pan, address, self.caller.principal.as_str(), now],
        )?;
        let id = self.conn.last_insert_rowid();
        record_audit(self.conn, &self.caller.principal, "create_client", &format!("Created client {id} ({name})"))?;
        Ok(id as ClientId)
    }

    fn update_client(&mut self, id: ClientId, name: &str, pan: &str, address: &str) -> BackendResult<()> {
        self.authorize(Capability::EditClients)?;
        check_pan(pan)?;
        let sql_id = sql_int(id, "client_id")?;
        let changed = self.conn.execute(
            "UPDATE clients SET name = ?1, pan = ?2, address = ?3, updated_at = ?4 WHERE id = ?5",
            rusqlite::params![name, pan, address, now_nanos(), sql_id],
        )?;
        if changed == 0 {
            return Err(BackendError::NotFound(format!("client {id}")));
        }
        record_audit(self.conn, &self.caller.principal, "update_client", &format!("Updated client {id}"))?;
        Ok(())
    }

    fn add_margin_snapshot(&mut self, available: f64, used: f64, date: Timestamp) -> BackendResult<()> {
        self.authorize(Capability::ManageMargin)?;
        self.conn.execute(
            "INSERT INTO margin_snapshots (date, margin_available, margin_used, snapshot_time, recorded_by) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![date, available, used, now_nanos(), self.caller.principal.as_str()],
        )?;
        record_audit(self.conn, &self.caller.principal, "add_margin_snapshot", "Recorded margin snapshot")?;
        Ok(())
    }

    fn create_trade(&mut self, trade: Trade) -> BackendResult<()> {
        self.authorize(Capability::CreateTrades)?;
        self.insert_trade(self.conn, &trade, now_nanos())?;
        record_audit(
            self.conn,
            &self.caller.principal,
            "create_trade",
            &format!("Trade {} for {}", trade.trade_id, trade.client_code),
        )?;
        Ok(())
    }

    fn add_regulatory_deadline(&mut self, deadline: NewDeadline) -> BackendResult<DeadlineId> {
        self.authorize(Capability::ManageCalendar)?;
        self.conn.execute(
            "INSERT INTO regulatory_deadlines (title, description, due_date, category, status, created_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                deadline.title,
                deadline.description,
                deadline.due_date,
                deadline.category,
                DeadlineStatus::Pending.as_str(),
                self.caller.principal.as_str(),
                now_nanos()
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        record_audit(
            self.conn,
            &self.caller.principal,
            "add_regulatory_deadline",
            &format!("Deadline {id}: {} ({})", deadline.title, deadline.category),
        )?;
        Ok(id as DeadlineId)
    }

    fn update_regulatory_deadline_status(&mut self, id: DeadlineId, status: DeadlineStatus) -> BackendResult<()> {
        self.authorize(Capability::ManageCalendar)?;
        let sql_id = sql_int(id, "deadline_id")?;
        let changed = self.conn.execute(
            "UPDATE regulatory_deadlines SET status = ?1 WHERE id = ?2",
            rusqlite::params![status.as_str(), sql_id],
        )?;
        if changed == 0 {
            return Err(BackendError::NotFound(format!("deadline {id}")));
        }
        record_audit(
            self.conn,
            &self.caller.principal,
            "update_regulatory_deadline_status",
            &format!("Deadline {id} marked {}", status.as_str()),
        )?;
        Ok(())
    }

    fn get_client(&self, id: ClientId) -> BackendResult<Option<KycDocument>> {
        self.authorize(Capability::ViewClients)?;
        let sql_id = sql_int(id, "client_id")?;
        let mut stmt = self.conn.prepare(
            "SELECT id, name, pan, address, documents, created_by, created_at, updated_at FROM clients WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map([sql_id], kyc_from_row)?;
        let client = rows.next().transpose()?;
        Ok(client)
    }

    fn get_clients(&self) -> BackendResult<Vec<KycDocument>> {
        self.authorize(Capability::ViewClients)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, name, pan, address, documents, created_by, created_at, updated_at FROM clients ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], kyc_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_collateral_records(&self) -> BackendResult<Vec<CollateralRecord>> {
        self.authorize(Capability::ViewMargin)?;
        let mut stmt = self.conn.prepare(
            "SELECT client_id, security_name, quantity, pledge_date, market_value, recorded_by, recorded_at \
             FROM collateral ORDER BY pledge_date, id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let recorded_by: String = row.get(5)?;
                Ok(CollateralRecord {
                    client_id: row.get::<_, i64>(0)? as ClientId,
                    security_name: row.get(1)?,
                    quantity: row.get::<_, i64>(2)? as u64,
                    pledge_date: row.get(3)?,
                    market_value: row.get(4)?,
                    recorded_by: Stamp::Set(Principal::new(&recorded_by)),
                    recorded_at: Stamp::Set(row.get(6)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_margin_snapshots(&self) -> BackendResult<Vec<MarginSnapshot>> {
        self.authorize(Capability::ViewMargin)?;
        let mut stmt = self.conn.prepare(
            "SELECT date, margin_available, margin_used, snapshot_time, recorded_by \
             FROM margin_snapshots ORDER BY date, id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let recorded_by: String = row.get(4)?;
                Ok(MarginSnapshot {
                    date: row.get(0)?,
                    margin_available: row.get(1)?,
                    margin_used: row.get(2)?,
                    snapshot_time: Stamp::Set(row.get(3)?),
                    recorded_by: Stamp::Set(Principal::new(&recorded_by)),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_statement_rows(&self, run_id: Option<i64>) -> BackendResult<Vec<StatementRow>> {
        self.authorize(Capability::ViewReconciliation)?;
        let mut stmt = self.conn.prepare(
            "SELECT date, description, amount, balance, recorded_by FROM statement_rows \
             WHERE ?1 IS NULL OR run_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([run_id], |row| {
                let recorded_by: String = row.get(4)?;
                Ok(StatementRow {
                    date: row.get(0)?,
                    description: row.get(1)?,
                    amount: row.get(2)?,
                    balance: row.get(3)?,
                    recorded_by: Stamp::Set(Principal::new(&recorded_by)),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_reconciliation_runs(&self) -> BackendResult<Vec<ReconciliationRun>> {
        self.authorize(Capability::ViewReconciliation)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, row_count, date_range_start, date_range_end, closing_balance, uploaded_by, uploaded_at \
             FROM reconciliation_runs ORDER BY id DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let uploaded_by: String = row.get(5)?;
                Ok(ReconciliationRun {
                    id: row.get(0)?,
                    row_count: row.get(1)?,
                    date_range_start: row.get(2)?,
                    date_range_end: row.get(3)?,
                    closing_balance: row.get(4)?,
                    uploaded_by: Principal::new(&uploaded_by),
                    uploaded_at: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_trades(&self, client_code: Option<&str>) -> BackendResult<Vec<Trade>> {
        self.authorize(Capability::ViewTrades)?;
        let mut stmt = self.conn.prepare(
            "SELECT client_code, trade_date, exchange, segment, security, side, quantity, price, order_id, trade_id \
             FROM trades WHERE ?1 IS NULL OR client_code = ?1 ORDER BY trade_date, id",
        )?;
        let rows = stmt
            .query_map([client_code], trade_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_audit_entries(&self, limit: usize) -> BackendResult<Vec<AuditEntry>> {
        self.authorize(Capability::ViewAudit)?;
        let mut stmt = self.conn.prepare(
            "SELECT action, user, details, entry_time FROM audit_entries ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], |row| {
                let user: String = row.get(1)?;
                Ok(AuditEntry {
                    action: row.get(0)?,
                    user: Principal::new(&user),
                    details: row.get(2)?,
                    entry_time: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_regulatory_deadlines(&self) -> BackendResult<Vec<RegulatoryDeadline>> {
        self.authorize(Capability::ViewCalendar)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, due_date, category, status, created_by, created_at \
             FROM regulatory_deadlines ORDER BY due_date, id",
        )?;
        let rows = stmt
            .query_map([], deadline_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_dashboard_metrics(&self) -> BackendResult<DashboardMetrics> {
        self.authorize(Capability::ViewDashboard)?;
        let latest: Option<(f64, f64)> = self
            .conn
            .query_row(
                "SELECT margin_available, margin_used FROM margin_snapshots ORDER BY date DESC, id DESC LIMIT 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        Ok(DashboardMetrics {
            total_clients: count(self.conn, "SELECT count(*) FROM clients")?,
            total_trades: count(self.conn, "SELECT count(*) FROM trades")?,
            latest_margin_available: latest.map(|(available, _)| available),
            latest_margin_used: latest.map(|(_, used)| used),
            reconciliation_run_count: count(self.conn, "SELECT count(*) FROM reconciliation_runs")?,
            pending_deadlines: count(
                self.conn,
                "SELECT count(*) FROM regulatory_deadlines WHERE status = 'Pending'",
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::normalize::normalize_backend_error;
    use crate::permissions::{BusinessRole, CapabilityMap, Permissions};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn caller(role: BusinessRole) -> Caller {
        Caller {
            principal: Principal::new("alice"),
            permissions: Permissions::for_role(&CapabilityMap::standard(), role),
        }
    }

    fn client(name: &str, pan: &str) -> ClientUpload {
        ClientUpload {
            name: name.into(),
            pan: pan.into(),
            address: "12 Marine Drive, Mumbai".into(),
            documents: Vec::new(),
        }
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_bulk_clients_are_stamped_by_backend() {
        let (_dir, conn) = test_db();
        let mut backend = SqliteBackend::new(&conn, caller(BusinessRole::ComplianceOfficer));
        backend
            .bulk_upload_clients(vec![client("Asha Rao", "ABCDE1234F"), client("Ravi K", "PQRST6789Z")])
            .unwrap();
        let clients = backend.get_clients().unwrap();
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].created_by, Stamp::Set(Principal::new("alice")));
        assert!(clients[0].created_at.get().is_some());
        assert_eq!(backend.get_client(clients[1].id).unwrap().unwrap().name, "Ravi K");
        assert!(backend.get_client(999).unwrap().is_none());
    }

    #[test]
    fn test_backend_enforces_capabilities() {
        let (_dir, conn) = test_db();
        let mut backend = SqliteBackend::new(&conn, caller(BusinessRole::Dealer));
        let err = backend
            .bulk_upload_clients(vec![client("Asha Rao", "ABCDE1234F")])
            .unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(_)));
        assert!(err.to_string().contains("create_clients"));
        assert_eq!(count(&conn, "clients"), 0);
    }

    #[test]
    fn test_bad_pan_rejected_as_schema_error() {
        let (_dir, conn) = test_db();
        let mut backend = SqliteBackend::new(&conn, caller(BusinessRole::SuperAdmin));
        let err = backend
            .bulk_upload_clients(vec![client("Asha Rao", "ABCDE1234F"), client("Bad", "abcde1234f")])
            .unwrap_err();
        assert!(normalize_backend_error(&err).is_schema_error);
        assert_eq!(count(&conn, "clients"), 0);
    }

    #[test]
    fn test_collateral_upload_is_atomic() {
        let (_dir, conn) = test_db();
        let mut backend = SqliteBackend::new(&conn, caller(BusinessRole::SuperAdmin));
        let id = backend.create_client("Asha Rao", "ABCDE1234F", "Mumbai").unwrap();
        let record = |client_id| CollateralRecord {
            client_id,
            security_name: "INFY".into(),
            quantity: 100,
            pledge_date: 1_736_899_200_000_000_000,
            market_value: 150_000.0,
            recorded_by: Stamp::Unset,
            recorded_at: Stamp::Unset,
        };
        let err = backend
            .bulk_upload_collateral(vec![record(id), record(id + 41)])
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
        assert_eq!(count(&conn, "collateral"), 0);

        backend.bulk_upload_collateral(vec![record(id)]).unwrap();
        let stored = backend.get_collateral_records().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].recorded_by.get().map(Principal::as_str), Some("alice"));
    }

    #[test]
    fn test_statement_upload_creates_run() {
        let (_dir, conn) = test_db();
        let mut backend = SqliteBackend::new(&conn, caller(BusinessRole::Accountant));
        let row = |date, balance| StatementRow {
            date,
            description: "NEFT".into(),
            amount: 10.0,
            balance,
            recorded_by: Stamp::Unset,
        };
        backend
            .bulk_upload_statement_rows(vec![row(300, 110.0), row(100, 120.0), row(200, 130.0)])
            .unwrap();
        let runs = backend.get_reconciliation_runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].row_count, 3);
        assert_eq!(runs[0].date_range_start, Some(100));
        assert_eq!(runs[0].date_range_end, Some(300));
        assert_eq!(runs[0].closing_balance, Some(130.0));
        assert_eq!(backend.get_statement_rows(Some(runs[0].id)).unwrap().len(), 3);
        assert!(backend.get_statement_rows(Some(runs[0].id + 1)).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_trade_id_rejected() {
        let (_dir, conn) = test_db();
        let mut backend = SqliteBackend::new(&conn, caller(BusinessRole::OperationsManager));
        let trade = Trade {
            client_code: "C001".into(),
            trade_date: 0,
            exchange: "NSE".into(),
            segment: "EQ".into(),
            security: "INFY".into(),
            side: TradeSide::Buy,
            quantity: 10,
            price: 1500.5,
            order_id: "O1".into(),
            trade_id: "T1".into(),
        };
        backend.create_trade(trade.clone()).unwrap();
        assert!(backend.bulk_upload_trades(vec![trade]).is_err());
        let trades = backend.get_trades(Some("C001")).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side, TradeSide::Buy);
        assert!(backend.get_trades(Some("C999")).unwrap().is_empty());
    }

    #[test]
    fn test_writes_are_audited() {
        let (_dir, conn) = test_db();
        let mut backend = SqliteBackend::new(&conn, caller(BusinessRole::SuperAdmin));
        backend.create_client("Asha Rao", "ABCDE1234F", "Mumbai").unwrap();
        backend.add_margin_snapshot(1000.0, 250.0, 0).unwrap();
        let entries = backend.get_audit_entries(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "add_margin_snapshot");
        assert_eq!(entries[1].action, "create_client");
        assert_eq!(entries[1].user.as_str(), "alice");
    }

    #[test]
    fn test_corrupt_documents_column_is_an_error() {
        let (_dir, conn) = test_db();
        let backend = SqliteBackend::new(&conn, caller(BusinessRole::SuperAdmin));
        conn.execute(
            "INSERT INTO clients (name, pan, address, documents, created_by, created_at, updated_at) \
             VALUES ('Asha', 'ABCDE1234F', 'Mumbai', 'not json', 'alice', 0, 0)",
            [],
        )
        .unwrap();
        let err = backend.get_clients().unwrap_err();
        assert!(matches!(
            err,
            BackendError::Db(rusqlite::Error::FromSqlConversionFailure(4, _, _))
        ));
    }

    #[test]
    fn test_deadlines_lifecycle() {
        let (_dir, conn) = test_db();
        let mut backend = SqliteBackend::new(&conn, caller(BusinessRole::ComplianceOfficer));
        let deadline = |title: &str, due_date| NewDeadline {
            title: title.into(),
            description: String::new(),
            due_date,
            category: "SEBI".into(),
        };
        let late = backend.add_regulatory_deadline(deadline("Annual return", 200)).unwrap();
        backend.add_regulatory_deadline(deadline("Net worth certificate", 100)).unwrap();

        let stored = backend.get_regulatory_deadlines().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].title, "Net worth certificate");
        assert_eq!(stored[1].status, DeadlineStatus::Pending);
        assert_eq!(stored[1].created_by.get().map(Principal::as_str), Some("alice"));

        backend
            .update_regulatory_deadline_status(late, DeadlineStatus::Submitted)
            .unwrap();
        let stored = backend.get_regulatory_deadlines().unwrap();
        assert_eq!(stored[1].status, DeadlineStatus::Submitted);

        let err = backend
            .update_regulatory_deadline_status(late + 10, DeadlineStatus::Submitted)
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[test]
    fn test_calendar_writes_need_manage_calendar() {
        let (_dir, conn) = test_db();
        let mut backend = SqliteBackend::new(&conn, caller(BusinessRole::ExternalAuditor));
        let err = backend
            .add_regulatory_deadline(NewDeadline {
                title: "Annual return".into(),
                description: String::new(),
                due_date: 0,
                category: "NSE".into(),
            })
            .unwrap_err();
        assert!(err.to_string().contains("manage_calendar"));
        assert!(backend.get_regulatory_deadlines().unwrap().is_empty());
    }

    #[test]
    fn test_dashboard_metrics() {
        let (_dir, conn) = test_db();
        let mut backend = SqliteBackend::new(&conn, caller(BusinessRole::SuperAdmin));
        let empty = backend.get_dashboard_metrics().unwrap();
        assert_eq!(empty.total_clients, 0);
        assert_eq!(empty.latest_margin_available, None);

        backend.create_client("Asha Rao", "ABCDE1234F", "Mumbai").unwrap();
        backend.add_margin_snapshot(1000.0, 250.0, 200).unwrap();
        backend.add_margin_snapshot(900.0, 100.0, 100).unwrap();
        let id = backend
            .add_regulatory_deadline(NewDeadline {
                title: "Annual return".into(),
                description: String::new(),
                due_date: 0,
                category: "NSE".into(),
            })
            .unwrap();
        backend
            .add_regulatory_deadline(NewDeadline {
                title: "Net worth certificate".into(),
                description: String::new(),
                due_date: 0,
                category: "SEBI".into(),
            })
            .unwrap();
        backend
            .update_regulatory_deadline_status(id, DeadlineStatus::Submitted)
            .unwrap();

        let metrics = backend.get_dashboard_metrics().unwrap();
        assert_eq!(metrics.total_clients, 1);
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.latest_margin_available, Some(1000.0));
        assert_eq!(metrics.latest_margin_used, Some(250.0));
        assert_eq!(metrics.reconciliation_run_count, 0);
        assert_eq!(metrics.pending_deadlines, 1);

        let dealer = SqliteBackend::new(&conn, caller(BusinessRole::Dealer));
        assert!(dealer.get_dashboard_metrics().is_ok());
    }

    #[test]
    fn test_update_missing_client() {
        let (_dir, conn) = test_db();
        let mut backend = SqliteBackend::new(&conn, caller(BusinessRole::SuperAdmin));
        let err = backend.update_client(7, "X", "ABCDE1234F", "Y").unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }
}
