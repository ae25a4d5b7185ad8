use thiserror::Error;

use crate::models::{
    AuditEntry, ClientId, ClientUpload, CollateralRecord, DashboardMetrics, DeadlineId,
    DeadlineStatus, KycDocument, MarginSnapshot, NewDeadline, Principal, ReconciliationRun,
    RegulatoryDeadline, StatementRow, Timestamp, Trade,
};
use crate::permissions::Permissions;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Rejected(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Who is calling. Identity fields on stored records come from here, never
/// from the submitted data.
#[derive(Debug, Clone)]
pub struct Caller {
    pub principal: Principal,
    pub permissions: Permissions,
}

/// Typed request/response contract of the records backend. Bulk calls are
/// atomic: either every record is stored or none is.
pub trait Backend {
    fn bulk_upload_clients(&mut self, clients: Vec<ClientUpload>) -> BackendResult<()>;
    fn bulk_upload_collateral(&mut self, records: Vec<CollateralRecord>) -> BackendResult<()>;
    fn bulk_upload_margin_snapshots(&mut self, snapshots: Vec<MarginSnapshot>) -> BackendResult<()>;
    fn bulk_upload_statement_rows(&mut self, rows: Vec<StatementRow>) -> BackendResult<()>;
    fn bulk_upload_trades(&mut self, trades: Vec<Trade>) -> BackendResult<()>;

    fn create_client(&mut self, name: &str, pan: &str, address: &str) -> BackendResult<ClientId>;
    fn update_client(&mut self, id: ClientId, name: &str, pan: &str, address: &str) -> BackendResult<()>;
    fn add_margin_snapshot(&mut self, available: f64, used: f64, date: Timestamp) -> BackendResult<()>;
    fn create_trade(&mut self, trade: Trade) -> BackendResult<()>;
    fn add_regulatory_deadline(&mut self, deadline: NewDeadline) -> BackendResult<DeadlineId>;
    fn update_regulatory_deadline_status(&mut self, id: DeadlineId, status: DeadlineStatus) -> BackendResult<()>;

    fn get_client(&self, id: ClientId) -> BackendResult<Option<KycDocument>>;
    fn get_clients(&self) -> BackendResult<Vec<KycDocument>>;
    fn get_collateral_records(&self) -> BackendResult<Vec<CollateralRecord>>;
    fn get_margin_snapshots(&self) -> BackendResult<Vec<MarginSnapshot>>;
    fn get_statement_rows(&self, run_id: Option<i64>) -> BackendResult<Vec<StatementRow>>;
    fn get_reconciliation_runs(&self) -> BackendResult<Vec<ReconciliationRun>>;
    fn get_trades(&self, client_code: Option<&str>) -> BackendResult<Vec<Trade>>;
    fn get_audit_entries(&self, limit: usize) -> BackendResult<Vec<AuditEntry>>;
    fn get_regulatory_deadlines(&self) -> BackendResult<Vec<RegulatoryDeadline>>;
    fn get_dashboard_metrics(&self) -> BackendResult<DashboardMetrics>;
}
