use std::fmt;

/// Nanoseconds since the Unix epoch, the wire convention for every timestamp.
pub type Timestamp = i64;

pub type ClientId = u64;

/// Authenticated identity of whoever made a backend call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal(String);

impl Principal {
    pub fn new(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() {
            Self("anonymous".to_string())
        } else {
            Self(name.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A field the backend fills in when it accepts a record (creator identity,
/// recorded-at time). Converters always produce `Unset`; only records read
/// back from the backend carry `Set`.
#[derive(Debug, Clone, PartialEq)]
pub enum Stamp<T> {
    Unset,
    Set(T),
}

impl<T> Default for Stamp<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Stamp<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Set(v) => Some(v),
            Self::Unset => None,
        }
    }
}

/// Client KYC record as submitted in bulk. The backend sets creator and
/// created/updated times.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientUpload {
    pub name: String,
    pub pan: String,
    pub address: String,
    pub documents: Vec<String>,
}

/// Client KYC record as stored by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct KycDocument {
    pub id: ClientId,
    pub name: String,
    pub pan: String,
    pub address: String,
    pub documents: Vec<String>,
    pub created_by: Stamp<Principal>,
    pub created_at: Stamp<Timestamp>,
    pub updated_at: Stamp<Timestamp>,
}

/// Securities pledged by a client as margin collateral.
#[derive(Debug, Clone, PartialEq)]
pub struct CollateralRecord {
    pub client_id: ClientId,
    pub security_name: String,
    pub quantity: u64,
    pub pledge_date: Timestamp,
    pub market_value: f64,
    pub recorded_by: Stamp<Principal>,
    pub recorded_at: Stamp<Timestamp>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarginSnapshot {
    pub date: Timestamp,
    pub margin_available: f64,
    pub margin_used: f64,
    pub snapshot_time: Stamp<Timestamp>,
    pub recorded_by: Stamp<Principal>,
}

/// One line of a bank statement, uploaded for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementRow {
    pub date: Timestamp,
    pub description: String,
    pub amount: f64,
    pub balance: f64,
    pub recorded_by: Stamp<Principal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Case-insensitive; surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub client_code: String,
    pub trade_date: Timestamp,
    pub exchange: String,
    pub segment: String,
    pub security: String,
    pub side: TradeSide,
    pub quantity: u64,
    pub price: f64,
    pub order_id: String,
    pub trade_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub action: String,
    pub user: Principal,
    pub details: String,
    pub entry_time: Timestamp,
}

/// One completed bank-statement upload batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationRun {
    pub id: i64,
    pub row_count: i64,
    pub date_range_start: Option<Timestamp>,
    pub date_range_end: Option<Timestamp>,
    pub closing_balance: Option<f64>,
    pub uploaded_by: Principal,
    pub uploaded_at: Timestamp,
}

pub type DeadlineId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineStatus {
    Pending,
    Submitted,
}

impl DeadlineStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "submitted" => Some(Self::Submitted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Submitted => "Submitted",
        }
    }
}

/// A regulatory filing deadline as submitted. New deadlines start `Pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDeadline {
    pub title: String,
    pub description: String,
    pub due_date: Timestamp,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegulatoryDeadline {
    pub id: DeadlineId,
    pub title: String,
    pub description: String,
    pub due_date: Timestamp,
    pub category: String,
    pub status: DeadlineStatus,
    pub created_by: Stamp<Principal>,
    pub created_at: Stamp<Timestamp>,
}

impl RegulatoryDeadline {
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        self.status == DeadlineStatus::Pending && self.due_date < now
    }
}

/// Headline counts for the dashboard. Margin figures come from the most
/// recent snapshot, when there is one.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardMetrics {
    pub total_clients: u64,
    pub total_trades: u64,
    pub latest_margin_available: Option<f64>,
    pub latest_margin_used: Option<f64>,
    pub reconciliation_run_count: u64,
    pub pending_deadlines: u64,
}
