pub mod clients;
pub mod collateral;
pub mod margin;
pub mod statements;
pub mod trades;

use tracing::debug;

use crate::backend::{Backend, BackendResult};
use crate::parsing::ParsedRow;
use crate::permissions::Capability;
use crate::validation::{row_number, RowError};

pub use clients::ClientRows;
pub use collateral::CollateralRows;
pub use margin::MarginRows;
pub use statements::StatementRows;
pub use trades::TradeRows;

// ---------------------------------------------------------------------------
// Domains
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Clients,
    Collateral,
    Margin,
    Statements,
    Trades,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Self::Clients,
        Self::Collateral,
        Self::Margin,
        Self::Statements,
        Self::Trades,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Clients => "clients",
            Self::Collateral => "collateral",
            Self::Margin => "margin",
            Self::Statements => "statements",
            Self::Trades => "trades",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Clients => "Clients",
            Self::Collateral => "Collateral",
            Self::Margin => "Margin Snapshots",
            Self::Statements => "Bank Statement Rows",
            Self::Trades => "Trades",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        Self::ALL.iter().find(|d| d.key() == raw).copied()
    }

    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Clients => clients::REQUIRED_COLUMNS,
            Self::Collateral => collateral::REQUIRED_COLUMNS,
            Self::Margin => margin::REQUIRED_COLUMNS,
            Self::Statements => statements::REQUIRED_COLUMNS,
            Self::Trades => trades::REQUIRED_COLUMNS,
        }
    }

    /// Capability the acting role needs before a bulk submission.
    pub fn write_capability(&self) -> Capability {
        match self {
            Self::Clients => Capability::CreateClients,
            Self::Collateral | Self::Margin => Capability::ManageMargin,
            Self::Statements => Capability::ManageReconciliation,
            Self::Trades => Capability::CreateTrades,
        }
    }

    pub fn sample_file_name(&self) -> &'static str {
        match self {
            Self::Clients => "clients_sample.csv",
            Self::Collateral => "collateral_sample.csv",
            Self::Margin => "margin_snapshots_sample.csv",
            Self::Statements => "bank_statement_sample.csv",
            Self::Trades => "trades_sample.csv",
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Validation and conversion of header-keyed rows into one domain's typed
/// records, plus the backend call that accepts them in bulk.
pub trait RowMapper {
    type Record;

    const DOMAIN: Domain;

    /// Every defect in the row; empty when the row is valid.
    fn validate_row(row: &ParsedRow) -> Vec<String>;

    /// Only called for rows that passed [`RowMapper::validate_row`].
    fn convert(row: &ParsedRow) -> Result<Self::Record, String>;

    fn submit(backend: &mut dyn Backend, records: Vec<Self::Record>) -> BackendResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome<R> {
    pub valid: bool,
    pub records: Vec<R>,
    pub errors: Vec<RowError>,
}

/// Validates every row and converts the valid ones. Any failing row makes
/// the whole outcome invalid and empties `records`.
pub fn validate_and_convert<M: RowMapper>(rows: &[ParsedRow]) -> ImportOutcome<M::Record> {
    let mut records = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let problems = M::validate_row(row);
        if !problems.is_empty() {
            errors.push(RowError {
                row_number: row_number(index),
                errors: problems,
            });
            continue;
        }
        match M::convert(row) {
            Ok(record) => records.push(record),
            Err(e) => errors.push(RowError {
                row_number: row_number(index),
                errors: vec![e],
            }),
        }
    }

    debug!(
        domain = M::DOMAIN.key(),
        rows = rows.len(),
        failed = errors.len(),
        "validated rows"
    );

    if !errors.is_empty() {
        records.clear();
    }
    ImportOutcome {
        valid: errors.is_empty(),
        records,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static CONVERTED: Cell<usize> = const { Cell::new(0) };
    }

    struct Counting;

    impl RowMapper for Counting {
        type Record = String;
        const DOMAIN: Domain = Domain::Statements;

        fn validate_row(row: &ParsedRow) -> Vec<String> {
            if row.value("ok") == "yes" {
                Vec::new()
            } else {
                vec!["ok is required".into()]
            }
        }

        fn convert(row: &ParsedRow) -> Result<String, String> {
            CONVERTED.with(|c| c.set(c.get() + 1));
            Ok(row.value("ok").to_string())
        }

        fn submit(_backend: &mut dyn Backend, _records: Vec<String>) -> BackendResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_invalid_rows_are_never_converted() {
        let rows: Vec<ParsedRow> = ["yes", "no", "yes"]
            .iter()
            .map(|v| [("ok", *v)].into_iter().collect())
            .collect();
        CONVERTED.with(|c| c.set(0));
        let outcome = validate_and_convert::<Counting>(&rows);
        assert!(!outcome.valid);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row_number, 3);
        assert_eq!(CONVERTED.with(Cell::get), 2);
    }

    #[test]
    fn test_domain_parse() {
        assert_eq!(Domain::parse(" Trades "), Some(Domain::Trades));
        assert_eq!(Domain::parse("kyc"), None);
        for domain in Domain::ALL {
            assert_eq!(Domain::parse(domain.key()), Some(domain));
        }
    }

    #[test]
    fn test_write_capabilities() {
        assert_eq!(Domain::Clients.write_capability(), Capability::CreateClients);
        assert_eq!(Domain::Collateral.write_capability(), Capability::ManageMargin);
        assert_eq!(Domain::Margin.write_capability(), Capability::ManageMargin);
        assert_eq!(Domain::Statements.write_capability(), Capability::ManageReconciliation);
        assert_eq!(Domain::Trades.write_capability(), Capability::CreateTrades);
    }
}
