use crate::backend::{Backend, BackendResult};
use crate::domains::{Domain, RowMapper};
use crate::models::{Stamp, StatementRow};
use crate::parsing::ParsedRow;
use crate::validation::RowChecks;

pub const REQUIRED_COLUMNS: &[&str] = &["date", "description", "amount", "balance"];

/// Bank statement lines for reconciliation.
pub struct StatementRows;

fn read(row: &ParsedRow) -> Result<StatementRow, Vec<String>> {
    let mut checks = RowChecks::new(row);
    let date = checks.date("date");
    let description = checks.required("description");
    let amount = checks.number("amount");
    let balance = checks.number("balance");

    let errors = checks.into_errors();
    match (date, description, amount, balance) {
        (Some(date), Some(description), Some(amount), Some(balance)) if errors.is_empty() => {
            Ok(StatementRow {
                date,
                description: description.to_string(),
                amount,
                balance,
                recorded_by: Stamp::Unset,
            })
        }
        _ => Err(errors),
    }
}

impl RowMapper for StatementRows {
    type Record = StatementRow;
    const DOMAIN: Domain = Domain::Statements;

    fn validate_row(row: &ParsedRow) -> Vec<String> {
        read(row).err().unwrap_or_default()
    }

    fn convert(row: &ParsedRow) -> Result<StatementRow, String> {
        read(row).map_err(|errors| errors.join("; "))
    }

    fn submit(backend: &mut dyn Backend, records: Vec<StatementRow>) -> BackendResult<()> {
        backend.bulk_upload_statement_rows(records)
    }
}
