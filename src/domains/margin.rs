use crate::backend::{Backend, BackendResult};
use crate::domains::{Domain, RowMapper};
use crate::models::{MarginSnapshot, Stamp};
use crate::parsing::ParsedRow;
use crate::validation::RowChecks;

pub const REQUIRED_COLUMNS: &[&str] = &["date", "margin_available", "margin_used"];

pub struct MarginRows;

fn read(row: &ParsedRow) -> Result<MarginSnapshot, Vec<String>> {
    let mut checks = RowChecks::new(row);
    let date = checks.date("date");
    let available = checks.number("margin_available");
    let used = checks.number("margin_used");

    let errors = checks.into_errors();
    match (date, available, used) {
        (Some(date), Some(margin_available), Some(margin_used)) if errors.is_empty() => {
            Ok(MarginSnapshot {
                date,
                margin_available,
                margin_used,
                snapshot_time: Stamp::Unset,
                recorded_by: Stamp::Unset,
            })
        }
        _ => Err(errors),
    }
}

impl RowMapper for MarginRows {
    type Record = MarginSnapshot;
    const DOMAIN: Domain = Domain::Margin;

    fn validate_row(row: &ParsedRow) -> Vec<String> {
        read(row).err().unwrap_or_default()
    }

    fn convert(row: &ParsedRow) -> Result<MarginSnapshot, String> {
        read(row).map_err(|errors| errors.join("; "))
    }

    fn submit(backend: &mut dyn Backend, records: Vec<MarginSnapshot>) -> BackendResult<()> {
        backend.bulk_upload_margin_snapshots(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_margin_is_allowed() {
        let row: ParsedRow = [
            ("date", "2025-01-15"),
            ("margin_available", "-1500.25"),
            ("margin_used", "3e3"),
        ]
        .into_iter()
        .collect();
        let snapshot = MarginRows::convert(&row).unwrap();
        assert_eq!(snapshot.margin_available, -1500.25);
        assert_eq!(snapshot.margin_used, 3000.0);
        assert_eq!(snapshot.snapshot_time, Stamp::Unset);
    }

    #[test]
    fn test_missing_values() {
        let row: ParsedRow = [("date", ""), ("margin_available", "abc")].into_iter().collect();
        assert_eq!(
            MarginRows::validate_row(&row),
            vec![
                "date is required".to_string(),
                "margin_available must be a valid number (got: abc)".to_string(),
                "margin_used is required".to_string(),
            ]
        );
    }
}
