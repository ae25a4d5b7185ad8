use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domains::Domain;
use crate::error::{DeskError, Result};

pub const SAMPLE_UNAVAILABLE: &str = "Sample file is not available. Please contact support.";

const CLIENT_ROWS: &[&[&str]] = &[
    &["UCC001", "Asha Rao", "ABCDE1234F", "9820012345", "asha.rao@example.com", "12 Marine Drive, Mumbai"],
    &["UCC002", "Ravi Kumar", "PQRST6789Z", "9845098450", "ravi.k@example.com", "44 MG Road, Bengaluru"],
];

const COLLATERAL_ROWS: &[&[&str]] = &[
    &["1", "RELIANCE", "200", "2025-01-15", "584000.00"],
    &["1", "INFY", "150", "2025-01-16", "281250.50"],
];

const MARGIN_ROWS: &[&[&str]] = &[
    &["2025-01-15", "2500000.00", "1750000.00"],
    &["2025-01-16", "2450000.00", "1800000.00"],
];

const STATEMENT_ROWS: &[&[&str]] = &[
    &["2025-01-15", "Opening balance", "0.00", "1000000.00"],
    &["2025-01-15", "NEFT from UCC001", "250000.00", "1250000.00"],
    &["2025-01-16", "Exchange settlement", "-180000.00", "1070000.00"],
];

const TRADE_ROWS: &[&[&str]] = &[
    &["UCC001", "2025-01-15", "NSE", "EQ", "RELIANCE", "BUY", "100", "2920.00", "ORD1001", "TRD5001"],
    &["UCC002", "2025-01-15", "BSE", "EQ", "INFY", "SELL", "50", "1875.25", "ORD1002", "TRD5002"],
];

fn example_rows(domain: Domain) -> &'static [&'static [&'static str]] {
    match domain {
        Domain::Clients => CLIENT_ROWS,
        Domain::Collateral => COLLATERAL_ROWS,
        Domain::Margin => MARGIN_ROWS,
        Domain::Statements => STATEMENT_ROWS,
        Domain::Trades => TRADE_ROWS,
    }
}

fn write_sample<W: std::io::Write>(domain: Domain, wtr: &mut csv::Writer<W>) -> Result<()> {
    wtr.write_record(domain.required_columns())?;
    for row in example_rows(domain) {
        wtr.write_record(*row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// The bundled template for `domain` as CSV text.
pub fn render_sample(domain: Domain) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    write_sample(domain, &mut wtr)?;
    let bytes = wtr.into_inner().map_err(|e| DeskError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| DeskError::Other(e.to_string()))
}

/// Where a sample lands: `dest` itself, or the template's file name inside
/// `dest` when it is a directory.
pub fn sample_destination(domain: Domain, dest: &Path) -> PathBuf {
    if dest.is_dir() {
        dest.join(domain.sample_file_name())
    } else {
        dest.to_path_buf()
    }
}

pub fn save_sample(domain: Domain, dest: &Path) -> Result<PathBuf> {
    let path = sample_destination(domain, dest);
    let mut wtr = csv::Writer::from_path(&path)?;
    write_sample(domain, &mut wtr)?;
    debug!(domain = domain.key(), path = %path.display(), "wrote sample template");
    Ok(path)
}

/// Rejects HTML served in place of a CSV, e.g. a single-page-app fallback.
pub fn check_sample_payload(content_type: Option<&str>, body: &[u8]) -> Result<()> {
    if content_type.is_some_and(|ct| ct.to_lowercase().contains("text/html")) {
        return Err(DeskError::SampleUnavailable(SAMPLE_UNAVAILABLE.to_string()));
    }
    let head = String::from_utf8_lossy(&body[..body.len().min(100)]);
    let head = head.trim().to_lowercase();
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        return Err(DeskError::SampleUnavailable(SAMPLE_UNAVAILABLE.to_string()));
    }
    Ok(())
}

#[cfg(feature = "fetch")]
pub fn download_sample(domain: Domain, url: &str, dest: &Path) -> Result<PathBuf> {
    let response = reqwest::blocking::get(url)?;
    let status = response.status();
    if !status.is_success() {
        return Err(DeskError::SampleUnavailable(format!(
            "Failed to download sample file: {}",
            status.canonical_reason().unwrap_or(status.as_str())
        )));
    }
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.bytes()?;
    check_sample_payload(content_type.as_deref(), &body)?;

    let path = sample_destination(domain, dest);
    std::fs::write(&path, &body)?;
    debug!(url, path = %path.display(), bytes = body.len(), "downloaded sample");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::{
        validate_and_convert, ClientRows, CollateralRows, MarginRows, StatementRows, TradeRows,
    };
    use crate::parsing::{parse_csv_text, parse_file};
    use crate::validation::missing_columns;

    #[test]
    fn test_every_sample_passes_its_own_validation() {
        for domain in Domain::ALL {
            let parsed = parse_csv_text(&render_sample(domain).unwrap());
            assert!(parsed.success, "{}", domain.key());
            assert!(missing_columns(&parsed.headers, domain.required_columns()).is_empty());
            let valid = match domain {
                Domain::Clients => validate_and_convert::<ClientRows>(&parsed.rows).valid,
                Domain::Collateral => validate_and_convert::<CollateralRows>(&parsed.rows).valid,
                Domain::Margin => validate_and_convert::<MarginRows>(&parsed.rows).valid,
                Domain::Statements => validate_and_convert::<StatementRows>(&parsed.rows).valid,
                Domain::Trades => validate_and_convert::<TradeRows>(&parsed.rows).valid,
            };
            assert!(valid, "{} sample has invalid rows", domain.key());
        }
    }

    #[test]
    fn test_quoted_address_survives() {
        let text = render_sample(Domain::Clients).unwrap();
        assert!(text.contains("\"12 Marine Drive, Mumbai\""));
        let parsed = parse_csv_text(&text);
        assert_eq!(parsed.rows[0].value("address"), "12 Marine Drive, Mumbai");
    }

    #[test]
    fn test_save_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_sample(Domain::Trades, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("trades_sample.csv"));
        assert_eq!(parse_file(&path).row_count, 2);
    }

    #[test]
    fn test_html_payloads_rejected() {
        assert!(check_sample_payload(Some("text/html; charset=utf-8"), b"a,b\n").is_err());
        assert!(check_sample_payload(Some("text/csv"), b"  \n<!DOCTYPE html><html>").is_err());
        assert!(check_sample_payload(None, b"<HTML><body>").is_err());
        let err = check_sample_payload(None, b"<html>").unwrap_err();
        assert_eq!(err.to_string(), SAMPLE_UNAVAILABLE);
    }

    #[test]
    fn test_csv_payload_accepted() {
        assert!(check_sample_payload(Some("text/csv"), b"date,amount\n2025-01-15,10\n").is_ok());
        assert!(check_sample_payload(None, b"").is_ok());
    }
}
