use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use super::{parse_domain, Desk};
use crate::domains::{
    ClientRows, CollateralRows, Domain, MarginRows, RowMapper, StatementRows, TradeRows,
};
use crate::error::{DeskError, Result};
use crate::parsing::{parse_file, ParsedRow};
use crate::permissions::CapabilityMap;
use crate::upload::{UploadFailure, UploadSession, UploadState};
use crate::validation::missing_columns;

const PREVIEW_ROWS: usize = 5;

fn print_preview(headers: &[String], rows: &[ParsedRow]) {
    if rows.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(headers.iter().map(Cell::new));
    for row in rows {
        table.add_row(headers.iter().map(|h| Cell::new(row.value(h))));
    }
    println!("{table}");
}

fn print_missing(missing: &[String]) {
    println!(
        "{} Missing required columns: {}",
        "✗".red(),
        missing.join(", ")
    );
}

pub fn run(map: &CapabilityMap, role_override: Option<&str>, domain: &str, file: &str) -> Result<()> {
    let domain = parse_domain(domain)?;
    let desk = Desk::open(map, role_override)?;
    let path = Path::new(file);
    match domain {
        Domain::Clients => upload::<ClientRows>(&desk, path),
        Domain::Collateral => upload::<CollateralRows>(&desk, path),
        Domain::Margin => upload::<MarginRows>(&desk, path),
        Domain::Statements => upload::<StatementRows>(&desk, path),
        Domain::Trades => upload::<TradeRows>(&desk, path),
    }
}

fn upload<M: RowMapper>(desk: &Desk, path: &Path) -> Result<()> {
    let mut session = UploadSession::<M>::new();
    if *session.load_file(path) == UploadState::ParseFailed {
        let error = session.parsed().and_then(|p| p.error.clone());
        return Err(error
            .map(DeskError::Parse)
            .unwrap_or_else(|| DeskError::Other("File could not be parsed".into())));
    }

    let (summary, headers) = match session.parsed() {
        Some(parsed) => (parsed.summary(), parsed.headers.clone()),
        None => return Err(DeskError::Other("No file selected".into())),
    };
    println!("{summary}");
    let rows = session.preview(PREVIEW_ROWS).to_vec();
    print_preview(&headers, &rows);

    if !session.missing_columns().is_empty() {
        print_missing(session.missing_columns());
        return Err(DeskError::MissingColumns(session.missing_columns().join(", ")));
    }

    let source = session
        .file()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let mut backend = desk.backend();
    match session.submit(&mut backend, &desk.caller.permissions) {
        Ok(accepted) => {
            println!(
                "{} Imported {accepted} {} record(s) from {source}",
                "✓".green(),
                M::DOMAIN.title().to_lowercase()
            );
            Ok(())
        }
        Err(e) => {
            if let UploadState::Failed(UploadFailure::InvalidRows(errors)) = session.state() {
                for error in errors {
                    println!("  {} {error}", "✗".red());
                }
            }
            Err(e)
        }
    }
}

pub fn preview(domain: &str, file: &str, rows: usize) -> Result<()> {
    let domain = parse_domain(domain)?;
    let parsed = parse_file(Path::new(file));
    if let Some(error) = &parsed.error {
        return Err(DeskError::Parse(error.clone()));
    }

    println!("{}", parsed.summary());
    print_preview(&parsed.headers, parsed.preview(rows));

    let missing = missing_columns(&parsed.headers, domain.required_columns());
    if missing.is_empty() {
        println!(
            "{} All required {} columns present",
            "✓".green(),
            domain.key()
        );
    } else {
        print_missing(&missing);
    }
    Ok(())
}
