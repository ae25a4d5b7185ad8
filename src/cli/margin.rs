use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use super::{rejected, Desk};
use crate::backend::Backend;
use crate::domains::{MarginRows, RowMapper};
use crate::error::{DeskError, Result};
use crate::fmt::{amount, date, datetime};
use crate::parsing::ParsedRow;
use crate::permissions::CapabilityMap;

pub fn add(map: &CapabilityMap, role: Option<&str>, available: &str, used: &str, on: &str) -> Result<()> {
    let row: ParsedRow = [("date", on), ("margin_available", available), ("margin_used", used)]
        .into_iter()
        .collect();
    let snapshot = MarginRows::convert(&row)
        .map_err(|e| DeskError::Other(format!("Invalid margin snapshot: {e}")))?;

    let desk = Desk::open(map, role)?;
    desk.backend()
        .add_margin_snapshot(snapshot.margin_available, snapshot.margin_used, snapshot.date)
        .map_err(rejected("Margin Snapshot"))?;
    println!(
        "{} Recorded margin for {}: {} available, {} used",
        "✓".green(),
        date(snapshot.date),
        amount(snapshot.margin_available),
        amount(snapshot.margin_used)
    );
    Ok(())
}

pub fn list(map: &CapabilityMap, role: Option<&str>) -> Result<()> {
    let desk = Desk::open(map, role)?;
    let snapshots = desk.backend().get_margin_snapshots()?;

    let mut table = Table::new();
    table.set_header(vec!["Date", "Available", "Used", "Free", "Recorded", "By"]);
    for s in &snapshots {
        let free = s.margin_available - s.margin_used;
        let free = if free < 0.0 {
            amount(free).red().to_string()
        } else {
            amount(free)
        };
        table.add_row(vec![
            Cell::new(date(s.date)),
            Cell::new(amount(s.margin_available)).set_alignment(CellAlignment::Right),
            Cell::new(amount(s.margin_used)).set_alignment(CellAlignment::Right),
            Cell::new(free).set_alignment(CellAlignment::Right),
            Cell::new(s.snapshot_time.get().map(|t| datetime(*t)).unwrap_or_default()),
            Cell::new(s.recorded_by.get().map(|p| p.as_str()).unwrap_or("")),
        ]);
    }
    println!("Margin snapshots ({})\n{table}", snapshots.len());
    Ok(())
}

pub fn collateral(map: &CapabilityMap, role: Option<&str>) -> Result<()> {
    let desk = Desk::open(map, role)?;
    let records = desk.backend().get_collateral_records()?;

    let mut table = Table::new();
    table.set_header(vec!["Client", "Security", "Qty", "Pledged", "Market Value", "By"]);
    let mut total = 0.0;
    for r in &records {
        total += r.market_value;
        table.add_row(vec![
            Cell::new(r.client_id),
            Cell::new(&r.security_name),
            Cell::new(r.quantity).set_alignment(CellAlignment::Right),
            Cell::new(date(r.pledge_date)),
            Cell::new(amount(r.market_value)).set_alignment(CellAlignment::Right),
            Cell::new(r.recorded_by.get().map(|p| p.as_str()).unwrap_or("")),
        ]);
    }
    println!("Collateral ({})\n{table}", records.len());
    println!("Total market value: {}", amount(total));
    Ok(())
}
