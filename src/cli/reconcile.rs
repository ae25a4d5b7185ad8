use comfy_table::{Cell, CellAlignment, Table};

use super::Desk;
use crate::backend::Backend;
use crate::error::Result;
use crate::fmt::{amount, date, datetime, opt_date};
use crate::permissions::CapabilityMap;

pub fn statements(map: &CapabilityMap, role: Option<&str>, run: Option<i64>) -> Result<()> {
    let desk = Desk::open(map, role)?;
    let rows = desk.backend().get_statement_rows(run)?;

    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Amount", "Balance"]);
    for r in &rows {
        table.add_row(vec![
            Cell::new(date(r.date)),
            Cell::new(&r.description),
            Cell::new(amount(r.amount)).set_alignment(CellAlignment::Right),
            Cell::new(amount(r.balance)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("Statement rows ({})\n{table}", rows.len());
    Ok(())
}

pub fn runs(map: &CapabilityMap, role: Option<&str>) -> Result<()> {
    let desk = Desk::open(map, role)?;
    let runs = desk.backend().get_reconciliation_runs()?;

    let mut table = Table::new();
    table.set_header(vec!["Run", "Rows", "From", "To", "Closing Balance", "Uploaded By", "Uploaded"]);
    for run in &runs {
        table.add_row(vec![
            Cell::new(run.id),
            Cell::new(run.row_count).set_alignment(CellAlignment::Right),
            Cell::new(opt_date(run.date_range_start)),
            Cell::new(opt_date(run.date_range_end)),
            Cell::new(run.closing_balance.map(amount).unwrap_or_else(|| "-".into()))
                .set_alignment(CellAlignment::Right),
            Cell::new(&run.uploaded_by),
            Cell::new(datetime(run.uploaded_at)),
        ]);
    }
    println!("Reconciliation runs ({})\n{table}", runs.len());
    Ok(())
}
