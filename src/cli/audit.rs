use comfy_table::{Cell, Table};

use super::Desk;
use crate::backend::Backend;
use crate::error::Result;
use crate::fmt::datetime;
use crate::permissions::CapabilityMap;

pub fn run(map: &CapabilityMap, role: Option<&str>, limit: usize) -> Result<()> {
    let desk = Desk::open(map, role)?;
    let entries = desk.backend().get_audit_entries(limit)?;

    let mut table = Table::new();
    table.set_header(vec!["Time", "User", "Action", "Details"]);
    for e in &entries {
        table.add_row(vec![
            Cell::new(datetime(e.entry_time)),
            Cell::new(&e.user),
            Cell::new(&e.action),
            Cell::new(&e.details),
        ]);
    }
    println!("Audit trail (latest {})\n{table}", entries.len());
    Ok(())
}
