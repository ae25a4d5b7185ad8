use colored::Colorize;
use comfy_table::{Cell, Table};

use super::{rejected, Desk};
use crate::backend::Backend;
use crate::calendar::deadline_from_fields;
use crate::error::{DeskError, Result};
use crate::fmt::date;
use crate::models::{DeadlineId, DeadlineStatus};
use crate::permissions::CapabilityMap;
use crate::store::now_nanos;

pub fn add(
    map: &CapabilityMap,
    role: Option<&str>,
    title: &str,
    description: &str,
    due: &str,
    category: &str,
) -> Result<()> {
    let deadline = deadline_from_fields(title, description, due, category)
        .map_err(|errors| DeskError::Other(format!("Invalid deadline: {}", errors.join("; "))))?;
    let desk = Desk::open(map, role)?;
    let mut backend = desk.backend();
    let id = backend
        .add_regulatory_deadline(deadline.clone())
        .map_err(rejected("Add Deadline"))?;
    println!(
        "{} Added deadline {id}: {} ({}, due {})",
        "✓".green(),
        deadline.title,
        deadline.category,
        date(deadline.due_date)
    );
    Ok(())
}

pub fn update(map: &CapabilityMap, role: Option<&str>, id: DeadlineId, status: &str) -> Result<()> {
    let status = DeadlineStatus::parse(status).ok_or_else(|| {
        DeskError::Other(format!("Unknown status '{status}' (expected Pending or Submitted)"))
    })?;
    let desk = Desk::open(map, role)?;
    desk.backend()
        .update_regulatory_deadline_status(id, status)
        .map_err(rejected("Update Deadline"))?;
    println!("{} Deadline {id} marked {}", "✓".green(), status.as_str());
    Ok(())
}

pub fn list(map: &CapabilityMap, role: Option<&str>) -> Result<()> {
    let desk = Desk::open(map, role)?;
    let deadlines = desk.backend().get_regulatory_deadlines()?;
    let now = now_nanos();

    let mut table = Table::new();
    table.set_header(vec!["ID", "Due", "Category", "Title", "Status", "Created By"]);
    let mut overdue = 0;
    for d in &deadlines {
        let status = if d.is_overdue(now) {
            overdue += 1;
            "Overdue".red().to_string()
        } else {
            d.status.as_str().to_string()
        };
        table.add_row(vec![
            Cell::new(d.id),
            Cell::new(date(d.due_date)),
            Cell::new(&d.category),
            Cell::new(&d.title),
            Cell::new(status),
            Cell::new(d.created_by.get().map(|p| p.as_str()).unwrap_or("")),
        ]);
    }
    println!("Regulatory deadlines ({})\n{table}", deadlines.len());
    if overdue > 0 {
        println!("{}", format!("{overdue} overdue").red());
    }
    Ok(())
}
