use std::path::PathBuf;

use colored::Colorize;
use comfy_table::Table;

use super::Desk;
use crate::error::{DeskError, Result};
use crate::permissions::CapabilityMap;
use crate::reports::{check_report_access, generate, render_report, save_report, ReportTemplate};

fn templates() {
    let mut table = Table::new();
    table.set_header(vec!["Template", "Name", "Contents"]);
    for t in ReportTemplate::ALL {
        table.add_row(vec![t.key(), t.name(), t.description()]);
    }
    println!("{table}");
}

pub fn run(map: &CapabilityMap, role: Option<&str>, template: Option<&str>, output: Option<String>) -> Result<()> {
    let Some(raw) = template else {
        templates();
        return Ok(());
    };
    let template = ReportTemplate::parse(raw)
        .ok_or_else(|| DeskError::Other(format!("Unknown report template: {raw}")))?;

    let desk = Desk::open(map, role)?;
    check_report_access(&desk.caller.permissions, output.is_some())?;
    let report = generate(template, &desk.backend())?;

    match output.as_deref() {
        Some("-") => print!("{}", render_report(&report)?),
        Some(dest) => {
            let path = save_report(&report, &PathBuf::from(dest))?;
            println!(
                "{} Saved {} ({} rows) to {}",
                "✓".green(),
                template.name(),
                report.rows.len(),
                path.display()
            );
        }
        None => {
            let mut table = Table::new();
            table.set_header(report.headers.clone());
            for row in &report.rows {
                table.add_row(row);
            }
            println!("{} ({})\n{table}", template.name(), report.rows.len());
        }
    }
    Ok(())
}
