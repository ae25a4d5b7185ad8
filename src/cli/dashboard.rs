use colored::Colorize;

use super::Desk;
use crate::backend::Backend;
use crate::error::Result;
use crate::fmt::amount;
use crate::permissions::CapabilityMap;

pub fn run(map: &CapabilityMap, role: Option<&str>) -> Result<()> {
    let desk = Desk::open(map, role)?;
    let m = desk.backend().get_dashboard_metrics()?;

    println!("Clients:             {}", m.total_clients);
    println!("Trades:              {}", m.total_trades);
    match (m.latest_margin_available, m.latest_margin_used) {
        (Some(available), Some(used)) => {
            println!("Margin available:    {}", amount(available));
            println!("Margin used:         {}", amount(used));
        }
        _ => println!("Margin:              (no snapshots)"),
    }
    println!("Reconciliation runs: {}", m.reconciliation_run_count);
    let pending = m.pending_deadlines.to_string();
    if m.pending_deadlines > 0 {
        println!("Pending deadlines:   {}", pending.yellow());
    } else {
        println!("Pending deadlines:   {pending}");
    }
    Ok(())
}
