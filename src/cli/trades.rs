use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use super::{rejected, Desk};
use crate::backend::Backend;
use crate::domains::trades::ManualTrade;
use crate::error::{DeskError, Result};
use crate::fmt::{amount, date};
use crate::models::TradeSide;
use crate::permissions::CapabilityMap;

pub fn add(map: &CapabilityMap, role: Option<&str>, entry: ManualTrade) -> Result<()> {
    let trade = entry
        .to_trade()
        .map_err(|errors| DeskError::Other(format!("Invalid trade: {}", errors.join("; "))))?;
    let desk = Desk::open(map, role)?;
    let summary = format!(
        "{} {} {} @ {}",
        trade.side.as_str(),
        trade.quantity,
        trade.security,
        amount(trade.price)
    );
    desk.backend()
        .create_trade(trade)
        .map_err(rejected("Manual Trade"))?;
    println!("{} Recorded trade: {summary}", "✓".green());
    Ok(())
}

pub fn list(map: &CapabilityMap, role: Option<&str>, client_code: Option<&str>) -> Result<()> {
    let desk = Desk::open(map, role)?;
    let trades = desk.backend().get_trades(client_code)?;

    let mut table = Table::new();
    table.set_header(vec![
        "Date", "Client", "Exchange", "Segment", "Security", "Side", "Qty", "Price", "Order", "Trade",
    ]);
    for t in &trades {
        let side = match t.side {
            TradeSide::Buy => t.side.as_str().green().to_string(),
            TradeSide::Sell => t.side.as_str().red().to_string(),
        };
        table.add_row(vec![
            Cell::new(date(t.trade_date)),
            Cell::new(&t.client_code),
            Cell::new(&t.exchange),
            Cell::new(&t.segment),
            Cell::new(&t.security),
            Cell::new(side),
            Cell::new(t.quantity).set_alignment(CellAlignment::Right),
            Cell::new(amount(t.price)).set_alignment(CellAlignment::Right),
            Cell::new(&t.order_id),
            Cell::new(&t.trade_id),
        ]);
    }
    println!("Trades ({})\n{table}", trades.len());
    Ok(())
}
