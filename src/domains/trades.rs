use crate::backend::{Backend, BackendResult};
use crate::domains::{Domain, RowMapper};
use crate::models::{Trade, TradeSide};
use crate::parsing::ParsedRow;
use crate::validation::RowChecks;

pub const REQUIRED_COLUMNS: &[&str] = &[
    "client_code",
    "trade_date",
    "exchange",
    "segment",
    "security",
    "side",
    "quantity",
    "price",
    "order_id",
    "trade_id",
];

pub struct TradeRows;

/// A single trade keyed in by hand. Goes through the same rules as a CSV row.
#[derive(Debug, Clone, Default)]
pub struct ManualTrade {
    pub client_code: String,
    pub trade_date: String,
    pub exchange: String,
    pub segment: String,
    pub security: String,
    pub side: String,
    pub quantity: String,
    pub price: String,
    pub order_id: String,
    pub trade_id: String,
}

impl ManualTrade {
    fn to_row(&self) -> ParsedRow {
        [
            ("client_code", &self.client_code),
            ("trade_date", &self.trade_date),
            ("exchange", &self.exchange),
            ("segment", &self.segment),
            ("security", &self.security),
            ("side", &self.side),
            ("quantity", &self.quantity),
            ("price", &self.price),
            ("order_id", &self.order_id),
            ("trade_id", &self.trade_id),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.clone()))
        .collect()
    }

    pub fn to_trade(&self) -> Result<Trade, Vec<String>> {
        read(&self.to_row())
    }
}

fn read(row: &ParsedRow) -> Result<Trade, Vec<String>> {
    let mut checks = RowChecks::new(row);
    let client_code = checks.required("client_code");
    let trade_date = checks.date("trade_date");
    let exchange = checks.required("exchange");
    let segment = checks.required("segment");
    let security = checks.required("security");
    let side = checks.required("side").and_then(|raw| {
        let side = TradeSide::parse(raw);
        if side.is_none() {
            checks.push(format!("side must be either BUY or SELL (got: {raw})"));
        }
        side
    });
    let quantity = checks.positive_integer("quantity");
    let price = checks.positive_number("price");
    let order_id = checks.required("order_id");
    let trade_id = checks.required("trade_id");

    let errors = checks.into_errors();
    if !errors.is_empty() {
        return Err(errors);
    }
    match (
        client_code, trade_date, exchange, segment, security, side, quantity, price, order_id,
        trade_id,
    ) {
        (
            Some(client_code),
            Some(trade_date),
            Some(exchange),
            Some(segment),
            Some(security),
            Some(side),
            Some(quantity),
            Some(price),
            Some(order_id),
            Some(trade_id),
        ) => Ok(Trade {
            client_code: client_code.to_string(),
            trade_date,
            exchange: exchange.to_string(),
            segment: segment.to_string(),
            security: security.to_string(),
            side,
            quantity,
            price,
            order_id: order_id.to_string(),
            trade_id: trade_id.to_string(),
        }),
        _ => Err(errors),
    }
}

impl RowMapper for TradeRows {
    type Record = Trade;
    const DOMAIN: Domain = Domain::Trades;

    fn validate_row(row: &ParsedRow) -> Vec<String> {
        read(row).err().unwrap_or_default()
    }

    fn convert(row: &ParsedRow) -> Result<Trade, String> {
        read(row).map_err(|errors| errors.join("; "))
    }

    fn submit(backend: &mut dyn Backend, records: Vec<Trade>) -> BackendResult<()> {
        backend.bulk_upload_trades(records)
    }
}
