use crate::backend::{Backend, BackendResult};
use crate::domains::{Domain, RowMapper};
use crate::models::{CollateralRecord, Stamp};
use crate::parsing::ParsedRow;
use crate::validation::RowChecks;

pub const REQUIRED_COLUMNS: &[&str] = &[
    "client_id",
    "security_name",
    "quantity",
    "pledge_date",
    "market_value",
];

pub struct CollateralRows;

fn read(row: &ParsedRow) -> Result<CollateralRecord, Vec<String>> {
    let mut checks = RowChecks::new(row);
    let client_id = checks.identifier("client_id");
    let security_name = checks.required("security_name");
    let quantity = checks.positive_integer("quantity");
    let pledge_date = checks.date("pledge_date");
    let market_value = checks.number("market_value");

    let errors = checks.into_errors();
    match (client_id, security_name, quantity, pledge_date, market_value) {
        (Some(client_id), Some(security_name), Some(quantity), Some(pledge_date), Some(market_value))
            if errors.is_empty() =>
        {
            Ok(CollateralRecord {
                client_id,
                security_name: security_name.to_string(),
                quantity,
                pledge_date,
                market_value,
                recorded_by: Stamp::Unset,
                recorded_at: Stamp::Unset,
            })
        }
        _ => Err(errors),
    }
}

impl RowMapper for CollateralRows {
    type Record = CollateralRecord;
    const DOMAIN: Domain = Domain::Collateral;

    fn validate_row(row: &ParsedRow) -> Vec<String> {
        read(row).err().unwrap_or_default()
    }

    fn convert(row: &ParsedRow) -> Result<CollateralRecord, String> {
        read(row).map_err(|errors| errors.join("; "))
    }

    fn submit(backend: &mut dyn Backend, records: Vec<CollateralRecord>) -> BackendResult<()> {
        backend.bulk_upload_collateral(records)
    }
}
