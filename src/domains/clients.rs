use crate::backend::{Backend, BackendResult};
use crate::domains::{Domain, RowMapper};
use crate::models::ClientUpload;
use crate::parsing::ParsedRow;
use crate::validation::{validate_pan, RowChecks};

pub const REQUIRED_COLUMNS: &[&str] = &["ucc", "name", "pan", "mobile", "email", "address"];

pub struct ClientRows;

/// Same rules as a CSV row, for a client entered field by field.
pub fn client_from_fields(name: &str, pan: &str, address: &str) -> Result<ClientUpload, Vec<String>> {
    let row: ParsedRow = [("name", name), ("pan", pan), ("address", address)]
        .into_iter()
        .collect();
    read(&row)
}

fn normalize_pan(checks: &mut RowChecks, raw: Option<&str>) -> Option<String> {
    let pan = raw?.to_uppercase();
    if validate_pan(&pan) {
        Some(pan)
    } else {
        checks.push(format!(
            "PAN must be a valid PAN format (e.g., ABCDE1234F) (got: {pan})"
        ));
        None
    }
}

fn read(row: &ParsedRow) -> Result<ClientUpload, Vec<String>> {
    let mut checks = RowChecks::new(row);
    let name = checks.required("name");
    let pan = checks.required("pan");
    let pan = normalize_pan(&mut checks, pan);
    let address = checks.required("address");

    let errors = checks.into_errors();
    match (name, pan, address) {
        (Some(name), Some(pan), Some(address)) if errors.is_empty() => Ok(ClientUpload {
            name: name.to_string(),
            pan,
            address: address.to_string(),
            documents: Vec::new(),
        }),
        _ => Err(errors),
    }
}

impl RowMapper for ClientRows {
    type Record = ClientUpload;
    const DOMAIN: Domain = Domain::Clients;

    fn validate_row(row: &ParsedRow) -> Vec<String> {
        read(row).err().unwrap_or_default()
    }

    fn convert(row: &ParsedRow) -> Result<ClientUpload, String> {
        read(row).map_err(|errors| errors.join("; "))
    }

    fn submit(backend: &mut dyn Backend, records: Vec<ClientUpload>) -> BackendResult<()> {
        backend.bulk_upload_clients(records)
    }
}
