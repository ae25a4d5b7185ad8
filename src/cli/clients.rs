use colored::Colorize;
use comfy_table::{Cell, Table};

use super::{rejected, Desk};
use crate::backend::Backend;
use crate::domains::clients::client_from_fields;
use crate::error::{DeskError, Result};
use crate::fmt::{date, datetime};
use crate::models::ClientId;
use crate::permissions::CapabilityMap;

fn invalid(errors: Vec<String>) -> DeskError {
    DeskError::Other(format!("Invalid client: {}", errors.join("; ")))
}

pub fn add(map: &CapabilityMap, role: Option<&str>, name: &str, pan: &str, address: &str) -> Result<()> {
    let client = client_from_fields(name, pan, address).map_err(invalid)?;
    let desk = Desk::open(map, role)?;
    let id = desk
        .backend()
        .create_client(&client.name, &client.pan, &client.address)
        .map_err(rejected("Add Client"))?;
    println!("{} Added client {id}: {} ({})", "✓".green(), client.name, client.pan);
    Ok(())
}

pub fn update(
    map: &CapabilityMap,
    role: Option<&str>,
    id: ClientId,
    name: &str,
    pan: &str,
    address: &str,
) -> Result<()> {
    let client = client_from_fields(name, pan, address).map_err(invalid)?;
    let desk = Desk::open(map, role)?;
    desk.backend()
        .update_client(id, &client.name, &client.pan, &client.address)
        .map_err(rejected("Update Client"))?;
    println!("{} Updated client {id}", "✓".green());
    Ok(())
}

pub fn list(map: &CapabilityMap, role: Option<&str>) -> Result<()> {
    let desk = Desk::open(map, role)?;
    let clients = desk.backend().get_clients()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "PAN", "Address", "Created By", "Created"]);
    for c in &clients {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(&c.name),
            Cell::new(&c.pan),
            Cell::new(&c.address),
            Cell::new(c.created_by.get().map(|p| p.as_str()).unwrap_or("")),
            Cell::new(c.created_at.get().map(|t| date(*t)).unwrap_or_default()),
        ]);
    }
    println!("Clients ({})\n{table}", clients.len());
    Ok(())
}

pub fn show(map: &CapabilityMap, role: Option<&str>, id: ClientId) -> Result<()> {
    let desk = Desk::open(map, role)?;
    let client = desk
        .backend()
        .get_client(id)?
        .ok_or_else(|| DeskError::Other(format!("Client {id} not found")))?;

    println!("ID:          {}", client.id);
    println!("Name:        {}", client.name);
    println!("PAN:         {}", client.pan);
    println!("Address:     {}", client.address);
    println!(
        "Documents:   {}",
        if client.documents.is_empty() { "(none)".to_string() } else { client.documents.join(", ") }
    );
    if let Some(by) = client.created_by.get() {
        println!("Created by:  {by}");
    }
    if let Some(at) = client.created_at.get() {
        println!("Created:     {}", datetime(*at));
    }
    if let Some(at) = client.updated_at.get() {
        println!("Updated:     {}", datetime(*at));
    }
    Ok(())
}
