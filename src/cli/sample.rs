use std::path::PathBuf;

use colored::Colorize;

use super::parse_domain;
use crate::error::Result;
use crate::samples::{render_sample, save_sample};

pub fn run(domain: &str, output: Option<String>, url: Option<String>) -> Result<()> {
    let domain = parse_domain(domain)?;
    if output.as_deref() == Some("-") && url.is_none() {
        print!("{}", render_sample(domain)?);
        return Ok(());
    }
    let dest = output.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    let path = match url {
        Some(url) => fetch(domain, &url, &dest)?,
        None => save_sample(domain, &dest)?,
    };
    println!(
        "{} Saved {} sample to {}",
        "✓".green(),
        domain.key(),
        path.display()
    );
    Ok(())
}

#[cfg(feature = "fetch")]
fn fetch(domain: crate::domains::Domain, url: &str, dest: &std::path::Path) -> Result<PathBuf> {
    crate::samples::download_sample(domain, url, dest)
}

#[cfg(not(feature = "fetch"))]
fn fetch(_domain: crate::domains::Domain, _url: &str, _dest: &std::path::Path) -> Result<PathBuf> {
    Err(crate::error::DeskError::Other(
        "Downloading samples requires the `fetch` feature".into(),
    ))
}
