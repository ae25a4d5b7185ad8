use thiserror::Error;

use crate::backend::BackendError;
use crate::normalize::NormalizedError;
use crate::parsing::ParseError;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "fetch")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Unknown domain: {0} (expected one of clients, collateral, margin, statements, trades)")]
    UnknownDomain(String),

    #[error("Role '{role}' is not allowed to {capability}")]
    PermissionDenied { role: String, capability: String },

    #[error("Missing required columns: {0}")]
    MissingColumns(String),

    #[error("No data rows found in file")]
    NoDataRows,

    #[error("Validation failed: {0} row(s) have errors")]
    Validation(usize),

    #[error("{}", .0.user_message)]
    Backend(NormalizedError),

    #[error("Backend error: {0}")]
    Store(#[from] BackendError),

    #[error("{0}")]
    SampleUnavailable(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DeskError>;
