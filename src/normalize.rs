use std::fmt::Display;
use std::sync::OnceLock;

use regex::Regex;
use tracing::error;

/// Shown instead of the raw backend text when a submission fails to decode.
pub const SCHEMA_ERROR_MESSAGE: &str = "Import failed due to an invalid data format. \
Please re-download the sample CSV template and ensure your data matches the expected format exactly.";

// Checked in order; the first match classifies the error.
const SCHEMA_ERROR_PATTERNS: &[&str] = &[
    r"(?i)invalid principal",
    r"(?i)candid.*decode",
    r"(?i)candid.*type",
    r"(?i)invalid.*argument",
    r"(?i)field.*expected",
    r"(?i)type mismatch",
    r"(?i)deserialization",
];

fn schema_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SCHEMA_ERROR_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    pub user_message: String,
    pub technical_message: String,
    pub is_schema_error: bool,
}

pub fn normalize_backend_error(err: &dyn Display) -> NormalizedError {
    let technical_message = err.to_string();
    let is_schema_error = schema_patterns()
        .iter()
        .any(|re| re.is_match(&technical_message));

    NormalizedError {
        user_message: if is_schema_error {
            SCHEMA_ERROR_MESSAGE.to_string()
        } else {
            technical_message.clone()
        },
        technical_message,
        is_schema_error,
    }
}

/// Technical detail goes to the log only, never to the user message.
pub fn log_technical_error(err: &NormalizedError, context: Option<&str>) {
    let prefix = context.unwrap_or("Backend Error");
    error!("[{prefix}] Technical details: {}", err.technical_message);
    if err.is_schema_error {
        error!(
            "[{prefix}] This appears to be a schema/decoding error. \
             Check that the data format matches the backend expectations."
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;

    #[test]
    fn test_decode_error_is_schema_error() {
        let err = BackendError::Rejected(
            "Call failed: Candid decode error: type mismatch on field marketValue".into(),
        );
        let n = normalize_backend_error(&err);
        assert!(n.is_schema_error);
        assert_eq!(n.user_message, SCHEMA_ERROR_MESSAGE);
        assert!(n.technical_message.contains("marketValue"));
    }

    #[test]
    fn test_each_signature_matches() {
        for msg in [
            "Invalid principal argument",
            "IDL error: candid could not decode",
            "candid: wrong type for record",
            "Invalid value for argument 2",
            "field pan expected text",
            "datatype mismatch",
            "Deserialization failed",
        ] {
            assert!(normalize_backend_error(&msg).is_schema_error, "{msg}");
        }
    }

    #[test]
    fn test_other_errors_pass_through() {
        let n = normalize_backend_error(&"Unauthorized: only admins can upload");
        assert!(!n.is_schema_error);
        assert_eq!(n.user_message, "Unauthorized: only admins can upload");
        assert_eq!(n.user_message, n.technical_message);
    }
}
