use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendResult};
use crate::domains::{validate_and_convert, RowMapper};
use crate::error::{DeskError, Result};
use crate::normalize::{log_technical_error, normalize_backend_error, NormalizedError};
use crate::parsing::{parse_file, FileParseResult, ParsedRow};
use crate::permissions::Permissions;
use crate::validation::{missing_columns, RowError};

#[derive(Debug, Clone, PartialEq)]
pub enum UploadFailure {
    InvalidRows(Vec<RowError>),
    Backend(NormalizedError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Idle,
    FileSelected,
    ParseFailed,
    ColumnsChecked,
    Previewed,
    Submitting,
    Succeeded { accepted: usize },
    Failed(UploadFailure),
}

/// Identifies one file selection. Results carrying an older ticket belong to
/// an abandoned attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTicket(u64);

pub struct Submission<R> {
    pub ticket: AttemptTicket,
    pub records: Vec<R>,
}

/// Bulk upload flow for one domain. Each domain owns its own session.
pub struct UploadSession<M: RowMapper> {
    state: UploadState,
    file: Option<PathBuf>,
    parsed: Option<FileParseResult>,
    missing: Vec<String>,
    generation: u64,
    in_flight: usize,
    _mapper: PhantomData<M>,
}

impl<M: RowMapper> Default for UploadSession<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RowMapper> UploadSession<M> {
    pub fn new() -> Self {
        Self {
            state: UploadState::Idle,
            file: None,
            parsed: None,
            missing: Vec::new(),
            generation: 0,
            in_flight: 0,
            _mapper: PhantomData,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn parsed(&self) -> Option<&FileParseResult> {
        self.parsed.as_ref()
    }

    pub fn missing_columns(&self) -> &[String] {
        &self.missing
    }

    fn is_current(&self, ticket: AttemptTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Starts a new attempt from any state, discarding prior results.
    pub fn select_file(&mut self, path: impl Into<PathBuf>) -> AttemptTicket {
        self.generation += 1;
        self.file = Some(path.into());
        self.parsed = None;
        self.missing.clear();
        self.in_flight = 0;
        self.state = UploadState::FileSelected;
        AttemptTicket(self.generation)
    }

    /// Records a parse result. Returns false when the ticket is stale.
    pub fn accept_parse(&mut self, ticket: AttemptTicket, result: FileParseResult) -> bool {
        if !self.is_current(ticket) || self.state != UploadState::FileSelected {
            debug!(domain = M::DOMAIN.key(), "ignoring stale parse result");
            return false;
        }
        if result.success {
            self.missing = missing_columns(&result.headers, M::DOMAIN.required_columns());
            if !self.missing.is_empty() {
                warn!(
                    domain = M::DOMAIN.key(),
                    "missing required columns: {}",
                    self.missing.join(", ")
                );
            }
            self.state = UploadState::ColumnsChecked;
        } else {
            self.state = UploadState::ParseFailed;
        }
        self.parsed = Some(result);
        true
    }

    pub fn load_file(&mut self, path: &Path) -> &UploadState {
        let ticket = self.select_file(path);
        let result = parse_file(path);
        self.accept_parse(ticket, result);
        &self.state
    }

    /// First `limit` parsed rows. Available even when columns are missing.
    pub fn preview(&mut self, limit: usize) -> &[ParsedRow] {
        if self.state == UploadState::ColumnsChecked {
            self.state = UploadState::Previewed;
        }
        match &self.parsed {
            Some(parsed) => parsed.preview(limit),
            None => &[],
        }
    }

    fn check_submittable(&self, permissions: &Permissions) -> Result<&FileParseResult> {
        if self.state == UploadState::Submitting {
            return Err(DeskError::Other("A submission is already in progress".into()));
        }
        let parsed = match &self.parsed {
            Some(parsed) if parsed.success => parsed,
            Some(parsed) => {
                return Err(parsed
                    .error
                    .clone()
                    .map(DeskError::Parse)
                    .unwrap_or_else(|| DeskError::Other("File could not be parsed".into())))
            }
            None => return Err(DeskError::Other("No file selected".into())),
        };
        if !self.missing.is_empty() {
            return Err(DeskError::MissingColumns(self.missing.join(", ")));
        }
        if parsed.rows.is_empty() {
            return Err(DeskError::NoDataRows);
        }
        if !matches!(self.state, UploadState::Previewed | UploadState::Failed(_)) {
            return Err(DeskError::Other("Preview the file before submitting".into()));
        }
        let capability = M::DOMAIN.write_capability();
        if !permissions.can(capability) {
            warn!(
                domain = M::DOMAIN.key(),
                role = permissions.role().name(),
                "submission blocked: missing {}",
                capability.key()
            );
            return Err(DeskError::PermissionDenied {
                role: permissions.role().name().to_string(),
                capability: capability.key().to_string(),
            });
        }
        Ok(parsed)
    }

    /// Validates every row and hands back the full converted set. Invalid
    /// rows fail the attempt and nothing is returned for submission.
    pub fn begin_submit(&mut self, permissions: &Permissions) -> Result<Submission<M::Record>> {
        let outcome = validate_and_convert::<M>(&self.check_submittable(permissions)?.rows);
        if !outcome.valid {
            let failed = outcome.errors.len();
            self.state = UploadState::Failed(UploadFailure::InvalidRows(outcome.errors));
            return Err(DeskError::Validation(failed));
        }
        self.in_flight = outcome.records.len();
        self.state = UploadState::Submitting;
        Ok(Submission {
            ticket: AttemptTicket(self.generation),
            records: outcome.records,
        })
    }

    /// Settles a submission. Returns false when the result belongs to an
    /// abandoned attempt and was ignored.
    pub fn finish_submit(&mut self, ticket: AttemptTicket, result: BackendResult<()>) -> bool {
        if !self.is_current(ticket) || self.state != UploadState::Submitting {
            debug!(domain = M::DOMAIN.key(), "ignoring stale submission result");
            return false;
        }
        match result {
            Ok(()) => {
                let accepted = self.in_flight;
                info!(domain = M::DOMAIN.key(), accepted, "bulk upload accepted");
                self.file = None;
                self.parsed = None;
                self.missing.clear();
                self.in_flight = 0;
                self.state = UploadState::Succeeded { accepted };
            }
            Err(e) => {
                let normalized = normalize_backend_error(&e);
                log_technical_error(&normalized, Some("Bulk Upload"));
                self.in_flight = 0;
                self.state = UploadState::Failed(UploadFailure::Backend(normalized));
            }
        }
        true
    }

    /// Runs one submission to completion against `backend`.
    pub fn submit(&mut self, backend: &mut dyn Backend, permissions: &Permissions) -> Result<usize> {
        let Submission { ticket, records } = self.begin_submit(permissions)?;
        let result = M::submit(backend, records);
        self.finish_submit(ticket, result);
        match &self.state {
            UploadState::Succeeded { accepted } => Ok(*accepted),
            UploadState::Failed(UploadFailure::Backend(normalized)) => {
                Err(DeskError::Backend(normalized.clone()))
            }
            _ => Err(DeskError::Other("Submission was abandoned".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, Caller};
    use crate::db::{get_connection, init_db};
    use crate::domains::{ClientRows, TradeRows};
    use crate::models::Principal;
    use crate::normalize::SCHEMA_ERROR_MESSAGE;
    use crate::parsing::ParseError;
    use crate::permissions::{BusinessRole, CapabilityMap};
    use crate::store::SqliteBackend;

    const CLIENTS: &str = "ucc,name,pan,mobile,email,address\n\
        U1,Asha Rao,abcde1234f,9820000000,asha@example.com,\"12 Marine Drive, Mumbai\"\n\
        U2,Ravi Kumar,PQRST6789Z,,,Pune\n";

    fn perms(role: BusinessRole) -> Permissions {
        Permissions::for_role(&CapabilityMap::standard(), role)
    }

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn previewed(body: &str) -> (tempfile::TempDir, UploadSession<ClientRows>) {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "clients.csv", body);
        let mut session = UploadSession::<ClientRows>::new();
        session.load_file(&path);
        session.preview(5);
        (dir, session)
    }

    #[test]
    fn test_full_upload_clears_state() {
        let (dir, mut session) = previewed(CLIENTS);
        assert_eq!(session.state(), &UploadState::Previewed);

        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        let permissions = perms(BusinessRole::ComplianceOfficer);
        let mut backend = SqliteBackend::new(
            &conn,
            Caller {
                principal: Principal::new("alice"),
                permissions: permissions.clone(),
            },
        );
        assert_eq!(session.submit(&mut backend, &permissions).unwrap(), 2);
        assert_eq!(session.state(), &UploadState::Succeeded { accepted: 2 });
        assert!(session.parsed().is_none());
        assert!(session.file().is_none());

        let stored = backend.get_clients().unwrap();
        assert_eq!(stored[0].pan, "ABCDE1234F");
        assert_eq!(stored[0].address, "12 Marine Drive, Mumbai");
    }

    #[test]
    fn test_spreadsheet_fails_before_reading() {
        let mut session = UploadSession::<ClientRows>::new();
        let state = session.load_file(Path::new("/nonexistent/clients.xlsx")).clone();
        assert_eq!(state, UploadState::ParseFailed);
        let parsed = session.parsed().unwrap();
        assert_eq!(parsed.error, Some(ParseError::UnsupportedFormat { spreadsheet: true }));
        assert!(matches!(
            session.begin_submit(&perms(BusinessRole::SuperAdmin)),
            Err(DeskError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_columns_block_submit_but_not_preview() {
        let (_dir, mut session) = previewed("name,pan,address\nAsha,ABCDE1234F,Mumbai\n");
        assert_eq!(session.missing_columns(), ["ucc", "mobile", "email"]);
        assert_eq!(session.preview(5).len(), 1);
        let err = session.begin_submit(&perms(BusinessRole::SuperAdmin)).err().unwrap();
        assert_eq!(err.to_string(), "Missing required columns: ucc, mobile, email");
    }

    #[test]
    fn test_header_only_file_is_not_submitted() {
        let (_dir, mut session) = previewed("ucc,name,pan,mobile,email,address\n");
        assert_eq!(session.state(), &UploadState::Previewed);
        let err = session.begin_submit(&perms(BusinessRole::SuperAdmin)).err().unwrap();
        assert!(matches!(err, DeskError::NoDataRows));
        assert_eq!(err.to_string(), "No data rows found in file");
        assert_eq!(session.state(), &UploadState::Previewed);
    }

    #[test]
    fn test_preview_required_before_submit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "clients.csv", CLIENTS);
        let mut session = UploadSession::<ClientRows>::new();
        session.load_file(&path);
        assert_eq!(session.state(), &UploadState::ColumnsChecked);
        let err = session.begin_submit(&perms(BusinessRole::SuperAdmin)).err().unwrap();
        assert_eq!(err.to_string(), "Preview the file before submitting");
        session.preview(5);
        assert!(session.begin_submit(&perms(BusinessRole::SuperAdmin)).is_ok());
    }

    #[test]
    fn test_role_without_write_capability_is_blocked() {
        let (_dir, mut session) = previewed(CLIENTS);
        let err = session.begin_submit(&perms(BusinessRole::Dealer)).err().unwrap();
        assert_eq!(err.to_string(), "Role 'Dealer' is not allowed to create_clients");
        assert_eq!(session.state(), &UploadState::Previewed);
    }

    #[test]
    fn test_invalid_rows_fail_the_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "trades.csv",
            "client_code,trade_date,exchange,segment,security,side,quantity,price,order_id,trade_id\n\
             C001,2025-01-15,NSE,EQ,INFY,BUY,100,1500.50,O1,T1\n\
             C002,2025-01-15,NSE,EQ,TCS,SELL,abc,3400,O2,T2\n\
             C003,2025-01-16,NSE,EQ,WIPRO,BUY,5,480.10,O3,T3\n",
        );
        let mut session = UploadSession::<TradeRows>::new();
        session.load_file(&path);
        session.preview(5);
        let err = session.begin_submit(&perms(BusinessRole::SuperAdmin)).err().unwrap();
        assert!(matches!(err, DeskError::Validation(1)));
        match session.state() {
            UploadState::Failed(UploadFailure::InvalidRows(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].row_number, 3);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_stale_result_is_ignored() {
        let (dir, mut session) = previewed(CLIENTS);
        let submission = session.begin_submit(&perms(BusinessRole::SuperAdmin)).unwrap();
        assert_eq!(submission.records.len(), 2);

        let newer = write(&dir, "other.csv", CLIENTS);
        session.select_file(&newer);
        assert!(!session.finish_submit(submission.ticket, Ok(())));
        assert_eq!(session.state(), &UploadState::FileSelected);
        assert_eq!(session.file(), Some(newer.as_path()));
    }

    #[test]
    fn test_second_submit_rejected_while_in_flight() {
        let (_dir, mut session) = previewed(CLIENTS);
        let permissions = perms(BusinessRole::SuperAdmin);
        session.begin_submit(&permissions).unwrap();
        assert_eq!(session.state(), &UploadState::Submitting);
        assert!(session.begin_submit(&permissions).is_err());
    }

    #[test]
    fn test_decode_failure_is_normalized_and_retryable() {
        let (_dir, mut session) = previewed(CLIENTS);
        let permissions = perms(BusinessRole::SuperAdmin);
        let submission = session.begin_submit(&permissions).unwrap();
        let rejection = BackendError::Rejected(
            "IDL error: Candid decode failed, type mismatch for field createdBy".into(),
        );
        assert!(session.finish_submit(submission.ticket, Err(rejection)));
        match session.state() {
            UploadState::Failed(UploadFailure::Backend(n)) => {
                assert!(n.is_schema_error);
                assert_eq!(n.user_message, SCHEMA_ERROR_MESSAGE);
                assert!(n.technical_message.contains("createdBy"));
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert!(session.parsed().is_some());
        assert!(session.begin_submit(&permissions).is_ok());
    }
}
