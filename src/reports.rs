use std::path::{Path, PathBuf};

use tracing::debug;

use crate::backend::{Backend, BackendResult};
use crate::error::{DeskError, Result};
use crate::fmt::{date, datetime, opt_date};
use crate::models::{Stamp, Timestamp};
use crate::permissions::{Capability, Permissions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTemplate {
    ClientSummary,
    TradeActivity,
    MarginAnalysis,
    ComplianceAudit,
    ReconciliationSummary,
}

impl ReportTemplate {
    pub const ALL: [ReportTemplate; 5] = [
        Self::ClientSummary,
        Self::TradeActivity,
        Self::MarginAnalysis,
        Self::ComplianceAudit,
        Self::ReconciliationSummary,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::ClientSummary => "client-summary",
            Self::TradeActivity => "trade-activity",
            Self::MarginAnalysis => "margin-analysis",
            Self::ComplianceAudit => "compliance-audit",
            Self::ReconciliationSummary => "reconciliation-summary",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ClientSummary => "Client Summary Report",
            Self::TradeActivity => "Trade Activity Report",
            Self::MarginAnalysis => "Margin Analysis Report",
            Self::ComplianceAudit => "Compliance Audit Report",
            Self::ReconciliationSummary => "Reconciliation Summary",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ClientSummary => "Client KYC records with document counts",
            Self::TradeActivity => "Every trade with exchange, security and side",
            Self::MarginAnalysis => "Margin snapshots with utilization",
            Self::ComplianceAudit => "Regulatory deadlines and their filing status",
            Self::ReconciliationSummary => "Bank statement uploads per reconciliation run",
        }
    }

    /// Accepts the key (`trade-activity`) or the underscore form.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase().replace('_', "-");
        Self::ALL.into_iter().find(|t| t.key() == key)
    }
}

/// A generated report: one header row and string cells, ready for CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub template: ReportTemplate,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

fn require(permissions: &Permissions, capability: Capability) -> Result<()> {
    if permissions.can(capability) {
        Ok(())
    } else {
        Err(DeskError::PermissionDenied {
            role: permissions.role().name().to_string(),
            capability: capability.key().to_string(),
        })
    }
}

/// Generating needs `generate_reports`; writing the result anywhere also
/// needs `export_reports`.
pub fn check_report_access(permissions: &Permissions, exporting: bool) -> Result<()> {
    require(permissions, Capability::GenerateReports)?;
    if exporting {
        require(permissions, Capability::ExportReports)?;
    }
    Ok(())
}

fn stamped_date(stamp: &Stamp<Timestamp>) -> String {
    stamp.get().map(|t| date(*t)).unwrap_or_default()
}

fn money(val: f64) -> String {
    format!("{val:.2}")
}

fn utilization(available: f64, used: f64) -> String {
    if available == 0.0 {
        "-".to_string()
    } else {
        format!("{:.2}", used / available * 100.0)
    }
}

pub fn generate(template: ReportTemplate, backend: &dyn Backend) -> BackendResult<Report> {
    let (headers, rows): (Vec<&'static str>, Vec<Vec<String>>) = match template {
        ReportTemplate::ClientSummary => (
            vec!["Name", "PAN", "Address", "Document Count", "Created Date"],
            backend
                .get_clients()?
                .into_iter()
                .map(|c| {
                    vec![
                        c.name,
                        c.pan,
                        c.address,
                        c.documents.len().to_string(),
                        stamped_date(&c.created_at),
                    ]
                })
                .collect(),
        ),
        ReportTemplate::TradeActivity => (
            vec![
                "Client Code", "Trade Date", "Exchange", "Segment", "Security", "Side", "Quantity",
                "Price", "Order ID", "Trade ID",
            ],
            backend
                .get_trades(None)?
                .into_iter()
                .map(|t| {
                    vec![
                        t.client_code,
                        date(t.trade_date),
                        t.exchange,
                        t.segment,
                        t.security,
                        t.side.as_str().to_string(),
                        t.quantity.to_string(),
                        money(t.price),
                        t.order_id,
                        t.trade_id,
                    ]
                })
                .collect(),
        ),
        ReportTemplate::MarginAnalysis => (
            vec!["Date", "Margin Available", "Margin Used", "Utilization %", "Snapshot Time"],
            backend
                .get_margin_snapshots()?
                .into_iter()
                .map(|s| {
                    vec![
                        date(s.date),
                        money(s.margin_available),
                        money(s.margin_used),
                        utilization(s.margin_available, s.margin_used),
                        s.snapshot_time.get().map(|t| datetime(*t)).unwrap_or_default(),
                    ]
                })
                .collect(),
        ),
        ReportTemplate::ComplianceAudit => (
            vec!["Title", "Description", "Due Date", "Category", "Status", "Created Date"],
            backend
                .get_regulatory_deadlines()?
                .into_iter()
                .map(|d| {
                    vec![
                        d.title,
                        d.description,
                        date(d.due_date),
                        d.category,
                        d.status.as_str().to_string(),
                        stamped_date(&d.created_at),
                    ]
                })
                .collect(),
        ),
        ReportTemplate::ReconciliationSummary => (
            vec!["Run ID", "Upload Date", "Row Count", "From", "To", "Closing Balance"],
            backend
                .get_reconciliation_runs()?
                .into_iter()
                .map(|r| {
                    vec![
                        r.id.to_string(),
                        date(r.uploaded_at),
                        r.row_count.to_string(),
                        opt_date(r.date_range_start),
                        opt_date(r.date_range_end),
                        r.closing_balance.map(money).unwrap_or_default(),
                    ]
                })
                .collect(),
        ),
    };
    Ok(Report {
        template,
        headers,
        rows,
    })
}

fn write_report<W: std::io::Write>(report: &Report, wtr: &mut csv::Writer<W>) -> Result<()> {
    wtr.write_record(&report.headers)?;
    for row in &report.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn render_report(report: &Report) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    write_report(report, &mut wtr)?;
    let bytes = wtr.into_inner().map_err(|e| DeskError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| DeskError::Other(e.to_string()))
}

/// Writes to `dest`, or to `<key>_report.csv` inside it when it is a directory.
pub fn save_report(report: &Report, dest: &Path) -> Result<PathBuf> {
    let path = if dest.is_dir() {
        dest.join(format!("{}_report.csv", report.template.key()))
    } else {
        dest.to_path_buf()
    };
    let mut wtr = csv::Writer::from_path(&path)?;
    write_report(report, &mut wtr)?;
    debug!(
        template = report.template.key(),
        rows = report.rows.len(),
        path = %path.display(),
        "wrote report"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Caller;
    use crate::db::{get_connection, init_db};
    use crate::models::{NewDeadline, Principal, Trade, TradeSide};
    use crate::parsing::parse_file;
    use crate::permissions::{BusinessRole, CapabilityMap};
    use crate::store::SqliteBackend;

    fn permissions(role: BusinessRole) -> Permissions {
        Permissions::for_role(&CapabilityMap::standard(), role)
    }

    fn backend(conn: &rusqlite::Connection) -> SqliteBackend<'_> {
        SqliteBackend::new(
            conn,
            Caller {
                principal: Principal::new("alice"),
                permissions: permissions(BusinessRole::SuperAdmin),
            },
        )
    }

    #[test]
    fn test_parse_template() {
        assert_eq!(ReportTemplate::parse("Trade-Activity"), Some(ReportTemplate::TradeActivity));
        assert_eq!(ReportTemplate::parse("margin_analysis"), Some(ReportTemplate::MarginAnalysis));
        assert_eq!(ReportTemplate::parse("pnl"), None);
    }

    #[test]
    fn test_report_access() {
        assert!(check_report_access(&permissions(BusinessRole::Accountant), true).is_ok());
        let err = check_report_access(&permissions(BusinessRole::Dealer), false).unwrap_err();
        assert_eq!(err.to_string(), "Role 'Dealer' is not allowed to generate_reports");
        assert!(check_report_access(&permissions(BusinessRole::ComplianceOfficer), true).is_ok());
        let err = check_report_access(&permissions(BusinessRole::ExternalAuditor), false).unwrap_err();
        assert!(err.to_string().contains("generate_reports"));
    }

    #[test]
    fn test_margin_utilization() {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        let mut b = backend(&conn);
        b.add_margin_snapshot(2000.0, 500.0, 0).unwrap();
        b.add_margin_snapshot(0.0, 0.0, 86_400_000_000_000).unwrap();

        let report = generate(ReportTemplate::MarginAnalysis, &b).unwrap();
        assert_eq!(report.headers[3], "Utilization %");
        let utilizations: Vec<_> = report.rows.iter().map(|r| r[3].as_str()).collect();
        assert!(utilizations.contains(&"25.00"));
        assert!(utilizations.contains(&"-"));
    }

    #[test]
    fn test_trade_and_deadline_reports() {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        let mut b = backend(&conn);
        b.create_trade(Trade {
            client_code: "UCC001".into(),
            trade_date: 1_736_899_200_000_000_000,
            exchange: "NSE".into(),
            segment: "EQ".into(),
            security: "RELIANCE".into(),
            side: TradeSide::Buy,
            quantity: 100,
            price: 2920.0,
            order_id: "ORD1001".into(),
            trade_id: "TRD5001".into(),
        })
        .unwrap();
        b.add_regulatory_deadline(NewDeadline {
            title: "Half-yearly net worth".into(),
            description: "Auditor certified".into(),
            due_date: 1_743_379_200_000_000_000,
            category: "NSE".into(),
        })
        .unwrap();

        let trades = generate(ReportTemplate::TradeActivity, &b).unwrap();
        assert_eq!(
            trades.rows,
            vec![vec![
                "UCC001", "2025-01-15", "NSE", "EQ", "RELIANCE", "BUY", "100", "2920.00", "ORD1001",
                "TRD5001",
            ]]
        );

        let audit = generate(ReportTemplate::ComplianceAudit, &b).unwrap();
        assert_eq!(audit.rows[0][2], "2025-03-31");
        assert_eq!(audit.rows[0][4], "Pending");
    }

    #[test]
    fn test_save_report_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report {
            template: ReportTemplate::ClientSummary,
            headers: vec!["Name", "PAN", "Address", "Document Count", "Created Date"],
            rows: vec![vec![
                "Asha Rao".into(),
                "ABCDE1234F".into(),
                "12 Marine Drive, Mumbai".into(),
                "0".into(),
                "2025-01-15".into(),
            ]],
        };
        let path = save_report(&report, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("client-summary_report.csv"));
        let parsed = parse_file(&path);
        assert_eq!(parsed.row_count, 1);
        assert_eq!(parsed.rows[0].value("Address"), "12 Marine Drive, Mumbai");
        assert!(render_report(&report).unwrap().starts_with("Name,PAN,Address"));
    }
}
