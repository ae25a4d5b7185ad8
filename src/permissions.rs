use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BusinessRole {
    SuperAdmin,
    ComplianceHead,
    ComplianceOfficer,
    Accountant,
    OperationsManager,
    Dealer,
    ExternalAuditor,
}

impl BusinessRole {
    pub const ALL: [BusinessRole; 7] = [
        Self::SuperAdmin,
        Self::ComplianceHead,
        Self::ComplianceOfficer,
        Self::Accountant,
        Self::OperationsManager,
        Self::Dealer,
        Self::ExternalAuditor,
    ];

    /// Least privileged role; anything unrecognized resolves here.
    pub const MOST_RESTRICTIVE: BusinessRole = Self::Dealer;

    pub fn name(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super Admin",
            Self::ComplianceHead => "Compliance Head",
            Self::ComplianceOfficer => "Compliance Officer",
            Self::Accountant => "Accountant",
            Self::OperationsManager => "Operations Manager",
            Self::Dealer => "Dealer",
            Self::ExternalAuditor => "External Auditor",
        }
    }

    /// Exact role name, surrounding whitespace ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.iter().find(|r| r.name() == raw).copied()
    }

    /// Role for a user profile's extended role string.
    pub fn from_profile(extended_role: &str) -> Self {
        Self::parse(extended_role).unwrap_or(Self::MOST_RESTRICTIVE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    ViewDashboard,
    ViewTrades,
    CreateTrades,
    EditTrades,
    ViewClients,
    CreateClients,
    EditClients,
    ViewMargin,
    ManageMargin,
    ViewReconciliation,
    ManageReconciliation,
    ViewReports,
    GenerateReports,
    ExportReports,
    ScheduleReports,
    ViewCalendar,
    ManageCalendar,
    ViewSurveillance,
    ManageSurveillance,
    ViewAudit,
    ExportAudit,
    ManageConfig,
    ManageUsers,
}

impl Capability {
    pub const ALL: [Capability; 23] = [
        Self::ViewDashboard,
        Self::ViewTrades,
        Self::CreateTrades,
        Self::EditTrades,
        Self::ViewClients,
        Self::CreateClients,
        Self::EditClients,
        Self::ViewMargin,
        Self::ManageMargin,
        Self::ViewReconciliation,
        Self::ManageReconciliation,
        Self::ViewReports,
        Self::GenerateReports,
        Self::ExportReports,
        Self::ScheduleReports,
        Self::ViewCalendar,
        Self::ManageCalendar,
        Self::ViewSurveillance,
        Self::ManageSurveillance,
        Self::ViewAudit,
        Self::ExportAudit,
        Self::ManageConfig,
        Self::ManageUsers,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::ViewDashboard => "view_dashboard",
            Self::ViewTrades => "view_trades",
            Self::CreateTrades => "create_trades",
            Self::EditTrades => "edit_trades",
            Self::ViewClients => "view_clients",
            Self::CreateClients => "create_clients",
            Self::EditClients => "edit_clients",
            Self::ViewMargin => "view_margin",
            Self::ManageMargin => "manage_margin",
            Self::ViewReconciliation => "view_reconciliation",
            Self::ManageReconciliation => "manage_reconciliation",
            Self::ViewReports => "view_reports",
            Self::GenerateReports => "generate_reports",
            Self::ExportReports => "export_reports",
            Self::ScheduleReports => "schedule_reports",
            Self::ViewCalendar => "view_calendar",
            Self::ManageCalendar => "manage_calendar",
            Self::ViewSurveillance => "view_surveillance",
            Self::ManageSurveillance => "manage_surveillance",
            Self::ViewAudit => "view_audit",
            Self::ExportAudit => "export_audit",
            Self::ManageConfig => "manage_config",
            Self::ManageUsers => "manage_users",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.iter().find(|c| c.key() == key).copied()
    }
}

/// Navigation sections, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Dashboard,
    DataEntry,
    Clients,
    Margin,
    Reconciliation,
    Reports,
    Calendar,
    Surveillance,
    Audit,
    Config,
}

impl Module {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::DataEntry => "data-entry",
            Self::Clients => "clients",
            Self::Margin => "margin",
            Self::Reconciliation => "reconciliation",
            Self::Reports => "reports",
            Self::Calendar => "calendar",
            Self::Surveillance => "surveillance",
            Self::Audit => "audit",
            Self::Config => "config",
        }
    }
}

const MODULE_GATES: &[(Capability, Module)] = &[
    (Capability::ViewDashboard, Module::Dashboard),
    (Capability::ViewTrades, Module::DataEntry),
    (Capability::ViewClients, Module::Clients),
    (Capability::ViewMargin, Module::Margin),
    (Capability::ViewReconciliation, Module::Reconciliation),
    (Capability::ViewReports, Module::Reports),
    (Capability::ViewCalendar, Module::Calendar),
    (Capability::ViewSurveillance, Module::Surveillance),
    (Capability::ViewAudit, Module::Audit),
    (Capability::ManageConfig, Module::Config),
];

use Capability::*;

const COMPLIANCE_HEAD: &[Capability] = &[
    ViewDashboard, ViewTrades, CreateTrades, EditTrades, ViewClients, CreateClients,
    EditClients, ViewMargin, ViewReconciliation, ViewReports, GenerateReports,
    ExportReports, ScheduleReports, ViewCalendar, ManageCalendar, ViewSurveillance,
    ManageSurveillance, ViewAudit, ExportAudit,
];

const COMPLIANCE_OFFICER: &[Capability] = &[
    ViewDashboard, ViewTrades, CreateTrades, ViewClients, CreateClients, EditClients,
    ViewMargin, ViewReconciliation, ViewReports, GenerateReports, ExportReports,
    ViewCalendar, ManageCalendar, ViewSurveillance, ManageSurveillance,
];

const ACCOUNTANT: &[Capability] = &[
    ViewDashboard, ViewTrades, ViewClients, ViewMargin, ManageMargin, ViewReconciliation,
    ManageReconciliation, ViewReports, GenerateReports, ExportReports,
];

const OPERATIONS_MANAGER: &[Capability] = &[
    ViewDashboard, ViewTrades, CreateTrades, EditTrades, ViewClients, ViewMargin,
    ManageMargin, ViewReconciliation, ManageReconciliation, ViewReports, GenerateReports,
    ExportReports,
];

const DEALER: &[Capability] = &[ViewDashboard, ViewTrades, ViewClients, ViewMargin];

const EXTERNAL_AUDITOR: &[Capability] = &[
    ViewDashboard, ViewTrades, ViewClients, ViewMargin, ViewReconciliation, ViewReports,
    ExportReports, ViewCalendar, ViewSurveillance, ViewAudit, ExportAudit,
];

/// Static role → capability table. Build once with [`CapabilityMap::standard`]
/// and pass it to whoever needs it.
#[derive(Debug, Clone)]
pub struct CapabilityMap {
    grants: BTreeMap<BusinessRole, BTreeSet<Capability>>,
}

impl CapabilityMap {
    pub fn standard() -> Self {
        let mut grants = BTreeMap::new();
        for role in BusinessRole::ALL {
            let caps: &[Capability] = match role {
                BusinessRole::SuperAdmin => &Capability::ALL,
                BusinessRole::ComplianceHead => COMPLIANCE_HEAD,
                BusinessRole::ComplianceOfficer => COMPLIANCE_OFFICER,
                BusinessRole::Accountant => ACCOUNTANT,
                BusinessRole::OperationsManager => OPERATIONS_MANAGER,
                BusinessRole::Dealer => DEALER,
                BusinessRole::ExternalAuditor => EXTERNAL_AUDITOR,
            };
            grants.insert(role, caps.iter().copied().collect());
        }
        Self { grants }
    }

    pub fn has(&self, role: BusinessRole, capability: Capability) -> bool {
        self.grants
            .get(&role)
            .is_some_and(|caps| caps.contains(&capability))
    }

    /// String-level check. Unknown roles and unknown capabilities are denied.
    pub fn can(&self, role: &str, capability: &str) -> bool {
        match (BusinessRole::parse(role), Capability::parse(capability)) {
            (Some(role), Some(capability)) => self.has(role, capability),
            _ => false,
        }
    }

    pub fn capabilities(&self, role: BusinessRole) -> BTreeSet<Capability> {
        self.grants.get(&role).cloned().unwrap_or_default()
    }
}

/// A resolved role and its capability set, handed explicitly to anything
/// that gates an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permissions {
    role: BusinessRole,
    capabilities: BTreeSet<Capability>,
}

impl Permissions {
    pub fn for_role(map: &CapabilityMap, role: BusinessRole) -> Self {
        Self {
            role,
            capabilities: map.capabilities(role),
        }
    }

    pub fn resolve(map: &CapabilityMap, extended_role: &str) -> Self {
        Self::for_role(map, BusinessRole::from_profile(extended_role))
    }

    pub fn role(&self) -> BusinessRole {
        self.role
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.capabilities.iter().copied()
    }

    /// Recomputed on every call so a role change is never served stale.
    pub fn visible_modules(&self) -> Vec<Module> {
        MODULE_GATES
            .iter()
            .filter(|(cap, _)| self.can(*cap))
            .map(|(_, module)| *module)
            .collect()
    }
}
