//! User accounts, roles and capabilities.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Account role.
///
/// Role decides which organizations are visible and who may create whom; the
/// actions a user can take come from their capability set, not the role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    /// Sees all organizations, creates sub-admins
    SuperAdmin,
    /// Scoped to one organization, creates users within it
    SubAdmin,
    /// Regular staff account
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::SubAdmin => "sub_admin",
            Role::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "super_admin" => Some(Role::SuperAdmin),
            "sub_admin" => Some(Role::SubAdmin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

/// One grantable capability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    RegisterPatient,
    CorrectDemographics,
    RunConsultation,
    CancelVisit,
    EnterLabResults,
    ManageVaccination,
    ViewVisits,
    AccessBilling,
    ProcessSales,
    ViewSales,
    ViewInventory,
    AddInventory,
    EditInventory,
    DeleteInventory,
    ManageCatalog,
    ViewFinancialReports,
    ViewStatReports,
    ViewDashboard,
    ManageUsers,
    ManageSettings,
    ExportData,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 21] = [
        Capability::RegisterPatient,
        Capability::CorrectDemographics,
        Capability::RunConsultation,
        Capability::CancelVisit,
        Capability::EnterLabResults,
        Capability::ManageVaccination,
        Capability::ViewVisits,
        Capability::AccessBilling,
        Capability::ProcessSales,
        Capability::ViewSales,
        Capability::ViewInventory,
        Capability::AddInventory,
        Capability::EditInventory,
        Capability::DeleteInventory,
        Capability::ManageCatalog,
        Capability::ViewFinancialReports,
        Capability::ViewStatReports,
        Capability::ViewDashboard,
        Capability::ManageUsers,
        Capability::ManageSettings,
        Capability::ExportData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::RegisterPatient => "register_patient",
            Capability::CorrectDemographics => "correct_demographics",
            Capability::RunConsultation => "run_consultation",
            Capability::CancelVisit => "cancel_visit",
            Capability::EnterLabResults => "enter_lab_results",
            Capability::ManageVaccination => "manage_vaccination",
            Capability::ViewVisits => "view_visits",
            Capability::AccessBilling => "access_billing",
            Capability::ProcessSales => "process_sales",
            Capability::ViewSales => "view_sales",
            Capability::ViewInventory => "view_inventory",
            Capability::AddInventory => "add_inventory",
            Capability::EditInventory => "edit_inventory",
            Capability::DeleteInventory => "delete_inventory",
            Capability::ManageCatalog => "manage_catalog",
            Capability::ViewFinancialReports => "view_financial_reports",
            Capability::ViewStatReports => "view_stat_reports",
            Capability::ViewDashboard => "view_dashboard",
            Capability::ManageUsers => "manage_users",
            Capability::ManageSettings => "manage_settings",
            Capability::ExportData => "export_data",
        }
    }

    pub fn parse(s: &str) -> Option<Capability> {
        Capability::ALL.into_iter().find(|cap| cap.as_str() == s)
    }
}

/// A set of capabilities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PermissionSet(BTreeSet<Capability>);

impl PermissionSet {
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn all() -> Self {
        Self(Capability::ALL.into_iter().collect())
    }

    /// Defaults granted by a role before per-user overrides.
    ///
    /// Regular users start permissive except for the financial and
    /// administrative capabilities, which must be granted explicitly.
    pub fn defaults_for(role: Role) -> Self {
        match role {
            Role::SuperAdmin | Role::SubAdmin => Self::all(),
            Role::User => {
                let mut set = Self::all();
                for cap in [
                    Capability::ViewFinancialReports,
                    Capability::ManageUsers,
                    Capability::ManageSettings,
                    Capability::DeleteInventory,
                    Capability::ExportData,
                ] {
                    set.0.remove(&cap);
                }
                set
            }
        }
    }

    pub fn contains(&self, cap: Capability) -> bool {
        self.0.contains(&cap)
    }

    pub fn grant(&mut self, cap: Capability) {
        self.0.insert(cap);
    }

    pub fn revoke(&mut self, cap: Capability) {
        self.0.remove(&cap);
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A staff account.
///
/// Capabilities are stored as overrides on top of the role defaults, so a
/// policy change to the defaults reaches existing accounts without rewriting
/// their rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    /// "salt$hex" salted digest, never the clear text
    pub password_hash: String,
    pub role: Role,
    pub org_id: String,
    /// Capabilities granted beyond the role defaults
    pub granted: Vec<Capability>,
    /// Capabilities withheld from the role defaults
    pub revoked: Vec<Capability>,
    pub display_name: Option<String>,
    pub contact: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Create a new account with role-default permissions.
    pub fn new(username: String, password_hash: String, role: Role, org_id: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            password_hash,
            role,
            org_id,
            granted: Vec::new(),
            revoked: Vec::new(),
            display_name: None,
            contact: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Role defaults plus grants, minus revocations.
    pub fn effective_permissions(&self) -> PermissionSet {
        let mut set = PermissionSet::defaults_for(self.role);
        for cap in &self.granted {
            set.grant(*cap);
        }
        for cap in &self.revoked {
            set.revoke(*cap);
        }
        set
    }
}

/// Organization context a session operates in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrgScope {
    /// Cross-organization view; every create/mutate path refuses it
    All,
    /// One concrete organization
    Org(String),
}

impl OrgScope {
    pub fn is_all(&self) -> bool {
        matches!(self, OrgScope::All)
    }

    /// The single organization id, when unambiguous.
    pub fn org_id(&self) -> Option<&str> {
        match self {
            OrgScope::All => None,
            OrgScope::Org(id) => Some(id),
        }
    }
}

impl std::fmt::Display for OrgScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrgScope::All => write!(f, "ALL"),
            OrgScope::Org(id) => write!(f, "{}", id),
        }
    }
}
