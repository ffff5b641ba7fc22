//! ---
//! insight_section: "02-access-control"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Role model, credential hashing, and authorization decisions."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Privilege tier assigned to every principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including user and system administration.
    Admin,
    /// Dashboard access with report generation and export.
    Analyst,
    /// Read-only dashboard access. Also the fallback for unknown principals.
    Viewer,
}

impl Role {
    /// Every role, highest privilege first.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Analyst, Role::Viewer];

    /// Stable lowercase name used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Analyst => "analyst",
            Role::Viewer => "viewer",
        }
    }

    fn index(self) -> usize {
        match self {
            Role::Admin => 0,
            Role::Analyst => 1,
            Role::Viewer => 2,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "analyst" => Ok(Role::Analyst),
            "viewer" => Ok(Role::Viewer),
            other => Err(RbacError::UnknownRole(other.to_owned())),
        }
    }
}

/// Permission enumerates actions that can be gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Open the feedback dashboard.
    ViewDashboard,
    /// Read previously generated reports.
    ViewReports,
    /// Use the basic dashboard filters.
    BasicFilters,
    /// Use advanced dashboard filters.
    AdvancedFilters,
    /// Generate new reports from the feedback corpus.
    GenerateReports,
    /// Export raw or aggregated data.
    ExportData,
    /// Read data assigned to the principal.
    ViewAssignedData,
    /// Read every data set.
    ViewAllData,
    /// Manage user accounts and credentials.
    ManageUsers,
    /// Change system configuration.
    SystemConfig,
}

impl Permission {
    /// Every permission in declaration order.
    pub const ALL: [Permission; 10] = [
        Permission::ViewDashboard,
        Permission::ViewReports,
        Permission::BasicFilters,
        Permission::AdvancedFilters,
        Permission::GenerateReports,
        Permission::ExportData,
        Permission::ViewAssignedData,
        Permission::ViewAllData,
        Permission::ManageUsers,
        Permission::SystemConfig,
    ];

    /// Stable snake_case name used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewDashboard => "view_dashboard",
            Permission::ViewReports => "view_reports",
            Permission::BasicFilters => "basic_filters",
            Permission::AdvancedFilters => "advanced_filters",
            Permission::GenerateReports => "generate_reports",
            Permission::ExportData => "export_data",
            Permission::ViewAssignedData => "view_assigned_data",
            Permission::ViewAllData => "view_all_data",
            Permission::ManageUsers => "manage_users",
            Permission::SystemConfig => "system_config",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Permission::ALL
            .into_iter()
            .find(|permission| permission.as_str() == wanted)
            .ok_or(RbacError::UnknownPermission(wanted))
    }
}

/// Errors occurring while building a permission catalog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RbacError {
    /// Role name not part of the closed role set.
    #[error("role not found: {0}")]
    UnknownRole(String),
    /// Permission name not part of the closed permission set.
    #[error("permission not found: {0}")]
    UnknownPermission(String),
    /// A grant table omitted a role.
    #[error("no permissions declared for role {0}")]
    MissingRole(Role),
    /// A role lacks the baseline dashboard permission.
    #[error("role {0} must include view_dashboard")]
    MissingBaseline(Role),
    /// Admin must hold every permission granted to any other role.
    #[error("admin lacks {permission} granted to {role}")]
    AdminNotSuperset {
        /// Role holding the permission.
        role: Role,
        /// Permission admin is missing.
        permission: Permission,
    },
}

/// Immutable mapping from role to granted permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCatalog {
    grants: [BTreeSet<Permission>; 3],
}

impl Default for PermissionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl PermissionCatalog {
    /// Built-in catalog. Analyst works on data and reports but does not
    /// inherit the viewer's read-only report and filter grants.
    pub fn standard() -> Self {
        let viewer = BTreeSet::from([
            Permission::ViewDashboard,
            Permission::ViewReports,
            Permission::BasicFilters,
        ]);
        let analyst = BTreeSet::from([
            Permission::ViewDashboard,
            Permission::GenerateReports,
            Permission::ExportData,
            Permission::AdvancedFilters,
            Permission::ViewAssignedData,
        ]);
        let admin = Permission::ALL.into_iter().collect();
        Self {
            grants: [admin, analyst, viewer],
        }
    }

    /// Build a catalog from explicit grants, enforcing the role invariants.
    pub fn from_grants<I>(grants: I) -> Result<Self, RbacError>
    where
        I: IntoIterator<Item = (Role, BTreeSet<Permission>)>,
    {
        let mut slots: [Option<BTreeSet<Permission>>; 3] = [None, None, None];
        for (role, permissions) in grants {
            slots[role.index()]
                .get_or_insert_with(BTreeSet::new)
                .extend(permissions);
        }
        let [admin, analyst, viewer] = slots;
        let catalog = Self {
            grants: [
                admin.ok_or(RbacError::MissingRole(Role::Admin))?,
                analyst.ok_or(RbacError::MissingRole(Role::Analyst))?,
                viewer.ok_or(RbacError::MissingRole(Role::Viewer))?,
            ],
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Build a catalog from role and permission names as found in configuration.
    pub fn from_names<I, R, P, S>(grants: I) -> Result<Self, RbacError>
    where
        I: IntoIterator<Item = (R, P)>,
        R: AsRef<str>,
        P: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Vec::new();
        for (role, permissions) in grants {
            let role = role.as_ref().parse::<Role>()?;
            let permissions = permissions
                .into_iter()
                .map(|name| name.as_ref().parse::<Permission>())
                .collect::<Result<BTreeSet<_>, _>>()?;
            parsed.push((role, permissions));
        }
        Self::from_grants(parsed)
    }

    fn validate(&self) -> Result<(), RbacError> {
        for role in Role::ALL {
            if !self.allows(role, Permission::ViewDashboard) {
                return Err(RbacError::MissingBaseline(role));
            }
        }
        let admin = self.permissions_of(Role::Admin);
        for role in [Role::Analyst, Role::Viewer] {
            if let Some(permission) = self.permissions_of(role).difference(admin).next() {
                return Err(RbacError::AdminNotSuperset {
                    role,
                    permission: *permission,
                });
            }
        }
        Ok(())
    }

    /// Permissions granted to `role`. Total over the closed role set.
    pub fn permissions_of(&self, role: Role) -> &BTreeSet<Permission> {
        &self.grants[role.index()]
    }

    /// Every role with its grant set, highest privilege first.
    pub fn roles(&self) -> impl Iterator<Item = (Role, &BTreeSet<Permission>)> + '_ {
        Role::ALL
            .into_iter()
            .map(move |role| (role, self.permissions_of(role)))
    }

    /// Whether `role` holds `permission`.
    pub fn allows(&self, role: Role, permission: Permission) -> bool {
        self.permissions_of(role).contains(&permission)
    }
}
