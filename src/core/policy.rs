//! Capability policy - who may do what.
//!
//! Every core entry point receives an [`Actor`] and checks the one capability it needs
//! before touching the database. Roles map to capability sets here and nowhere else.

use crate::{
    entities::{customer, employee_permission},
    errors::{Error, Result},
    models::UserRole,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single permission checked by core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewCustomers,
    CreateCustomers,
    EditCustomers,
    DeleteCustomers,
    ViewServers,
    ManageServers,
    EditBalance,
    ViewReports,
    SendMessages,
    ViewTransactions,
    /// Create operators, change permissions, move reseller credit, edit the catalog
    ManageUsers,
    /// Trigger the auto-deduction sweep
    RunSweep,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::ViewCustomers,
        Self::CreateCustomers,
        Self::EditCustomers,
        Self::DeleteCustomers,
        Self::ViewServers,
        Self::ManageServers,
        Self::EditBalance,
        Self::ViewReports,
        Self::SendMessages,
        Self::ViewTransactions,
        Self::ManageUsers,
        Self::RunSweep,
    ];

    /// Snake-case name, matching the employee permission column names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ViewCustomers => "view_customers",
            Self::CreateCustomers => "create_customers",
            Self::EditCustomers => "edit_customers",
            Self::DeleteCustomers => "delete_customers",
            Self::ViewServers => "view_servers",
            Self::ManageServers => "manage_servers",
            Self::EditBalance => "edit_balance",
            Self::ViewReports => "view_reports",
            Self::SendMessages => "send_messages",
            Self::ViewTransactions => "view_transactions",
            Self::ManageUsers => "manage_users",
            Self::RunSweep => "run_sweep",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|cap| cap.as_str() == wanted)
            .ok_or_else(|| Error::Validation {
                message: format!("unknown permission '{s}'"),
            })
    }
}

/// The ten per-employee permission flags.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeePermissions {
    pub view_customers: bool,
    pub create_customers: bool,
    pub edit_customers: bool,
    pub delete_customers: bool,
    pub view_servers: bool,
    pub manage_servers: bool,
    pub edit_balance: bool,
    pub view_reports: bool,
    pub send_messages: bool,
    pub view_transactions: bool,
}

impl Default for EmployeePermissions {
    /// New employees may only look at customers.
    fn default() -> Self {
        Self {
            view_customers: true,
            create_customers: false,
            edit_customers: false,
            delete_customers: false,
            view_servers: false,
            manage_servers: false,
            edit_balance: false,
            view_reports: false,
            send_messages: false,
            view_transactions: false,
        }
    }
}

impl EmployeePermissions {
    /// Sets the flag backing `capability`.
    ///
    /// Admin-only capabilities cannot be granted to employees.
    pub fn set(&mut self, capability: Capability, enabled: bool) -> Result<()> {
        let flag = match capability {
            Capability::ViewCustomers => &mut self.view_customers,
            Capability::CreateCustomers => &mut self.create_customers,
            Capability::EditCustomers => &mut self.edit_customers,
            Capability::DeleteCustomers => &mut self.delete_customers,
            Capability::ViewServers => &mut self.view_servers,
            Capability::ManageServers => &mut self.manage_servers,
            Capability::EditBalance => &mut self.edit_balance,
            Capability::ViewReports => &mut self.view_reports,
            Capability::SendMessages => &mut self.send_messages,
            Capability::ViewTransactions => &mut self.view_transactions,
            Capability::ManageUsers | Capability::RunSweep => {
                return Err(Error::Validation {
                    message: format!("'{capability}' cannot be granted to employees"),
                });
            }
        };
        *flag = enabled;
        Ok(())
    }
}

impl From<&employee_permission::Model> for EmployeePermissions {
    fn from(row: &employee_permission::Model) -> Self {
        Self {
            view_customers: row.view_customers,
            create_customers: row.create_customers,
            edit_customers: row.edit_customers,
            delete_customers: row.delete_customers,
            view_servers: row.view_servers,
            manage_servers: row.manage_servers,
            edit_balance: row.edit_balance,
            view_reports: row.view_reports,
            send_messages: row.send_messages,
            view_transactions: row.view_transactions,
        }
    }
}

/// A set of capabilities granted to an actor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// Every capability (admin).
    #[must_use]
    pub fn all() -> Self {
        Self(Capability::ALL.into_iter().collect())
    }

    /// Capabilities of an employee with the given flags.
    #[must_use]
    pub fn for_employee(permissions: &EmployeePermissions) -> Self {
        let flags = [
            (Capability::ViewCustomers, permissions.view_customers),
            (Capability::CreateCustomers, permissions.create_customers),
            (Capability::EditCustomers, permissions.edit_customers),
            (Capability::DeleteCustomers, permissions.delete_customers),
            (Capability::ViewServers, permissions.view_servers),
            (Capability::ManageServers, permissions.manage_servers),
            (Capability::EditBalance, permissions.edit_balance),
            (Capability::ViewReports, permissions.view_reports),
            (Capability::SendMessages, permissions.send_messages),
            (Capability::ViewTransactions, permissions.view_transactions),
        ];
        Self(
            flags
                .into_iter()
                .filter_map(|(cap, granted)| granted.then_some(cap))
                .collect(),
        )
    }

    /// Capabilities of a reseller. Balance edits are reserved for staff.
    #[must_use]
    pub fn reseller() -> Self {
        [
            Capability::ViewCustomers,
            Capability::CreateCustomers,
            Capability::ViewTransactions,
            Capability::ViewReports,
        ]
        .into_iter()
        .collect()
    }

    /// Capabilities of the scheduler.
    #[must_use]
    pub fn system() -> Self {
        [
            Capability::ViewCustomers,
            Capability::EditBalance,
            Capability::SendMessages,
            Capability::ViewTransactions,
            Capability::RunSweep,
        ]
        .into_iter()
        .collect()
    }

    #[must_use]
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The identity an operation runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Operator account id; `None` for the scheduler
    pub user_id: Option<i64>,
    /// Name written to ledger entries and messages
    pub username: String,
    pub role: UserRole,
    capabilities: CapabilitySet,
}

impl Actor {
    #[must_use]
    pub const fn new(
        user_id: Option<i64>,
        username: String,
        role: UserRole,
        capabilities: CapabilitySet,
    ) -> Self {
        Self {
            user_id,
            username,
            role,
            capabilities,
        }
    }

    /// The admin account with every capability.
    #[must_use]
    pub fn admin(user_id: i64, username: &str) -> Self {
        Self::new(
            Some(user_id),
            username.to_string(),
            UserRole::Admin,
            CapabilitySet::all(),
        )
    }

    /// The scheduler identity used by automatic sweeps.
    #[must_use]
    pub fn system() -> Self {
        Self::new(
            None,
            "system".to_string(),
            UserRole::System,
            CapabilitySet::system(),
        )
    }

    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Fails with `PermissionDenied` unless the actor holds `capability`.
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.can(capability) {
            Ok(())
        } else {
            tracing::debug!(actor = %self.username, %capability, "permission denied");
            Err(Error::PermissionDenied { capability })
        }
    }

    #[must_use]
    pub const fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Creator id customers must match for this actor to see them, if scoped.
    #[must_use]
    pub const fn customer_scope(&self) -> Option<i64> {
        match self.role {
            UserRole::Reseller => self.user_id,
            UserRole::Admin | UserRole::Employee | UserRole::System => None,
        }
    }

    /// Whether the customer falls inside this actor's scope.
    #[must_use]
    pub fn can_access_customer(&self, customer: &customer::Model) -> bool {
        self.customer_scope()
            .is_none_or(|creator| customer.created_by == creator)
    }
}
