//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod customer;
pub mod customer_message;
pub mod employee_permission;
pub mod mikrotik_server;
pub mod onu_status;
pub mod package;
pub mod reseller_transaction;
pub mod system_state;
pub mod transaction;
pub mod user;

// Re-export specific types to avoid conflicts
pub use customer::{Column as CustomerColumn, Entity as Customer, Model as CustomerModel};
pub use customer_message::{
    Column as CustomerMessageColumn, Entity as CustomerMessage, Model as CustomerMessageModel,
};
pub use employee_permission::{
    Column as EmployeePermissionColumn, Entity as EmployeePermission,
    Model as EmployeePermissionModel,
};
pub use mikrotik_server::{
    Column as MikrotikServerColumn, Entity as MikrotikServer, Model as MikrotikServerModel,
};
pub use onu_status::{Column as OnuStatusColumn, Entity as OnuStatus, Model as OnuStatusModel};
pub use package::{Column as PackageColumn, Entity as Package, Model as PackageModel};
pub use reseller_transaction::{
    Column as ResellerTransactionColumn, Entity as ResellerTransaction,
    Model as ResellerTransactionModel,
};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
