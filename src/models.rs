//! Domain value types stored as text columns.
//!
//! Entities keep these fields as plain strings (the way SQLite sees them); the enums here
//! give the core a typed view with lossless conversion in both directions.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Text form as stored in the database.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(Error::Validation {
                        message: format!("unknown {} '{other}'", stringify!($name)),
                    }),
                }
            }
        }
    };
}

text_enum! {
    /// Operator account role.
    UserRole {
        /// Full access, created at bootstrap
        Admin => "admin",
        /// Access limited by per-employee permissions
        Employee => "employee",
        /// Sells connections from prepaid credit, sees only own customers
        Reseller => "reseller",
        /// Scheduler identity; never persisted
        System => "system",
    }
}

text_enum! {
    /// Customer service state, derived from the balance sign.
    CustomerStatus {
        /// Balance is positive
        Active => "active",
        /// Balance is zero or negative
        Inactive => "inactive",
        /// Legacy manual hold, read but never produced by the ledger
        Suspended => "suspended",
    }
}

impl CustomerStatus {
    /// Status implied by a balance: active iff the balance is strictly positive.
    #[must_use]
    pub fn from_balance(balance: f64) -> Self {
        if balance > 0.0 {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

text_enum! {
    /// Kind of a customer ledger entry.
    TransactionKind {
        /// Balance increase
        Recharge => "recharge",
        /// Daily package charge applied by the sweep
        Deduction => "deduction",
        /// Manual decrease or zero-delta correction
        Adjustment => "adjustment",
    }
}

impl TransactionKind {
    /// Classifies a manual balance change by the sign of its delta.
    #[must_use]
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Self::Recharge
        } else {
            Self::Adjustment
        }
    }
}

text_enum! {
    /// Kind of a reseller credit ledger entry.
    ResellerTransactionKind {
        /// Credit bought from the admin
        CreditPurchase => "credit_purchase",
        /// Credit spent on a customer's initial balance
        CustomerCreation => "customer_creation",
        /// Credit returned by the admin
        Refund => "refund",
    }
}

text_enum! {
    /// Kind of a customer notification.
    MessageKind {
        /// Free-form operator message
        General => "general",
        /// Low balance warning
        BillAlert => "bill_alert",
        /// PPPoE login details
        Credentials => "credentials",
        /// Service cut due to balance
        Suspension => "suspension",
    }
}

text_enum! {
    /// Reachability of a router server.
    ServerStatus {
        /// Last ping succeeded
        Online => "online",
        /// Never checked or last ping failed
        Offline => "offline",
    }
}

text_enum! {
    /// Optical unit link state.
    OnuState {
        /// Link up with usable signal
        Online => "online",
        /// No response from the unit
        Offline => "offline",
        /// Loss of signal
        Los => "los",
        /// Unit reported power loss
        DyingGasp => "dying_gasp",
    }
}

text_enum! {
    /// Received optical power bucket.
    SignalQuality {
        /// rx >= -20 dBm
        Excellent => "excellent",
        /// rx >= -23 dBm
        Good => "good",
        /// rx >= -27 dBm
        Fair => "fair",
        /// rx >= -30 dBm
        Poor => "poor",
        /// anything weaker
        Critical => "critical",
    }
}
