use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, cents_to_units};

/// Opaque user identifier supplied by callers.
pub type UserId = i64;

/// A user's balance, stored in cents of the base currency.
/// Accounts are opened implicitly by the first incoming movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    /// Never negative in any committed state
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            balance: 0,
            created_at: Utc::now(),
        }
    }
}

/// Balance as shown to callers, possibly converted to another currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub id: UserId,
    pub balance: f64,
}

impl AccountBalance {
    /// Balance in base-currency units, unconverted.
    pub fn in_base(account: &Account) -> Self {
        Self {
            id: account.id,
            balance: cents_to_units(account.balance),
        }
    }

    /// Balance expressed in a currency worth `factor` base units.
    pub fn converted(account: &Account, factor: f64) -> Self {
        Self {
            id: account.id,
            balance: cents_to_units(account.balance) / factor,
        }
    }
}
