use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, UserId};

pub type EntryId = i64;

/// An immutable audit record of one monetary movement.
///
/// The amount is always the positive magnitude of the movement; the
/// direction is carried by which side (`from_id`, `to_id`) is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Storage-assigned, increases with insertion order
    pub id: EntryId,
    /// Receiving user (deposits and transfers)
    pub to_id: Option<UserId>,
    /// Paying user (withdrawals and transfers)
    pub from_id: Option<UserId>,
    pub amount_cents: Cents,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Deposit => "deposit",
            EntryKind::Withdrawal => "withdrawal",
            EntryKind::Transfer => "transfer",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl LedgerEntry {
    pub fn kind(&self) -> EntryKind {
        match (self.from_id, self.to_id) {
            (Some(_), Some(_)) => EntryKind::Transfer,
            (Some(_), None) => EntryKind::Withdrawal,
            _ => EntryKind::Deposit,
        }
    }

    pub fn involves(&self, user_id: UserId) -> bool {
        self.to_id == Some(user_id) || self.from_id == Some(user_id)
    }

    /// Effect of this entry on the balance of `user_id`.
    /// A transfer to oneself nets to zero.
    pub fn signed_amount_for(&self, user_id: UserId) -> Cents {
        let mut delta = 0;
        if self.to_id == Some(user_id) {
            delta += self.amount_cents;
        }
        if self.from_id == Some(user_id) {
            delta -= self.amount_cents;
        }
        delta
    }
}

/// Ordering applied to a user's transaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Ascending by creation time
    Date,
    /// Ascending by amount
    Money,
    /// Storage-native insertion order
    #[default]
    Unordered,
}

impl SortKey {
    /// Parse a caller supplied ordering field.
    /// Unknown values fall back to insertion order instead of failing.
    pub fn parse(field: &str) -> Self {
        match field.trim().to_lowercase().as_str() {
            "date" => SortKey::Date,
            "money" => SortKey::Money,
            _ => SortKey::Unordered,
        }
    }
}
