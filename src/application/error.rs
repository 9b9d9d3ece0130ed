use thiserror::Error;

use crate::domain::{Cents, UserId};

use super::ConversionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds for user {user_id}: balance {balance} cents, required {required} cents")]
    InsufficientFunds {
        user_id: UserId,
        balance: Cents,
        required: Cents,
    },

    #[error("Account not found: {0}")]
    AccountNotFound(UserId),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(UserId),

    #[error("Could not convert balance to currency: {currency}")]
    ConversionUnavailable {
        currency: String,
        #[source]
        source: ConversionError,
    },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    pub fn negative_amount(amount: Cents) -> Self {
        AppError::InvalidAmount(format!("negative amount ({amount} cents)"))
    }
}
