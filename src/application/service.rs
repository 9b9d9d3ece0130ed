use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{Account, AccountBalance, Cents, LedgerEntry, SortKey, UserId};
use crate::storage::Repository;

use super::{AppError, ConversionError, CurrencyConverter};

/// Application service providing the balance and history use cases.
/// This is the interface the HTTP layer (or any other client) talks to.
pub struct LedgerService {
    repo: Repository,
    converter: Arc<dyn CurrencyConverter>,
    base_currency: String,
}

impl LedgerService {
    /// Create a new ledger service with the given repository and rate source.
    pub fn new(
        repo: Repository,
        converter: Arc<dyn CurrencyConverter>,
        base_currency: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            converter,
            base_currency: base_currency.into().to_uppercase(),
        }
    }

    /// Initialize a database at the given path (created if missing).
    pub async fn init(
        database_path: &str,
        converter: Arc<dyn CurrencyConverter>,
        base_currency: impl Into<String>,
    ) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo, converter, base_currency))
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    // ========================
    // Balance queries
    // ========================

    /// Get the stored balance of a user.
    pub async fn get_balance(&self, user_id: UserId) -> Result<Account, AppError> {
        self.repo
            .get_account(user_id)
            .await?
            .ok_or(AppError::AccountNotFound(user_id))
    }

    /// Get a user's balance, converted for display when `currency` names
    /// something other than the base currency.
    pub async fn get_balance_in_currency(
        &self,
        user_id: UserId,
        currency: &str,
    ) -> Result<AccountBalance, AppError> {
        let account = self.get_balance(user_id).await?;

        let currency = currency.trim();
        if currency.is_empty() || currency.eq_ignore_ascii_case(&self.base_currency) {
            return Ok(AccountBalance::in_base(&account));
        }

        let factor = self
            .converter
            .rate(currency)
            .await
            .and_then(|factor| {
                if factor.is_finite() && factor > 0.0 {
                    Ok(factor)
                } else {
                    Err(ConversionError::Unavailable(currency.to_string()))
                }
            })
            .map_err(|source| {
                warn!(user_id, currency, error = %source, "currency conversion failed");
                AppError::ConversionUnavailable {
                    currency: currency.to_string(),
                    source,
                }
            })?;

        Ok(AccountBalance::converted(&account, factor))
    }

    // ========================
    // Ledger mutations
    // ========================

    /// Open an empty account explicitly.
    pub async fn create_account(&self, user_id: UserId) -> Result<Account, AppError> {
        let account = self.repo.create_account(user_id).await?;
        info!(user_id, "account opened");
        Ok(account)
    }

    /// Add money to a user's balance, opening the account on first deposit.
    pub async fn deposit(&self, user_id: UserId, amount: Cents) -> Result<LedgerEntry, AppError> {
        let entry = self.repo.deposit(user_id, amount).await?;
        info!(user_id, amount, entry_id = entry.id, "deposit recorded");
        Ok(entry)
    }

    /// Take money from a user's balance.
    pub async fn withdraw(&self, user_id: UserId, amount: Cents) -> Result<LedgerEntry, AppError> {
        let entry = self.repo.withdraw(user_id, amount).await?;
        info!(user_id, amount, entry_id = entry.id, "withdrawal recorded");
        Ok(entry)
    }

    /// Move money from one user to another.
    pub async fn transfer(
        &self,
        from_id: UserId,
        to_id: UserId,
        amount: Cents,
    ) -> Result<LedgerEntry, AppError> {
        let entry = self.repo.transfer(from_id, to_id, amount).await?;
        info!(from_id, to_id, amount, entry_id = entry.id, "transfer recorded");
        Ok(entry)
    }

    // ========================
    // Transaction history
    // ========================

    /// List a user's ledger entries ordered by `order_by`
    /// (`"date"`, `"money"`, anything else keeps insertion order).
    pub async fn list_transactions(
        &self,
        user_id: UserId,
        order_by: &str,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        Ok(self
            .repo
            .list_entries(user_id, SortKey::parse(order_by))
            .await?)
    }
}
