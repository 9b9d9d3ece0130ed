// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use saldo::application::{CurrencyConverter, FixedRates, LedgerService};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database and no rates
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    test_service_with_rates(FixedRates::new()).await
}

/// Helper to create a test service converting through the given rates
pub async fn test_service_with_rates(
    rates: impl CurrencyConverter + 'static,
) -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap(), Arc::new(rates), "RUB").await?;
    Ok((service, temp_dir))
}

/// Balance of a user in cents, panicking if the account does not exist
pub async fn balance_of(service: &LedgerService, user_id: i64) -> i64 {
    service.get_balance(user_id).await.unwrap().balance
}

/// Number of ledger entries a user is party to
pub async fn entry_count(service: &LedgerService, user_id: i64) -> usize {
    service.list_transactions(user_id, "").await.unwrap().len()
}

/// Test fixture: account 1 funded with 100.00
pub async fn funded_account(service: &LedgerService) -> Result<()> {
    service.deposit(1, 10000).await?;
    Ok(())
}
