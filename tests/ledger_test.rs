mod common;

use anyhow::Result;
use common::{balance_of, entry_count, funded_account, test_service};
use saldo::application::AppError;
use saldo::domain::EntryKind;

// ========================
// Deposits
// ========================

#[tokio::test]
async fn test_deposit_creates_account() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(matches!(
        service.get_balance(1).await,
        Err(AppError::AccountNotFound(1))
    ));

    let entry = service.deposit(1, 5530).await?;

    assert_eq!(balance_of(&service, 1).await, 5530);
    assert_eq!(entry.kind(), EntryKind::Deposit);
    assert_eq!(entry.to_id, Some(1));
    assert_eq!(entry.from_id, None);
    assert_eq!(entry.amount_cents, 5530);

    Ok(())
}

#[tokio::test]
async fn test_deposit_increases_balance_and_appends_one_entry() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service).await?;

    service.deposit(1, 2550).await?;

    assert_eq!(balance_of(&service, 1).await, 12550);
    let entries = service.list_transactions(1, "").await?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].to_id, Some(1));
    assert_eq!(entries[1].amount_cents, 2550);

    Ok(())
}

#[tokio::test]
async fn test_zero_deposit_is_allowed() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service.deposit(4, 0).await?;

    assert_eq!(balance_of(&service, 4).await, 0);
    assert_eq!(entry_count(&service, 4).await, 1);

    Ok(())
}

#[tokio::test]
async fn test_negative_deposit_rejected_without_changes() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service).await?;

    let result = service.deposit(1, -100).await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));

    // Unknown users are not created by a rejected deposit either
    let result = service.deposit(2, -1).await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));

    assert_eq!(balance_of(&service, 1).await, 10000);
    assert_eq!(entry_count(&service, 1).await, 1);
    assert!(service.get_balance(2).await.is_err());

    Ok(())
}

// ========================
// Withdrawals
// ========================

#[tokio::test]
async fn test_withdraw_debits_and_records_entry() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service).await?;

    let entry = service.withdraw(1, 2500).await?;

    assert_eq!(balance_of(&service, 1).await, 7500);
    assert_eq!(entry.kind(), EntryKind::Withdrawal);
    assert_eq!(entry.from_id, Some(1));
    assert_eq!(entry.to_id, None);
    assert_eq!(entry.amount_cents, 2500);
    assert_eq!(entry_count(&service, 1).await, 2);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_entire_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service).await?;

    service.withdraw(1, 10000).await?;

    assert_eq!(balance_of(&service, 1).await, 0);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_insufficient_funds() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service).await?;

    let result = service.withdraw(1, 15000).await;

    match result {
        Err(AppError::InsufficientFunds {
            user_id,
            balance,
            required,
        }) => {
            assert_eq!(user_id, 1);
            assert_eq!(balance, 10000);
            assert_eq!(required, 15000);
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }

    assert_eq!(balance_of(&service, 1).await, 10000);
    assert_eq!(entry_count(&service, 1).await, 1);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_unknown_account() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service.withdraw(42, 0).await;
    assert!(matches!(result, Err(AppError::AccountNotFound(42))));

    // Withdrawal never opens an account
    assert!(service.get_balance(42).await.is_err());
    assert_eq!(entry_count(&service, 42).await, 0);

    Ok(())
}

#[tokio::test]
async fn test_negative_withdrawal_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service).await?;

    let result = service.withdraw(1, -223).await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    assert_eq!(balance_of(&service, 1).await, 10000);

    Ok(())
}

// ========================
// Transfers
// ========================

#[tokio::test]
async fn test_transfer_scenario() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service).await?;

    assert!(service.withdraw(1, 15000).await.is_err());
    assert_eq!(balance_of(&service, 1).await, 10000);

    let entry = service.transfer(1, 2, 4000).await?;

    assert_eq!(balance_of(&service, 1).await, 6000);
    assert_eq!(balance_of(&service, 2).await, 4000);
    assert_eq!(entry.kind(), EntryKind::Transfer);
    assert_eq!(entry.from_id, Some(1));
    assert_eq!(entry.to_id, Some(2));
    assert_eq!(entry.amount_cents, 4000);

    // Exactly one entry for the transfer, visible to both parties
    let history_2 = service.list_transactions(2, "").await?;
    assert_eq!(history_2, vec![entry.clone()]);
    let history_1 = service.list_transactions(1, "").await?;
    assert_eq!(history_1.len(), 2);
    assert_eq!(history_1[1], entry);

    Ok(())
}

#[tokio::test]
async fn test_transfer_round_trip_restores_balances() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.deposit(1, 10000).await?;
    service.deposit(2, 2500).await?;

    service.transfer(1, 2, 3333).await?;
    service.transfer(2, 1, 3333).await?;

    assert_eq!(balance_of(&service, 1).await, 10000);
    assert_eq!(balance_of(&service, 2).await, 2500);

    Ok(())
}

#[tokio::test]
async fn test_transfer_insufficient_funds_leaves_both_sides_untouched() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service).await?;

    let result = service.transfer(1, 2, 10001).await;
    assert!(matches!(result, Err(AppError::InsufficientFunds { .. })));

    assert_eq!(balance_of(&service, 1).await, 10000);
    // Destination must not have been opened by the failed transfer
    assert!(matches!(
        service.get_balance(2).await,
        Err(AppError::AccountNotFound(2))
    ));
    assert_eq!(entry_count(&service, 1).await, 1);
    assert_eq!(entry_count(&service, 2).await, 0);

    Ok(())
}

#[tokio::test]
async fn test_failed_credit_rolls_back_debit() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service).await?;
    let nearly_full = i64::MAX - 50;
    service.deposit(2, nearly_full).await?;

    // The debit of account 1 succeeds, then crediting account 2 overflows
    let result = service.transfer(1, 2, 100).await;
    assert!(matches!(result, Err(AppError::Database(_))));

    assert_eq!(balance_of(&service, 1).await, 10000);
    assert_eq!(balance_of(&service, 2).await, nearly_full);
    assert_eq!(entry_count(&service, 1).await, 1);
    assert_eq!(entry_count(&service, 2).await, 1);

    Ok(())
}

#[tokio::test]
async fn test_transfer_from_unknown_account() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service).await?;

    let result = service.transfer(9, 1, 100).await;
    assert!(matches!(result, Err(AppError::AccountNotFound(9))));
    assert_eq!(balance_of(&service, 1).await, 10000);

    Ok(())
}

#[tokio::test]
async fn test_negative_transfer_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.deposit(1, 10000).await?;
    service.deposit(2, 10000).await?;

    let result = service.transfer(1, 2, -500).await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    assert_eq!(balance_of(&service, 1).await, 10000);
    assert_eq!(balance_of(&service, 2).await, 10000);

    Ok(())
}

#[tokio::test]
async fn test_transfer_to_self_nets_to_zero() -> Result<()> {
    let (service, _temp) = test_service().await?;
    funded_account(&service).await?;

    let entry = service.transfer(1, 1, 5000).await?;

    assert_eq!(balance_of(&service, 1).await, 10000);
    assert_eq!(entry.signed_amount_for(1), 0);
    assert!(service.transfer(1, 1, 10001).await.is_err());

    Ok(())
}

// ========================
// Explicit account creation
// ========================

#[tokio::test]
async fn test_create_account() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = service.create_account(5).await?;
    assert_eq!(account.id, 5);
    assert_eq!(account.balance, 0);
    assert_eq!(service.get_balance(5).await?.balance, 0);

    let duplicate = service.create_account(5).await;
    assert!(matches!(duplicate, Err(AppError::AccountAlreadyExists(5))));

    Ok(())
}

#[tokio::test]
async fn test_create_account_conflicts_with_deposit_opened_account() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.deposit(6, 100).await?;

    assert!(matches!(
        service.create_account(6).await,
        Err(AppError::AccountAlreadyExists(6))
    ));
    assert_eq!(balance_of(&service, 6).await, 100);

    Ok(())
}

#[tokio::test]
async fn test_balances_match_ledger_replay() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.deposit(1, 10000).await?;
    service.deposit(2, 500).await?;
    service.transfer(1, 2, 1234).await?;
    service.withdraw(2, 700).await?;
    service.transfer(2, 3, 34).await?;
    let _ = service.withdraw(3, 100).await;

    for user_id in [1, 2, 3] {
        let replayed: i64 = service
            .list_transactions(user_id, "")
            .await?
            .iter()
            .map(|entry| entry.signed_amount_for(user_id))
            .sum();
        assert_eq!(replayed, balance_of(&service, user_id).await);
    }

    Ok(())
}
