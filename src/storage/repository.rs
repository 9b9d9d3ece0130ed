use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::application::AppError;
use crate::domain::{Account, Cents, LedgerEntry, SortKey, UserId};

use super::MIGRATION_001_INITIAL;

/// How long a writer waits for SQLite's write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_CONNECTIONS: u32 = 8;

/// Ledger store: the only writer of balances and of the transaction log.
///
/// Every mutation runs as one SQLite transaction. Debits are conditional
/// updates (`balance >= amount`) issued as the first statement of the
/// transaction, so they take the database write lock before reading the
/// balance and concurrent debits cannot both pass the funds check.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to an existing SQLite database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::open(database_url, false).await
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        Ok(())
    }

    /// Initialize a database (create if missing + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::open(database_url, true).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    async fn open(database_url: &str, create: bool) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    // ========================
    // Account operations
    // ========================

    /// Get an account by user ID. Never creates it.
    pub async fn get_account(&self, user_id: UserId) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT id, balance, created_at FROM accounts WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// Open an account with a zero balance.
    pub async fn create_account(&self, user_id: UserId) -> Result<Account, AppError> {
        let account = Account {
            created_at: current_time(),
            ..Account::new(user_id)
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO accounts (id, balance, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(account.id)
        .bind(account.balance)
        .bind(format_timestamp(account.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to create account")?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::AccountAlreadyExists(user_id));
        }
        Ok(account)
    }

    // ========================
    // Ledger mutations
    // ========================

    /// Credit `amount` to a user, opening the account if needed.
    pub async fn deposit(&self, user_id: UserId, amount: Cents) -> Result<LedgerEntry, AppError> {
        ensure_non_negative(amount)?;
        let now = current_time();

        let mut tx = self.begin().await?;
        Self::credit(&mut tx, user_id, amount, now).await?;
        let entry = Self::append_entry(&mut tx, Some(user_id), None, amount, now).await?;
        tx.commit().await.context("Failed to commit deposit")?;

        Ok(entry)
    }

    /// Debit `amount` from an existing account.
    pub async fn withdraw(&self, user_id: UserId, amount: Cents) -> Result<LedgerEntry, AppError> {
        ensure_non_negative(amount)?;
        let now = current_time();

        // Dropping an uncommitted transaction rolls it back.
        let mut tx = self.begin().await?;
        Self::debit(&mut tx, user_id, amount).await?;
        let entry = Self::append_entry(&mut tx, None, Some(user_id), amount, now).await?;
        tx.commit().await.context("Failed to commit withdrawal")?;

        Ok(entry)
    }

    /// Move `amount` between two users. The destination is opened if needed.
    pub async fn transfer(
        &self,
        from_id: UserId,
        to_id: UserId,
        amount: Cents,
    ) -> Result<LedgerEntry, AppError> {
        ensure_non_negative(amount)?;
        let now = current_time();

        let mut tx = self.begin().await?;
        Self::debit(&mut tx, from_id, amount).await?;
        Self::credit(&mut tx, to_id, amount, now).await?;
        let entry = Self::append_entry(&mut tx, Some(to_id), Some(from_id), amount, now).await?;
        tx.commit().await.context("Failed to commit transfer")?;

        Ok(entry)
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .context("Failed to begin transaction")
    }

    async fn credit(
        tx: &mut Transaction<'_, Sqlite>,
        user_id: UserId,
        amount: Cents,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, balance, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET balance = balance + excluded.balance
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(format_timestamp(now))
        .execute(&mut **tx)
        .await
        .context("Failed to credit account")?;
        Ok(())
    }

    async fn debit(
        tx: &mut Transaction<'_, Sqlite>,
        user_id: UserId,
        amount: Cents,
    ) -> Result<(), AppError> {
        let debited = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance - ?
            WHERE id = ? AND balance >= ?
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .bind(amount)
        .execute(&mut **tx)
        .await
        .context("Failed to debit account")?;

        if debited.rows_affected() == 1 {
            return Ok(());
        }

        let balance: Option<Cents> = sqlx::query_scalar("SELECT balance FROM accounts WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await
            .context("Failed to read balance")?;

        Err(match balance {
            Some(balance) => AppError::InsufficientFunds {
                user_id,
                balance,
                required: amount,
            },
            None => AppError::AccountNotFound(user_id),
        })
    }

    async fn append_entry(
        tx: &mut Transaction<'_, Sqlite>,
        to_id: Option<UserId>,
        from_id: Option<UserId>,
        amount: Cents,
        created_at: DateTime<Utc>,
    ) -> Result<LedgerEntry> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (to_id, from_id, money, created)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(to_id)
        .bind(from_id)
        .bind(amount)
        .bind(format_timestamp(created_at))
        .fetch_one(&mut **tx)
        .await
        .context("Failed to write transaction")?;

        Ok(LedgerEntry {
            id: row.get("id"),
            to_id,
            from_id,
            amount_cents: amount,
            created_at,
        })
    }

    // ========================
    // Ledger queries
    // ========================

    /// List every entry where the user is either party.
    pub async fn list_entries(&self, user_id: UserId, sort: SortKey) -> Result<Vec<LedgerEntry>> {
        let query = match sort {
            SortKey::Date => {
                "SELECT id, to_id, from_id, money, created FROM transactions WHERE to_id = ? OR from_id = ? ORDER BY created, id"
            }
            SortKey::Money => {
                "SELECT id, to_id, from_id, money, created FROM transactions WHERE to_id = ? OR from_id = ? ORDER BY money, id"
            }
            SortKey::Unordered => {
                "SELECT id, to_id, from_id, money, created FROM transactions WHERE to_id = ? OR from_id = ? ORDER BY id"
            }
        };

        let rows = sqlx::query(query)
            .bind(user_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: row.get("id"),
            balance: row.get("balance"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }

    fn row_to_entry(row: &SqliteRow) -> Result<LedgerEntry> {
        let created_str: String = row.get("created");

        Ok(LedgerEntry {
            id: row.get("id"),
            to_id: row.get("to_id"),
            from_id: row.get("from_id"),
            amount_cents: row.get("money"),
            created_at: parse_timestamp(&created_str).context("Invalid created timestamp")?,
        })
    }
}

fn ensure_non_negative(amount: Cents) -> Result<(), AppError> {
    if amount < 0 {
        return Err(AppError::negative_amount(amount));
    }
    Ok(())
}

/// Timestamps are stored with microsecond precision; truncate up front so
/// returned values equal what a later read gives back.
fn current_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width UTC timestamps so that text order matches time order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
