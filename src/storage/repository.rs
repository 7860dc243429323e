use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Budget, BudgetId, BudgetPeriod, BudgetScope, Cents, ResetToken, SavingsGoal, SortDirection,
    SortField, Transaction, TransactionFilter, TransactionId, TransactionKind, TransactionSort,
    User, UserId,
};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_BUDGETS, MIGRATION_003_SAVINGS};

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";
const TOKEN_COLUMNS: &str = "id, user_id, token_hash, issued_at, expires_at, consumed_at";
const TRANSACTION_COLUMNS: &str = "id, user_id, sequence, date, kind, category, description, amount_cents, created_at, updated_at";
const BUDGET_COLUMNS: &str =
    "id, user_id, category, period_start, period_end, limit_cents, created_at, updated_at";
const SAVINGS_COLUMNS: &str =
    "id, user_id, name, target_cents, current_cents, deadline, created_at, updated_at";

/// Repository for persisting and querying users, transactions, budgets,
/// reset tokens and savings goals.
///
/// Every query that touches user-owned rows is scoped by `user_id`.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run on every start.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_BUDGETS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        sqlx::query(MIGRATION_003_SAVINGS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 003")?;

        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // User operations
    // ========================

    /// Insert a user. Returns `false` if the username or email is taken.
    pub async fn insert_user(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(timestamp(user.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(err).context("Failed to save user"),
        }
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by username")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Emails are stored lower-cased; the caller passes a normalized address.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by email")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    pub async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update password")?;
        Ok(())
    }

    fn row_to_user(row: &SqliteRow) -> Result<User> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(User {
            id: Uuid::parse_str(&id_str).context("Invalid user ID")?,
            username: row.get("username"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
        })
    }

    // ========================
    // Reset token operations
    // ========================

    pub async fn save_reset_token(&self, token: &ResetToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO password_resets (id, user_id, token_hash, issued_at, expires_at, consumed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(token.id.to_string())
        .bind(token.user_id.to_string())
        .bind(&token.token_hash)
        .bind(timestamp(token.issued_at))
        .bind(timestamp(token.expires_at))
        .bind(token.consumed_at.map(timestamp))
        .execute(&self.pool)
        .await
        .context("Failed to save reset token")?;
        Ok(())
    }

    pub async fn get_reset_token_by_hash(&self, token_hash: &str) -> Result<Option<ResetToken>> {
        let row = sqlx::query(&format!(
            "SELECT {TOKEN_COLUMNS} FROM password_resets WHERE token_hash = ?"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch reset token")?;

        row.as_ref().map(Self::row_to_reset_token).transpose()
    }

    /// Remove a user's consumed or expired tokens. Returns how many were removed.
    pub async fn purge_stale_reset_tokens(&self, user_id: UserId, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM password_resets
            WHERE user_id = ? AND (consumed_at IS NOT NULL OR expires_at <= ?)
            "#,
        )
        .bind(user_id.to_string())
        .bind(timestamp(now))
        .execute(&self.pool)
        .await
        .context("Failed to purge reset tokens")?;
        Ok(result.rows_affected())
    }

    /// Mark a token consumed and store the owner's new password hash in one
    /// transaction.
    ///
    /// The consume is conditional on the token still being unused and
    /// unexpired at `now`; returns `false` (and changes nothing) otherwise.
    pub async fn consume_reset_token(
        &self,
        token_id: Uuid,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let consumed = sqlx::query(
            r#"
            UPDATE password_resets
            SET consumed_at = ?
            WHERE id = ? AND consumed_at IS NULL AND expires_at > ?
            RETURNING user_id
            "#,
        )
        .bind(timestamp(now))
        .bind(token_id.to_string())
        .bind(timestamp(now))
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to consume reset token")?;

        let Some(row) = consumed else {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(false);
        };
        let user_id: String = row.get("user_id");

        // Older reset mails stop working once any of them is used
        sqlx::query(
            "UPDATE password_resets SET consumed_at = ? WHERE user_id = ? AND consumed_at IS NULL",
        )
        .bind(timestamp(now))
        .bind(&user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to retire other reset tokens")?;

        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(new_password_hash)
            .bind(&user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update password")?;

        tx.commit().await.context("Failed to commit password reset")?;
        Ok(true)
    }

    fn row_to_reset_token(row: &SqliteRow) -> Result<ResetToken> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let issued_at_str: String = row.get("issued_at");
        let expires_at_str: String = row.get("expires_at");
        let consumed_at_str: Option<String> = row.get("consumed_at");

        Ok(ResetToken {
            id: Uuid::parse_str(&id_str).context("Invalid reset token ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            token_hash: row.get("token_hash"),
            issued_at: parse_timestamp(&issued_at_str).context("Invalid issued_at")?,
            expires_at: parse_timestamp(&expires_at_str).context("Invalid expires_at")?,
            consumed_at: consumed_at_str
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .context("Invalid consumed_at")?,
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Insert a transaction, assigning the next sequence number atomically.
    pub async fn insert_transaction(&self, transaction: &mut Transaction) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'transaction_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .context("Failed to get next sequence number")?;
        transaction.sequence = row.get("value");

        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, sequence, date, kind, category, description, amount_cents, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.user_id.to_string())
        .bind(transaction.sequence)
        .bind(transaction.date.to_string())
        .bind(transaction.kind.as_str())
        .bind(&transaction.category)
        .bind(&transaction.description)
        .bind(transaction.amount_cents)
        .bind(timestamp(transaction.created_at))
        .bind(timestamp(transaction.updated_at))
        .execute(&mut *tx)
        .await
        .context("Failed to save transaction")?;

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }

    /// Fetch a transaction only if it belongs to `user_id`.
    pub async fn get_transaction(
        &self,
        user_id: UserId,
        id: TransactionId,
    ) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ? AND user_id = ?"
        ))
        .bind(id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    /// List a user's transactions with optional filters and ordering.
    pub async fn list_transactions(
        &self,
        user_id: UserId,
        filter: &TransactionFilter,
        sort: TransactionSort,
    ) -> Result<Vec<Transaction>> {
        let mut query = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = ?");

        // Collect string bindings first so they live long enough
        let user_id_str = user_id.to_string();
        let from_str = filter.range.from.map(|d| d.to_string());
        let to_str = filter.range.to.map(|d| d.to_string());

        if from_str.is_some() {
            query.push_str(" AND date >= ?");
        }
        if to_str.is_some() {
            query.push_str(" AND date <= ?");
        }
        if filter.category.is_some() {
            query.push_str(" AND category = ?");
        }
        if filter.kind.is_some() {
            query.push_str(" AND kind = ?");
        }

        let direction = match sort.direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        let column = match sort.field {
            SortField::Date => "date",
            SortField::Amount => "amount_cents",
            SortField::Category => "category COLLATE NOCASE",
        };
        query.push_str(&format!(
            " ORDER BY {column} {direction}, sequence {direction}"
        ));

        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }

        let mut sql_query = sqlx::query(&query).bind(&user_id_str);
        if let Some(ref from) = from_str {
            sql_query = sql_query.bind(from);
        }
        if let Some(ref to) = to_str {
            sql_query = sql_query.bind(to);
        }
        if let Some(ref category) = filter.category {
            sql_query = sql_query.bind(category);
        }
        if let Some(kind) = filter.kind {
            sql_query = sql_query.bind(kind.as_str());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Persist edited fields. Returns `false` if the row is gone or not owned.
    pub async fn update_transaction(&self, transaction: &Transaction) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET date = ?, kind = ?, category = ?, description = ?, amount_cents = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(transaction.date.to_string())
        .bind(transaction.kind.as_str())
        .bind(&transaction.category)
        .bind(&transaction.description)
        .bind(transaction.amount_cents)
        .bind(timestamp(transaction.updated_at))
        .bind(transaction.id.to_string())
        .bind(transaction.user_id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update transaction")?;

        Ok(result.rows_affected() == 1)
    }

    /// Returns `false` if nothing owned by `user_id` matched.
    pub async fn delete_transaction(&self, user_id: UserId, id: TransactionId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete transaction")?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_all_transactions(&self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM transactions WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete transactions")?;
        Ok(result.rows_affected())
    }

    /// Net of income minus expense for entries dated strictly before `date`.
    pub async fn net_before(&self, user_id: UserId, date: NaiveDate) -> Result<Cents> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(CASE WHEN kind = 'income' THEN amount_cents ELSE -amount_cents END), 0) AS net
            FROM transactions
            WHERE user_id = ? AND date < ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(date.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute opening balance")?;

        Ok(row.get("net"))
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let date_str: String = row.get("date");
        let kind_str: String = row.get("kind");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            sequence: row.get("sequence"),
            date: parse_date(&date_str)?,
            kind: kind_str
                .parse::<TransactionKind>()
                .map_err(|e| anyhow::anyhow!(e))?,
            category: row.get("category"),
            description: row.get("description"),
            amount_cents: row.get("amount_cents"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
            updated_at: parse_timestamp(&updated_at_str).context("Invalid updated_at")?,
        })
    }

    // ========================
    // Budget operations
    // ========================

    /// Insert a budget unless one already exists for the same scope and period.
    /// Returns `false` on a duplicate.
    pub async fn insert_budget(&self, budget: &Budget) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let exists: bool = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM budgets
                WHERE user_id = ? AND COALESCE(category, '') = ? AND period_start = ? AND period_end = ?
            ) AS found
            "#,
        )
        .bind(budget.user_id.to_string())
        .bind(budget.scope.category().unwrap_or(""))
        .bind(budget.period.start.to_string())
        .bind(budget.period.end.to_string())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to check for duplicate budget")?
        .get("found");

        if exists {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO budgets (id, user_id, category, period_start, period_end, limit_cents, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(budget.id.to_string())
        .bind(budget.user_id.to_string())
        .bind(budget.scope.category())
        .bind(budget.period.start.to_string())
        .bind(budget.period.end.to_string())
        .bind(budget.limit_cents)
        .bind(timestamp(budget.created_at))
        .bind(timestamp(budget.updated_at))
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {
                tx.commit().await.context("Failed to commit budget")?;
                Ok(true)
            }
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(err).context("Failed to save budget"),
        }
    }

    pub async fn get_budget(&self, user_id: UserId, id: BudgetId) -> Result<Option<Budget>> {
        let row = sqlx::query(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = ? AND user_id = ?"
        ))
        .bind(id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch budget")?;

        row.as_ref().map(Self::row_to_budget).transpose()
    }

    /// All budgets for a user, latest period first.
    pub async fn list_budgets(&self, user_id: UserId) -> Result<Vec<Budget>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {BUDGET_COLUMNS} FROM budgets
            WHERE user_id = ?
            ORDER BY period_end DESC, period_start DESC, category IS NOT NULL, category
            "#
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list budgets")?;

        rows.iter().map(Self::row_to_budget).collect()
    }

    /// Budgets whose period is exactly `period`.
    pub async fn list_budgets_for_period(
        &self,
        user_id: UserId,
        period: BudgetPeriod,
    ) -> Result<Vec<Budget>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {BUDGET_COLUMNS} FROM budgets
            WHERE user_id = ? AND period_start = ? AND period_end = ?
            "#
        ))
        .bind(user_id.to_string())
        .bind(period.start.to_string())
        .bind(period.end.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list budgets for period")?;

        rows.iter().map(Self::row_to_budget).collect()
    }

    /// Budgets whose period contains `date`.
    pub async fn list_budgets_active_on(&self, user_id: UserId, date: NaiveDate) -> Result<Vec<Budget>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {BUDGET_COLUMNS} FROM budgets
            WHERE user_id = ? AND period_start <= ? AND period_end >= ?
            "#
        ))
        .bind(user_id.to_string())
        .bind(date.to_string())
        .bind(date.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list active budgets")?;

        rows.iter().map(Self::row_to_budget).collect()
    }

    /// Persist an edited budget. `Ok(None)` if the row is gone, `Ok(Some(false))`
    /// if the edit collides with another budget's scope and period.
    pub async fn update_budget(&self, budget: &Budget) -> Result<Option<bool>> {
        let result = sqlx::query(
            r#"
            UPDATE budgets
            SET category = ?, period_start = ?, period_end = ?, limit_cents = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(budget.scope.category())
        .bind(budget.period.start.to_string())
        .bind(budget.period.end.to_string())
        .bind(budget.limit_cents)
        .bind(timestamp(budget.updated_at))
        .bind(budget.id.to_string())
        .bind(budget.user_id.to_string())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(Some(true)),
            Ok(_) => Ok(None),
            Err(err) if is_unique_violation(&err) => Ok(Some(false)),
            Err(err) => Err(err).context("Failed to update budget"),
        }
    }

    pub async fn delete_budget(&self, user_id: UserId, id: BudgetId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM budgets WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete budget")?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_all_budgets(&self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM budgets WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete budgets")?;
        Ok(result.rows_affected())
    }

    fn row_to_budget(row: &SqliteRow) -> Result<Budget> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let category: Option<String> = row.get("category");
        let start_str: String = row.get("period_start");
        let end_str: String = row.get("period_end");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Budget {
            id: Uuid::parse_str(&id_str).context("Invalid budget ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            scope: BudgetScope::from_category(category.as_deref()),
            period: BudgetPeriod::new(parse_date(&start_str)?, parse_date(&end_str)?),
            limit_cents: row.get("limit_cents"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
            updated_at: parse_timestamp(&updated_at_str).context("Invalid updated_at")?,
        })
    }

    // ========================
    // Savings goal operations
    // ========================

    pub async fn get_savings_goal(&self, user_id: UserId) -> Result<Option<SavingsGoal>> {
        let row = sqlx::query(&format!(
            "SELECT {SAVINGS_COLUMNS} FROM savings_goals WHERE user_id = ?"
        ))
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch savings goal")?;

        row.as_ref().map(Self::row_to_savings_goal).transpose()
    }

    /// Insert the goal, or keep the existing one if the user already has a goal.
    pub async fn insert_savings_goal(&self, goal: &SavingsGoal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO savings_goals (id, user_id, name, target_cents, current_cents, deadline, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(goal.id.to_string())
        .bind(goal.user_id.to_string())
        .bind(&goal.name)
        .bind(goal.target_cents)
        .bind(goal.current_cents)
        .bind(goal.deadline.map(|d| d.to_string()))
        .bind(timestamp(goal.created_at))
        .bind(timestamp(goal.updated_at))
        .execute(&self.pool)
        .await
        .context("Failed to save savings goal")?;
        Ok(())
    }

    pub async fn set_savings_target(
        &self,
        user_id: UserId,
        target_cents: Cents,
        deadline: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE savings_goals
            SET target_cents = ?, deadline = COALESCE(?, deadline), updated_at = ?
            WHERE user_id = ?
            "#,
        )
        .bind(target_cents)
        .bind(deadline.map(|d| d.to_string()))
        .bind(timestamp(now))
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to set savings target")?;
        Ok(())
    }

    /// Add to the saved amount in a single statement so concurrent
    /// contributions are not lost.
    pub async fn add_savings_contribution(
        &self,
        user_id: UserId,
        amount_cents: Cents,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE savings_goals
            SET current_cents = current_cents + ?, updated_at = ?
            WHERE user_id = ?
            "#,
        )
        .bind(amount_cents)
        .bind(timestamp(now))
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to add savings contribution")?;
        Ok(())
    }

    fn row_to_savings_goal(row: &SqliteRow) -> Result<SavingsGoal> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let deadline_str: Option<String> = row.get("deadline");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(SavingsGoal {
            id: Uuid::parse_str(&id_str).context("Invalid savings goal ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            name: row.get("name"),
            target_cents: row.get("target_cents"),
            current_cents: row.get("current_cents"),
            deadline: deadline_str.as_deref().map(parse_date).transpose()?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
            updated_at: parse_timestamp(&updated_at_str).context("Invalid updated_at")?,
        })
    }
}

/// Fixed-width UTC timestamps so stored values compare correctly as text.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp: {}", s))?
        .with_timezone(&Utc))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Invalid date: {}", s))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
