// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pocketbook::application::{AppContext, ManualClock, Notification, Notifier};
use pocketbook::config::{Config, HashingParams};
use pocketbook::domain::{Cents, NewTransaction, Transaction, TransactionKind, User};
use pocketbook::storage::Repository;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const PASSWORD: &str = "secret1";

/// Notifier that keeps everything it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// The code from the most recent reset notification.
    pub fn last_reset_code(&self) -> Option<String> {
        self.sent().iter().rev().find_map(|n| {
            n.body
                .lines()
                .find_map(|line| line.strip_prefix("Reset code: "))
                .map(|code| code.trim().to_string())
        })
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// A context over a fresh database with a manual clock and a recording notifier.
pub struct TestApp {
    pub ctx: AppContext,
    pub clock: Arc<ManualClock>,
    pub outbox: Arc<RecordingNotifier>,
}

/// Helper to create a test context with a temporary database
pub async fn test_app() -> Result<(TestApp, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let db_path = db_path.to_str().context("temp path is not UTF-8")?;

    let mut config = Config::default();
    config.database_path = db_path.to_string();
    // Cheap hashing keeps the suite fast
    config.auth.hashing = HashingParams {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    };
    config.notify.timeout = Duration::from_millis(500);

    let repo = Repository::init(&format!("sqlite:{}?mode=rwc", db_path)).await?;
    let clock = Arc::new(ManualClock::new(parse_timestamp("2024-03-15T12:00:00Z")));
    let outbox = Arc::new(RecordingNotifier::default());
    let ctx = AppContext::new(repo, clock.clone(), outbox.clone(), config);

    Ok((TestApp { ctx, clock, outbox }, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn parse_timestamp(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
}

/// Register `username` with email `<username>@example.com` and [`PASSWORD`].
pub async fn register(app: &TestApp, username: &str) -> Result<User> {
    Ok(app
        .ctx
        .auth()?
        .register(username, &format!("{}@example.com", username), PASSWORD)
        .await?)
}

pub async fn expense(
    app: &TestApp,
    user: &User,
    date: &str,
    category: &str,
    amount: Cents,
) -> Result<Transaction> {
    record(app, user, date, TransactionKind::Expense, category, amount).await
}

pub async fn income(app: &TestApp, user: &User, date: &str, amount: Cents) -> Result<Transaction> {
    record(app, user, date, TransactionKind::Income, "Salary", amount).await
}

pub async fn record(
    app: &TestApp,
    user: &User,
    date: &str,
    kind: TransactionKind,
    category: &str,
    amount: Cents,
) -> Result<Transaction> {
    Ok(app
        .ctx
        .transactions()
        .create(
            user.id,
            NewTransaction {
                date: parse_date(date),
                kind,
                category: category.to_string(),
                description: format!("{} {}", kind, category),
                amount_cents: amount,
            },
        )
        .await?)
}
