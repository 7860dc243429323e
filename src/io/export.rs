use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::AppContext;
use crate::domain::{
    Budget, SavingsGoal, Transaction, TransactionFilter, TransactionSort, UserId, format_cents,
};

/// Everything one user owns, for a JSON backup.
#[derive(Debug, Clone, Serialize)]
pub struct UserSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub username: String,
    pub transactions: Vec<Transaction>,
    pub budgets: Vec<Budget>,
    pub savings_goal: Option<SavingsGoal>,
}

/// Writes a user's data out in portable formats.
pub struct Exporter<'a> {
    ctx: &'a AppContext,
}

impl<'a> Exporter<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Export matching transactions to CSV, oldest first. Returns the row count.
    pub async fn transactions_csv<W: Write>(
        &self,
        user_id: UserId,
        filter: &TransactionFilter,
        writer: W,
    ) -> Result<usize> {
        let transactions = self
            .ctx
            .transactions()
            .list(user_id, filter, TransactionSort::chronological())
            .await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "date",
            "kind",
            "category",
            "description",
            "amount",
        ])?;

        for tx in &transactions {
            csv_writer.write_record([
                tx.id.to_string(),
                tx.date.to_string(),
                tx.kind.as_str().to_string(),
                tx.category.clone(),
                tx.description.clone(),
                format_cents(tx.amount_cents),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Export the user's transactions, budgets and savings goal as JSON.
    pub async fn user_json<W: Write>(&self, user_id: UserId, mut writer: W) -> Result<UserSnapshot> {
        let user = self.ctx.auth()?.get_user(user_id).await?;
        let transactions = self
            .ctx
            .transactions()
            .list(
                user_id,
                &TransactionFilter::default(),
                TransactionSort::chronological(),
            )
            .await?;
        let budgets = self.ctx.budgets().list_budgets(user_id).await?;
        let savings_goal = self.ctx.repo.get_savings_goal(user_id).await?;

        let snapshot = UserSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: self.ctx.clock.now(),
            username: user.username,
            transactions,
            budgets,
            savings_goal,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
