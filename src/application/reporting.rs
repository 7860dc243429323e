use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{
    BalancePoint, Cents, DateRange, MonthlyNet, Totals, Transaction, TransactionFilter,
    TransactionSort, UserId, category_totals, monthly_net, running_balance, totals,
};

use super::{AppContext, AppError, TransactionService};

/// Expense totals per category for a range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryBreakdown {
    pub totals: BTreeMap<String, Cents>,
    /// Sum of every category's expenses
    pub total: Cents,
}

impl CategoryBreakdown {
    pub fn from_totals(totals: BTreeMap<String, Cents>) -> Self {
        let total = totals.values().sum();
        Self { totals, total }
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Percentage of the total spent in `category`.
    pub fn share(&self, category: &str) -> f64 {
        match self.totals.get(category) {
            Some(amount) if self.total > 0 => *amount as f64 / self.total as f64 * 100.0,
            _ => 0.0,
        }
    }

    /// Categories ordered by amount, largest first; ties by name.
    pub fn largest_first(&self) -> Vec<(&str, Cents)> {
        let mut entries: Vec<(&str, Cents)> = self
            .totals
            .iter()
            .map(|(category, amount)| (category.as_str(), *amount))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        entries
    }
}

/// Read-only reports over a user's transactions.
pub struct ReportAggregator {
    ctx: AppContext,
    transactions: TransactionService,
}

impl ReportAggregator {
    pub fn new(ctx: AppContext) -> Self {
        let transactions = TransactionService::new(ctx.clone());
        Self { ctx, transactions }
    }

    pub async fn category_breakdown(
        &self,
        user_id: UserId,
        range: DateRange,
    ) -> Result<CategoryBreakdown, AppError> {
        let transactions = self.fetch(user_id, range).await?;
        Ok(CategoryBreakdown::from_totals(category_totals(&transactions)))
    }

    pub async fn monthly_net(
        &self,
        user_id: UserId,
        range: DateRange,
    ) -> Result<Vec<MonthlyNet>, AppError> {
        let transactions = self.fetch(user_id, range).await?;
        Ok(monthly_net(&transactions, range))
    }

    /// Balance after each transaction in `range`.
    ///
    /// Without an explicit `opening`, the balance starts from everything
    /// recorded before the range begins.
    pub async fn running_balance(
        &self,
        user_id: UserId,
        range: DateRange,
        opening: Option<Cents>,
    ) -> Result<Vec<BalancePoint>, AppError> {
        let opening = match (opening, range.from) {
            (Some(opening), _) => opening,
            (None, Some(from)) => self.ctx.repo.net_before(user_id, from).await?,
            (None, None) => 0,
        };
        let transactions = self.fetch(user_id, range).await?;
        Ok(running_balance(&transactions, opening))
    }

    pub async fn summary(&self, user_id: UserId, range: DateRange) -> Result<Totals, AppError> {
        let transactions = self.fetch(user_id, range).await?;
        Ok(totals(&transactions))
    }

    async fn fetch(&self, user_id: UserId, range: DateRange) -> Result<Vec<Transaction>, AppError> {
        self.transactions
            .list(
                user_id,
                &TransactionFilter::in_range(range),
                TransactionSort::chronological(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_shares() {
        let breakdown = CategoryBreakdown::from_totals(BTreeMap::from([
            ("Food".to_string(), 300),
            ("Rent".to_string(), 700),
        ]));
        assert_eq!(breakdown.total, 1000);
        assert!((breakdown.share("Rent") - 70.0).abs() < f64::EPSILON);
        assert_eq!(breakdown.share("Travel"), 0.0);
        assert_eq!(breakdown.largest_first(), vec![("Rent", 700), ("Food", 300)]);
    }

    #[test]
    fn test_empty_breakdown() {
        let breakdown = CategoryBreakdown::default();
        assert!(breakdown.is_empty());
        assert_eq!(breakdown.share("Food"), 0.0);
    }
}
