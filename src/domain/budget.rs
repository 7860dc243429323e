use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, Transaction, UserId, YearMonth};

pub type BudgetId = Uuid;

/// Percent values above this are clamped for display.
pub const MAX_DISPLAY_PERCENT: f64 = 999.0;

/// What a budget limits: all spending, or spending in one category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "scope", content = "category", rename_all = "lowercase")]
pub enum BudgetScope {
    Overall,
    Category(String),
}

impl BudgetScope {
    /// `None` or a blank name means overall.
    pub fn from_category(category: Option<&str>) -> Self {
        match category.map(str::trim) {
            Some(name) if !name.is_empty() => BudgetScope::Category(name.to_string()),
            _ => BudgetScope::Overall,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            BudgetScope::Overall => None,
            BudgetScope::Category(name) => Some(name),
        }
    }

    /// Whether a transaction counts against this scope.
    pub fn covers(&self, transaction: &Transaction) -> bool {
        match self {
            BudgetScope::Overall => true,
            BudgetScope::Category(name) => transaction.category == *name,
        }
    }
}

impl std::fmt::Display for BudgetScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetScope::Overall => write!(f, "overall"),
            BudgetScope::Category(name) => write!(f, "{}", name),
        }
    }
}

/// Inclusive date window a budget applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BudgetPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BudgetPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn month(month: YearMonth) -> Self {
        Self::new(month.first_day(), month.last_day())
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub user_id: UserId,
    pub scope: BudgetScope,
    pub period: BudgetPeriod,
    pub limit_cents: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(user_id: UserId, input: NewBudget, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            scope: input.scope,
            period: input.period,
            limit_cents: input.limit_cents,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: BudgetPatch, now: DateTime<Utc>) {
        if let Some(scope) = patch.scope {
            self.scope = scope;
        }
        if let Some(start) = patch.period_start {
            self.period.start = start;
        }
        if let Some(end) = patch.period_end {
            self.period.end = end;
        }
        if let Some(limit) = patch.limit_cents {
            self.limit_cents = limit;
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBudget {
    pub scope: BudgetScope,
    pub period: BudgetPeriod,
    pub limit_cents: Cents,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetPatch {
    pub scope: Option<BudgetScope>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub limit_cents: Option<Cents>,
}

/// Spending against one budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetProgress {
    pub budget: Budget,
    pub spent: Cents,
    /// `limit - spent`; negative once the budget is exceeded
    pub remaining: Cents,
    /// `spent / limit * 100`, unclamped
    pub percent: f64,
}

impl BudgetProgress {
    pub fn is_over_budget(&self) -> bool {
        self.spent > self.budget.limit_cents
    }

    pub fn display_percent(&self) -> f64 {
        self.percent.min(MAX_DISPLAY_PERCENT)
    }
}

/// Compute progress for `budget` from a set of transactions.
///
/// Only expenses dated inside the budget period and covered by its scope
/// count. Limits are positive by construction, so the percentage is
/// always defined.
pub fn budget_progress(budget: &Budget, transactions: &[Transaction]) -> BudgetProgress {
    let spent: Cents = transactions
        .iter()
        .filter(|t| t.is_expense() && budget.period.contains(t.date) && budget.scope.covers(t))
        .map(|t| t.amount_cents)
        .sum();

    let percent = if budget.limit_cents > 0 {
        spent as f64 / budget.limit_cents as f64 * 100.0
    } else {
        0.0
    };

    BudgetProgress {
        budget: budget.clone(),
        spent,
        remaining: budget.limit_cents - spent,
        percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewTransaction, TransactionKind};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tx(user: UserId, day: &str, kind: TransactionKind, category: &str, amount: Cents) -> Transaction {
        Transaction::new(
            user,
            NewTransaction {
                date: date(day),
                kind,
                category: category.to_string(),
                description: String::new(),
                amount_cents: amount,
            },
            Utc::now(),
        )
    }

    fn january_budget(user: UserId, scope: BudgetScope, limit: Cents) -> Budget {
        Budget::new(
            user,
            NewBudget {
                scope,
                period: BudgetPeriod::month(YearMonth::new(2024, 1).unwrap()),
                limit_cents: limit,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_category_overspend() {
        let user = Uuid::new_v4();
        let txs = vec![
            tx(user, "2024-01-03", TransactionKind::Expense, "Food", 70),
            tx(user, "2024-01-20", TransactionKind::Expense, "Food", 50),
        ];
        let budget = january_budget(user, BudgetScope::Category("Food".into()), 100);
        let progress = budget_progress(&budget, &txs);

        assert_eq!(progress.spent, 120);
        assert_eq!(progress.remaining, -20);
        assert!(progress.percent >= 100.0);
        assert!(progress.is_over_budget());
    }

    #[test]
    fn test_overall_ignores_income_and_other_periods() {
        let user = Uuid::new_v4();
        let txs = vec![
            tx(user, "2024-01-03", TransactionKind::Expense, "Food", 300),
            tx(user, "2024-01-04", TransactionKind::Expense, "Travel", 200),
            tx(user, "2024-01-05", TransactionKind::Income, "Salary", 5000),
            tx(user, "2024-02-01", TransactionKind::Expense, "Food", 999),
        ];
        let budget = january_budget(user, BudgetScope::Overall, 1000);
        let progress = budget_progress(&budget, &txs);

        assert_eq!(progress.spent, 500);
        assert_eq!(progress.remaining, 500);
        assert!((progress.percent - 50.0).abs() < f64::EPSILON);
        assert!(!progress.is_over_budget());
    }

    #[test]
    fn test_display_percent_is_clamped() {
        let user = Uuid::new_v4();
        let txs = vec![tx(user, "2024-01-03", TransactionKind::Expense, "Food", 5000)];
        let budget = january_budget(user, BudgetScope::Category("Food".into()), 100);
        let progress = budget_progress(&budget, &txs);

        assert!((progress.percent - 5000.0).abs() < f64::EPSILON);
        assert!((progress.display_percent() - MAX_DISPLAY_PERCENT).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scope_from_category() {
        assert_eq!(BudgetScope::from_category(None), BudgetScope::Overall);
        assert_eq!(BudgetScope::from_category(Some("  ")), BudgetScope::Overall);
        assert_eq!(
            BudgetScope::from_category(Some(" Food ")),
            BudgetScope::Category("Food".into())
        );
    }
}
