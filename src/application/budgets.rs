use chrono::NaiveDate;
use tracing::instrument;

use crate::domain::{
    Budget, BudgetId, BudgetPatch, BudgetPeriod, BudgetProgress, Cents, DateRange, NewBudget,
    TransactionFilter, TransactionKind, TransactionSort, UserId, budget_progress,
};

use super::transactions::validate_amount;
use super::{AppContext, AppError, TransactionService};

/// Budget bookkeeping and spend-vs-limit progress.
pub struct BudgetAggregator {
    ctx: AppContext,
    transactions: TransactionService,
}

impl BudgetAggregator {
    pub fn new(ctx: AppContext) -> Self {
        let transactions = TransactionService::new(ctx.clone());
        Self { ctx, transactions }
    }

    // ========================
    // Budget operations
    // ========================

    /// Create a budget. A second budget for the same scope and period is rejected.
    #[instrument(skip(self, input), fields(scope = %input.scope))]
    pub async fn create_budget(&self, user_id: UserId, input: NewBudget) -> Result<Budget, AppError> {
        validate_budget(&input.period, input.limit_cents)?;

        let budget = Budget::new(user_id, input, self.ctx.clock.now());
        if !self.ctx.repo.insert_budget(&budget).await? {
            return Err(duplicate_budget(&budget));
        }

        tracing::debug!(id = %budget.id, "created budget");
        Ok(budget)
    }

    pub async fn get_budget(&self, user_id: UserId, id: BudgetId) -> Result<Budget, AppError> {
        self.ctx
            .repo
            .get_budget(user_id, id)
            .await?
            .ok_or(AppError::NotFound("Budget"))
    }

    /// All of a user's budgets, newest period first.
    pub async fn list_budgets(&self, user_id: UserId) -> Result<Vec<Budget>, AppError> {
        Ok(self.ctx.repo.list_budgets(user_id).await?)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_budget(
        &self,
        user_id: UserId,
        id: BudgetId,
        patch: BudgetPatch,
    ) -> Result<Budget, AppError> {
        let mut budget = self.get_budget(user_id, id).await?;
        budget.apply(patch, self.ctx.clock.now());
        validate_budget(&budget.period, budget.limit_cents)?;

        match self.ctx.repo.update_budget(&budget).await? {
            Some(true) => Ok(budget),
            Some(false) => Err(duplicate_budget(&budget)),
            None => Err(AppError::NotFound("Budget")),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_budget(&self, user_id: UserId, id: BudgetId) -> Result<(), AppError> {
        if !self.ctx.repo.delete_budget(user_id, id).await? {
            return Err(AppError::NotFound("Budget"));
        }
        Ok(())
    }

    // ========================
    // Progress
    // ========================

    /// Progress for every budget whose period is exactly `period`.
    pub async fn compute(
        &self,
        user_id: UserId,
        period: BudgetPeriod,
    ) -> Result<Vec<BudgetProgress>, AppError> {
        if !period.is_valid() {
            return Err(AppError::validation(
                "Period end must be on or after its start.",
            ));
        }
        let budgets = self
            .ctx
            .repo
            .list_budgets_for_period(user_id, period)
            .await?;
        self.progress_for(user_id, budgets).await
    }

    /// Progress for every budget whose period contains `date`.
    pub async fn compute_active(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Vec<BudgetProgress>, AppError> {
        let budgets = self.ctx.repo.list_budgets_active_on(user_id, date).await?;
        self.progress_for(user_id, budgets).await
    }

    /// Overall first, then categories alphabetically.
    async fn progress_for(
        &self,
        user_id: UserId,
        mut budgets: Vec<Budget>,
    ) -> Result<Vec<BudgetProgress>, AppError> {
        if budgets.is_empty() {
            return Ok(Vec::new());
        }
        budgets.sort_by(|a, b| {
            a.scope
                .cmp(&b.scope)
                .then(a.period.start.cmp(&b.period.start))
        });

        // One query covering the union of the periods
        let filter = TransactionFilter {
            range: DateRange {
                from: budgets.iter().map(|b| b.period.start).min(),
                to: budgets.iter().map(|b| b.period.end).max(),
            },
            kind: Some(TransactionKind::Expense),
            ..TransactionFilter::default()
        };
        let expenses = self
            .transactions
            .list(user_id, &filter, TransactionSort::chronological())
            .await?;

        Ok(budgets
            .iter()
            .map(|budget| budget_progress(budget, &expenses))
            .collect())
    }
}

fn validate_budget(period: &BudgetPeriod, limit_cents: Cents) -> Result<(), AppError> {
    if limit_cents <= 0 {
        return Err(AppError::validation(
            "Budget limit must be greater than zero.",
        ));
    }
    validate_amount(limit_cents)?;
    if !period.is_valid() {
        return Err(AppError::validation(
            "Period end must be on or after its start.",
        ));
    }
    Ok(())
}

fn duplicate_budget(budget: &Budget) -> AppError {
    AppError::validation(format!(
        "A budget for {} from {} to {} already exists.",
        budget.scope, budget.period.start, budget.period.end
    ))
}
