use chrono::NaiveDate;
use tracing::instrument;

use crate::domain::{Cents, SavingsGoal, UserId};

use super::transactions::validate_amount;
use super::{AppContext, AppError};

/// One savings goal per user: a target, an optional deadline and the
/// amount put aside so far.
pub struct SavingsService {
    ctx: AppContext,
}

impl SavingsService {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// The user's goal, creating an empty one on first use.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<SavingsGoal, AppError> {
        if let Some(goal) = self.ctx.repo.get_savings_goal(user_id).await? {
            return Ok(goal);
        }

        self.ctx
            .repo
            .insert_savings_goal(&SavingsGoal::new(user_id, self.ctx.clock.now()))
            .await?;
        // Re-read: a concurrent caller may have created it first
        self.ctx
            .repo
            .get_savings_goal(user_id)
            .await?
            .ok_or(AppError::NotFound("Savings goal"))
    }

    /// Set the target. A `None` deadline keeps the current one.
    #[instrument(skip(self))]
    pub async fn set_target(
        &self,
        user_id: UserId,
        target_cents: Cents,
        deadline: Option<NaiveDate>,
    ) -> Result<SavingsGoal, AppError> {
        validate_amount(target_cents)?;
        self.get_or_create(user_id).await?;
        self.ctx
            .repo
            .set_savings_target(user_id, target_cents, deadline, self.ctx.clock.now())
            .await?;
        self.get_or_create(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn add_contribution(
        &self,
        user_id: UserId,
        amount_cents: Cents,
    ) -> Result<SavingsGoal, AppError> {
        validate_amount(amount_cents)?;
        self.get_or_create(user_id).await?;
        self.ctx
            .repo
            .add_savings_contribution(user_id, amount_cents, self.ctx.clock.now())
            .await?;

        let goal = self.get_or_create(user_id).await?;
        if goal.is_reached() {
            tracing::info!(user_id = %user_id, "savings goal reached");
        }
        Ok(goal)
    }

    /// Percentage of the target reached, capped for display.
    pub async fn progress(&self, user_id: UserId) -> Result<f64, AppError> {
        Ok(self.get_or_create(user_id).await?.percent())
    }
}
