use tracing::instrument;

use crate::domain::{
    Cents, NewTransaction, Transaction, TransactionFilter, TransactionId, TransactionPatch,
    TransactionSort, UserId,
};

use super::{AppContext, AppError};

pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_CATEGORY_LEN: usize = 80;
/// One billion in the major unit.
pub const MAX_AMOUNT_CENTS: Cents = 100_000_000_000;

/// Per-user transaction bookkeeping.
///
/// Every operation takes the acting user's id and only ever sees that
/// user's rows; someone else's transaction id behaves as if it did not exist.
pub struct TransactionService {
    ctx: AppContext,
}

impl TransactionService {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, input), fields(kind = %input.kind))]
    pub async fn create(
        &self,
        user_id: UserId,
        input: NewTransaction,
    ) -> Result<Transaction, AppError> {
        validate_amount(input.amount_cents)?;
        validate_category(&input.category)?;
        validate_description(&input.description)?;

        let mut transaction = Transaction::new(user_id, input, self.ctx.clock.now());
        self.ctx.repo.insert_transaction(&mut transaction).await?;

        tracing::debug!(id = %transaction.id, sequence = transaction.sequence, "created transaction");
        Ok(transaction)
    }

    pub async fn get(&self, user_id: UserId, id: TransactionId) -> Result<Transaction, AppError> {
        self.ctx
            .repo
            .get_transaction(user_id, id)
            .await?
            .ok_or(AppError::NotFound("Transaction"))
    }

    /// Filtered listing. Sorting defaults to newest first.
    pub async fn list(
        &self,
        user_id: UserId,
        filter: &TransactionFilter,
        sort: TransactionSort,
    ) -> Result<Vec<Transaction>, AppError> {
        if let (Some(from), Some(to)) = (filter.range.from, filter.range.to) {
            if from > to {
                return Err(AppError::validation(
                    "Start date must be on or before end date.",
                ));
            }
        }
        Ok(self.ctx.repo.list_transactions(user_id, filter, sort).await?)
    }

    /// Apply a partial edit. An empty patch returns the transaction unchanged.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        user_id: UserId,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> Result<Transaction, AppError> {
        if let Some(amount) = patch.amount_cents {
            validate_amount(amount)?;
        }
        if let Some(category) = &patch.category {
            validate_category(category)?;
        }
        if let Some(description) = &patch.description {
            validate_description(description)?;
        }

        let mut transaction = self.get(user_id, id).await?;
        if patch.is_empty() {
            return Ok(transaction);
        }

        transaction.apply(patch, self.ctx.clock.now());
        if !self.ctx.repo.update_transaction(&transaction).await? {
            // Deleted between the read and the write
            return Err(AppError::NotFound("Transaction"));
        }

        tracing::debug!(id = %transaction.id, "updated transaction");
        Ok(transaction)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: UserId, id: TransactionId) -> Result<(), AppError> {
        if !self.ctx.repo.delete_transaction(user_id, id).await? {
            return Err(AppError::NotFound("Transaction"));
        }
        tracing::debug!("deleted transaction");
        Ok(())
    }
}

pub fn validate_amount(amount_cents: Cents) -> Result<(), AppError> {
    if amount_cents <= 0 {
        return Err(AppError::validation("Amount must be greater than zero."));
    }
    if amount_cents > MAX_AMOUNT_CENTS {
        return Err(AppError::validation("Amount is too large."));
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<(), AppError> {
    if category.trim().chars().count() > MAX_CATEGORY_LEN {
        return Err(AppError::validation(format!(
            "Category must be at most {} characters.",
            MAX_CATEGORY_LEN
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.trim().chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::validation(format!(
            "Description must be at most {} characters.",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(())
}
