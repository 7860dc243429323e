use chrono::{Duration, NaiveDate};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::domain::{
    BudgetPeriod, BudgetScope, NewBudget, NewTransaction, TransactionKind, User, YearMonth,
};

use super::{AppContext, AppError};

pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "demo123";

const SAMPLE_DAYS: i64 = 60;
const SAMPLE_START_DAYS_AGO: i64 = 90;
const SAMPLE_CATEGORIES: [&str; 6] = [
    "Food",
    "Housing",
    "Transportation",
    "Entertainment",
    "Utilities",
    "Travel",
];

/// What [`seed_demo_data`] did.
#[derive(Debug)]
pub struct SeedReport {
    pub user: User,
    pub created_user: bool,
    pub transactions: usize,
    pub budgets: usize,
}

/// Reset the demo account to a fresh set of sample data.
///
/// Creates the `demo` user if needed, wipes its transactions and budgets,
/// then adds one random transaction a day for 60 days starting 90 days
/// ago, plus an overall and a Food budget for the current month.
pub async fn seed_demo_data(ctx: &AppContext) -> Result<SeedReport, AppError> {
    let (user, created_user) = match ctx.repo.get_user_by_username(DEMO_USERNAME).await? {
        Some(user) => (user, false),
        None => {
            let user = ctx
                .auth()?
                .register(DEMO_USERNAME, DEMO_EMAIL, DEMO_PASSWORD)
                .await?;
            (user, true)
        }
    };

    let removed_transactions = ctx.repo.delete_all_transactions(user.id).await?;
    let removed_budgets = ctx.repo.delete_all_budgets(user.id).await?;
    tracing::debug!(removed_transactions, removed_budgets, "cleared demo data");

    let today = ctx.clock.today();
    let samples = sample_transactions(
        today - Duration::days(SAMPLE_START_DAYS_AGO),
        &mut rand::thread_rng(),
    );
    let transactions = ctx.transactions();
    for sample in &samples {
        transactions.create(user.id, sample.clone()).await?;
    }

    let period = BudgetPeriod::month(YearMonth::of(today));
    let budget_inputs = [
        NewBudget {
            scope: BudgetScope::Overall,
            period,
            limit_cents: 1500 * 100,
        },
        NewBudget {
            scope: BudgetScope::Category("Food".to_string()),
            period,
            limit_cents: 400 * 100,
        },
    ];
    let budgets = ctx.budgets();
    for input in &budget_inputs {
        budgets.create_budget(user.id, input.clone()).await?;
    }

    tracing::info!(
        user_id = %user.id,
        transactions = samples.len(),
        budgets = budget_inputs.len(),
        "seeded demo data"
    );

    Ok(SeedReport {
        user,
        created_user,
        transactions: samples.len(),
        budgets: budget_inputs.len(),
    })
}

/// One transaction per day from `start`. About a quarter are income.
fn sample_transactions(start: NaiveDate, rng: &mut impl Rng) -> Vec<NewTransaction> {
    (0..SAMPLE_DAYS)
        .map(|day| {
            let date = start + Duration::days(day);
            if rng.gen_bool(0.25) {
                NewTransaction {
                    date,
                    kind: TransactionKind::Income,
                    category: "Income".to_string(),
                    description: "Sample Income".to_string(),
                    amount_cents: rng.gen_range(500..=2000) * 100,
                }
            } else {
                let category = SAMPLE_CATEGORIES
                    .choose(rng)
                    .copied()
                    .unwrap_or(SAMPLE_CATEGORIES[0]);
                NewTransaction {
                    date,
                    kind: TransactionKind::Expense,
                    category: category.to_string(),
                    description: format!("Sample {}", category),
                    amount_cents: rng.gen_range(10..=200) * 100,
                }
            }
        })
        .collect()
}
