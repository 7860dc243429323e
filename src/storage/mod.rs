mod repository;

pub use repository::*;

/// Users, reset tokens and transactions
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Budgets
pub const MIGRATION_002_BUDGETS: &str = include_str!("migrations/002_budgets.sql");

/// Savings goals
pub const MIGRATION_003_SAVINGS: &str = include_str!("migrations/003_savings_goals.sql");
