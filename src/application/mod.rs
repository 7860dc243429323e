// Application layer: services over the repository, shared through AppContext.

pub mod auth;
pub mod budgets;
pub mod clock;
pub mod context;
pub mod error;
pub mod notify;
pub mod reporting;
pub mod savings;
pub mod seed;
pub mod transactions;

pub use auth::{AuthService, PasswordHashing};
pub use budgets::BudgetAggregator;
pub use clock::*;
pub use context::AppContext;
pub use error::*;
pub use notify::*;
pub use reporting::{CategoryBreakdown, ReportAggregator};
pub use savings::SavingsService;
pub use seed::{SeedReport, seed_demo_data};
pub use transactions::TransactionService;
