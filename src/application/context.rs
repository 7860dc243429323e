use std::sync::{Arc, OnceLock};

use crate::config::Config;
use crate::storage::Repository;

use super::{
    AppError, AuthService, BudgetAggregator, Clock, LogNotifier, Notifier, PasswordHashing,
    ReportAggregator, SavingsService, SystemClock, TransactionService, WebhookNotifier,
};

/// Everything the services share: storage, time, outbound delivery and
/// settings. Built once at startup and handed to each service.
#[derive(Clone)]
pub struct AppContext {
    pub repo: Repository,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Config,
    hashing: Arc<OnceLock<PasswordHashing>>,
}

impl AppContext {
    pub fn new(
        repo: Repository,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        config: Config,
    ) -> Self {
        Self {
            repo,
            clock,
            notifier,
            config,
            hashing: Arc::new(OnceLock::new()),
        }
    }

    /// Open (creating if needed) the configured database, apply migrations
    /// and pick the notifier the configuration asks for.
    pub async fn open(config: Config) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", config.database_path);
        let repo = Repository::init(&db_url).await?;

        let notifier: Arc<dyn Notifier> = match &config.notify.webhook_url {
            Some(url) => {
                tracing::info!(%url, "delivering notifications via webhook");
                Arc::new(WebhookNotifier::new(url.clone(), config.notify.timeout)?)
            }
            None => {
                tracing::info!("no notification transport configured, logging notifications");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self::new(repo, Arc::new(SystemClock), notifier, config))
    }

    /// The hasher is set up on first use and shared by every clone of the
    /// context afterwards.
    pub fn auth(&self) -> Result<AuthService, AppError> {
        let hashing = match self.hashing.get() {
            Some(hashing) => hashing.clone(),
            None => {
                let built = PasswordHashing::new(self.config.auth.hashing)?;
                self.hashing.get_or_init(|| built).clone()
            }
        };
        Ok(AuthService::new(self.clone(), hashing))
    }

    pub fn transactions(&self) -> TransactionService {
        TransactionService::new(self.clone())
    }

    pub fn budgets(&self) -> BudgetAggregator {
        BudgetAggregator::new(self.clone())
    }

    pub fn reports(&self) -> ReportAggregator {
        ReportAggregator::new(self.clone())
    }

    pub fn savings(&self) -> SavingsService {
        SavingsService::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashingParams;
    use sqlx::SqlitePool;

    fn cheap_context() -> AppContext {
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let mut config = Config::default();
        config.auth.hashing = HashingParams {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        };
        AppContext::new(
            Repository::new(pool),
            Arc::new(SystemClock),
            Arc::new(LogNotifier),
            config,
        )
    }

    #[tokio::test]
    async fn test_password_hashing_is_built_once() {
        let ctx = cheap_context();
        let other = ctx.clone();
        assert!(ctx.hashing.get().is_none());

        // Building through one clone fills the cache for all of them
        other.auth().unwrap();
        let first = ctx.hashing.get().cloned().unwrap();

        ctx.auth().unwrap();
        let second = ctx.hashing.get().cloned().unwrap();
        assert_eq!(first.dummy_hash(), second.dummy_hash());
    }

    #[tokio::test]
    async fn test_invalid_hashing_params_are_reported() {
        let mut ctx = cheap_context();
        ctx.config.auth.hashing.memory_kib = 0;
        assert!(ctx.auth().is_err());
    }
}
