use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, MAX_DISPLAY_PERCENT, UserId};

pub const DEFAULT_SAVINGS_GOAL_NAME: &str = "My Savings Goal";

/// A user's savings target and how much has been put aside so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: Uuid,
    pub user_id: UserId,
    pub name: String,
    pub target_cents: Cents,
    pub current_cents: Cents,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavingsGoal {
    /// An empty goal with no target.
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: DEFAULT_SAVINGS_GOAL_NAME.to_string(),
            target_cents: 0,
            current_cents: 0,
            deadline: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Share of the target reached, clamped for display. Zero without a target.
    pub fn percent(&self) -> f64 {
        if self.target_cents <= 0 {
            return 0.0;
        }
        (self.current_cents as f64 / self.target_cents as f64 * 100.0).min(MAX_DISPLAY_PERCENT)
    }

    pub fn is_reached(&self) -> bool {
        self.target_cents > 0 && self.current_cents >= self.target_cents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_without_target() {
        let goal = SavingsGoal::new(Uuid::new_v4(), Utc::now());
        assert_eq!(goal.percent(), 0.0);
        assert!(!goal.is_reached());
    }

    #[test]
    fn test_percent() {
        let mut goal = SavingsGoal::new(Uuid::new_v4(), Utc::now());
        goal.target_cents = 10000;
        goal.current_cents = 2500;
        assert!((goal.percent() - 25.0).abs() < f64::EPSILON);

        goal.current_cents = 10_000_000;
        assert!((goal.percent() - MAX_DISPLAY_PERCENT).abs() < f64::EPSILON);
        assert!(goal.is_reached());
    }
}
