use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::{Cents, DateRange, UserId};

pub type TransactionId = Uuid;

/// Category used when the user leaves the field blank.
pub const DEFAULT_CATEGORY: &str = "Other";

/// Categories offered by front-ends. Transactions may still use any name.
pub const DEFAULT_CATEGORIES: [&str; 11] = [
    "Housing",
    "Transportation",
    "Food",
    "Utilities",
    "Entertainment",
    "Health",
    "Shopping",
    "Travel",
    "Savings",
    "Income",
    "Other",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
        }
    }

    /// Sign applied to the amount when computing balances.
    pub fn sign(&self) -> Cents {
        match self {
            TransactionKind::Expense => -1,
            TransactionKind::Income => 1,
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" => Ok(TransactionKind::Expense),
            "income" => Ok(TransactionKind::Income),
            other => Err(format!(
                "invalid transaction type '{}' (expected expense or income)",
                other
            )),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single income or expense entry owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    /// Insertion order, used to break ties between entries on the same date
    pub sequence: i64,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub category: String,
    pub description: String,
    /// Always positive; the direction comes from `kind`
    pub amount_cents: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a transaction from validated input. Sequence is assigned by the repository.
    pub fn new(user_id: UserId, input: NewTransaction, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            sequence: 0,
            date: input.date,
            kind: input.kind,
            category: normalize_category(&input.category),
            description: input.description.trim().to_string(),
            amount_cents: input.amount_cents,
            created_at: now,
            updated_at: now,
        }
    }

    /// Amount with income positive and expense negative.
    pub fn signed_amount(&self) -> Cents {
        self.kind.sign() * self.amount_cents
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: TransactionPatch, now: DateTime<Utc>) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(category) = patch.category {
            self.category = normalize_category(&category);
        }
        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(amount) = patch.amount_cents {
            self.amount_cents = amount;
        }
        self.updated_at = now;
    }
}

/// Trimmed category, falling back to [`DEFAULT_CATEGORY`] when blank.
pub fn normalize_category(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Input for creating a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub category: String,
    pub description: String,
    pub amount_cents: Cents,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPatch {
    pub date: Option<NaiveDate>,
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount_cents: Option<Cents>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.kind.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.amount_cents.is_none()
    }
}

/// Filter for listing transactions. All conditions are combined with AND.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub range: DateRange,
    pub category: Option<String>,
    pub kind: Option<TransactionKind>,
    pub limit: Option<usize>,
}

impl TransactionFilter {
    pub fn in_range(range: DateRange) -> Self {
        Self {
            range,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Date,
    Amount,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl TransactionSort {
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Oldest first, the order balances are accumulated in.
    pub const fn chronological() -> Self {
        Self::new(SortField::Date, SortDirection::Ascending)
    }
}

impl Default for TransactionSort {
    /// Newest first.
    fn default() -> Self {
        Self::new(SortField::Date, SortDirection::Descending)
    }
}

impl FromStr for TransactionSort {
    type Err = String;

    /// Parses `date_desc`, `date_asc`, `amount_asc`, `amount_desc`,
    /// `category_asc`, `category_desc`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = s
            .trim()
            .rsplit_once('_')
            .ok_or_else(|| format!("invalid sort '{}'", s))?;
        let field = match field {
            "date" => SortField::Date,
            "amount" => SortField::Amount,
            "category" => SortField::Category,
            _ => return Err(format!("invalid sort field '{}'", field)),
        };
        let direction = match direction {
            "asc" => SortDirection::Ascending,
            "desc" => SortDirection::Descending,
            _ => return Err(format!("invalid sort direction '{}'", direction)),
        };
        Ok(Self::new(field, direction))
    }
}
