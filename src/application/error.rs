use thiserror::Error;

/// Failures surfaced by the application services.
///
/// Front-ends translate these into user-facing messages with
/// [`AppError::user_message`]; none of them leaves persisted state
/// half-written.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad input shape or value (negative amount, duplicate username, weak password).
    #[error("{0}")]
    Validation(String),

    /// Credentials did not match.
    #[error("Invalid username or password")]
    Auth,

    /// Reset token unknown, expired or already used.
    #[error("Reset link is invalid or has expired")]
    Token,

    /// Entity absent or owned by someone else.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// Message safe to show an end user. Storage details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Database(_) => "Something went wrong. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_storage_errors() {
        let err = AppError::Database(anyhow::anyhow!("disk I/O error at /var/db"));
        assert!(!err.user_message().contains("/var/db"));

        let err = AppError::validation("Amount must be greater than zero.");
        assert_eq!(err.user_message(), "Amount must be greater than zero.");
        assert_eq!(AppError::NotFound("Transaction").user_message(), "Transaction not found");
    }
}
