use anyhow::anyhow;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use tracing::instrument;

use crate::config::HashingParams;
use crate::domain::{ResetToken, User, UserId, hash_token};

use super::notify::{Notification, dispatch};
use super::{AppContext, AppError};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 80;
pub const MAX_EMAIL_LEN: usize = 120;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 1024;

/// The configured Argon2 instance plus a hash of a throwaway password,
/// verified against when an identifier matches no account so a miss costs
/// the same as a wrong password. Built once per [`AppContext`].
#[derive(Clone)]
pub struct PasswordHashing {
    hasher: Argon2<'static>,
    dummy_hash: String,
}

impl PasswordHashing {
    pub fn new(params: HashingParams) -> Result<Self, AppError> {
        let hasher = build_hasher(params)?;
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = hasher
            .hash_password(b"pocketbook-dummy-password", &salt)
            .map_err(|e| anyhow!("Failed to prepare password hasher: {e}"))?
            .to_string();
        Ok(Self { hasher, dummy_hash })
    }

    #[cfg(test)]
    pub(crate) fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }
}

/// Registration, login, password changes and the reset/reminder flows.
pub struct AuthService {
    ctx: AppContext,
    hashing: PasswordHashing,
}

impl AuthService {
    pub fn new(ctx: AppContext, hashing: PasswordHashing) -> Self {
        Self { ctx, hashing }
    }

    /// Create an account. Usernames and emails must be unique.
    #[instrument(skip_all, fields(username = %username.trim()))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let username = validate_username(username)?;
        let email = normalize_email(email)?;
        validate_password(password)?;

        if self.ctx.repo.get_user_by_username(&username).await?.is_some() {
            return Err(AppError::validation(
                "Username already exists. Please choose another.",
            ));
        }
        if self.ctx.repo.get_user_by_email(&email).await?.is_some() {
            return Err(AppError::validation("Email is already registered."));
        }

        let password_hash = self.hash_password(password).await?;
        let user = User::new(username, email, password_hash, self.ctx.clock.now());

        // A concurrent registration can still win the race; the unique index decides
        if !self.ctx.repo.insert_user(&user).await? {
            return Err(AppError::validation("Username or email already exists."));
        }

        tracing::info!(user_id = %user.id, "registered user");
        Ok(user)
    }

    /// Log in with a username or an email address.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<User, AppError> {
        let identifier = identifier.trim();
        let user = if identifier.contains('@') {
            self.ctx
                .repo
                .get_user_by_email(&identifier.to_lowercase())
                .await?
        } else {
            self.ctx.repo.get_user_by_username(identifier).await?
        };

        let Some(user) = user else {
            // Burn the same verification work as a real account would
            let _ = self.verify_password(password, &self.hashing.dummy_hash).await;
            tracing::debug!("login attempt for unknown identifier");
            return Err(AppError::Auth);
        };

        if !self.verify_password(password, &user.password_hash).await? {
            tracing::debug!(user_id = %user.id, "login attempt with wrong password");
            return Err(AppError::Auth);
        }

        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, AppError> {
        self.ctx
            .repo
            .get_user(id)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    /// Change a password after re-checking the current one.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn change_password(
        &self,
        user: &User,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        // Read the stored hash; the caller's copy may predate a reset
        let current = self.get_user(user.id).await?;
        if !self
            .verify_password(old_password, &current.password_hash)
            .await?
        {
            return Err(AppError::Auth);
        }
        validate_password(new_password)?;

        let password_hash = self.hash_password(new_password).await?;
        self.ctx
            .repo
            .update_password_hash(current.id, &password_hash)
            .await?;

        tracing::info!("password changed");
        Ok(())
    }

    /// Start a password reset for `email`.
    ///
    /// Returns the same way whether or not the address belongs to an
    /// account, and whether or not anything failed along the way; the real
    /// outcome only goes to the log.
    #[instrument(skip_all)]
    pub async fn request_password_reset(&self, email: &str) {
        if let Err(err) = self.issue_reset_token(email).await {
            tracing::error!(error = %err, "password reset request failed");
        }
    }

    async fn issue_reset_token(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.find_by_email(email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let now = self.ctx.clock.now();
        let purged = self.ctx.repo.purge_stale_reset_tokens(user.id, now).await?;
        if purged > 0 {
            tracing::debug!(user_id = %user.id, purged, "removed stale reset tokens");
        }

        let (token, raw) = ResetToken::issue(user.id, now, self.ctx.config.auth.reset_token_ttl);
        self.ctx.repo.save_reset_token(&token).await?;
        tracing::info!(user_id = %user.id, expires_at = %token.expires_at, "issued reset token");

        let notification = Notification {
            recipient: user.email.clone(),
            subject: "Reset your password".to_string(),
            body: format!(
                "Hi {},\n\nSomeone asked to reset the password for your account.\n\n\
                 Reset code: {}\n\n\
                 The code works once and expires at {} UTC. \
                 If you did not ask for this, you can ignore this message.",
                user.username,
                raw,
                token.expires_at.format("%Y-%m-%d %H:%M")
            ),
        };
        dispatch(
            self.ctx.notifier.as_ref(),
            &notification,
            self.ctx.config.notify.timeout,
        )
        .await;
        Ok(())
    }

    /// Set a new password with a reset token. The token is spent and the
    /// password replaced together, or neither happens.
    #[instrument(skip_all)]
    pub async fn consume_reset_token(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let Some(record) = self
            .ctx
            .repo
            .get_reset_token_by_hash(&hash_token(token))
            .await?
        else {
            return Err(AppError::Token);
        };

        let now = self.ctx.clock.now();
        if !record.is_usable(now) {
            tracing::debug!(
                user_id = %record.user_id,
                consumed = record.is_consumed(),
                "rejected unusable reset token"
            );
            return Err(AppError::Token);
        }

        // A rejected password leaves the token usable
        validate_password(new_password)?;

        let password_hash = self.hash_password(new_password).await?;
        if !self
            .ctx
            .repo
            .consume_reset_token(record.id, &password_hash, now)
            .await?
        {
            // Lost a race with another use of the same token
            return Err(AppError::Token);
        }

        tracing::info!(user_id = %record.user_id, "password reset completed");
        Ok(())
    }

    /// Send the account's username to `email`. Same non-revealing contract
    /// as [`AuthService::request_password_reset`].
    #[instrument(skip_all)]
    pub async fn request_username_reminder(&self, email: &str) {
        let result = async {
            let Some(user) = self.find_by_email(email).await? else {
                tracing::debug!("username reminder requested for unknown email");
                return Ok::<(), AppError>(());
            };

            let notification = Notification {
                recipient: user.email.clone(),
                subject: "Your username".to_string(),
                body: format!(
                    "Your username is: {}\n\nIf you did not ask for this reminder, you can ignore this message.",
                    user.username
                ),
            };
            dispatch(
                self.ctx.notifier.as_ref(),
                &notification,
                self.ctx.config.notify.timeout,
            )
            .await;
            tracing::info!(user_id = %user.id, "sent username reminder");
            Ok(())
        }
        .await;

        if let Err(err) = result {
            tracing::error!(error = %err, "username reminder failed");
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match normalize_email(email) {
            Ok(email) => Ok(self.ctx.repo.get_user_by_email(&email).await?),
            Err(_) => Ok(None),
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let hasher = self.hashing.hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| anyhow!("Failed to hash password: {e}"))
        })
        .await
        .map_err(|e| anyhow!("Password hashing task failed: {e}"))?
        .map_err(AppError::from)
    }

    /// `Ok(false)` on a mismatch; errors only for malformed stored hashes.
    async fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, AppError> {
        let hasher = self.hashing.hasher.clone();
        let password = password.to_owned();
        let stored_hash = stored_hash.to_owned();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored_hash)
                .map_err(|e| anyhow!("Stored password hash is malformed: {e}"))?;
            match hasher.verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(anyhow!("Password verification failed: {e}")),
            }
        })
        .await
        .map_err(|e| anyhow!("Password verification task failed: {e}"))?
        .map_err(AppError::from)
    }
}

fn build_hasher(params: HashingParams) -> Result<Argon2<'static>, AppError> {
    let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
        .map_err(|e| anyhow!("Invalid Argon2 parameters: {e}"))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Trimmed username, or why it is not acceptable.
pub fn validate_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim();
    let len = username.chars().count();
    if len < MIN_USERNAME_LEN {
        return Err(AppError::validation(format!(
            "Username must be at least {} characters.",
            MIN_USERNAME_LEN
        )));
    }
    if len > MAX_USERNAME_LEN {
        return Err(AppError::validation(format!(
            "Username must be at most {} characters.",
            MAX_USERNAME_LEN
        )));
    }
    // '@' is how login tells usernames and emails apart
    if username.contains('@') || username.chars().any(char::is_whitespace) {
        return Err(AppError::validation(
            "Username may not contain spaces or '@'.",
        ));
    }
    Ok(username.to_string())
}

/// Trimmed, lower-cased email, or why it is not acceptable.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let invalid = || AppError::validation("Please enter a valid email address.");

    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(AppError::validation("Password is too long."));
    }
    Ok(())
}
