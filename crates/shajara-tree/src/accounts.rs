//! Account status and password-reset flows.

use chrono::{Duration, Utc};
use shajara_core::error::ShajaraResult;
use shajara_core::models::user::{User, UserStatus};
use shajara_core::repository::UserRepository;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::TreeConfig;
use crate::email::{Mailer, account_status_email, password_reset_email, welcome_email};
use crate::error::AccountError;
use crate::reset::{generate_reset_token, hash_reset_token};

pub struct AccountService<U, M> {
    users: U,
    mailer: M,
    config: TreeConfig,
}

impl<U, M> AccountService<U, M>
where
    U: UserRepository,
    M: Mailer,
{
    pub fn new(users: U, mailer: M, config: TreeConfig) -> Self {
        Self {
            users,
            mailer,
            config,
        }
    }

    /// Persist a status change and send the account-status email.
    ///
    /// Only accepted/rejected produce an email; a mail failure in this
    /// path propagates to the caller.
    pub async fn set_status(&self, id: Uuid, status: UserStatus) -> ShajaraResult<User> {
        let user = self.users.update_status(id, status).await?;
        info!(user_id = %user.id, status = status.as_str(), "User status updated");

        if let Some(message) = account_status_email(&self.config, &user) {
            self.mailer.send(message).await?;
        }

        Ok(user)
    }

    /// Send the post-registration welcome email. Failures are logged,
    /// never surfaced — registration has already succeeded.
    pub async fn send_welcome(&self, user: &User) {
        let message = welcome_email(&self.config, &user.email);
        if let Err(err) = self.mailer.send(message).await {
            warn!(error = %err, user_id = %user.id, "Failed to send welcome email");
        }
    }

    /// Issue a reset token for the account behind `email` and mail the
    /// reset URL. Unknown email is a not-found error.
    pub async fn request_password_reset(&self, email: &str) -> ShajaraResult<()> {
        let user = self.users.get_by_email(email).await?;

        let token = generate_reset_token();
        let token_hash = hash_reset_token(&token);
        let expires_at = Utc::now() + Duration::hours(self.config.reset_token_lifetime_hours);
        self.users
            .set_reset_token(user.id, token_hash, expires_at)
            .await?;

        let reset_url = format!(
            "{}/{token}",
            self.config.password_reset_url.trim_end_matches('/'),
        );
        let message = password_reset_email(&self.config, &user.email, &reset_url);
        if let Err(err) = self.mailer.send(message).await {
            warn!(error = %err, user_id = %user.id, "Failed to send password reset email");
        }

        info!(user_id = %user.id, "Password reset token issued");
        Ok(())
    }

    /// Redeem a reset token: rejects unknown or expired tokens, then
    /// re-hashes the new password and clears the token.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ShajaraResult<()> {
        let token_hash = hash_reset_token(token);
        let user = self
            .users
            .find_by_reset_token(&token_hash)
            .await?
            .ok_or(AccountError::ResetTokenInvalid)?;

        let valid = user
            .reset_token_expires_at
            .is_some_and(|expires_at| expires_at > Utc::now());
        if !valid {
            return Err(AccountError::ResetTokenExpired.into());
        }

        self.users.update_password(user.id, new_password).await?;
        info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }
}
