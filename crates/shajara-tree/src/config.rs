//! Configuration for the tree services.

/// Platform-wide settings used by member and account flows.
#[derive(Debug, Clone)]
pub struct TreeConfig {
    /// Avatar used when a member is created without an image.
    pub default_member_image: String,
    /// Logo attached inline to every outgoing email.
    pub logo_url: String,
    /// `From` address on outgoing email.
    pub email_from: String,
    /// Support contact shown in email footers; omitted when empty.
    pub support_email: Option<String>,
    /// Login page linked from the account-accepted email.
    pub frontend_login_url: Option<String>,
    /// Base URL the reset token is appended to.
    pub password_reset_url: String,
    /// Reset token lifetime in hours.
    pub reset_token_lifetime_hours: i64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            default_member_image:
                "https://res.cloudinary.com/dmhvfuuke/image/upload/v1750092490/avatar_bdtadk.jpg"
                    .into(),
            logo_url:
                "https://res.cloudinary.com/dmhvfuuke/image/upload/v1748029147/family-logo_z54fug.png"
                    .into(),
            email_from: "no-reply@example.com".into(),
            support_email: None,
            frontend_login_url: None,
            password_reset_url: "https://localhost/reset-password".into(),
            reset_token_lifetime_hours: 24,
        }
    }
}
