//! Email message construction.
//!
//! Message content is Arabic RTL HTML: a framed layout with an inline
//! logo header and a rights/no-reply footer. Actual delivery is behind
//! the [`Mailer`] trait so transports stay out of this crate.

use chrono::{Datelike, Utc};
use shajara_core::error::ShajaraError;
use shajara_core::models::user::{User, UserStatus};

use crate::config::TreeConfig;

const PRIMARY_COLOR: &str = "#2F80A2";
const SECONDARY_COLOR: &str = "#f5f5f5";

/// A fully rendered outgoing email.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    /// Inline logo attachment referenced as `cid:logo` in the body.
    pub logo_attachment: String,
}

/// Delivery seam. Implementations may fail; the caller decides whether
/// a failure propagates or is logged.
pub trait Mailer: Send + Sync {
    fn send(&self, message: EmailMessage) -> impl Future<Output = Result<(), ShajaraError>> + Send;
}

/// Wrap body content in the platform's RTL frame.
pub fn wrap_template(content: &str) -> String {
    let year = Utc::now().year();
    format!(
        r#"<!DOCTYPE html>
<html dir="rtl">
<head>
  <meta charset="UTF-8">
</head>
<body style="font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 0;">
  <div style="max-width: 600px; margin: 0 auto; border: 2px solid {PRIMARY_COLOR}; border-radius: 8px; overflow: hidden;">
    <div style="padding: 20px; text-align: center;">
      <img src="cid:logo" alt="Family Logo" style="max-width:150px; height:auto; display:block; margin:0 auto;">
    </div>

    <div style="padding: 30px; background-color: white; text-align: right;">
      {content}
    </div>

    <div style="background-color: {SECONDARY_COLOR}; padding: 20px; text-align: center; font-size: 14px; color: #666;">
      <p>© {year} جميع الحقوق محفوظة</p>
      <p>هذه رسالة تلقائية، يرجى عدم الرد عليها</p>
    </div>
  </div>
</body>
</html>
"#
    )
}

fn support_block(config: &TreeConfig) -> String {
    match &config.support_email {
        Some(email) => format!(
            r#"<p style="margin: 10px 0;"><strong>:البريد الإلكتروني للدعم</strong>
              <a href="mailto:{email}" style="color: {PRIMARY_COLOR}; text-decoration: none;">{email}</a>
            </p>"#
        ),
        None => String::new(),
    }
}

/// Welcome email sent after registration; the account is pending
/// review at this point.
pub fn welcome_email(config: &TreeConfig, to: &str) -> EmailMessage {
    let support = support_block(config);
    let content = format!(
        r#"<h2 style="color: {PRIMARY_COLOR}; text-align: center;">!مرحباً بك في منصتنا</h2>
      <p style="margin: 10px 0;">،عزيزي/عزيزتي المستخدم</p>
      <p style="margin: 10px 0;">.شكراً لتسجيلك معنا. لقد تم استلام طلب إنشاء حسابك وهو الآن قيد المراجعة</p>
      <p style="margin: 10px 0;">.سوف تتلقى إشعاراً بالبريد الإلكتروني بمجرد اكتمال مراجعة حسابك</p>

      <div style="border-top: 1px solid #eee; margin: 20px 0;"></div>

      <p style="margin: 10px 0;">:إذا كان لديك أي استفسارات، لا تتردد في التواصل معنا</p>
      {support}"#
    );

    EmailMessage {
        from: config.email_from.clone(),
        to: to.into(),
        subject: "مرحبًا بكم في منصتنا - الحساب قيد المراجعة".into(),
        html: wrap_template(&content),
        logo_attachment: config.logo_url.clone(),
    }
}

/// Account-status email, produced for accepted/rejected only.
pub fn account_status_email(config: &TreeConfig, user: &User) -> Option<EmailMessage> {
    let (subject, content) = match user.status {
        UserStatus::Accepted => {
            let login = match &config.frontend_login_url {
                Some(url) => format!(
                    r#"<div style="text-align: center; margin: 25px 0;">
              <a href="{url}" style="display: inline-block; padding: 12px 24px; background-color: {PRIMARY_COLOR}; color: white; text-decoration: none; border-radius: 4px; font-weight: bold;">
                تسجيل الدخول الآن
              </a>
            </div>"#
                ),
                None => String::new(),
            };
            let support = support_block(config);
            (
                "تم تفعيل حسابك بنجاح",
                format!(
                    r#"<h2 style="color: {PRIMARY_COLOR}; text-align: center; margin-bottom: 20px;">!تم تفعيل حسابك بنجاح</h2>
            <p style="margin: 10px 0; font-size: 16px;">،عزيزي/عزيزتي المستخدم</p>
            <p style="margin: 10px 0; font-size: 16px;">.يسرنا إعلامك بأنه تم الموافقة على حسابك بنجاح في منصتنا</p>
            <p style="margin: 10px 0; font-size: 16px;">.يمكنك الآن تسجيل الدخول والاستفادة من جميع الخدمات المقدمة</p>
            {login}
            <div style="border-top: 1px solid #eee; margin: 20px 0;"></div>
            <p style="margin: 10px 0; font-size: 16px;">:في حال واجهتك أي صعوبات، لا تتردد في التواصل مع فريق الدعم</p>
            {support}"#
                ),
            )
        }
        UserStatus::Rejected => {
            let support = support_block(config);
            (
                "حالة طلب التسجيل",
                format!(
                    r#"<h2 style="color: {PRIMARY_COLOR}; text-align: center; margin-bottom: 20px;">حالة طلب التسجيل</h2>
            <p style="margin: 10px 0; font-size: 16px;">،عزيزي/عزيزتي المستخدم</p>
            <p style="margin: 10px 0; font-size: 16px;">.نأسف لإعلامك بأنه لا يمكننا الموافقة على طلب التسجيل الخاص بك في هذا الوقت</p>
            <p style="margin: 10px 0; font-size: 16px;">.إذا كنت تعتقد أن هناك خطأ أو لديك أي استفسارات، يرجى التواصل مع فريق الدعم</p>
            <div style="border-top: 1px solid #eee; margin: 20px 0;"></div>
            {support}"#
                ),
            )
        }
        UserStatus::Pending => return None,
    };

    Some(EmailMessage {
        from: config.email_from.clone(),
        to: user.email.clone(),
        subject: subject.into(),
        html: wrap_template(&content),
        logo_attachment: config.logo_url.clone(),
    })
}

/// Password-reset email carrying the one-time reset URL.
pub fn password_reset_email(config: &TreeConfig, to: &str, reset_url: &str) -> EmailMessage {
    let support = support_block(config);
    let content = format!(
        r#"<h2 style="color: {PRIMARY_COLOR}; text-align: center; margin-bottom: 20px;">إعادة تعيين كلمة المرور</h2>
      <p style="margin: 10px 0; font-size: 16px;">،عزيزي المستخدم</p>
      <p style="margin: 10px 0; font-size: 16px;">.لقد تلقينا طلبًا لإعادة تعيين كلمة المرور الخاصة بحسابك</p>
      <p style="margin: 10px 0; font-size: 16px;">:لإكمال عملية إعادة التعيين، يرجى الضغط على الزر أدناه</p>

      <div style="text-align: center; margin: 25px 0;">
        <a href="{reset_url}" style="display: inline-block; padding: 12px 24px; background-color: {PRIMARY_COLOR}; color: white; text-decoration: none; border-radius: 4px; font-weight: bold;">
          إعادة تعيين كلمة المرور
        </a>
      </div>

      <p style="margin: 10px 0; font-size: 16px;">:أو يمكنك نسخ الرابط التالي ولصقه في متصفحك</p>
      <p style="margin: 10px 0; font-size: 16px; word-break: break-all;">
        <a href="{reset_url}" style="color: {PRIMARY_COLOR}; text-decoration: none;">{reset_url}</a>
      </p>

      <div style="border-top: 1px solid #eee; margin: 20px 0;"></div>

      <p style="margin: 10px 0; font-size: 16px;">.إذا لم تطلب إعادة تعيين كلمة المرور، يمكنك تجاهل هذه الرسالة بأمان</p>
      <p style="margin: 10px 0; font-size: 16px;">.لحماية حسابك، لا تشارك هذا الرابط مع أي شخص</p>
      <p style="margin: 10px 0; font-size: 16px;">.ينتهي صلاحية هذا الرابط بعد 24 ساعة</p>
      {support}"#
    );

    EmailMessage {
        from: config.email_from.clone(),
        to: to.into(),
        subject: "إعادة تعيين كلمة المرور الخاصة بك".into(),
        html: wrap_template(&content),
        logo_attachment: config.logo_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shajara_core::models::member::{FamilyBranch, FamilyRelationship};
    use uuid::Uuid;

    fn user_with_status(status: UserStatus) -> User {
        User {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            email: "user@example.com".into(),
            password_hash: String::new(),
            phone: String::new(),
            roles: Vec::new(),
            family_branch: FamilyBranch::First,
            family_relationship: FamilyRelationship::Son,
            status,
            address: None,
            permissions: Vec::new(),
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn template_is_rtl_with_logo_and_footer() {
        let html = wrap_template("<p>مرحبا</p>");
        assert!(html.contains(r#"<html dir="rtl">"#));
        assert!(html.contains("cid:logo"));
        assert!(html.contains("جميع الحقوق محفوظة"));
        assert!(html.contains("<p>مرحبا</p>"));
    }

    #[test]
    fn status_email_only_for_accepted_or_rejected() {
        let config = TreeConfig::default();

        assert!(account_status_email(&config, &user_with_status(UserStatus::Pending)).is_none());

        let accepted =
            account_status_email(&config, &user_with_status(UserStatus::Accepted)).unwrap();
        assert_eq!(accepted.subject, "تم تفعيل حسابك بنجاح");

        let rejected =
            account_status_email(&config, &user_with_status(UserStatus::Rejected)).unwrap();
        assert_eq!(rejected.subject, "حالة طلب التسجيل");
    }

    #[test]
    fn login_button_follows_config() {
        let mut config = TreeConfig::default();
        let without = account_status_email(&config, &user_with_status(UserStatus::Accepted))
            .unwrap();
        assert!(!without.html.contains("تسجيل الدخول الآن"));

        config.frontend_login_url = Some("https://tree.example.com/login".into());
        let with = account_status_email(&config, &user_with_status(UserStatus::Accepted)).unwrap();
        assert!(with.html.contains("https://tree.example.com/login"));
        assert!(with.html.contains("تسجيل الدخول الآن"));
    }

    #[test]
    fn reset_email_embeds_url() {
        let config = TreeConfig::default();
        let url = "https://tree.example.com/reset-password/abc123";
        let message = password_reset_email(&config, "user@example.com", url);
        assert_eq!(message.to, "user@example.com");
        assert!(message.html.matches(url).count() >= 2);
    }
}
