// Outbound notifications. The transport is a trait object so deployments can
// plug in a real provider; this crate ships a tracing-backed transport.
// Welcome mail is best-effort: callers log failures and move on.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::site_settings::SiteSettings;
use crate::models::user::Role;

#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> AppResult<()>;
}

/// Transport that records outbound mail in the log. Stands in for a real
/// provider in development and tests.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> AppResult<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "outbound email");
        Ok(())
    }
}

/// Compose the welcome message for a new account: display name, role, and
/// site branding.
pub fn welcome_email(
    to: &str,
    display_name: &str,
    role: Role,
    settings: &SiteSettings,
    site_url: &str,
) -> OutboundEmail {
    let mut body = format!(
        "Hello {},\n\nYour account at {} has been created with the {} role.\n",
        display_name,
        settings.site_name,
        role.display_name()
    );
    if role == Role::Student {
        body.push_str("As a student you have access to the class material section.\n");
    }
    body.push_str(&format!("\nVisit the site: {}\n", site_url));
    if !settings.contact_email.is_empty() {
        body.push_str(&format!(
            "Questions? Write to {}.\n",
            settings.contact_email
        ));
    }

    OutboundEmail {
        to: to.to_string(),
        subject: format!("Welcome to {}!", settings.site_name),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn settings() -> SiteSettings {
        SiteSettings {
            id: 1,
            site_name: "ATELIER".to_string(),
            logo: None,
            hero_image: None,
            hero_video: None,
            hero_text: "ATELIER".to_string(),
            hero_subtitle: "Scroll to explore".to_string(),
            description: String::new(),
            contact_email: "hello@atelier.test".to_string(),
            phone: String::new(),
            address: String::new(),
            facebook_url: String::new(),
            instagram_url: String::new(),
            twitter_url: String::new(),
            linkedin_url: String::new(),
            youtube_url: String::new(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn welcome_email_mentions_role_and_branding() {
        let email = welcome_email(
            "ana@example.com",
            "Ana",
            Role::Student,
            &settings(),
            "https://atelier.test",
        );
        assert_eq!(email.to, "ana@example.com");
        assert!(email.subject.contains("ATELIER"));
        assert!(email.body.contains("Student"));
        assert!(email.body.contains("class material"));
        assert!(email.body.contains("https://atelier.test"));
    }

    #[test]
    fn visitor_copy_skips_student_section() {
        let email = welcome_email(
            "bo@example.com",
            "Bo",
            Role::Visitor,
            &settings(),
            "https://atelier.test",
        );
        assert!(!email.body.contains("class material"));
    }
}
