//! Invitation email delivery over SMTP.

use anyhow::Result;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::EmailConfig;

/// Service for sending marketplace emails.
pub struct Mailer {
    config: EmailConfig,
}

impl Mailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Check if email sending is configured and enabled
    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    /// Send an invitation email carrying the invite code.
    pub async fn send_invite_email(
        &self,
        to_email: &str,
        invited_by: &str,
        code: &str,
    ) -> Result<()> {
        if !self.is_enabled() {
            tracing::warn!("Email not configured, skipping invite email to {}", to_email);
            return Ok(());
        }

        let subject = format!("{} invited you to open a store on Atelier", invited_by);
        let html_body = render_invite_html(to_email, invited_by, code);
        let text_body = render_invite_text(to_email, invited_by, code);

        self.send_email(to_email, &subject, &html_body, &text_body)
            .await
    }

    /// Send an email with HTML and plain text versions
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<()> {
        let smtp_host = self
            .config
            .smtp_host
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("SMTP host not configured"))?;
        let from_address = self
            .config
            .from_address
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("From address not configured"))?;

        let from_mailbox = format!("{} <{}>", self.config.from_name, from_address);
        let from: Mailbox = from_mailbox.parse()?;
        let to: Mailbox = to_email.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        let mailer = if self.config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer
        };

        mailer.build().send(email).await?;

        tracing::info!(to = %to_email, subject = %subject, "Email sent successfully");

        Ok(())
    }
}

fn render_invite_html(to_email: &str, invited_by: &str, code: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Atelier Invite</title>
</head>
<body style="font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; color: #374151;">
    <div style="max-width: 560px; margin: 0 auto; padding: 32px 20px;">
        <h1 style="font-size: 22px;">You're invited</h1>
        <p>Hello <strong>{to_email}</strong>,</p>
        <p><strong>{invited_by}</strong> invited you to open a store on Atelier.</p>
        <p>Use this code when creating your account:</p>
        <p style="background: #f3f4f6; border-radius: 6px; padding: 16px; font-family: monospace; font-size: 16px;">{code}</p>
        <p style="color: #6b7280; font-size: 13px;">If you didn't expect this invitation, you can safely ignore this email.</p>
    </div>
</body>
</html>"#,
        to_email = html_escape(to_email),
        invited_by = html_escape(invited_by),
        code = html_escape(code),
    )
}

fn render_invite_text(to_email: &str, invited_by: &str, code: &str) -> String {
    format!(
        r#"Hello {to_email},

{invited_by} invited you to open a store on Atelier.

Use this code when creating your account: {code}

If you didn't expect this invitation, you can safely ignore this email."#,
    )
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("Tom & Jerry"), "Tom &amp; Jerry");
    }

    #[test]
    fn test_render_invite_text() {
        let text = render_invite_text("new@example.com", "alice", "bmV3QGV4YW1wbGUuY29t");
        assert!(text.contains("new@example.com"));
        assert!(text.contains("alice"));
        assert!(text.contains("bmV3QGV4YW1wbGUuY29t"));
    }

    #[test]
    fn test_render_invite_html_escapes() {
        let html = render_invite_html("a@x.com", "<bob>", "code");
        assert!(html.contains("&lt;bob&gt;"));
        assert!(!html.contains("<bob>"));
    }

    #[test]
    fn test_disabled_mailer_is_noop() {
        let mailer = Mailer::new(EmailConfig::default());
        assert!(!mailer.is_enabled());
    }
}
