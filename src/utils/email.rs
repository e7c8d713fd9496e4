use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, instrument};

use registrar_config::EmailConfig;
use registrar_core::AppError;

/// Outgoing mail for the admission workflow and account provisioning.
///
/// With SMTP disabled messages are logged and dropped, which keeps local
/// development and tests free of a mail server.
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn verification_link(&self, token: &str) -> String {
        format!(
            "{}/admissions/verify-parent?token={}",
            self.config.frontend_url.trim_end_matches('/'),
            token
        )
    }

    #[instrument(skip(self, token))]
    pub async fn send_parent_verification(
        &self,
        to_email: &str,
        parent_name: &str,
        applicant_name: &str,
        token: &str,
        ttl_hours: i64,
    ) -> Result<(), AppError> {
        let link = self.verification_link(token);
        let text_body = format!(
            "Hi {},\n\n\
             {} has applied for admission and listed you as parent or guardian.\n\n\
             Please confirm by opening the link below:\n\
             {}\n\n\
             This link expires in {} hours.\n\n\
             If you did not expect this, you can ignore this email.\n\n\
             {}",
            parent_name, applicant_name, link, ttl_hours, self.config.from_name
        );
        let html_body = self.layout(
            "Confirm admission application",
            &format!(
                "<p>Hi {},</p>\
                 <p><strong>{}</strong> has applied for admission and listed you as parent or guardian.</p>\
                 <p><a class=\"button\" href=\"{}\">Confirm application</a></p>\
                 <p>This link expires in {} hours.</p>",
                parent_name, applicant_name, link, ttl_hours
            ),
        );

        self.send_email(
            to_email,
            "Confirm admission application",
            &text_body,
            &html_body,
        )
        .await
    }

    #[instrument(skip(self, password))]
    pub async fn send_account_credentials(
        &self,
        to_email: &str,
        name: &str,
        role: &str,
        password: &str,
    ) -> Result<(), AppError> {
        let login_url = format!("{}/login", self.config.frontend_url.trim_end_matches('/'));
        let text_body = format!(
            "Hi {},\n\n\
             Your {} account has been created.\n\n\
             Email: {}\n\
             Temporary password: {}\n\n\
             Sign in at {} and change your password.\n\n\
             {}",
            name, role, to_email, password, login_url, self.config.from_name
        );
        let html_body = self.layout(
            "Your account is ready",
            &format!(
                "<p>Hi {},</p>\
                 <p>Your {} account has been created.</p>\
                 <p>Email: <code>{}</code><br>Temporary password: <code>{}</code></p>\
                 <p><a class=\"button\" href=\"{}\">Sign in</a> and change your password.</p>",
                name, role, to_email, password, login_url
            ),
        );

        self.send_email(to_email, "Your account is ready", &text_body, &html_body)
            .await
    }

    #[instrument(skip(self))]
    pub async fn send_payment_rejected(
        &self,
        to_email: &str,
        name: &str,
        reason: &str,
    ) -> Result<(), AppError> {
        let text_body = format!(
            "Hi {},\n\n\
             The payment submitted for your admission could not be approved.\n\n\
             Reason: {}\n\n\
             You can submit a new payment for the same application.\n\n\
             {}",
            name, reason, self.config.from_name
        );
        let html_body = self.layout(
            "Payment not approved",
            &format!(
                "<p>Hi {},</p>\
                 <p>The payment submitted for your admission could not be approved.</p>\
                 <p><strong>Reason:</strong> {}</p>\
                 <p>You can submit a new payment for the same application.</p>",
                name, reason
            ),
        );

        self.send_email(to_email, "Payment not approved", &text_body, &html_body)
            .await
    }

    #[instrument(skip(self))]
    pub async fn send_admission_rejected(
        &self,
        to_email: &str,
        name: &str,
        reason: &str,
    ) -> Result<(), AppError> {
        let text_body = format!(
            "Hi {},\n\n\
             We are sorry to inform you that your admission application was not accepted.\n\n\
             Reason: {}\n\n\
             {}",
            name, reason, self.config.from_name
        );
        let html_body = self.layout(
            "Admission application update",
            &format!(
                "<p>Hi {},</p>\
                 <p>We are sorry to inform you that your admission application was not accepted.</p>\
                 <p><strong>Reason:</strong> {}</p>",
                name, reason
            ),
        );

        self.send_email(
            to_email,
            "Admission application update",
            &text_body,
            &html_body,
        )
        .await
    }

    #[instrument(skip(self, html_body, text_body))]
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        if !self.config.enabled {
            info!(to = %to_email, subject = %subject, "SMTP disabled, email not sent");
            return Ok(());
        }

        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::internal_error(format!("Invalid from email: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::internal_error(format!("Invalid to email: {}", e)))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::internal_error(format!("Failed to build email: {}", e)))?;

        let mailer = if self.config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );

            SmtpTransport::relay(&self.config.smtp_host)
                .map_err(|e| {
                    AppError::internal_error(format!("Failed to create SMTP relay: {}", e))
                })?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        };

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::internal_error(format!("Task join error: {}", e)))?
            .map_err(|e| AppError::internal_error(format!("Failed to send email: {}", e)))?;

        Ok(())
    }

    fn layout(&self, title: &str, content: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background: #1f3a5f; color: #fff; padding: 24px; border-radius: 8px 8px 0 0; }}
        .content {{ background: #fff; padding: 24px; border: 1px solid #e0e0e0; border-top: none; border-radius: 0 0 8px 8px; }}
        .button {{ display: inline-block; padding: 10px 24px; background: #1f3a5f; color: #fff !important; text-decoration: none; border-radius: 4px; }}
        .footer {{ text-align: center; margin-top: 24px; color: #888; font-size: 12px; }}
    </style>
</head>
<body>
    <div class="header"><h2>{title}</h2></div>
    <div class="content">{content}</div>
    <div class="footer">{from}</div>
</body>
</html>"#,
            title = title,
            content = content,
            from = self.config.from_name,
        )
    }
}
