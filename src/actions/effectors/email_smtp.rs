//! SMTP effector, built on `lettre`'s async Tokio/rustls transport.
//!
//! The `secure` config flag names itself after the common
//! `nodemailer`-style convention: `true` means implicit TLS on connect,
//! `false` means plaintext-then-STARTTLS.

use std::env;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::ActionsConfig;
use crate::errors::{BctbError, Result};
use crate::types::{ActionDetails, RequestedAction, Severity};

fn severity_emoji(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "\u{1f534}",
        Severity::Medium => "\u{1f7e1}",
        Severity::Low => "\u{1f7e2}",
    }
}

pub async fn send(request: &RequestedAction, config: &ActionsConfig) -> Result<ActionDetails> {
    let smtp = &config.email_smtp;
    let host = smtp
        .host
        .as_deref()
        .ok_or_else(|| BctbError::action("email-smtp: no host configured"))?;
    let port = smtp
        .port
        .ok_or_else(|| BctbError::action("email-smtp: no port configured"))?;
    let user = smtp
        .user
        .as_deref()
        .ok_or_else(|| BctbError::action("email-smtp: no user configured"))?;
    let from = smtp.from.as_deref().unwrap_or(user);
    let password = env::var("SMTP_PASSWORD")
        .ok()
        .or_else(|| smtp.password.clone())
        .ok_or_else(|| BctbError::action("email-smtp: SMTP_PASSWORD is not set"))?;

    let recipients = request
        .recipients
        .clone()
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| smtp.default_recipients.clone());
    if recipients.is_empty() {
        return Err(BctbError::action("email-smtp: no recipients"));
    }

    let subject = format!("{} {}", severity_emoji(request.severity), request.title);

    let mut builder = Message::builder()
        .from(from.parse().map_err(|e| BctbError::action(format!("email-smtp: invalid from address: {e}")))?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN);
    for recipient in &recipients {
        builder = builder.to(recipient
            .parse()
            .map_err(|e| BctbError::action(format!("email-smtp: invalid recipient '{recipient}': {e}")))?);
    }
    let email = builder
        .body(request.message.clone())
        .map_err(|e| BctbError::action(format!("email-smtp: failed to build message: {e}")))?;

    let creds = Credentials::new(user.to_string(), password);
    let transport = if smtp.secure {
        AsyncSmtpTransport::<Tokio1Executor>::relay(host)
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
    }
    .map_err(|e| BctbError::action(format!("email-smtp: transport setup failed: {e}")))?
    .port(port)
    .credentials(creds)
    .build();

    transport
        .send(email)
        .await
        .map_err(|e| BctbError::action(format!("email-smtp: send failed: {e}")))?;

    Ok(ActionDetails {
        title: Some(request.title.clone()),
        severity: Some(format!("{:?}", request.severity).to_lowercase()),
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_emoji_mapping() {
        assert_eq!(severity_emoji(Severity::High), "\u{1f534}");
        assert_eq!(severity_emoji(Severity::Medium), "\u{1f7e1}");
        assert_eq!(severity_emoji(Severity::Low), "\u{1f7e2}");
    }

    #[tokio::test]
    async fn missing_host_fails_before_touching_network() {
        let config = ActionsConfig::default();
        let request = RequestedAction {
            action_type: crate::types::ActionType::EmailSmtp,
            title: "t".into(),
            message: "m".into(),
            severity: Severity::High,
            recipients: None,
            webhook_payload: None,
            investigation_id: None,
            issue_id: None,
        };
        let err = send(&request, &config).await.unwrap_err();
        assert!(err.to_string().contains("host"));
    }
}
