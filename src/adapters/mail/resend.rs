//! Resend adapter. Implements MailPort by posting to the Resend REST API.

use crate::domain::DomainError;
use crate::ports::MailPort;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

const RESEND_EMAILS_URL: &str = "https://api.resend.com/emails";

/// Sends HTML mail through Resend.
///
/// Requires an API key and a verified sender address (`from`).
pub struct ResendMailer {
    client: Client,
    api_key: String,
    from: String,
}

#[derive(Debug, Serialize)]
struct SendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    reply_to: &'a str,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait::async_trait]
impl MailPort for ResendMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        reply_to: &str,
    ) -> Result<(), DomainError> {
        let body = SendEmail {
            from: &self.from,
            to: [to],
            subject,
            html,
            reply_to,
        };

        let res = self
            .client
            .post(RESEND_EMAILS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::Mail(format!("Request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_else(|_| "unknown".to_string());
            return Err(DomainError::Mail(format!(
                "Resend API error {}: {}",
                status, text
            )));
        }

        info!(to, "notification mail sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_resend_field_names() {
        let v = serde_json::to_value(SendEmail {
            from: "site <noreply@site.dev>",
            to: ["owner@site.dev"],
            subject: "s",
            html: "<p>x</p>",
            reply_to: "v@mail.com",
        })
        .unwrap();
        assert_eq!(v["to"][0], "owner@site.dev");
        assert_eq!(v["reply_to"], "v@mail.com");
    }
}
