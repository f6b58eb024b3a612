//! Public contact form: store the message, then notify the owner by mail.
//!
//! Storing is mandatory. The notification is best-effort: it needs an owner email on
//! the profile and a configured mailer, and its failure never fails the submission.

use crate::domain::{ContactMessage, DomainError};
use crate::ports::{ContactRepoPort, MailPort, ProfileRepoPort};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to the owner notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Sent,
    Skipped,
    Failed,
}

pub struct ContactService {
    messages: Arc<dyn ContactRepoPort>,
    profiles: Arc<dyn ProfileRepoPort>,
    mailer: Option<Arc<dyn MailPort>>,
}

impl ContactService {
    pub fn new(
        messages: Arc<dyn ContactRepoPort>,
        profiles: Arc<dyn ProfileRepoPort>,
        mailer: Option<Arc<dyn MailPort>>,
    ) -> Self {
        Self {
            messages,
            profiles,
            mailer,
        }
    }

    pub async fn submit(&self, message: ContactMessage) -> Result<Notification, DomainError> {
        let message = validate(message)?;
        self.messages.insert_message(&message).await?;
        info!(sender = %message.sender_email, "contact message stored");
        Ok(self.notify_owner(&message).await)
    }

    async fn notify_owner(&self, message: &ContactMessage) -> Notification {
        let Some(mailer) = &self.mailer else {
            debug!("no mailer configured, skipping owner notification");
            return Notification::Skipped;
        };
        let owner_email = match self.profiles.owner_contact().await {
            Ok(contact) => contact.email_contact,
            Err(e) => {
                warn!(error = %e, "owner contact lookup failed");
                return Notification::Failed;
            }
        };
        let Some(to) = owner_email else {
            debug!("owner has no contact email, skipping notification");
            return Notification::Skipped;
        };

        let subject = format!("New contact message from {}", message.sender_name);
        match mailer
            .send(&to, &subject, &render_html(message), &message.sender_email)
            .await
        {
            Ok(()) => Notification::Sent,
            Err(e) => {
                warn!(error = %e, "owner notification failed");
                Notification::Failed
            }
        }
    }
}

fn validate(message: ContactMessage) -> Result<ContactMessage, DomainError> {
    let message = ContactMessage {
        sender_name: message.sender_name.trim().to_string(),
        sender_email: message.sender_email.trim().to_string(),
        message: message.message.trim().to_string(),
    };
    if message.sender_name.is_empty() {
        return Err(DomainError::Validation("name is required".into()));
    }
    if !looks_like_email(&message.sender_email) {
        return Err(DomainError::Validation("a valid email is required".into()));
    }
    if message.message.is_empty() {
        return Err(DomainError::Validation("message is required".into()));
    }
    Ok(message)
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !s.contains(' ')
        }
        None => false,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_html(message: &ContactMessage) -> String {
    format!(
        "<h2>New contact message</h2>\
         <p><strong>Name:</strong> {}</p>\
         <p><strong>Email:</strong> {}</p>\
         <p><strong>Message:</strong></p>\
         <p>{}</p>",
        escape_html(&message.sender_name),
        escape_html(&message.sender_email),
        escape_html(&message.message).replace('\n', "<br>")
    )
}
