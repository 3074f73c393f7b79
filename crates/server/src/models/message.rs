//! Contact form message domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mp_records_core::{Email, MessageId};

use super::{ValidationError, non_blank, required};

/// Longest accepted message body, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

const DEFAULT_SUBJECT: &str = "Kontakt";

/// A message sent through the contact form.
///
/// Only the `read` flag changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub email: Email,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub read: bool,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// # Errors
    ///
    /// Returns `ValidationError` if the body is blank or too long.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_body(&self.body)
    }
}

/// Contact form submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageDraft {
    pub email: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

impl MessageDraft {
    /// # Errors
    ///
    /// Returns `ValidationError` if the email is missing or malformed, or the
    /// body is missing or longer than [`MAX_MESSAGE_LENGTH`] characters.
    pub fn into_message(self, now: DateTime<Utc>) -> Result<Message, ValidationError> {
        let email = required(self.email, "email")?;
        let email = Email::parse(&email)
            .map_err(|_| ValidationError::new("please provide a valid email address"))?;
        let body = required(self.body, "message")?;
        validate_body(&body)?;

        Ok(Message {
            id: MessageId::new(),
            email,
            subject: non_blank(self.subject).unwrap_or_else(|| DEFAULT_SUBJECT.to_owned()),
            body,
            read: false,
            sent_at: now,
        })
    }
}

fn validate_body(body: &str) -> Result<(), ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::new("message is required"));
    }
    if body.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ValidationError(format!(
            "message can be at most {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft(body: &str) -> MessageDraft {
        MessageDraft {
            email: Some("Fan@Example.com".to_string()),
            subject: None,
            body: Some(body.to_string()),
        }
    }

    #[test]
    fn test_defaults_subject_and_normalizes_email() {
        let message = draft("Cześć!").into_message(Utc::now()).unwrap();
        assert_eq!(message.subject, "Kontakt");
        assert_eq!(message.email.as_str(), "fan@example.com");
        assert!(!message.read);
    }

    #[test]
    fn test_body_limit_counts_characters() {
        let exact = "ż".repeat(MAX_MESSAGE_LENGTH);
        assert!(draft(&exact).into_message(Utc::now()).is_ok());

        let over = "a".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(draft(&over).into_message(Utc::now()).is_err());
    }

    #[test]
    fn test_rejects_bad_email() {
        let mut d = draft("hi");
        d.email = Some("not-an-email".to_string());
        assert!(d.into_message(Utc::now()).is_err());
    }
}
