use thiserror::Error;

/// Printed to stdout when the recipient arguments are rejected.
pub const USAGE: &str =
    "Usage: feedmail daemon|cron [--verbose] email1@example.com .. emailN@example.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("at least one recipient address is required")]
    NoRecipients,
    #[error("'{0}' is not an email address")]
    InvalidAddress(String),
}

/// Validated, non-empty list of notification recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients(Vec<String>);

impl Recipients {
    /// Validate command-line recipient tokens.
    ///
    /// Every token must contain `@`. A single bad token rejects the whole
    /// list so a partial list never reaches a pass.
    pub fn parse<I, S>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut recipients = Vec::new();
        for arg in args {
            let arg = arg.into();
            if !arg.contains('@') {
                return Err(UsageError::InvalidAddress(arg));
            }
            recipients.push(arg);
        }

        if recipients.is_empty() {
            return Err(UsageError::NoRecipients);
        }
        Ok(Self(recipients))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
