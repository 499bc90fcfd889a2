//! Customer email addresses.
//!
//! Emails key the `accounts` collection and travel with orders, stockist
//! requests and subscriptions. Only the shape is checked here; deliverability
//! is not.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string was rejected as an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    #[error("email must contain exactly one @ symbol")]
    MultipleAtSymbols,
    #[error("email needs something before the @")]
    EmptyLocalPart,
    #[error("email needs a domain after the @")]
    EmptyDomain,
}

/// A syntactically valid email address: `local@domain`, at most
/// [`Email::MAX_LENGTH`] bytes.
///
/// Deserializing runs the same checks as [`Email::parse`], so a malformed
/// address in a stored document fails to load instead of reaching an account
/// lookup.
///
/// ```
/// use corewell_core::Email;
///
/// assert!(Email::parse("orders@corewell.co.za").is_ok());
/// assert!(Email::parse("orders@").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Validate `s` as written.
    ///
    /// # Errors
    ///
    /// Returns the first [`EmailError`] the input trips.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if domain.contains('@') {
            return Err(EmailError::MultipleAtSymbols);
        }
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }

        Ok(Self(s.to_owned()))
    }

    /// Trim and lower-case before validating.
    ///
    /// Form input goes through here so that `Buyer@CoreWell.co.za ` and
    /// `buyer@corewell.co.za` name the same account.
    ///
    /// # Errors
    ///
    /// Same as [`Email::parse`].
    pub fn normalized(s: &str) -> Result<Self, EmailError> {
        Self::parse(&s.trim().to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_store_addresses() {
        for ok in [
            "buyer@corewell.co.za",
            "stockist+gauteng@pharmacy.example",
            "a@b",
        ] {
            assert!(Email::parse(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn test_rejections() {
        let cases = [
            ("", EmailError::Empty),
            ("corewell.co.za", EmailError::MissingAtSymbol),
            ("a@b@corewell.co.za", EmailError::MultipleAtSymbols),
            ("@corewell.co.za", EmailError::EmptyLocalPart),
            ("buyer@", EmailError::EmptyDomain),
        ];
        for (input, expected) in cases {
            assert_eq!(Email::parse(input), Err(expected), "{input:?}");
        }

        let long = format!("{}@corewell.co.za", "a".repeat(250));
        assert_eq!(
            Email::parse(&long),
            Err(EmailError::TooLong { max: Email::MAX_LENGTH })
        );
    }

    #[test]
    fn test_normalized_trims_and_lowercases() {
        let email = Email::normalized("  Buyer@CoreWell.co.za ").unwrap();
        assert_eq!(email.as_str(), "buyer@corewell.co.za");
        assert_eq!(email.to_string(), "buyer@corewell.co.za");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let email = Email::parse("buyer@corewell.co.za").unwrap();
        assert_eq!(
            serde_json::to_string(&email).unwrap(),
            "\"buyer@corewell.co.za\""
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Email = serde_json::from_str("\"buyer@corewell.co.za\"").unwrap();
        assert_eq!(ok.as_str(), "buyer@corewell.co.za");
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
    }
}
