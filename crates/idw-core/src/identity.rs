//! # Identifiers
//!
//! Newtype for the identifiers that appear in signed content: signature
//! subjects, signing hosts, credential issuers and encryption recipients.
//!
//! An identifier is either a host (`example.org`) or an entity at a host
//! (`alice@example.org`). Resolving an identifier to an entity lives outside
//! the wire layer; here it is only validated and compared.

use serde::{Deserialize, Serialize};

use crate::error::EncodingError;

/// A validated host or entity identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Validate and wrap an identifier string.
    ///
    /// # Errors
    ///
    /// Rejects empty strings, whitespace or control characters, more than one
    /// `@`, and an empty local or host part.
    pub fn new(value: impl Into<String>) -> Result<Self, EncodingError> {
        let value = value.into();
        if value.is_empty() {
            return Err(EncodingError::InvalidValue("identifier must not be empty".into()));
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(EncodingError::InvalidValue(format!(
                "identifier {value:?} contains whitespace"
            )));
        }
        let mut parts = value.split('@');
        let first = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) => {}
            (Some(host), None) if !first.is_empty() && !host.is_empty() => {}
            _ => {
                return Err(EncodingError::InvalidValue(format!(
                    "identifier {value:?} is not of the form host or name@host"
                )))
            }
        }
        Ok(Self(value))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this identifier denotes a host rather than an entity at a host.
    pub fn is_host(&self) -> bool {
        !self.0.contains('@')
    }

    /// The host part of the identifier.
    pub fn host(&self) -> Identifier {
        match self.0.split_once('@') {
            Some((_, host)) => Identifier(host.to_string()),
            None => self.clone(),
        }
    }
}

impl TryFrom<String> for Identifier {
    type Error = EncodingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_identifier() {
        let id = Identifier::new("example.org").unwrap();
        assert!(id.is_host());
        assert_eq!(id.host(), id);
    }

    #[test]
    fn test_entity_identifier_host_part() {
        let id = Identifier::new("alice@example.org").unwrap();
        assert!(!id.is_host());
        assert_eq!(id.host().as_str(), "example.org");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new("a b@example.org").is_err());
        assert!(Identifier::new("@example.org").is_err());
        assert!(Identifier::new("alice@").is_err());
        assert!(Identifier::new("a@b@c").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let id: Identifier = serde_json::from_str("\"bob@example.org\"").unwrap();
        assert_eq!(id.as_str(), "bob@example.org");
        assert!(serde_json::from_str::<Identifier>("\"a@b@c\"").is_err());
    }
}
