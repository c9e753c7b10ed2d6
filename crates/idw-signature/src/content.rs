//! # Signed Content
//!
//! The tuple every signature covers: `(subject?, time?, element?, audit?)`.
//! The audit slot holds a self-contained envelope so that any type of audit
//! request can ride along.
//!
//! ## Invariants
//!
//! - A signed content has a subject.
//! - A content with a subject has a time, and the time is strictly positive.

use idw_block::{fixed, selfcontained, string, Block, Tuple};
use idw_core::{EncodingError, Identifier, SemanticType, Timestamp, TypeRegistry};

use crate::types;

/// The content of a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    subject: Option<Identifier>,
    time: Option<Timestamp>,
    element: Option<Block>,
    audit: Option<Block>,
}

impl Content {
    /// Content without subject or time, as carried by unsigned signatures.
    pub fn anonymous(element: Block) -> Self {
        Self {
            subject: None,
            time: None,
            element: Some(element),
            audit: None,
        }
    }

    /// Content attributed to `subject` at `time`.
    pub fn new(subject: Identifier, time: Timestamp, element: Block) -> Self {
        Self {
            subject: Some(subject),
            time: Some(time),
            element: Some(element),
            audit: None,
        }
    }

    /// Attach an audit request, wrapped in a self-contained envelope.
    pub fn with_audit(mut self, audit: &Block) -> Self {
        self.audit = Some(selfcontained::encode(audit));
        self
    }

    /// Drop the element, keeping subject, time and audit.
    pub fn without_element(mut self) -> Self {
        self.element = None;
        self
    }

    /// The subject.
    pub fn subject(&self) -> Option<&Identifier> {
        self.subject.as_ref()
    }

    /// The time.
    pub fn time(&self) -> Option<Timestamp> {
        self.time
    }

    /// The signed element.
    pub fn element(&self) -> Option<&Block> {
        self.element.as_ref()
    }

    /// The audit envelope.
    pub fn audit(&self) -> Option<&Block> {
        self.audit.as_ref()
    }

    /// The audit request, typed through `registry`.
    pub fn audit_payload(&self, registry: &dyn TypeRegistry) -> Result<Option<Block>, EncodingError> {
        self.audit
            .as_ref()
            .map(|envelope| selfcontained::decode(envelope, registry))
            .transpose()
    }

    /// The subject, or [`EncodingError::MissingElement`].
    pub fn require_subject(&self) -> Result<&Identifier, EncodingError> {
        self.subject
            .as_ref()
            .ok_or_else(|| EncodingError::MissingElement("subject of signed content".into()))
    }

    /// The time, or [`EncodingError::MissingElement`].
    pub fn require_time(&self) -> Result<Timestamp, EncodingError> {
        self.time
            .ok_or_else(|| EncodingError::MissingElement("time of signed content".into()))
    }

    /// Check the subject and time invariants. `signed` requires a subject.
    pub fn validate(&self, signed: bool) -> Result<(), EncodingError> {
        if signed {
            self.require_subject()?;
        }
        if self.subject.is_some() {
            let time = self.require_time()?;
            if !time.is_positive() {
                return Err(EncodingError::InvalidValue(format!(
                    "content time {} must be positive",
                    time.as_millis()
                )));
            }
        }
        Ok(())
    }

    /// Encode as a content tuple for elements of `element_type`.
    pub fn to_block(&self, element_type: &SemanticType) -> Result<Block, EncodingError> {
        let subject = self
            .subject
            .as_ref()
            .map(|subject| string::encode_identifier(types::identifier(), subject))
            .transpose()?;
        let time = self
            .time
            .map(|time| fixed::encode_as(types::time(), time.as_millis()))
            .transpose()?;
        let tuple = Tuple::new(
            &types::content(element_type),
            vec![subject, time, self.element.clone(), self.audit.clone()],
        )?;
        Ok(tuple.into_block())
    }

    /// Decode a content tuple.
    pub fn decode(block: &Block) -> Result<Self, EncodingError> {
        let tuple = Tuple::decode(block)?;
        let subject = tuple.get(0).map(string::decode_identifier).transpose()?;
        let time = tuple
            .get(1)
            .map(|time| fixed::decode::<i64>(time).and_then(Timestamp::from_millis))
            .transpose()?;
        Ok(Self {
            subject,
            time,
            element: tuple.get(2).cloned(),
            audit: tuple.get(3).cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idw_core::{syntax, MemoryTypeRegistry};

    fn alice() -> Identifier {
        Identifier::new("alice@example.org").unwrap()
    }

    #[test]
    fn test_roundtrip_with_audit() {
        let content = Content::new(alice(), Timestamp::from_millis(1_700_000_000_000).unwrap(), string::encode("hi"))
            .with_audit(&fixed::encode(7_i32));
        let block = content.to_block(syntax::string()).unwrap();
        let decoded = Content::decode(&block).unwrap();
        assert_eq!(decoded, content);
        assert_eq!(string::decode(decoded.element().unwrap()).unwrap(), "hi");
        let audit = decoded.audit_payload(&MemoryTypeRegistry::new()).unwrap().unwrap();
        assert_eq!(fixed::decode::<i32>(&audit).unwrap(), 7);
    }

    #[test]
    fn test_signed_requires_subject() {
        let content = Content::anonymous(string::encode("x"));
        assert!(content.validate(false).is_ok());
        assert!(matches!(content.validate(true), Err(EncodingError::MissingElement(_))));
    }

    #[test]
    fn test_subject_requires_positive_time() {
        let mut content = Content::new(alice(), Timestamp::from_millis(0).unwrap(), string::encode("x"));
        assert!(matches!(content.validate(true), Err(EncodingError::InvalidValue(_))));
        content.time = None;
        assert!(matches!(content.validate(false), Err(EncodingError::MissingElement(_))));
    }

    #[test]
    fn test_element_type_enforced() {
        let content = Content::anonymous(fixed::encode(1_i64));
        assert!(matches!(
            content.to_block(syntax::string()),
            Err(EncodingError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_digest_depends_on_every_slot() {
        let time = Timestamp::from_millis(5).unwrap();
        let base = Content::new(alice(), time, string::encode("x"));
        let digest = |c: &Content| c.to_block(syntax::string()).unwrap().digest();
        let other_time = Content::new(alice(), Timestamp::from_millis(6).unwrap(), string::encode("x"));
        let without = base.clone().without_element();
        assert_ne!(digest(&base), digest(&other_time));
        assert_ne!(digest(&base), digest(&without));
    }
}
