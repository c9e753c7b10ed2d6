//! # Credentials
//!
//! A credential is issued by a host over an exposure (the part that is
//! disclosed when it is shown) and a set of hidden exponents:
//!
//! ```text
//! c^e · ab^b · au^u · ai^i · av^v = ao^o   (mod n),   o = H(exposure)
//! ```
//!
//! - `u` is the holder secret, shared by every credential of the holder.
//! - `v` identifies the subject. For identity-based credentials shown by
//!   their subject it is `H(subject)` and gets disclosed.
//! - `i` identifies the credential. One-time credentials disclose it so that
//!   a verifier can detect reuse.
//!
//! Issuance lives outside this crate; credentials are consumed read-only.

use std::sync::Arc;

use idw_block::{boolean, fixed, selfcontained, string, Block, Tuple};
use idw_core::{BlockDigest, EncodingError, Identifier, Timestamp, TypeRegistry, WireError};
use idw_crypto::{Element, Exponent, PublicKey};

use crate::types;

/// Who holds the secret `u` of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Holder {
    /// A client keeps the secret.
    Client,
    /// A host keeps the secret on behalf of its users.
    Host,
}

// ---------------------------------------------------------------------------
// Exposure
// ---------------------------------------------------------------------------

/// The disclosed part of a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exposure {
    issuer: Identifier,
    issuance: Timestamp,
    permissions: Option<String>,
    role: Option<String>,
    attribute: Option<Block>,
    one_time: bool,
}

impl Exposure {
    /// An identity-based, reusable exposure.
    pub fn new(issuer: Identifier, issuance: Timestamp) -> Self {
        Self {
            issuer,
            issuance,
            permissions: None,
            role: None,
            attribute: None,
            one_time: false,
        }
    }

    /// Grant a comma-separated permission list.
    pub fn with_permissions(mut self, permissions: impl Into<String>) -> Self {
        self.permissions = Some(permissions.into());
        self
    }

    /// Grant a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Certify an attribute, which makes the credential attribute-based.
    pub fn with_attribute(mut self, attribute: &Block) -> Self {
        self.attribute = Some(selfcontained::encode(attribute));
        self
    }

    /// Make the credential one-time.
    pub fn one_time(mut self) -> Self {
        self.one_time = true;
        self
    }

    /// The issuing host.
    pub fn issuer(&self) -> &Identifier {
        &self.issuer
    }

    /// When the credential was issued.
    pub fn issuance(&self) -> Timestamp {
        self.issuance
    }

    /// The permission list.
    pub fn permissions(&self) -> Option<&str> {
        self.permissions.as_deref()
    }

    /// True if `permission` appears in the permission list.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_deref()
            .is_some_and(|list| list.split(',').any(|p| p.trim() == permission))
    }

    /// The role.
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// The self-contained attribute envelope.
    pub fn attribute(&self) -> Option<&Block> {
        self.attribute.as_ref()
    }

    /// The attribute, typed through `registry`.
    pub fn attribute_payload(&self, registry: &dyn TypeRegistry) -> Result<Option<Block>, EncodingError> {
        self.attribute
            .as_ref()
            .map(|envelope| selfcontained::decode(envelope, registry))
            .transpose()
    }

    /// True if the credential certifies no attribute.
    pub fn is_identity_based(&self) -> bool {
        self.attribute.is_none()
    }

    /// True if the credential grants a role.
    pub fn is_role_based(&self) -> bool {
        self.role.is_some()
    }

    /// True for one-time credentials.
    pub fn is_one_time(&self) -> bool {
        self.one_time
    }

    /// `o = H(exposure)`.
    pub fn exponent(&self) -> Result<Exponent, EncodingError> {
        Ok(Exponent::from_digest(&self.to_block()?.digest()))
    }

    pub(crate) fn to_block(&self) -> Result<Block, EncodingError> {
        let tuple = Tuple::new(
            types::exposure(),
            vec![
                Some(string::encode_identifier(types::identifier(), &self.issuer)?),
                Some(fixed::encode_as(types::time(), self.issuance.as_millis())?),
                self.permissions.as_deref().map(string::encode),
                self.role.as_deref().map(string::encode),
                self.attribute.clone(),
                Some(boolean::encode(self.one_time)),
            ],
        )?;
        Ok(tuple.into_block())
    }

    pub(crate) fn decode(block: &Block) -> Result<Self, EncodingError> {
        let tuple = Tuple::decode(block)?;
        Ok(Self {
            issuer: string::decode_identifier(tuple.require(0, "issuer")?)?,
            issuance: Timestamp::from_millis(fixed::decode(tuple.require(1, "issuance")?)?)?,
            permissions: tuple.get(2).map(string::decode).transpose()?.map(str::to_owned),
            role: tuple.get(3).map(string::decode).transpose()?.map(str::to_owned),
            attribute: tuple.get(4).cloned(),
            one_time: boolean::decode(tuple.require(5, "one-time flag")?)?,
        })
    }
}

/// `v` of an identity-based credential shown by its subject.
pub fn subject_exponent(subject: &Identifier) -> Exponent {
    Exponent::from_digest(&BlockDigest::of(subject.as_str().as_bytes()))
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// The secret values of a credential as handed out by its issuer.
#[derive(Clone)]
pub struct CredentialSecrets {
    /// The `e`-th root `c`.
    pub c: Element,
    /// The per-credential exponent `e`.
    pub e: Exponent,
    /// The blinding `b`.
    pub b: Exponent,
    /// The holder secret `u`.
    pub u: Exponent,
    /// The credential identifier `i`.
    pub i: Exponent,
    /// The subject value `v`.
    pub v: Exponent,
}

/// A credential ready to be shown.
#[derive(Clone)]
pub struct Credential {
    exposure: Exposure,
    public: Arc<PublicKey>,
    holder: Holder,
    secrets: CredentialSecrets,
}

impl Credential {
    /// Accept a credential from its issuer, checking the credential equation
    /// under the issuer key `public`.
    ///
    /// # Errors
    ///
    /// [`WireError::InvalidCredentials`] if the equation does not hold.
    pub fn new(
        exposure: Exposure,
        public: Arc<PublicKey>,
        holder: Holder,
        secrets: CredentialSecrets,
    ) -> Result<Self, WireError> {
        if secrets.c.group() != public.composite_group() {
            return Err(WireError::InvalidCredentials(format!(
                "credential from {} lives outside the issuer group",
                exposure.issuer
            )));
        }
        let lhs = secrets
            .c
            .pow(&secrets.e)?
            .multiply(&public.ab().pow(&secrets.b)?)?
            .multiply(&public.au().pow(&secrets.u)?)?
            .multiply(&public.ai().pow(&secrets.i)?)?
            .multiply(&public.av().pow(&secrets.v)?)?;
        let rhs = public.ao().pow(&exposure.exponent()?)?;
        if lhs != rhs {
            return Err(WireError::InvalidCredentials(format!(
                "credential from {} does not satisfy the issuer key",
                exposure.issuer
            )));
        }
        Ok(Self {
            exposure,
            public,
            holder,
            secrets,
        })
    }

    /// The disclosed part.
    pub fn exposure(&self) -> &Exposure {
        &self.exposure
    }

    /// The issuer key the credential was issued under.
    pub fn public_key(&self) -> &Arc<PublicKey> {
        &self.public
    }

    /// Who holds `u`.
    pub fn holder(&self) -> Holder {
        self.holder
    }

    pub(crate) fn secrets(&self) -> &CredentialSecrets {
        &self.secrets
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("exposure", &self.exposure)
            .field("holder", &self.holder)
            .field("secrets", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Hidden};
    use idw_core::{syntax, MemoryTypeRegistry};

    #[test]
    fn test_exposure_roundtrip() {
        let exposure = Exposure::new(fixtures::issuer(), Timestamp::now())
            .with_permissions("read, write")
            .with_role("admin")
            .with_attribute(&string::encode("over 18"))
            .one_time();
        let decoded = Exposure::decode(&exposure.to_block().unwrap()).unwrap();
        assert_eq!(decoded, exposure);
        assert_eq!(decoded.exponent().unwrap(), exposure.exponent().unwrap());
        let attribute = decoded.attribute_payload(&MemoryTypeRegistry::new()).unwrap().unwrap();
        assert_eq!(attribute.ty(), syntax::string());
        assert!(decoded.has_permission("write"));
        assert!(!decoded.has_permission("delete"));
    }

    #[test]
    fn test_exposure_exponent_covers_every_field() {
        let base = Exposure::new(fixtures::issuer(), Timestamp::from_millis(10).unwrap());
        let exponents = [
            base.clone(),
            base.clone().with_role("admin"),
            base.clone().with_permissions("read"),
            base.clone().one_time(),
        ]
        .map(|e| e.exponent().unwrap());
        for (i, a) in exponents.iter().enumerate() {
            for b in &exponents[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_issued_credential_satisfies_equation() {
        let pair = fixtures::issuer_pair();
        let exposure = Exposure::new(fixtures::issuer(), Timestamp::now());
        let credential = fixtures::issue(
            &pair,
            exposure,
            &Hidden::new(Exponent::from_u64(7), Exponent::from_u64(9)),
            Holder::Client,
        );
        assert_eq!(credential.holder(), Holder::Client);
        assert!(format!("{credential:?}").contains("redacted"));
    }

    #[test]
    fn test_tampered_credential_rejected() {
        let pair = fixtures::issuer_pair();
        let exposure = Exposure::new(fixtures::issuer(), Timestamp::now());
        let credential = fixtures::issue(
            &pair,
            exposure,
            &Hidden::new(Exponent::from_u64(7), Exponent::from_u64(9)),
            Holder::Client,
        );
        let mut secrets = credential.secrets().clone();
        secrets.u = Exponent::from_u64(8);
        assert!(matches!(
            Credential::new(
                credential.exposure().clone(),
                Arc::clone(credential.public_key()),
                Holder::Client,
                secrets
            ),
            Err(WireError::InvalidCredentials(_))
        ));
    }
}
