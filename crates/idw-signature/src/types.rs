//! # Signature Types
//!
//! The semantic types of signed content and the three authenticity tags.
//! Layouts, with `?` marking optional slots:
//!
//! ```text
//! content       (subject?, time?, element?, audit?)
//! host tag      (signer, value)
//! client tag    (commitment(host, time, value), t, s)
//! credentials   (t, su, sv?, proofs, certificates?, shortening?)
//! proof         (exposure, c', se, sb, i?, si?, lodged i?, lodged v?)
//! exposure      (issuer, issuance, permissions?, role?, attribute?, one_time)
//! lodging       (W1, W2, sr)
//! shortening    (recipient, f', sw)
//! ```

use std::sync::OnceLock;

use idw_block::{bytes, Block};
use idw_core::{syntax, BlockDigest, EncodingError, SemanticType, DIGEST_LENGTH};

macro_rules! derived_type {
    ($(#[$doc:meta])* $name:ident => $identifier:literal, $base:expr) => {
        $(#[$doc])*
        pub fn $name() -> &'static SemanticType {
            static TYPE: OnceLock<SemanticType> = OnceLock::new();
            TYPE.get_or_init(|| SemanticType::based_on($identifier, $base))
        }
    };
    ($(#[$doc:meta])* $name:ident => $identifier:literal, $base:expr, [$($parameter:expr),+ $(,)?]) => {
        $(#[$doc])*
        pub fn $name() -> &'static SemanticType {
            static TYPE: OnceLock<SemanticType> = OnceLock::new();
            TYPE.get_or_init(|| {
                SemanticType::with_parameters($identifier, $base, vec![$($parameter.clone()),+])
            })
        }
    };
}

derived_type!(/// A host or entity identifier.
    identifier => "identifier@core.idw", syntax::string());
derived_type!(/// Milliseconds since the Unix epoch.
    time => "time@core.idw", syntax::int64());

derived_type!(/// `(signer, value)` of a host signature.
    host_tag => "host-signature@core.idw", syntax::tuple(),
    [identifier(), syntax::integer()]);
derived_type!(/// `(host, time, au^u)` binding a client secret to a host key.
    commitment => "client-commitment@core.idw", syntax::tuple(),
    [identifier(), time(), syntax::integer()]);
derived_type!(/// `(commitment, t, s)` of a client signature.
    client_tag => "client-signature@core.idw", syntax::tuple(),
    [commitment(), syntax::bytes(), syntax::integer()]);

derived_type!(/// The disclosed part of a credential.
    exposure => "credential-exposure@core.idw", syntax::tuple(),
    [identifier(), time(), syntax::string(), syntax::string(), syntax::selfcontained(), syntax::boolean()]);
derived_type!(/// `(W1, W2, sr)` of a lodged value.
    lodging => "lodged-value@core.idw", syntax::tuple(),
    [syntax::integer(), syntax::integer(), syntax::integer()]);
derived_type!(/// The per-credential part of a credentials proof.
    credential_proof => "credential-proof@core.idw", syntax::tuple(),
    [
        exposure(),
        syntax::integer(),
        syntax::integer(),
        syntax::integer(),
        syntax::integer(),
        syntax::integer(),
        lodging(),
        lodging(),
    ]);
derived_type!(/// The credential proofs in order.
    credential_proofs => "credential-proofs@core.idw", syntax::list(),
    [credential_proof()]);
derived_type!(/// A host signature vouching for a credential issuer.
    certificate => "certificate@core.idw", syntax::signature(),
    [syntax::selfcontained()]);
derived_type!(/// Certificates of the credential issuer.
    certificates => "certificates@core.idw", syntax::list(),
    [certificate()]);
derived_type!(/// `(recipient, f', sw)` of a shortened credentials signature.
    shortening => "shortening@core.idw", syntax::tuple(),
    [identifier(), syntax::integer(), syntax::integer()]);
derived_type!(/// `(t, su, sv?, proofs, certificates?, shortening?)` of a credentials signature.
    credentials_tag => "credentials-signature@core.idw", syntax::tuple(),
    [
        syntax::bytes(),
        syntax::integer(),
        syntax::integer(),
        credential_proofs(),
        certificates(),
        shortening(),
    ]);
derived_type!(/// The commitments hashed into a credentials challenge.
    commitments => "credential-commitments@core.idw", syntax::list(),
    [syntax::integer()]);

/// The content type for elements of `element_type`.
pub fn content(element_type: &SemanticType) -> SemanticType {
    SemanticType::with_parameters(
        "content@core.idw",
        syntax::tuple(),
        vec![
            identifier().clone(),
            time().clone(),
            element_type.clone(),
            syntax::selfcontained().clone(),
        ],
    )
}

/// A signature type over elements of `element_type`.
pub fn signature_of(identifier: impl Into<String>, element_type: &SemanticType) -> SemanticType {
    SemanticType::with_parameters(identifier, syntax::signature(), vec![element_type.clone()])
}

/// Decode a challenge `t` carried as a bytes block.
pub(crate) fn decode_challenge(block: &Block) -> Result<BlockDigest, EncodingError> {
    let t = bytes::decode(block)?;
    let t: [u8; DIGEST_LENGTH] = t
        .try_into()
        .map_err(|_| EncodingError::InvalidValue(format!("challenge has {} bytes", t.len())))?;
    Ok(BlockDigest(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_types_are_tuples() {
        for ty in [host_tag(), client_tag(), credentials_tag(), credential_proof(), exposure()] {
            assert!(ty.is_based_on(syntax::tuple()), "{ty}");
        }
        assert_eq!(credential_proof().parameters().len(), 8);
    }

    #[test]
    fn test_certificate_is_a_signature() {
        assert!(certificate().is_based_on(syntax::signature()));
        assert_eq!(certificate().single_parameter().unwrap(), syntax::selfcontained());
    }

    #[test]
    fn test_content_carries_element_type() {
        let content = content(syntax::string());
        assert_eq!(&content.parameters()[2], syntax::string());
        assert!(identifier().is_based_on(syntax::string()));
    }
}
