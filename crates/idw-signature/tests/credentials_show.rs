//! Credentials signatures end to end: showing identity- and attribute-based
//! credentials, lodging with issuer recovery, shortening, certificates and
//! the authorization helpers.

use idw_signature::fixtures::{alice, host, issue, issuer, issuer_pair, note, note_content, ring, Hidden};
use idw_block::{selfcontained, string};
use idw_core::{Timestamp, WireConfig, WireError};
use idw_crypto::{Exponent, PublicKeyLookup};
use idw_signature::{
    subject_exponent, types, Content, Credential, CredentialsRequest, CredentialsSignature, Exposure,
    Holder, Signature, SignatureWrapper, Verifier, Verify,
};
use proptest::prelude::*;
use rand::rngs::OsRng;
use std::time::Duration;

fn show(request: &CredentialsRequest, content: Content) -> SignatureWrapper {
    let ring = ring();
    let config = WireConfig::default();
    let signed =
        SignatureWrapper::sign_credentials(&note(), content, request, &ring, &config, &mut OsRng).unwrap();
    SignatureWrapper::decode(signed.block(), Verify::Immediately, &Verifier::new(&ring, &config)).unwrap()
}

fn tag(wrapper: &SignatureWrapper) -> &CredentialsSignature {
    match wrapper.signature() {
        Signature::Credentials(tag) => tag,
        other => panic!("expected a credentials signature, got {}", other.kind()),
    }
}

fn identity_credential(exposure: Exposure, v: Exponent) -> (Credential, Hidden) {
    let hidden = Hidden::random(v);
    (issue(&issuer_pair(), exposure, &hidden, Holder::Client), hidden)
}

fn attribute(value: &str) -> Exposure {
    Exposure::new(issuer(), Timestamp::now()).with_attribute(&string::encode(value))
}

// =========================================================================
// Identity-based credentials
// =========================================================================

#[test]
fn test_role_based_credential_shows_role() {
    let exposure = Exposure::new(issuer(), Timestamp::now()).with_role("auditor");
    let (credential, _) = identity_credential(exposure, subject_exponent(&alice()));
    let request = CredentialsRequest::new(vec![credential]).unwrap();

    let decoded = show(&request, note_content("hello"));
    let signature = tag(&decoded);
    signature.require_role("auditor").unwrap();
    signature.require_issuer(&issuer()).unwrap();
    assert!(matches!(signature.require_role("admin"), Err(WireError::Authorization(_))));
    assert!(matches!(
        signature.require_issuer(&host()),
        Err(WireError::Authorization(_))
    ));
}

#[test]
fn test_permissions_are_checked_by_name() {
    let exposure = Exposure::new(issuer(), Timestamp::now()).with_permissions("read,write");
    let (credential, _) = identity_credential(exposure, Exponent::from_u64(99));
    let request = CredentialsRequest::new(vec![credential]).unwrap();
    let decoded = show(&request, note_content("hello"));
    tag(&decoded).require_permission("write").unwrap();
    assert!(matches!(
        tag(&decoded).require_permission("delete"),
        Err(WireError::Authorization(_))
    ));
}

#[test]
fn test_tampered_content_is_rejected() {
    let ring = ring();
    let config = WireConfig::default();
    let exposure = Exposure::new(issuer(), Timestamp::now()).with_role("auditor");
    let (credential, _) = identity_credential(exposure, subject_exponent(&alice()));
    let request = CredentialsRequest::new(vec![credential]).unwrap();
    let signed =
        SignatureWrapper::sign_credentials(&note(), note_content("hello"), &request, &ring, &config, &mut OsRng)
            .unwrap();

    let mut bytes = signed.block().to_vec();
    let position = bytes.windows(5).position(|w| w == b"hello").unwrap();
    bytes[position] ^= 0x01;
    let tampered = idw_block::Block::new(note(), bytes).unwrap();
    assert!(matches!(
        SignatureWrapper::decode(&tampered, Verify::Immediately, &Verifier::new(&ring, &config)),
        Err(WireError::InvalidSignature(_))
    ));
}

#[test]
fn test_stale_credential_is_inactive() {
    let ring = ring();
    let config = WireConfig::default();
    let issued = Timestamp::now().saturating_sub(Duration::from_secs(2 * 3_600));
    let exposure = Exposure::new(issuer(), issued).with_role("auditor");
    let (credential, _) = identity_credential(exposure, subject_exponent(&alice()));
    let request = CredentialsRequest::new(vec![credential]).unwrap();
    let signed =
        SignatureWrapper::sign_credentials(&note(), note_content("hello"), &request, &ring, &config, &mut OsRng)
            .unwrap();

    let now = Verifier::new(&ring, &config);
    assert!(matches!(
        SignatureWrapper::decode(signed.block(), Verify::Immediately, &now),
        Err(WireError::InactiveSignature(_))
    ));
    let back_then = now.at(issued.saturating_add(Duration::from_secs(60)));
    SignatureWrapper::decode(signed.block(), Verify::Immediately, &back_then).unwrap();
}

// =========================================================================
// Attribute-based credentials
// =========================================================================

#[test]
fn test_attribute_credentials_must_share_secrets() {
    let pair = issuer_pair();
    let hidden = Hidden::random(Exponent::from_u64(5));
    let other = Hidden::random(Exponent::from_u64(5));
    let first = issue(&pair, attribute("over 18"), &hidden, Holder::Client);
    let stranger = issue(&pair, attribute("resident"), &other, Holder::Client);
    assert!(matches!(
        CredentialsRequest::new(vec![first.clone(), stranger]),
        Err(WireError::InvalidCredentials(_))
    ));

    let hosted = issue(&pair, attribute("resident"), &hidden, Holder::Host);
    assert!(matches!(
        CredentialsRequest::new(vec![first, hosted]),
        Err(WireError::InvalidCredentials(_))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(4))]

    #[test]
    fn test_attribute_credentials_show(count in 1usize..=3, text in "[a-z]{1,12}", one_time in any::<bool>()) {
        let pair = issuer_pair();
        let hidden = Hidden::random(Exponent::from_u64(17));
        let credentials = (0..count)
            .map(|k| {
                let mut exposure = attribute(&format!("attribute {k}"));
                if one_time {
                    exposure = exposure.one_time();
                }
                let per_credential = hidden.with_identifier(Exponent::random(256, &mut OsRng));
                issue(&pair, exposure, &per_credential, Holder::Client)
            })
            .collect();
        let request = CredentialsRequest::new(credentials).unwrap();

        let decoded = show(&request, note_content(&text));
        let signature = tag(&decoded);
        prop_assert_eq!(signature.proofs().len(), count);
        for proof in signature.proofs() {
            prop_assert_eq!(proof.disclosed_identifier().is_some(), one_time);
            let payload = proof
                .exposure()
                .attribute_payload(&idw_core::MemoryTypeRegistry::new())
                .unwrap()
                .unwrap();
            prop_assert!(string::decode(&payload).unwrap().starts_with("attribute"));
        }
    }
}

// =========================================================================
// Lodging
// =========================================================================

#[test]
fn test_issuer_recovers_lodged_values() {
    // Issued by issuer.org to alice@example.org: v stays hidden and is lodged.
    let exposure = Exposure::new(issuer(), Timestamp::now());
    let (credential, hidden) = identity_credential(exposure, subject_exponent(&alice()));
    let request = CredentialsRequest::new(vec![credential]).unwrap().lodged();

    let decoded = show(&request, note_content("hello"));
    let signature = tag(&decoded);
    assert!(signature.is_lodged());

    let recovered = signature.recover_lodged(0, &ring()).unwrap();
    assert_eq!(recovered.identifier, Some(hidden.i));
    assert_eq!(recovered.subject, Some(hidden.v));
    assert!(signature.recover_lodged(1, &ring()).is_err());
}

#[test]
fn test_one_time_credential_lodges_only_subject() {
    let exposure = Exposure::new(issuer(), Timestamp::now()).one_time();
    let (credential, hidden) = identity_credential(exposure, subject_exponent(&alice()));
    let request = CredentialsRequest::new(vec![credential]).unwrap().lodged();

    let decoded = show(&request, note_content("hello"));
    let signature = tag(&decoded);
    assert_eq!(signature.proofs()[0].disclosed_identifier(), Some(&hidden.i));
    let recovered = signature.recover_lodged(0, &ring()).unwrap();
    assert_eq!(recovered.identifier, None);
    assert_eq!(recovered.subject, Some(hidden.v));
}

// =========================================================================
// Shortening
// =========================================================================

#[test]
fn test_shortened_commitment_uses_recipient_key() {
    let exposure = Exposure::new(issuer(), Timestamp::now()).with_role("auditor");
    let (credential, hidden) = identity_credential(exposure, subject_exponent(&alice()));
    let w = Exponent::random(256, &mut OsRng);
    let request = CredentialsRequest::new(vec![credential])
        .unwrap()
        .shortened(host(), w.clone());

    let decoded = show(&request, note_content("hello"));
    let shortening = tag(&decoded).shortening().unwrap();
    assert_eq!(shortening.recipient(), &host());

    let public = ring().public_key(&host(), decoded.time().unwrap()).unwrap();
    let expected = public
        .au()
        .pow(&hidden.u)
        .unwrap()
        .multiply(&public.ab().pow(&w).unwrap())
        .unwrap();
    assert_eq!(shortening.value(), &expected.to_bigint());
}

// =========================================================================
// Certificates
// =========================================================================

fn certificate(subject: idw_core::Identifier) -> SignatureWrapper {
    let statement = selfcontained::encode(&string::encode("trusted issuer"));
    let content = Content::new(subject, Timestamp::now(), statement);
    SignatureWrapper::sign_host(types::certificate(), content, &host(), &ring()).unwrap()
}

#[test]
fn test_certificates_travel_with_identity_credential() {
    let exposure = Exposure::new(issuer(), Timestamp::now()).with_role("auditor");
    let (credential, _) = identity_credential(exposure, subject_exponent(&alice()));
    let request = CredentialsRequest::new(vec![credential])
        .unwrap()
        .with_certificates(vec![certificate(issuer())])
        .unwrap();

    let decoded = show(&request, note_content("hello"));
    let certificates = tag(&decoded).certificates();
    assert_eq!(certificates.len(), 1);
    certificates[0].expect_type(types::certificate()).unwrap();
}

#[test]
fn test_certificate_must_name_the_issuer() {
    let exposure = Exposure::new(issuer(), Timestamp::now()).with_role("auditor");
    let (credential, _) = identity_credential(exposure, subject_exponent(&alice()));
    let result = CredentialsRequest::new(vec![credential])
        .unwrap()
        .with_certificates(vec![certificate(host())]);
    assert!(matches!(result, Err(WireError::InvalidCredentials(_))));
}

#[test]
fn test_certificates_need_identity_credential() {
    let hidden = Hidden::random(Exponent::from_u64(3));
    let credential = issue(&issuer_pair(), attribute("over 18"), &hidden, Holder::Client);
    let result = CredentialsRequest::new(vec![credential])
        .unwrap()
        .with_certificates(vec![certificate(issuer())]);
    assert!(matches!(result, Err(WireError::InvalidCredentials(_))));
}
