//! # Credentials Signatures
//!
//! An anonymous show of one or more credentials: a non-interactive proof
//! that the signer knows credentials satisfying
//! `c^e · ab^b · au^u · ai^i · av^v = ao^o` under each issuer key, for the
//! disclosed exposures, without revealing `c`, `e`, `b` or `u`.
//!
//! ## Protocol
//!
//! Each credential is rerandomized as `c' = c·ab^r`, `b' = b − e·r`. With
//! random `re, rb, ru, ri, rv` the signer commits to
//!
//! ```text
//! f = c'^re · ab^rb · au^ru · ai^ri · av^rv
//! ```
//!
//! where `ru` (and `rv`) are shared by all credentials, which proves they
//! share `u` (and `v`). The challenge is
//! `t = H(content) ⊕ H(list of commitments)` and every response has the
//! form `s = r − t·x`. The verifier recomputes
//!
//! ```text
//! f = (ao^o · ai^(−i) · av^(−v))^t · c'^se · ab^sb · au^su · ai^si · av^sv
//! ```
//!
//! with the `ai`/`av` factors moved to the left for disclosed values and
//! dropped on the right.
//!
//! ## Disclosure
//!
//! - `i` is disclosed for one-time credentials.
//! - `v` is disclosed (as `H(subject)`) when a single identity-based
//!   credential is role-based or was issued by the subject's own host.
//!
//! ## Lodging and Shortening
//!
//! A lodged signature also verifiably encrypts every hidden `i` and `v`
//! under the issuer key, so the issuer can recover them later with
//! [`CredentialsSignature::recover_lodged`]. A shortened signature adds
//! `f' = au^u · ab^w` under a recipient host key, which the recipient can
//! keep as a compact commitment to the holder secret.
//!
//! ## Security Invariant
//!
//! Response bit lengths are checked exactly against the configured bounds.
//! An oversized response could otherwise encode the secret it blinds.

use idw_block::{bytes, integer, string, Block, List, Tuple};
use idw_core::{BlockDigest, CryptoError, EncodingError, ExponentBounds, Identifier, WireConfig, WireError};
use idw_crypto::{
    Element, Exponent, Group, PrivateKeyLookup, PublicKey, PublicKeyLookup, VerifiableEncryption,
};
use num_bigint::BigInt;
use rand::{CryptoRng, RngCore};

use crate::content::Content;
use crate::context::Verifier;
use crate::credential::{subject_exponent, Credential, Exposure};
use crate::signature::{Signature, SignatureWrapper, Verify};
use crate::types;

fn invalid(reason: impl Into<String>) -> WireError {
    WireError::InvalidCredentials(reason.into())
}

/// True if `v` is disclosed for these exposures shown by `subject`.
fn discloses_v<'a>(mut exposures: impl Iterator<Item = &'a Exposure>, subject: &Identifier) -> bool {
    match (exposures.next(), exposures.next()) {
        (Some(only), None) => {
            only.is_identity_based() && (only.is_role_based() || only.issuer() == &subject.host())
        }
        _ => false,
    }
}

/// `t = H(content) ⊕ H(commitments)`.
fn challenge(digest: &BlockDigest, commitments: &[Element]) -> Result<BlockDigest, EncodingError> {
    let elements = commitments
        .iter()
        .map(|commitment| Some(integer::encode(&commitment.to_bigint())))
        .collect();
    let list = List::new(types::commitments(), elements)?.into_block();
    Ok(digest.xor(&list.digest()))
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// What to show: the credentials and the optional extras.
#[derive(Debug)]
pub struct CredentialsRequest {
    credentials: Vec<Credential>,
    certificates: Vec<SignatureWrapper>,
    lodged: bool,
    shortening: Option<(Identifier, Exponent)>,
}

impl CredentialsRequest {
    /// Show `credentials`.
    ///
    /// # Errors
    ///
    /// [`WireError::InvalidCredentials`] for an empty list, an identity-based
    /// credential together with others, attribute-based credentials that do
    /// not share `u` and `v`, or a mix of client-held and host-held
    /// credentials.
    pub fn new(credentials: Vec<Credential>) -> Result<Self, WireError> {
        let Some(first) = credentials.first() else {
            return Err(invalid("no credentials to show"));
        };
        if credentials.len() > 1 {
            if credentials.iter().any(|c| c.exposure().is_identity_based()) {
                return Err(invalid("an identity-based credential must be shown alone"));
            }
            let shared = first.secrets();
            for other in &credentials[1..] {
                if other.secrets().u != shared.u || other.secrets().v != shared.v {
                    return Err(invalid("attribute-based credentials must share u and v"));
                }
                if other.holder() != first.holder() {
                    return Err(invalid("credentials must all be held by clients or all by hosts"));
                }
            }
        }
        Ok(Self {
            credentials,
            certificates: Vec::new(),
            lodged: false,
            shortening: None,
        })
    }

    /// Attach certificates of the credential issuer.
    ///
    /// # Errors
    ///
    /// [`WireError::InvalidCredentials`] unless a single identity-based
    /// credential is shown and every certificate is a host signature whose
    /// subject is the credential issuer.
    pub fn with_certificates(mut self, certificates: Vec<SignatureWrapper>) -> Result<Self, WireError> {
        if certificates.is_empty() {
            return Ok(self);
        }
        let [credential] = self.credentials.as_slice() else {
            return Err(invalid("certificates require a single credential"));
        };
        if !credential.exposure().is_identity_based() {
            return Err(invalid("certificates require an identity-based credential"));
        }
        let issuer = credential.exposure().issuer();
        for certificate in &certificates {
            certificate.block().expect_type(types::certificate())?;
            if !matches!(certificate.signature(), Signature::Host(_)) {
                return Err(invalid("certificates must be host signatures"));
            }
            if certificate.content().subject() != Some(issuer) {
                return Err(invalid(format!("certificate subject is not the issuer {issuer}")));
            }
        }
        self.certificates = certificates;
        Ok(self)
    }

    /// Verifiably encrypt the hidden `i` and `v` for the issuer.
    pub fn lodged(mut self) -> Self {
        self.lodged = true;
        self
    }

    /// Add `f' = au^u · ab^w` under the key of `recipient`.
    pub fn shortened(mut self, recipient: Identifier, w: Exponent) -> Self {
        self.shortening = Some((recipient, w));
        self
    }

    /// The credentials to show.
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }
}

// ---------------------------------------------------------------------------
// Wire values
// ---------------------------------------------------------------------------

/// A verifiable encryption of a hidden value and its randomness response.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Lodging {
    w1: BigInt,
    w2: BigInt,
    sr: Exponent,
}

impl Lodging {
    fn to_block(&self) -> Result<Block, EncodingError> {
        let tuple = Tuple::new(
            types::lodging(),
            vec![
                Some(integer::encode(&self.w1)),
                Some(integer::encode(&self.w2)),
                Some(integer::encode(self.sr.as_bigint())),
            ],
        )?;
        Ok(tuple.into_block())
    }

    fn decode(block: &Block) -> Result<Self, EncodingError> {
        let tuple = Tuple::decode(block)?;
        Ok(Self {
            w1: integer::decode(tuple.require(0, "W1")?)?,
            w2: integer::decode(tuple.require(1, "W2")?)?,
            sr: integer::decode_exponent(tuple.require(2, "lodging response")?)?,
        })
    }
}

/// The part of a credentials signature that concerns one credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialProof {
    exposure: Exposure,
    c: BigInt,
    se: Exponent,
    sb: Exponent,
    i: Option<Exponent>,
    si: Option<Exponent>,
    lodged_i: Option<Lodging>,
    lodged_v: Option<Lodging>,
}

impl CredentialProof {
    /// The disclosed exposure.
    pub fn exposure(&self) -> &Exposure {
        &self.exposure
    }

    /// The credential identifier `i`, disclosed for one-time credentials.
    pub fn disclosed_identifier(&self) -> Option<&Exponent> {
        self.i.as_ref()
    }

    /// True if hidden values were lodged with the issuer.
    pub fn is_lodged(&self) -> bool {
        self.lodged_i.is_some() || self.lodged_v.is_some()
    }

    fn to_block(&self) -> Result<Block, EncodingError> {
        let exponent = |value: &Exponent| integer::encode(value.as_bigint());
        let tuple = Tuple::new(
            types::credential_proof(),
            vec![
                Some(self.exposure.to_block()?),
                Some(integer::encode(&self.c)),
                Some(exponent(&self.se)),
                Some(exponent(&self.sb)),
                self.i.as_ref().map(exponent),
                self.si.as_ref().map(exponent),
                self.lodged_i.as_ref().map(Lodging::to_block).transpose()?,
                self.lodged_v.as_ref().map(Lodging::to_block).transpose()?,
            ],
        )?;
        Ok(tuple.into_block())
    }

    fn decode(block: &Block) -> Result<Self, EncodingError> {
        let tuple = Tuple::decode(block)?;
        Ok(Self {
            exposure: Exposure::decode(tuple.require(0, "exposure")?)?,
            c: integer::decode(tuple.require(1, "blinded credential")?)?,
            se: integer::decode_exponent(tuple.require(2, "se")?)?,
            sb: integer::decode_exponent(tuple.require(3, "sb")?)?,
            i: tuple.get(4).map(integer::decode_exponent).transpose()?,
            si: tuple.get(5).map(integer::decode_exponent).transpose()?,
            lodged_i: tuple.get(6).map(Lodging::decode).transpose()?,
            lodged_v: tuple.get(7).map(Lodging::decode).transpose()?,
        })
    }
}

/// `f' = au^u · ab^w` under the key of `recipient`, with its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenedCommitment {
    recipient: Identifier,
    value: BigInt,
    sw: Exponent,
}

impl ShortenedCommitment {
    /// The host whose key `f'` lives under.
    pub fn recipient(&self) -> &Identifier {
        &self.recipient
    }

    /// `f'`.
    pub fn value(&self) -> &BigInt {
        &self.value
    }

    fn to_block(&self) -> Result<Block, EncodingError> {
        let tuple = Tuple::new(
            types::shortening(),
            vec![
                Some(string::encode_identifier(types::identifier(), &self.recipient)?),
                Some(integer::encode(&self.value)),
                Some(integer::encode(self.sw.as_bigint())),
            ],
        )?;
        Ok(tuple.into_block())
    }

    fn decode(block: &Block) -> Result<Self, EncodingError> {
        let tuple = Tuple::decode(block)?;
        Ok(Self {
            recipient: string::decode_identifier(tuple.require(0, "shortening recipient")?)?,
            value: integer::decode(tuple.require(1, "shortened commitment")?)?,
            sw: integer::decode_exponent(tuple.require(2, "sw")?)?,
        })
    }
}

/// Values recovered from a lodged credential proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LodgedValues {
    /// The credential identifier `i`, if it was hidden.
    pub identifier: Option<Exponent>,
    /// The subject value `v`, if it was hidden.
    pub subject: Option<Exponent>,
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

struct PendingLodging {
    encryption: VerifiableEncryption,
    randomness: Exponent,
    rr: Exponent,
}

impl PendingLodging {
    fn commit<R: RngCore + CryptoRng + ?Sized>(
        public: &PublicKey,
        value: &Exponent,
        blinding: &Exponent,
        bounds: &ExponentBounds,
        commitments: &mut Vec<Element>,
        rng: &mut R,
    ) -> Result<Self, CryptoError> {
        let randomness = Exponent::random(bounds.blinding_exponent_bits, rng);
        let rr = Exponent::random(bounds.random_blinding_exponent_bits, rng);
        let encryption = VerifiableEncryption::encrypt(public, value, &randomness)?;
        let (f1, f2) = VerifiableEncryption::commit(public, blinding, &rr)?;
        commitments.push(f1);
        commitments.push(f2);
        Ok(Self {
            encryption,
            randomness,
            rr,
        })
    }

    fn respond(self, t: &Exponent) -> Lodging {
        Lodging {
            w1: self.encryption.w1().to_bigint(),
            w2: self.encryption.w2().to_bigint(),
            sr: Exponent::response(&self.rr, t, &self.randomness),
        }
    }
}

struct Blinded<'a> {
    credential: &'a Credential,
    c_prime: Element,
    b_prime: Exponent,
    re: Exponent,
    rb: Exponent,
    ri: Option<Exponent>,
    lodged_i: Option<PendingLodging>,
    lodged_v: Option<PendingLodging>,
}

impl Blinded<'_> {
    fn respond(self, t: &Exponent) -> CredentialProof {
        let secrets = self.credential.secrets();
        CredentialProof {
            exposure: self.credential.exposure().clone(),
            c: self.c_prime.to_bigint(),
            se: Exponent::response(&self.re, t, &secrets.e),
            sb: Exponent::response(&self.rb, t, &self.b_prime),
            i: self.ri.is_none().then(|| secrets.i.clone()),
            si: self.ri.map(|ri| Exponent::response(&ri, t, &secrets.i)),
            lodged_i: self.lodged_i.map(|lodging| lodging.respond(t)),
            lodged_v: self.lodged_v.map(|lodging| lodging.respond(t)),
        }
    }
}

// ---------------------------------------------------------------------------
// CredentialsSignature
// ---------------------------------------------------------------------------

/// The tag of a credentials signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsSignature {
    t: BlockDigest,
    su: Exponent,
    sv: Option<Exponent>,
    proofs: Vec<CredentialProof>,
    certificates: Vec<Block>,
    shortening: Option<ShortenedCommitment>,
}

impl CredentialsSignature {
    /// Show the credentials of `request` for `content` with digest `digest`.
    ///
    /// Recipient keys for shortening are looked up at the content time.
    pub fn sign<R: RngCore + CryptoRng + ?Sized>(
        request: &CredentialsRequest,
        content: &Content,
        digest: &BlockDigest,
        keys: &dyn PublicKeyLookup,
        config: &WireConfig,
        rng: &mut R,
    ) -> Result<Self, WireError> {
        let bounds = &config.bounds;
        let subject = content.require_subject()?;
        let time = content.require_time()?;
        let shared = request.credentials[0].secrets();
        let disclose_v = discloses_v(request.credentials.iter().map(Credential::exposure), subject);
        if disclose_v && shared.v != subject_exponent(subject) {
            return Err(invalid(format!("credential was not issued to {subject}")));
        }

        let ru = Exponent::random(bounds.random_exponent_bits, rng);
        let rv = (!disclose_v).then(|| Exponent::random(bounds.random_exponent_bits, rng));
        let mut commitments = Vec::new();
        let mut blinded = Vec::with_capacity(request.credentials.len());
        for credential in &request.credentials {
            let public = credential.public_key();
            let secrets = credential.secrets();
            let r = Exponent::random(bounds.blinding_exponent_bits, rng);
            let c_prime = secrets.c.multiply(&public.ab().pow(&r)?)?;
            let b_prime = &secrets.b - &(&secrets.e * &r);
            let re = Exponent::random(bounds.random_credential_exponent_bits, rng);
            let rb = Exponent::random(bounds.random_blinding_exponent_bits, rng);
            let ri = (!credential.exposure().is_one_time())
                .then(|| Exponent::random(bounds.random_exponent_bits, rng));

            let mut f = c_prime
                .pow(&re)?
                .multiply(&public.ab().pow(&rb)?)?
                .multiply(&public.au().pow(&ru)?)?;
            if let Some(ri) = &ri {
                f = f.multiply(&public.ai().pow(ri)?)?;
            }
            if let Some(rv) = &rv {
                f = f.multiply(&public.av().pow(rv)?)?;
            }
            commitments.push(f);

            let (mut lodged_i, mut lodged_v) = (None, None);
            if request.lodged {
                if let Some(ri) = &ri {
                    lodged_i = Some(PendingLodging::commit(public, &secrets.i, ri, bounds, &mut commitments, rng)?);
                }
                if let Some(rv) = &rv {
                    lodged_v = Some(PendingLodging::commit(public, &secrets.v, rv, bounds, &mut commitments, rng)?);
                }
            }
            blinded.push(Blinded {
                credential,
                c_prime,
                b_prime,
                re,
                rb,
                ri,
                lodged_i,
                lodged_v,
            });
        }

        let mut shortening = None;
        if let Some((recipient, w)) = &request.shortening {
            let public = keys.public_key(&recipient.host(), time)?;
            let value = public.au().pow(&shared.u)?.multiply(&public.ab().pow(w)?)?;
            let rw = Exponent::random(bounds.random_exponent_bits, rng);
            commitments.push(public.au().pow(&ru)?.multiply(&public.ab().pow(&rw)?)?);
            shortening = Some((recipient.clone(), w, value, rw));
        }

        let t = challenge(digest, &commitments)?;
        let te = Exponent::from_digest(&t);
        let proofs = blinded.into_iter().map(|b| b.respond(&te)).collect::<Vec<_>>();
        let signature = Self {
            t,
            su: Exponent::response(&ru, &te, &shared.u),
            sv: rv.map(|rv| Exponent::response(&rv, &te, &shared.v)),
            proofs,
            certificates: request.certificates.iter().map(|c| c.block().clone()).collect(),
            shortening: shortening.map(|(recipient, w, value, rw)| ShortenedCommitment {
                recipient,
                value: value.to_bigint(),
                sw: Exponent::response(&rw, &te, w),
            }),
        };
        tracing::debug!(
            subject = %subject,
            credentials = signature.proofs.len(),
            lodged = request.lodged,
            shortened = signature.shortening.is_some(),
            "signed content with credentials"
        );
        Ok(signature)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The per-credential proofs.
    pub fn proofs(&self) -> &[CredentialProof] {
        &self.proofs
    }

    /// The disclosed exposures.
    pub fn exposures(&self) -> impl Iterator<Item = &Exposure> {
        self.proofs.iter().map(CredentialProof::exposure)
    }

    /// True if hidden values were lodged with the issuers.
    pub fn is_lodged(&self) -> bool {
        self.proofs.iter().any(CredentialProof::is_lodged)
    }

    /// The issuer certificates, as signature blocks.
    pub fn certificates(&self) -> &[Block] {
        &self.certificates
    }

    /// The shortened commitment, if any.
    pub fn shortening(&self) -> Option<&ShortenedCommitment> {
        self.shortening.as_ref()
    }

    // -----------------------------------------------------------------------
    // Authorization
    // -----------------------------------------------------------------------

    /// [`WireError::Authorization`] unless some credential grants `role`.
    pub fn require_role(&self, role: &str) -> Result<(), WireError> {
        if self.exposures().any(|e| e.role() == Some(role)) {
            return Ok(());
        }
        Err(WireError::Authorization(format!("no credential grants role {role}")))
    }

    /// [`WireError::Authorization`] unless some credential grants `permission`.
    pub fn require_permission(&self, permission: &str) -> Result<(), WireError> {
        if self.exposures().any(|e| e.has_permission(permission)) {
            return Ok(());
        }
        Err(WireError::Authorization(format!(
            "no credential grants permission {permission}"
        )))
    }

    /// [`WireError::Authorization`] unless every credential was issued by `issuer`.
    pub fn require_issuer(&self, issuer: &Identifier) -> Result<(), WireError> {
        match self.exposures().find(|e| e.issuer() != issuer) {
            Some(other) => Err(WireError::Authorization(format!(
                "credential issued by {} rather than {issuer}",
                other.issuer()
            ))),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------------

    /// Verify against `content` with digest `digest`.
    pub fn verify(&self, content: &Content, digest: &BlockDigest, verifier: &Verifier<'_>) -> Result<(), WireError> {
        let config = verifier.config();
        let subject = content.require_subject()?;
        let time = content.require_time()?;
        let disclose_v = self.check_structure(subject)?;
        self.check_bounds(&config.bounds)?;

        let t = Exponent::from_digest(&self.t);
        let disclosed_v = disclose_v.then(|| subject_exponent(subject));
        let mut commitments = Vec::new();
        for proof in &self.proofs {
            let exposure = &proof.exposure;
            verifier.check_active("credential", exposure.issuance(), config.credential_validity())?;
            let public = verifier
                .keys()
                .public_key(&exposure.issuer().host(), exposure.issuance())?;
            let c_prime = self.element(public.composite_group(), &proof.c, "blinded credential")?;

            let mut disclosed = public.ao().pow(&exposure.exponent()?)?;
            if let Some(i) = &proof.i {
                disclosed = disclosed.multiply(&public.ai().pow(&-i)?)?;
            }
            if let Some(v) = &disclosed_v {
                disclosed = disclosed.multiply(&public.av().pow(&-v)?)?;
            }
            let mut f = disclosed
                .pow(&t)?
                .multiply(&c_prime.pow(&proof.se)?)?
                .multiply(&public.ab().pow(&proof.sb)?)?
                .multiply(&public.au().pow(&self.su)?)?;
            if let Some(si) = &proof.si {
                f = f.multiply(&public.ai().pow(si)?)?;
            }
            if let Some(sv) = &self.sv {
                f = f.multiply(&public.av().pow(sv)?)?;
            }
            commitments.push(f);

            for (lodging, response) in [(&proof.lodged_i, &proof.si), (&proof.lodged_v, &self.sv)] {
                if let (Some(lodging), Some(response)) = (lodging, response) {
                    let square = public.square_group();
                    let encryption = VerifiableEncryption::from_parts(
                        &public,
                        self.element(square, &lodging.w1, "W1")?,
                        self.element(square, &lodging.w2, "W2")?,
                    )?;
                    let (f1, f2) = encryption.recompute(&public, &t, response, &lodging.sr)?;
                    commitments.push(f1);
                    commitments.push(f2);
                }
            }
        }

        if let Some(shortening) = &self.shortening {
            let public = verifier.keys().public_key(&shortening.recipient.host(), time)?;
            let value = self.element(public.composite_group(), &shortening.value, "shortened commitment")?;
            commitments.push(
                public
                    .au()
                    .pow(&self.su)?
                    .multiply(&public.ab().pow(&shortening.sw)?)?
                    .multiply(&value.pow(&t)?)?,
            );
        }

        if challenge(digest, &commitments)? != self.t {
            return Err(self.reject("challenge does not match"));
        }
        self.verify_certificates(verifier)?;
        tracing::debug!(
            subject = %subject,
            credentials = self.proofs.len(),
            "verified credentials signature"
        );
        Ok(())
    }

    /// Check which optional values are present. Returns whether `v` is disclosed.
    fn check_structure(&self, subject: &Identifier) -> Result<bool, WireError> {
        if self.proofs.is_empty() {
            return Err(EncodingError::MissingElement("credential proofs".into()).into());
        }
        if self.proofs.len() > 1 && self.exposures().any(Exposure::is_identity_based) {
            return Err(invalid("an identity-based credential must be shown alone"));
        }
        let identity_based = self.proofs.len() == 1 && self.proofs[0].exposure.is_identity_based();
        if !self.certificates.is_empty() && !identity_based {
            return Err(invalid("certificates require a single identity-based credential"));
        }
        let disclose_v = discloses_v(self.exposures(), subject);
        if disclose_v == self.sv.is_some() {
            return Err(malformed("sv must be present exactly when v is hidden"));
        }
        let lodged = self.is_lodged();
        for proof in &self.proofs {
            let one_time = proof.exposure.is_one_time();
            if proof.i.is_some() != one_time || proof.si.is_some() == one_time {
                return Err(malformed("i is disclosed exactly for one-time credentials"));
            }
            if proof.lodged_i.is_some() != (lodged && !one_time)
                || proof.lodged_v.is_some() != (lodged && !disclose_v)
            {
                return Err(malformed("a lodged signature lodges every hidden value"));
            }
        }
        Ok(disclose_v)
    }

    fn check_bounds(&self, bounds: &ExponentBounds) -> Result<(), WireError> {
        let mut checks = vec![("su", &self.su, bounds.random_exponent_bits)];
        if let Some(sv) = &self.sv {
            checks.push(("sv", sv, bounds.random_exponent_bits));
        }
        for proof in &self.proofs {
            checks.push(("se", &proof.se, bounds.random_credential_exponent_bits));
            checks.push(("sb", &proof.sb, bounds.random_blinding_exponent_bits));
            if let Some(si) = &proof.si {
                checks.push(("si", si, bounds.random_exponent_bits));
            }
            for lodging in [&proof.lodged_i, &proof.lodged_v].into_iter().flatten() {
                checks.push(("sr", &lodging.sr, bounds.random_blinding_exponent_bits));
            }
        }
        if let Some(shortening) = &self.shortening {
            checks.push(("sw", &shortening.sw, bounds.random_exponent_bits));
        }
        for (name, response, limit) in checks {
            if response.bits() > limit {
                return Err(self.reject(&format!("{name} has {} bits, limit {limit}", response.bits())));
            }
        }
        Ok(())
    }

    fn verify_certificates(&self, verifier: &Verifier<'_>) -> Result<(), WireError> {
        let Some(proof) = self.proofs.first() else {
            return Ok(());
        };
        let issuer = proof.exposure.issuer();
        for block in &self.certificates {
            let certificate = SignatureWrapper::decode(block, Verify::Immediately, verifier)?;
            if !matches!(certificate.signature(), Signature::Host(_)) {
                return Err(self.reject("certificate is not a host signature"));
            }
            if certificate.content().subject() != Some(issuer) {
                return Err(self.reject(&format!("certificate does not name the issuer {issuer}")));
            }
        }
        Ok(())
    }

    /// An invertible group element from the tag; anything else is a forgery.
    fn element(&self, group: &Group, value: &BigInt, what: &str) -> Result<Element, WireError> {
        let element = group.element_from_signed(value).and_then(|element| {
            element.inverse()?;
            Ok(element)
        });
        element.map_err(|e| match e {
            CryptoError::NotAnElement(reason) | CryptoError::NotInvertible(reason) => {
                self.reject(&format!("{what}: {reason}"))
            }
            other => other.into(),
        })
    }

    fn reject(&self, reason: &str) -> WireError {
        tracing::warn!(credentials = self.proofs.len(), reason, "rejected credentials signature");
        WireError::InvalidSignature(format!("credentials signature: {reason}"))
    }

    // -----------------------------------------------------------------------
    // Liability
    // -----------------------------------------------------------------------

    /// Recover the values lodged in proof `index` with the issuer's private key.
    pub fn recover_lodged(&self, index: usize, keys: &dyn PrivateKeyLookup) -> Result<LodgedValues, WireError> {
        let proof = self
            .proofs
            .get(index)
            .ok_or_else(|| EncodingError::MissingElement(format!("credential proof {index}")))?;
        let exposure = &proof.exposure;
        let private = keys.private_key(&exposure.issuer().host(), exposure.issuance())?;
        let square = private.public_key().square_group();
        let open = |lodging: &Option<Lodging>| -> Result<Option<Exponent>, CryptoError> {
            lodging
                .as_ref()
                .map(|lodging| -> Result<Exponent, CryptoError> {
                    let w1 = square.element_from_signed(&lodging.w1)?;
                    let w2 = square.element_from_signed(&lodging.w2)?;
                    private.decrypt_lodged(&w1, &w2)
                })
                .transpose()
        };
        let values = LodgedValues {
            identifier: open(&proof.lodged_i)?,
            subject: open(&proof.lodged_v)?,
        };
        tracing::info!(issuer = %exposure.issuer(), index, "recovered lodged credential values");
        Ok(values)
    }

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    pub(crate) fn to_block(&self) -> Result<Block, EncodingError> {
        let proofs = self
            .proofs
            .iter()
            .map(|proof| proof.to_block().map(Some))
            .collect::<Result<Vec<_>, _>>()?;
        let certificates = if self.certificates.is_empty() {
            None
        } else {
            let elements = self.certificates.iter().cloned().map(Some).collect();
            Some(List::new(types::certificates(), elements)?.into_block())
        };
        let tuple = Tuple::new(
            types::credentials_tag(),
            vec![
                Some(bytes::encode(self.t.as_bytes())),
                Some(integer::encode(self.su.as_bigint())),
                self.sv.as_ref().map(|sv| integer::encode(sv.as_bigint())),
                Some(List::new(types::credential_proofs(), proofs)?.into_block()),
                certificates,
                self.shortening.as_ref().map(ShortenedCommitment::to_block).transpose()?,
            ],
        )?;
        Ok(tuple.into_block())
    }

    pub(crate) fn decode(block: &Block) -> Result<Self, EncodingError> {
        let tuple = Tuple::decode(block)?;
        let proofs = List::decode(tuple.require(3, "credential proofs")?)?
            .elements()
            .iter()
            .map(|proof| {
                proof
                    .as_ref()
                    .ok_or_else(|| EncodingError::MissingElement("credential proof".into()))
                    .and_then(CredentialProof::decode)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let certificates = match tuple.get(4) {
            Some(list) => List::decode(list)?.present().cloned().collect(),
            None => Vec::new(),
        };
        Ok(Self {
            t: types::decode_challenge(tuple.require(0, "credentials challenge")?)?,
            su: integer::decode_exponent(tuple.require(1, "su")?)?,
            sv: tuple.get(2).map(integer::decode_exponent).transpose()?,
            proofs,
            certificates,
            shortening: tuple.get(5).map(ShortenedCommitment::decode).transpose()?,
        })
    }
}

fn malformed(reason: &str) -> WireError {
    EncodingError::InvalidValue(format!("credentials signature: {reason}")).into()
}
