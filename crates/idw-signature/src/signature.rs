//! # Signature Wrapper
//!
//! A signature block is `(content, host?, client?, credentials?)`, typed by
//! a type based on `signature@core.idw` whose single parameter is the type
//! of the signed element. At most one tag is present; none means the
//! content is merely unsigned.
//!
//! The digest every tag covers is the digest of the encoded content tuple.
//! Signing materializes the content before anything else, so a wrapper
//! that fails to encode aborts signing instead of producing a bad tag.
//!
//! ## Invariants
//!
//! - Signed content has a subject and a positive time.
//! - `verified` only ever goes from false to true, through [`SignatureWrapper::verify`]
//!   or a [`Verify::Trusted`] decode.
//! - Unsigned wrappers count as verified.

use idw_block::tuple::{decode_elements, elements_length, write_elements};
use idw_block::{Block, BlockWriter, Encodable};
use idw_core::{syntax, EncodingError, Identifier, SemanticType, Timestamp, WireConfig, WireError};
use idw_crypto::{PrivateKeyLookup, PublicKeyLookup};
use rand::{CryptoRng, RngCore};

use crate::client::{ClientSecret, ClientSignature};
use crate::content::Content;
use crate::context::Verifier;
use crate::credentials::{CredentialsRequest, CredentialsSignature};
use crate::host::HostSignature;
use crate::types;

/// The authenticity tag of signed content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    /// No tag.
    Unsigned,
    /// Signed with a host key.
    Host(HostSignature),
    /// Proof of knowledge of a client secret committed at a host.
    Client(ClientSignature),
    /// Anonymous show of credentials.
    Credentials(CredentialsSignature),
}

impl Signature {
    /// True for every variant but [`Signature::Unsigned`].
    pub fn is_signed(&self) -> bool {
        !matches!(self, Self::Unsigned)
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unsigned => "unsigned",
            Self::Host(_) => "host",
            Self::Client(_) => "client",
            Self::Credentials(_) => "credentials",
        }
    }

    fn tag_slots(&self) -> Result<[Option<Block>; 3], EncodingError> {
        Ok(match self {
            Self::Unsigned => [None, None, None],
            Self::Host(tag) => [Some(tag.to_block()?), None, None],
            Self::Client(tag) => [None, Some(tag.to_block()?), None],
            Self::Credentials(tag) => [None, None, Some(tag.to_block()?)],
        })
    }
}

/// What [`SignatureWrapper::decode`] does about the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verify {
    /// Verify before returning.
    Immediately,
    /// Leave it to a later [`SignatureWrapper::verify`] call.
    Deferred,
    /// Accept without checking. Only for blocks from a trusted store.
    Trusted,
}

struct SignatureSlots {
    slots: Vec<Option<Block>>,
}

impl Encodable for SignatureSlots {
    fn determine_length(&self) -> usize {
        elements_length(&self.slots)
    }

    fn encode(&self, out: &mut BlockWriter<'_>) {
        write_elements(&self.slots, out);
    }
}

/// Signed (or unsigned) content together with its encoded block.
#[derive(Debug, Clone)]
pub struct SignatureWrapper {
    ty: SemanticType,
    content: Content,
    content_block: Block,
    signature: Signature,
    block: Block,
    verified: bool,
}

impl SignatureWrapper {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Wrap `content` without a tag.
    pub fn unsigned(ty: &SemanticType, content: Content) -> Result<Self, WireError> {
        let content_block = encode_content(ty, &content, false)?;
        Ok(Self::assemble(ty, content, content_block, Signature::Unsigned, true)?)
    }

    /// Sign `content` as `signer` with the key its host used at the content time.
    pub fn sign_host(
        ty: &SemanticType,
        content: Content,
        signer: &Identifier,
        keys: &dyn PrivateKeyLookup,
    ) -> Result<Self, WireError> {
        let content_block = encode_content(ty, &content, true)?;
        let tag = HostSignature::sign(&content_block.digest(), content.require_time()?, signer, keys)?;
        Ok(Self::assemble(ty, content, content_block, Signature::Host(tag), true)?)
    }

    /// Sign `content` with a client secret.
    pub fn sign_client<R: RngCore + CryptoRng + ?Sized>(
        ty: &SemanticType,
        content: Content,
        secret: &ClientSecret,
        config: &WireConfig,
        rng: &mut R,
    ) -> Result<Self, WireError> {
        let content_block = encode_content(ty, &content, true)?;
        let tag = ClientSignature::sign(secret, &content_block.digest(), config, rng)?;
        Ok(Self::assemble(ty, content, content_block, Signature::Client(tag), true)?)
    }

    /// Sign `content` by showing the credentials of `request`.
    pub fn sign_credentials<R: RngCore + CryptoRng + ?Sized>(
        ty: &SemanticType,
        content: Content,
        request: &CredentialsRequest,
        keys: &dyn PublicKeyLookup,
        config: &WireConfig,
        rng: &mut R,
    ) -> Result<Self, WireError> {
        let content_block = encode_content(ty, &content, true)?;
        let tag = CredentialsSignature::sign(request, &content, &content_block.digest(), keys, config, rng)?;
        Ok(Self::assemble(ty, content, content_block, Signature::Credentials(tag), true)?)
    }

    fn assemble(
        ty: &SemanticType,
        content: Content,
        content_block: Block,
        signature: Signature,
        verified: bool,
    ) -> Result<Self, EncodingError> {
        let mut slots = Vec::with_capacity(4);
        slots.push(Some(content_block.clone()));
        slots.extend(signature.tag_slots()?);
        Ok(Self {
            ty: ty.clone(),
            content,
            content_block,
            signature,
            block: Block::deferred(ty.clone(), SignatureSlots { slots }),
            verified,
        })
    }

    // -----------------------------------------------------------------------
    // Decoding and verification
    // -----------------------------------------------------------------------

    /// Decode a signature block and apply the `verify` policy.
    ///
    /// # Errors
    ///
    /// [`WireError::InvalidEncoding`] for structural problems, including more
    /// than one tag. With [`Verify::Immediately`] also every error of
    /// [`verify`](Self::verify).
    pub fn decode(block: &Block, verify: Verify, verifier: &Verifier<'_>) -> Result<Self, WireError> {
        block.expect_type(syntax::signature())?;
        let ty = block.ty();
        let parameters = [
            types::content(ty.single_parameter()?),
            types::host_tag().clone(),
            types::client_tag().clone(),
            types::credentials_tag().clone(),
        ];
        let mut slots = decode_elements(block, &parameters)?.into_iter();
        let content_block = slots
            .next()
            .flatten()
            .ok_or_else(|| EncodingError::MissingElement("signed content".into()))?;
        let tags: Vec<Option<Block>> = slots.collect();
        let signature = match tags.as_slice() {
            [None, None, None] => Signature::Unsigned,
            [Some(tag), None, None] => Signature::Host(HostSignature::decode(tag)?),
            [None, Some(tag), None] => Signature::Client(ClientSignature::decode(tag)?),
            [None, None, Some(tag)] => Signature::Credentials(CredentialsSignature::decode(tag)?),
            _ => {
                tracing::warn!(ty = %ty, "signature carries more than one tag");
                return Err(EncodingError::MixedSignatureTags.into());
            }
        };
        let content = Content::decode(&content_block)?;
        content.validate(signature.is_signed())?;

        let mut wrapper = Self {
            ty: ty.clone(),
            content,
            content_block,
            verified: !signature.is_signed(),
            signature,
            block: block.clone(),
        };
        match verify {
            Verify::Immediately if !wrapper.verified => wrapper.verify(verifier)?,
            Verify::Trusted => wrapper.verified = true,
            Verify::Immediately | Verify::Deferred => {}
        }
        Ok(wrapper)
    }

    /// Verify the tag against the content.
    ///
    /// # Errors
    ///
    /// [`WireError::AlreadyVerified`] if the wrapper is already verified,
    /// otherwise whatever the tag's verification reports.
    pub fn verify(&mut self, verifier: &Verifier<'_>) -> Result<(), WireError> {
        if self.verified {
            return Err(WireError::AlreadyVerified);
        }
        let digest = self.content_block.digest();
        let time = self.content.require_time()?;
        match &self.signature {
            Signature::Unsigned => {}
            Signature::Host(tag) => tag.verify(&digest, time, verifier)?,
            Signature::Client(tag) => tag.verify(&digest, time, verifier)?,
            Signature::Credentials(tag) => tag.verify(&self.content, &digest, verifier)?,
        }
        self.verified = true;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The signature type.
    pub fn ty(&self) -> &SemanticType {
        &self.ty
    }

    /// The encoded signature block.
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// The signed content.
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// The encoded content tuple whose digest the tag covers.
    pub fn content_block(&self) -> &Block {
        &self.content_block
    }

    /// The tag.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// True once the tag has been checked or trusted.
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// The signed element.
    pub fn element(&self) -> Option<&Block> {
        self.content.element()
    }

    /// The content subject.
    pub fn subject(&self) -> Option<&Identifier> {
        self.content.subject()
    }

    /// The content time.
    pub fn time(&self) -> Option<Timestamp> {
        self.content.time()
    }
}

fn encode_content(ty: &SemanticType, content: &Content, signed: bool) -> Result<Block, EncodingError> {
    ty.check_based_on(syntax::signature())?;
    content.validate(signed)?;
    let block = content.to_block(ty.single_parameter()?)?;
    block.encode_if_pending();
    Ok(block)
}
