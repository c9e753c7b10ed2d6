//! # Encryption Envelope
//!
//! A five-slot envelope `(time, recipient?, key?, iv?, element)`:
//!
//! | Mode     | recipient | key | iv | element              |
//! |----------|-----------|-----|----|----------------------|
//! | request  | yes       | yes | yes| AES-256-GCM ciphertext |
//! | response | no        | no  | yes| AES-256-GCM ciphertext |
//! | plain    | no        | no  | no | the element itself   |
//!
//! In a request the fresh symmetric key travels wrapped as `key^e mod n`
//! under the recipient host's public key valid at `time`. A response reuses
//! the symmetric key of the request it answers, which the requester already
//! holds. Any other combination of the optional slots is an encoding error.
//!
//! Key wraps and unwraps go through a [`SymmetricKeyCache`].

use idw_core::{syntax, EncodingError, Identifier, SemanticType, Timestamp, WireError};
use idw_crypto::{
    generate_iv, PrivateKeyLookup, PublicKeyLookup, SymmetricKey, SymmetricKeyCache, IV_LENGTH,
};
use rand::{CryptoRng, RngCore};

use crate::block::{Block, BlockWriter, Encodable};
use crate::tuple::{decode_elements, elements_length, write_elements};
use crate::{bytes, fixed, integer, string};

const SLOTS: usize = 5;

fn slot_types() -> [SemanticType; SLOTS] {
    [
        syntax::int64().clone(),
        syntax::string().clone(),
        syntax::integer().clone(),
        syntax::bytes().clone(),
        syntax::bytes().clone(),
    ]
}

struct EncryptionWrapper {
    slots: Vec<Option<Block>>,
}

impl Encodable for EncryptionWrapper {
    fn determine_length(&self) -> usize {
        elements_length(&self.slots)
    }

    fn encode(&self, out: &mut BlockWriter<'_>) {
        write_elements(&self.slots, out);
    }
}

fn envelope(slots: Vec<Option<Block>>) -> Block {
    Block::deferred(syntax::encryption().clone(), EncryptionWrapper { slots })
}

/// Encrypt `element` for `recipient` with a fresh symmetric key. Returns the
/// envelope and the key, which the caller keeps to open the response.
pub fn encrypt_request<R: RngCore + CryptoRng + ?Sized>(
    element: &Block,
    time: Timestamp,
    recipient: &Identifier,
    keys: &dyn PublicKeyLookup,
    cache: &SymmetricKeyCache,
    rng: &mut R,
) -> Result<(Block, SymmetricKey), WireError> {
    let public = keys.public_key(&recipient.host(), time)?;
    let key = SymmetricKey::generate(rng);
    let wrapped = cache.wrap(&public, &key)?;
    let iv = generate_iv(rng);
    let ciphertext = key.encrypt(&iv, element.bytes())?;
    let block = envelope(vec![
        Some(fixed::encode(time.as_millis())),
        Some(string::encode(recipient.as_str())),
        Some(integer::encode(&wrapped.to_bigint())),
        Some(bytes::encode(&iv)),
        Some(bytes::encode(&ciphertext)),
    ]);
    Ok((block, key))
}

/// Encrypt `element` under a symmetric key received in a request.
pub fn encrypt_response<R: RngCore + CryptoRng + ?Sized>(
    element: &Block,
    time: Timestamp,
    key: &SymmetricKey,
    rng: &mut R,
) -> Result<Block, WireError> {
    let iv = generate_iv(rng);
    let ciphertext = key.encrypt(&iv, element.bytes())?;
    Ok(envelope(vec![
        Some(fixed::encode(time.as_millis())),
        None,
        None,
        Some(bytes::encode(&iv)),
        Some(bytes::encode(&ciphertext)),
    ]))
}

/// Carry `element` unencrypted.
pub fn encrypt_plain(element: &Block, time: Timestamp) -> Block {
    envelope(vec![
        Some(fixed::encode(time.as_millis())),
        None,
        None,
        None,
        Some(element.clone()),
    ])
}

/// Which of the three envelope shapes a block has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Encrypted for a host with a wrapped symmetric key.
    Request {
        /// The recipient.
        recipient: Identifier,
        /// `key^e mod n`.
        wrapped_key: Block,
        /// GCM nonce.
        iv: [u8; IV_LENGTH],
    },
    /// Encrypted under the key of the request it answers.
    Response {
        /// GCM nonce.
        iv: [u8; IV_LENGTH],
    },
    /// Not encrypted.
    Plain,
}

/// A decoded encryption envelope whose element has not been opened yet.
#[derive(Debug, Clone)]
pub struct Envelope {
    time: Timestamp,
    mode: Mode,
    element: Block,
}

impl Envelope {
    /// Parse an envelope and classify its mode.
    pub fn decode(block: &Block) -> Result<Self, EncodingError> {
        block.expect_type(syntax::encryption())?;
        let slots = decode_elements(block, &slot_types())?;
        let time = slots[0]
            .as_ref()
            .ok_or_else(|| EncodingError::MissingElement("encryption time".into()))?;
        let time = Timestamp::from_millis(fixed::decode::<i64>(time)?)?;
        let element = slots[4]
            .clone()
            .ok_or_else(|| EncodingError::MissingElement("encrypted element".into()))?;

        let mode = match (&slots[1], &slots[2], &slots[3]) {
            (Some(recipient), Some(wrapped_key), Some(iv)) => Mode::Request {
                recipient: string::decode_identifier(recipient)?,
                wrapped_key: wrapped_key.clone(),
                iv: parse_iv(iv)?,
            },
            (None, None, Some(iv)) => Mode::Response { iv: parse_iv(iv)? },
            (None, None, None) => Mode::Plain,
            (recipient, key, iv) => {
                tracing::warn!(
                    recipient = recipient.is_some(),
                    key = key.is_some(),
                    iv = iv.is_some(),
                    "rejected encryption envelope mixing request and response fields"
                );
                return Err(EncodingError::Encryption(format!(
                    "inconsistent envelope: recipient {}, key {}, iv {}",
                    presence(recipient),
                    presence(key),
                    presence(iv)
                )));
            }
        };
        Ok(Self { time, mode, element })
    }

    /// The envelope time.
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// The envelope mode.
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Open a request with the recipient's private key. Returns the element
    /// and the symmetric key to encrypt the response with.
    pub fn open_request(
        &self,
        element_type: &SemanticType,
        keys: &dyn PrivateKeyLookup,
        cache: &SymmetricKeyCache,
    ) -> Result<(Block, SymmetricKey), WireError> {
        let Mode::Request {
            recipient,
            wrapped_key,
            iv,
        } = &self.mode
        else {
            return Err(EncodingError::Encryption("envelope is not a request".into()).into());
        };
        let private = keys.private_key(&recipient.host(), self.time)?;
        let wrapped = integer::decode_element(wrapped_key, private.public_key().composite_group())?;
        let key = cache.unwrap(&private, &wrapped)?;
        let element = decrypt(&key, iv, &self.element, element_type)?;
        Ok((element, key))
    }

    /// Open a response with the symmetric key of the request.
    pub fn open_response(&self, element_type: &SemanticType, key: &SymmetricKey) -> Result<Block, WireError> {
        let Mode::Response { iv } = &self.mode else {
            return Err(EncodingError::Encryption("envelope is not a response".into()).into());
        };
        decrypt(key, iv, &self.element, element_type)
    }

    /// The element of a plain envelope, retyped as `element_type`.
    pub fn open_plain(&self, element_type: &SemanticType) -> Result<Block, EncodingError> {
        if self.mode != Mode::Plain {
            return Err(EncodingError::Encryption("envelope is encrypted".into()));
        }
        Block::slice(element_type.clone(), &self.element, 0, self.element.len())
    }
}

fn decrypt(
    key: &SymmetricKey,
    iv: &[u8; IV_LENGTH],
    ciphertext: &Block,
    element_type: &SemanticType,
) -> Result<Block, WireError> {
    let plaintext = key.decrypt(iv, bytes::decode(ciphertext)?).map_err(|e| {
        tracing::warn!(error = %e, "rejected encryption envelope");
        EncodingError::Encryption(e.to_string())
    })?;
    Ok(Block::new(element_type.clone(), plaintext)?)
}

fn parse_iv(block: &Block) -> Result<[u8; IV_LENGTH], EncodingError> {
    let iv = bytes::decode(block)?;
    iv.try_into().map_err(|_| {
        EncodingError::Encryption(format!("iv must be {IV_LENGTH} bytes, got {}", iv.len()))
    })
}

fn presence(slot: &Option<Block>) -> &'static str {
    if slot.is_some() {
        "present"
    } else {
        "absent"
    }
}
