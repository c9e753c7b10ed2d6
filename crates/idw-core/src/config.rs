//! # Wire Configuration
//!
//! Tunable parameters of the signature schemes: how long each kind of
//! signature stays active, the bit lengths of secrets and of the random
//! blinding values drawn for them, the capacity of the memo caches, and the
//! largest message a decoder will materialize from untrusted input.
//!
//! Loaded from YAML with `serde_yaml`; every field has a default so a partial
//! file overrides only what it names.
//!
//! ## Soundness
//!
//! A Schnorr-style response `s = r − t·x` only hides `x` if `r` is much
//! longer than `t·x`. [`WireConfig::validate`] enforces that every random
//! bit length exceeds the secret it blinds plus the challenge length by at
//! least [`STATISTICAL_SLACK_BITS`]. Verifiers reject responses longer than
//! the random bound, so signer and verifier must agree on this file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// Minimum slack between a random exponent and the value it blinds.
pub const STATISTICAL_SLACK_BITS: u64 = 64;

/// Default cap on a framed or decompressed message (50 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 50 * 1024 * 1024;

const DAY_SECS: u64 = 86_400;

/// Bit lengths used by the client and credentials signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExponentBounds {
    /// Length of a block digest and hence of the challenge `t`.
    pub hash_bits: u64,
    /// Length of the random values blinding hash-sized secrets (`u`, `v`, `i`, `w`).
    pub random_exponent_bits: u64,
    /// Length of the per-credential exponent `e`.
    pub credential_exponent_bits: u64,
    /// Length of the random value blinding `e`.
    pub random_credential_exponent_bits: u64,
    /// Length of the credential blinding `b` and of the rerandomization factor.
    pub blinding_exponent_bits: u64,
    /// Length of the random value blinding the rerandomized `b'`
    /// and the verifiable-encryption randomness.
    pub random_blinding_exponent_bits: u64,
}

impl Default for ExponentBounds {
    fn default() -> Self {
        Self {
            hash_bits: 256,
            random_exponent_bits: 640,
            credential_exponent_bits: 130,
            random_credential_exponent_bits: 514,
            blinding_exponent_bits: 1152,
            random_blinding_exponent_bits: 1700,
        }
    }
}

impl ExponentBounds {
    /// Upper bound on the bit length of `b' = b − e·r`.
    pub fn rerandomized_blinding_bits(&self) -> u64 {
        self.blinding_exponent_bits + self.credential_exponent_bits + 1
    }
}

/// Configuration of the wire layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    /// How long a host signature stays active, in seconds.
    pub host_signature_validity_secs: u64,
    /// How long a client signature stays active, in seconds.
    pub client_signature_validity_secs: u64,
    /// How long after issuance a credential may be shown, in seconds.
    pub credential_validity_secs: u64,
    /// Exponent bit lengths.
    pub bounds: ExponentBounds,
    /// Capacity of each memo cache.
    pub cache_capacity: usize,
    /// Largest message, in bytes, read from a stream or inflated from a
    /// compression envelope.
    pub max_message_size: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            host_signature_validity_secs: 2 * 365 * DAY_SECS,
            client_signature_validity_secs: 365 * DAY_SECS,
            credential_validity_secs: 3_600,
            bounds: ExponentBounds::default(),
            cache_capacity: 1024,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl WireConfig {
    /// Parse a YAML document and validate it.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, WireError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| WireError::Config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WireError> {
        let yaml = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&yaml)
    }

    /// Host signature validity window.
    pub fn host_signature_validity(&self) -> Duration {
        Duration::from_secs(self.host_signature_validity_secs)
    }

    /// Client signature validity window.
    pub fn client_signature_validity(&self) -> Duration {
        Duration::from_secs(self.client_signature_validity_secs)
    }

    /// Credential validity window.
    pub fn credential_validity(&self) -> Duration {
        Duration::from_secs(self.credential_validity_secs)
    }

    /// Check the statistical slack of every random bit length.
    pub fn validate(&self) -> Result<(), WireError> {
        let b = &self.bounds;
        let checks = [
            ("random_exponent_bits", b.random_exponent_bits, b.hash_bits + b.hash_bits),
            (
                "random_credential_exponent_bits",
                b.random_credential_exponent_bits,
                b.credential_exponent_bits + b.hash_bits,
            ),
            (
                "random_blinding_exponent_bits",
                b.random_blinding_exponent_bits,
                b.rerandomized_blinding_bits() + b.hash_bits,
            ),
        ];
        for (name, actual, covered) in checks {
            if actual < covered + STATISTICAL_SLACK_BITS {
                return Err(WireError::Config(format!(
                    "{name} = {actual} leaves less than {STATISTICAL_SLACK_BITS} bits of slack over {covered}"
                )));
            }
        }
        if self.cache_capacity == 0 {
            return Err(WireError::Config("cache_capacity must be positive".into()));
        }
        if self.max_message_size == 0 {
            return Err(WireError::Config("max_message_size must be positive".into()));
        }
        if b.hash_bits == 0 || b.hash_bits > 256 {
            return Err(WireError::Config(format!(
                "hash_bits = {} must lie in 1..=256",
                b.hash_bits
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_sound() {
        WireConfig::default().validate().expect("defaults must validate");
    }

    #[test]
    fn test_default_windows() {
        let config = WireConfig::default();
        assert_eq!(config.host_signature_validity(), Duration::from_secs(2 * 365 * 86_400));
        assert_eq!(config.client_signature_validity(), Duration::from_secs(365 * 86_400));
        assert_eq!(config.credential_validity(), Duration::from_secs(3_600));
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let config = WireConfig::from_yaml_str("credential_validity_secs: 60\ncache_capacity: 8\n").unwrap();
        assert_eq!(config.credential_validity_secs, 60);
        assert_eq!(config.cache_capacity, 8);
        assert_eq!(config.bounds, ExponentBounds::default());
    }

    #[test]
    fn test_insufficient_slack_rejected() {
        let yaml = "bounds:\n  random_exponent_bits: 520\n";
        let err = WireConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, WireError::Config(msg) if msg.contains("random_exponent_bits")));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(WireConfig::from_yaml_str("cache_capacity: 0\n").is_err());
    }

    #[test]
    fn test_message_size_cap() {
        assert_eq!(WireConfig::default().max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
        let config = WireConfig::from_yaml_str("max_message_size: 4096\n").unwrap();
        assert_eq!(config.max_message_size, 4096);
        assert!(WireConfig::from_yaml_str("max_message_size: 0\n").is_err());
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        assert!(matches!(
            WireConfig::from_yaml_str("cache_capacity: [1, 2"),
            Err(WireError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host_signature_validity_secs: 10").unwrap();
        let config = WireConfig::load(file.path()).unwrap();
        assert_eq!(config.host_signature_validity(), Duration::from_secs(10));
    }
}
