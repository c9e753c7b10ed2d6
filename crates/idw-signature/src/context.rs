//! # Verification Context
//!
//! What a verifier needs besides the signature itself: a way to look up host
//! public keys at a point in time, the wire configuration that fixes the
//! validity windows and response bounds, and the current time.

use std::time::Duration;

use idw_core::{Timestamp, WireConfig, WireError};
use idw_crypto::PublicKeyLookup;

/// Borrowed inputs of a verification.
#[derive(Clone, Copy)]
pub struct Verifier<'a> {
    keys: &'a dyn PublicKeyLookup,
    config: &'a WireConfig,
    now: Timestamp,
}

impl<'a> Verifier<'a> {
    /// A verifier at the current time.
    pub fn new(keys: &'a dyn PublicKeyLookup, config: &'a WireConfig) -> Self {
        Self {
            keys,
            config,
            now: Timestamp::now(),
        }
    }

    /// The same verifier pretending the current time is `now`.
    pub fn at(self, now: Timestamp) -> Self {
        Self { now, ..self }
    }

    /// Public key lookup.
    pub fn keys(&self) -> &'a dyn PublicKeyLookup {
        self.keys
    }

    /// Wire configuration.
    pub fn config(&self) -> &'a WireConfig {
        self.config
    }

    /// The reference time for staleness checks.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// [`WireError::InactiveSignature`] if `time` lies more than `window` before now.
    pub(crate) fn check_active(&self, what: &str, time: Timestamp, window: Duration) -> Result<(), WireError> {
        if time.is_older_than(window, self.now) {
            tracing::warn!(
                kind = what,
                time = %time,
                now = %self.now,
                window_secs = window.as_secs(),
                "rejected stale signature"
            );
            return Err(WireError::InactiveSignature(format!(
                "{what} from {time} is older than {} seconds",
                window.as_secs()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Verifier<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("now", &self.now)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
