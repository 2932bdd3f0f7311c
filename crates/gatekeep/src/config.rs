//! Listener configuration.
//!
//! The host loads its config file and hands Gatekeep an already
//! deserialized [`ListenerConfig`]. Every field has a default, so a
//! partial document is fine.

use std::time::Duration;

use gatekeep_crypto::{DEFAULT_KEY_BITS, DEFAULT_VERIFY_TOKEN_LEN};
use gatekeep_limit::AdmissionConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Smallest RSA modulus we agree to generate.
pub const MIN_KEY_BITS: usize = 512;

/// Longest verify token for any key size. Small keys allow less, see
/// [`ListenerConfig::max_verify_token_len`].
pub const MAX_VERIFY_TOKEN_LEN: usize = 64;

/// PKCS#1 v1.5 encryption padding overhead in bytes.
const PKCS1_PADDING_LEN: usize = 11;

/// Everything the listener and its tasks read at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// How long an unfinished login session stays valid. Default: 2 min.
    pub session_timeout: Duration,

    /// Global budget for admitted login starts.
    pub admission: AdmissionConfig,

    /// RSA modulus size. Game clients expect 1024.
    pub key_bits: usize,

    /// Length of the per-attempt verify token. Default: 4.
    pub verify_token_len: usize,

    /// Server id sent in the encryption request and mixed into the join
    /// hash. Modern servers send an empty string.
    pub server_id: String,

    /// The only reason a denied client ever sees.
    pub deny_message: String,

    /// Whether verified skins should be forwarded to the game profile.
    pub forward_skin: bool,

    /// How often the background sweeper purges expired sessions.
    pub sweep_interval: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(120),
            admission: AdmissionConfig::default(),
            key_bits: DEFAULT_KEY_BITS,
            verify_token_len: DEFAULT_VERIFY_TOKEN_LEN,
            server_id: String::new(),
            deny_message: "Failed to verify username!".to_string(),
            forward_skin: true,
            sweep_interval: Duration::from_secs(30),
        }
    }
}

impl ListenerConfig {
    /// Replaces values that would break the login flow with defaults.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if self.session_timeout.is_zero() {
            warn!("session_timeout is zero, using default");
            self.session_timeout = defaults.session_timeout;
        }
        if self.key_bits < MIN_KEY_BITS {
            warn!(key_bits = self.key_bits, "key_bits too small, using default");
            self.key_bits = defaults.key_bits;
        }
        if self.verify_token_len == 0 || self.verify_token_len > self.max_verify_token_len() {
            warn!(
                verify_token_len = self.verify_token_len,
                "verify_token_len out of range, using default"
            );
            self.verify_token_len = defaults.verify_token_len;
        }
        if self.sweep_interval.is_zero() {
            warn!("sweep_interval is zero, using default");
            self.sweep_interval = defaults.sweep_interval;
        }
        self.admission = self.admission.validated();
        self
    }

    /// Longest verify token a client can encrypt under a `key_bits` key.
    pub fn max_verify_token_len(&self) -> usize {
        let block = (self.key_bits / 8).saturating_sub(PKCS1_PADDING_LEN);
        block.min(MAX_VERIFY_TOKEN_LEN)
    }

    /// Whether the host must install its own skin listener.
    ///
    /// Platforms that already apply the skin during pre-login do not
    /// need one.
    pub fn needs_skin_listener(&self, platform_applies_skin_at_prelogin: bool) -> bool {
        self.forward_skin && !platform_applies_skin_at_prelogin
    }
}
