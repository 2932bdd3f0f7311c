//! Key material for Gatekeep's premium login challenge.
//!
//! - [`ServerKeyPair`]: one RSA key pair per listener lifetime. The public
//!   half goes to clients in the encryption request; the private half
//!   decrypts their response.
//! - [`verify_token`] / [`tokens_match`]: per-attempt challenge bytes and
//!   their constant-time comparison.
//! - [`server_hash`]: the join hash the client and the server both report
//!   to the session service.
//! - [`client_encrypt`]: the client's side of the exchange, for tools and
//!   tests that play the client.

mod error;
mod hash;
mod keys;
mod token;

pub use error::CryptoError;
pub use hash::server_hash;
pub use keys::{client_encrypt, ServerKeyPair, DEFAULT_KEY_BITS, SHARED_SECRET_LEN};
pub use token::{tokens_match, verify_token, DEFAULT_VERIFY_TOKEN_LEN};
