//! Verify tokens: the per-attempt challenge bytes.

use rand::RngCore;
use subtle::ConstantTimeEq;

/// Token length sent by vanilla servers.
pub const DEFAULT_VERIFY_TOKEN_LEN: usize = 4;

/// Generates `len` random challenge bytes.
///
/// `thread_rng` is a CSPRNG seeded from the OS, one per worker thread, so
/// concurrent tasks never contend on it.
pub fn verify_token(len: usize) -> Vec<u8> {
    let mut token = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut token);
    token
}

/// Compares the token we stored with the one the client sent back.
///
/// Runs in time independent of how many leading bytes match. Different
/// lengths never match.
pub fn tokens_match(expected: &[u8], actual: &[u8]) -> bool {
    expected.ct_eq(actual).into()
}
