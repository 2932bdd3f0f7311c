//! The join hash ("server id hash").
//!
//! Client and server each compute SHA-1 over `server_id || shared_secret
//! || public_key_der` and render it as a *signed* big-endian integer in
//! hex: negative digests get a leading `-` and are printed as their two's
//! complement magnitude, leading zeros are dropped. The client reports the
//! hash to the session service when it joins; the server asks the service
//! whether that join happened.

use sha1::{Digest, Sha1};

/// Computes the join hash for one login.
pub fn server_hash(server_id: &str, shared_secret: &[u8], public_key_der: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(server_id.as_bytes());
    hasher.update(shared_secret);
    hasher.update(public_key_der);

    let mut digest = [0u8; 20];
    digest.copy_from_slice(&hasher.finalize());

    let negative = digest[0] & 0x80 != 0;
    if negative {
        negate(&mut digest);
    }

    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    let magnitude = hex.trim_start_matches('0');
    let magnitude = if magnitude.is_empty() { "0" } else { magnitude };

    if negative {
        format!("-{magnitude}")
    } else {
        magnitude.to_string()
    }
}

/// Two's complement negation of a big-endian integer, in place.
fn negate(bytes: &mut [u8]) {
    let mut carry = true;
    for byte in bytes.iter_mut().rev() {
        *byte = !*byte;
        if carry {
            let (sum, overflow) = byte.overflowing_add(1);
            *byte = sum;
            carry = overflow;
        }
    }
}
