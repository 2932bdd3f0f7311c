//! The server's RSA key pair.
//!
//! Game clients expect a 1024-bit RSA key encoded as X.509
//! SubjectPublicKeyInfo DER, and encrypt with PKCS#1 v1.5 padding.

use std::fmt;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use crate::CryptoError;

/// Modulus size clients expect.
pub const DEFAULT_KEY_BITS: usize = 1024;

/// Length of the AES shared secret the client picks.
pub const SHARED_SECRET_LEN: usize = 16;

/// One RSA key pair, created once per listener and never mutated.
///
/// Shared read-only (behind an `Arc`) by every name-check and
/// verification task.
pub struct ServerKeyPair {
    private: RsaPrivateKey,
    /// The public key, DER-encoded once up front. It goes into every
    /// encryption request and every join hash.
    public_der: Vec<u8>,
}

impl ServerKeyPair {
    /// Generates a fresh key pair with a `bits`-bit modulus.
    ///
    /// # Errors
    /// [`CryptoError::KeyGeneration`] if the RSA library refuses the size,
    /// [`CryptoError::KeyEncoding`] if the public key cannot be encoded.
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(CryptoError::KeyGeneration)?;
        tracing::debug!(bits, "server key pair generated");
        Self::from_private_key(private)
    }

    /// Wraps an existing private key.
    ///
    /// # Errors
    /// [`CryptoError::KeyEncoding`] if the public key cannot be encoded.
    pub fn from_private_key(private: RsaPrivateKey) -> Result<Self, CryptoError> {
        let public_der = private
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?
            .as_bytes()
            .to_vec();
        Ok(Self {
            private,
            public_der,
        })
    }

    /// The public key as X.509 SubjectPublicKeyInfo DER.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_der
    }

    /// The public key.
    pub fn public_key(&self) -> RsaPublicKey {
        self.private.to_public_key()
    }

    /// Decrypts a PKCS#1 v1.5 ciphertext produced with our public key.
    ///
    /// # Errors
    /// [`CryptoError::EmptyCiphertext`] for an empty input,
    /// [`CryptoError::Rsa`] for anything that does not decrypt.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.is_empty() {
            return Err(CryptoError::EmptyCiphertext);
        }
        self.private
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(CryptoError::Rsa)
    }

    /// Decrypts the client's shared secret and checks its length.
    ///
    /// # Errors
    /// Everything [`decrypt`](Self::decrypt) returns, plus
    /// [`CryptoError::SecretLength`] when the plaintext is not
    /// [`SHARED_SECRET_LEN`] bytes.
    pub fn decrypt_shared_secret(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let secret = self.decrypt(ciphertext)?;
        if secret.len() != SHARED_SECRET_LEN {
            return Err(CryptoError::SecretLength {
                expected: SHARED_SECRET_LEN,
                actual: secret.len(),
            });
        }
        Ok(secret)
    }
}

/// Never print key material.
impl fmt::Debug for ServerKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerKeyPair")
            .field("public_der_len", &self.public_der.len())
            .finish_non_exhaustive()
    }
}

/// Encrypts `plaintext` for the server whose DER public key is given, the
/// way a game client answers an encryption request.
///
/// # Errors
/// [`CryptoError::KeyEncoding`] if the key does not parse,
/// [`CryptoError::Rsa`] if encryption fails (e.g. the plaintext is too
/// long for the modulus).
pub fn client_encrypt(public_key_der: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let public = RsaPublicKey::from_public_key_der(public_key_der)
        .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
    public
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
        .map_err(CryptoError::Rsa)
}
