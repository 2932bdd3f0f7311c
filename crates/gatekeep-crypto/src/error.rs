/// Errors from key handling and decryption.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Generating the RSA key pair failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(#[source] rsa::Error),

    /// The public key could not be encoded or decoded as DER.
    #[error("public key encoding failed: {0}")]
    KeyEncoding(String),

    /// The ciphertext was empty.
    #[error("nothing to decrypt")]
    EmptyCiphertext,

    /// RSA decryption (or client-side encryption) failed.
    #[error("rsa operation failed: {0}")]
    Rsa(#[source] rsa::Error),

    /// The decrypted shared secret is not 16 bytes long.
    #[error("shared secret must be {expected} bytes, got {actual}")]
    SecretLength { expected: usize, actual: usize },
}
