/// Errors from secret handling.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid secret length: {len} bytes (allowed {min}..={max})")]
    InvalidSecretLength { len: usize, min: usize, max: usize },

    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),
}
