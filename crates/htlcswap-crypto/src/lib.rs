pub mod error;
pub mod hashlock;

pub use error::CryptoError;
pub use hashlock::{commit, generate_secret, generate_secret_with_len, verify, Secret, DEFAULT_SECRET_LEN};
