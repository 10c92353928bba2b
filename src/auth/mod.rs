//! Credential primitives: password hashing, secret encryption, bearer
//! tokens, and single-use token material.

pub mod password;
pub mod secretbox;
pub mod session;
pub mod tokens;

pub use password::PasswordVault;
pub use secretbox::{SecretBox, SecretBoxError};
pub use session::{Claims, SessionTokenIssuer, TokenError};
