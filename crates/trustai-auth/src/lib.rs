//! Credential hashing and signed-token issuance.
//!
//! Everything here is synchronous and free of I/O. Password hashing is
//! deliberately slow; async callers should run it on a blocking thread.

pub mod error;
pub mod password;
pub mod token;

pub use error::{PasswordError, TokenError};
pub use password::{
    hash_password, validate_password_policy, verify_against_dummy, verify_password,
};
pub use token::{RESET_TOKEN_TTL, TokenService};
