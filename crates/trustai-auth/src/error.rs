use thiserror::Error;

use trustai_types::api::TokenPurpose;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password must be at least {0} characters long")]
    TooShort(usize),
    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("Password must contain at least one number")]
    MissingDigit,
    #[error("password hashing failed: {0}")]
    Hash(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, malformed structure, or missing required claims.
    #[error("invalid token")]
    Invalid,
    #[error("token has expired")]
    Expired,
    #[error("token issued for {found:?} cannot be used for {expected:?}")]
    PurposeMismatch {
        expected: TokenPurpose,
        found: TokenPurpose,
    },
    #[error("token encoding failed: {0}")]
    Encoding(String),
}
