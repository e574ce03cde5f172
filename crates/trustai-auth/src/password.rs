use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use std::sync::LazyLock;

use crate::error::PasswordError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Digest verified when a login names no account, so unknown emails cost
/// the same Argon2 work as a wrong password.
static DUMMY_DIGEST: LazyLock<String> =
    LazyLock::new(|| hash_password("Unused-Placeholder-0").unwrap_or_default());

/// Check a new password against the account policy. The first unmet rule is
/// reported.
pub fn validate_password_policy(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort(MIN_PASSWORD_LEN));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordError::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PasswordError::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordError::MissingDigit);
    }
    Ok(())
}

/// Hash with Argon2id and a fresh random salt. The PHC string embeds the
/// salt and parameters, so nothing else needs storing.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// A digest that fails to parse never verifies.
pub fn verify_password(password: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Spends one verification against a throwaway digest.
pub fn verify_against_dummy(password: &str) {
    let _ = verify_password(password, &DUMMY_DIGEST);
}
