//! Credential rules and Argon2id hashing.

use crate::error::IdentityError;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

fn invalid(message: &'static str) -> IdentityError {
    IdentityError::Validation { message: message.into(), context: None }
}

/// 1..=150 chars of letters, digits and `@ . + - _`.
///
/// # Errors
/// [`IdentityError::Validation`] describing the first broken rule.
pub fn validate_username(username: &str) -> Result<(), IdentityError> {
    if username.is_empty() {
        return Err(invalid("Username is required."));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(invalid("Ensure the username has at most 150 characters."));
    }
    if !username.chars().all(|c| c.is_alphanumeric() || "@.+-_".contains(c)) {
        return Err(invalid(
            "Enter a valid username. This value may contain only letters, numbers, \
             and @/./+/-/_ characters.",
        ));
    }
    Ok(())
}

/// Checks a new account's username and password pair.
///
/// # Errors
/// [`IdentityError::Validation`] describing the first broken rule.
pub fn validate_registration(
    username: &str,
    password: &str,
    password_confirm: &str,
) -> Result<(), IdentityError> {
    validate_username(username)?;

    if password != password_confirm {
        return Err(invalid("The two password fields didn't match."));
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(invalid("This password is too short. It must contain at least 8 characters."));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("This password is entirely numeric."));
    }
    if password.eq_ignore_ascii_case(username) {
        return Err(invalid("The password is too similar to the username."));
    }
    Ok(())
}

/// Argon2id PHC string with a fresh 16-byte salt.
///
/// # Errors
/// [`IdentityError::Hash`] if the salt cannot be drawn or hashing fails.
pub fn hash_password(password: &str) -> Result<String, IdentityError> {
    let mut salt = [0u8; 16];
    getrandom::fill(&mut salt).map_err(|e| IdentityError::Hash {
        message: e.to_string().into(),
        context: Some("salt".into()),
    })?;
    let salt = SaltString::encode_b64(&salt)?;

    Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// `false` on a wrong password.
///
/// # Errors
/// [`IdentityError::Hash`] if `phc` is not a valid PHC string.
pub fn verify_password(password: &str, phc: &str) -> Result<bool, IdentityError> {
    let parsed = PasswordHash::new(phc)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
