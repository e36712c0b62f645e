use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 20;

lazy_static! {
    static ref UPPERCASE_RE: Regex = Regex::new(r"[A-Z]").unwrap();
    static ref DIGIT_RE: Regex = Regex::new(r"[0-9]").unwrap();
    // underscore and non-ASCII characters count as special
    static ref SPECIAL_RE: Regex = Regex::new(r"[^A-Za-z0-9]").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("password must be between 8 and 20 characters")]
    Length,
    #[error("password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("password must contain at least one digit")]
    MissingDigit,
    #[error("password must contain at least one special character")]
    MissingSpecial,
}

/// Checks a candidate password against the account password policy.
pub fn validate_password(password: &str) -> Result<(), PolicyViolation> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&len) {
        return Err(PolicyViolation::Length);
    }
    if !UPPERCASE_RE.is_match(password) {
        return Err(PolicyViolation::MissingUppercase);
    }
    if !DIGIT_RE.is_match(password) {
        return Err(PolicyViolation::MissingDigit);
    }
    if !SPECIAL_RE.is_match(password) {
        return Err(PolicyViolation::MissingSpecial);
    }
    Ok(())
}

/// SHA-256 of the password, lowercase hex.
pub fn digest_password(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}

/// Constant-time equality for two hex digests.
pub fn digests_match(candidate: &str, stored: &str) -> bool {
    candidate.as_bytes().ct_eq(stored.as_bytes()).into()
}
