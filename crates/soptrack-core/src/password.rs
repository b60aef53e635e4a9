//! # Password Policy and Hashing
//!
//! Stored format: `{salt}${hex(PBKDF2-HMAC-SHA256(password, salt, 100_000))}`
//! where `salt` is 16 lowercase hex characters and is fed to PBKDF2 as its
//! ASCII bytes. Verification compares digests in constant time.

use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{CoreError, ValidationError};

/// PBKDF2 iteration count.
pub const PBKDF2_ROUNDS: u32 = 100_000;

const SALT_BYTES: usize = 8;
const DIGEST_BYTES: usize = 32;
const MIN_LENGTH: usize = 8;

/// Enforce the password policy: at least 8 characters, one digit, one
/// uppercase letter.
pub fn check_policy(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_LENGTH {
        return Err(ValidationError::WeakPassword(
            "Password must be at least 8 characters",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::WeakPassword(
            "Password must contain at least one number",
        ));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(ValidationError::WeakPassword(
            "Password must contain at least one uppercase letter",
        ));
    }
    Ok(())
}

fn derive(password: &str, salt: &str) -> [u8; DIGEST_BYTES] {
    let mut out = [0u8; DIGEST_BYTES];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut out);
    out
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut salt);
    hash_with_salt(password, &hex::encode(salt))
}

/// Hash a password with a caller-supplied salt.
pub fn hash_with_salt(password: &str, salt: &str) -> String {
    format!("{salt}${}", hex::encode(derive(password, salt)))
}

/// Verify `password` against a stored hash.
///
/// Returns [`CoreError::MalformedHash`] when the stored value is not in the
/// `salt$hex` format; callers treat that the same as a mismatch.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CoreError> {
    let (salt, expected_hex) = stored.split_once('$').ok_or(CoreError::MalformedHash)?;
    let expected = hex::decode(expected_hex).map_err(|_| CoreError::MalformedHash)?;
    if expected.len() != DIGEST_BYTES {
        return Err(CoreError::MalformedHash);
    }
    let actual = derive(password, salt);
    Ok(actual.ct_eq(expected.as_slice()).into())
}
