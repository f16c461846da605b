//! Password hashing utilities

use bcrypt::{hash, verify};

/// Work factor used for new password hashes
pub const PASSWORD_COST: u32 = 12;

/// Hash a password using bcrypt
pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}
