//! Token signing and password hashing

pub mod jwt;
pub mod password;

pub use jwt::{create_token, verify_token, JwtConfig, TokenClaims, DEV_JWT_SECRET};
pub use password::{hash_password, verify_password, PASSWORD_COST};
