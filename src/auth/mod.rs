//! Credential authentication.
//!
//! Two credential kinds are accepted as bearer tokens:
//!
//! - scoped API tokens (`pat_…`), looked up by SHA-256 hash and carrying an
//!   explicit permission set
//! - primary login tokens (HS256 JWTs), granting every capability

mod authenticator;
mod error;
mod login;
mod principal;


pub use authenticator::{
    Authenticator, IssuedToken, MAX_TOKENS_PER_USER, TOKEN_PREFIX, display_prefix,
    generate_token, hash_token,
};
pub use error::AuthError;
pub use login::{LoginClaims, LoginKeys};
pub use principal::{Capabilities, Capability, Principal};
