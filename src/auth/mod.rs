//! Operator authentication: credential exchange with the upstream API and the
//! local role/expiry check on the token it issues.

pub mod claims;
pub mod login;

pub use claims::{token_expired, ClaimError, TokenClaims, TokenVerifier};
pub use login::{login, safe_redirect, Credentials, FieldErrors, LoginError, LoginForm};
