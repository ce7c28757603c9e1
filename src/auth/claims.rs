use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

/// Claims the admin tool cares about in an upstream bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub sub: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token signature does not match the upstream key")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("role {0:?} is not allowed to use the admin tool")]
    InsufficientRole(Option<String>),
}

/// Local admission check on a freshly issued bearer token.
///
/// With an upstream key configured the HS256 signature is verified. Without
/// one the payload is only decoded, which makes the result a hint: a forged
/// token with the right claims passes, and the upstream API remains the
/// enforcement point.
#[derive(Clone)]
pub struct TokenVerifier {
    key: Option<DecodingKey>,
    required_role: String,
}

impl TokenVerifier {
    pub fn new(security: &SecurityConfig) -> Self {
        Self {
            key: security
                .upstream_jwt_secret
                .as_deref()
                .map(|secret| DecodingKey::from_secret(secret.as_bytes())),
            required_role: security.required_role.clone(),
        }
    }

    pub fn verifies_signature(&self) -> bool {
        self.key.is_some()
    }

    pub fn check(&self, token: &str) -> Result<TokenClaims, ClaimError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;

        let unverified = DecodingKey::from_secret(&[]);
        let key = match &self.key {
            Some(key) => key,
            None => {
                validation.insecure_disable_signature_validation();
                &unverified
            }
        };

        let claims = decode::<TokenClaims>(token, key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ClaimError::Expired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    ClaimError::BadSignature
                }
                _ => ClaimError::Malformed(e.to_string()),
            })?
            .claims;

        if claims.role.as_deref() != Some(self.required_role.as_str()) {
            return Err(ClaimError::InsufficientRole(claims.role));
        }

        Ok(claims)
    }

    pub fn is_authorized(&self, token: &str) -> bool {
        self.check(token).is_ok()
    }
}

#[derive(Debug, Deserialize)]
struct Expiry {
    #[serde(default)]
    exp: Option<i64>,
}

/// Whether `token` carries an `exp` claim that has already passed.
///
/// Only the payload is read; the signature was checked at sign-in. Tokens
/// whose payload cannot be read are left for the upstream API to judge.
pub fn token_expired(token: &str) -> bool {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<Expiry>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => data
            .claims
            .exp
            .is_some_and(|exp| exp < chrono::Utc::now().timestamp()),
        Err(_) => false,
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("verifies_signature", &self.verifies_signature())
            .field("required_role", &self.required_role)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn security(secret: Option<&str>) -> SecurityConfig {
        SecurityConfig {
            upstream_jwt_secret: secret.map(str::to_string),
            required_role: "admin".to_string(),
        }
    }

    fn token(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_an_hour() -> i64 {
        (Utc::now() + Duration::hours(1)).timestamp()
    }

    #[test]
    fn test_admin_with_future_expiry_passes() {
        let verifier = TokenVerifier::new(&security(None));
        let t = token(json!({"role": "admin", "exp": in_an_hour(), "sub": "me"}), "any");
        let claims = verifier.check(&t).unwrap();
        assert_eq!(claims.role.as_deref(), Some("admin"));
        assert_eq!(claims.sub.as_deref(), Some("me"));
    }

    #[test]
    fn test_token_expired() {
        let past = (Utc::now() - Duration::hours(1)).timestamp();
        assert!(token_expired(&token(json!({"role": "admin", "exp": past}), "any")));
        assert!(!token_expired(&token(json!({"role": "admin", "exp": in_an_hour()}), "any")));
        assert!(!token_expired(&token(json!({"role": "admin"}), "any")));
        assert!(!token_expired("opaque-bearer"));
    }

    #[test]
    fn test_non_admin_role_rejected() {
        let verifier = TokenVerifier::new(&security(None));
        let t = token(json!({"role": "user", "exp": in_an_hour()}), "any");
        assert_eq!(
            verifier.check(&t).unwrap_err(),
            ClaimError::InsufficientRole(Some("user".to_string()))
        );

        let t = token(json!({"exp": in_an_hour()}), "any");
        assert_eq!(verifier.check(&t).unwrap_err(), ClaimError::InsufficientRole(None));
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = TokenVerifier::new(&security(None));
        let past = (Utc::now() - Duration::seconds(5)).timestamp();
        let t = token(json!({"role": "admin", "exp": past}), "any");
        assert_eq!(verifier.check(&t).unwrap_err(), ClaimError::Expired);
        assert!(!verifier.is_authorized(&t));
    }

    #[test]
    fn test_malformed_tokens_are_not_authorized() {
        let verifier = TokenVerifier::new(&security(None));
        for garbage in ["", "abc", "a.b.c", "a.!!!.c", "eyJhbGciOiJIUzI1NiJ9.bm90IGpzb24.sig"] {
            assert!(
                matches!(verifier.check(garbage), Err(ClaimError::Malformed(_))),
                "{garbage:?} should be malformed"
            );
        }

        let t = token(json!({"role": "admin"}), "any");
        assert!(matches!(verifier.check(&t), Err(ClaimError::Malformed(_))));
    }

    #[test]
    fn test_signature_verified_when_key_configured() {
        let verifier = TokenVerifier::new(&security(Some("upstream-key")));
        assert!(verifier.verifies_signature());

        let good = token(json!({"role": "admin", "exp": in_an_hour()}), "upstream-key");
        assert!(verifier.is_authorized(&good));

        let forged = token(json!({"role": "admin", "exp": in_an_hour()}), "attacker");
        assert_eq!(verifier.check(&forged).unwrap_err(), ClaimError::BadSignature);
    }
}
