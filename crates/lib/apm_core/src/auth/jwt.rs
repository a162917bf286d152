//! Bearer token payload decoding.
//!
//! Only the payload segment is read. Signature verification belongs to the
//! backend; the client never holds the signing key.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Claims issued by the AccessPointMap backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user) identifier.
    #[serde(default)]
    pub nameid: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Display name. The backend spells the claim `uniquie_name`.
    #[serde(rename = "uniquie_name", default)]
    pub unique_name: Option<String>,
    /// Expiry (unix timestamp).
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Decode the claims of a bearer token without verifying its signature.
pub fn decode_claims(token: &str) -> Result<TokenClaims, AuthError> {
    if token.split('.').count() != 3 {
        return Err(AuthError::MalformedToken(
            "expected three dot-separated segments".into(),
        ));
    }

    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::MalformedToken(e.to_string()))
}
