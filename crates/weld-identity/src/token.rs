//! Login-token verification
//!
//! Weld never issues tokens; the external identity provider does. This
//! module only verifies inbound bearer tokens with an explicitly pinned
//! algorithm so an attacker cannot downgrade to `none` or swap key
//! types.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use weld_core::{Result, WeldError};

/// Only HS256 tokens are accepted.
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Minimum secret length (256 bits = 32 bytes)
const MIN_SECRET_LENGTH: usize = 32;

/// Claims carried by a login token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject at the identity provider
    pub sub: String,
    /// Login email; provisioning is keyed on this
    pub email: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Validates bearer tokens presented to the login middleware.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: String,
    issuer: String,
    audience: String,
}

impl TokenVerifier {
    pub fn new(secret: String, issuer: String, audience: String) -> Self {
        if secret.len() < MIN_SECRET_LENGTH {
            warn!(
                "Token secret is only {} bytes, recommended minimum is {} bytes for HS256",
                secret.len(),
                MIN_SECRET_LENGTH
            );
        }

        Self {
            secret,
            issuer,
            audience,
        }
    }

    /// Validate a token and return its claims. Enforces the algorithm,
    /// issuer, audience, and expiry.
    #[instrument(skip(self, token))]
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            warn!(error = %e, "Token verification failed");
            WeldError::authentication(format!("token verification failed: {}", e))
        })?;

        debug!(sub = %token_data.claims.sub, "Token verified");
        Ok(token_data.claims)
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-key-that-is-long-enough-for-hs256";

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(
            SECRET.to_string(),
            "https://idp.example.com".to_string(),
            "weld".to_string(),
        )
    }

    fn issue(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(JWT_ALGORITHM),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims() -> Claims {
        let now = chrono::Utc::now().timestamp();
        Claims {
            sub: "idp|123".to_string(),
            email: "dev@example.com".to_string(),
            name: Some("Dev".to_string()),
            iss: "https://idp.example.com".to_string(),
            aud: "weld".to_string(),
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn valid_token_decodes_its_claims() {
        let token = issue(&claims(), SECRET);

        let decoded = verifier().verify(&token).unwrap();
        assert_eq!(decoded.email, "dev@example.com");
        assert_eq!(decoded.name.as_deref(), Some("Dev"));
        assert_eq!(decoded.sub, "idp|123");
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let mut claims = claims();
        claims.iss = "https://other.example.com".to_string();
        let token = issue(&claims, SECRET);

        assert!(verifier().verify(&token).is_err());
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let mut claims = claims();
        claims.aud = "someone-else".to_string();
        let token = issue(&claims, SECRET);

        assert!(verifier().verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = claims();
        claims.exp = chrono::Utc::now().timestamp() - 600;
        let token = issue(&claims, SECRET);

        let err = verifier().verify(&token).unwrap_err();
        assert!(matches!(err, WeldError::AuthenticationFailed { .. }));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue(&claims(), "a-different-secret-also-long-enough!!");

        assert!(verifier().verify(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verifier().verify("not.a.token").is_err());
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let rendered = format!("{:?}", verifier());
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("idp.example.com"));
    }
}
