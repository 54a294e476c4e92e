//! Jetons d'authentification signés (format JWT, HMAC-SHA256)

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::models::{IdentityID, Role};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Missing token")]
    Missing,
    #[error("Malformed token")]
    Malformed,
    #[error("Invalid token signature")]
    BadSignature,
    #[error("Token has expired")]
    Expired,
    #[error("Unusable signing key")]
    Key,
}

/// Le contenu d'un jeton: l'identité, son rôle, et la fenêtre de validité
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: IdentityID,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Émet et vérifie les jetons avec un secret partagé
pub struct TokenIssuer {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Émet un jeton pour une identité, valable pendant la durée configurée
    pub fn issue(&self, sub: IdentityID, role: Role) -> Result<String, TokenError> {
        let now = Utc::now();
        self.sign(&Claims {
            sub,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        })
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = Header {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };

        let header_json = serde_json::to_vec(&header).map_err(|_| TokenError::Malformed)?;
        let claims_json = serde_json::to_vec(claims).map_err(|_| TokenError::Malformed)?;

        let message = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = self.mac(&message)?.finalize().into_bytes();

        Ok(format!("{}.{}", message, URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Vérifie la signature puis l'expiration, et renvoie les claims.
    /// Accepte un préfixe `Bearer `.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let token = token.trim();
        let token = token.strip_prefix("Bearer").unwrap_or(token).trim();
        if token.is_empty() {
            return Err(TokenError::Missing);
        }

        let mut parts = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        // Comparaison en temps constant
        self.mac(&format!("{header}.{claims}"))?
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&claims).map_err(|_| TokenError::Malformed)?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self, message: &str) -> Result<HmacSha256, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::Key)?;
        mac.update(message.as_bytes());
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", Duration::days(7))
    }

    #[test]
    fn test_issued_token_resolves_to_identity() {
        let id = IdentityID::new();
        let token = issuer().issue(id, Role::Doctor).unwrap();
        let claims = issuer().verify(&token).unwrap();

        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Doctor);
        assert_eq!(claims.exp - claims.iat, Duration::days(7).num_seconds());
    }

    #[test]
    fn test_bearer_prefix_is_accepted() {
        let token = issuer().issue(IdentityID::new(), Role::Patient).unwrap();
        assert!(issuer().verify(&format!("Bearer {token}")).is_ok());
    }

    #[test]
    fn test_expired_token_is_refused() {
        let now = Utc::now().timestamp();
        let token = issuer()
            .sign(&Claims {
                sub: IdentityID::new(),
                role: Role::Patient,
                iat: now - 100,
                exp: now - 10,
            })
            .unwrap();
        assert_eq!(issuer().verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_foreign_secret_is_refused() {
        let token = TokenIssuer::new("other-secret", Duration::days(7))
            .issue(IdentityID::new(), Role::Hospital)
            .unwrap();
        assert_eq!(issuer().verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_tampered_claims_are_refused() {
        let token = issuer().issue(IdentityID::new(), Role::Patient).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = serde_json::json!({
            "sub": IdentityID::new(),
            "role": "hospital",
            "iat": 0,
            "exp": i64::MAX,
        });
        let forged = URL_SAFE_NO_PAD.encode(forged.to_string());
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);

        assert_eq!(issuer().verify(&tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_garbage_is_refused() {
        assert_eq!(issuer().verify(""), Err(TokenError::Missing));
        assert_eq!(issuer().verify("Bearer "), Err(TokenError::Missing));
        assert_eq!(issuer().verify("a.b"), Err(TokenError::Malformed));
        assert_eq!(issuer().verify("a.b.c.d"), Err(TokenError::Malformed));
        assert_eq!(issuer().verify("a.b.!!"), Err(TokenError::Malformed));
    }
}
