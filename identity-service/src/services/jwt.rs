use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::services::ServiceError;

/// Session token codec.
///
/// Tokens are stateless: validity is signature plus expiry, nothing else.
/// The embedded role is trusted as of issuance, so a role change only takes
/// effect once the current token expires and a new one is issued.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_ttl_hours: i64,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (account ID)
    pub sub: String,
    /// Role at issuance time
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Token ID
    pub jti: String,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            session_ttl_hours: config.session_ttl_hours,
        }
    }

    /// Issue a signed session token for an account.
    pub fn issue(&self, account_id: Uuid, role: &str) -> Result<String, ServiceError> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.session_ttl_hours);

        let claims = SessionClaims {
            sub: account_id.to_string(),
            role: role.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to encode token: {}", e)))
    }

    /// Validate and decode a session token.
    ///
    /// Expiry and signature failures are distinguished for telemetry; both
    /// map to 401 at the boundary.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, ServiceError> {
        let validation = Validation::new(Algorithm::HS256);

        match decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(ServiceError::TokenExpired),
                _ => Err(ServiceError::TokenInvalid),
            },
        }
    }

    /// Session TTL in seconds (for client info).
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_hours * 3600
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> JwtService {
        JwtService::new(&JwtConfig {
            secret: "test-secret".to_string(),
            session_ttl_hours: 24,
        })
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let service = test_service();
        let account_id = Uuid::new_v4();

        let token = service.issue(account_id, "staff").unwrap();
        assert!(!token.is_empty());

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, account_id.to_string());
        assert_eq!(claims.role, "staff");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let service = test_service();
        assert!(matches!(
            service.verify("not-a-token"),
            Err(ServiceError::TokenInvalid)
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let service = test_service();
        let other = JwtService::new(&JwtConfig {
            secret: "different-secret".to_string(),
            session_ttl_hours: 24,
        });

        let token = other.issue(Uuid::new_v4(), "user").unwrap();
        assert!(matches!(
            service.verify(&token),
            Err(ServiceError::TokenInvalid)
        ));
    }

    #[test]
    fn test_verify_reports_expiry_distinctly() {
        let service = test_service();
        let now = Utc::now();

        // Expired well past the decoder's default leeway.
        let claims = SessionClaims {
            sub: Uuid::new_v4().to_string(),
            role: "user".to_string(),
            exp: (now - Duration::hours(2)).timestamp(),
            iat: (now - Duration::hours(3)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(
            service.verify(&token),
            Err(ServiceError::TokenExpired)
        ));
    }
}
