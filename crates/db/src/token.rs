//! Signed bearer tokens for stateless API clients.
//!
//! The claims carried here are a snapshot taken at issuance. The role
//! claim is a cache hint only: authorization decisions must re-fetch the
//! user record, since roles can change server-side after a token has
//! been handed out.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::user::User;

/// How long an issued token remains valid.
pub const TOKEN_VALIDITY_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The user's database id.
    pub sub: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    /// Expiry as a Unix timestamp.
    pub exp: i64,
}

fn secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!(
            "JWT_SECRET is not set, falling back to an insecure default"
        );
        "insecure-development-secret".to_string()
    })
}

/// Issues a fresh token for this user. Tokens are minted at interactive
/// login and at OAuth callback completion, never reused across sessions.
pub fn issue_token(user: &User) -> Result<String, jsonwebtoken::errors::Error> {
    issue_token_expiring_at(
        user,
        (Utc::now() + Duration::days(TOKEN_VALIDITY_DAYS)).timestamp(),
    )
}

pub fn issue_token_expiring_at(
    user: &User,
    exp: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role.clone(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret().as_ref()),
    )
}

/// Checks the signature and expiry of a presented token. Returns the
/// claims on success; any failure means the caller is anonymous.
pub fn verify_token(
    token: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret().as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::Role;

    fn test_user() -> User {
        User {
            id: 17,
            public_id: "0191f3a0-0000-7000-8000-000000000000".to_string(),
            username: "ana".to_string(),
            email: Some("ana@example.com".to_string()),
            google_id: None,
            password_hash: None,
            role: Role::Member.as_str().to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn round_trip() {
        let token = issue_token(&test_user()).unwrap();
        let claims = verify_token(&token).unwrap();

        assert_eq!(claims.sub, 17);
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.role, "member");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify_token("not.a.token").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // well past the default validation leeway
        let exp = (Utc::now() - Duration::hours(2)).timestamp();
        let token = issue_token_expiring_at(&test_user(), exp).unwrap();
        assert!(verify_token(&token).is_err());
    }
}
