/// Authentication extractors and utilities
///
/// Tokens are HS256 JWTs issued at login (or by another issuer sharing the
/// secret). The `user_id` claim identifies the caller; `role` defaults to
/// `member` when absent.
use crate::{api::middleware::extract_bearer_token, context::AppContext, error::AppError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }

    /// Role from a token claim. Anything other than `admin` is a member.
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim {
            Some("admin") => Role::Admin,
            _ => Role::Member,
        }
    }
}

/// An authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Authenticated context - extracts and validates the bearer token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub actor: Actor,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let actor = verify_access_token(&token, &state.config.authentication.jwt_secret)?;

        Ok(AuthContext { actor })
    }
}

/// Admin authentication context - requires the admin role
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub actor: Actor,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let AuthContext { actor } = AuthContext::from_request_parts(parts, state).await?;

        if !actor.is_admin() {
            tracing::warn!(
                user_id = actor.id,
                role = actor.role.as_str(),
                "Non-admin attempted admin access"
            );
            return Err(AppError::Forbidden("admin access only".to_string()));
        }

        Ok(AdminAuthContext { actor })
    }
}

/// Caller if a valid bearer token was sent. A missing or invalid token
/// means an anonymous viewer rather than a rejection.
#[derive(Debug, Clone)]
pub struct OptionalAuthContext {
    pub actor: Option<Actor>,
}

impl OptionalAuthContext {
    pub fn user_id(&self) -> Option<i64> {
        self.actor.map(|actor| actor.id)
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let actor = extract_bearer_token(&parts.headers).and_then(|token| {
            verify_access_token(&token, &state.config.authentication.jwt_secret).ok()
        });

        Ok(OptionalAuthContext { actor })
    }
}

#[derive(Debug, Serialize)]
struct AccessClaims<'a> {
    user_id: i64,
    email: &'a str,
    role: &'static str,
    exp: i64,
}

/// Sign an access token valid for `ttl_secs`
pub fn issue_access_token(
    user_id: i64,
    email: &str,
    role: Role,
    jwt_secret: &str,
    ttl_secs: i64,
) -> Result<String, AppError> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = AccessClaims {
        user_id,
        email,
        role: role.as_str(),
        exp: chrono::Utc::now().timestamp() + ttl_secs,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to generate token: {}", e)))
}

/// Verify a JWT and extract the caller
///
/// This performs:
/// 1. JWT signature verification
/// 2. Expiration checking
/// 3. Claims validation
pub fn verify_access_token(token: &str, jwt_secret: &str) -> Result<Actor, AppError> {
    use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (5 minutes)
    validation.leeway = 300;

    let token_data = decode::<serde_json::Value>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!("JWT verification failed: {}", e);
        match e.kind() {
            ErrorKind::ExpiredSignature => {
                AppError::Authentication("Token has expired".to_string())
            }
            ErrorKind::InvalidSignature => {
                AppError::Authentication("Invalid token signature".to_string())
            }
            _ => AppError::Authentication("invalid token".to_string()),
        }
    })?;

    let claims = &token_data.claims;

    // Issuers encode user_id as a JSON number, sometimes a float
    let id = claims
        .get("user_id")
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .ok_or_else(|| AppError::Authentication("invalid token payload".to_string()))?;

    let role = Role::from_claim(claims.get("role").and_then(|v| v.as_str()));

    Ok(Actor { id, role })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mint_token, TEST_JWT_SECRET};
    use jsonwebtoken::{encode, EncodingKey, Header};

    #[test]
    fn test_role_from_claim() {
        assert_eq!(Role::from_claim(Some("admin")), Role::Admin);
        assert_eq!(Role::from_claim(Some("member")), Role::Member);
        assert_eq!(Role::from_claim(Some("Admin")), Role::Member);
        assert_eq!(Role::from_claim(None), Role::Member);
    }

    #[test]
    fn test_verify_access_token() {
        let token = mint_token(7, Some("admin"));
        let actor = verify_access_token(&token, TEST_JWT_SECRET).unwrap();
        assert_eq!(actor, Actor { id: 7, role: Role::Admin });
        assert!(actor.is_admin());

        let token = mint_token(8, None);
        let actor = verify_access_token(&token, TEST_JWT_SECRET).unwrap();
        assert_eq!(actor.role, Role::Member);
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let token = mint_token(7, Some("admin"));
        assert!(matches!(
            verify_access_token(&token, "another-secret-of-sufficient-length!!"),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn test_verify_rejects_missing_user_id() {
        let claims = serde_json::json!({ "role": "admin", "exp": 4_102_444_800u64 });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            verify_access_token(&token, TEST_JWT_SECRET),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn test_issued_token_verifies() {
        let token = issue_access_token(5, "ayu@example.com", Role::Admin, TEST_JWT_SECRET, 60)
            .unwrap();
        assert_eq!(
            verify_access_token(&token, TEST_JWT_SECRET).unwrap(),
            Actor { id: 5, role: Role::Admin }
        );

        // Past the 5 minute leeway
        let stale =
            issue_access_token(5, "ayu@example.com", Role::Member, TEST_JWT_SECRET, -600).unwrap();
        assert!(verify_access_token(&stale, TEST_JWT_SECRET).is_err());
    }

    #[test]
    fn test_verify_rejects_expired() {
        let claims = serde_json::json!({ "user_id": 1, "exp": 1_000_000u64 });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        )
        .unwrap();

        let err = verify_access_token(&token, TEST_JWT_SECRET).unwrap_err();
        assert_eq!(err.to_string(), "Authentication failed: Token has expired");
    }
}
