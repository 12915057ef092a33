/// Authentication extractors and utilities
use crate::{
    account::{SessionClaims, User},
    context::AppContext,
    error::ApiError,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Verify a session token's signature and expiry
pub fn verify_session_token(token: &str, jwt_secret: &str) -> Result<SessionClaims, ApiError> {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 60;

    decode::<SessionClaims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Session token rejected: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Token("Session has expired".to_string())
                }
                _ => ApiError::Token("Invalid session token".to_string()),
            }
        })
}

/// Authenticated context - resolves the bearer token to a current user
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub claims: SessionClaims,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Authentication("Sign in required".to_string()))?;

        let claims = verify_session_token(&token, &state.config.authentication.jwt_secret)?;

        // Role and profile come from the store, not the token, so role
        // changes take effect immediately.
        let user = state
            .account_manager
            .get_user(&claims.sub)
            .await
            .map_err(|_| ApiError::Authentication("Account no longer exists".to_string()))?;

        Ok(AuthContext { user, claims })
    }
}

/// Optional authenticated context - does not fail if no auth provided
#[derive(Debug, Clone)]
pub struct OptionalAuthContext {
    pub auth: Option<AuthContext>,
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = if extract_bearer_token(&parts.headers).is_some() {
            AuthContext::from_request_parts(parts, state).await.ok()
        } else {
            None
        };

        Ok(OptionalAuthContext { auth })
    }
}

/// Admin authentication context - requires the admin role
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;

        if !auth.user.is_admin() {
            tracing::warn!("{} attempted an admin action", auth.user.id);
            return Err(ApiError::Authorization("Admin role required".to_string()));
        }

        Ok(AdminAuthContext { user: auth.user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Role;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn token_with_exp(exp: i64) -> String {
        let claims = SessionClaims {
            sub: "user-1".to_string(),
            role: Role::Member,
            iat: 0,
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123token"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123token".to_string()));

        headers.insert("authorization", HeaderValue::from_static("abc123token"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_verify_valid_token() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let claims = verify_session_token(&token_with_exp(exp), SECRET).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, Role::Member);
    }

    #[test]
    fn test_expired_token_rejected() {
        let exp = chrono::Utc::now().timestamp() - 3600;
        let err = verify_session_token(&token_with_exp(exp), SECRET).unwrap_err();
        assert!(matches!(err, ApiError::Token(ref m) if m.contains("expired")));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let err = verify_session_token(&token_with_exp(exp), "another-secret-another-secret-xx")
            .unwrap_err();
        assert!(matches!(err, ApiError::Token(_)));
    }
}
