/// Authentication extractors and utilities
///
/// There is no ambient "current user": handlers take an [`AuthContext`] or
/// [`StaffContext`] and pass the acting user to managers explicitly.
use crate::{
    account::{User, UserRole},
    api::middleware::extract_bearer_token,
    config::AuthConfig,
    context::AppContext,
    error::{BoardError, BoardResult},
    ids::UserId,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims carried by access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> BoardResult<UserId> {
        self.sub
            .parse::<i64>()
            .map(UserId)
            .map_err(|_| BoardError::Authentication("Invalid token subject".to_string()))
    }
}

/// Sign an HS256 access token for `user`
pub fn issue_token(config: &AuthConfig, user: &User) -> BoardResult<(String, DateTime<Utc>)> {
    let now = Utc::now();
    let expires_at = now + Duration::minutes(config.token_ttl_minutes);
    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role,
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| BoardError::Jwt(e.to_string()))?;

    Ok((token, expires_at))
}

/// Verify a JWT token with full validation
///
/// Checks the signature and expiry (with five minutes of leeway for clock
/// skew) and decodes the claims.
pub fn verify_token(token: &str, jwt_secret: &str) -> BoardResult<Claims> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 300;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("JWT verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    BoardError::Authentication("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    BoardError::Authentication("Invalid token signature".to_string())
                }
                _ => BoardError::Authentication(format!("Invalid token: {}", e)),
            }
        })
}

/// Authenticated context: the caller's current account row
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    pub fn role(&self) -> UserRole {
        self.user.role
    }

    pub fn is_staff(&self) -> bool {
        self.user.is_staff()
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = BoardError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| BoardError::Authentication("Missing authorization header".to_string()))?;

        let claims = verify_token(&token, &state.config.authentication.jwt_secret)?;

        // Role and status are read from the row, not trusted from the token
        let user = match state.accounts.get_user(claims.user_id()?).await {
            Ok(user) => user,
            Err(BoardError::NotFound(_)) => {
                return Err(BoardError::Authentication(
                    "Account no longer exists".to_string(),
                ))
            }
            Err(e) => return Err(e),
        };
        user.check_access(Utc::now())?;

        Ok(AuthContext { user })
    }
}

/// Moderator or admin
#[derive(Debug, Clone)]
pub struct StaffContext {
    pub user: User,
}

impl StaffContext {
    pub fn user_id(&self) -> UserId {
        self.user.id
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for StaffContext {
    type Rejection = BoardError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;

        if !auth.is_staff() {
            tracing::warn!(user_id = %auth.user_id(), "staff endpoint refused");
            return Err(BoardError::Authorization("Moderator role required".to_string()));
        }

        Ok(StaffContext { user: auth.user })
    }
}

/// Require an exact role for employer-only or seeker-only endpoints
pub fn require_role(auth: &AuthContext, role: UserRole) -> BoardResult<()> {
    if auth.role() != role {
        return Err(BoardError::Authorization(format!(
            "Requires the {} role",
            role.as_str()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::UserStatus;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-that-is-long-enough-0123456789".to_string(),
            token_ttl_minutes: 30,
            admin_emails: Vec::new(),
        }
    }

    fn user(role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: UserId(42),
            name: "Grace".into(),
            email: "grace@example.com".into(),
            password_hash: String::new(),
            role,
            status: UserStatus::Active,
            ban_reason: None,
            banned_until: None,
            warning_count: 0,
            headline: None,
            bio: None,
            location: None,
            phone: None,
            resume_path: None,
            photo_path: None,
            profile_completed_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let config = config();
        let (token, expires_at) = issue_token(&config, &user(UserRole::Employer)).unwrap();
        assert!(expires_at > Utc::now());

        let claims = verify_token(&token, &config.jwt_secret).unwrap();
        assert_eq!(claims.user_id().unwrap(), UserId(42));
        assert_eq!(claims.role, UserRole::Employer);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (token, _) = issue_token(&config(), &user(UserRole::JobSeeker)).unwrap();
        let err = verify_token(&token, "another-secret-that-is-long-enough-xx").unwrap_err();
        assert!(matches!(err, BoardError::Authentication(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut config = config();
        config.token_ttl_minutes = -60;
        let (token, _) = issue_token(&config, &user(UserRole::JobSeeker)).unwrap();
        assert!(verify_token(&token, &config.jwt_secret).is_err());
    }

    #[test]
    fn test_require_role() {
        let auth = AuthContext {
            user: user(UserRole::Employer),
        };
        assert!(require_role(&auth, UserRole::Employer).is_ok());
        assert!(matches!(
            require_role(&auth, UserRole::JobSeeker),
            Err(BoardError::Authorization(_))
        ));
    }
}
