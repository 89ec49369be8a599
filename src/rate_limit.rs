/// Rate limiting by caller class
///
/// Three shared governor buckets: anonymous callers, authenticated users and
/// staff. The class comes from the bearer token's role claim; the token is
/// only decoded here, full authentication still happens in the extractors.
use crate::{
    api::middleware::extract_bearer_token,
    auth::verify_token,
    config::RateLimitConfig,
    context::AppContext,
    error::{BoardError, BoardResult},
    metrics,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerClass {
    Anonymous,
    Authenticated,
    Staff,
}

impl CallerClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerClass::Anonymous => "anonymous",
            CallerClass::Authenticated => "authenticated",
            CallerClass::Staff => "staff",
        }
    }
}

fn quota(rps: u32, burst: u32) -> Quota {
    let rps = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(rps);
    Quota::per_second(rps).allow_burst(burst)
}

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    anonymous: Arc<DirectLimiter>,
    authenticated: Arc<DirectLimiter>,
    staff: Arc<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            anonymous: Arc::new(GovernorLimiter::direct(quota(
                config.anonymous_rps,
                (config.burst_size / 5).max(1),
            ))),
            authenticated: Arc::new(GovernorLimiter::direct(quota(
                config.authenticated_rps,
                config.burst_size,
            ))),
            staff: Arc::new(GovernorLimiter::direct(quota(
                config.staff_rps,
                config.burst_size.saturating_mul(2),
            ))),
        }
    }

    pub fn check(&self, class: CallerClass) -> BoardResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let limiter = match class {
            CallerClass::Anonymous => &self.anonymous,
            CallerClass::Authenticated => &self.authenticated,
            CallerClass::Staff => &self.staff,
        };

        limiter.check().map_err(|_| {
            metrics::record_rate_limited(class.as_str());
            BoardError::RateLimitExceeded {
                retry_after: Duration::from_secs(1),
            }
        })
    }
}

/// Classify the caller from the Authorization header
///
/// A header with an undecodable token counts as anonymous.
pub fn classify(request: &Request, jwt_secret: &str) -> CallerClass {
    match extract_bearer_token(request.headers()) {
        Some(token) => match verify_token(&token, jwt_secret) {
            Ok(claims) if claims.role.is_staff() => CallerClass::Staff,
            Ok(_) => CallerClass::Authenticated,
            Err(_) => CallerClass::Anonymous,
        },
        None => CallerClass::Anonymous,
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    let class = classify(&request, &ctx.config.authentication.jwt_secret);

    match ctx.rate_limiter.check(class) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::debug!(class = class.as_str(), path = %request.uri().path(), "rate limited");
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool) -> RateLimitConfig {
        RateLimitConfig {
            enabled,
            anonymous_rps: 1,
            authenticated_rps: 10,
            staff_rps: 100,
            burst_size: 5,
        }
    }

    #[test]
    fn test_burst_limit() {
        let limiter = RateLimiter::new(&config(true));

        for _ in 0..5 {
            assert!(limiter.check(CallerClass::Authenticated).is_ok());
        }
        assert!(matches!(
            limiter.check(CallerClass::Authenticated),
            Err(BoardError::RateLimitExceeded { .. })
        ));

        // Buckets are independent
        assert!(limiter.check(CallerClass::Staff).is_ok());
    }

    #[test]
    fn test_anonymous_has_smallest_burst() {
        let limiter = RateLimiter::new(&config(true));
        assert!(limiter.check(CallerClass::Anonymous).is_ok());
        assert!(limiter.check(CallerClass::Anonymous).is_err());
    }

    #[test]
    fn test_disabled_limiter_allows_everything() {
        let limiter = RateLimiter::new(&config(false));
        for _ in 0..50 {
            assert!(limiter.check(CallerClass::Anonymous).is_ok());
        }
    }

    #[test]
    fn test_classify_without_token() {
        let request = Request::builder()
            .uri("/api/jobs")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(classify(&request, "secret"), CallerClass::Anonymous);
    }
}
