/// Rate Limiting
use crate::{
    config::RateLimitConfig,
    error::{ApiError, ApiResult},
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

fn non_zero(value: u32, fallback: NonZeroU32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(fallback)
}

/// Rate limiter manager
///
/// Login and registration get a strict per-minute quota; every other
/// request shares the general per-second quota. Both buckets are global
/// to the process and not keyed by client address, so one noisy client
/// can use up the auth quota for everyone until it refills.
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    general: Arc<DirectLimiter>,
    auth: Arc<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let general_quota = Quota::per_second(non_zero(config.requests_per_second, NonZeroU32::MIN))
            .allow_burst(non_zero(config.burst_size, NonZeroU32::MIN));

        let auth_per_minute = non_zero(config.auth_requests_per_minute, NonZeroU32::MIN);
        let auth_quota = Quota::per_minute(auth_per_minute).allow_burst(auth_per_minute);

        Self {
            enabled: config.enabled,
            general: Arc::new(GovernorLimiter::direct(general_quota)),
            auth: Arc::new(GovernorLimiter::direct(auth_quota)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn check(limiter: &DirectLimiter, fallback_wait: Duration) -> ApiResult<()> {
        limiter.check().map_err(|not_until| {
            let wait = not_until.wait_time_from(governor::clock::Clock::now(&DefaultClock::default()));
            ApiError::RateLimitExceeded {
                retry_after: if wait.is_zero() { fallback_wait } else { wait },
            }
        })
    }

    /// Check the general quota
    pub fn check_general(&self) -> ApiResult<()> {
        Self::check(&self.general, Duration::from_secs(1))
    }

    /// Check the login/registration quota
    pub fn check_auth(&self) -> ApiResult<()> {
        Self::check(&self.auth, Duration::from_secs(60))
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<crate::context::AppContext>,
    request: Request,
    next: Next,
) -> Response {
    if !ctx.rate_limiter.is_enabled() {
        return next.run(request).await;
    }

    let result = if request.uri().path().starts_with("/api/auth/") {
        ctx.rate_limiter.check_auth()
    } else {
        ctx.rate_limiter.check_general()
    };

    match result {
        Ok(()) => next.run(request).await,
        Err(err) => {
            tracing::warn!("Rate limited {} {}", request.method(), request.uri().path());
            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rps: u32, auth_per_minute: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            requests_per_second: rps,
            auth_requests_per_minute: auth_per_minute,
            burst_size: burst,
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(&config(100, 30, 50));

        assert!(limiter.is_enabled());
        assert!(limiter.check_general().is_ok());
        assert!(limiter.check_auth().is_ok());
    }

    #[test]
    fn test_burst_limit() {
        let limiter = RateLimiter::new(&config(10, 30, 5));

        for _ in 0..5 {
            assert!(limiter.check_general().is_ok());
        }

        let err = limiter.check_general().unwrap_err();
        assert!(matches!(err, ApiError::RateLimitExceeded { .. }));
    }

    #[test]
    fn test_auth_quota_is_separate() {
        let limiter = RateLimiter::new(&config(100, 3, 50));

        for _ in 0..3 {
            assert!(limiter.check_auth().is_ok());
        }
        assert!(limiter.check_auth().is_err());
        assert!(limiter.check_general().is_ok());
    }

    #[test]
    fn test_clones_share_one_auth_bucket() {
        let limiter = RateLimiter::new(&config(100, 2, 50));
        let other_client = limiter.clone();

        assert!(limiter.check_auth().is_ok());
        assert!(limiter.check_auth().is_ok());
        assert!(matches!(
            other_client.check_auth(),
            Err(ApiError::RateLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_zero_values_fall_back() {
        let limiter = RateLimiter::new(&config(0, 0, 0));
        assert!(limiter.check_general().is_ok());
    }
}
