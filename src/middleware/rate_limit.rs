use crate::error::AppError;
use crate::rate_limit::{client_identity, Decision, RateLimiter};
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
    time::Instant,
};
use tracing::warn;

const RATELIMIT_LIMIT: &str = "ratelimit-limit";
const RATELIMIT_REMAINING: &str = "ratelimit-remaining";
const RATELIMIT_RESET: &str = "ratelimit-reset";

/// Applies a [`RateLimiter`] to every request in the wrapped scope.
///
/// Admitted responses carry `RateLimit-Limit`, `RateLimit-Remaining` and
/// `RateLimit-Reset`; throttled requests never reach the handler and get the
/// standard 429 body instead. If the counter store fails the request is let
/// through.
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
    trust_forwarded_for: bool,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>, trust_forwarded_for: bool) -> Self {
        Self {
            limiter,
            trust_forwarded_for,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limiter: Arc::clone(&self.limiter),
            trust_forwarded_for: self.trust_forwarded_for,
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limiter: Arc<RateLimiter>,
    trust_forwarded_for: bool,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limiter = Arc::clone(&self.limiter);
        let identity = client_identity(req.request(), self.trust_forwarded_for);

        Box::pin(async move {
            match limiter.admit(&identity, Instant::now()).await {
                Ok(Decision::Allowed {
                    limit,
                    remaining,
                    reset_after_seconds,
                }) => {
                    let mut response = service.call(req).await?;
                    let headers = response.headers_mut();
                    headers.insert(HeaderName::from_static(RATELIMIT_LIMIT), HeaderValue::from(limit));
                    headers.insert(
                        HeaderName::from_static(RATELIMIT_REMAINING),
                        HeaderValue::from(remaining),
                    );
                    headers.insert(
                        HeaderName::from_static(RATELIMIT_RESET),
                        HeaderValue::from(reset_after_seconds),
                    );
                    Ok(response.map_into_left_body())
                }
                Ok(Decision::Throttled { retry_after_seconds }) => {
                    let error = AppError::RateLimited { retry_after_seconds };
                    Ok(req.into_response(error.error_response()).map_into_right_body())
                }
                Err(e) => {
                    warn!(
                        limiter = limiter.name(),
                        identity = %identity,
                        error = %e,
                        "Rate limit store failed, admitting request"
                    );
                    let response = service.call(req).await?;
                    Ok(response.map_into_left_body())
                }
            }
        })
    }
}
