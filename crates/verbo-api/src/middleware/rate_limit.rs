use anyhow::Context;
use axum::Router;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};

/// Apply per-client rate limiting to every route of `router`.
///
/// Clients are keyed by the `X-Forwarded-For`/`X-Real-IP` headers when
/// present, otherwise by peer address, so the server must be started with
/// connect info. Rate limit headers are added to responses.
pub fn apply_rate_limit<S>(
    router: Router<S>,
    per_second: u64,
    burst_size: u32,
) -> anyhow::Result<Router<S>>
where
    S: Clone + Send + Sync + 'static,
{
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(per_second)
        .burst_size(burst_size)
        .key_extractor(SmartIpKeyExtractor)
        .use_headers()
        .finish()
        .context("invalid rate limiter configuration: per second and burst must be non-zero")?;

    tracing::debug!(per_second, burst_size, "Rate limiting enabled");

    Ok(router.layer(GovernorLayer::new(governor_conf)))
}
