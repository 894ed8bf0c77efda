//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Limits the write endpoints (reading submission, policy reload, alert
//! status changes) per client IP using tower_governor.

use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tracing::warn;

/// Governor config keyed by peer IP, reporting X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Apply limits to write endpoints
    pub enabled: bool,
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Requests that can be made immediately
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 1,
            burst_size: 20,
        }
    }
}

impl RateLimitConfig {
    /// Tight limits for shared deployments
    pub fn strict() -> Self {
        Self {
            enabled: true,
            per_second: 4,
            burst_size: 2,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Build the governor config, or `None` when limiting is off
///
/// Uses PeerIpKeyExtractor, so the server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<DefaultGovernorConfig>> {
    if !config.enabled {
        return None;
    }

    let governor = GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish();
    if governor.is_none() {
        warn!(
            "Rate limiting disabled: invalid config (per_second {}, burst {})",
            config.per_second, config.burst_size
        );
    }
    governor.map(Arc::new)
}
