//! Ordered JSON-RPC endpoints with per-endpoint health.
//!
//! The pool only decides *which* endpoint to use. Providers themselves are
//! built per wallet by the chain client, one per endpoint, and indexed the same
//! way as [`RpcPool::endpoints`].

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use url::Url;

use crate::error::ConfigError;

/// How long an endpoint is avoided after a connectivity failure.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Default)]
struct Health {
    failures: u32,
    cooling_until: Option<Instant>,
}

impl Health {
    fn available(&self, now: Instant) -> bool {
        self.cooling_until.map_or(true, |until| until <= now)
    }
}

#[derive(Debug)]
struct State {
    active: usize,
    health: Vec<Health>,
}

#[derive(Debug)]
pub struct RpcPool {
    endpoints: Vec<Url>,
    cooldown: Duration,
    state: Mutex<State>,
}

impl RpcPool {
    pub fn new(endpoints: Vec<Url>) -> Result<Self, ConfigError> {
        Self::with_cooldown(endpoints, DEFAULT_COOLDOWN)
    }

    pub fn with_cooldown(endpoints: Vec<Url>, cooldown: Duration) -> Result<Self, ConfigError> {
        if endpoints.is_empty() {
            return Err(ConfigError::NoRpcEndpoints);
        }
        let health = vec![Health::default(); endpoints.len()];
        Ok(Self {
            endpoints,
            cooldown,
            state: Mutex::new(State { active: 0, health }),
        })
    }

    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Index of the endpoint to use next.
    pub fn active(&self) -> usize {
        self.active_at(Instant::now())
    }

    fn active_at(&self, now: Instant) -> usize {
        let mut state = self.state.lock();
        let len = state.health.len();

        let healthy = (0..len)
            .map(|offset| (state.active + offset) % len)
            .find(|&idx| state.health[idx].available(now));

        // Everyone is cooling down; take whoever recovers first.
        let idx = healthy.unwrap_or_else(|| {
            (0..len)
                .min_by_key(|&idx| state.health[idx].cooling_until)
                .unwrap_or(0)
        });
        state.active = idx;
        idx
    }

    pub fn report_failure(&self, idx: usize) {
        self.report_failure_at(idx, Instant::now());
    }

    fn report_failure_at(&self, idx: usize, now: Instant) {
        let mut state = self.state.lock();
        let len = state.health.len();
        let Some(health) = state.health.get_mut(idx) else {
            return;
        };
        health.failures += 1;
        health.cooling_until = Some(now + self.cooldown);
        tracing::warn!(
            endpoint = %self.endpoints[idx],
            failures = health.failures,
            "rpc endpoint unhealthy, rotating"
        );
        if state.active == idx {
            state.active = (idx + 1) % len;
        }
    }

    pub fn report_success(&self, idx: usize) {
        let mut state = self.state.lock();
        if let Some(health) = state.health.get_mut(idx) {
            *health = Health::default();
        }
    }
}
