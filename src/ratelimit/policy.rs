//! Rate-limit policies per endpoint class.

use serde::Serialize;

// == Endpoint Class ==
/// Groups endpoints sharing a request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointClass {
    /// Unauthenticated or expensive endpoints
    Strict,
    /// Regular content reads
    Normal,
    /// Cheap or authenticated endpoints
    Relaxed,
    /// Inbound change notifications
    Webhook,
}

impl EndpointClass {
    pub const ALL: [EndpointClass; 4] = [
        EndpointClass::Strict,
        EndpointClass::Normal,
        EndpointClass::Relaxed,
        EndpointClass::Webhook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointClass::Strict => "strict",
            EndpointClass::Normal => "normal",
            EndpointClass::Relaxed => "relaxed",
            EndpointClass::Webhook => "webhook",
        }
    }
}

// == Rate Limit Policy ==
/// A fixed-window budget: `max_requests` per `window_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl RateLimitPolicy {
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }
}

// == Presets ==
/// Policies for every [`EndpointClass`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPresets {
    strict: RateLimitPolicy,
    normal: RateLimitPolicy,
    relaxed: RateLimitPolicy,
    webhook: RateLimitPolicy,
}

impl RateLimitPresets {
    pub fn policy(&self, class: EndpointClass) -> RateLimitPolicy {
        match class {
            EndpointClass::Strict => self.strict,
            EndpointClass::Normal => self.normal,
            EndpointClass::Relaxed => self.relaxed,
            EndpointClass::Webhook => self.webhook,
        }
    }

    pub fn set(&mut self, class: EndpointClass, policy: RateLimitPolicy) {
        let slot = match class {
            EndpointClass::Strict => &mut self.strict,
            EndpointClass::Normal => &mut self.normal,
            EndpointClass::Relaxed => &mut self.relaxed,
            EndpointClass::Webhook => &mut self.webhook,
        };
        *slot = policy;
    }
}

impl Default for RateLimitPresets {
    fn default() -> Self {
        Self {
            strict: RateLimitPolicy::new(10, 15 * 60),
            normal: RateLimitPolicy::new(100, 15 * 60),
            relaxed: RateLimitPolicy::new(1000, 15 * 60),
            // roughly one notification per second
            webhook: RateLimitPolicy::new(60, 60),
        }
    }
}
