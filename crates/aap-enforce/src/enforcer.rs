//! Runtime enforcement of per-request constraints.
//!
//! Constraints within a capability combine under AND semantics. Rate-limit
//! state is in-memory, keyed by token `jti`, and may be evicted at any time
//! once entries fall outside the longest window; loss reopens the window and
//! is acceptable.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::debug;
use url::Url;

use aap_core::{AapError, AapResult, Constraints, RequestContext, TimeWindow};

/// Enforces capability constraints against request context.
pub struct ConstraintEnforcer {
    hourly_counters: Mutex<HashMap<String, HashMap<i64, u64>>>,
    request_timestamps: Mutex<HashMap<String, Vec<i64>>>,
}

impl Default for ConstraintEnforcer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintEnforcer {
    pub fn new() -> Self {
        Self {
            hourly_counters: Mutex::new(HashMap::new()),
            request_timestamps: Mutex::new(HashMap::new()),
        }
    }

    /// Enforce every constraint of a matched capability.
    pub fn enforce(
        &self,
        constraints: &Constraints,
        request: &RequestContext,
        token_jti: &str,
    ) -> AapResult<()> {
        self.enforce_at(constraints, request, token_jti, Utc::now())
    }

    pub(crate) fn enforce_at(
        &self,
        constraints: &Constraints,
        request: &RequestContext,
        token_jti: &str,
        now: DateTime<Utc>,
    ) -> AapResult<()> {
        let now_ts = now.timestamp();

        self.enforce_rate_limits(constraints, token_jti, now_ts)?;

        if let Some(target_url) = &request.target_url {
            enforce_domain_constraints(constraints, target_url)?;
        }

        if let Some(window) = &constraints.time_window {
            enforce_time_window(window, now)?;
        }

        if let Some(allowed_methods) = &constraints.allowed_methods {
            if !allowed_methods.iter().any(|m| m == &request.method) {
                return Err(AapError::MethodNotAllowed(format!(
                    "HTTP method {} is not allowed for this capability",
                    request.method
                )));
            }
        }

        if let Some(max_size) = constraints.max_request_size {
            if request.content_length > max_size {
                return Err(AapError::RequestTooLarge(
                    "Request payload exceeds maximum allowed size".to_string(),
                ));
            }
        }

        // data_classification_max requires resource metadata; declared only.

        Ok(())
    }

    fn enforce_rate_limits(
        &self,
        constraints: &Constraints,
        token_jti: &str,
        now_ts: i64,
    ) -> AapResult<()> {
        // Fixed wall-clock hour buckets, aligned to minute 0.
        if let Some(max_per_hour) = constraints.max_requests_per_hour {
            let current_hour = now_ts.div_euclid(3600);
            let mut counters = self
                .hourly_counters
                .lock()
                .map_err(|_| AapError::Internal("Rate limit state poisoned".to_string()))?;
            let buckets = counters.entry(token_jti.to_string()).or_default();

            let count = buckets.get(&current_hour).copied().unwrap_or(0);
            if count >= max_per_hour {
                debug!(jti = %token_jti, "Hourly rate limit exceeded");
                return Err(AapError::RateLimited(
                    "Rate limit exceeded for this capability".to_string(),
                ));
            }
            buckets.insert(current_hour, count + 1);
            buckets.retain(|hour, _| *hour >= current_hour - 1);
        }

        // Sliding 60-second window over request timestamps.
        if let Some(max_per_minute) = constraints.max_requests_per_minute {
            let cutoff = now_ts - 60;
            let mut windows = self
                .request_timestamps
                .lock()
                .map_err(|_| AapError::Internal("Rate limit state poisoned".to_string()))?;
            let timestamps = windows.entry(token_jti.to_string()).or_default();

            timestamps.retain(|ts| *ts > cutoff);
            if timestamps.len() as u64 >= max_per_minute {
                debug!(jti = %token_jti, "Per-minute rate limit exceeded");
                return Err(AapError::RateLimited(
                    "Rate limit exceeded for this capability".to_string(),
                ));
            }
            timestamps.push(now_ts);
        }

        Ok(())
    }

    /// Drop rate-limit entries that can no longer affect any decision.
    pub fn purge_expired(&self, now: DateTime<Utc>) {
        let now_ts = now.timestamp();
        let current_hour = now_ts.div_euclid(3600);

        if let Ok(mut counters) = self.hourly_counters.lock() {
            counters.retain(|_, buckets| {
                buckets.retain(|hour, _| *hour >= current_hour - 1);
                !buckets.is_empty()
            });
        }
        if let Ok(mut windows) = self.request_timestamps.lock() {
            let cutoff = now_ts - 60;
            windows.retain(|_, timestamps| {
                timestamps.retain(|ts| *ts > cutoff);
                !timestamps.is_empty()
            });
        }
    }
}

fn enforce_domain_constraints(constraints: &Constraints, target_url: &str) -> AapResult<()> {
    let host = Url::parse(target_url)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.to_string()))
        .ok_or_else(|| {
            AapError::InvalidTarget("Target URL does not contain a valid domain".to_string())
        })?;

    // Blocked entries take precedence over the allowlist.
    if let Some(blocked) = &constraints.domains_blocked {
        if domain_matches_list(&host, blocked) {
            return Err(AapError::DomainNotAllowed(
                "The requested domain is blocked".to_string(),
            ));
        }
    }

    if let Some(allowed) = &constraints.domains_allowed {
        if !domain_matches_list(&host, allowed) {
            return Err(AapError::DomainNotAllowed(
                "The requested domain is not in the allowed list".to_string(),
            ));
        }
    }

    Ok(())
}

/// DNS-suffix match: `host` matches `entry` iff equal or `host` ends with
/// `".entry"`.
fn domain_matches_list(host: &str, domain_list: &[String]) -> bool {
    domain_list
        .iter()
        .any(|entry| host == entry || host.ends_with(&format!(".{entry}")))
}

fn enforce_time_window(window: &TimeWindow, now: DateTime<Utc>) -> AapResult<()> {
    if let Some(start) = window.start {
        if now < start {
            return Err(AapError::CapabilityExpired(
                "Request is before the allowed time window".to_string(),
            ));
        }
    }
    if let Some(end) = window.end {
        if now >= end {
            return Err(AapError::CapabilityExpired(
                "Request is after the allowed time window".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn constraints(json: serde_json::Value) -> Constraints {
        serde_json::from_value(json).unwrap()
    }

    fn at(ts: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(ts, 0).unwrap()
    }

    fn get_request() -> RequestContext {
        RequestContext::new("search.web", "GET")
    }

    #[test]
    fn hourly_limit_uses_fixed_buckets() {
        let enforcer = ConstraintEnforcer::new();
        let c = constraints(serde_json::json!({ "max_requests_per_hour": 2 }));
        let base = 1_700_000_400; // mid-hour

        assert!(enforcer.enforce_at(&c, &get_request(), "jti-1", at(base)).is_ok());
        assert!(enforcer.enforce_at(&c, &get_request(), "jti-1", at(base + 1)).is_ok());
        let err = enforcer
            .enforce_at(&c, &get_request(), "jti-1", at(base + 2))
            .unwrap_err();
        assert_eq!(err.code(), "aap_rate_limit");
        assert_eq!(err.status(), 429);

        // A different token has its own counter.
        assert!(enforcer.enforce_at(&c, &get_request(), "jti-2", at(base + 3)).is_ok());

        // The next wall-clock hour starts a fresh bucket.
        let next_hour = (base / 3600 + 1) * 3600;
        assert!(enforcer
            .enforce_at(&c, &get_request(), "jti-1", at(next_hour))
            .is_ok());
    }

    #[test]
    fn minute_limit_is_a_sliding_window() {
        let enforcer = ConstraintEnforcer::new();
        let c = constraints(serde_json::json!({ "max_requests_per_minute": 2 }));
        let base = 1_700_000_000;

        assert!(enforcer.enforce_at(&c, &get_request(), "jti-1", at(base)).is_ok());
        assert!(enforcer.enforce_at(&c, &get_request(), "jti-1", at(base + 30)).is_ok());
        assert!(enforcer
            .enforce_at(&c, &get_request(), "jti-1", at(base + 59))
            .is_err());

        // 61 seconds after the first request it has slid out of the window.
        assert!(enforcer
            .enforce_at(&c, &get_request(), "jti-1", at(base + 61))
            .is_ok());
    }

    #[test]
    fn domain_suffix_matching_allows_subdomains_only() {
        let c = constraints(serde_json::json!({ "domains_allowed": ["example.org"] }));
        let enforcer = ConstraintEnforcer::new();
        let now = at(1_700_000_000);

        let ok = get_request().with_target_url("https://api.v2.example.org/search");
        assert!(enforcer.enforce_at(&c, &ok, "jti-1", now).is_ok());

        let exact = get_request().with_target_url("https://example.org/");
        assert!(enforcer.enforce_at(&c, &exact, "jti-1", now).is_ok());

        let lookalike = get_request().with_target_url("https://notexample.org/");
        let err = enforcer.enforce_at(&c, &lookalike, "jti-1", now).unwrap_err();
        assert_eq!(err.code(), "aap_domain_not_allowed");
        assert_eq!(err.status(), 403);
    }

    #[test]
    fn blocked_domains_take_precedence_over_allowed() {
        let c = constraints(serde_json::json!({
            "domains_allowed": ["example.org"],
            "domains_blocked": ["internal.example.org"]
        }));
        let enforcer = ConstraintEnforcer::new();
        let now = at(1_700_000_000);

        let blocked = get_request().with_target_url("https://db.internal.example.org/");
        let err = enforcer.enforce_at(&c, &blocked, "jti-1", now).unwrap_err();
        assert!(err.description().contains("blocked"));

        let allowed = get_request().with_target_url("https://www.example.org/");
        assert!(enforcer.enforce_at(&c, &allowed, "jti-1", now).is_ok());
    }

    #[test]
    fn target_without_a_host_is_rejected() {
        let c = constraints(serde_json::json!({ "domains_allowed": ["example.org"] }));
        let enforcer = ConstraintEnforcer::new();
        let request = get_request().with_target_url("not a url");

        let err = enforcer
            .enforce_at(&c, &request, "jti-1", at(1_700_000_000))
            .unwrap_err();
        assert_eq!(err.code(), "invalid_target");
    }

    #[test]
    fn requests_outside_the_time_window_are_rejected() {
        let c = constraints(serde_json::json!({
            "time_window": {
                "start": "2026-01-01T09:00:00Z",
                "end": "2026-01-01T17:00:00Z"
            }
        }));
        let enforcer = ConstraintEnforcer::new();
        let request = get_request();

        let start = chrono::DateTime::parse_from_rfc3339("2026-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let before = enforcer
            .enforce_at(&c, &request, "jti-1", start - chrono::Duration::hours(1))
            .unwrap_err();
        assert_eq!(before.code(), "aap_capability_expired");
        assert!(before.description().contains("before"));

        assert!(enforcer
            .enforce_at(&c, &request, "jti-1", start + chrono::Duration::hours(1))
            .is_ok());

        // The end bound is exclusive.
        let end = chrono::DateTime::parse_from_rfc3339("2026-01-01T17:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let after = enforcer.enforce_at(&c, &request, "jti-1", end).unwrap_err();
        assert!(after.description().contains("after"));
    }

    #[test]
    fn method_and_size_constraints_apply() {
        let c = constraints(serde_json::json!({
            "allowed_methods": ["GET", "HEAD"],
            "max_request_size": 1024
        }));
        let enforcer = ConstraintEnforcer::new();
        let now = at(1_700_000_000);

        let post = RequestContext::new("search.web", "POST");
        let err = enforcer.enforce_at(&c, &post, "jti-1", now).unwrap_err();
        assert_eq!(err.code(), "method_not_allowed");
        assert_eq!(err.status(), 405);

        let oversized = get_request().with_content_length(2048);
        let err = enforcer.enforce_at(&c, &oversized, "jti-1", now).unwrap_err();
        assert_eq!(err.code(), "request_too_large");
        assert_eq!(err.status(), 413);

        let fine = get_request().with_content_length(512);
        assert!(enforcer.enforce_at(&c, &fine, "jti-1", now).is_ok());
    }

    #[test]
    fn empty_constraints_always_pass() {
        let enforcer = ConstraintEnforcer::new();
        let request = get_request().with_target_url("https://anywhere.example.net/");
        assert!(enforcer
            .enforce_at(&Constraints::default(), &request, "jti-1", at(1_700_000_000))
            .is_ok());
    }

    #[test]
    fn purge_drops_entries_outside_every_window() {
        let enforcer = ConstraintEnforcer::new();
        let c = constraints(serde_json::json!({
            "max_requests_per_hour": 10,
            "max_requests_per_minute": 10
        }));
        let base = 1_700_000_000;
        enforcer
            .enforce_at(&c, &get_request(), "jti-1", at(base))
            .unwrap();

        enforcer.purge_expired(at(base + 7200 + 3600));

        assert!(enforcer.hourly_counters.lock().unwrap().is_empty());
        assert!(enforcer.request_timestamps.lock().unwrap().is_empty());
    }
}
