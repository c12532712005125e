//! Policy evaluation engine.
//!
//! Loads operator policies once at startup and resolves requested action
//! names into granted capabilities. The table is immutable after load, so
//! reads are lock-free.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use aap_core::{Capability, Constraints};

use crate::document::{OperatorPolicy, PolicyDefaults, PolicyDocument};
use crate::error::{PolicyError, PolicyResult};

/// Engine resolving requested actions against per-operator policies.
pub struct PolicyEngine {
    policies: HashMap<String, OperatorPolicy>,
}

impl PolicyEngine {
    /// Load every `*.json` document under `policy_dir`.
    ///
    /// A malformed document is logged and skipped; a missing directory yields
    /// an empty table. Loading never fails the process.
    pub fn load(policy_dir: &Path, defaults: PolicyDefaults) -> Self {
        let mut policies = HashMap::new();

        let entries = match std::fs::read_dir(policy_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %policy_dir.display(), error = %e, "Policy directory unavailable; no policies loaded");
                return Self { policies };
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::load_file(&path, defaults) {
                Ok(policy) => {
                    debug!(
                        operator = %policy.operator,
                        policy_id = %policy.policy_id,
                        capabilities = policy.allowed_capabilities.len(),
                        "Loaded operator policy"
                    );
                    policies.insert(policy.operator.clone(), policy);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping policy file");
                }
            }
        }

        info!(count = policies.len(), "Policy table initialized");
        Self { policies }
    }

    fn load_file(path: &Path, defaults: PolicyDefaults) -> PolicyResult<OperatorPolicy> {
        let contents = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: PolicyDocument =
            serde_json::from_str(&contents).map_err(|source| PolicyError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        OperatorPolicy::from_document(document, defaults)
    }

    /// Build an engine from already-resolved policies.
    pub fn from_policies(policies: impl IntoIterator<Item = OperatorPolicy>) -> Self {
        Self {
            policies: policies
                .into_iter()
                .map(|p| (p.operator.clone(), p))
                .collect(),
        }
    }

    /// Policy for an operator, if one is loaded.
    pub fn get_policy(&self, operator: &str) -> Option<&OperatorPolicy> {
        self.policies.get(operator)
    }

    /// Resolve requested actions into granted capabilities.
    ///
    /// Each requested action is matched (exact, case-sensitive) against the
    /// first policy rule with that action; unmatched requests are dropped
    /// silently. An empty result means every request was rejected and must be
    /// treated as a denial by the caller.
    pub fn evaluate_capabilities(
        &self,
        operator: &str,
        requested_actions: &[String],
        _task_purpose: Option<&str>,
    ) -> PolicyResult<Vec<Capability>> {
        let policy = self
            .get_policy(operator)
            .ok_or_else(|| PolicyError::NoPolicy(operator.to_string()))?;

        let mut granted = Vec::new();
        for requested in requested_actions {
            let rule = policy
                .allowed_capabilities
                .iter()
                .find(|rule| rule.action == *requested);

            if let Some(rule) = rule {
                let constraints =
                    merge_constraints(&rule.default_constraints, &policy.global_constraints);
                granted.push(Capability {
                    action: requested.clone(),
                    constraints,
                    description: rule.description.clone(),
                    resources: rule.resources.clone(),
                });
            } else {
                debug!(operator, action = %requested, "Requested action not in policy; dropped");
            }
        }

        Ok(granted)
    }

    /// Tighten capabilities for a token derived at `new_depth`.
    ///
    /// Rate limits halve per depth level (floored at 1), a `max_depth`
    /// constraint is decremented (floored at 0), and everything else is
    /// copied verbatim. Deterministic; the identity at depth 0.
    pub fn reduce_for_delegation(
        &self,
        capabilities: Vec<Capability>,
        new_depth: u32,
    ) -> Vec<Capability> {
        let reduction_factor = 0.5_f64.powi(new_depth as i32);

        capabilities
            .into_iter()
            .map(|mut capability| {
                let constraints = &mut capability.constraints;
                if let Some(limit) = constraints.max_requests_per_hour {
                    constraints.max_requests_per_hour =
                        Some(reduced_rate(limit, reduction_factor));
                }
                if let Some(limit) = constraints.max_requests_per_minute {
                    constraints.max_requests_per_minute =
                        Some(reduced_rate(limit, reduction_factor));
                }
                if let Some(depth_limit) = constraints.max_depth {
                    constraints.max_depth = Some(depth_limit.saturating_sub(new_depth));
                }
                capability
            })
            .collect()
    }
}

fn reduced_rate(limit: u64, factor: f64) -> u64 {
    ((limit as f64 * factor) as u64).max(1)
}

/// Merge capability defaults with policy-wide constraints under the monotone
/// tightening rule: missing keys are added, numeric keys take the minimum,
/// `*allowed*` lists intersect, `*blocked*` lists union, and any other shape
/// keeps the capability-local value. Unrecognized keys are only ever added,
/// never combined.
pub fn merge_constraints(capability: &Constraints, global: &Constraints) -> Constraints {
    let mut merged = capability.clone();

    merged.max_requests_per_hour =
        min_option(capability.max_requests_per_hour, global.max_requests_per_hour);
    merged.max_requests_per_minute = min_option(
        capability.max_requests_per_minute,
        global.max_requests_per_minute,
    );
    merged.max_request_size = min_option(capability.max_request_size, global.max_request_size);
    merged.max_depth = min_option(capability.max_depth, global.max_depth);

    merged.domains_allowed =
        intersect_option(&capability.domains_allowed, &global.domains_allowed);
    merged.allowed_methods =
        intersect_option(&capability.allowed_methods, &global.allowed_methods);
    merged.domains_blocked = union_option(&capability.domains_blocked, &global.domains_blocked);

    if merged.time_window.is_none() {
        merged.time_window = global.time_window.clone();
    }
    if merged.data_classification_max.is_none() {
        merged.data_classification_max = global.data_classification_max.clone();
    }

    for (key, value) in &global.extra {
        merged
            .extra
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }

    merged
}

fn min_option<T: Ord + Copy>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn intersect_option(a: &Option<Vec<String>>, b: &Option<Vec<String>>) -> Option<Vec<String>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.iter().filter(|item| b.contains(item)).cloned().collect()),
        (a, b) => a.clone().or_else(|| b.clone()),
    }
}

fn union_option(a: &Option<Vec<String>>, b: &Option<Vec<String>>) -> Option<Vec<String>> {
    match (a, b) {
        (Some(a), Some(b)) => {
            let mut merged = a.clone();
            for item in b {
                if !merged.contains(item) {
                    merged.push(item.clone());
                }
            }
            Some(merged)
        }
        (a, b) => a.clone().or_else(|| b.clone()),
    }
}
