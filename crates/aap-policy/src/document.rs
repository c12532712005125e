//! Persisted operator policy documents.
//!
//! Documents are JSON files keyed by operator. The wire format nests the
//! operator under `applies_to` and carries the token-level settings
//! (`token_lifetime`, `max_delegation_depth`, `require_pop`) inside
//! `global_constraints`; loading lifts them out so they never take part in
//! per-capability constraint merging.

use serde::Deserialize;

use aap_core::{validate_action_format, Constraints, Oversight};

use crate::error::PolicyError;

/// Wire format of a policy document on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub policy_id: String,
    #[serde(default = "default_policy_version")]
    pub policy_version: String,
    pub applies_to: AppliesTo,
    #[serde(default)]
    pub allowed_capabilities: Vec<CapabilityRule>,
    #[serde(default)]
    pub global_constraints: GlobalConstraints,
    #[serde(default)]
    pub oversight: Option<Oversight>,
    #[serde(default)]
    pub audit: Option<AuditConfig>,
}

fn default_policy_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppliesTo {
    pub operator: String,
}

/// A single allowed action with its default constraints.
#[derive(Debug, Clone, Deserialize)]
pub struct CapabilityRule {
    pub action: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_constraints: Constraints,
    #[serde(default)]
    pub resources: Option<Vec<String>>,
}

/// The `global_constraints` object as persisted: token-level settings plus
/// the constraint keys merged into every granted capability.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalConstraints {
    #[serde(default)]
    pub token_lifetime: Option<u64>,
    #[serde(default)]
    pub max_delegation_depth: Option<u32>,
    #[serde(default)]
    pub require_pop: Option<bool>,
    #[serde(flatten)]
    pub constraints: Constraints,
}

/// Audit settings the issuer copies into tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub retention_period_days: Option<u64>,
    #[serde(default)]
    pub compliance_framework: Option<String>,
}

/// Fallbacks applied when a document omits token-level settings.
#[derive(Debug, Clone, Copy)]
pub struct PolicyDefaults {
    pub token_lifetime: u64,
    pub max_delegation_depth: u32,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            token_lifetime: 3600,
            max_delegation_depth: 2,
        }
    }
}

/// A loaded, resolved operator policy. Read-only after load.
#[derive(Debug, Clone)]
pub struct OperatorPolicy {
    pub policy_id: String,
    pub policy_version: String,
    pub operator: String,
    pub allowed_capabilities: Vec<CapabilityRule>,
    pub global_constraints: Constraints,
    pub oversight: Option<Oversight>,
    pub audit: Option<AuditConfig>,
    pub token_lifetime: u64,
    pub max_delegation_depth: u32,
    pub require_pop: bool,
}

impl OperatorPolicy {
    /// Resolve a wire document, validating every declared action name.
    pub fn from_document(
        document: PolicyDocument,
        defaults: PolicyDefaults,
    ) -> Result<Self, PolicyError> {
        if document.applies_to.operator.is_empty() {
            return Err(PolicyError::MissingOperator {
                policy_id: document.policy_id,
            });
        }

        for rule in &document.allowed_capabilities {
            if !validate_action_format(&rule.action) {
                return Err(PolicyError::InvalidAction {
                    policy_id: document.policy_id,
                    action: rule.action.clone(),
                });
            }
        }

        let globals = document.global_constraints;
        Ok(Self {
            policy_id: document.policy_id,
            policy_version: document.policy_version,
            operator: document.applies_to.operator,
            allowed_capabilities: document.allowed_capabilities,
            global_constraints: globals.constraints,
            oversight: document.oversight,
            audit: document.audit,
            token_lifetime: globals.token_lifetime.unwrap_or(defaults.token_lifetime),
            max_delegation_depth: globals
                .max_delegation_depth
                .unwrap_or(defaults.max_delegation_depth),
            require_pop: globals.require_pop.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> PolicyDocument {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn document_lifts_token_settings_out_of_global_constraints() {
        let document = parse(serde_json::json!({
            "policy_id": "pol-1",
            "policy_version": "1.0",
            "applies_to": { "operator": "org:acme" },
            "allowed_capabilities": [
                { "action": "search.web",
                  "default_constraints": { "max_requests_per_hour": 100 } }
            ],
            "global_constraints": {
                "token_lifetime": 1800,
                "max_delegation_depth": 1,
                "max_requests_per_minute": 10
            }
        }));

        let policy = OperatorPolicy::from_document(document, PolicyDefaults::default()).unwrap();
        assert_eq!(policy.operator, "org:acme");
        assert_eq!(policy.token_lifetime, 1800);
        assert_eq!(policy.max_delegation_depth, 1);
        assert!(!policy.require_pop);
        // Token settings must not leak into merged capability constraints.
        assert!(policy.global_constraints.extra.is_empty());
        assert_eq!(policy.global_constraints.max_requests_per_minute, Some(10));
    }

    #[test]
    fn document_defaults_apply_when_settings_are_absent() {
        let document = parse(serde_json::json!({
            "applies_to": { "operator": "org:acme" },
            "allowed_capabilities": []
        }));

        let policy = OperatorPolicy::from_document(document, PolicyDefaults::default()).unwrap();
        assert_eq!(policy.token_lifetime, 3600);
        assert_eq!(policy.max_delegation_depth, 2);
        assert_eq!(policy.policy_version, "1.0");
    }

    #[test]
    fn document_with_bad_action_name_is_rejected() {
        let document = parse(serde_json::json!({
            "policy_id": "pol-bad",
            "applies_to": { "operator": "org:acme" },
            "allowed_capabilities": [ { "action": "1bad.name" } ]
        }));

        let err = OperatorPolicy::from_document(document, PolicyDefaults::default()).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidAction { .. }));
    }
}
