//! Capability records and the constraint model carried inside tokens.
//!
//! A capability is a named permitted action plus structured constraints. The
//! constraint model is closed: every key the enforcer understands has a typed
//! field with its own merge rule, and anything else rides along opaquely.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named permitted action with structured constraints.
///
/// Capabilities are immutable once issued; derivation produces new records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Dotted action name, e.g. `search.web`.
    pub action: String,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
}

impl Capability {
    pub fn new(action: impl Into<String>, constraints: Constraints) -> Self {
        Self {
            action: action.into(),
            constraints,
            description: None,
            resources: None,
        }
    }
}

/// Recognized constraint keys, each with its own type.
///
/// Keys this implementation does not interpret land in `extra` and are
/// carried through merging and delegation untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_requests_per_hour: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_requests_per_minute: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains_allowed: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains_blocked: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_methods: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_request_size: Option<u64>,
    /// Declared but not enforced; enforcement requires resource metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_classification_max: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.max_requests_per_hour.is_none()
            && self.max_requests_per_minute.is_none()
            && self.domains_allowed.is_none()
            && self.domains_blocked.is_none()
            && self.time_window.is_none()
            && self.allowed_methods.is_none()
            && self.max_request_size.is_none()
            && self.data_classification_max.is_none()
            && self.max_depth.is_none()
            && self.extra.is_empty()
    }
}

/// Wall-clock window during which a capability may be exercised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

/// Validate an action name against the grammar
/// `component ( "." component )*` where
/// `component = ALPHA ( ALPHA / DIGIT / "-" / "_" )*`.
pub fn validate_action_format(action: &str) -> bool {
    if action.is_empty() {
        return false;
    }
    action.split('.').all(component_is_valid)
}

fn component_is_valid(component: &str) -> bool {
    let mut chars = component.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_well_formed_action_names() {
        assert!(validate_action_format("search"));
        assert!(validate_action_format("search.web"));
        assert!(validate_action_format("cms.create_draft"));
        assert!(validate_action_format("a.b-c.d_e"));
        assert!(validate_action_format("v2x.readAll"));
    }

    #[test]
    fn rejects_malformed_action_names() {
        assert!(!validate_action_format(""));
        assert!(!validate_action_format(".foo"));
        assert!(!validate_action_format("foo."));
        assert!(!validate_action_format("foo..bar"));
        assert!(!validate_action_format("1foo"));
        assert!(!validate_action_format("a b"));
        assert!(!validate_action_format("search.2web"));
        assert!(!validate_action_format("-leading"));
    }

    proptest! {
        #[test]
        fn grammar_accepts_generated_names(
            action in "[a-zA-Z][a-zA-Z0-9_-]{0,7}(\\.[a-zA-Z][a-zA-Z0-9_-]{0,7}){0,3}"
        ) {
            prop_assert!(validate_action_format(&action));
        }

        #[test]
        fn grammar_rejects_leading_digit_components(
            action in "[0-9][a-zA-Z0-9_-]{0,7}"
        ) {
            prop_assert!(!validate_action_format(&action));
        }
    }

    #[test]
    fn unknown_constraint_keys_round_trip() {
        let json = serde_json::json!({
            "action": "search.web",
            "constraints": {
                "max_requests_per_hour": 100,
                "proof_level": "attested"
            }
        });

        let capability: Capability = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(capability.constraints.max_requests_per_hour, Some(100));
        assert_eq!(
            capability.constraints.extra.get("proof_level"),
            Some(&serde_json::json!("attested"))
        );

        let back = serde_json::to_value(&capability).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn empty_constraints_are_omitted() {
        let capability = Capability::new("search.web", Constraints::default());
        let json = serde_json::to_value(&capability).unwrap();
        assert!(json.get("constraints").is_none());
    }
}
