//! Token payload claims.
//!
//! The payload is the serialized contract between the authorization server
//! and resource servers: standard JWT claims plus the agent, task,
//! capability, and delegation claims both sides interpret identically.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::capability::Capability;

/// Claims carried in the signed token envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub agent: AgentClaim,
    pub task: TaskClaim,
    pub capabilities: Vec<Capability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegation: Option<Delegation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oversight: Option<Oversight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<Audit>,
}

impl TokenClaims {
    /// Granted lifetime in seconds.
    pub fn lifetime(&self) -> i64 {
        self.exp - self.iat
    }

    /// Actions granted by this token.
    pub fn action_set(&self) -> BTreeSet<&str> {
        self.capabilities.iter().map(|c| c.action.as_str()).collect()
    }

    /// Delegation depth; a token without a delegation claim is an original.
    pub fn delegation_depth(&self) -> u32 {
        self.delegation
            .as_ref()
            .and_then(|d| d.depth)
            .unwrap_or(0)
    }
}

/// Identity of the autonomous agent the token was issued to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentClaim {
    pub id: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    pub operator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}

/// The unit of work the token is scoped to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskClaim {
    pub id: String,
    pub purpose: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<serde_json::Value>,
}

/// Delegation-chain state.
///
/// `depth` and `max_depth` are optional at parse time so that a foreign token
/// missing them maps to the delegation-chain error taxonomy instead of a
/// generic decode failure. Tokens issued here always carry both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(default)]
    pub chain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_jti: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privilege_reduction: Option<PrivilegeReduction>,
}

impl Delegation {
    /// Delegation state for an initial grant: depth 0, chain of one.
    pub fn root(agent_id: impl Into<String>, max_depth: u32) -> Self {
        Self {
            depth: Some(0),
            max_depth: Some(max_depth),
            chain: vec![agent_id.into()],
            parent_jti: None,
            privilege_reduction: None,
        }
    }
}

/// Record of what a delegation step took away, kept for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivilegeReduction {
    pub capabilities_removed: Vec<String>,
    pub lifetime_reduced_by: i64,
}

/// Policy-declared human-approval requirements, propagated through
/// delegation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Oversight {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_human_approval_for: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_reference: Option<String>,
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Audit metadata attached by the issuer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_period: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_framework: Option<String>,
    /// Informational tag set when a delegation step crossed trust domains.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id_scope: Option<String>,
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Constraints;

    fn sample_claims() -> TokenClaims {
        TokenClaims {
            iss: "https://as.example.com".to_string(),
            sub: "agent-1".to_string(),
            aud: "https://api.example.com".to_string(),
            exp: 1_700_003_600,
            iat: 1_700_000_000,
            jti: "11111111-2222-4333-8444-555555555555".to_string(),
            agent: AgentClaim {
                id: "agent-1".to_string(),
                agent_type: "llm-autonomous".to_string(),
                operator: "org:acme".to_string(),
                name: None,
                version: None,
                model: None,
                runtime: None,
            },
            task: TaskClaim {
                id: "task-1".to_string(),
                purpose: "research".to_string(),
                created_at: 1_700_000_000,
                created_by: None,
                priority: None,
                category: None,
                expires_at: None,
            },
            capabilities: vec![Capability::new(
                "search.web",
                Constraints {
                    max_requests_per_hour: Some(100),
                    ..Constraints::default()
                },
            )],
            delegation: Some(Delegation::root("agent-1", 2)),
            oversight: None,
            audit: None,
        }
    }

    #[test]
    fn claims_round_trip_through_json() {
        let claims = sample_claims();
        let json = serde_json::to_string(&claims).unwrap();
        let back: TokenClaims = serde_json::from_str(&json).unwrap();
        assert_eq!(back, claims);
    }

    #[test]
    fn root_delegation_has_single_link_chain() {
        let delegation = Delegation::root("agent-1", 2);
        assert_eq!(delegation.depth, Some(0));
        assert_eq!(delegation.max_depth, Some(2));
        assert_eq!(delegation.chain, vec!["agent-1".to_string()]);
        assert!(delegation.parent_jti.is_none());
    }

    #[test]
    fn lifetime_and_action_set() {
        let claims = sample_claims();
        assert_eq!(claims.lifetime(), 3600);
        assert!(claims.action_set().contains("search.web"));
        assert_eq!(claims.delegation_depth(), 0);
    }

    #[test]
    fn delegation_tolerates_missing_depth_fields() {
        let json = serde_json::json!({ "chain": ["agent-1"] });
        let delegation: Delegation = serde_json::from_value(json).unwrap();
        assert!(delegation.depth.is_none());
        assert!(delegation.max_depth.is_none());
    }
}
