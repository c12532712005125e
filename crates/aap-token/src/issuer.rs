//! Token issuance: initial grants and delegated exchanges.
//!
//! The issuer owns the delegation state machine. Every exchange step appends
//! to the chain, halves the rate constraints, shortens the lifetime, and
//! records what was taken away.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Header, Validation};
use tracing::{debug, info};
use uuid::Uuid;

use aap_core::{
    AgentClaim, Audit, Capability, Delegation, PrivilegeReduction, TaskClaim, TokenClaims,
};
use aap_policy::{AuditConfig, PolicyEngine};

use crate::error::IssueError;
use crate::keys::SigningKey;

/// Issuer-level settings.
#[derive(Debug, Clone, Copy)]
pub struct IssuerOptions {
    /// Multiplier applied to the parent lifetime at each exchange.
    pub lifetime_reduction: f64,
    /// Chain limit assumed for parents without a delegation claim.
    pub default_max_delegation_depth: u32,
}

impl Default for IssuerOptions {
    fn default() -> Self {
        Self {
            lifetime_reduction: 0.5,
            default_max_delegation_depth: 2,
        }
    }
}

/// Parameters of an initial client-credentials grant.
#[derive(Debug, Clone)]
pub struct InitialGrant {
    pub agent_id: String,
    pub agent_type: String,
    pub operator: String,
    pub task_id: String,
    pub task_purpose: String,
    pub requested_actions: Vec<String>,
    pub audience: String,
    pub agent_metadata: Option<serde_json::Value>,
    pub task_metadata: Option<serde_json::Value>,
}

/// A freshly signed token together with its claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

impl IssuedToken {
    pub fn expires_in(&self) -> i64 {
        self.claims.lifetime()
    }
}

/// Issues signed tokens under operator policies.
pub struct TokenIssuer {
    policy_engine: Arc<PolicyEngine>,
    key: SigningKey,
    issuer: String,
    options: IssuerOptions,
}

impl TokenIssuer {
    pub fn new(
        policy_engine: Arc<PolicyEngine>,
        key: SigningKey,
        issuer: impl Into<String>,
        options: IssuerOptions,
    ) -> Self {
        Self {
            policy_engine,
            key,
            issuer: issuer.into(),
            options,
        }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }

    /// Issue a token for an initial grant.
    pub fn issue_initial(&self, grant: InitialGrant) -> Result<IssuedToken, IssueError> {
        let policy = self
            .policy_engine
            .get_policy(&grant.operator)
            .ok_or_else(|| IssueError::NoPolicy(grant.operator.clone()))?;

        let capabilities = self.policy_engine.evaluate_capabilities(
            &grant.operator,
            &grant.requested_actions,
            Some(&grant.task_purpose),
        )?;

        if capabilities.is_empty() {
            return Err(IssueError::NoCapabilitiesGranted(grant.requested_actions));
        }

        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            iss: self.issuer.clone(),
            sub: grant.agent_id.clone(),
            aud: grant.audience,
            exp: now + policy.token_lifetime as i64,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            agent: build_agent_claim(
                &grant.agent_id,
                &grant.agent_type,
                &grant.operator,
                grant.agent_metadata.as_ref(),
            ),
            task: build_task_claim(
                &grant.task_id,
                &grant.task_purpose,
                now,
                grant.task_metadata.as_ref(),
            ),
            capabilities,
            delegation: Some(Delegation::root(
                grant.agent_id.clone(),
                policy.max_delegation_depth,
            )),
            oversight: policy.oversight.clone(),
            audit: policy.audit.as_ref().map(build_audit_claim),
        };

        info!(
            agent = %claims.agent.id,
            operator = %claims.agent.operator,
            jti = %claims.jti,
            capabilities = claims.capabilities.len(),
            "Issued initial token"
        );

        let token = self.sign(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    /// Exchange a parent token for a derived one bound to a new audience.
    pub fn issue_derived(
        &self,
        parent_token: &str,
        new_audience: &str,
        requested_subset: Option<&[String]>,
    ) -> Result<IssuedToken, IssueError> {
        let parent = self.verify_parent(parent_token)?;

        let (depth, max_depth, parent_chain) = match &parent.delegation {
            Some(d) => (
                d.depth.unwrap_or(0),
                d.max_depth
                    .unwrap_or(self.options.default_max_delegation_depth),
                if d.chain.is_empty() {
                    vec![parent.agent.id.clone()]
                } else {
                    d.chain.clone()
                },
            ),
            None => (
                0,
                self.options.default_max_delegation_depth,
                vec![parent.agent.id.clone()],
            ),
        };

        if depth >= max_depth {
            return Err(IssueError::DelegationDepthExceeded { depth, max_depth });
        }

        let parent_actions: BTreeSet<String> = parent
            .capabilities
            .iter()
            .map(|c| c.action.clone())
            .collect();

        let selected: Vec<Capability> = match requested_subset {
            Some(requested) if !requested.is_empty() => {
                let unauthorized: Vec<String> = requested
                    .iter()
                    .filter(|action| !parent_actions.contains(*action))
                    .cloned()
                    .collect();
                if !unauthorized.is_empty() {
                    return Err(IssueError::UnauthorizedSubset(unauthorized));
                }
                parent
                    .capabilities
                    .iter()
                    .filter(|c| requested.contains(&c.action))
                    .cloned()
                    .collect()
            }
            _ => parent.capabilities.clone(),
        };

        let new_depth = depth + 1;
        let reduced = self
            .policy_engine
            .reduce_for_delegation(selected, new_depth);

        let parent_lifetime = parent.exp - parent.iat;
        let reduced_lifetime =
            (parent_lifetime as f64 * self.options.lifetime_reduction).floor() as i64;

        let now = Utc::now().timestamp();
        // The derived token never outlives its parent.
        let exp = (now + reduced_lifetime).min(parent.exp);

        let capabilities_removed: Vec<String> = parent_actions
            .iter()
            .filter(|action| !reduced.iter().any(|c| &c.action == *action))
            .cloned()
            .collect();

        let mut chain = parent_chain;
        chain.push(new_audience.to_string());

        let delegation = Delegation {
            depth: Some(new_depth),
            max_depth: Some(max_depth),
            chain,
            parent_jti: Some(parent.jti.clone()),
            privilege_reduction: Some(PrivilegeReduction {
                capabilities_removed,
                lifetime_reduced_by: parent_lifetime - (exp - now),
            }),
        };

        let audit = parent.audit.clone().map(|mut audit| {
            if new_audience != parent.aud {
                // Different audience, different trust domain: unlink the trace.
                audit.trace_id = Some(Uuid::new_v4().to_string());
                audit.trace_id_scope = Some("domain".to_string());
            }
            audit
        });

        let claims = TokenClaims {
            iss: self.issuer.clone(),
            sub: parent.agent.id.clone(),
            aud: new_audience.to_string(),
            exp,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            agent: parent.agent.clone(),
            task: parent.task.clone(),
            capabilities: reduced,
            delegation: Some(delegation),
            oversight: parent.oversight.clone(),
            audit,
        };

        info!(
            parent_jti = %parent.jti,
            jti = %claims.jti,
            depth = new_depth,
            audience = %new_audience,
            "Issued derived token"
        );

        let token = self.sign(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    /// Verify the parent token during exchange.
    ///
    /// The parent is accepted under its own audience (self-exchange is
    /// permitted), so only signature and expiry are checked here.
    fn verify_parent(&self, token: &str) -> Result<TokenClaims, IssueError> {
        let mut validation = Validation::new(self.key.algorithm().into());
        validation.validate_aud = false;

        let data =
            jsonwebtoken::decode::<TokenClaims>(token, self.key.decoding_key(), &validation)
                .map_err(|e| IssueError::InvalidParent(e.to_string()))?;

        debug!(jti = %data.claims.jti, "Parent token verified for exchange");
        Ok(data.claims)
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, IssueError> {
        let mut header = Header::new(self.key.algorithm().into());
        header.kid = Some(self.key.kid().to_string());
        jsonwebtoken::encode(&header, claims, self.key.encoding_key()).map_err(IssueError::Signing)
    }
}

fn build_agent_claim(
    agent_id: &str,
    agent_type: &str,
    operator: &str,
    metadata: Option<&serde_json::Value>,
) -> AgentClaim {
    AgentClaim {
        id: agent_id.to_string(),
        agent_type: agent_type.to_string(),
        operator: operator.to_string(),
        name: string_field(metadata, "name"),
        version: string_field(metadata, "version"),
        model: string_field(metadata, "model"),
        runtime: string_field(metadata, "runtime"),
    }
}

fn build_task_claim(
    task_id: &str,
    task_purpose: &str,
    created_at: i64,
    metadata: Option<&serde_json::Value>,
) -> TaskClaim {
    TaskClaim {
        id: task_id.to_string(),
        purpose: task_purpose.to_string(),
        created_at,
        created_by: string_field(metadata, "created_by"),
        priority: value_field(metadata, "priority"),
        category: string_field(metadata, "category"),
        expires_at: value_field(metadata, "expires_at"),
    }
}

fn build_audit_claim(config: &AuditConfig) -> Audit {
    Audit {
        trace_id: Some(Uuid::new_v4().to_string()),
        log_level: Some(
            config
                .log_level
                .clone()
                .unwrap_or_else(|| "standard".to_string()),
        ),
        retention_period: config.retention_period_days,
        compliance_framework: config.compliance_framework.clone(),
        trace_id_scope: None,
        extra: Default::default(),
    }
}

fn string_field(metadata: Option<&serde_json::Value>, key: &str) -> Option<String> {
    metadata?.get(key)?.as_str().map(|s| s.to_string())
}

fn value_field(metadata: Option<&serde_json::Value>, key: &str) -> Option<serde_json::Value> {
    metadata?.get(key).cloned()
}
