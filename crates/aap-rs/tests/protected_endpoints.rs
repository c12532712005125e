//! Protected endpoint behavior: the authorize pipeline end to end.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Method};
use p256::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};

use aap_core::RequestContext;
use aap_policy::{OperatorPolicy, PolicyDefaults, PolicyDocument, PolicyEngine};
use aap_rs::handlers::{create_draft, publish, search, SearchParams};
use aap_rs::{authorize, AppState, RsConfig};
use aap_token::{
    InitialGrant, IssuerOptions, SigningAlgorithm, SigningKey, TokenIssuer, TokenValidator,
};

const ISSUER: &str = "https://as.example.com";
const AUDIENCE: &str = "https://api.example.com";

fn test_signing_key() -> SigningKey {
    let secret = p256::SecretKey::random(&mut rand::rngs::OsRng);
    let private_pem = secret.to_pkcs8_pem(LineEnding::LF).unwrap();
    let public_pem = secret
        .public_key()
        .to_public_key_pem(LineEnding::LF)
        .unwrap();
    SigningKey::from_pem(
        "aap-as-key-1",
        SigningAlgorithm::ES256,
        private_pem.as_str(),
        &public_pem,
    )
    .unwrap()
}

fn acme_policy() -> OperatorPolicy {
    let document: PolicyDocument = serde_json::from_value(serde_json::json!({
        "policy_id": "pol-acme",
        "applies_to": { "operator": "org:acme" },
        "allowed_capabilities": [
            { "action": "search.web",
              "default_constraints": {
                  "max_requests_per_minute": 2,
                  "domains_allowed": ["example.org"]
              } },
            { "action": "cms.create_draft" },
            { "action": "cms.publish" }
        ],
        "global_constraints": { "token_lifetime": 3600, "max_delegation_depth": 2 },
        "oversight": {
            "requires_human_approval_for": ["cms.publish"],
            "approval_reference": "https://approvals.example.com/q/42"
        }
    }))
    .unwrap();
    OperatorPolicy::from_document(document, PolicyDefaults::default()).unwrap()
}

struct Fixture {
    state: Arc<AppState>,
    issuer: TokenIssuer,
}

fn fixture() -> Fixture {
    let key = test_signing_key();
    let validator = TokenValidator::new(AUDIENCE, vec![ISSUER.to_string()])
        .with_key(key.kid(), key.decoding_key().clone());
    let state = Arc::new(AppState::from_parts(RsConfig::default(), validator));

    let engine = Arc::new(PolicyEngine::from_policies([acme_policy()]));
    let issuer = TokenIssuer::new(engine, key, ISSUER, IssuerOptions::default());

    Fixture { state, issuer }
}

fn issue_token(issuer: &TokenIssuer, actions: &[&str]) -> String {
    issuer
        .issue_initial(InitialGrant {
            agent_id: "agent-7".to_string(),
            agent_type: "llm-autonomous".to_string(),
            operator: "org:acme".to_string(),
            task_id: "task-42".to_string(),
            task_purpose: "research".to_string(),
            requested_actions: actions.iter().map(|a| a.to_string()).collect(),
            audience: AUDIENCE.to_string(),
            agent_metadata: None,
            task_metadata: None,
        })
        .expect("token issued")
        .token
}

fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    headers
}

#[tokio::test]
async fn search_endpoint_authorizes_and_responds() {
    let f = fixture();
    let token = issue_token(&f.issuer, &["search.web"]);

    let response = search(
        State(Arc::clone(&f.state)),
        Method::GET,
        bearer_headers(&token),
        Query(SearchParams {
            q: Some("rust".to_string()),
            url: Some("https://api.v2.example.org/lookup".to_string()),
        }),
    )
    .await
    .expect("authorized")
    .0;

    assert_eq!(response.get("status"), Some(&serde_json::json!("success")));
    assert_eq!(response.get("agent"), Some(&serde_json::json!("agent-7")));
    assert_eq!(response.get("task"), Some(&serde_json::json!("task-42")));
}

#[tokio::test]
async fn missing_bearer_token_is_unauthorized() {
    let f = fixture();

    let err = search(
        State(Arc::clone(&f.state)),
        Method::GET,
        HeaderMap::new(),
        Query(SearchParams::default()),
    )
    .await
    .expect_err("rejected");

    assert_eq!(err.0.code(), "invalid_token");
    assert_eq!(err.0.status(), 401);

    let mut basic = HeaderMap::new();
    basic.insert(
        header::AUTHORIZATION,
        HeaderValue::from_static("Basic dXNlcjpwYXNz"),
    );
    let err = search(
        State(f.state),
        Method::GET,
        basic,
        Query(SearchParams::default()),
    )
    .await
    .expect_err("rejected");
    assert_eq!(err.0.code(), "invalid_token");
}

#[tokio::test]
async fn third_request_within_the_minute_is_rate_limited() {
    let f = fixture();
    let token = issue_token(&f.issuer, &["search.web"]);
    let headers = bearer_headers(&token);

    for _ in 0..2 {
        authorize(
            &f.state,
            &headers,
            RequestContext::new("search.web", "GET"),
        )
        .expect("within limit");
    }

    let err = authorize(
        &f.state,
        &headers,
        RequestContext::new("search.web", "GET"),
    )
    .expect_err("limit hit");

    assert_eq!(err.code(), "aap_rate_limit");
    assert_eq!(err.status(), 429);
}

#[tokio::test]
async fn publish_requires_human_approval() {
    let f = fixture();
    let token = issue_token(&f.issuer, &["cms.publish"]);

    let err = publish(
        State(Arc::clone(&f.state)),
        Method::POST,
        bearer_headers(&token),
    )
    .await
    .expect_err("approval required");

    assert_eq!(err.0.code(), "aap_approval_required");
    assert_eq!(err.0.status(), 403);
    assert!(err
        .0
        .description()
        .contains("https://approvals.example.com/q/42"));
}

#[tokio::test]
async fn action_outside_the_token_is_refused() {
    let f = fixture();
    let token = issue_token(&f.issuer, &["search.web"]);

    let err = create_draft(
        State(Arc::clone(&f.state)),
        Method::POST,
        bearer_headers(&token),
    )
    .await
    .expect_err("no capability");

    assert_eq!(err.0.code(), "aap_invalid_capability");
    assert_eq!(err.0.status(), 403);
}

#[tokio::test]
async fn search_against_a_foreign_domain_is_refused() {
    let f = fixture();
    let token = issue_token(&f.issuer, &["search.web"]);

    let err = search(
        State(Arc::clone(&f.state)),
        Method::GET,
        bearer_headers(&token),
        Query(SearchParams {
            q: None,
            url: Some("https://notexample.org/lookup".to_string()),
        }),
    )
    .await
    .expect_err("domain refused");

    assert_eq!(err.0.code(), "aap_domain_not_allowed");
    assert_eq!(err.0.status(), 403);
}

#[tokio::test]
async fn draft_endpoint_works_with_the_right_capability() {
    let f = fixture();
    let token = issue_token(&f.issuer, &["cms.create_draft"]);

    let response = create_draft(
        State(Arc::clone(&f.state)),
        Method::POST,
        bearer_headers(&token),
    )
    .await
    .expect("authorized")
    .0;

    assert_eq!(
        response.get("draft_id"),
        Some(&serde_json::json!("draft-12345"))
    );
}
