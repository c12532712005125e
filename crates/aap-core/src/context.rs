//! Request context handed from HTTP adapters to validation and enforcement.

/// What the resource server knows about the request being authorized.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    /// Requested action, e.g. `search.web`.
    pub action: String,
    /// HTTP method of the protected request.
    pub method: String,
    /// Declared request body size in bytes.
    pub content_length: u64,
    /// Outbound target of the action, when one exists.
    pub target_url: Option<String>,
}

impl RequestContext {
    pub fn new(action: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            method: method.into(),
            content_length: 0,
            target_url: None,
        }
    }

    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = content_length;
        self
    }

    pub fn with_target_url(mut self, target_url: impl Into<String>) -> Self {
        self.target_url = Some(target_url.into());
        self
    }
}
