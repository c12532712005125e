//! Capability matching for protected requests.

use aap_core::{AapError, AapResult, Capability};

/// First capability whose action exactly matches the requested action.
/// Matching is case-sensitive.
pub fn find_matching_capability<'a>(
    capabilities: &'a [Capability],
    requested_action: &str,
) -> Option<&'a Capability> {
    capabilities
        .iter()
        .find(|capability| capability.action == requested_action)
}

/// Same lookup, surfacing the wire error for protected endpoints.
pub fn require_capability<'a>(
    capabilities: &'a [Capability],
    requested_action: &str,
) -> AapResult<&'a Capability> {
    find_matching_capability(capabilities, requested_action).ok_or_else(|| {
        AapError::InvalidCapability("No matching capability for requested action".to_string())
    })
}
