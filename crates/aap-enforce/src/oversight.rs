//! Human-approval oversight gate.
//!
//! Runs after capability matching and constraint enforcement so that denial
//! reasons stay consistent in audit logs. The gate is terminal: a listed
//! action is refused regardless of any other check passing.

use aap_core::{AapError, AapResult, Oversight};

/// Refuse the action if the token's oversight claim lists it as requiring
/// human approval, surfacing the approval reference in the error detail.
pub fn check_oversight(oversight: Option<&Oversight>, action: &str) -> AapResult<()> {
    let Some(oversight) = oversight else {
        return Ok(());
    };

    if oversight
        .requires_human_approval_for
        .iter()
        .any(|listed| listed == action)
    {
        let reference = oversight.approval_reference.as_deref().unwrap_or("");
        return Err(AapError::ApprovalRequired(format!(
            "This action requires human approval. Reference: {reference}"
        )));
    }

    Ok(())
}
