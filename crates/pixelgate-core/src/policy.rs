//! Failure modes and decisions shared by every policy phase.

use serde::{Deserialize, Serialize};

use crate::params::RequestParams;

/// What happens when a parameter violates a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Drop the offending parameter and keep going.
    #[default]
    Ignore,
    /// Reject the request with a 400.
    Abort,
    /// Serve the unmodified upstream response.
    Bypass,
}

impl FailureMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureMode::Ignore => "ignore",
            FailureMode::Abort => "abort",
            FailureMode::Bypass => "bypass",
        }
    }
}

/// Decision from policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Pass,
    Bypass,
    Reject { param: String, reason: String },
}

impl PolicyDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyDecision::Pass => "pass",
            PolicyDecision::Bypass => "bypass",
            PolicyDecision::Reject { .. } => "reject",
        }
    }
}

/// Which evaluation phase produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationPhase {
    AllowList,
    DenyList,
    Constraint,
}

impl ViolationPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationPhase::AllowList => "allow_list",
            ViolationPhase::DenyList => "deny_list",
            ViolationPhase::Constraint => "constraint",
        }
    }
}

/// Resolve one violation according to `mode`.
///
/// `None` means evaluation continues (the parameter was removed under
/// `Ignore`); `Some` is the terminal decision.
pub fn on_violation(
    mode: FailureMode,
    params: &mut RequestParams,
    phase: ViolationPhase,
    param: &str,
    reason: String,
) -> Option<PolicyDecision> {
    tracing::debug!(
        param,
        phase = phase.as_str(),
        mode = mode.as_str(),
        %reason,
        "parameter violation"
    );
    match mode {
        FailureMode::Ignore => {
            params.remove(param);
            None
        }
        FailureMode::Bypass => Some(PolicyDecision::Bypass),
        FailureMode::Abort => Some(PolicyDecision::Reject {
            param: param.to_string(),
            reason,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_removes_and_continues() {
        let mut p = RequestParams::from_pairs([("w", "1"), ("h", "2")]);
        let d = on_violation(FailureMode::Ignore, &mut p, ViolationPhase::AllowList, "w", "x".into());
        assert!(d.is_none());
        assert_eq!(p.names().collect::<Vec<_>>(), vec!["h"]);
    }

    #[test]
    fn abort_names_the_parameter() {
        let mut p = RequestParams::from_pairs([("w", "1")]);
        let d = on_violation(FailureMode::Abort, &mut p, ViolationPhase::DenyList, "w", "nope".into());
        assert_eq!(
            d,
            Some(PolicyDecision::Reject {
                param: "w".into(),
                reason: "nope".into()
            })
        );
        assert!(p.contains("w"));
    }

    #[test]
    fn failure_mode_parses_lowercase() {
        let m: FailureMode = serde_json::from_str("\"bypass\"").unwrap();
        assert_eq!(m, FailureMode::Bypass);
        assert!(serde_json::from_str::<FailureMode>("\"explode\"").is_err());
    }
}
