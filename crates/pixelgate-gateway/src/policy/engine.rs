use serde::{Deserialize, Serialize};

use pixelgate_core::constraint::ConstraintSet;
use pixelgate_core::error::{PixelGateError, Result};
use pixelgate_core::params::{self, RequestParams};
use pixelgate_core::policy::{on_violation, FailureMode, PolicyDecision, ViolationPhase};

use super::allowlist;

/// Request parameter security policy.
/// Construct once at startup, `validate()`, then share via Arc.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityPolicy {
    #[serde(default)]
    pub on_security_fail: FailureMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_params: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disallowed_params: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<ConstraintSet>,
}

impl SecurityPolicy {
    pub fn new(on_security_fail: FailureMode) -> Self {
        Self {
            on_security_fail,
            ..Self::default()
        }
    }

    pub fn allow<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_params = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn deny<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disallowed_params = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Configuration-time checks. Unknown failure modes are already refused
    /// when the config is parsed.
    pub fn validate(&self) -> Result<()> {
        if self.allowed_params.is_some() && self.disallowed_params.is_some() {
            return Err(PixelGateError::Config(
                "'allowed_params' and 'disallowed_params' cannot be specified together".into(),
            ));
        }

        let no_constraints = self.constraints.as_ref().map_or(true, ConstraintSet::is_empty);
        if allowlist::is_empty(self.allowed_params.as_ref())
            && allowlist::is_empty(self.disallowed_params.as_ref())
            && no_constraints
        {
            return Err(PixelGateError::Config(
                "either 'allowed_params', 'disallowed_params', or 'constraints' must be specified"
                    .into(),
            ));
        }

        if let Some(allowed) = &self.allowed_params {
            allowlist::ensure_known("allowed_params", allowed)?;
        }
        if let Some(disallowed) = &self.disallowed_params {
            allowlist::ensure_known("disallowed_params", disallowed)?;
        }
        if let Some(constraints) = &self.constraints {
            if let Some(unknown) = constraints.params().find(|p| !params::is_known(p)) {
                return Err(PixelGateError::Config(format!(
                    "unknown parameter '{unknown}' in 'constraints'"
                )));
            }
            constraints.validate_configuration()?;
        }

        Ok(())
    }

    /// Evaluate `params` in place: allow-list, then deny-list, then constraints.
    /// Under `Ignore` offending parameters are removed and evaluation goes on.
    pub fn evaluate(&self, params: &mut RequestParams) -> PolicyDecision {
        let mode = self.on_security_fail;

        if let Some(allowed) = &self.allowed_params {
            let offenders: Vec<String> = params
                .names()
                .filter(|p| !allowlist::is_listed(allowed, p))
                .map(str::to_string)
                .collect();
            for param in offenders {
                let reason = format!("parameter '{param}' is not allowed");
                if let Some(d) = on_violation(mode, params, ViolationPhase::AllowList, &param, reason)
                {
                    return d;
                }
            }
        }

        if let Some(disallowed) = &self.disallowed_params {
            for param in disallowed {
                if !params.contains(param) {
                    continue;
                }
                let reason = format!("parameter '{param}' has been flagged as disallowed");
                if let Some(d) = on_violation(mode, params, ViolationPhase::DenyList, param, reason) {
                    return d;
                }
            }
        }

        if let Some(constraints) = &self.constraints {
            return constraints.apply(params, mode);
        }

        PolicyDecision::Pass
    }
}
