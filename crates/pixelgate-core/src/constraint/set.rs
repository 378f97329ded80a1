//! Parameter name → ordered constraint list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Constraint, ConstraintRule};
use crate::error::{PixelGateError, Result};
use crate::params::RequestParams;
use crate::policy::{on_violation, FailureMode, PolicyDecision, ViolationPhase};

/// Constraints keyed by parameter. Built once at startup, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintSet {
    inner: BTreeMap<String, Vec<Constraint>>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `constraint` to the list for `param`.
    pub fn push(&mut self, param: impl Into<String>, constraint: impl Into<Constraint>) {
        self.inner
            .entry(param.into())
            .or_default()
            .push(constraint.into());
    }

    pub fn with(mut self, param: impl Into<String>, constraint: impl Into<Constraint>) -> Self {
        self.push(param, constraint);
        self
    }

    pub fn get(&self, param: &str) -> Option<&[Constraint]> {
        self.inner.get(param).map(Vec::as_slice)
    }

    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Startup check of every declaration. The first failure wins.
    pub fn validate_configuration(&self) -> Result<()> {
        for (param, constraints) in &self.inner {
            for c in constraints {
                c.validate_declaration(param)
                    .map_err(|source| PixelGateError::Constraint {
                        param: param.clone(),
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Check the first value of each constrained parameter present in
    /// `params`, in declaration order. The first failing constraint of a
    /// parameter is resolved through `on_fail`.
    pub fn apply(&self, params: &mut RequestParams, on_fail: FailureMode) -> PolicyDecision {
        let present: Vec<String> = params
            .names()
            .filter(|name| self.inner.contains_key(*name))
            .map(str::to_string)
            .collect();

        for param in present {
            let Some(constraints) = self.inner.get(&param) else {
                continue;
            };
            let value = params.get(&param).unwrap_or("").to_string();

            let failure = constraints
                .iter()
                .find_map(|c| c.validate_value(&param, &value).err());

            if let Some(err) = failure {
                if let Some(decision) = on_violation(
                    on_fail,
                    params,
                    ViolationPhase::Constraint,
                    &param,
                    err.to_string(),
                ) {
                    return decision;
                }
            }
        }
        PolicyDecision::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{RangeConstraint, ValuesConstraint};

    fn sample() -> ConstraintSet {
        ConstraintSet::new()
            .with("w", RangeConstraint::new(1, 1000))
            .with("q", RangeConstraint::new(1, 100))
            .with("q", ValuesConstraint::new(vec![50, 75]))
    }

    #[test]
    fn validate_configuration_names_offending_param() {
        let set = sample().with("fm", RangeConstraint::new(1, 2));
        let err = set.validate_configuration().unwrap_err();
        assert!(matches!(err, PixelGateError::Constraint { ref param, .. } if param == "fm"));
    }

    #[test]
    fn constraints_run_in_declaration_order() {
        let set = sample();
        let mut p = RequestParams::from_pairs([("q", "200")]);
        let d = set.apply(&mut p, FailureMode::Abort);
        // range fails before values is consulted
        assert_eq!(
            d,
            PolicyDecision::Reject {
                param: "q".into(),
                reason: "q must be in range 1 to 100".into()
            }
        );
    }

    #[test]
    fn ignore_drops_only_offenders() {
        let set = sample();
        let mut p = RequestParams::from_pairs([("q", "60"), ("w", "500"), ("fm", "png")]);
        assert_eq!(set.apply(&mut p, FailureMode::Ignore), PolicyDecision::Pass);
        assert_eq!(p.names().collect::<Vec<_>>(), vec!["fm", "w"]);
    }

    #[test]
    fn unconstrained_params_are_untouched() {
        let set = sample();
        let mut p = RequestParams::from_pairs([("h", "abc")]);
        assert_eq!(set.apply(&mut p, FailureMode::Bypass), PolicyDecision::Pass);
        assert!(p.contains("h"));
    }

    #[test]
    fn round_trips_through_json() {
        let set = sample();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(
            json,
            r#"{"q":[{"range":{"from":1,"to":100}},{"values":{"values":[50,75]}}],"w":[{"range":{"from":1,"to":1000}}]}"#
        );
        let back: ConstraintSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
