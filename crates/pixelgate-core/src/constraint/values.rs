use serde::{Deserialize, Serialize};

use super::{ensure_numeric_target, parse_integer, ConstraintRule};
use crate::error::ConstraintError;

/// Enumerated whitelist of integer values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValuesConstraint {
    #[serde(default)]
    pub values: Vec<i64>,
}

impl ValuesConstraint {
    pub const KIND: &'static str = "values";

    pub fn new(values: Vec<i64>) -> Self {
        Self { values }
    }
}

impl ConstraintRule for ValuesConstraint {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn validate_declaration(&self, param: &str) -> Result<(), ConstraintError> {
        ensure_numeric_target(Self::KIND, param)?;
        if self.values.is_empty() {
            return Err(ConstraintError::EmptyValueSet);
        }
        Ok(())
    }

    fn validate_value(&self, param: &str, value: &str) -> Result<(), ConstraintError> {
        let v = parse_integer(param, value)?;
        if !self.values.contains(&v) {
            return Err(ConstraintError::ValueNotAllowed {
                param: param.to_string(),
                value: v,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_set_is_rejected() {
        assert_eq!(
            ValuesConstraint::default().validate_declaration("q"),
            Err(ConstraintError::EmptyValueSet)
        );
    }

    #[test]
    fn target_must_be_numeric() {
        let err = ValuesConstraint::new(vec![1])
            .validate_declaration("bg")
            .unwrap_err();
        assert_eq!(err.to_string(), "values constraint cannot be applied on param: 'bg'");
    }

    #[test]
    fn membership() {
        let c = ValuesConstraint::new(vec![50, 75, 90]);
        assert!(c.validate_value("q", "75").is_ok());
        assert_eq!(
            c.validate_value("q", "80"),
            Err(ConstraintError::ValueNotAllowed {
                param: "q".into(),
                value: 80
            })
        );
    }

    proptest! {
        #[test]
        fn accepts_iff_member(
            set in prop::collection::vec(-500i64..500, 1..8),
            v in -500i64..500,
        ) {
            let c = ValuesConstraint::new(set.clone());
            let ok = c.validate_value("h", &v.to_string()).is_ok();
            prop_assert_eq!(ok, set.contains(&v));
        }

        #[test]
        fn non_numeric_always_fails(
            set in prop::collection::vec(0i64..100, 1..5),
            raw in "[a-z_]{1,12}",
        ) {
            let c = ValuesConstraint::new(set);
            let is_not_an_integer = matches!(
                c.validate_value("h", &raw),
                Err(ConstraintError::NotAnInteger { .. })
            );
            prop_assert!(is_not_an_integer);
        }
    }
}
