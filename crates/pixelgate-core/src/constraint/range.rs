use serde::{Deserialize, Serialize};

use super::{ensure_numeric_target, parse_integer, ConstraintRule};
use crate::error::ConstraintError;

/// Inclusive integer bounds `[from, to]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeConstraint {
    #[serde(default)]
    pub from: i64,
    #[serde(default)]
    pub to: i64,
}

impl RangeConstraint {
    pub const KIND: &'static str = "range";

    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }
}

impl ConstraintRule for RangeConstraint {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn validate_declaration(&self, param: &str) -> Result<(), ConstraintError> {
        ensure_numeric_target(Self::KIND, param)?;
        if self.from < 0 || self.from >= self.to {
            return Err(ConstraintError::InvalidRangeBounds {
                from: self.from,
                to: self.to,
            });
        }
        Ok(())
    }

    fn validate_value(&self, param: &str, value: &str) -> Result<(), ConstraintError> {
        let v = parse_integer(param, value)?;
        if !(self.from..=self.to).contains(&v) {
            return Err(ConstraintError::OutOfRange {
                param: param.to_string(),
                from: self.from,
                to: self.to,
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
    fn declaration_checks_target_and_bounds() {
        assert!(RangeConstraint::new(0, 10).validate_declaration("w").is_ok());

        assert_eq!(
            RangeConstraint::new(0, 10).validate_declaration("fm"),
            Err(ConstraintError::InvalidConstraintTarget {
                kind: "range",
                param: "fm".into()
            })
        );
        assert_eq!(
            RangeConstraint::new(-1, 10).validate_declaration("w"),
            Err(ConstraintError::InvalidRangeBounds { from: -1, to: 10 })
        );
        assert_eq!(
            RangeConstraint::new(10, 10).validate_declaration("w"),
            Err(ConstraintError::InvalidRangeBounds { from: 10, to: 10 })
        );
    }

    #[test]
    fn bounds_are_inclusive() {
        let r = RangeConstraint::new(10, 20);
        assert!(r.validate_value("q", "10").is_ok());
        assert!(r.validate_value("q", "20").is_ok());
        assert!(matches!(
            r.validate_value("q", "21"),
            Err(ConstraintError::OutOfRange { .. })
        ));
        assert!(matches!(
            r.validate_value("q", "9"),
            Err(ConstraintError::OutOfRange { .. })
        ));
    }

    #[test]
    fn non_numeric_value() {
        let err = RangeConstraint::new(1, 100)
            .validate_value("q", "not_a_number")
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid integer value for q: not_a_number");
    }

    proptest! {
        #[test]
        fn accepts_exactly_the_closed_interval(
            from in 0i64..5_000,
            span in 1i64..5_000,
            v in -10_000i64..20_000,
        ) {
            let to = from + span;
            let r = RangeConstraint::new(from, to);
            prop_assert!(r.validate_declaration("w").is_ok());
            let ok = r.validate_value("w", &v.to_string()).is_ok();
            prop_assert_eq!(ok, from <= v && v <= to);
        }
    }
}
