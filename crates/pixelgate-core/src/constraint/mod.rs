//! Per-parameter validation rules.
//!
//! A [`Constraint`] is a closed set of rule kinds dispatched through the
//! [`ConstraintRule`] capability. Adding a kind means adding a variant and
//! registering its factory in the [`registry`]; [`ConstraintSet`] evaluation
//! never changes.
//!
//! On the wire a constraint is a single-entry map keyed by its kind:
//!
//! ```json
//! {"range": {"from": 10, "to": 2000}}
//! {"values": {"values": [50, 75, 90]}}
//! ```
//!
//! Decoding looks the kind up in the frozen global registry, builds a fresh
//! instance, then fills in its fields.

pub mod range;
pub mod registry;
pub mod set;
pub mod values;

use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConstraintError;
use crate::params;

pub use range::RangeConstraint;
pub use registry::ConstraintRegistry;
pub use set::ConstraintSet;
pub use values::ValuesConstraint;

/// Capability shared by every constraint kind.
pub trait ConstraintRule {
    /// Registry key and wire discriminant.
    fn kind(&self) -> &'static str;

    /// Check the constraint may be attached to `param` and is well-formed.
    fn validate_declaration(&self, param: &str) -> Result<(), ConstraintError>;

    /// Check one supplied value.
    fn validate_value(&self, param: &str, value: &str) -> Result<(), ConstraintError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Range(RangeConstraint),
    Values(ValuesConstraint),
}

impl Constraint {
    /// Replace this instance's fields with the ones carried by `fields`.
    fn populate(&mut self, fields: serde_json::Value) -> Result<(), serde_json::Error> {
        match self {
            Constraint::Range(r) => *r = serde_json::from_value(fields)?,
            Constraint::Values(v) => *v = serde_json::from_value(fields)?,
        }
        Ok(())
    }
}

impl ConstraintRule for Constraint {
    fn kind(&self) -> &'static str {
        match self {
            Constraint::Range(r) => r.kind(),
            Constraint::Values(v) => v.kind(),
        }
    }

    fn validate_declaration(&self, param: &str) -> Result<(), ConstraintError> {
        match self {
            Constraint::Range(r) => r.validate_declaration(param),
            Constraint::Values(v) => v.validate_declaration(param),
        }
    }

    fn validate_value(&self, param: &str, value: &str) -> Result<(), ConstraintError> {
        match self {
            Constraint::Range(r) => r.validate_value(param, value),
            Constraint::Values(v) => v.validate_value(param, value),
        }
    }
}

impl From<RangeConstraint> for Constraint {
    fn from(r: RangeConstraint) -> Self {
        Constraint::Range(r)
    }
}

impl From<ValuesConstraint> for Constraint {
    fn from(v: ValuesConstraint) -> Self {
        Constraint::Values(v)
    }
}

impl Serialize for Constraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Constraint::Range(r) => map.serialize_entry(self.kind(), r)?,
            Constraint::Values(v) => map.serialize_entry(self.kind(), v)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Constraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(KindEnvelopeVisitor)
    }
}

struct KindEnvelopeVisitor;

impl<'de> Visitor<'de> for KindEnvelopeVisitor {
    type Value = Constraint;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a single-entry map keyed by constraint kind")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Constraint, A::Error> {
        let kind: String = map
            .next_key()?
            .ok_or_else(|| <A::Error as de::Error>::custom("constraint entry is empty"))?;

        let mut constraint = registry::global()
            .create(&kind)
            .ok_or_else(|| {
                <A::Error as de::Error>::custom(format!("unknown constraint type: {kind}"))
            })?;

        let fields: serde_json::Value = map.next_value()?;
        constraint
            .populate(fields)
            .map_err(|e| {
                <A::Error as de::Error>::custom(format!("invalid fields for {kind} constraint: {e}"))
            })?;

        if map.next_key::<IgnoredAny>()?.is_some() {
            return Err(<A::Error as de::Error>::custom(
                "constraint entry must hold exactly one kind",
            ));
        }
        Ok(constraint)
    }
}

/// Shared target check: numeric kinds attach only to integer parameters.
pub(crate) fn ensure_numeric_target(kind: &'static str, param: &str) -> Result<(), ConstraintError> {
    if params::is_numeric(param) {
        Ok(())
    } else {
        Err(ConstraintError::InvalidConstraintTarget {
            kind,
            param: param.to_string(),
        })
    }
}

pub(crate) fn parse_integer(param: &str, value: &str) -> Result<i64, ConstraintError> {
    value.parse::<i64>().map_err(|_| ConstraintError::NotAnInteger {
        param: param.to_string(),
        value: value.to_string(),
    })
}
