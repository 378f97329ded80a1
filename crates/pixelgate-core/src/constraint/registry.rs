//! Constraint kind registry.
//!
//! Built during startup, then frozen into a process-wide [`OnceLock`]. After
//! freezing the table is never mutated, so request handlers read it without
//! locking.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::{Constraint, RangeConstraint, ValuesConstraint};
use crate::error::{PixelGateError, Result};

/// Produces a fresh, zero-valued constraint of one kind.
pub type ConstraintFactory = fn() -> Constraint;

static GLOBAL: OnceLock<ConstraintRegistry> = OnceLock::new();

#[derive(Debug, Clone, Default)]
pub struct ConstraintRegistry {
    factories: HashMap<String, ConstraintFactory>,
}

impl ConstraintRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `range` and `values` kinds.
    pub fn with_builtin() -> Self {
        let mut r = Self::new();
        r.register(RangeConstraint::KIND, || {
            Constraint::Range(RangeConstraint::default())
        });
        r.register(ValuesConstraint::KIND, || {
            Constraint::Values(ValuesConstraint::default())
        });
        r
    }

    /// Register `factory` under `kind`. A second registration for the same
    /// kind replaces the first.
    pub fn register(&mut self, kind: impl Into<String>, factory: ConstraintFactory) {
        let kind = kind.into();
        if self.factories.insert(kind.clone(), factory).is_some() {
            tracing::debug!(%kind, "constraint kind re-registered, last registration wins");
        }
    }

    pub fn create(&self, kind: &str) -> Option<Constraint> {
        self.factories.get(kind).map(|factory| factory())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

/// Freeze `registry` as the process-wide table. Must run before the first
/// constraint is decoded; fails once a table is already frozen.
pub fn install(registry: ConstraintRegistry) -> Result<()> {
    GLOBAL.set(registry).map_err(|_| {
        PixelGateError::Config("constraint registry is already frozen".into())
    })
}

/// The frozen process-wide registry. Freezes the built-in table on first use
/// if nothing was installed.
pub fn global() -> &'static ConstraintRegistry {
    GLOBAL.get_or_init(ConstraintRegistry::with_builtin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_kinds() {
        let r = ConstraintRegistry::with_builtin();
        assert_eq!(r.kinds(), vec!["range", "values"]);
        assert_eq!(
            r.create("range"),
            Some(Constraint::Range(RangeConstraint::default()))
        );
        assert!(r.create("regex").is_none());
    }

    #[test]
    fn factories_return_fresh_instances() {
        let r = ConstraintRegistry::with_builtin();
        let mut a = r.create("values");
        if let Some(Constraint::Values(v)) = a.as_mut() {
            v.values.push(42);
        }
        assert_eq!(
            r.create("values"),
            Some(Constraint::Values(ValuesConstraint::default()))
        );
    }

    #[test]
    fn duplicate_registration_last_wins() {
        let mut r = ConstraintRegistry::with_builtin();
        r.register("range", || Constraint::Range(RangeConstraint::new(1, 2)));
        assert_eq!(
            r.create("range"),
            Some(Constraint::Range(RangeConstraint::new(1, 2)))
        );
        assert_eq!(r.kinds().len(), 2);
    }
}
