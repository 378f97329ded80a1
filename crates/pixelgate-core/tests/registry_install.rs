//! Startup-phase registry installation.
//!
//! Lives in its own test binary: the process-wide registry can only be
//! frozen once.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use pixelgate_core::constraint::registry::{self, ConstraintRegistry};
use pixelgate_core::constraint::{Constraint, ConstraintSet, RangeConstraint};

#[test]
fn installed_registry_drives_decoding_and_freezes() {
    let mut custom = ConstraintRegistry::with_builtin();
    custom.register("between", || Constraint::Range(RangeConstraint::default()));
    registry::install(custom).unwrap();

    let set: ConstraintSet =
        serde_json::from_str(r#"{"w":[{"between":{"from":1,"to":5}}]}"#).unwrap();
    assert_eq!(
        set.get("w"),
        Some(&[Constraint::Range(RangeConstraint::new(1, 5))][..])
    );

    // Frozen: a second startup phase is refused.
    let err = registry::install(ConstraintRegistry::new()).unwrap_err();
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    assert!(registry::global().contains("between"));
}
