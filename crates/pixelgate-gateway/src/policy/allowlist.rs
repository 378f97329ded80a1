//! Parameter name list checks shared by the allow and deny phases.

use pixelgate_core::error::{PixelGateError, Result};
use pixelgate_core::params;

/// Every entry of `names` must be a known transformation parameter.
pub fn ensure_known(field: &str, names: &[String]) -> Result<()> {
    match names.iter().find(|n| !params::is_known(n)) {
        Some(unknown) => Err(PixelGateError::Config(format!(
            "unknown parameter '{unknown}' in '{field}'"
        ))),
        None => Ok(()),
    }
}

pub fn is_listed(names: &[String], param: &str) -> bool {
    names.iter().any(|n| n == param)
}

/// `None` and `Some([])` both count as "nothing configured".
pub fn is_empty(names: Option<&Vec<String>>) -> bool {
    names.map_or(true, |n| n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_is_reported() {
        let names = vec!["w".to_string(), "width".to_string()];
        let err = ensure_known("allowed_params", &names).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: unknown parameter 'width' in 'allowed_params'"
        );
    }

    #[test]
    fn listed() {
        let names = vec!["w".to_string(), "h".to_string()];
        assert!(is_listed(&names, "h"));
        assert!(!is_listed(&names, "q"));
        assert!(is_empty(None));
        assert!(is_empty(Some(&vec![])));
        assert!(!is_empty(Some(&names)));
    }
}
