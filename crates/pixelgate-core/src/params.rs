//! Transformation parameters accepted from the query string.
//!
//! Everything outside [`KNOWN_PARAMS`] is dropped before the security policy
//! sees the request. Only [`NUMERIC_PARAMS`] may carry numeric constraints.

use std::collections::BTreeMap;

/// Every parameter name the transform option parser understands.
pub const KNOWN_PARAMS: [&str; 29] = [
    "h", "w", "ah", "aw", "t", "l", "q", "cp", "z", "crop", "en", "em", "flip", "flop", "force",
    "nar", "np", "itl", "smd", "tr", "ll", "th", "g", "br", "c", "r", "b", "bg", "fm",
];

/// Parameters whose values are integers and may carry `range`/`values` constraints.
pub const NUMERIC_PARAMS: [&str; 9] = ["w", "h", "q", "ah", "aw", "t", "l", "r", "b"];

/// Whether `param` is one of [`KNOWN_PARAMS`].
pub fn is_known(param: &str) -> bool {
    KNOWN_PARAMS.contains(&param)
}

/// Whether `param` may carry a numeric constraint.
pub fn is_numeric(param: &str) -> bool {
    NUMERIC_PARAMS.contains(&param)
}

/// Per-request parameter multi-map.
///
/// Owned by a single request; filtering steps remove entries in place.
/// Keys iterate in lexical order so policy evaluation is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    inner: BTreeMap<String, Vec<String>>,
}

impl RequestParams {
    /// Empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded `name=value` pairs, keeping repeated names in arrival order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut out = Self::new();
        for (k, v) in pairs {
            out.append(k, v);
        }
        out
    }

    /// Add one value for `name` after any existing ones.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(name.into()).or_default().push(value.into());
    }

    /// First value supplied for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Whether `name` is present with at least one value.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Remove every value of `name`. Returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.inner.remove(name).is_some()
    }

    /// Number of distinct parameter names.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no parameter is left.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Parameter names in key order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// `(name, first value)` pairs in key order.
    pub fn first_values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, values)| {
            let v = values.first().map(String::as_str).unwrap_or("");
            (k.as_str(), v)
        })
    }

    /// Drop every parameter the transform engine does not understand.
    pub fn retain_known(&mut self) {
        self.inner.retain(|k, _| is_known(k));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retain_known_drops_foreign_names() {
        let mut p = RequestParams::from_pairs([("w", "100"), ("utm_source", "mail"), ("fm", "png")]);
        p.retain_known();
        assert_eq!(p.names().collect::<Vec<_>>(), vec!["fm", "w"]);
    }

    #[test]
    fn get_returns_first_value() {
        let p = RequestParams::from_pairs([("w", "100"), ("w", "200")]);
        assert_eq!(p.get("w"), Some("100"));
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn numeric_params_are_known() {
        assert!(NUMERIC_PARAMS.iter().all(|p| is_known(p)));
        assert!(!is_numeric("fm"));
    }
}
