//! Shared error types across pixelgate crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed configuration.
    BadRequest,
    /// The body could not be inspected or transformed.
    Unprocessable,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Unprocessable => "UNPROCESSABLE",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PixelGateError>;

/// Failure of a single constraint, either against its declaration or
/// against a supplied value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("{kind} constraint cannot be applied on param: '{param}'")]
    InvalidConstraintTarget { kind: &'static str, param: String },
    #[error("range constraint must satisfy 0 <= from < to (from={from}, to={to})")]
    InvalidRangeBounds { from: i64, to: i64 },
    #[error("you need to provide at least one value for values constraint")]
    EmptyValueSet,
    #[error("invalid integer value for {param}: {value}")]
    NotAnInteger { param: String, value: String },
    #[error("{param} must be in range {from} to {to}")]
    OutOfRange { param: String, from: i64, to: i64 },
    #[error("parameter {param} has an invalid value: {value}")]
    ValueNotAllowed { param: String, value: i64 },
}

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum PixelGateError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid constraint on '{param}': {source}")]
    Constraint {
        param: String,
        source: ConstraintError,
    },
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("invalid value for '{param}': {reason}")]
    InvalidOption { param: String, reason: String },
    #[error("transform failed: {0}")]
    Transform(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl PixelGateError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            PixelGateError::Config(_) => ClientCode::BadRequest,
            PixelGateError::Constraint { .. } => ClientCode::BadRequest,
            PixelGateError::UnsupportedEncoding(_) => ClientCode::Unprocessable,
            PixelGateError::Decode(_) => ClientCode::Unprocessable,
            PixelGateError::InvalidOption { .. } => ClientCode::BadRequest,
            PixelGateError::Transform(_) => ClientCode::Unprocessable,
            PixelGateError::Internal(_) => ClientCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_codes_are_stable() {
        let cases = [
            (PixelGateError::Config("x".into()), "BAD_REQUEST"),
            (
                PixelGateError::InvalidOption {
                    param: "fm".into(),
                    reason: "bad".into(),
                },
                "BAD_REQUEST",
            ),
            (PixelGateError::UnsupportedEncoding("br".into()), "UNPROCESSABLE"),
            (PixelGateError::Transform("x".into()), "UNPROCESSABLE"),
            (PixelGateError::Internal("x".into()), "INTERNAL"),
        ];
        for (err, code) in cases {
            assert_eq!(err.client_code().as_str(), code, "{err}");
        }
    }
}
