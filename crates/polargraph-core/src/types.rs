//! Core types shared across the polar construction pipeline
//!
//! Bits are carried as `u8` values restricted to `0` and `1`, matching the
//! dense parity-check and generator matrices produced by [`crate::gf2`].
//! Log-likelihood ratios follow the usual convention: positive means the
//! bit is more likely `0`.

use crate::config::ConfigError;

/// A single code bit (`0` or `1`).
pub type Bit = u8;

/// A codeword or information word.
pub type BitVec = Vec<Bit>;

/// A log-likelihood ratio, `ln(P(y|0) / P(y|1))`.
pub type Llr = f64;

/// Result type for polar code operations
pub type PolarResult<T> = Result<T, PolarError>;

/// Errors that can occur while constructing or reducing polar codes
#[derive(Debug, Clone, thiserror::Error)]
pub enum PolarError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "Inconsistent frozen set: variable {lower} is frozen while its butterfly partner {upper} is not"
    )]
    InconsistentFrozenSet { lower: String, upper: String },

    #[error("Factor graph has not been sparsified")]
    NotSparsified,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PolarError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        PolarError::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PolarError::invalid("mu must be even, got 3");
        assert_eq!(err.to_string(), "Invalid argument: mu must be even, got 3");

        let err = PolarError::InconsistentFrozenSet {
            lower: "u1".to_string(),
            upper: "u0".to_string(),
        };
        assert!(err.to_string().contains("u1"));
        assert!(err.to_string().contains("u0"));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: PolarError = ConfigError::ValidationError("mu must be even".into()).into();
        assert!(matches!(err, PolarError::Config(_)));
        assert!(err.to_string().contains("mu must be even"));
    }
}
