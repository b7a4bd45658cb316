//! Error types for selector parsing.

use thiserror::Error;

/// Result type for selector operations.
pub type SelectorResult<T> = Result<T, SelectorError>;

/// Errors raised while compiling a selector or sort criteria.
///
/// Evaluation itself never fails: every error surfaces at parse time so a
/// selector is never partially evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// The operator is not part of the selector language.
    #[error("unknown selector operator: {0}")]
    UnknownOperator(String),

    /// The operand does not have the shape the operator requires.
    #[error("invalid operand for {operator}: {message}")]
    InvalidOperand {
        /// The operator being compiled.
        operator: String,
        /// Description of the problem.
        message: String,
    },

    /// A `$regex` pattern failed to compile.
    #[error("invalid regex {pattern:?}: {message}")]
    InvalidRegex {
        /// The offending pattern.
        pattern: String,
        /// Message from the regex compiler.
        message: String,
    },

    /// The selector tree itself is malformed.
    #[error("malformed selector: {0}")]
    Malformed(String),

    /// A sort criterion is malformed.
    #[error("invalid sort criterion: {0}")]
    InvalidSort(String),
}

impl SelectorError {
    /// Creates an invalid operand error.
    pub fn invalid_operand(operator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOperand {
            operator: operator.into(),
            message: message.into(),
        }
    }

    /// Creates a malformed selector error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SelectorError::UnknownOperator("$near".into());
        assert_eq!(err.to_string(), "unknown selector operator: $near");

        let err = SelectorError::invalid_operand("$in", "expected an array");
        assert!(err.to_string().contains("$in"));
        assert!(err.to_string().contains("expected an array"));
    }
}
