//! Unified error type for the compilers
//!
//! Three families, matching where a failure can surface:
//! - configuration errors, raised synchronously at registration time;
//! - structural errors, raised while lowering a condition tree, before any
//!   SQL text is returned;
//! - grammar errors, raised by the tag tokenizer in strict mode only.
//!
//! Unknown colon-prefixed keys and unknown operator keys are deliberately not
//! errors; both fall back to verbatim treatment.

use thiserror::Error;

/// Error type for registration and compilation failures.
#[derive(Error, Debug, PartialEq)]
pub enum QueryError {
    // --- configuration ---
    /// An operator is already registered under this key
    #[error("operator `{0}` is already registered")]
    DuplicateOperator(String),

    /// A value transform is already registered under this key
    #[error("value transform `{0}` is already registered")]
    DuplicateTransform(String),

    /// A special filter is already registered under this title
    #[error("special filter `{0}` is already registered")]
    DuplicateSpecial(String),

    /// A symbolic modifier is already registered for this character
    #[error("modifier `{0}` is already registered")]
    DuplicateModifier(char),

    /// Registration keys must be non-empty
    #[error("registration key must not be empty")]
    EmptyKey,

    /// A transform template must mention the placeholder slot
    #[error("value transform `{key}` must contain a `{{}}` slot")]
    InvalidTransform { key: String },

    // --- structural input ---
    /// A condition leaf has no usable column expression
    #[error("condition leaf is missing a column")]
    MissingColumn,

    /// A flat-map entry or leaf body did not have the expected shape
    #[error("malformed condition for column `{column}`: {reason}")]
    MalformedLeaf { column: String, reason: String },

    /// A value cannot be bound (collection shape or failed coercion)
    #[error("unsupported value for column `{column}`: {reason}")]
    UnsupportedValue { column: String, reason: String },

    /// Filter JSON parse or count-limit failure
    #[error("invalid filter input: {0}")]
    InvalidFilterInput(String),

    // --- grammar (strict mode) ---
    /// The search query is empty after trimming
    #[error("search query is empty")]
    EmptyQuery,

    /// The search query has more terms than the configured limit
    #[error("search query exceeds the limit of {limit} terms")]
    TermLimitExceeded { limit: usize },

    /// Parentheses do not balance
    #[error("unbalanced parentheses in search query")]
    UnbalancedParens,

    /// A quoted segment never closes
    #[error("unterminated quote in search query")]
    UnterminatedQuote,
}

impl QueryError {
    /// Create a malformed-leaf error with column context.
    pub fn malformed_leaf(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedLeaf {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported-value error with column context.
    pub fn unsupported_value(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedValue {
            column: column.into(),
            reason: reason.into(),
        }
    }
}
