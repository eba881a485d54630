//! Pre-seeded operator registry contents
//!
//! Comparisons, pattern matching, and the scalar-function wrappers. The
//! function set is the portable SQLite core: the flat tag mode and the CLI
//! executor target SQLite first, and PostgreSQL carries the same names.

use std::sync::Arc;

use super::{OperatorRegistry, OperatorResolver, OperatorTemplate, ResolvedOperator};
use crate::condition::ConditionLeaf;
use crate::sql::{LIKE_ESCAPE, escape_like_pattern};
use crate::value::SqlValue;

const COMPARISONS: &[(&str, &str)] = &[
    ("=", "="),
    ("==", "="),
    ("!=", "!="),
    ("<>", "!="),
    (">", ">"),
    ("<", "<"),
    (">=", ">="),
    ("<=", "<="),
];

/// Wrappers that fold the bound parameter through the same function as the
/// column, so both sides compare canonicalized.
const SYMMETRIC_FUNCTIONS: &[&str] = &["lower", "upper", "trim", "ltrim", "rtrim"];

/// Wrappers applied to the column side only; the parameter stays as supplied.
const COLUMN_FUNCTIONS: &[&str] = &[
    "length", "abs", "round", "ceil", "floor", "hex", "quote", "char", "unicode", "typeof", "date",
    "time",
];

pub(crate) fn seed(registry: &mut OperatorRegistry) {
    for (key, operator) in COMPARISONS {
        registry.seed_operator(key, OperatorResolver::Verbatim((*operator).to_string()));
    }

    registry.seed_operator(
        "like",
        OperatorResolver::Resolver(Arc::new(|leaf| pattern_match(leaf, false))),
    );
    registry.seed_operator(
        "starts_with",
        OperatorResolver::Resolver(Arc::new(|leaf| pattern_match(leaf, true))),
    );

    for name in SYMMETRIC_FUNCTIONS {
        registry.seed_operator(
            name,
            OperatorResolver::Template(OperatorTemplate::symmetric(name, "=")),
        );
        registry.seed_transform(name, format!("{}({{}})", name));
    }

    for name in COLUMN_FUNCTIONS {
        registry.seed_operator(
            name,
            OperatorResolver::Template(OperatorTemplate::function(name, "=")),
        );
    }

    // NULL-tolerant equality: missing text compares as the empty string
    registry.seed_operator(
        "coalesce",
        OperatorResolver::Template(OperatorTemplate {
            operator: "=".to_string(),
            column: Some("coalesce({}, '')".to_string()),
            transform: None,
        }),
    );
}

/// Contains-style match, or prefix-only when `prefix_only` is set.
///
/// Literal `%`/`_`/`\` in the supplied value are escaped before the wildcard
/// wrapping, and the emitted comparison carries the matching ESCAPE clause.
fn pattern_match(leaf: &ConditionLeaf, prefix_only: bool) -> ResolvedOperator {
    let value = match leaf.value.clone().into_text() {
        SqlValue::Text(s) => {
            let escaped = escape_like_pattern(&s);
            let pattern = if prefix_only {
                format!("{}%", escaped)
            } else {
                format!("%{}%", escaped)
            };
            SqlValue::Text(pattern)
        }
        // NULL stays NULL: LIKE against it matches nothing, as intended
        other => other,
    };
    ResolvedOperator {
        operator: "LIKE".to_string(),
        column: leaf.column.clone(),
        value: Some(value),
        transform: None,
        suffix: Some(LIKE_ESCAPE.to_string()),
    }
}
