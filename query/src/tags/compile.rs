//! Tag criteria compiler
//!
//! Lowers an include list into EXISTS fragments against the shared
//! placeholder cache. Two storage layouts: array mode probes the tag column
//! through the dialect's array-unnest expression, flat mode probes a child
//! table through a named value column. A leading negation marker flips
//! EXISTS to NOT EXISTS; wildcard tokens switch the comparison to LIKE after
//! escaping any literal pattern metacharacters in the tag.

use serde::{Deserialize, Serialize};

use super::{DEFAULT_NEGATION, TagChunk};
use crate::dialect::SqlDialect;
use crate::params::SqlParams;
use crate::sql::{LIKE_ESCAPE, escape_like_pattern};

/// Default multi-character wildcard token, substituted with `%`.
pub const DEFAULT_WILDCARD_MANY: char = '*';

/// Default single-character wildcard token, substituted with `_`.
pub const DEFAULT_WILDCARD_ONE: char = '?';

/// Tag criteria: which column to probe and what to match.
///
/// `value_alias` selects flat mode: `column` is then a child table name and
/// the alias names its tag-value column. Without it, `column` is an array
/// column unnested through the dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagFilter {
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_alias: Option<String>,
    #[serde(default)]
    pub allow_wildcards: bool,
    #[serde(default)]
    pub include: Vec<TagChunk>,
}

impl TagFilter {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value_alias: None,
            allow_wildcards: false,
            include: Vec::new(),
        }
    }
}

/// Compiles [`TagFilter`] values into SQL boolean fragments.
///
/// Stateless apart from its marker characters; `compile` threads every bound
/// tag through the caller's [`SqlParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagCompiler {
    negation: char,
    wildcard_many: char,
    wildcard_one: char,
}

impl TagCompiler {
    pub fn new() -> Self {
        Self {
            negation: DEFAULT_NEGATION,
            wildcard_many: DEFAULT_WILDCARD_MANY,
            wildcard_one: DEFAULT_WILDCARD_ONE,
        }
    }

    pub fn with_negation(mut self, negation: char) -> Self {
        self.negation = negation;
        self
    }

    pub fn with_wildcards(mut self, many: char, one: char) -> Self {
        self.wildcard_many = many;
        self.wildcard_one = one;
        self
    }

    /// Compile one criteria value into a boolean fragment.
    ///
    /// Bare entries AND-join; OR-groups join their members inside one
    /// parenthesized fragment. An empty include list compiles to the
    /// tautology `1`, never an empty string.
    pub fn compile(
        &self,
        filter: &TagFilter,
        dialect: &dyn SqlDialect,
        params: &mut SqlParams,
    ) -> String {
        let mut fragments = Vec::with_capacity(filter.include.len());
        for chunk in &filter.include {
            match chunk {
                TagChunk::Term(term) => {
                    fragments.push(self.compile_term(term, filter, dialect, params));
                }
                TagChunk::AnyOf(terms) => {
                    if terms.is_empty() {
                        continue;
                    }
                    let members: Vec<String> = terms
                        .iter()
                        .map(|term| self.compile_term(term, filter, dialect, params))
                        .collect();
                    fragments.push(format!("({})", members.join(" OR ")));
                }
            }
        }

        if fragments.is_empty() {
            return "1".to_string();
        }
        tracing::debug!(
            column = %filter.column,
            fragments = fragments.len(),
            dialect = dialect.name(),
            "compiled tag filter"
        );
        fragments.join(" AND ")
    }

    fn compile_term(
        &self,
        term: &str,
        filter: &TagFilter,
        dialect: &dyn SqlDialect,
        params: &mut SqlParams,
    ) -> String {
        let (negated, tag) = match term.strip_prefix(self.negation) {
            Some(rest) => (true, rest),
            None => (false, term),
        };

        let wildcard = filter.allow_wildcards && self.has_wildcard(tag);
        let value = if wildcard {
            self.to_like_pattern(tag)
        } else {
            tag.to_string()
        };
        let placeholder = params.bind(value);
        let comparison = if wildcard {
            format!("LIKE {} {}", placeholder, LIKE_ESCAPE)
        } else {
            format!("= {}", placeholder)
        };

        let subquery = match &filter.value_alias {
            Some(alias) => format!(
                "SELECT 1 FROM {} WHERE {}.{} {}",
                filter.column, filter.column, alias, comparison
            ),
            None => format!(
                "SELECT 1 FROM {} WHERE value {}",
                dialect.array_values(&filter.column),
                comparison
            ),
        };

        if negated {
            format!("NOT EXISTS ({})", subquery)
        } else {
            format!("EXISTS ({})", subquery)
        }
    }

    fn has_wildcard(&self, tag: &str) -> bool {
        tag.contains(self.wildcard_many) || tag.contains(self.wildcard_one)
    }

    /// Escape literal pattern metacharacters first, then substitute the
    /// wildcard tokens for their SQL equivalents.
    fn to_like_pattern(&self, tag: &str) -> String {
        escape_like_pattern(tag)
            .replace(self.wildcard_many, "%")
            .replace(self.wildcard_one, "_")
    }
}

impl Default for TagCompiler {
    fn default() -> Self {
        Self::new()
    }
}
