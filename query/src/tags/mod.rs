//! Tag query language
//!
//! Free-text tag expressions (`rarity AND (applejack OR "pinkie pie") AND
//! !hat`) pass through three stages: the [`tokenizer`] turns raw text into
//! ordered chunks, [`specials`] extraction peels symbolic modifiers and
//! colon-prefixed special filters out of those chunks, and [`compile`] lowers
//! the residual include list into EXISTS fragments against the shared
//! placeholder cache.

pub mod compile;
pub mod specials;
pub mod tokenizer;

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use crate::error::QueryError;
use crate::value::SqlValue;

pub use compile::{TagCompiler, TagFilter};
pub use specials::{
    AuxList, SpecialFilter, SpecialQuery, SpecialRegistry, SymbolicModifier, WeightedTerm,
};
pub use tokenizer::{StrictMode, TokenizerOptions, tokenize};

/// Default negation marker on a tag term.
pub const DEFAULT_NEGATION: char = '!';

/// One tokenizer output unit: a bare term, or an OR-group of terms.
///
/// Serializes untagged, so JSON round-trips as `"tag"` or `["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagChunk {
    Term(String),
    AnyOf(Vec<String>),
}

impl TagChunk {
    /// Number of terms in this chunk.
    pub fn len(&self) -> usize {
        match self {
            Self::Term(_) => 1,
            Self::AnyOf(terms) => terms.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Term(_) => false,
            Self::AnyOf(terms) => terms.is_empty(),
        }
    }
}

impl From<&str> for TagChunk {
    fn from(term: &str) -> Self {
        Self::Term(term.to_string())
    }
}

/// Parses tag expressions for one tag column.
///
/// Holds the tokenizer options and the special/modifier registry; build and
/// configure one at setup, then call [`parse`](Self::parse) per request.
#[derive(Debug, Clone)]
pub struct TagQueryParser {
    column: String,
    options: TokenizerOptions,
    specials: SpecialRegistry,
    negation: char,
}

impl TagQueryParser {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            options: TokenizerOptions::default(),
            specials: SpecialRegistry::new(),
            negation: DEFAULT_NEGATION,
        }
    }

    pub fn with_options(mut self, options: TokenizerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_negation(mut self, negation: char) -> Self {
        self.negation = negation;
        self
    }

    /// Registry access for setup-time registration.
    pub fn specials_mut(&mut self) -> &mut SpecialRegistry {
        &mut self.specials
    }

    pub fn specials(&self) -> &SpecialRegistry {
        &self.specials
    }

    /// Tokenize and extract one tag expression.
    pub fn parse(&self, input: &str) -> Result<ParsedQuery, QueryError> {
        let chunks = tokenizer::tokenize(input, &self.options)?;
        let extraction = self
            .specials
            .extract(chunks, self.negation, self.options.dedupe);
        tracing::debug!(
            column = %self.column,
            chunks = extraction.include.len(),
            specials = extraction.specials.len(),
            "parsed tag expression"
        );
        Ok(ParsedQuery {
            column: self.column.clone(),
            include: extraction.include,
            specials: extraction.specials,
            lists: extraction.lists,
        })
    }
}

/// A fully parsed tag expression: the residual include list plus everything
/// the specials pass extracted from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    /// Column the include list filters against.
    pub column: String,
    /// Residual chunks, in input order.
    pub include: Vec<TagChunk>,
    /// Colon-special filters, in input order.
    pub specials: Vec<SpecialFilter>,
    /// Auxiliary lists keyed by their configured destination name.
    pub lists: BTreeMap<String, AuxList>,
}

impl ParsedQuery {
    /// Entries of one auxiliary list, empty when the list has none.
    pub fn list(&self, name: &str) -> &[WeightedTerm] {
        self.lists
            .get(name)
            .map(|list| list.entries.as_slice())
            .unwrap_or(&[])
    }

    /// First special filter registered under `key`.
    pub fn special(&self, key: &str) -> Option<&SqlValue> {
        self.specials
            .iter()
            .find(|s| s.key == key)
            .map(|s| &s.value)
    }

    /// Build the criteria value the tag compiler consumes.
    pub fn filter(&self, allow_wildcards: bool) -> TagFilter {
        TagFilter {
            column: self.column.clone(),
            value_alias: None,
            allow_wildcards,
            include: self.include.clone(),
        }
    }

    /// Render as JSON, with each auxiliary list under its configured name and
    /// each entry's value under the modifier's configured field name.
    pub fn to_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        out.insert("column".to_string(), json!(self.column));
        out.insert("includeList".to_string(), json!(self.include));
        out.insert("specials".to_string(), json!(self.specials));
        for (name, list) in &self.lists {
            let entries: Vec<serde_json::Value> = list
                .entries
                .iter()
                .map(|entry| {
                    let mut obj = serde_json::Map::new();
                    obj.insert("term".to_string(), json!(entry.term));
                    obj.insert(list.field.clone(), json!(entry.value));
                    serde_json::Value::Object(obj)
                })
                .collect();
            out.insert(name.clone(), serde_json::Value::Array(entries));
        }
        serde_json::Value::Object(out)
    }
}
