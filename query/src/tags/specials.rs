//! Symbolic modifiers and colon specials
//!
//! After tokenizing, terms like `applejack^2` and `source:ponybooru` are not
//! tag matches: the first carries a numeric modifier routed to an auxiliary
//! list, the second is a special filter routed to custom logic. Extraction
//! walks the chunk stream once, peels both shapes out, and leaves a residual
//! include list. Unknown colon keys stay literal tags.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::TagChunk;
use crate::error::QueryError;
use crate::value::SqlValue;

/// Transforms the raw text after `title:` into the bound value.
pub type SpecialParserFn = dyn Fn(&str) -> SqlValue + Send + Sync;

/// Modifier syntax `term<symbol><number>`, e.g. `applejack^2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicModifier {
    /// Split character tested against each term.
    pub symbol: char,
    /// Destination list name in the parse output.
    pub list: String,
    /// Field name the numeric value serializes under.
    pub field: String,
}

/// Colon syntax `title:value`.
#[derive(Clone)]
pub struct SpecialQuery {
    pub title: String,
    parser: Option<Arc<SpecialParserFn>>,
}

impl SpecialQuery {
    /// Apply the value parser, or keep the raw text.
    pub fn parse_value(&self, raw: &str) -> SqlValue {
        match &self.parser {
            Some(parser) => parser(raw),
            None => SqlValue::Text(raw.to_string()),
        }
    }
}

impl fmt::Debug for SpecialQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecialQuery")
            .field("title", &self.title)
            .field("parser", &self.parser.as_ref().map(|_| "fn"))
            .finish()
    }
}

/// One extracted colon special.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecialFilter {
    pub key: String,
    pub value: SqlValue,
}

/// One extracted modifier entry: the base term and its parsed weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTerm {
    pub term: String,
    pub value: f64,
}

/// An auxiliary list plus the field name its values serialize under.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuxList {
    pub field: String,
    pub entries: Vec<WeightedTerm>,
}

/// Everything one extraction pass produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub include: Vec<TagChunk>,
    pub specials: Vec<SpecialFilter>,
    pub lists: BTreeMap<String, AuxList>,
}

/// Write-once registry of special queries and symbolic modifiers.
///
/// Configure at setup, then treat as read-only; extraction takes `&self`.
#[derive(Debug, Clone, Default)]
pub struct SpecialRegistry {
    specials: FxHashMap<String, SpecialQuery>,
    modifiers: Vec<SymbolicModifier>,
}

impl SpecialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a colon special. Titles match exactly, once.
    pub fn add_special(
        &mut self,
        title: impl Into<String>,
        parser: Option<Arc<SpecialParserFn>>,
    ) -> Result<(), QueryError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(QueryError::EmptyKey);
        }
        if self.specials.contains_key(&title) {
            return Err(QueryError::DuplicateSpecial(title));
        }
        self.specials.insert(
            title.clone(),
            SpecialQuery { title, parser },
        );
        Ok(())
    }

    /// Register a symbolic modifier. Symbols are unique; modifiers are tested
    /// in registration order.
    pub fn add_modifier(
        &mut self,
        symbol: char,
        list: impl Into<String>,
        field: impl Into<String>,
    ) -> Result<(), QueryError> {
        let list = list.into().trim().to_string();
        let field = field.into().trim().to_string();
        if list.is_empty() || field.is_empty() {
            return Err(QueryError::EmptyKey);
        }
        if self.modifiers.iter().any(|m| m.symbol == symbol) {
            return Err(QueryError::DuplicateModifier(symbol));
        }
        self.modifiers.push(SymbolicModifier {
            symbol,
            list,
            field,
        });
        Ok(())
    }

    /// Remove a special; returns whether it was registered. The title is
    /// free for re-registration afterwards.
    pub fn remove_special(&mut self, title: &str) -> bool {
        self.specials.remove(title).is_some()
    }

    /// Remove a modifier; returns whether it was registered.
    pub fn remove_modifier(&mut self, symbol: char) -> bool {
        let before = self.modifiers.len();
        self.modifiers.retain(|m| m.symbol != symbol);
        self.modifiers.len() != before
    }

    pub fn special(&self, title: &str) -> Option<&SpecialQuery> {
        self.specials.get(title)
    }

    pub fn modifier(&self, symbol: char) -> Option<&SymbolicModifier> {
        self.modifiers.iter().find(|m| m.symbol == symbol)
    }

    pub fn modifiers(&self) -> &[SymbolicModifier] {
        &self.modifiers
    }

    /// Walk the chunk stream, peeling modifiers and specials out of each
    /// term. Chunks left empty are dropped; singleton groups collapse to a
    /// bare term. Every registered destination list appears in the output,
    /// populated or not.
    pub fn extract(&self, chunks: Vec<TagChunk>, negation: char, dedupe: bool) -> Extraction {
        let mut lists: BTreeMap<String, AuxList> = BTreeMap::new();
        for modifier in &self.modifiers {
            lists.entry(modifier.list.clone()).or_insert_with(|| AuxList {
                field: modifier.field.clone(),
                entries: Vec::new(),
            });
        }

        let mut include = Vec::new();
        let mut specials = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();

        for chunk in chunks {
            match chunk {
                TagChunk::Term(term) => {
                    if let Some(residual) =
                        self.extract_term(term, negation, &mut lists, &mut specials)
                    {
                        if dedupe && !seen.insert(residual.clone()) {
                            continue;
                        }
                        include.push(TagChunk::Term(residual));
                    }
                }
                TagChunk::AnyOf(terms) => {
                    let mut residuals = Vec::new();
                    for term in terms {
                        if let Some(residual) =
                            self.extract_term(term, negation, &mut lists, &mut specials)
                        {
                            residuals.push(residual);
                        }
                    }
                    if residuals.len() == 1 {
                        if let Some(term) = residuals.pop() {
                            include.push(TagChunk::Term(term));
                        }
                    } else if !residuals.is_empty() {
                        include.push(TagChunk::AnyOf(residuals));
                    }
                }
            }
        }

        Extraction {
            include,
            specials,
            lists,
        }
    }

    /// Process one term. Returns the residual to keep in the include list,
    /// or `None` when the term was consumed entirely.
    fn extract_term(
        &self,
        term: String,
        negation: char,
        lists: &mut BTreeMap<String, AuxList>,
        specials: &mut Vec<SpecialFilter>,
    ) -> Option<String> {
        for modifier in &self.modifiers {
            if let Some(at) = term.find(modifier.symbol) {
                let base = term[..at].to_string();
                let raw = &term[at + modifier.symbol.len_utf8()..];
                let value = parse_weight(raw, negation);
                if let Some(list) = lists.get_mut(&modifier.list) {
                    if !list.entries.iter().any(|entry| entry.term == base) {
                        list.entries.push(WeightedTerm {
                            term: base.clone(),
                            value,
                        });
                    }
                }
                return if base.is_empty() { None } else { Some(base) };
            }
        }

        if let Some((key, rest)) = term.split_once(':') {
            if let Some(special) = self.specials.get(key) {
                specials.push(SpecialFilter {
                    key: key.to_string(),
                    value: special.parse_value(rest),
                });
                return None;
            }
        }

        Some(term)
    }
}

/// Parse the text after a modifier symbol as a weight. The negation marker
/// maps to a minus sign; anything unparseable defaults to 1.
fn parse_weight(raw: &str, negation: char) -> f64 {
    raw.replacen(negation, "-", 1).trim().parse().unwrap_or(1.0)
}
