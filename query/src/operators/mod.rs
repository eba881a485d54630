//! Operator registry for the condition compiler
//!
//! Maps operator keys (case-insensitive) to resolvers that decide the
//! effective SQL comparator, column expression, bound value, and optional
//! value transform for a leaf. A second table maps transform keys to
//! `{}`-templates wrapped around placeholder text, which is how a function
//! gets applied to both sides of a comparison (`lower(name) = lower($1)`).
//!
//! Keys are write-once: registering over a live key is a configuration error,
//! surfaced synchronously. Looking up a key nobody registered is not — the
//! condition compiler falls back to the key text as a verbatim comparator.

mod defaults;

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::condition::ConditionLeaf;
use crate::error::QueryError;
use crate::value::SqlValue;

/// Effective lowering of one condition leaf, produced by a resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOperator {
    /// SQL comparator text placed between column and placeholder.
    pub operator: String,
    /// Column expression, possibly rewritten (e.g. wrapped in a function).
    pub column: String,
    /// Replacement for the leaf's value, when the resolver rewrites it.
    pub value: Option<SqlValue>,
    /// Key into the transform table, applied to the placeholder text.
    pub transform: Option<String>,
    /// Text emitted after the placeholder, e.g. a LIKE escape clause.
    pub suffix: Option<String>,
}

/// Declarative resolver: fixed comparator, optional column template and
/// transform key.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorTemplate {
    /// SQL comparator the key maps to.
    pub operator: String,
    /// Column rewrite template; `{}` is replaced by the leaf's column.
    pub column: Option<String>,
    /// Transform key applied to the placeholder side.
    pub transform: Option<String>,
}

impl OperatorTemplate {
    /// Comparator-only template.
    pub fn operator(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            column: None,
            transform: None,
        }
    }

    /// Wrap the column in a single-argument SQL function.
    pub fn function(name: &str, operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            column: Some(format!("{}({{}})", name)),
            transform: None,
        }
    }

    /// Wrap the column and select the transform of the same name, so the
    /// function lands on the bound parameter too.
    pub fn symmetric(name: &str, operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            column: Some(format!("{}({{}})", name)),
            transform: Some(name.to_string()),
        }
    }
}

/// Resolver callback signature for fully custom operators.
pub type ResolverFn = dyn Fn(&ConditionLeaf) -> ResolvedOperator + Send + Sync;

/// How an operator key lowers a leaf.
#[derive(Clone)]
pub enum OperatorResolver {
    /// Emit this comparator text; column and value pass through untouched.
    Verbatim(String),
    /// Declarative rewrite of comparator/column/transform.
    Template(OperatorTemplate),
    /// Arbitrary resolution from the whole leaf.
    Resolver(Arc<ResolverFn>),
}

impl fmt::Debug for OperatorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verbatim(op) => f.debug_tuple("Verbatim").field(op).finish(),
            Self::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// Registry of operator keys and placeholder transforms.
///
/// Configured once at setup, then shared read-only across compiles.
#[derive(Debug, Clone)]
pub struct OperatorRegistry {
    operators: FxHashMap<String, OperatorResolver>,
    transforms: FxHashMap<String, String>,
}

impl OperatorRegistry {
    /// Registry pre-seeded with the comparison, pattern-match, and
    /// scalar-function operators.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        defaults::seed(&mut registry);
        registry
    }

    /// Registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            operators: FxHashMap::default(),
            transforms: FxHashMap::default(),
        }
    }

    /// Register a resolver under a key. Keys compare case-insensitively and
    /// are write-once; re-registering a live key is an error.
    pub fn register(
        &mut self,
        key: &str,
        resolver: OperatorResolver,
    ) -> Result<(), QueryError> {
        let key = normalize_key(key)?;
        if self.operators.contains_key(&key) {
            return Err(QueryError::DuplicateOperator(key));
        }
        self.operators.insert(key, resolver);
        Ok(())
    }

    /// Register a placeholder transform template, e.g. `lower({})`.
    pub fn register_transform(&mut self, key: &str, template: &str) -> Result<(), QueryError> {
        let key = normalize_key(key)?;
        if !template.contains("{}") {
            return Err(QueryError::InvalidTransform { key });
        }
        if self.transforms.contains_key(&key) {
            return Err(QueryError::DuplicateTransform(key));
        }
        self.transforms.insert(key, template.to_string());
        Ok(())
    }

    /// Remove an operator key. Returns whether it was present; the key can be
    /// registered again afterwards.
    pub fn remove(&mut self, key: &str) -> bool {
        self.operators.remove(&key.trim().to_lowercase()).is_some()
    }

    /// Remove a transform key.
    pub fn remove_transform(&mut self, key: &str) -> bool {
        self.transforms.remove(&key.trim().to_lowercase()).is_some()
    }

    /// Look up a resolver by key, case-insensitively.
    pub fn get(&self, key: &str) -> Option<&OperatorResolver> {
        self.operators.get(&key.trim().to_lowercase())
    }

    /// Look up a transform template by key.
    pub fn transform(&self, key: &str) -> Option<&str> {
        self.transforms
            .get(&key.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Lower a leaf into its effective operator/column/value/transform.
    ///
    /// Unregistered keys are not an error: the key text becomes the
    /// comparator verbatim and everything else passes through.
    pub fn resolve(&self, leaf: &ConditionLeaf) -> ResolvedOperator {
        match self.get(&leaf.operator) {
            None => ResolvedOperator {
                operator: leaf.operator.clone(),
                column: leaf.column.clone(),
                value: None,
                transform: None,
                suffix: None,
            },
            Some(OperatorResolver::Verbatim(op)) => ResolvedOperator {
                operator: op.clone(),
                column: leaf.column.clone(),
                value: None,
                transform: None,
                suffix: None,
            },
            Some(OperatorResolver::Template(t)) => ResolvedOperator {
                operator: t.operator.clone(),
                column: match &t.column {
                    Some(template) => template.replace("{}", &leaf.column),
                    None => leaf.column.clone(),
                },
                value: None,
                transform: t.transform.clone(),
                suffix: None,
            },
            Some(OperatorResolver::Resolver(f)) => f(leaf),
        }
    }

    /// Apply the transform selected for a leaf to its placeholder text.
    ///
    /// A transform key nobody registered leaves the placeholder untouched.
    pub fn apply_transform(&self, key: Option<&str>, placeholder: String) -> String {
        match key.and_then(|k| self.transform(k)) {
            Some(template) => template.replace("{}", &placeholder),
            None => placeholder,
        }
    }

    // Seeding path: keys are static and unique by construction.
    pub(crate) fn seed_operator(&mut self, key: &'static str, resolver: OperatorResolver) {
        self.operators.insert(key.to_lowercase(), resolver);
    }

    pub(crate) fn seed_transform(&mut self, key: &'static str, template: String) {
        self.transforms.insert(key.to_lowercase(), template);
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_key(key: &str) -> Result<String, QueryError> {
    let key = key.trim().to_lowercase();
    if key.is_empty() {
        return Err(QueryError::EmptyKey);
    }
    Ok(key)
}
