//! Generic condition-tree compiler
//!
//! Lowers a boolean tree of comparison leaves (or the legacy flat
//! column→body map) into one SQL fragment, resolving every leaf through the
//! operator registry and binding every value through the shared placeholder
//! cache. Column and table identifiers are caller-trusted and pass through
//! verbatim; values never do.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::QueryError;
use crate::operators::OperatorRegistry;
use crate::params::SqlParams;
use crate::value::{SqlValue, ValueKind};

/// Maximum size of condition JSON accepted by [`parse_conditions`] (64KB)
const MAX_CONDITION_JSON_SIZE: usize = 64 * 1024;

/// Maximum number of top-level conditions accepted by [`parse_conditions`]
const MAX_CONDITIONS: usize = 50;

/// Joiner for composite nodes.
///
/// Deserialization is lenient on purpose: any unrecognized joiner text means
/// AND, so a caller typo widens nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogicalOp {
    #[default]
    And,
    Or,
}

impl LogicalOp {
    fn joiner(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

impl From<String> for LogicalOp {
    fn from(s: String) -> Self {
        if s.trim().eq_ignore_ascii_case("or") {
            Self::Or
        } else {
            Self::And
        }
    }
}

impl From<LogicalOp> for String {
    fn from(op: LogicalOp) -> Self {
        op.to_string()
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// One comparison: column, operator key, value, optional rewrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionLeaf {
    /// Column expression (caller-trusted identifier).
    pub column: String,
    /// Operator key looked up in the registry; defaults to `=`.
    #[serde(default = "default_operator")]
    pub operator: String,
    /// Value bound through the placeholder cache.
    #[serde(default)]
    pub value: SqlValue,
    /// Coerce the value to this kind before binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueKind>,
    /// Wrap the resolved column expression in this SQL function (outermost).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Replace the resolved comparator with this text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_override: Option<String>,
}

fn default_operator() -> String {
    "=".to_string()
}

impl ConditionLeaf {
    /// Leaf with an explicit operator key.
    pub fn new(
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<SqlValue>,
    ) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            value: value.into(),
            value_type: None,
            function: None,
            operator_override: None,
        }
    }

    /// Equality leaf.
    pub fn equals(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::new(column, "=", value)
    }
}

/// Composite node: children joined with one logical operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default)]
    pub op: LogicalOp,
    pub children: Vec<Condition>,
}

/// A condition tree node.
///
/// Deserializes untagged: an object with `children` is a group, an object
/// with `column` is a leaf, and any other object is the legacy flat
/// column→body map (implicit AND, key order preserved).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Group(ConditionGroup),
    Leaf(ConditionLeaf),
    Flat(Map<String, Value>),
}

impl Condition {
    /// AND-joined group.
    pub fn all(children: Vec<Condition>) -> Self {
        Self::Group(ConditionGroup {
            op: LogicalOp::And,
            children,
        })
    }

    /// OR-joined group.
    pub fn any(children: Vec<Condition>) -> Self {
        Self::Group(ConditionGroup {
            op: LogicalOp::Or,
            children,
        })
    }

    /// Parse one condition from a JSON value.
    pub fn from_json(value: Value) -> Result<Self, QueryError> {
        serde_json::from_value(value).map_err(|e| QueryError::InvalidFilterInput(e.to_string()))
    }
}

impl From<ConditionLeaf> for Condition {
    fn from(leaf: ConditionLeaf) -> Self {
        Self::Leaf(leaf)
    }
}

/// Parse a JSON array of condition trees, with the same size/count guards the
/// ingest path applies to filter JSON.
pub fn parse_conditions(json_str: &str) -> Result<Vec<Condition>, QueryError> {
    if json_str.len() > MAX_CONDITION_JSON_SIZE {
        return Err(QueryError::InvalidFilterInput(format!(
            "condition JSON exceeds maximum size of {} bytes",
            MAX_CONDITION_JSON_SIZE
        )));
    }

    let conditions: Vec<Condition> = serde_json::from_str(json_str)
        .map_err(|e| QueryError::InvalidFilterInput(e.to_string()))?;

    if conditions.len() > MAX_CONDITIONS {
        return Err(QueryError::InvalidFilterInput(format!(
            "maximum {} conditions allowed",
            MAX_CONDITIONS
        )));
    }

    Ok(conditions)
}

/// Compiles condition trees against an operator registry.
///
/// Build one at setup, register any custom operators, then share it
/// read-only; `compile` takes the registry by `&self` and the caller's
/// [`SqlParams`] exclusively by `&mut`.
#[derive(Debug, Clone)]
pub struct ConditionCompiler {
    operators: OperatorRegistry,
}

impl ConditionCompiler {
    /// Compiler over the default seeded registry.
    pub fn new() -> Self {
        Self {
            operators: OperatorRegistry::new(),
        }
    }

    /// Compiler over a caller-configured registry.
    pub fn with_registry(operators: OperatorRegistry) -> Self {
        Self { operators }
    }

    /// The registry, for lookups.
    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    /// Mutable registry access for setup-time registration.
    pub fn operators_mut(&mut self) -> &mut OperatorRegistry {
        &mut self.operators
    }

    /// Lower a condition tree to one SQL fragment, binding values in order.
    ///
    /// On error the cache may already hold part of the tree's values; discard
    /// it rather than composing further fragments onto it.
    pub fn compile(
        &self,
        condition: &Condition,
        params: &mut SqlParams,
    ) -> Result<String, QueryError> {
        let before = params.len();
        let sql = self.compile_node(condition, params)?;
        tracing::trace!(
            bound = params.len() - before,
            "compiled condition fragment"
        );
        Ok(sql)
    }

    fn compile_node(
        &self,
        condition: &Condition,
        params: &mut SqlParams,
    ) -> Result<String, QueryError> {
        match condition {
            Condition::Group(group) => self.compile_group(group, params),
            Condition::Leaf(leaf) => self.compile_leaf(leaf, params),
            Condition::Flat(map) => self.compile_flat(map, params),
        }
    }

    fn compile_group(
        &self,
        group: &ConditionGroup,
        params: &mut SqlParams,
    ) -> Result<String, QueryError> {
        if group.children.is_empty() {
            // Tautology, so a vacuous group composes as identity under the
            // AND-joined WHERE clause callers assemble.
            return Ok("1".to_string());
        }
        let mut fragments = Vec::with_capacity(group.children.len());
        for child in &group.children {
            let sql = self.compile_node(child, params)?;
            fragments.push(format!("({})", sql));
        }
        Ok(fragments.join(group.op.joiner()))
    }

    fn compile_leaf(
        &self,
        leaf: &ConditionLeaf,
        params: &mut SqlParams,
    ) -> Result<String, QueryError> {
        if leaf.column.trim().is_empty() {
            return Err(QueryError::MissingColumn);
        }

        let resolved = self.operators.resolve(leaf);

        let operator = leaf
            .operator_override
            .clone()
            .unwrap_or(resolved.operator);

        let mut column = resolved.column;
        if let Some(function) = &leaf.function {
            column = format!("{}({})", function, column);
        }

        let mut value = resolved.value.unwrap_or_else(|| leaf.value.clone());
        if let Some(kind) = leaf.value_type {
            value = kind.coerce(value).ok_or_else(|| {
                QueryError::unsupported_value(
                    &leaf.column,
                    format!("cannot coerce to {}", kind),
                )
            })?;
        }

        let placeholder = params.bind(value);
        let rhs = self
            .operators
            .apply_transform(resolved.transform.as_deref(), placeholder);

        Ok(match resolved.suffix {
            Some(suffix) => format!("{} {} {} {}", column, operator, rhs, suffix),
            None => format!("{} {} {}", column, operator, rhs),
        })
    }

    fn compile_flat(
        &self,
        map: &Map<String, Value>,
        params: &mut SqlParams,
    ) -> Result<String, QueryError> {
        if map.is_empty() {
            return Ok("1".to_string());
        }
        let mut fragments = Vec::with_capacity(map.len());
        for (key, body) in map {
            let leaf = flat_entry_to_leaf(key, body)?;
            let sql = self.compile_leaf(&leaf, params)?;
            fragments.push(format!("({})", sql));
        }
        Ok(fragments.join(LogicalOp::And.joiner()))
    }
}

impl Default for ConditionCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Leaf body inside a legacy flat map. The map key supplies the column
/// unless the body names its own.
#[derive(Debug, Deserialize)]
struct FlatLeafBody {
    column: Option<String>,
    #[serde(default = "default_operator")]
    operator: String,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    value_type: Option<ValueKind>,
    #[serde(default)]
    function: Option<String>,
    #[serde(default)]
    operator_override: Option<String>,
}

fn flat_entry_to_leaf(key: &str, body: &Value) -> Result<ConditionLeaf, QueryError> {
    if !body.is_object() {
        return Err(QueryError::malformed_leaf(key, "expected an object body"));
    }
    let body: FlatLeafBody = serde_json::from_value(body.clone())
        .map_err(|e| QueryError::malformed_leaf(key, e.to_string()))?;
    let value = SqlValue::from_json(&body.value).ok_or_else(|| {
        QueryError::unsupported_value(key, "arrays and objects cannot be bound")
    })?;
    Ok(ConditionLeaf {
        column: body.column.unwrap_or_else(|| key.to_string()),
        operator: body.operator,
        value,
        value_type: body.value_type,
        function: body.function,
        operator_override: body.operator_override,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_composite_numbers_left_to_right() {
        let condition = Condition::any(vec![
            ConditionLeaf::equals("status", "active").into(),
            ConditionLeaf::equals("type", "admin").into(),
        ]);
        let mut params = SqlParams::new();
        let sql = ConditionCompiler::new().compile(&condition, &mut params).unwrap();

        assert_eq!(sql, "(status = $1) OR (type = $2)");
        assert_eq!(
            params.values(),
            &[SqlValue::Text("active".into()), SqlValue::Text("admin".into())]
        );
    }

    #[test]
    fn test_nested_groups_parenthesize_each_child() {
        let condition = Condition::all(vec![
            ConditionLeaf::equals("a", 1i64).into(),
            Condition::any(vec![
                ConditionLeaf::equals("b", 2i64).into(),
                ConditionLeaf::equals("c", 3i64).into(),
            ]),
        ]);
        let mut params = SqlParams::new();
        let sql = ConditionCompiler::new().compile(&condition, &mut params).unwrap();

        assert_eq!(sql, "(a = $1) AND ((b = $2) OR (c = $3))");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_empty_group_is_a_tautology() {
        let mut params = SqlParams::new();
        let sql = ConditionCompiler::new()
            .compile(&Condition::all(vec![]), &mut params)
            .unwrap();
        assert_eq!(sql, "1");
        assert!(params.is_empty());
    }

    #[test]
    fn test_unknown_operator_key_renders_verbatim() {
        let leaf = ConditionLeaf::new("payload", "@>", "tag");
        let mut params = SqlParams::new();
        let sql = ConditionCompiler::new()
            .compile(&leaf.into(), &mut params)
            .unwrap();
        assert_eq!(sql, "payload @> $1");
    }

    #[test]
    fn test_like_operator_escapes_and_wraps() {
        let leaf = ConditionLeaf::new("title", "like", "100%");
        let mut params = SqlParams::new();
        let sql = ConditionCompiler::new()
            .compile(&leaf.into(), &mut params)
            .unwrap();
        assert_eq!(sql, r"title LIKE $1 ESCAPE '\'");
        assert_eq!(params.values(), &[SqlValue::Text("%100\\%%".into())]);
    }

    #[test]
    fn test_symmetric_function_wraps_both_sides() {
        let leaf = ConditionLeaf::new("name", "lower", "Fluttershy");
        let mut params = SqlParams::new();
        let sql = ConditionCompiler::new()
            .compile(&leaf.into(), &mut params)
            .unwrap();
        assert_eq!(sql, "lower(name) = lower($1)");
        assert_eq!(params.values(), &[SqlValue::Text("Fluttershy".into())]);
    }

    #[test]
    fn test_column_side_function_leaves_parameter_bare() {
        let leaf = ConditionLeaf::new("description", "length", 80i64);
        let mut params = SqlParams::new();
        let sql = ConditionCompiler::new()
            .compile(&leaf.into(), &mut params)
            .unwrap();
        assert_eq!(sql, "length(description) = $1");
    }

    #[test]
    fn test_leaf_overrides_beat_resolution() {
        let mut leaf = ConditionLeaf::new("score", "length", 10i64);
        leaf.operator_override = Some(">=".to_string());
        leaf.function = Some("abs".to_string());
        let mut params = SqlParams::new();
        let sql = ConditionCompiler::new()
            .compile(&leaf.into(), &mut params)
            .unwrap();
        assert_eq!(sql, "abs(length(score)) >= $1");
    }

    #[test]
    fn test_value_type_coerces_before_binding() {
        let mut leaf = ConditionLeaf::new("width", ">=", "1024");
        leaf.value_type = Some(ValueKind::Integer);
        let mut params = SqlParams::new();
        ConditionCompiler::new().compile(&leaf.into(), &mut params).unwrap();
        assert_eq!(params.values(), &[SqlValue::Integer(1024)]);
    }

    #[test]
    fn test_failed_coercion_is_a_structural_error() {
        let mut leaf = ConditionLeaf::new("width", ">=", "wide");
        leaf.value_type = Some(ValueKind::Integer);
        let mut params = SqlParams::new();
        let err = ConditionCompiler::new()
            .compile(&leaf.into(), &mut params)
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::unsupported_value("width", "cannot coerce to integer")
        );
    }

    #[test]
    fn test_missing_column_is_rejected_before_sql() {
        let leaf = ConditionLeaf::new("  ", "=", 1i64);
        let mut params = SqlParams::new();
        let err = ConditionCompiler::new()
            .compile(&leaf.into(), &mut params)
            .unwrap_err();
        assert_eq!(err, QueryError::MissingColumn);
    }

    #[test]
    fn test_flat_map_compiles_as_implicit_and_in_key_order() {
        let condition: Condition = serde_json::from_str(
            r#"{
                "status": {"value": "active"},
                "score": {"operator": ">=", "value": 10}
            }"#,
        )
        .unwrap();
        let mut params = SqlParams::new();
        let sql = ConditionCompiler::new().compile(&condition, &mut params).unwrap();

        assert_eq!(sql, "(status = $1) AND (score >= $2)");
        assert_eq!(
            params.values(),
            &[SqlValue::Text("active".into()), SqlValue::Integer(10)]
        );
    }

    #[test]
    fn test_flat_body_may_override_the_column() {
        let condition: Condition = serde_json::from_str(
            r#"{"display_name": {"column": "lower(name)", "value": "luna"}}"#,
        )
        .unwrap();
        let mut params = SqlParams::new();
        let sql = ConditionCompiler::new().compile(&condition, &mut params).unwrap();
        assert_eq!(sql, "(lower(name) = $1)");
    }

    #[test]
    fn test_flat_entry_with_scalar_body_is_malformed() {
        let condition: Condition =
            serde_json::from_str(r#"{"status": "active"}"#).unwrap();
        let mut params = SqlParams::new();
        let err = ConditionCompiler::new()
            .compile(&condition, &mut params)
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::malformed_leaf("status", "expected an object body")
        );
    }

    #[test]
    fn test_flat_entry_with_array_value_is_unsupported() {
        let condition: Condition =
            serde_json::from_str(r#"{"tags": {"value": ["a", "b"]}}"#).unwrap();
        let mut params = SqlParams::new();
        let err = ConditionCompiler::new()
            .compile(&condition, &mut params)
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::unsupported_value("tags", "arrays and objects cannot be bound")
        );
    }

    #[test]
    fn test_untagged_json_distinguishes_group_leaf_flat() {
        let group: Condition = serde_json::from_str(
            r#"{"op": "or", "children": [{"column": "a", "value": 1}]}"#,
        )
        .unwrap();
        assert!(matches!(group, Condition::Group(_)));

        let leaf: Condition =
            serde_json::from_str(r#"{"column": "a", "value": 1}"#).unwrap();
        assert!(matches!(leaf, Condition::Leaf(_)));

        let flat: Condition = serde_json::from_str(r#"{"a": {"value": 1}}"#).unwrap();
        assert!(matches!(flat, Condition::Flat(_)));
    }

    #[test]
    fn test_unrecognized_joiner_defaults_to_and() {
        let group: Condition = serde_json::from_str(
            r#"{"op": "NAND", "children": [{"column": "a", "value": 1}, {"column": "b", "value": 2}]}"#,
        )
        .unwrap();
        let mut params = SqlParams::new();
        let sql = ConditionCompiler::new().compile(&group, &mut params).unwrap();
        assert_eq!(sql, "(a = $1) AND (b = $2)");
    }

    #[test]
    fn test_parse_conditions_guards_size_and_count() {
        let ok = parse_conditions(r#"[{"column": "a", "value": 1}]"#).unwrap();
        assert_eq!(ok.len(), 1);

        assert!(parse_conditions("not json").is_err());

        let many: Vec<String> = (0..51)
            .map(|i| format!(r#"{{"column": "c{}", "value": {}}}"#, i, i))
            .collect();
        let err = parse_conditions(&format!("[{}]", many.join(","))).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilterInput(_)));
    }

    #[test]
    fn test_placeholder_count_matches_bound_values() {
        let condition = Condition::all(vec![
            ConditionLeaf::equals("a", 1i64).into(),
            ConditionLeaf::new("b", "like", "x").into(),
            Condition::any(vec![
                ConditionLeaf::equals("c", 3i64).into(),
                ConditionLeaf::equals("d", 4i64).into(),
            ]),
        ]);
        let mut params = SqlParams::new();
        let sql = ConditionCompiler::new().compile(&condition, &mut params).unwrap();
        let placeholders = sql.matches('$').count();
        assert_eq!(placeholders, params.len());
    }
}
