//! Ranking compiler
//!
//! Turns weighted match rules into a scored `CASE` expression for ORDER BY.
//! Values are escaped directly into the SQL text, never parameterized: this
//! path is for static, operator-authored ranking configuration. Do not route
//! end-user input through it.

use serde::{Deserialize, Serialize};

use crate::value::SqlValue;

/// One weighted match rule. Multiple columns OR-join; multiple values
/// compare with `IN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRule {
    pub columns: Vec<String>,
    pub values: Vec<SqlValue>,
    pub weight: f64,
}

impl RankingRule {
    /// Single-column equality rule.
    pub fn equals(column: impl Into<String>, value: impl Into<SqlValue>, weight: f64) -> Self {
        Self {
            columns: vec![column.into()],
            values: vec![value.into()],
            weight,
        }
    }
}

/// Compile rules into `CASE WHEN ... THEN <weight> ... ELSE 0 END AS <alias>`.
///
/// Rules apply in order, so earlier rules win when several match. Rules with
/// no columns or no values contribute nothing; with no usable rules at all
/// the expression degenerates to a constant `0 AS <alias>`.
pub fn compile_ranking(rules: &[RankingRule], alias: &str) -> String {
    let clauses: Vec<String> = rules
        .iter()
        .filter_map(|rule| {
            rule_condition(rule).map(|cond| format!("WHEN {} THEN {}", cond, rule.weight))
        })
        .collect();

    if clauses.is_empty() {
        return format!("0 AS {}", alias);
    }
    format!("CASE {} ELSE 0 END AS {}", clauses.join(" "), alias)
}

fn rule_condition(rule: &RankingRule) -> Option<String> {
    if rule.columns.is_empty() || rule.values.is_empty() {
        return None;
    }

    let comparisons: Vec<String> = rule
        .columns
        .iter()
        .map(|column| {
            if rule.values.len() == 1 {
                format!("{} = {}", column, rule.values[0].as_literal())
            } else {
                let list: Vec<String> =
                    rule.values.iter().map(|v| v.as_literal()).collect();
                format!("{} IN ({})", column, list.join(", "))
            }
        })
        .collect();

    let joined = comparisons.join(" OR ");
    if comparisons.len() > 1 {
        Some(format!("({})", joined))
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_rule_scores_one_match() {
        let rules = vec![RankingRule::equals("name", "luna", 10.0)];
        assert_eq!(
            compile_ranking(&rules, "rank"),
            "CASE WHEN name = 'luna' THEN 10 ELSE 0 END AS rank"
        );
    }

    #[test]
    fn test_rules_apply_in_order() {
        let rules = vec![
            RankingRule::equals("name", "luna", 10.0),
            RankingRule::equals("kind", "pony", 2.0),
        ];
        assert_eq!(
            compile_ranking(&rules, "score"),
            "CASE WHEN name = 'luna' THEN 10 WHEN kind = 'pony' THEN 2 \
             ELSE 0 END AS score"
        );
    }

    #[test]
    fn test_multiple_values_compare_with_in() {
        let rules = vec![RankingRule {
            columns: vec!["kind".to_string()],
            values: vec!["pony".into(), "dragon".into()],
            weight: 3.0,
        }];
        assert_eq!(
            compile_ranking(&rules, "rank"),
            "CASE WHEN kind IN ('pony', 'dragon') THEN 3 ELSE 0 END AS rank"
        );
    }

    #[test]
    fn test_multiple_columns_or_join_inside_parens() {
        let rules = vec![RankingRule {
            columns: vec!["name".to_string(), "title".to_string()],
            values: vec!["luna".into()],
            weight: 5.0,
        }];
        assert_eq!(
            compile_ranking(&rules, "rank"),
            "CASE WHEN (name = 'luna' OR title = 'luna') THEN 5 ELSE 0 END AS rank"
        );
    }

    #[test]
    fn test_literal_quotes_are_doubled() {
        let rules = vec![RankingRule::equals("name", "it's", 1.0)];
        assert_eq!(
            compile_ranking(&rules, "rank"),
            "CASE WHEN name = 'it''s' THEN 1 ELSE 0 END AS rank"
        );
    }

    #[test]
    fn test_numeric_values_render_bare() {
        let rules = vec![RankingRule::equals("score", 9000i64, 1.5)];
        assert_eq!(
            compile_ranking(&rules, "rank"),
            "CASE WHEN score = 9000 THEN 1.5 ELSE 0 END AS rank"
        );
    }

    #[test]
    fn test_empty_rules_degenerate_to_a_constant() {
        assert_eq!(compile_ranking(&[], "rank"), "0 AS rank");
    }

    #[test]
    fn test_rules_without_values_are_skipped() {
        let rules = vec![
            RankingRule {
                columns: vec!["name".to_string()],
                values: vec![],
                weight: 4.0,
            },
            RankingRule::equals("name", "luna", 2.0),
        ];
        assert_eq!(
            compile_ranking(&rules, "rank"),
            "CASE WHEN name = 'luna' THEN 2 ELSE 0 END AS rank"
        );
    }
}
