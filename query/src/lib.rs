//! # tagsieve
//!
//! **Filter and tag-query compiler** — turns untrusted filter input into
//! parameterized SQL WHERE fragments.
//!
//! Two front ends share one placeholder cache:
//! - `condition` - boolean condition trees with pluggable operators
//! - `tags` - the free-text tag query language (negation, wildcards,
//!   OR-groups, symbolic modifiers, colon specials)
//!
//! plus the pieces they stand on:
//! - `params` - the shared placeholder cache (`$1`, `$2`, ...)
//! - `operators` - write-once operator and transform registry
//! - `dialect` - array-column access per database backend
//! - `value` - bound-value representation and coercion
//! - `sql` - literal and LIKE-pattern escaping
//! - `ranking` - weighted CASE scoring for ORDER BY
//! - `error` - unified error type
//!
//! Compiled fragments embed in a caller-assembled WHERE clause; the caller
//! forwards the text plus the cache's values to whatever executes the query.
//! Values never appear in SQL text. Column and table identifiers are
//! caller-trusted and pass through unvalidated.
//!
//! ## Quick Start
//!
//! ```
//! use tagsieve::condition::{Condition, ConditionCompiler, ConditionLeaf};
//! use tagsieve::dialect::SqliteDialect;
//! use tagsieve::params::SqlParams;
//! use tagsieve::tags::{TagCompiler, TagQueryParser};
//!
//! # fn main() -> Result<(), tagsieve::QueryError> {
//! let parser = TagQueryParser::new("tags");
//! let conditions = ConditionCompiler::new();
//! let tags = TagCompiler::new();
//!
//! let mut params = SqlParams::new();
//! let status = conditions.compile(
//!     &Condition::Leaf(ConditionLeaf::equals("status", "active")),
//!     &mut params,
//! )?;
//! let matched = tags.compile(
//!     &parser.parse("rarity AND !hat")?.filter(false),
//!     &SqliteDialect,
//!     &mut params,
//! );
//!
//! let clause = format!("WHERE {} AND {}", status, matched);
//! assert!(clause.contains("status = $1"));
//! assert_eq!(params.len(), 3);
//! # Ok(())
//! # }
//! ```

pub mod condition;
pub mod dialect;
pub mod error;
pub mod operators;
pub mod params;
pub mod ranking;
pub mod sql;
pub mod tags;
pub mod value;

// Re-export the compile surface
pub use condition::{Condition, ConditionCompiler, ConditionLeaf, parse_conditions};
pub use error::QueryError;
pub use params::SqlParams;
pub use tags::{TagCompiler, TagFilter, TagQueryParser};

// Re-export supporting types callers hold directly
pub use dialect::{PostgresDialect, SqlDialect, SqliteDialect};
pub use operators::OperatorRegistry;
pub use ranking::{RankingRule, compile_ranking};
pub use value::{SqlValue, ValueKind};
