//! SQL text helpers shared by the compilers

/// ESCAPE clause appended to every generated `LIKE` comparison.
///
/// SQLite has no default escape character for `LIKE`, so escaped patterns are
/// silently wrong without it; PostgreSQL accepts it as a no-op restatement of
/// its default.
pub const LIKE_ESCAPE: &str = r"ESCAPE '\'";

/// Escape SQL LIKE metacharacters (%, _, \) in user input
///
/// Use this when building LIKE patterns from user input to prevent
/// unintended pattern matching.
///
/// # Example
///
/// ```
/// use tagsieve::sql::escape_like_pattern;
///
/// let user_input = "100% match_test";
/// let pattern = format!("%{}%", escape_like_pattern(user_input));
/// assert_eq!(pattern, "%100\\% match\\_test%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Render a string as a single-quoted SQL literal, doubling embedded quotes.
///
/// Only the ranking compiler uses this: ranking rules are operator-authored
/// configuration, not end-user input. Everything user-supplied goes through
/// placeholders instead.
///
/// # Example
///
/// ```
/// use tagsieve::sql::quote_literal;
///
/// assert_eq!(quote_literal("it's"), "'it''s'");
/// ```
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
