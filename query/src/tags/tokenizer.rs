//! Tag expression tokenizer
//!
//! One left-to-right pass over trimmed, whitespace-collapsed input. Spaces
//! are ordinary characters (tags may contain them); the only separators are
//! the ` AND` keyword, the `OR ` keyword, and parentheses. Quoted runs copy
//! verbatim with no keyword recognition inside. `(` opens an OR-group and a
//! closing `)` flushes it as one chunk; a singleton group collapses to a bare
//! term and an empty group is dropped. ` AND` is a hard separator: it ends
//! the current chunk, closing any open group. `OR ` only flushes the term
//! buffer, so OR semantics materialize only inside parentheses.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::TagChunk;
use crate::error::QueryError;

/// Default parse-term limit, matching the ingest guard on filter JSON.
pub const DEFAULT_MAX_TERMS: usize = 50;

const AND_KEYWORD: [char; 4] = [' ', 'A', 'N', 'D'];
const OR_KEYWORD: [char; 3] = ['O', 'R', ' '];

/// Independently toggleable grammar checks. All off by default; [`all`]
/// enables every check.
///
/// [`all`]: Self::all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrictMode {
    /// Reject input that is empty after trimming.
    pub reject_empty: bool,
    /// Reject input whose flushed term count exceeds the limit.
    pub enforce_term_limit: bool,
    /// Reject a stray `)` or an unclosed `(`.
    pub balanced_parens: bool,
    /// Reject a quote with no matching close.
    pub terminated_quotes: bool,
}

impl StrictMode {
    pub fn all() -> Self {
        Self {
            reject_empty: true,
            enforce_term_limit: true,
            balanced_parens: true,
            terminated_quotes: true,
        }
    }

    pub fn off() -> Self {
        Self::default()
    }
}

/// Tokenizer configuration.
///
/// Deserializes leniently: absent fields take the documented defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerOptions {
    /// Term limit checked when `strict.enforce_term_limit` is set.
    pub max_terms: usize,
    /// Drop a bare term repeating an already-accepted bare term. OR-group
    /// members are exempt but still count toward the term limit.
    pub dedupe: bool,
    pub strict: StrictMode,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            max_terms: DEFAULT_MAX_TERMS,
            dedupe: true,
            strict: StrictMode::default(),
        }
    }
}

impl TokenizerOptions {
    /// Options with every strict check enabled.
    pub fn strict() -> Self {
        Self {
            strict: StrictMode::all(),
            ..Self::default()
        }
    }
}

fn collapse_whitespace(input: &str) -> String {
    static WHITESPACE: OnceLock<regex::Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| regex::Regex::new(r"\s+").expect("Invalid regex"));
    re.replace_all(input.trim(), " ").into_owned()
}

fn matches_at(chars: &[char], i: usize, keyword: &[char]) -> bool {
    chars.len() >= i + keyword.len() && chars[i..i + keyword.len()] == *keyword
}

fn find_closing_quote(chars: &[char], open: usize) -> Option<usize> {
    let quote = chars[open];
    (open + 1..chars.len()).find(|&j| chars[j] == quote)
}

/// Tokenize one tag expression into ordered chunks.
pub fn tokenize(input: &str, options: &TokenizerOptions) -> Result<Vec<TagChunk>, QueryError> {
    let collapsed = collapse_whitespace(input);
    if collapsed.is_empty() {
        if options.strict.reject_empty {
            return Err(QueryError::EmptyQuery);
        }
        return Ok(Vec::new());
    }

    let chars: Vec<char> = collapsed.chars().collect();
    let mut scanner = Scanner::new(options);
    scanner.run(&chars)?;
    Ok(scanner.chunks)
}

struct Scanner<'a> {
    options: &'a TokenizerOptions,
    chunks: Vec<TagChunk>,
    group: Option<Vec<String>>,
    buffer: String,
    seen: FxHashSet<String>,
    term_count: usize,
}

impl<'a> Scanner<'a> {
    fn new(options: &'a TokenizerOptions) -> Self {
        Self {
            options,
            chunks: Vec::new(),
            group: None,
            buffer: String::new(),
            seen: FxHashSet::default(),
            term_count: 0,
        }
    }

    fn run(&mut self, chars: &[char]) -> Result<(), QueryError> {
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '\'' || c == '"' {
                match find_closing_quote(chars, i) {
                    Some(close) => {
                        self.buffer.extend(&chars[i + 1..close]);
                        i = close + 1;
                    }
                    None => {
                        if self.options.strict.terminated_quotes {
                            return Err(QueryError::UnterminatedQuote);
                        }
                        self.buffer.extend(&chars[i + 1..]);
                        i = chars.len();
                    }
                }
            } else if c == '(' && self.group.is_none() {
                self.flush_term()?;
                self.group = Some(Vec::new());
                i += 1;
            } else if c == ')' {
                if self.group.is_some() {
                    self.flush_term()?;
                    self.close_group();
                } else if self.options.strict.balanced_parens {
                    return Err(QueryError::UnbalancedParens);
                }
                i += 1;
            } else if matches_at(chars, i, &AND_KEYWORD) {
                // Hard separator: ends the chunk, closing any open group.
                self.flush_term()?;
                self.close_group();
                i += AND_KEYWORD.len();
            } else if matches_at(chars, i, &OR_KEYWORD) {
                self.flush_term()?;
                i += OR_KEYWORD.len();
            } else {
                self.buffer.push(c);
                i += 1;
            }
        }

        self.flush_term()?;
        if self.group.is_some() {
            if self.options.strict.balanced_parens {
                return Err(QueryError::UnbalancedParens);
            }
            self.close_group();
        }
        Ok(())
    }

    /// Trim and move the term buffer into the open group or the chunk list.
    /// Empty buffers flush to nothing.
    fn flush_term(&mut self) -> Result<(), QueryError> {
        let term = self.buffer.trim().to_string();
        self.buffer.clear();
        if term.is_empty() {
            return Ok(());
        }

        self.term_count += 1;
        if self.options.strict.enforce_term_limit && self.term_count > self.options.max_terms {
            return Err(QueryError::TermLimitExceeded {
                limit: self.options.max_terms,
            });
        }

        match &mut self.group {
            Some(terms) => terms.push(term),
            None => {
                if self.options.dedupe && !self.seen.insert(term.clone()) {
                    return Ok(());
                }
                self.chunks.push(TagChunk::Term(term));
            }
        }
        Ok(())
    }

    fn close_group(&mut self) {
        if let Some(mut terms) = self.group.take() {
            if terms.len() == 1 {
                if let Some(term) = terms.pop() {
                    self.chunks.push(TagChunk::Term(term));
                }
            } else if !terms.is_empty() {
                self.chunks.push(TagChunk::AnyOf(terms));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(input: &str) -> Vec<TagChunk> {
        tokenize(input, &TokenizerOptions::default()).unwrap()
    }

    #[test]
    fn test_and_separates_bare_terms() {
        assert_eq!(
            terms("a AND b"),
            vec![TagChunk::Term("a".into()), TagChunk::Term("b".into())]
        );
    }

    #[test]
    fn test_spaces_stay_inside_tags() {
        assert_eq!(
            terms("rainbow dash AND pinkie pie"),
            vec![
                TagChunk::Term("rainbow dash".into()),
                TagChunk::Term("pinkie pie".into())
            ]
        );
    }

    #[test]
    fn test_whitespace_collapses_before_scanning() {
        assert_eq!(
            terms("  a \t AND \n  b  "),
            vec![TagChunk::Term("a".into()), TagChunk::Term("b".into())]
        );
    }

    #[test]
    fn test_parens_build_an_or_group() {
        assert_eq!(
            terms("(a OR b)"),
            vec![TagChunk::AnyOf(vec!["a".into(), "b".into()])]
        );
    }

    #[test]
    fn test_group_then_bare_term() {
        assert_eq!(
            terms("(a OR b) AND c"),
            vec![
                TagChunk::AnyOf(vec!["a".into(), "b".into()]),
                TagChunk::Term("c".into())
            ]
        );
    }

    #[test]
    fn test_and_inside_parens_closes_the_group() {
        assert_eq!(
            terms("(a OR b AND c)"),
            vec![
                TagChunk::AnyOf(vec!["a".into(), "b".into()]),
                TagChunk::Term("c".into())
            ]
        );
    }

    #[test]
    fn test_or_outside_parens_separates_bare_terms() {
        assert_eq!(
            terms("a OR b"),
            vec![TagChunk::Term("a".into()), TagChunk::Term("b".into())]
        );
    }

    #[test]
    fn test_singleton_group_collapses_to_a_term() {
        assert_eq!(terms("(a)"), vec![TagChunk::Term("a".into())]);
    }

    #[test]
    fn test_empty_group_is_dropped() {
        assert_eq!(terms("() AND a"), vec![TagChunk::Term("a".into())]);
    }

    #[test]
    fn test_quotes_suppress_keyword_recognition() {
        assert_eq!(
            terms("'a AND b'"),
            vec![TagChunk::Term("a AND b".into())]
        );
        assert_eq!(
            terms("\"(a OR b)\""),
            vec![TagChunk::Term("(a OR b)".into())]
        );
    }

    #[test]
    fn test_mixed_quote_styles_nest_verbatim() {
        assert_eq!(
            terms("'he said \"hi\"'"),
            vec![TagChunk::Term("he said \"hi\"".into())]
        );
    }

    #[test]
    fn test_dedupe_drops_repeated_bare_terms() {
        assert_eq!(
            terms("a AND b AND a"),
            vec![TagChunk::Term("a".into()), TagChunk::Term("b".into())]
        );
    }

    #[test]
    fn test_dedupe_exempts_group_members() {
        assert_eq!(
            terms("a AND (a OR b)"),
            vec![
                TagChunk::Term("a".into()),
                TagChunk::AnyOf(vec!["a".into(), "b".into()])
            ]
        );
    }

    #[test]
    fn test_dedupe_can_be_disabled() {
        let options = TokenizerOptions {
            dedupe: false,
            ..TokenizerOptions::default()
        };
        assert_eq!(
            tokenize("a AND a", &options).unwrap(),
            vec![TagChunk::Term("a".into()), TagChunk::Term("a".into())]
        );
    }

    #[test]
    fn test_empty_input_is_permissive_by_default() {
        assert_eq!(terms(""), Vec::<TagChunk>::new());
        assert_eq!(terms("   "), Vec::<TagChunk>::new());
    }

    #[test]
    fn test_strict_rejects_empty_input() {
        let err = tokenize("   ", &TokenizerOptions::strict()).unwrap_err();
        assert_eq!(err, QueryError::EmptyQuery);
    }

    #[test]
    fn test_strict_rejects_unclosed_group() {
        let err = tokenize("(a OR b", &TokenizerOptions::strict()).unwrap_err();
        assert_eq!(err, QueryError::UnbalancedParens);
    }

    #[test]
    fn test_permissive_closes_an_open_group_at_end() {
        assert_eq!(
            terms("(a OR b"),
            vec![TagChunk::AnyOf(vec!["a".into(), "b".into()])]
        );
    }

    #[test]
    fn test_strict_rejects_stray_closing_paren() {
        let err = tokenize("a) AND b", &TokenizerOptions::strict()).unwrap_err();
        assert_eq!(err, QueryError::UnbalancedParens);
    }

    #[test]
    fn test_permissive_skips_stray_closing_paren() {
        assert_eq!(
            terms("a) AND b"),
            vec![TagChunk::Term("a".into()), TagChunk::Term("b".into())]
        );
    }

    #[test]
    fn test_strict_rejects_unterminated_quote() {
        let err = tokenize("'abc", &TokenizerOptions::strict()).unwrap_err();
        assert_eq!(err, QueryError::UnterminatedQuote);
    }

    #[test]
    fn test_permissive_takes_unterminated_quote_to_end() {
        assert_eq!(terms("'a AND b"), vec![TagChunk::Term("a AND b".into())]);
    }

    #[test]
    fn test_strict_enforces_the_term_limit() {
        let options = TokenizerOptions {
            max_terms: 2,
            strict: StrictMode::all(),
            ..TokenizerOptions::default()
        };
        let err = tokenize("a AND b AND c", &options).unwrap_err();
        assert_eq!(err, QueryError::TermLimitExceeded { limit: 2 });
    }

    #[test]
    fn test_group_members_count_toward_the_limit() {
        let options = TokenizerOptions {
            max_terms: 2,
            strict: StrictMode::all(),
            ..TokenizerOptions::default()
        };
        let err = tokenize("(a OR b OR c)", &options).unwrap_err();
        assert_eq!(err, QueryError::TermLimitExceeded { limit: 2 });
    }

    #[test]
    fn test_term_limit_is_ignored_when_not_strict() {
        let options = TokenizerOptions {
            max_terms: 1,
            ..TokenizerOptions::default()
        };
        assert_eq!(tokenize("a AND b AND c", &options).unwrap().len(), 3);
    }

    #[test]
    fn test_paren_inside_open_group_is_ordinary() {
        assert_eq!(
            terms("(a (b OR c)"),
            vec![TagChunk::AnyOf(vec!["a (b".into(), "c".into()])]
        );
    }

    #[test]
    fn test_negation_marker_passes_through() {
        assert_eq!(
            terms("!hat AND safe"),
            vec![TagChunk::Term("!hat".into()), TagChunk::Term("safe".into())]
        );
    }

    #[test]
    fn test_options_deserialize_with_documented_defaults() {
        let options: TokenizerOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, TokenizerOptions::default());
        assert!(options.dedupe);

        let options: TokenizerOptions =
            serde_json::from_str(r#"{"max_terms": 3, "strict": {"enforce_term_limit": true}}"#)
                .unwrap();
        assert_eq!(options.max_terms, 3);
        assert!(options.dedupe);
        assert!(options.strict.enforce_term_limit);
        assert!(!options.strict.balanced_parens);
    }
}
