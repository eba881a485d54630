//! Placeholder cache shared across compiles
//!
//! One [`SqlParams`] lives for one outer query build. Every compiler that
//! contributes a fragment binds its values through the same instance, so
//! placeholder numbering stays contiguous across independently produced
//! fragments. The value at position `k` (1-based) always binds `$k`.

use serde::Serialize;

use crate::value::SqlValue;

/// Collects bound values during query building and hands out `$N` placeholders.
///
/// Mutated in place by every compile that touches it. After a compile returns
/// an error the cache contents are unspecified; discard it and rebuild rather
/// than reusing it for another attempt.
#[derive(Debug, Clone, Serialize)]
pub struct SqlParams {
    next: usize,
    values: Vec<SqlValue>,
}

impl SqlParams {
    /// A fresh cache numbering from `$1`.
    pub fn new() -> Self {
        Self {
            next: 1,
            values: Vec::new(),
        }
    }

    /// A cache numbering from `$index`, for composing after placeholders that
    /// already exist in the outer statement.
    ///
    /// The caller still supplies the earlier values itself when executing;
    /// `values()` here only holds what was bound through this cache.
    pub fn starting_at(index: usize) -> Self {
        // Numbering is 1-based; clamp rather than emit an invalid $0.
        Self {
            next: index.max(1),
            values: Vec::new(),
        }
    }

    /// Append a value and return the placeholder text that binds it.
    pub fn bind(&mut self, value: impl Into<SqlValue>) -> String {
        let placeholder = format!("${}", self.next);
        self.next += 1;
        self.values.push(value.into());
        placeholder
    }

    /// Index the next `bind` call will use.
    pub fn next_index(&self) -> usize {
        self.next
    }

    /// Values bound so far, in placeholder order.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Number of values bound so far.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing has been bound yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the cache, yielding the ordered value list for execution.
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

impl Default for SqlParams {
    fn default() -> Self {
        Self::new()
    }
}
