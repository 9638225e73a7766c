//! Glob-style key patterns
//!
//! Patterns use the same syntax as Redis `SCAN MATCH`:
//! - `*` matches any run of characters (including none)
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]`, `[^a]` match one character from a class
//! - `\x` matches `x` literally
//!
//! A pattern is validated before anything touches the backing store, so a
//! malformed one never costs a keyspace scan.

use regex::Regex;
use std::fmt;

use crate::error::{CacheError, Result};

/// Pattern matching every key
pub const UNIVERSAL_PATTERN: &str = "*";

/// Validated glob pattern with a compiled matcher
#[derive(Debug, Clone)]
pub struct KeyPattern {
    raw: String,
    matcher: Regex,
}

impl KeyPattern {
    /// Parse and compile a glob pattern
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidPattern` for an empty pattern, an unclosed
    /// `[` class, an empty class, or a trailing `\`.
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| CacheError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if pattern.is_empty() {
            return Err(invalid("pattern is empty"));
        }

        // `s`: wildcards match newlines, as `SCAN MATCH` does
        let mut re = String::with_capacity(pattern.len() * 2 + 6);
        re.push_str("(?s)^");

        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' => re.push_str(".*"),
                '?' => re.push('.'),
                '\\' => match chars.next() {
                    Some(escaped) => re.push_str(&regex::escape(&escaped.to_string())),
                    None => return Err(invalid("trailing escape character")),
                },
                '[' => {
                    let negated = chars.next_if_eq(&'^').is_some();
                    // (char, escaped); an escaped `-` never forms a range
                    let mut members: Vec<(char, bool)> = Vec::new();
                    let mut closed = false;
                    while let Some(m) = chars.next() {
                        match m {
                            ']' => {
                                closed = true;
                                break;
                            }
                            '\\' => match chars.next() {
                                Some(escaped) => members.push((escaped, true)),
                                None => return Err(invalid("trailing escape character")),
                            },
                            other => members.push((other, false)),
                        }
                    }
                    if !closed {
                        return Err(invalid("unclosed character class"));
                    }
                    if members.is_empty() {
                        return Err(invalid("empty character class"));
                    }
                    re.push_str(&compile_class(&members, negated));
                }
                other => re.push_str(&regex::escape(&other.to_string())),
            }
        }
        re.push('$');

        let matcher = Regex::new(&re).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            raw: pattern.to_string(),
            matcher,
        })
    }

    /// Pattern matching every key
    pub fn universal() -> Self {
        Self {
            raw: UNIVERSAL_PATTERN.to_string(),
            matcher: Regex::new("(?s)^.*$").unwrap_or_else(|_| unreachable!()),
        }
    }

    /// Original glob text, suitable for passing to a backend scan
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this pattern matches every key
    pub fn is_universal(&self) -> bool {
        !self.raw.is_empty() && self.raw.chars().all(|c| c == '*')
    }

    /// Test a key against the pattern
    pub fn matches(&self, key: &str) -> bool {
        self.matcher.is_match(key)
    }
}

/// Regex class from glob class members; reversed ranges like `z-a` are swapped
fn compile_class(members: &[(char, bool)], negated: bool) -> String {
    let mut class = String::from(if negated { "[^" } else { "[" });
    let mut i = 0;
    while let Some(&(start, _)) = members.get(i) {
        match (members.get(i + 1), members.get(i + 2)) {
            (Some(&('-', false)), Some(&(end, _))) => {
                let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
                class.push_str(&regex::escape(&lo.to_string()));
                class.push('-');
                class.push_str(&regex::escape(&hi.to_string()));
                i += 3;
            }
            _ => {
                class.push_str(&regex::escape(&start.to_string()));
                i += 1;
            }
        }
    }
    class.push(']');
    class
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
