//! Shell-style wildcard matching for the cluster name filter.
//!
//! Supports `*`, `?` and bracket classes (`[abc]`, `[a-z]`, `[!0-9]`). Matching is
//! case-sensitive and anchored at both ends.

use regex::Regex;

#[derive(Debug, Clone)]
pub struct NamePattern {
    pattern: String,
    /// `None` when the pattern does not translate; it then only matches itself
    regex: Option<Regex>,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            regex: Regex::new(&translate(pattern)).ok(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(name),
            None => self.pattern == name,
        }
    }
}

/// Translate a wildcard pattern into an anchored regex
fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("(?s)^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push_str(&translate_class(&chars[i + 1..end]));
                    i = end;
                }
                None => out.push_str("\\["),
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out.push('$');
    out
}

/// Translate a bracket class body. Only `!` negates and only `-` forms ranges;
/// every other character, `^` and `&` included, is literal.
fn translate_class(body: &[char]) -> String {
    let (negated, body) = match body.split_first() {
        Some(('!', rest)) => (true, rest),
        _ => (false, body),
    };

    let mut items = String::new();
    let mut k = 0;
    while k < body.len() {
        if k + 2 < body.len() && body[k + 1] == '-' {
            let (low, high) = (body[k], body[k + 2]);
            // Reversed ranges match nothing
            if low <= high {
                items.push_str(&regex::escape(&low.to_string()));
                items.push('-');
                items.push_str(&regex::escape(&high.to_string()));
            }
            k += 3;
        } else {
            items.push_str(&regex::escape(&body[k].to_string()));
            k += 1;
        }
    }

    match (negated, items.is_empty()) {
        (false, true) => "[^\\s\\S]".to_string(),
        (true, true) => ".".to_string(),
        (false, false) => format!("[{}]", items),
        (true, false) => format!("[^{}]", items),
    }
}

/// Index of the `]` closing the class opened at `start`; a `]` right after `[` or `[!` is literal
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() {
        if chars[j] == ']' {
            return Some(j);
        }
        j += 1;
    }
    None
}
