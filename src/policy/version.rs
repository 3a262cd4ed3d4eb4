//! Version ordering and generation
//!
//! Versions are free-form strings. Ordering follows dotted-numeric release
//! conventions and falls back to text comparison for non-numeric parts.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

static GENERATED_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0\.0\.1\.[0-9]{14}$").expect("generated version regex is valid"));

static DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").expect("digit run regex is valid"));

/// A run inside one dot-separated segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// Digits with leading zeros stripped
    Number(&'a str),
    Text(&'a str),
}

impl Ord for Token<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Token::Number(a), Token::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Token::Text(a), Token::Text(b)) => a.cmp(b),
            (Token::Text(_), Token::Number(_)) => Ordering::Less,
            (Token::Number(_), Token::Text(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Token<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn tokenize(segment: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = segment;
    while let Some(first) = rest.chars().next() {
        let numeric = first.is_ascii_digit();
        let len = rest
            .find(|c: char| c.is_ascii_digit() != numeric)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(len);
        tokens.push(if numeric {
            Token::Number(run.trim_start_matches('0'))
        } else {
            Token::Text(run)
        });
        rest = tail;
    }
    tokens
}

/// Compare two version strings.
///
/// Missing segments count as `"0"`, so `"1"` and `"1.0"` are equal.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.split('.').collect();
    let right: Vec<&str> = b.split('.').collect();
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = tokenize(left.get(i).copied().unwrap_or("0"));
        let r = tokenize(right.get(i).copied().unwrap_or("0"));
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Whether `candidate` is strictly newer than `previous`
pub fn is_newer(candidate: &str, previous: &str) -> bool {
    compare_versions(candidate, previous) == Ordering::Greater
}

/// Compute the version that follows `version`.
///
/// Short versions get a dedicated build segment (`"1"` -> `"1.0.0.1"`);
/// versions with four or more segments bump the last digit run of their last
/// segment (`"1.1.1.1b1a"` -> `"1.1.1.1b2a"`).
pub fn next_version(version: &str) -> String {
    let mut segments: Vec<String> = version.split('.').map(str::to_string).collect();
    if segments.len() < 4 {
        while segments.len() < 3 {
            segments.push("0".to_string());
        }
        segments.push("1".to_string());
        return segments.join(".");
    }

    if let Some(last) = segments.last_mut() {
        *last = bump_last_digit_run(last);
    }
    segments.join(".")
}

fn bump_last_digit_run(segment: &str) -> String {
    match DIGIT_RUN.find_iter(segment).last() {
        Some(run) => format!(
            "{}{}{}",
            &segment[..run.start()],
            increment_decimal(run.as_str()),
            &segment[run.end()..]
        ),
        None => format!("{}1", segment),
    }
}

/// Add one to an ASCII decimal string of any length
fn increment_decimal(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    for byte in bytes.iter_mut().rev() {
        if *byte == b'9' {
            *byte = b'0';
        } else {
            *byte += 1;
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    format!("1{}", String::from_utf8_lossy(&bytes))
}

/// Fallback version for scripts that declare none: `0.0.1.YYYYMMDDHHMMSS`
pub fn generated_version(at: DateTime<Utc>) -> String {
    format!("0.0.1.{}", at.format("%Y%m%d%H%M%S"))
}

/// Whether `version` has the shape produced by [`generated_version`]
pub fn is_generated_version(version: &str) -> bool {
    GENERATED_VERSION.is_match(version)
}
