//! Catalog sign entries and sign-name grammar.
//!
//! # Responsibility
//! - Define the catalog row model.
//! - Parse user-typed sign names (`|M157+M288|`, `3(N14)`, `M004~b`).
//! - Canonicalize free-text sign references (`M56` -> `M056`).
//!
//! # Invariants
//! - Canonical `M` groups are exactly three characters wide.
//! - Parsing never touches the store; it only normalizes shape.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Numeric catalog key.
pub type SignId = i64;

/// `SignID` value recorded on tokens whose raw name has no catalog row.
pub const UNRESOLVED_SIGN_ID: SignId = -1;

/// Raw names that mark damaged or unreadable signs; never flagged as errors.
pub const PLACEHOLDER_NAMES: &[&str] = &["X", "...", "N00"];

/// Component separator in compound sign names.
pub const COMPOUND_SEPARATOR: char = '+';

/// One row of the sign catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignEntry {
    pub sign_id: SignId,
    pub name: String,
    /// Name of the sign this entry is a graphic variant of (itself for bases).
    pub base_name: String,
}

impl SignEntry {
    pub fn is_variant(&self) -> bool {
        self.name != self.base_name
    }
}

static SIGN_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\|?((X|M[0-9]+|([0-9]+\()?N[0-9]+[A-Z]*[^)]*\)?)(~[0-9A-Z]+|@[A-Z])?\+?)+\|?$")
        .expect("valid sign name regex")
});

static COUNTED_NUMERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".*\((N[0-9]+[A-Z]*[^)]*)\).*").expect("valid numeral regex"));

static M_GROUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"M([0-9X]+)([^M]*)").expect("valid sign group regex"));

pub fn is_placeholder(name: &str) -> bool {
    PLACEHOLDER_NAMES.contains(&name)
}

/// Parses a user-typed sign name into catalog form.
///
/// Input is uppercased and `|` wrappers are removed. A counted numeral
/// such as `3(N14)` yields the bare numeral `N14`. Returns `None` when the
/// input is not sign-shaped.
pub fn parse_sign_name(input: &str) -> Option<String> {
    let upper = input.trim().to_uppercase();
    if upper.is_empty() || !SIGN_NAME_RE.is_match(&upper) {
        return None;
    }
    let name = upper.replace('|', "");
    if !name.contains(COMPOUND_SEPARATOR) && name.contains('(') {
        return Some(COUNTED_NUMERAL_RE.replace(&name, "$1").into_owned());
    }
    Some(name)
}

/// Canonicalizes an `M`-sign reference found in free text.
///
/// Each `M<digits>` group is zero-padded to three digits, or becomes `MXXX`
/// when any digit is the `X` wildcard. Text between groups is kept.
pub fn canonicalize_sign_reference(reference: &str) -> String {
    let upper = reference.to_uppercase();
    let mut canonical = String::with_capacity(upper.len() + 2);
    for captures in M_GROUP_RE.captures_iter(&upper) {
        let digits = &captures[1];
        let rest = &captures[2];
        canonical.push('M');
        if digits.contains('X') {
            canonical.push_str("XXX");
        } else {
            match digits.parse::<u32>() {
                Ok(number) => canonical.push_str(&format!("{number:03}")),
                Err(_) => canonical.push_str(digits),
            }
        }
        canonical.push_str(rest);
    }
    canonical
}

/// Splits a compound name into its component names.
pub fn split_compound(name: &str) -> Vec<&str> {
    name.split(COMPOUND_SEPARATOR)
        .filter(|part| !part.is_empty())
        .collect()
}

pub fn is_compound(name: &str) -> bool {
    name.contains(COMPOUND_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization_pads_and_wildcards() {
        assert_eq!(canonicalize_sign_reference("M56"), "M056");
        assert_eq!(canonicalize_sign_reference("M4X"), "MXXX");
        assert_eq!(canonicalize_sign_reference("m4"), "M004");
        assert_eq!(canonicalize_sign_reference("M157+M288"), "M157+M288");
        assert_eq!(canonicalize_sign_reference("M4~b"), "M004~B");
        assert_eq!(canonicalize_sign_reference("M1+M2"), "M001+M002");
    }

    #[test]
    fn parse_accepts_sign_shapes() {
        assert_eq!(parse_sign_name("m004~b").as_deref(), Some("M004~B"));
        assert_eq!(parse_sign_name("|M157+M288|").as_deref(), Some("M157+M288"));
        assert_eq!(parse_sign_name("3(N14)").as_deref(), Some("N14"));
        assert_eq!(parse_sign_name("N39B").as_deref(), Some("N39B"));
        assert_eq!(parse_sign_name("X").as_deref(), Some("X"));
    }

    #[test]
    fn parse_rejects_non_signs() {
        assert_eq!(parse_sign_name("P008791"), None);
        assert_eq!(parse_sign_name("hello"), None);
        assert_eq!(parse_sign_name(""), None);
    }

    #[test]
    fn compound_split_and_placeholders() {
        assert_eq!(split_compound("M157+M288"), vec!["M157", "M288"]);
        assert!(is_compound("M157+M288"));
        assert!(is_placeholder("..."));
        assert!(!is_placeholder("M001"));
    }
}
