//! Full name splitting.

/// A full name split into CRM first/last name fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitName {
    pub first: String,
    pub last: String,
}

/// Split a spoken full name on whitespace.
///
/// The first token is the first name; the remaining tokens joined by single
/// spaces form the last name, which is empty for single-word names.
pub fn split_full_name(full_name: &str) -> SplitName {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    SplitName { first, last }
}
