//! Phone number normalization to US E.164 form.

/// Normalize a captured phone number to `+1XXXXXXXXXX`.
///
/// All non-digit characters are stripped first. Ten digits get a `+1` prefix,
/// eleven digits starting with `1` get a `+` prefix. Anything else is reduced
/// to its last ten digits with a `+1` prefix; inputs that are too short keep
/// every digit they have. This never fails.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    match digits.len() {
        10 => format!("+1{digits}"),
        11 if digits.starts_with('1') => format!("+{digits}"),
        len => {
            let tail = &digits[len.saturating_sub(10)..];
            format!("+1{tail}")
        }
    }
}
