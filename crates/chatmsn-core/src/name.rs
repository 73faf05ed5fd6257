//! Display name handling.
//!
//! Names are deliberately permissive: no uniqueness check and no
//! rejection of empty names. Matching is case-insensitive.

/// Turns the raw name line sent by a client into its display name.
pub fn parse_display_name(line: &str) -> String {
    line.trim().to_string()
}

/// Case-insensitive exact comparison of two display names.
pub fn names_match(a: &str, b: &str) -> bool {
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    a.to_lowercase() == b.to_lowercase()
}
