//! Bearer-token authentication for the File Access Service.

/// Prefix of the `Authorization` header value.
pub const BEARER_PREFIX: &str = "Bearer ";

/// True only when `header_value` is exactly `"Bearer " + token`.
///
/// The comparison does not short-circuit on the first differing byte.
pub fn authenticate(header_value: Option<&str>, token: &str) -> bool {
    let Some(value) = header_value else {
        return false;
    };
    if token.is_empty() {
        return false;
    }
    let expected = format!("{BEARER_PREFIX}{token}");
    constant_time_eq(value.as_bytes(), expected.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
