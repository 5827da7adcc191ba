//! Pluralization utilities.

/// Return "s" suffix for plural counts
#[inline]
pub fn plural_s(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Format count with noun, handling pluralization
///
/// # Examples
///
/// - `plural_count(0, "user turn")` -> `"0 user turns"`
/// - `plural_count(1, "user turn")` -> `"1 user turn"`
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, plural_s(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_count() {
        assert_eq!(plural_count(0, "user turn"), "0 user turns");
        assert_eq!(plural_count(1, "user turn"), "1 user turn");
        assert_eq!(plural_count(3, "label"), "3 labels");
    }
}
