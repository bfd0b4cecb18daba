//! core::naming
//!
//! Path segment naming rules.
//!
//! # Features
//!
//! - Derive a URL-safe path segment from a human-readable group or project label

/// Characters that are never allowed in a platform path segment.
///
/// These are removed outright (not replaced) before whitespace is collapsed.
pub const UNSAFE_PATH_CHARS: [char; 29] = [
    '"', '#', '$', '%', '&', '+', ',', '/', ':', ';', '=', '?', '@', '[', '\\', ']', '^', '`',
    '{', '|', '}', '~', '\'', '!', '<', '>', '*', '(', ')',
];

/// Normalize a label into a URL-safe path segment.
///
/// Removes every character in [`UNSAFE_PATH_CHARS`], then joins the remaining
/// whitespace-separated tokens with underscores. Everything else passes
/// through unchanged, so the function is total and deterministic.
///
/// # Example
///
/// ```
/// use baseliner::core::naming::normalize;
///
/// assert_eq!(normalize("My Group!"), "My_Group");
/// assert_eq!(normalize("Team #1 / QA"), "Team_1_QA");
/// assert_eq!(normalize("a/b:c"), "abc");
/// ```
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !UNSAFE_PATH_CHARS.contains(c))
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_basic() {
        assert_eq!(normalize("Hello World"), "Hello_World");
        assert_eq!(normalize("My Group!"), "My_Group");
        assert_eq!(normalize("backend"), "backend");
    }

    #[test]
    fn normalize_removes_before_splitting() {
        // The lone "/" token disappears entirely, leaving a single separator
        assert_eq!(normalize("Team #1 / QA"), "Team_1_QA");
        assert_eq!(normalize("a/b:c"), "abc");
        assert_eq!(normalize("[infra] {core}"), "infra_core");
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  lots   of\tspace\n"), "lots_of_space");
    }

    #[test]
    fn normalize_keeps_safe_punctuation() {
        assert_eq!(normalize("my-group.v2_x"), "my-group.v2_x");
        assert_eq!(normalize("Группа разработки"), "Группа_разработки");
    }

    #[test]
    fn normalize_handles_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("?!#"), "");
        assert_eq!(normalize("   "), "");
    }

    proptest! {
        #[test]
        fn normalize_never_emits_unsafe_chars_or_whitespace(input in ".*") {
            let out = normalize(&input);
            prop_assert!(!out.chars().any(|c| UNSAFE_PATH_CHARS.contains(&c)));
            prop_assert!(!out.chars().any(char::is_whitespace));
        }

        #[test]
        fn normalize_is_idempotent(input in ".*") {
            let once = normalize(&input);
            prop_assert_eq!(normalize(&once), once.clone());
        }
    }
}
