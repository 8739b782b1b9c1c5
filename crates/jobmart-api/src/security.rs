//! Input validation for values that end up in store paths.

/// Longest document id accepted on a route.
pub const MAX_DOCUMENT_ID_LENGTH: usize = 128;

/// Validate a document id taken from a path segment.
///
/// Valid format: 1-128 chars of ASCII alphanumerics, hyphens and underscores.
/// This rules out `/`, `.` and `..`, and Firestore's reserved `__name__` form.
pub fn is_valid_document_id(id: &str) -> bool {
    if id.is_empty() || id.len() > MAX_DOCUMENT_ID_LENGTH {
        return false;
    }
    if id.starts_with("__") && id.ends_with("__") {
        return false;
    }
    id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Normalize a locale tag such as `en-US` or ` SI ` to its language part.
pub fn normalize_locale(input: &str) -> String {
    input
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_validation() {
        assert!(is_valid_document_id("4f9c2a1be0d84c52a3f1"));
        assert!(is_valid_document_id("job_01-a"));
        assert!(!is_valid_document_id(""));
        assert!(!is_valid_document_id("has/slash"));
        assert!(!is_valid_document_id(".."));
        assert!(!is_valid_document_id("__name__"));
        assert!(!is_valid_document_id(&"x".repeat(129)));
    }

    #[test]
    fn test_normalize_locale() {
        assert_eq!(normalize_locale("en-US"), "en");
        assert_eq!(normalize_locale(" SI "), "si");
        assert_eq!(normalize_locale("ta_LK"), "ta");
        assert_eq!(normalize_locale(""), "");
    }
}
