//! Firestore field paths.
//!
//! Segments that are not simple identifiers (`[A-Za-z_][A-Za-z0-9_]*`) must be
//! wrapped in backticks, so `requirements` + `driving-c` becomes
//! ``requirements.`driving-c` ``.

/// True if `segment` can appear in a field path unquoted.
pub fn is_simple(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote a single segment if needed.
pub fn quote(segment: &str) -> String {
    if is_simple(segment) {
        segment.to_string()
    } else {
        format!(
            "`{}`",
            segment.replace('\\', "\\\\").replace('`', "\\`")
        )
    }
}

/// Join segments into a dotted path, quoting where needed.
pub fn join<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .map(quote)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a dotted path back into raw segments.
pub fn split(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut escaped = false;

    for c in path.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '`' => quoted = !quoted,
            '.' if !quoted => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_segments_stay_bare() {
        assert_eq!(join(["payment", "maximum"]), "payment.maximum");
        assert!(is_simple("o_level"));
        assert!(!is_simple("9lives"));
        assert!(!is_simple(""));
    }

    #[test]
    fn test_dashed_segment_is_quoted() {
        assert_eq!(join(["requirements", "driving-c"]), "requirements.`driving-c`");
    }

    #[test]
    fn test_split_inverts_join() {
        for segments in [
            vec!["requirements", "driving-c"],
            vec!["location", "region"],
            vec!["a", "we`ird.name"],
        ] {
            let path = join(segments.iter().copied());
            assert_eq!(split(&path), segments);
        }
    }
}
