//! Shared utility functions
//!
//! Text helpers used by the front end, the rewriter and the emitter.

// ============================================================================
// Name suggestions
// ============================================================================

/// Levenshtein edit distance, keeping two rows of the table
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Find the most similar name from a list of candidates.
/// Returns `Some(suggestion)` if a match is found within the threshold.
pub fn find_similar_name<'a>(name: &str, candidates: &[&'a str], threshold: usize) -> Option<&'a str> {
    let mut best_match: Option<&str> = None;
    let mut best_distance = usize::MAX;

    for &candidate in candidates {
        let distance = levenshtein_distance(name, candidate);
        if distance < best_distance && distance <= threshold {
            best_distance = distance;
            best_match = Some(candidate);
        }
    }

    best_match
}

/// Format a "did you mean" suggestion hint for an unknown name.
pub fn format_suggestion_hint(suggestion: Option<&str>) -> String {
    match suggestion {
        Some(name) => format!("\n  hint: did you mean `{}`?", name),
        None => String::new(),
    }
}

// ============================================================================
// C text
// ============================================================================

/// Collapse every whitespace run to a single space, as the preprocessor's
/// stringizing operator does
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape a string for use inside a C string literal
pub fn escape_c_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\{:03o}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// Double every `%` so the text survives one pass through a printf format
pub fn escape_format(text: &str) -> String {
    text.replace('%', "%%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_basic() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("strlen", "strlen"), 0);
    }

    #[test]
    fn test_find_similar_name() {
        let candidates = ["printf", "snprintf", "puts"];
        assert_eq!(find_similar_name("pritnf", &candidates, 2), Some("printf"));
        assert_eq!(find_similar_name("completely_different", &candidates, 2), None);
    }

    #[test]
    fn test_format_suggestion_hint() {
        assert_eq!(format_suggestion_hint(None), "");
        assert!(format_suggestion_hint(Some("abort")).contains("`abort`"));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("n  ==\n\t5"), "n == 5");
        assert_eq!(collapse_whitespace("  x "), "x");
    }

    #[test]
    fn test_escape_c_string() {
        assert_eq!(escape_c_string("a\"b\\c\n"), "a\\\"b\\\\c\\n");
        assert_eq!(escape_c_string("\x1b[0m"), "\\033[0m");
    }

    #[test]
    fn test_escape_format() {
        assert_eq!(escape_format("n % 2"), "n %% 2");
    }
}
