//! Source location tracking

use serde::{Deserialize, Serialize};

/// A byte range in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The text covered by this span, if it lies within `source`
    pub fn slice(self, source: &str) -> Option<&str> {
        source.get(self.start..self.end)
    }

    /// 1-based line number of the span start
    pub fn line_in(self, source: &str) -> u32 {
        let end = self.start.min(source.len());
        let newlines = source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count();
        newlines as u32 + 1
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A value with source location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge_non_overlapping() {
        let merged = Span::new(0, 5).merge(Span::new(10, 15));
        assert_eq!(merged, Span::new(0, 15));
    }

    #[test]
    fn test_span_merge_reversed_order() {
        let merged = Span::new(10, 20).merge(Span::new(0, 5));
        assert_eq!(merged, Span::new(0, 20));
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(42, 99).to_string(), "42..99");
    }

    #[test]
    fn test_span_slice() {
        let source = "assert(n == 5);";
        assert_eq!(Span::new(7, 13).slice(source), Some("n == 5"));
        assert_eq!(Span::new(7, 100).slice(source), None);
    }

    #[test]
    fn test_line_in_first_line() {
        assert_eq!(Span::new(0, 3).line_in("int x;\nint y;"), 1);
    }

    #[test]
    fn test_line_in_later_lines() {
        let source = "int x;\nint y;\n\nvoid f(void) {}";
        let offset = source.find("void").unwrap();
        assert_eq!(Span::new(offset, offset + 4).line_in(source), 4);
    }

    #[test]
    fn test_line_in_clamps_past_end() {
        assert_eq!(Span::new(500, 501).line_in("a\nb"), 2);
    }
}
