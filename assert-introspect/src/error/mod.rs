//! Error types and reporting

use crate::ast::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CompileError>;

/// Compile error
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Lexer error at {span:?}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span:?}: {message}")]
    Parser { message: String, span: Span },

    /// Name resolution and typing errors
    #[error("Semantic error at {span:?}: {message}")]
    Semantic { message: String, span: Span },

    #[error("IO error: {message}")]
    Io { message: String },

    /// Bad `introspect.toml` or conflicting options
    #[error("Config error: {message}")]
    Config { message: String },
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn semantic(message: impl Into<String>, span: Span) -> Self {
        Self::Semantic {
            message: message.into(),
            span,
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. } => Some(*span),
            Self::Parser { span, .. } => Some(*span),
            Self::Semantic { span, .. } => Some(*span),
            Self::Io { .. } | Self::Config { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Lexer { message, .. } => message,
            Self::Parser { message, .. } => message,
            Self::Semantic { message, .. } => message,
            Self::Io { message } => message,
            Self::Config { message } => message,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Lexer { .. } => "Lexer",
            Self::Parser { .. } => "Parser",
            Self::Semantic { .. } => "Semantic",
            Self::Io { .. } => "IO",
            Self::Config { .. } => "Config",
        }
    }
}

impl From<std::io::Error> for CompileError {
    fn from(err: std::io::Error) -> Self {
        Self::io_error(err.to_string())
    }
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &CompileError) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = error.kind();
    let result = if let Some(span) = error.span() {
        Report::build(ReportKind::Error, (filename, span.start..span.end))
            .with_message(format!("{kind} error"))
            .with_label(
                Label::new((filename, span.start..span.end))
                    .with_message(error.message())
                    .with_color(Color::Red),
            )
            .finish()
            .eprint((filename, Source::from(source)))
    } else {
        // Errors without span (IO, Config)
        Report::build(ReportKind::Error, (filename, 0..0))
            .with_message(format!("{kind} error: {}", error.message()))
            .finish()
            .eprint((filename, Source::from(source)))
    };
    if let Err(e) = result {
        tracing::error!("failed to render diagnostic: {e}");
    }
}

/// Report a warning with ariadne (e.g. an assertion left untouched by the rewriter)
pub fn report_warning(filename: &str, source: &str, span: Span, message: &str) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let result = Report::build(ReportKind::Warning, (filename, span.start..span.end))
        .with_message("assertion not rewritten")
        .with_label(
            Label::new((filename, span.start..span.end))
                .with_message(message)
                .with_color(Color::Yellow),
        )
        .finish()
        .eprint((filename, Source::from(source)));
    if let Err(e) = result {
        tracing::error!("failed to render diagnostic: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_span_and_message() {
        let err = CompileError::semantic("undeclared identifier 'x'", Span::new(4, 5));
        assert_eq!(err.span(), Some(Span::new(4, 5)));
        assert_eq!(err.message(), "undeclared identifier 'x'");
        assert!(err.to_string().starts_with("Semantic error"));
    }

    #[test]
    fn test_io_error_has_no_span() {
        let err: CompileError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.span().is_none());
        assert_eq!(err.message(), "gone");
    }
}
