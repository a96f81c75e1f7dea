//! Lexer implementation using logos

mod token;

pub use token::{unescape, CharLiteral, FloatLiteral, Token};

use crate::ast::{standard_typedef, Span};
use crate::error::{CompileError, Result};
use logos::Logos;

/// Tokenize source code
///
/// Identifiers naming a standard typedef (`size_t`, `uint8_t`, ...) come back
/// as `Token::TypeName` so the grammar can tell declarations from expressions.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        match result {
            Ok(Token::Ident(name)) if standard_typedef(&name).is_some() => {
                tokens.push((Token::TypeName(name), span));
            }
            Ok(token) => tokens.push((token, span)),
            Err(_) => {
                return Err(CompileError::lexer(
                    format!("unexpected character: {:?}", lexer.slice()),
                    span,
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_type_keywords() {
        assert_eq!(
            kinds("unsigned long long int"),
            vec![Token::Unsigned, Token::Long, Token::Long, Token::Int]
        );
    }

    #[test]
    fn test_tokenize_typedef_names() {
        assert_eq!(
            kinds("size_t n"),
            vec![Token::TypeName("size_t".to_string()), Token::Ident("n".to_string())]
        );
    }

    #[test]
    fn test_tokenize_int_suffixes() {
        let tokens = kinds("42 7u 0x10UL 010");
        let values: Vec<_> = tokens
            .iter()
            .map(|t| match t {
                Token::IntLit(lit) => (lit.value, lit.unsigned, lit.longs),
                other => panic!("expected IntLit, got {other:?}"),
            })
            .collect();
        assert_eq!(values, vec![(42, false, 0), (7, true, 0), (16, true, 1), (8, false, 0)]);
    }

    #[test]
    fn test_tokenize_bad_octal() {
        assert!(tokenize("09").is_err());
    }

    #[test]
    fn test_tokenize_float_literal() {
        let tokens = kinds("1.5");
        assert!(matches!(&tokens[0], Token::FloatLit(f) if (f.value - 1.5).abs() < f64::EPSILON));
    }

    #[test]
    fn test_tokenize_string_escapes() {
        assert_eq!(kinds(r#""a\tb\n""#), vec![Token::StrLit("a\tb\n".to_string())]);
    }

    #[test]
    fn test_tokenize_char_literal() {
        let tokens = kinds(r"'\0' 'a'");
        assert!(matches!(&tokens[0], Token::CharLit(c) if c.value == 0 && c.text == r"'\0'"));
        assert!(matches!(&tokens[1], Token::CharLit(c) if c.value == b'a'));
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            kinds("&& & || | << <= < == = !"),
            vec![
                Token::AmpAmp,
                Token::Amp,
                Token::PipePipe,
                Token::Pipe,
                Token::Shl,
                Token::LtEq,
                Token::Lt,
                Token::EqEq,
                Token::Eq,
                Token::Bang,
            ]
        );
    }

    #[test]
    fn test_tokenize_directive() {
        assert_eq!(
            kinds("#include <assert.h>\nint"),
            vec![Token::Directive("include <assert.h>".to_string()), Token::Int]
        );
    }

    #[test]
    fn test_tokenize_skips_comments() {
        assert_eq!(kinds("int /* x */ // y\n;"), vec![Token::Int, Token::Semi]);
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("int main").unwrap();
        assert_eq!(tokens[0].1, Span::new(0, 3));
        assert_eq!(tokens[1].1, Span::new(4, 8));
    }

    #[test]
    fn test_unescape_hex_and_octal() {
        assert_eq!(unescape(r"\x41\101").unwrap(), b"AA".to_vec());
        assert!(unescape(r"\q").is_none());
    }
}
