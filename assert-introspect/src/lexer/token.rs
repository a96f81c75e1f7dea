//! Token definitions

use crate::ast::IntLiteral;
use logos::Logos;

/// A floating literal with its spelling
#[derive(Debug, Clone, PartialEq)]
pub struct FloatLiteral {
    pub value: f64,
    pub text: String,
}

/// A character literal with its spelling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharLiteral {
    pub value: u8,
    pub text: String,
}

/// C subset token
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token {
    // Type keywords
    #[token("void")]
    Void,
    #[token("char")]
    Char,
    #[token("short")]
    Short,
    #[token("int")]
    Int,
    #[token("long")]
    Long,
    #[token("signed")]
    Signed,
    #[token("unsigned")]
    Unsigned,
    #[token("_Bool")]
    Bool,
    #[token("float")]
    Float,
    #[token("double")]
    Double,
    #[token("const")]
    Const,
    #[token("volatile")]
    Volatile,
    #[token("static")]
    Static,
    #[token("extern")]
    Extern,
    /// Typedef name from a standard header (resolved after lexing)
    TypeName(String),

    // Statement keywords
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("return")]
    Return,

    // Literals
    #[regex(r"(0[xX][0-9a-fA-F]+|[0-9]+)[uUlL]*", parse_int)]
    IntLit(IntLiteral),
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?[fF]?", parse_float)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[fF]?", parse_float)]
    FloatLit(FloatLiteral),
    #[regex(r"'([^'\\\n]|\\.)+'", parse_char)]
    CharLit(CharLiteral),
    #[regex(r#""([^"\\\n]|\\.)*""#, parse_string)]
    StrLit(String),

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// Preprocessor line, without the leading `#`
    #[regex(r"#[^\n]*", |lex| lex.slice()[1..].trim().to_string())]
    Directive(String),

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("=")]
    Eq,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Punctuation
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token("...")]
    Ellipsis,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Token::Void => "void",
            Token::Char => "char",
            Token::Short => "short",
            Token::Int => "int",
            Token::Long => "long",
            Token::Signed => "signed",
            Token::Unsigned => "unsigned",
            Token::Bool => "_Bool",
            Token::Float => "float",
            Token::Double => "double",
            Token::Const => "const",
            Token::Volatile => "volatile",
            Token::Static => "static",
            Token::Extern => "extern",
            Token::TypeName(name) | Token::Ident(name) => return write!(f, "{name}"),
            Token::If => "if",
            Token::Else => "else",
            Token::Return => "return",
            Token::IntLit(lit) => return write!(f, "{}", lit.text),
            Token::FloatLit(lit) => return write!(f, "{}", lit.text),
            Token::CharLit(lit) => return write!(f, "{}", lit.text),
            Token::StrLit(s) => return write!(f, "{s:?}"),
            Token::Directive(d) => return write!(f, "#{d}"),
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Shl => "<<",
            Token::Shr => ">>",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Tilde => "~",
            Token::Bang => "!",
            Token::AmpAmp => "&&",
            Token::PipePipe => "||",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::LtEq => "<=",
            Token::GtEq => ">=",
            Token::Eq => "=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Semi => ";",
            Token::Ellipsis => "...",
        };
        write!(f, "{text}")
    }
}

fn parse_int(lex: &mut logos::Lexer<Token>) -> Option<IntLiteral> {
    let text = lex.slice();
    let body = text.trim_end_matches(['u', 'U', 'l', 'L']);
    let suffix = &text[body.len()..];
    let unsigned = suffix.contains(['u', 'U']);
    let longs = suffix.chars().filter(|c| matches!(c, 'l' | 'L')).count();
    if longs > 2 || suffix.chars().filter(|c| matches!(c, 'u' | 'U')).count() > 1 {
        return None;
    }

    let (digits, radix) = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (hex, 16)
    } else if body.len() > 1 && body.starts_with('0') {
        (&body[1..], 8)
    } else {
        (body, 10)
    };
    let value = u64::from_str_radix(digits, radix).ok()?;

    Some(IntLiteral {
        value,
        unsigned,
        longs: longs as u8,
        non_decimal: radix != 10,
        text: text.to_string(),
    })
}

fn parse_float(lex: &mut logos::Lexer<Token>) -> Option<FloatLiteral> {
    let text = lex.slice();
    let value = text.trim_end_matches(['f', 'F']).parse().ok()?;
    Some(FloatLiteral {
        value,
        text: text.to_string(),
    })
}

fn parse_char(lex: &mut logos::Lexer<Token>) -> Option<CharLiteral> {
    let text = lex.slice();
    let bytes = unescape(&text[1..text.len() - 1])?;
    match bytes.as_slice() {
        [value] => Some(CharLiteral {
            value: *value,
            text: text.to_string(),
        }),
        _ => None,
    }
}

fn parse_string(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let text = lex.slice();
    let bytes = unescape(&text[1..text.len() - 1])?;
    String::from_utf8(bytes).ok()
}

/// Resolve C escape sequences
pub fn unescape(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        i += 1;
        let escaped = *bytes.get(i)?;
        i += 1;
        let byte = match escaped {
            b'n' => b'\n',
            b't' => b'\t',
            b'r' => b'\r',
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'v' => 0x0b,
            b'\\' | b'\'' | b'"' | b'?' => escaped,
            b'x' => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_hexdigit() {
                    i += 1;
                }
                u8::from_str_radix(&text[start..i], 16).ok()?
            }
            b'0'..=b'7' => {
                let start = i - 1;
                while i < bytes.len() && i - start < 3 && (b'0'..=b'7').contains(&bytes[i]) {
                    i += 1;
                }
                u8::from_str_radix(&text[start..i], 8).ok()?
            }
            _ => return None,
        };
        out.push(byte);
    }
    Some(out)
}
