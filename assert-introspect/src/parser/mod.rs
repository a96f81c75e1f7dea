//! Parser implementation using lalrpop

use crate::ast::{standard_typedef, CType, FloatKind, IntRank, IntType, Program, Signedness, Span};
use crate::error::{CompileError, Result};
use crate::lexer::Token;
use lalrpop_util::ParseError;

#[cfg(test)]
mod tests;

lalrpop_util::lalrpop_mod!(
    #[allow(clippy::all)]
    grammar,
    "/parser/grammar.rs"
);

/// One word of a declaration specifier list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeWord {
    Void,
    Char,
    Short,
    Int,
    Long,
    Signed,
    Unsigned,
    Bool,
    Float,
    Double,
    /// `const` / `volatile`, accepted and dropped
    Qualifier,
    Static,
    Extern,
    /// Standard typedef name
    Named(String),
}

/// Combine declaration specifiers into a type
///
/// Words may come in any order, as in C (`long unsigned int`).
pub fn resolve_type(words: &[TypeWord]) -> std::result::Result<CType, String> {
    let mut longs = 0;
    let mut base: Option<&TypeWord> = None;
    let mut signedness: Option<Signedness> = None;
    let mut named: Option<&str> = None;
    let mut short = false;

    for word in words {
        match word {
            TypeWord::Qualifier | TypeWord::Static | TypeWord::Extern => {}
            TypeWord::Long => longs += 1,
            TypeWord::Short => {
                if short {
                    return Err("duplicate 'short'".to_string());
                }
                short = true;
            }
            TypeWord::Signed | TypeWord::Unsigned => {
                let sign = if *word == TypeWord::Signed {
                    Signedness::Signed
                } else {
                    Signedness::Unsigned
                };
                if signedness.is_some_and(|s| s != sign) {
                    return Err("both 'signed' and 'unsigned' in declaration".to_string());
                }
                signedness = Some(sign);
            }
            TypeWord::Named(name) => {
                if named.is_some() || base.is_some() {
                    return Err(format!("unexpected type name '{name}'"));
                }
                named = Some(name);
            }
            other => {
                if base.is_some() || named.is_some() {
                    return Err("two or more data types in declaration".to_string());
                }
                base = Some(other);
            }
        }
    }

    if let Some(name) = named {
        if longs > 0 || short || signedness.is_some() {
            return Err(format!("'{name}' cannot take size or sign specifiers"));
        }
        return standard_typedef(name).ok_or_else(|| format!("unknown type name '{name}'"));
    }
    if longs > 2 {
        return Err("'long long long' is too long".to_string());
    }
    if short && longs > 0 {
        return Err("both 'long' and 'short' in declaration".to_string());
    }

    let sized = short || longs > 0;
    let sign = signedness.unwrap_or(Signedness::Signed);
    let ty = match base {
        None | Some(TypeWord::Int) => {
            if base.is_none() && !sized && signedness.is_none() {
                return Err("missing type specifier".to_string());
            }
            let rank = match (short, longs) {
                (true, _) => IntRank::Short,
                (false, 0) => IntRank::Int,
                (false, 1) => IntRank::Long,
                _ => IntRank::LongLong,
            };
            CType::Int(IntType::new(rank, sign))
        }
        Some(TypeWord::Char) if !sized => {
            CType::Int(IntType::new(IntRank::Char, signedness.unwrap_or(Signedness::Plain)))
        }
        Some(TypeWord::Void) if !sized && signedness.is_none() => CType::Void,
        Some(TypeWord::Bool) if !sized && signedness.is_none() => CType::Bool,
        Some(TypeWord::Float) if !sized && signedness.is_none() => CType::Float(FloatKind::Float),
        Some(TypeWord::Double) if longs == 0 && !short && signedness.is_none() => {
            CType::Float(FloatKind::Double)
        }
        Some(TypeWord::Double) if longs == 1 && signedness.is_none() => {
            return Err("'long double' is not supported".to_string());
        }
        Some(_) => return Err("invalid combination of type specifiers".to_string()),
    };
    Ok(ty)
}

/// Parse tokens into AST
pub fn parse(_filename: &str, _source: &str, tokens: Vec<(Token, Span)>) -> Result<Program> {
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| (span.start, tok, span.end));

    grammar::ProgramParser::new()
        .parse(token_iter)
        .map_err(|e| {
            let span = match &e {
                ParseError::InvalidToken { location } => Span::new(*location, *location + 1),
                ParseError::UnrecognizedEof { location, .. } => Span::new(*location, *location + 1),
                ParseError::UnrecognizedToken { token, .. } => Span::new(token.0, token.2),
                ParseError::ExtraToken { token } => Span::new(token.0, token.2),
                ParseError::User { .. } => Span::default(),
            };
            match e {
                ParseError::User { error } => error,
                other => CompileError::parser(format!("{other}"), span),
            }
        })
}
