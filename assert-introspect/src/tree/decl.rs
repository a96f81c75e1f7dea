//! Declaration table

use crate::ast::{CType, Span};
use std::fmt;

/// Index of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// Function signature
#[derive(Debug, Clone, PartialEq)]
pub struct FnSig {
    pub ret: CType,
    pub params: Vec<CType>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Function(FnSig),
    Global { init: Option<super::NodeId> },
    /// `static` local: global storage, block scope
    StaticLocal { init: Option<super::NodeId> },
    Local,
    Param,
}

/// Where a declaration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclOrigin {
    /// Written in the translation unit
    Source,
    /// Provided by an `#include`d standard header
    Header(&'static str),
    /// Introduced by the rewriter
    Synthesized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub name: String,
    pub ty: CType,
    pub kind: DeclKind,
    pub origin: DeclOrigin,
    pub span: Span,
}

impl Decl {
    pub fn function(name: impl Into<String>, sig: FnSig, span: Span) -> Self {
        Decl {
            name: name.into(),
            ty: sig.ret.clone(),
            kind: DeclKind::Function(sig),
            origin: DeclOrigin::Source,
            span,
        }
    }

    pub fn local(name: impl Into<String>, ty: CType, span: Span) -> Self {
        Decl {
            name: name.into(),
            ty,
            kind: DeclKind::Local,
            origin: DeclOrigin::Source,
            span,
        }
    }

    pub fn with_origin(mut self, origin: DeclOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn signature(&self) -> Option<&FnSig> {
        match &self.kind {
            DeclKind::Function(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        self.signature().is_some()
    }

    /// Variables whose storage outlives a call
    pub fn has_static_storage(&self) -> bool {
        matches!(self.kind, DeclKind::Global { .. } | DeclKind::StaticLocal { .. })
    }
}

/// All declarations of a translation unit
#[derive(Debug, Clone, Default)]
pub struct Decls {
    decls: Vec<Decl>,
}

impl Decls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decl: Decl) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }

    pub fn get(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn get_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }

    pub fn name(&self, id: DeclId) -> &str {
        &self.get(id).name
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.decls.truncate(len);
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &Decl)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, decl)| (DeclId(i as u32), decl))
    }

    /// The function declared under `name`, if any
    pub fn find_function(&self, name: &str) -> Option<DeclId> {
        self.iter()
            .find(|(_, decl)| decl.name == name && decl.is_function())
            .map(|(id, _)| id)
    }
}

impl std::ops::Index<DeclId> for Decls {
    type Output = Decl;

    fn index(&self, id: DeclId) -> &Decl {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_function_skips_variables() {
        let mut decls = Decls::new();
        decls.push(Decl::local("printf", CType::int(), Span::default()));
        let sig = FnSig {
            ret: CType::int(),
            params: vec![CType::char_ptr()],
            variadic: true,
        };
        let printf = decls.push(Decl::function("printf", sig, Span::default()));
        assert_eq!(decls.find_function("printf"), Some(printf));
        assert_eq!(decls.find_function("puts"), None);
    }

    #[test]
    fn test_truncate_forgets_later_decls() {
        let mut decls = Decls::new();
        decls.push(Decl::local("a", CType::int(), Span::default()));
        decls.push(Decl::local("b", CType::int(), Span::default()).with_origin(DeclOrigin::Synthesized));
        decls.truncate(1);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls.name(DeclId(0)), "a");
    }
}
