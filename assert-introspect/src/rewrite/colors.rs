//! Entity colors
//!
//! One allocator lives for the rewriting of one assertion. The static
//! reconstruction and the runtime report share it, so the same variable or
//! call carries the same color on both lines.

use std::collections::HashMap;

use crate::tree::{DeclId, NodeId, NodeKind, Tree};

/// Display styles handed out in order
pub const PALETTE: [&str; 8] = [
    "\x1b[32m", "\x1b[33m", "\x1b[34m", "\x1b[35m", "\x1b[36m", "\x1b[92m", "\x1b[93m", "\x1b[94m",
];

pub const RESET: &str = "\x1b[0m";

/// Style of the `E` marker on the report line
pub const HIGHLIGHT: &str = "\x1b[1;31m";

/// What a color belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// Every read of one variable
    Decl(DeclId),
    /// One call expression; two calls of the same function are distinct
    Call(NodeId),
}

impl Entity {
    /// The entity `node` stands for, looking through handles and conversions
    pub fn of(tree: &Tree, node: NodeId) -> Option<Entity> {
        let node = tree.strip_wrappers(node);
        match tree.kind(node) {
            NodeKind::DeclRef(decl) => Some(Entity::Decl(*decl)),
            NodeKind::Call { .. } => Some(Entity::Call(node)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(&'static str);

impl Color {
    pub fn code(self) -> &'static str {
        self.0
    }
}

/// Wrap `text` in `color`, or leave it plain
pub fn paint(color: Option<Color>, text: &str) -> String {
    match color {
        Some(color) => format!("{}{text}{RESET}", color.code()),
        None => text.to_string(),
    }
}

#[derive(Debug)]
pub struct ColorAllocator {
    palette: &'static [&'static str],
    assigned: HashMap<Entity, Option<Color>>,
    next: usize,
}

impl ColorAllocator {
    /// An allocator over the full palette, or an empty one when color is off
    pub fn new(enabled: bool) -> Self {
        Self {
            palette: if enabled { &PALETTE } else { &[] },
            assigned: HashMap::new(),
            next: 0,
        }
    }

    /// The color `entity` already has
    pub fn lookup(&self, entity: Entity) -> Option<Color> {
        self.assigned.get(&entity).copied().flatten()
    }

    /// The color of `entity`, allocating the next free slot on first sight
    ///
    /// Once the palette runs out, new entities stay plain.
    pub fn assign(&mut self, entity: Entity) -> Option<Color> {
        if let Some(color) = self.assigned.get(&entity) {
            return *color;
        }
        let color = self.palette.get(self.next).copied().map(Color);
        if color.is_some() {
            self.next += 1;
        }
        tracing::trace!(?entity, slot = self.next, "assigned color");
        self.assigned.insert(entity, color);
        color
    }

    pub fn is_enabled(&self) -> bool {
        !self.palette.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CType, Span};
    use crate::tree::{Decl, Decls};

    fn variables(count: usize) -> Vec<DeclId> {
        let mut decls = Decls::new();
        (0..count)
            .map(|i| decls.push(Decl::local(format!("v{i}"), CType::int(), Span::default())))
            .collect()
    }

    #[test]
    fn test_same_entity_same_color() {
        let vars = variables(2);
        let mut colors = ColorAllocator::new(true);
        let first = colors.assign(Entity::Decl(vars[0]));
        assert!(first.is_some());
        assert_eq!(colors.assign(Entity::Decl(vars[0])), first);
        assert_eq!(colors.lookup(Entity::Decl(vars[0])), first);
        assert_ne!(colors.assign(Entity::Decl(vars[1])), first);
    }

    #[test]
    fn test_lookup_does_not_allocate() {
        let vars = variables(2);
        let mut colors = ColorAllocator::new(true);
        assert_eq!(colors.lookup(Entity::Decl(vars[1])), None);
        assert_eq!(colors.assign(Entity::Decl(vars[0])), Some(Color(PALETTE[0])));
    }

    #[test]
    fn test_exhausted_palette_goes_plain() {
        let vars = variables(PALETTE.len() + 2);
        let mut colors = ColorAllocator::new(true);
        let assigned: Vec<_> = vars.iter().map(|v| colors.assign(Entity::Decl(*v))).collect();
        for (i, color) in assigned.iter().take(PALETTE.len()).enumerate() {
            assert_eq!(*color, Some(Color(PALETTE[i])));
        }
        assert_eq!(assigned[PALETTE.len()], None);
        assert_eq!(assigned[PALETTE.len() + 1], None);
    }

    #[test]
    fn test_disabled_allocator() {
        let vars = variables(1);
        let mut colors = ColorAllocator::new(false);
        assert!(!colors.is_enabled());
        assert_eq!(colors.assign(Entity::Decl(vars[0])), None);
        assert_eq!(paint(None, "n"), "n");
    }

    #[test]
    fn test_entity_looks_through_wrappers() {
        let mut tree = Tree::new();
        let vars = variables(1);
        let var = tree.push(NodeKind::DeclRef(vars[0]), CType::int(), Span::default());
        let saved = tree.push(NodeKind::Save(var), CType::int(), Span::default());
        let conv = tree.push(NodeKind::ImplicitConv(saved), CType::long(), Span::default());
        assert_eq!(Entity::of(&tree, conv), Some(Entity::Decl(vars[0])));
        let other = tree.push(NodeKind::DeclRef(vars[0]), CType::int(), Span::default());
        assert_eq!(Entity::of(&tree, other), Entity::of(&tree, conv));
    }

    #[test]
    fn test_paint() {
        assert_eq!(paint(Some(Color(PALETTE[0])), "n"), "\x1b[32mn\x1b[0m");
    }
}
