//! Lexical scopes and the variable table.
//!
//! Scopes are frames in a per-module arena, each referencing its parent by
//! index; lookup walks parent links. Within one frame names are unique;
//! shadowing is expressed by chaining, never by overwrite.

use crate::consteval::ConstValue;
use rustc_hash::FxHashMap;
use yal_common::{Atom, Span};
use yal_types::TypeId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VarId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameId(pub u32);

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: Atom,
    pub ty: TypeId,
    pub mutable: bool,
    /// Statically-known value, when constant evaluation produced one.
    pub value: Option<ConstValue>,
    pub doc: Option<String>,
    /// Where the declaration lives, for navigation. Imported bindings point
    /// into the exporting module.
    pub decl_uri: String,
    pub decl_span: Span,
    /// Forward-declaration bookkeeping: the variable carries a provisional
    /// type until its declaration statement is processed; use-sites recorded
    /// meanwhile are retro-linked once the final type lands.
    pub provisional: bool,
    pub pending_refs: Vec<Span>,
}

impl Variable {
    pub fn new(name: Atom, ty: TypeId, mutable: bool, decl_uri: String, decl_span: Span) -> Self {
        Self {
            name,
            ty,
            mutable,
            value: None,
            doc: None,
            decl_uri,
            decl_span,
            provisional: false,
            pending_refs: Vec::new(),
        }
    }
}

struct Frame {
    parent: Option<FrameId>,
    names: FxHashMap<Atom, VarId>,
}

/// Arena of scope frames plus the module's variable table.
pub struct ScopeArena {
    frames: Vec<Frame>,
    vars: Vec<Variable>,
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeArena {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame {
                parent: None,
                names: FxHashMap::default(),
            }],
            vars: Vec::new(),
        }
    }

    pub const fn root(&self) -> FrameId {
        FrameId(0)
    }

    pub fn push_child(&mut self, parent: FrameId) -> FrameId {
        let id = FrameId(self.frames.len() as u32);
        self.frames.push(Frame {
            parent: Some(parent),
            names: FxHashMap::default(),
        });
        id
    }

    /// Declare a variable in a frame. Fails with the existing `VarId` when
    /// the name is already taken in that same frame.
    pub fn declare(&mut self, frame: FrameId, var: Variable) -> Result<VarId, VarId> {
        let frame_ref = &self.frames[frame.0 as usize];
        if let Some(&existing) = frame_ref.names.get(&var.name) {
            return Err(existing);
        }
        let id = VarId(self.vars.len() as u32);
        let name = var.name;
        self.vars.push(var);
        self.frames[frame.0 as usize].names.insert(name, id);
        Ok(id)
    }

    /// Allocate a variable without binding it to any frame (synthesized
    /// accessor targets and the like).
    pub fn alloc_unbound(&mut self, var: Variable) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(var);
        id
    }

    /// Lookup falls through the frame chain.
    pub fn lookup(&self, frame: FrameId, name: Atom) -> Option<VarId> {
        let mut current = Some(frame);
        while let Some(frame_id) = current {
            let frame_ref = &self.frames[frame_id.0 as usize];
            if let Some(&var) = frame_ref.names.get(&name) {
                return Some(var);
            }
            current = frame_ref.parent;
        }
        None
    }

    pub fn lookup_local(&self, frame: FrameId, name: Atom) -> Option<VarId> {
        self.frames[frame.0 as usize].names.get(&name).copied()
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.0 as usize]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use yal_common::Interner;

    fn var(interner: &Interner, name: &str) -> Variable {
        Variable::new(
            interner.intern(name),
            TypeId::NUMBER,
            false,
            "test.yal".to_string(),
            Span::default(),
        )
    }

    #[test]
    fn lookup_walks_parent_chain() {
        let interner = Arc::new(Interner::new());
        let mut scopes = ScopeArena::new();
        let root = scopes.root();
        let outer = scopes.declare(root, var(&interner, "x")).expect("fresh name");
        let child = scopes.push_child(root);
        assert_eq!(scopes.lookup(child, interner.intern("x")), Some(outer));
        assert_eq!(scopes.lookup(child, interner.intern("y")), None);
    }

    #[test]
    fn shadowing_is_chaining_not_overwrite() {
        let interner = Arc::new(Interner::new());
        let mut scopes = ScopeArena::new();
        let root = scopes.root();
        let outer = scopes.declare(root, var(&interner, "x")).expect("fresh name");
        let child = scopes.push_child(root);
        let inner = scopes.declare(child, var(&interner, "x")).expect("child frame is fresh");
        assert_ne!(outer, inner);
        assert_eq!(scopes.lookup(child, interner.intern("x")), Some(inner));
        assert_eq!(scopes.lookup(root, interner.intern("x")), Some(outer));
    }

    #[test]
    fn duplicate_in_same_frame_is_rejected() {
        let interner = Arc::new(Interner::new());
        let mut scopes = ScopeArena::new();
        let root = scopes.root();
        let first = scopes.declare(root, var(&interner, "x")).expect("fresh name");
        let err = scopes.declare(root, var(&interner, "x"));
        assert_eq!(err, Err(first));
    }
}
