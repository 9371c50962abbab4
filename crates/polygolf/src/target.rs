//! Target descriptions.
//!
//! A [`Target`] bundles everything the pipeline needs to compile IR into one
//! language: the golf stage run before variant expansion, the ordered plugin
//! list, an optional opcode-to-syntax map, an optional dependency map, the
//! identifier policy and the emitter.

use crate::idents::{DefaultIdentGen, IdentGen};
use crate::ir::{Node, OpCode};
use crate::traits::{Emitter, Plugin};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

type RewriteFn = dyn Fn(Vec<Node>) -> Node + Send + Sync;

/// How one opcode is spelled in a target.
#[derive(Clone)]
pub enum OpTransform {
    /// Operator token with the opcode's default precedence.
    Token(String),
    /// Operator token with an explicit precedence.
    Precedence(String, i32),
    /// Arbitrary replacement built from the operands.
    Rewrite(Arc<RewriteFn>),
}

impl fmt::Debug for OpTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpTransform::Token(token) => f.debug_tuple("Token").field(token).finish(),
            OpTransform::Precedence(token, prec) => {
                f.debug_tuple("Precedence").field(token).field(prec).finish()
            }
            OpTransform::Rewrite(_) => f.write_str("Rewrite(..)"),
        }
    }
}

/// Opcode-to-syntax table.
#[derive(Debug, Clone, Default)]
pub struct OpMap {
    entries: IndexMap<OpCode, OpTransform>,
}

impl OpMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spell `op` as `token`.
    pub fn token(mut self, op: OpCode, token: impl Into<String>) -> Self {
        self.entries.insert(op, OpTransform::Token(token.into()));
        self
    }

    /// Spell `op` as `token` binding with `precedence`.
    pub fn precedence(mut self, op: OpCode, token: impl Into<String>, precedence: i32) -> Self {
        self.entries
            .insert(op, OpTransform::Precedence(token.into(), precedence));
        self
    }

    /// Replace `op` with whatever `f` builds from its operands.
    pub fn rewrite(
        mut self,
        op: OpCode,
        f: impl Fn(Vec<Node>) -> Node + Send + Sync + 'static,
    ) -> Self {
        self.entries.insert(op, OpTransform::Rewrite(Arc::new(f)));
        self
    }

    /// Replace `op` with a call to `name` taking the operands as arguments.
    pub fn call(self, op: OpCode, name: &'static str) -> Self {
        self.rewrite(op, move |args| Node::call(name, args))
    }

    /// Replace `op` with a method `name` called on the first operand.
    pub fn method(self, op: OpCode, name: &'static str) -> Self {
        self.rewrite(op, move |mut args| {
            if args.is_empty() {
                return Node::call(name, args);
            }
            let object = args.remove(0);
            Node::method_call(object, name, args)
        })
    }

    pub fn get(&self, op: OpCode) -> Option<&OpTransform> {
        self.entries.get(&op)
    }

    pub fn contains(&self, op: OpCode) -> bool {
        self.entries.contains_key(&op)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything needed to compile IR into one language.
pub struct Target {
    pub name: String,
    /// Passes that offer alternative spellings as variant markers. They run
    /// once on the whole program, before expansion.
    pub golf_plugins: Vec<Box<dyn Plugin>>,
    pub plugins: Vec<Box<dyn Plugin>>,
    pub emitter: Box<dyn Emitter>,
    pub ident_gen: Box<dyn IdentGen>,
    pub op_map: Option<OpMap>,
    /// Discriminant (opcode, node kind or call name) to dependency name.
    pub dependency_map: Option<IndexMap<String, String>>,
}

impl Target {
    /// A target with no plugins, no maps and the default identifier policy.
    pub fn new(name: impl Into<String>, emitter: impl Emitter + 'static) -> Self {
        Self {
            name: name.into(),
            golf_plugins: Vec::new(),
            plugins: Vec::new(),
            emitter: Box::new(emitter),
            ident_gen: Box::new(DefaultIdentGen),
            op_map: None,
            dependency_map: None,
        }
    }

    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn with_golf_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.golf_plugins.push(Box::new(plugin));
        self
    }

    pub fn with_op_map(mut self, op_map: OpMap) -> Self {
        self.op_map = Some(op_map);
        self
    }

    pub fn with_dependency(
        mut self,
        discriminant: impl Into<String>,
        dependency: impl Into<String>,
    ) -> Self {
        self.dependency_map
            .get_or_insert_with(IndexMap::new)
            .insert(discriminant.into(), dependency.into());
        self
    }

    pub fn with_ident_gen(mut self, ident_gen: impl IdentGen + 'static) -> Self {
        self.ident_gen = Box::new(ident_gen);
        self
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field(
                "golf_plugins",
                &self.golf_plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("op_map", &self.op_map)
            .field("dependency_map", &self.dependency_map)
            .finish_non_exhaustive()
    }
}
