//! Traits implemented by plugins, emitters and target languages.

use crate::error::CompileError;
use crate::ir::Program;
use crate::target::Target;
use crate::traverse::Visitor;

/// One rewrite pass in a target's pipeline.
///
/// A plugin is a factory: every walk gets a fresh visitor, so any state a
/// visitor accumulates lives for exactly one pass over one program.
pub trait Plugin: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Create the visitor for one walk.
    fn visitor(&self) -> Box<dyn Visitor + '_>;
}

/// Renders a fully lowered program as source text.
///
/// Emitters may assume the program contains no variant markers and no
/// abstract operations, and must fail with
/// [`CompileError::UnloweredNode`] if they meet one.
pub trait Emitter: Send + Sync {
    fn emit(&self, program: &Program) -> Result<String, CompileError>;
}

/// A built-in target language.
pub trait Language: Send + Sync {
    /// Language identifier (e.g., "lua", "csharp").
    fn name(&self) -> &'static str;

    /// File extension for output (e.g., "lua").
    fn extension(&self) -> &'static str;

    /// Build a fresh target description.
    fn target(&self) -> Target;
}
