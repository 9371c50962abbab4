//! Golfing compiler core.
//!
//! `polygolf` lowers one language-neutral IR program into the shortest
//! source text it can find for a target language.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──> concrete program ──> plugins ──> ops ──> emitter ──┐
//! IR + variants ──┼──> concrete program ──> ...                           ├──> shortest
//!                 └──> concrete program ──> ...                           ┘
//! ```
//!
//! - [`ir`]: nodes, opcodes and value types.
//! - [`traverse`]: tree walking with in-place replacement.
//! - [`infer`]: memoized type inference with integer intervals.
//! - [`pipeline`]: applies a [`Target`] to one concrete program.
//! - [`variants`]: expands variant markers and picks the shortest output.
//! - [`idents`]: output identifier allocation.
//! - [`plugins`], [`output`]: reusable rewrite passes and built-in targets.
//!
//! # Example
//!
//! ```ignore
//! use polygolf::{Node, OpCode, Program, ValueType, compile, language_for_name};
//!
//! let program = Program::new(Node::block(vec![Node::op(
//!     OpCode::Println,
//!     vec![Node::op(OpCode::Add, vec![Node::id("x"), Node::int(1)])],
//! )]))
//! .with_variable("x", ValueType::int());
//!
//! let lua = language_for_name("lua").unwrap().target();
//! let source = compile(&lua, program)?;
//! // => "print(x+1)"
//! ```

pub mod config;
pub mod error;
pub mod idents;
pub mod infer;
pub mod ir;
pub mod output;
pub mod pipeline;
pub mod plugins;
pub mod registry;
pub mod target;
pub mod traits;
pub mod traverse;
pub mod variants;

// Re-exports: IR
pub use ir::{IntegerType, Node, NodeKind, OpCode, Program, Scope, ValueType, check_lowered};

// Re-exports: errors and configuration
pub use config::{CompileConfig, ConfigError};
pub use error::CompileError;

// Re-exports: traits and targets
pub use idents::{DefaultIdentGen, IdentGen};
pub use target::{OpMap, OpTransform, Target};
pub use traits::{Emitter, Language, Plugin};
pub use traverse::{Path, Visitor, visit};

// Re-exports: compilation
pub use pipeline::apply_target;
pub use variants::{compile, compile_with_config, count_variants, expand_variants};

// Re-exports: registry
pub use registry::{language_for_name, languages, register_language};
