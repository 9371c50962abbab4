//! Emitters - render lowered IR as source text.
//!
//! Each built-in target lives in its own module behind a `target-*` feature
//! and exposes a static [`crate::traits::Language`] for the registry. The
//! helpers here are shared by all of them: precedence-driven
//! parenthesisation, token joining and text literal quoting.

#[cfg(feature = "target-csharp")]
pub mod csharp;
#[cfg(feature = "target-debug")]
pub mod debug;
#[cfg(feature = "target-lua")]
pub mod lua;
#[cfg(feature = "target-nim")]
pub mod nim;

#[cfg(feature = "target-csharp")]
pub use csharp::{CSHARP_LANGUAGE, CSharpEmitter, CSharpLanguage};
#[cfg(feature = "target-debug")]
pub use debug::{DEBUG_LANGUAGE, DebugEmitter, DebugLanguage};
#[cfg(feature = "target-lua")]
pub use lua::{LUA_LANGUAGE, LuaEmitter, LuaLanguage};
#[cfg(feature = "target-nim")]
pub use nim::{NIM_LANGUAGE, NimEmitter, NimLanguage};

use crate::error::CompileError;
use crate::ir::{Node, NodeKind};
#[cfg(any(feature = "target-lua", feature = "target-nim"))]
use crate::ir::OpCode;

/// Where an expression sits relative to the operator around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// Precedence of the enclosing operator; 0 when there is none.
    pub precedence: i32,
    /// Whether the expression is the right (or only) operand.
    pub right: bool,
    /// Whether the enclosing operator groups to the right.
    pub right_associative: bool,
}

impl Context {
    /// Statement level, or inside brackets of any kind.
    pub const TOP: Context = Context {
        precedence: 0,
        right: false,
        right_associative: false,
    };

    /// Operand position that always requires grouping for operators.
    pub const ATOM: Context = Context {
        precedence: i32::MAX,
        right: false,
        right_associative: false,
    };

    pub fn left_of(precedence: i32, right_associative: bool) -> Self {
        Self {
            precedence,
            right: false,
            right_associative,
        }
    }

    pub fn right_of(precedence: i32, right_associative: bool) -> Self {
        Self {
            precedence,
            right: true,
            right_associative,
        }
    }
}

/// Whether an operator binding with `precedence` must be parenthesised in
/// `context`.
pub fn needs_parens(precedence: i32, context: Context) -> bool {
    if precedence != context.precedence {
        return precedence < context.precedence;
    }
    context.right != context.right_associative
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether two adjacent tokens ending in `prev` and starting with `next`
/// must be separated to lex as two tokens.
pub fn needs_space(prev: char, next: char) -> bool {
    (is_word_char(prev) && is_word_char(next))
        || (prev == next && matches!(prev, '-' | '+' | '/'))
        || (prev.is_ascii_digit() && next == '.')
}

/// Append `token`, inserting a single space only where lexing requires it.
pub fn push_token(out: &mut String, token: &str) {
    if let (Some(prev), Some(next)) = (out.chars().next_back(), token.chars().next()) {
        if needs_space(prev, next) {
            out.push(' ');
        }
    }
    out.push_str(token);
}

/// Join tokens with the fewest separating spaces.
pub fn join_tokens<S: AsRef<str>>(tokens: impl IntoIterator<Item = S>) -> String {
    let mut out = String::new();
    for token in tokens {
        push_token(&mut out, token.as_ref());
    }
    out
}

/// Double-quoted literal with C-style escapes.
pub fn quote_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `index + 1`, folded when the index is a literal.
#[cfg(any(feature = "target-lua", feature = "target-nim"))]
pub(crate) fn one_based(index: Node) -> Node {
    match index.kind {
        NodeKind::IntegerLiteral { value } => Node::int(value + 1),
        kind => Node::binary_op(
            OpCode::Add,
            "+",
            OpCode::Add.default_precedence(),
            Node::new(kind),
            Node::int(1),
        ),
    }
}

/// Error for a variant marker or abstract operation met during emission.
pub(crate) fn unlowered(node: &Node) -> CompileError {
    match &node.kind {
        NodeKind::Op { op, .. } => CompileError::UnloweredNode(format!("Op({op})")),
        NodeKind::MutatingBinaryOp { op, .. } => {
            CompileError::UnloweredNode(format!("MutatingBinaryOp({op})"))
        }
        kind => CompileError::UnloweredNode(kind.name().to_string()),
    }
}

/// Error for a node a target has no syntax for.
pub(crate) fn unsupported(language: &str, node: &Node) -> CompileError {
    CompileError::UnsupportedNode {
        language: language.to_string(),
        kind: node.kind.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_tokens_spaces_only_between_words() {
        assert_eq!(join_tokens(["local", "x", "=", "1"]), "local x=1");
        assert_eq!(join_tokens(["print", "(", "x", ")"]), "print(x)");
        assert_eq!(join_tokens(["a", "-", "-1"]), "a- -1");
        assert_eq!(join_tokens(["1", "..", "x"]), "1 ..x");
        assert_eq!(join_tokens(["x", "..", "y"]), "x..y");
    }

    #[test]
    fn test_parenthesisation() {
        // (a + b) * c
        assert!(needs_parens(100, Context::left_of(110, false)));
        // a * b + c
        assert!(!needs_parens(110, Context::left_of(100, false)));
        // a - (b - c)
        assert!(needs_parens(100, Context::right_of(100, false)));
        // (a - b) - c
        assert!(!needs_parens(100, Context::left_of(100, false)));
        // a ^ b ^ c groups right
        assert!(!needs_parens(130, Context::right_of(130, true)));
        assert!(needs_parens(130, Context::left_of(130, true)));
        assert!(!needs_parens(10, Context::TOP));
        assert!(needs_parens(120, Context::ATOM));
    }

    #[test]
    fn test_quote_text() {
        assert_eq!(quote_text("hi"), "\"hi\"");
        assert_eq!(quote_text("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
    }
}
