use crate::error::CompileError;
use crate::ir::{Node, NodeKind, OpCode};
use crate::traits::Plugin;
use crate::traverse::{Path, Visitor};

/// Folds operations with a statically known result.
///
/// An operation whose inferred type is a single integer becomes that
/// integer literal; `text_concat` of two text literals becomes one literal.
/// Runs post-order, so folds cascade upwards in a single walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalStaticExpr;

impl Plugin for EvalStaticExpr {
    fn name(&self) -> &'static str {
        "eval_static_expr"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(*self)
    }
}

impl Visitor for EvalStaticExpr {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        let node = path.node();
        let Some(op) = node.kind.op() else {
            return Ok(());
        };
        if matches!(node.kind, NodeKind::MutatingBinaryOp { .. }) {
            return Ok(());
        }

        // Operands of unknown type simply mean there is nothing to fold.
        let value = path
            .get_type()
            .ok()
            .and_then(|ty| ty.as_integer().and_then(|int| int.singleton().cloned()));
        if let Some(value) = value {
            path.replace_with(Node::int(value));
            return Ok(());
        }

        if op == OpCode::TextConcat {
            if let Some(text) = concat_literals(path.node()) {
                path.replace_with(Node::text(text));
            }
        }
        Ok(())
    }
}

/// Offers a list of text literals in a second spelling: one delimited text
/// literal split at runtime (`["a", "b"]` becomes `split("a b")`).
///
/// The list is replaced by a variant marker holding both spellings, so it
/// belongs in a target's golf stage, before variant expansion. Lists
/// containing an empty text are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct GolfStringListLiteral;

impl Plugin for GolfStringListLiteral {
    fn name(&self) -> &'static str {
        "golf_string_list_literal"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(*self)
    }
}

impl Visitor for GolfStringListLiteral {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        if path.parent().is_some_and(|p| p.kind == "Variants") {
            return Ok(());
        }
        let NodeKind::ListConstructor { exprs } = &path.node().kind else {
            return Ok(());
        };
        let Some(strings) = exprs
            .iter()
            .map(|expr| match &expr.kind {
                NodeKind::TextLiteral { value } if !value.is_empty() => Some(value.as_str()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
        else {
            return Ok(());
        };
        if strings.is_empty() {
            return Ok(());
        }

        let delimiter = delimiter(&strings);
        let joined = Node::text(strings.join(&delimiter));
        let split = if delimiter == " " {
            Node::op(OpCode::TextSplitWhitespace, vec![joined])
        } else {
            Node::op(OpCode::TextSplit, vec![joined, Node::text(delimiter)])
        };
        path.replace_with_map(|list| Node::variants(vec![list, split]));
        Ok(())
    }
}

/// A space when no item contains whitespace, else the first printable ASCII
/// character no item contains, else the smallest absent decimal number.
fn delimiter(strings: &[&str]) -> String {
    let joined = strings.join(",");
    if !joined.chars().any(char::is_whitespace) {
        return " ".to_string();
    }
    if let Some(c) = (b'!'..=b'~').map(char::from).find(|c| !joined.contains(*c)) {
        return c.to_string();
    }
    let mut n = 0u64;
    loop {
        let candidate = n.to_string();
        if !joined.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn concat_literals(node: &Node) -> Option<String> {
    let (left, right) = match &node.kind {
        NodeKind::Op { args, .. } | NodeKind::FunctionCall { args, .. } if args.len() == 2 => {
            (&args[0], &args[1])
        }
        NodeKind::BinaryOp { left, right, .. } => (left.as_ref(), right.as_ref()),
        _ => return None,
    };
    match (&left.kind, &right.kind) {
        (NodeKind::TextLiteral { value: a }, NodeKind::TextLiteral { value: b }) => {
            Some(format!("{a}{b}"))
        }
        _ => None,
    }
}
