use crate::error::CompileError;
use crate::ir::{Node, NodeKind};
use crate::traits::Plugin;
use crate::traverse::{Path, Visitor};

/// Uniform function call syntax: `f(a, b)` becomes `a.f(b)`.
///
/// Calls whose first argument is an operator expression are left alone, as
/// are calls taking a single text literal, which some targets spell without
/// parentheses. Runs post-order so nested calls chain (`len(s(x))` becomes
/// `x.s.len`).
#[derive(Debug, Clone, Copy, Default)]
pub struct UseUfcs;

impl Plugin for UseUfcs {
    fn name(&self) -> &'static str {
        "use_ufcs"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(*self)
    }
}

impl Visitor for UseUfcs {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        let NodeKind::FunctionCall { args, .. } = &path.node().kind else {
            return Ok(());
        };
        let Some(first) = args.first() else {
            return Ok(());
        };
        let single_text = args.len() == 1 && matches!(first.kind, NodeKind::TextLiteral { .. });
        let operator = matches!(
            first.kind,
            NodeKind::BinaryOp { .. } | NodeKind::UnaryOp { .. }
        );
        if single_text || operator {
            return Ok(());
        }
        path.replace_with_map(|node| match node.kind {
            NodeKind::FunctionCall { name, mut args, op } => {
                let object = args.remove(0);
                let mut call = Node::method_call(object, name, args);
                if let Some(op) = op {
                    call.tag_op(op);
                }
                call
            }
            kind => Node::new(kind),
        });
        Ok(())
    }
}
