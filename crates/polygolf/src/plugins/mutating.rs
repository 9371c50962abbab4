//! Compound assignment (`x += y`) introduction and removal.

use crate::error::CompileError;
use crate::ir::{Node, NodeKind, OpCode};
use crate::traits::Plugin;
use crate::traverse::{Path, Visitor};

/// Opcodes that commonly have a compound-assignment form.
const MUTATING_OPS: &[OpCode] = &[
    OpCode::Add,
    OpCode::Sub,
    OpCode::Mul,
    OpCode::Div,
    OpCode::TruncDiv,
    OpCode::Mod,
    OpCode::Rem,
    OpCode::BitAnd,
    OpCode::BitOr,
    OpCode::BitXor,
    OpCode::TextConcat,
];

/// `x = x op y` (or `x = y op x` for commutative `op`) becomes `x op= y`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddMutatingBinaryOp;

/// `x op= y` becomes `x = x op y`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveMutatingBinaryOp;

impl Plugin for AddMutatingBinaryOp {
    fn name(&self) -> &'static str {
        "add_mutating_binary_op"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(*self)
    }
}

impl Plugin for RemoveMutatingBinaryOp {
    fn name(&self) -> &'static str {
        "remove_mutating_binary_op"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(*self)
    }
}

impl Visitor for AddMutatingBinaryOp {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        let NodeKind::Assignment { variable, expr } = &path.node().kind else {
            return Ok(());
        };
        let (Some(name), NodeKind::Op { op, args }) = (variable.identifier_name(), &expr.kind)
        else {
            return Ok(());
        };
        if !MUTATING_OPS.contains(op) || args.len() != 2 {
            return Ok(());
        }
        let target_side = if args[0].identifier_name() == Some(name) {
            0
        } else if args[1].identifier_name() == Some(name) && op.flip() == Some(*op) {
            1
        } else {
            return Ok(());
        };
        let op = *op;

        path.replace_with_map(|node| match node.kind {
            NodeKind::Assignment { variable, expr } => match expr.kind {
                NodeKind::Op { mut args, .. } => {
                    let right = args.swap_remove(1 - target_side);
                    Node::mutating_op(op, *variable, right)
                }
                kind => Node::assignment(*variable, Node::new(kind)),
            },
            kind => Node::new(kind),
        });
        Ok(())
    }
}

impl Visitor for RemoveMutatingBinaryOp {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        if !matches!(path.node().kind, NodeKind::MutatingBinaryOp { .. }) {
            return Ok(());
        }
        path.replace_with_map(|node| match node.kind {
            NodeKind::MutatingBinaryOp {
                op,
                variable,
                right,
                ..
            } => Node::assignment(
                (*variable).clone(),
                Node::op(op, vec![*variable, *right]),
            ),
            kind => Node::new(kind),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Program;
    use crate::traverse::visit;

    fn run(plugin: &dyn Plugin, stmt: Node) -> Node {
        let mut program = Program::new(Node::block(vec![stmt]));
        visit(&mut program, plugin.visitor().as_mut()).unwrap();
        program.block
    }

    #[test]
    fn test_add_mutating_on_left_operand() {
        let stmt = Node::assignment(
            Node::id("x"),
            Node::op(OpCode::Sub, vec![Node::id("x"), Node::int(2)]),
        );
        assert_eq!(
            run(&AddMutatingBinaryOp, stmt),
            Node::block(vec![Node::mutating_op(OpCode::Sub, Node::id("x"), Node::int(2))])
        );
    }

    #[test]
    fn test_add_mutating_uses_commutativity() {
        let commutative = Node::assignment(
            Node::id("x"),
            Node::op(OpCode::Mul, vec![Node::int(3), Node::id("x")]),
        );
        assert_eq!(
            run(&AddMutatingBinaryOp, commutative),
            Node::block(vec![Node::mutating_op(OpCode::Mul, Node::id("x"), Node::int(3))])
        );

        let not_commutative = Node::assignment(
            Node::id("x"),
            Node::op(OpCode::Sub, vec![Node::int(3), Node::id("x")]),
        );
        assert_eq!(
            run(&AddMutatingBinaryOp, not_commutative.clone()),
            Node::block(vec![not_commutative])
        );
    }

    #[test]
    fn test_remove_mutating() {
        let stmt = Node::mutating_op(OpCode::Add, Node::id("x"), Node::int(1));
        assert_eq!(
            run(&RemoveMutatingBinaryOp, stmt),
            Node::block(vec![Node::assignment(
                Node::id("x"),
                Node::op(OpCode::Add, vec![Node::id("x"), Node::int(1)]),
            )])
        );
    }
}
