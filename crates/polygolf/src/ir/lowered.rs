//! Structural check for fully lowered trees.

use super::{Node, NodeKind, Program};
use crate::error::CompileError;
use crate::traverse::walk_nodes;

/// First node, pre-order, that must not survive lowering: a variant marker
/// or an abstract operation.
pub fn find_unlowered(node: &Node) -> Option<&Node> {
    let mut found = None;
    walk_nodes(node, &mut |n| {
        if found.is_none() && matches!(n.kind, NodeKind::Variants { .. } | NodeKind::Op { .. }) {
            found = Some(n);
        }
    });
    found
}

/// Fail with [`CompileError::UnloweredNode`] if the program still contains
/// variant markers or abstract operations.
pub fn check_lowered(program: &Program) -> Result<(), CompileError> {
    match find_unlowered(&program.block) {
        Some(node) => Err(CompileError::UnloweredNode(describe(node))),
        None => Ok(()),
    }
}

fn describe(node: &Node) -> String {
    match &node.kind {
        NodeKind::Op { op, .. } => format!("Op({op})"),
        other => other.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::OpCode;

    #[test]
    fn test_lowered_program_passes() {
        let program = Program::new(Node::block(vec![Node::binary_op(
            OpCode::Add,
            "+",
            100,
            Node::int(1),
            Node::int(2),
        )]));
        assert_eq!(check_lowered(&program), Ok(()));
    }

    #[test]
    fn test_abstract_op_is_reported() {
        let program = Program::new(Node::block(vec![Node::call(
            "f",
            vec![Node::op(OpCode::Neg, vec![Node::int(1)])],
        )]));
        let err = check_lowered(&program).unwrap_err();
        assert_eq!(err, CompileError::UnloweredNode("Op(neg)".into()));
        assert!(err.is_internal());
    }

    #[test]
    fn test_variants_are_reported() {
        let program = Program::new(Node::block(vec![Node::variants(vec![
            Node::int(1),
            Node::int(2),
        ])]));
        assert_eq!(
            check_lowered(&program),
            Err(CompileError::UnloweredNode("Variants".into()))
        );
    }
}
