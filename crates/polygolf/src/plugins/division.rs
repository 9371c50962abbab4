//! Division and modulo specialisation.
//!
//! Floor division and modulo agree with their truncating counterparts when
//! both operands are non-negative. Many targets only have the truncating
//! forms, or spell them shorter.

use crate::error::CompileError;
use crate::ir::{Node, NodeKind, OpCode};
use crate::traits::Plugin;
use crate::traverse::{Path, Visitor};
use num_traits::Signed;

/// `mod` becomes `rem` when both operands are known non-negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModToRem;

/// `div` becomes `trunc_div` when both operands are known non-negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct DivToTruncDiv;

/// Spells truncating division and remainder of non-negative operands with
/// the unsigned operators `/%` and `%%`, for targets where those are shorter.
///
/// Runs after op mapping, on `BinaryOp`s tagged `trunc_div` or `rem`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UseUnsignedDivision;

impl Plugin for ModToRem {
    fn name(&self) -> &'static str {
        "mod_to_rem"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(Specialise {
            from: OpCode::Mod,
            to: OpCode::Rem,
        })
    }
}

impl Plugin for DivToTruncDiv {
    fn name(&self) -> &'static str {
        "div_to_trunc_div"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(Specialise {
            from: OpCode::Div,
            to: OpCode::TruncDiv,
        })
    }
}

impl Plugin for UseUnsignedDivision {
    fn name(&self) -> &'static str {
        "use_unsigned_division"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(*self)
    }
}

impl Visitor for UseUnsignedDivision {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        let NodeKind::BinaryOp {
            op, left, right, ..
        } = &path.node().kind
        else {
            return Ok(());
        };
        let unsigned = match op {
            OpCode::TruncDiv => "/%",
            OpCode::Rem => "%%",
            _ => return Ok(()),
        };
        if !(is_non_negative(path, left) && is_non_negative(path, right)) {
            return Ok(());
        }
        if let NodeKind::BinaryOp { name, .. } = &mut path.node_mut().kind {
            *name = unsigned.to_string();
        }
        Ok(())
    }
}

fn is_non_negative(path: &Path<'_>, node: &Node) -> bool {
    path.type_of(node).is_ok_and(|ty| {
        ty.as_integer()
            .and_then(|int| int.low())
            .is_some_and(|low| !low.is_negative())
    })
}

struct Specialise {
    from: OpCode,
    to: OpCode,
}

impl Visitor for Specialise {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        let NodeKind::Op { op, args } = &path.node().kind else {
            return Ok(());
        };
        if *op != self.from {
            return Ok(());
        }
        if args.iter().all(|arg| is_non_negative(path, arg)) {
            if let NodeKind::Op { op, .. } = &mut path.node_mut().kind {
                *op = self.to;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Node, Program, ValueType};
    use crate::traverse::visit;

    fn run(plugin: &dyn Plugin, op: OpCode, left: &str) -> OpCode {
        let mut program = Program::new(Node::block(vec![Node::op(
            op,
            vec![Node::id(left), Node::int(7)],
        )]))
        .with_variable("n", ValueType::int_range(0, 100))
        .with_variable("z", ValueType::int_range(-1, 100));
        visit(&mut program, plugin.visitor().as_mut()).unwrap();
        let NodeKind::Block { children } = &program.block.kind else {
            panic!("expected block");
        };
        children[0].kind.op().unwrap()
    }

    #[test]
    fn test_non_negative_operands_are_specialised() {
        assert_eq!(run(&ModToRem, OpCode::Mod, "n"), OpCode::Rem);
        assert_eq!(run(&DivToTruncDiv, OpCode::Div, "n"), OpCode::TruncDiv);
    }

    #[test]
    fn test_possibly_negative_operand_is_left_alone() {
        assert_eq!(run(&ModToRem, OpCode::Mod, "z"), OpCode::Mod);
        assert_eq!(run(&DivToTruncDiv, OpCode::Div, "z"), OpCode::Div);
    }

    fn unsigned_name(op: OpCode, left: &str) -> String {
        let mut program = Program::new(Node::block(vec![Node::binary_op(
            op,
            "div",
            op.default_precedence(),
            Node::id(left),
            Node::int(7),
        )]))
        .with_variable("n", ValueType::int_range(0, 100))
        .with_variable("z", ValueType::int_range(-1, 100));
        visit(&mut program, UseUnsignedDivision.visitor().as_mut()).unwrap();
        let NodeKind::Block { children } = &program.block.kind else {
            panic!("expected block");
        };
        match &children[0].kind {
            NodeKind::BinaryOp { name, .. } => name.clone(),
            other => panic!("expected binary op, got {}", other.name()),
        }
    }

    #[test]
    fn test_unsigned_operators_need_non_negative_operands() {
        assert_eq!(unsigned_name(OpCode::TruncDiv, "n"), "/%");
        assert_eq!(unsigned_name(OpCode::Rem, "n"), "%%");
        assert_eq!(unsigned_name(OpCode::TruncDiv, "z"), "div");
        assert_eq!(unsigned_name(OpCode::Add, "n"), "div");
    }
}
