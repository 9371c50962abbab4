//! Binding abstract opcodes to target syntax.

use crate::error::CompileError;
use crate::ir::{Node, NodeKind, OpCode, Program};
use crate::target::{OpMap, OpTransform};
use crate::traits::Plugin;
use crate::traverse::{Path, Visitor, visit};

/// Rewrites every abstract operation (and every unspelled mutating
/// operator) according to an [`OpMap`].
///
/// Runs post-order, so a rewrite function always receives operands that are
/// already mapped.
#[derive(Debug, Clone)]
pub struct MapOps(pub OpMap);

impl Plugin for MapOps {
    fn name(&self) -> &'static str {
        "map_ops"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(OpMapper { op_map: &self.0 })
    }
}

/// Apply `op_map` to the whole program.
pub fn map_ops(program: &mut Program, op_map: &OpMap) -> Result<(), CompileError> {
    visit(program, &mut OpMapper { op_map })
}

struct OpMapper<'m> {
    op_map: &'m OpMap,
}

impl Visitor for OpMapper<'_> {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        match &path.node().kind {
            NodeKind::Op { op, .. } => {
                let op = *op;
                self.map_op(path, op)
            }
            NodeKind::MutatingBinaryOp { op, name, .. } if name.is_empty() => {
                let op = *op;
                self.map_mutating(path, op)
            }
            _ => Ok(()),
        }
    }
}

impl OpMapper<'_> {
    fn map_op(&self, path: &mut Path<'_>, op: OpCode) -> Result<(), CompileError> {
        let transform = self
            .op_map
            .get(op)
            .ok_or(CompileError::UnsupportedOperator(op))?;

        // Rewrites get their type eagerly; operator spellings keep it when known.
        let ty = match transform {
            OpTransform::Rewrite(_) => Some(path.get_type()?),
            _ => path.get_type().ok(),
        };

        let args = match &mut path.node_mut().kind {
            NodeKind::Op { args, .. } => std::mem::take(args),
            _ => return Ok(()),
        };
        if args.len() != op.arity() {
            return Err(CompileError::TypeMismatch(format!(
                "{op} expects {} operands, got {}",
                op.arity(),
                args.len()
            )));
        }

        let replacement = match transform {
            OpTransform::Token(token) => spell(op, token, op.default_precedence(), args)?,
            OpTransform::Precedence(token, precedence) => spell(op, token, *precedence, args)?,
            OpTransform::Rewrite(f) => {
                let mut node = f(args);
                node.tag_op(op);
                node
            }
        };
        path.replace_with(match ty {
            Some(ty) => replacement.with_value_type(ty),
            None => replacement,
        });
        Ok(())
    }

    fn map_mutating(&self, path: &mut Path<'_>, op: OpCode) -> Result<(), CompileError> {
        let transform = self
            .op_map
            .get(op)
            .ok_or(CompileError::UnsupportedOperator(op))?;
        match transform {
            OpTransform::Token(token) | OpTransform::Precedence(token, _) => {
                if let NodeKind::MutatingBinaryOp { name, .. } = &mut path.node_mut().kind {
                    *name = token.clone();
                }
            }
            OpTransform::Rewrite(f) => {
                // No compound form: fall back to `x = f(x, right)`.
                path.replace_with_map(|node| match node.kind {
                    NodeKind::MutatingBinaryOp {
                        variable, right, ..
                    } => {
                        let mut expr = f(vec![(*variable).clone(), *right]);
                        expr.tag_op(op);
                        Node::assignment(*variable, expr)
                    }
                    kind => Node::new(kind),
                });
            }
        }
        Ok(())
    }
}

fn spell(op: OpCode, token: &str, precedence: i32, args: Vec<Node>) -> Result<Node, CompileError> {
    let mut args = args.into_iter();
    match (op.arity(), args.next(), args.next()) {
        (0, _, _) => Ok(Node::builtin(token)),
        (1, Some(arg), _) => Ok(Node::unary_op(op, token, precedence, arg)),
        (2, Some(left), Some(right)) => Ok(Node::binary_op(op, token, precedence, left, right)),
        (arity, _, _) => Err(CompileError::OperatorArity { op, arity }),
    }
}
