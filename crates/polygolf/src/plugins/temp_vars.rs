use crate::error::CompileError;
use crate::ir::{Node, NodeKind};
use crate::traits::Plugin;
use crate::traverse::{Path, Visitor, walk_nodes};

/// Collapses a swap through a temporary into one multiple assignment:
/// `t = e; y = z; z = t` becomes `y, z = z, e`.
///
/// Only applies when `t` is not referenced anywhere else in the block.
#[derive(Debug, Clone, Copy, Default)]
pub struct TempVarToMultipleAssignment;

impl Plugin for TempVarToMultipleAssignment {
    fn name(&self) -> &'static str {
        "temp_var_to_multiple_assignment"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(TempVarVisitor)
    }
}

struct TempVarVisitor;

impl Visitor for TempVarVisitor {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        if let NodeKind::Block { children } = &mut path.node_mut().kind {
            collapse_swaps(children);
        }
        Ok(())
    }
}

fn collapse_swaps(children: &mut Vec<Node>) {
    let mut i = 0;
    while i + 2 < children.len() {
        if is_swap(children, i) {
            let mut removed: Vec<Node> = children.drain(i..i + 3).collect();
            let (Some(third), Some(second), Some(first)) =
                (removed.pop(), removed.pop(), removed.pop())
            else {
                return;
            };
            children.insert(i, merge(first, second, third));
        }
        i += 1;
    }
}

fn assignment_parts(node: &Node) -> Option<(&Node, &Node)> {
    match &node.kind {
        NodeKind::Assignment { variable, expr } => Some((variable, expr)),
        _ => None,
    }
}

fn is_swap(children: &[Node], i: usize) -> bool {
    let (Some((t, _)), Some((y, z)), Some((z2, t2))) = (
        assignment_parts(&children[i]),
        assignment_parts(&children[i + 1]),
        assignment_parts(&children[i + 2]),
    ) else {
        return false;
    };
    let (Some(t), Some(z), Some(z2), Some(t2)) = (
        t.identifier_name(),
        z.identifier_name(),
        z2.identifier_name(),
        t2.identifier_name(),
    ) else {
        return false;
    };
    if y.identifier_name().is_none() || z != z2 || t != t2 {
        return false;
    }

    // `t` must be dead outside the three statements.
    let mut uses = 0;
    for child in children {
        walk_nodes(child, &mut |n| {
            if n.identifier_name() == Some(t) {
                uses += 1;
            }
        });
    }
    uses == 2
}

fn merge(first: Node, second: Node, third: Node) -> Node {
    let (NodeKind::Assignment { expr: e, .. }, NodeKind::Assignment { variable: y, expr: z }) =
        (first.kind, second.kind)
    else {
        return third;
    };
    let NodeKind::Assignment { variable: z_var, .. } = third.kind else {
        return Node::many_to_many(vec![*y], vec![*z, *e]);
    };
    Node::many_to_many(vec![*y, *z_var], vec![*z, *e])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{OpCode, Program, ValueType};
    use crate::traverse::visit;

    fn fib_step() -> Vec<Node> {
        vec![
            Node::assignment(
                Node::id("t"),
                Node::op(OpCode::Add, vec![Node::id("a"), Node::id("b")]),
            ),
            Node::assignment(Node::id("b"), Node::id("a")),
            Node::assignment(Node::id("a"), Node::id("t")),
        ]
    }

    fn run(body: Vec<Node>) -> Node {
        let mut program = Program::new(Node::block(body)).with_variable("t", ValueType::int());
        let plugin = TempVarToMultipleAssignment;
        visit(&mut program, plugin.visitor().as_mut()).unwrap();
        program.block
    }

    #[test]
    fn test_swap_collapses() {
        let mut body = vec![Node::op(OpCode::Println, vec![Node::id("a")])];
        body.extend(fib_step());
        let out = run(body);
        assert_eq!(
            out,
            Node::block(vec![
                Node::op(OpCode::Println, vec![Node::id("a")]),
                Node::many_to_many(
                    vec![Node::id("b"), Node::id("a")],
                    vec![
                        Node::id("a"),
                        Node::op(OpCode::Add, vec![Node::id("a"), Node::id("b")]),
                    ],
                ),
            ])
        );
    }

    #[test]
    fn test_live_temporary_is_kept() {
        let mut body = fib_step();
        body.push(Node::op(OpCode::Println, vec![Node::id("t")]));
        let expected = Node::block(body.clone());
        assert_eq!(run(body), expected);
    }

    #[test]
    fn test_nested_blocks_are_rewritten() {
        let body = vec![Node::while_loop(Node::builtin("true"), Node::block(fib_step()))];
        let out = run(body);
        let NodeKind::Block { children } = &out.kind else {
            panic!("expected block");
        };
        let NodeKind::WhileLoop { body, .. } = &children[0].kind else {
            panic!("expected while loop");
        };
        assert!(matches!(
            &body.kind,
            NodeKind::Block { children } if children.len() == 1
                && matches!(children[0].kind, NodeKind::ManyToManyAssignment { .. })
        ));
    }
}
