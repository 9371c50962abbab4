//! Loop lowering.

use crate::error::CompileError;
use crate::ir::{Node, NodeKind, OpCode};
use crate::traits::Plugin;
use crate::traverse::{Path, Visitor};

/// `for i in [low, high)` becomes `for (i = low; i < high; i = i + 1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForRangeToForCLike;

/// `for i in [low, high)` becomes `for i = low, high - 1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UseInclusiveForRange;

impl Plugin for ForRangeToForCLike {
    fn name(&self) -> &'static str {
        "for_range_to_for_c_like"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(LowerRange(to_c_like))
    }
}

impl Plugin for UseInclusiveForRange {
    fn name(&self) -> &'static str {
        "use_inclusive_for_range"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(LowerRange(to_inclusive))
    }
}

/// Rewrites `ForRange` nodes post-order so nested loops are lowered in the same walk.
struct LowerRange(fn(Node, Node, Node, Node) -> Node);

impl Visitor for LowerRange {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        if !matches!(path.node().kind, NodeKind::ForRange { .. }) {
            return Ok(());
        }
        let lower = self.0;
        path.replace_with_map(|node| match node.kind {
            NodeKind::ForRange {
                variable,
                low,
                high,
                body,
            } => lower(*variable, *low, *high, *body),
            kind => Node::new(kind),
        });
        Ok(())
    }
}

fn to_c_like(variable: Node, low: Node, high: Node, body: Node) -> Node {
    let step = Node::assignment(
        variable.clone(),
        Node::op(OpCode::Add, vec![variable.clone(), Node::int(1)]),
    );
    Node::for_c_like(
        Node::assignment(variable.clone(), low),
        Node::op(OpCode::Lt, vec![variable, high]),
        step,
        body,
    )
}

fn to_inclusive(variable: Node, low: Node, high: Node, body: Node) -> Node {
    let last = Node::op(OpCode::Sub, vec![high, Node::int(1)]);
    Node::for_range_inclusive(variable, low, last, None, body)
}
