use crate::error::CompileError;
use crate::ir::{Node, NodeKind, OpCode};
use crate::traits::Plugin;
use crate::traverse::{Path, Visitor};
use num_bigint::BigInt;

/// Replaces collection getters and setters with target indexing syntax.
///
/// `array_get(a, i)` becomes `a[i]` and `array_set(a, i, v)` becomes
/// `a[i] = v`. For one-indexed targets, array and list indices are shifted
/// by one; table keys never are.
#[derive(Debug, Clone, Copy, Default)]
pub struct UseIndexCalls {
    pub one_indexed: bool,
}

impl UseIndexCalls {
    pub fn zero_indexed() -> Self {
        Self { one_indexed: false }
    }

    pub fn one_indexed() -> Self {
        Self { one_indexed: true }
    }
}

impl Plugin for UseIndexCalls {
    fn name(&self) -> &'static str {
        "use_index_calls"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(*self)
    }
}

impl Visitor for UseIndexCalls {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        let accessor = match &path.node().kind {
            NodeKind::ArrayGet { .. } => OpCode::ArrayGet,
            NodeKind::ListGet { .. } => OpCode::ListGet,
            NodeKind::TableGet { .. } => OpCode::TableGet,
            NodeKind::ArraySet { .. } => OpCode::ArraySet,
            NodeKind::ListSet { .. } => OpCode::ListSet,
            NodeKind::TableSet { .. } => OpCode::TableSet,
            NodeKind::Op { op, .. } if is_accessor(*op) => *op,
            _ => return Ok(()),
        };
        let one_indexed = self.one_indexed;
        path.replace_with_map(|node| {
            let operands = accessor_operands(node.kind);
            let mut operands = operands.into_iter();
            let (Some(collection), Some(index)) = (operands.next(), operands.next()) else {
                return Node::block(Vec::new());
            };
            let shift = one_indexed && !matches!(accessor, OpCode::TableGet | OpCode::TableSet);
            let index = if shift { plus_one(index) } else { index };
            let mut call = Node::index_call(collection, index, one_indexed);
            call.tag_op(getter_of(accessor));
            match operands.next() {
                Some(value) => Node::assignment(call, value),
                None => call,
            }
        });
        Ok(())
    }
}

fn is_accessor(op: OpCode) -> bool {
    matches!(
        op,
        OpCode::ArrayGet
            | OpCode::ListGet
            | OpCode::TableGet
            | OpCode::ArraySet
            | OpCode::ListSet
            | OpCode::TableSet
    )
}

fn getter_of(op: OpCode) -> OpCode {
    match op {
        OpCode::ArraySet => OpCode::ArrayGet,
        OpCode::ListSet => OpCode::ListGet,
        OpCode::TableSet => OpCode::TableGet,
        other => other,
    }
}

/// Collection, index and (for setters) value, in that order.
fn accessor_operands(kind: NodeKind) -> Vec<Node> {
    match kind {
        NodeKind::ArrayGet { array, index } => vec![*array, *index],
        NodeKind::ListGet { list, index } => vec![*list, *index],
        NodeKind::TableGet { table, key } => vec![*table, *key],
        NodeKind::ArraySet {
            array,
            index,
            value,
        } => vec![*array, *index, *value],
        NodeKind::ListSet { list, index, value } => vec![*list, *index, *value],
        NodeKind::TableSet { table, key, value } => vec![*table, *key, *value],
        NodeKind::Op { args, .. } => args,
        _ => Vec::new(),
    }
}

fn plus_one(index: Node) -> Node {
    match index.kind {
        NodeKind::IntegerLiteral { value } => Node::int(value + BigInt::from(1)),
        kind => Node::op(OpCode::Add, vec![Node::new(kind), Node::int(1)]),
    }
}
