//! Tree walking and in-place node replacement.
//!
//! [`visit`] walks a program's body pre-order, calling [`Visitor::enter`]
//! before a node's children and [`Visitor::exit`] after them. Each callback
//! receives a [`Path`]: the node, the slot it occupies in its parent, the
//! chain of ancestors above it and the program scope.
//!
//! A node replaced from `enter` is spliced in immediately but the walk does
//! not descend into the replacement, nor call `exit` for it. Seeing the new
//! subtree requires another top-level [`visit`].

use crate::error::CompileError;
use crate::infer;
use crate::ir::{Node, NodeKind, OpCode, Program, Scope, ValueType};
use indexmap::IndexSet;

/// Position of a node inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Field name in the parent node (`"children"`, `"condition"`, ...).
    pub field: &'static str,
    /// Index for list-valued fields.
    pub index: Option<usize>,
}

impl Slot {
    /// Slot of the program body.
    pub const ROOT: Slot = Slot::field("block");

    pub const fn field(field: &'static str) -> Self {
        Self { field, index: None }
    }

    pub const fn indexed(field: &'static str, index: usize) -> Self {
        Self {
            field,
            index: Some(index),
        }
    }
}

/// What a descendant can know about one of its ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub kind: &'static str,
    pub op: Option<OpCode>,
    /// Syntactic precedence, for nodes already spelled as operators.
    pub precedence: Option<i32>,
    /// Where the ancestor itself sits in its own parent.
    pub slot: Slot,
}

impl Frame {
    fn of(node: &Node, slot: Slot) -> Self {
        let precedence = match &node.kind {
            NodeKind::BinaryOp { precedence, .. } | NodeKind::UnaryOp { precedence, .. } => {
                Some(*precedence)
            }
            _ => None,
        };
        Self {
            kind: node.kind.name(),
            op: node.kind.op(),
            precedence,
            slot,
        }
    }
}

/// A node bound to its position in the tree, valid for one callback.
pub struct Path<'a> {
    node: &'a mut Node,
    slot: Slot,
    ancestors: &'a [Frame],
    scope: &'a mut Scope,
    replaced: bool,
}

impl<'a> Path<'a> {
    pub fn node(&self) -> &Node {
        self.node
    }

    /// Mutable access for in-place edits. Unlike [`Path::replace_with`] the
    /// walk continues into the edited node's children.
    pub fn node_mut(&mut self) -> &mut Node {
        self.node
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Splice `node` into this node's slot.
    pub fn replace_with(&mut self, node: Node) {
        *self.node = node;
        self.replaced = true;
    }

    /// Replace the node with a function of its old value.
    pub fn replace_with_map(&mut self, f: impl FnOnce(Node) -> Node) {
        let old = std::mem::replace(self.node, Node::block(Vec::new()));
        self.replace_with(f(old));
    }

    pub fn is_replaced(&self) -> bool {
        self.replaced
    }

    pub fn parent(&self) -> Option<&Frame> {
        self.ancestors.last()
    }

    /// Ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &Frame> {
        self.ancestors.iter().rev()
    }

    pub fn parent_is_block(&self) -> bool {
        self.parent().is_some_and(|p| p.kind == "Block")
    }

    /// Whether the node is in statement position.
    pub fn is_statement(&self) -> bool {
        self.parent().is_none_or(|p| {
            p.kind == "Block" || p.kind == "Variants" || self.slot.field == "body"
        })
    }

    pub fn scope(&self) -> &Scope {
        self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        self.scope
    }

    /// Value type of the current node.
    pub fn get_type(&self) -> Result<ValueType, CompileError> {
        infer::get_type(self.node, self.scope)
    }

    /// Value type of any node, resolved against this program's scope.
    pub fn type_of(&self, node: &Node) -> Result<ValueType, CompileError> {
        infer::get_type(node, self.scope)
    }
}

/// Callbacks invoked by [`visit`].
pub trait Visitor {
    fn enter(&mut self, _path: &mut Path<'_>) -> Result<(), CompileError> {
        Ok(())
    }

    fn exit(&mut self, _path: &mut Path<'_>) -> Result<(), CompileError> {
        Ok(())
    }
}

/// Walk the whole body of `program` with `visitor`.
pub fn visit(program: &mut Program, visitor: &mut dyn Visitor) -> Result<(), CompileError> {
    let Program { scope, block } = program;
    let mut ancestors = Vec::new();
    walk(block, Slot::ROOT, &mut ancestors, scope, visitor)
}

fn walk(
    node: &mut Node,
    slot: Slot,
    ancestors: &mut Vec<Frame>,
    scope: &mut Scope,
    visitor: &mut dyn Visitor,
) -> Result<(), CompileError> {
    let mut path = Path {
        node: &mut *node,
        slot,
        ancestors: ancestors.as_slice(),
        scope: &mut *scope,
        replaced: false,
    };
    visitor.enter(&mut path)?;
    if path.replaced {
        return Ok(());
    }

    ancestors.push(Frame::of(node, slot));
    for (child_slot, child) in children_mut(node) {
        walk(child, child_slot, ancestors, scope, visitor)?;
    }
    ancestors.pop();

    let mut path = Path {
        node,
        slot,
        ancestors: ancestors.as_slice(),
        scope,
        replaced: false,
    };
    visitor.exit(&mut path)
}

/// Direct children of `node` in source order.
pub fn children(node: &Node) -> Vec<(Slot, &Node)> {
    use NodeKind::*;
    fn one<'n>(field: &'static str, n: &'n Node) -> (Slot, &'n Node) {
        (Slot::field(field), n)
    }
    fn many<'n>(field: &'static str, ns: &'n [Node]) -> Vec<(Slot, &'n Node)> {
        ns.iter()
            .enumerate()
            .map(|(i, n)| (Slot::indexed(field, i), n))
            .collect()
    }
    match &node.kind {
        Block { children } => many("children", children),
        Variants { alternatives } => many("alternatives", alternatives),
        WhileLoop { condition, body } => vec![one("condition", condition), one("body", body)],
        IfStatement {
            condition,
            consequent,
            alternate,
        } => {
            let mut out = vec![one("condition", condition), one("consequent", consequent)];
            if let Some(alt) = alternate {
                out.push(one("alternate", alt));
            }
            out
        }
        ForRange {
            variable,
            low,
            high,
            body,
        } => vec![
            one("variable", variable),
            one("low", low),
            one("high", high),
            one("body", body),
        ],
        ForRangeInclusive {
            variable,
            low,
            high,
            step,
            body,
        } => {
            let mut out = vec![one("variable", variable), one("low", low), one("high", high)];
            if let Some(step) = step {
                out.push(one("step", step));
            }
            out.push(one("body", body));
            out
        }
        ForCLike {
            init,
            condition,
            append,
            body,
        } => vec![
            one("init", init),
            one("condition", condition),
            one("append", append),
            one("body", body),
        ],
        ForEach {
            variable,
            collection,
            body,
        } => vec![
            one("variable", variable),
            one("collection", collection),
            one("body", body),
        ],
        ForEachKey {
            variable,
            table,
            body,
        } => vec![one("variable", variable), one("table", table), one("body", body)],
        ForEachPair {
            key_variable,
            value_variable,
            table,
            body,
        } => vec![
            one("key_variable", key_variable),
            one("value_variable", value_variable),
            one("table", table),
            one("body", body),
        ],
        Identifier { .. } | IntegerLiteral { .. } | TextLiteral { .. } => Vec::new(),
        Assignment { variable, expr } => vec![one("variable", variable), one("expr", expr)],
        ManyToManyAssignment { variables, exprs } => {
            let mut out = many("variables", variables);
            out.extend(many("exprs", exprs));
            out
        }
        OneToManyAssignment { variables, expr } => {
            let mut out = many("variables", variables);
            out.push(one("expr", expr));
            out
        }
        MutatingBinaryOp {
            variable, right, ..
        } => vec![one("variable", variable), one("right", right)],
        VarDeclarationWithAssignment { assignment } => vec![one("assignment", assignment)],
        Op { args, .. } | FunctionCall { args, .. } => many("args", args),
        BinaryOp { left, right, .. } => vec![one("left", left), one("right", right)],
        UnaryOp { arg, .. } => vec![one("arg", arg)],
        MethodCall { object, args, .. } => {
            let mut out = vec![one("object", object)];
            out.extend(many("args", args));
            out
        }
        IndexCall {
            collection, index, ..
        } => vec![one("collection", collection), one("index", index)],
        ConditionalOp {
            condition,
            consequent,
            alternate,
        } => vec![
            one("condition", condition),
            one("consequent", consequent),
            one("alternate", alternate),
        ],
        ArrayConstructor { exprs } | ListConstructor { exprs } => many("exprs", exprs),
        ArrayGet { array, index } => vec![one("array", array), one("index", index)],
        ArraySet {
            array,
            index,
            value,
        } => vec![one("array", array), one("index", index), one("value", value)],
        ListGet { list, index } => vec![one("list", list), one("index", index)],
        ListSet { list, index, value } => {
            vec![one("list", list), one("index", index), one("value", value)]
        }
        ListPush { list, value } => vec![one("list", list), one("value", value)],
        TableGet { table, key } => vec![one("table", table), one("key", key)],
        TableSet { table, key, value } => {
            vec![one("table", table), one("key", key), one("value", value)]
        }
        TextGetByte { text, index } => vec![one("text", text), one("index", index)],
    }
}

/// Mutable counterpart of [`children`], same order and slots.
pub fn children_mut(node: &mut Node) -> Vec<(Slot, &mut Node)> {
    use NodeKind::*;
    fn one<'n>(field: &'static str, n: &'n mut Node) -> (Slot, &'n mut Node) {
        (Slot::field(field), n)
    }
    fn many<'n>(field: &'static str, ns: &'n mut [Node]) -> Vec<(Slot, &'n mut Node)> {
        ns.iter_mut()
            .enumerate()
            .map(|(i, n)| (Slot::indexed(field, i), n))
            .collect()
    }
    match &mut node.kind {
        Block { children } => many("children", children),
        Variants { alternatives } => many("alternatives", alternatives),
        WhileLoop { condition, body } => vec![one("condition", condition), one("body", body)],
        IfStatement {
            condition,
            consequent,
            alternate,
        } => {
            let mut out = vec![one("condition", condition), one("consequent", consequent)];
            if let Some(alt) = alternate {
                out.push(one("alternate", alt));
            }
            out
        }
        ForRange {
            variable,
            low,
            high,
            body,
        } => vec![
            one("variable", variable),
            one("low", low),
            one("high", high),
            one("body", body),
        ],
        ForRangeInclusive {
            variable,
            low,
            high,
            step,
            body,
        } => {
            let mut out = vec![one("variable", variable), one("low", low), one("high", high)];
            if let Some(step) = step {
                out.push(one("step", step));
            }
            out.push(one("body", body));
            out
        }
        ForCLike {
            init,
            condition,
            append,
            body,
        } => vec![
            one("init", init),
            one("condition", condition),
            one("append", append),
            one("body", body),
        ],
        ForEach {
            variable,
            collection,
            body,
        } => vec![
            one("variable", variable),
            one("collection", collection),
            one("body", body),
        ],
        ForEachKey {
            variable,
            table,
            body,
        } => vec![one("variable", variable), one("table", table), one("body", body)],
        ForEachPair {
            key_variable,
            value_variable,
            table,
            body,
        } => vec![
            one("key_variable", key_variable),
            one("value_variable", value_variable),
            one("table", table),
            one("body", body),
        ],
        Identifier { .. } | IntegerLiteral { .. } | TextLiteral { .. } => Vec::new(),
        Assignment { variable, expr } => vec![one("variable", variable), one("expr", expr)],
        ManyToManyAssignment { variables, exprs } => {
            let mut out = many("variables", variables);
            out.extend(many("exprs", exprs));
            out
        }
        OneToManyAssignment { variables, expr } => {
            let mut out = many("variables", variables);
            out.push(one("expr", expr));
            out
        }
        MutatingBinaryOp {
            variable, right, ..
        } => vec![one("variable", variable), one("right", right)],
        VarDeclarationWithAssignment { assignment } => vec![one("assignment", assignment)],
        Op { args, .. } | FunctionCall { args, .. } => many("args", args),
        BinaryOp { left, right, .. } => vec![one("left", left), one("right", right)],
        UnaryOp { arg, .. } => vec![one("arg", arg)],
        MethodCall { object, args, .. } => {
            let mut out = vec![one("object", object)];
            out.extend(many("args", args));
            out
        }
        IndexCall {
            collection, index, ..
        } => vec![one("collection", collection), one("index", index)],
        ConditionalOp {
            condition,
            consequent,
            alternate,
        } => vec![
            one("condition", condition),
            one("consequent", consequent),
            one("alternate", alternate),
        ],
        ArrayConstructor { exprs } | ListConstructor { exprs } => many("exprs", exprs),
        ArrayGet { array, index } => vec![one("array", array), one("index", index)],
        ArraySet {
            array,
            index,
            value,
        } => vec![one("array", array), one("index", index), one("value", value)],
        ListGet { list, index } => vec![one("list", list), one("index", index)],
        ListSet { list, index, value } => {
            vec![one("list", list), one("index", index), one("value", value)]
        }
        ListPush { list, value } => vec![one("list", list), one("value", value)],
        TableGet { table, key } => vec![one("table", table), one("key", key)],
        TableSet { table, key, value } => {
            vec![one("table", table), one("key", key), one("value", value)]
        }
        TextGetByte { text, index } => vec![one("text", text), one("index", index)],
    }
}

/// Call `f` on `node` and every descendant, pre-order.
pub fn walk_nodes<'n>(node: &'n Node, f: &mut impl FnMut(&'n Node)) {
    f(node);
    for (_, child) in children(node) {
        walk_nodes(child, f);
    }
}

/// Distinct non-builtin identifier names in `node`, in first-encountered order.
pub fn used_identifiers(node: &Node) -> IndexSet<String> {
    let mut names = IndexSet::new();
    walk_nodes(node, &mut |n| {
        if let Some(name) = n.identifier_name() {
            if !names.contains(name) {
                names.insert(name.to_string());
            }
        }
    });
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fib_body() -> Node {
        Node::block(vec![
            Node::assignment(Node::id("a"), Node::int(0)),
            Node::while_loop(
                Node::op(OpCode::Lt, vec![Node::id("i"), Node::int(32)]),
                Node::block(vec![
                    Node::op(OpCode::Println, vec![Node::id("a")]),
                    Node::assignment(
                        Node::id("t"),
                        Node::op(OpCode::Add, vec![Node::id("a"), Node::id("b")]),
                    ),
                ]),
            ),
        ])
    }

    #[test]
    fn test_used_identifiers_in_first_encounter_order() {
        let mut body = fib_body();
        if let NodeKind::Block { children } = &mut body.kind {
            children.push(Node::assignment(Node::id("a"), Node::builtin("true")));
        }
        let names: Vec<_> = used_identifiers(&body).into_iter().collect();
        assert_eq!(names, ["a", "i", "t", "b"]);
    }

    struct Recorder(Vec<String>);

    impl Visitor for Recorder {
        fn enter(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
            self.0.push(format!("+{}", path.node().kind.name()));
            Ok(())
        }

        fn exit(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
            self.0.push(format!("-{}", path.node().kind.name()));
            Ok(())
        }
    }

    #[test]
    fn test_enter_and_exit_order() {
        let mut program = Program::new(Node::block(vec![Node::assignment(
            Node::id("x"),
            Node::int(1),
        )]));
        let mut recorder = Recorder(Vec::new());
        visit(&mut program, &mut recorder).unwrap();
        assert_eq!(
            recorder.0,
            [
                "+Block",
                "+Assignment",
                "+Identifier",
                "-Identifier",
                "+IntegerLiteral",
                "-IntegerLiteral",
                "-Assignment",
                "-Block",
            ]
        );
    }

    struct ReplaceInts {
        entered: usize,
    }

    impl Visitor for ReplaceInts {
        fn enter(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
            self.entered += 1;
            if matches!(path.node().kind, NodeKind::IntegerLiteral { .. }) {
                // The replacement has a child integer literal that must not be visited.
                path.replace_with(Node::op(OpCode::Neg, vec![Node::int(7)]));
            }
            Ok(())
        }
    }

    #[test]
    fn test_replacement_is_not_reentered() {
        let mut program = Program::new(Node::block(vec![Node::assignment(
            Node::id("x"),
            Node::int(1),
        )]));
        let mut visitor = ReplaceInts { entered: 0 };
        visit(&mut program, &mut visitor).unwrap();
        assert_eq!(visitor.entered, 4);
        assert_eq!(
            program.block,
            Node::block(vec![Node::assignment(
                Node::id("x"),
                Node::op(OpCode::Neg, vec![Node::int(7)])
            )])
        );

        // A second walk sees the new subtree.
        let mut again = ReplaceInts { entered: 0 };
        visit(&mut program, &mut again).unwrap();
        assert_eq!(again.entered, 5);
    }

    struct ParentKinds(Vec<(String, Option<&'static str>, bool)>);

    impl Visitor for ParentKinds {
        fn enter(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
            if let Some(name) = path.node().identifier_name() {
                self.0.push((
                    name.to_string(),
                    path.parent().map(|p| p.kind),
                    path.parent_is_block(),
                ));
            }
            Ok(())
        }
    }

    #[test]
    fn test_parent_queries() {
        let mut program = Program::new(Node::block(vec![
            Node::id("s"),
            Node::binary_op(OpCode::Add, "+", 100, Node::id("l"), Node::int(1)),
        ]));
        let mut visitor = ParentKinds(Vec::new());
        visit(&mut program, &mut visitor).unwrap();
        assert_eq!(
            visitor.0,
            [
                ("s".to_string(), Some("Block"), true),
                ("l".to_string(), Some("BinaryOp"), false),
            ]
        );
    }

    #[test]
    fn test_children_and_children_mut_agree() {
        let mut body = fib_body();
        let slots: Vec<Slot> = children(&body).into_iter().map(|(s, _)| s).collect();
        let slots_mut: Vec<Slot> = children_mut(&mut body).into_iter().map(|(s, _)| s).collect();
        assert_eq!(slots, slots_mut);
        assert_eq!(slots[1], Slot::indexed("children", 1));
    }
}
