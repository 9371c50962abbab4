//! Language-neutral IR.
//!
//! A program is a tree of [`Node`]s under a [`Program`] root. Nodes are a
//! single closed sum type ([`NodeKind`]) covering statements, expressions,
//! abstract operations and variant markers; the tree imposes no shape rules
//! beyond what the consumers (type inference, plugins, emitters) expect.
//!
//! Every node carries a lazily computed value type. It is written at most
//! once and never changes afterwards; a node built to replace another starts
//! without one.

mod lowered;
mod opcodes;
mod types;

pub use lowered::{check_lowered, find_unlowered};
pub use opcodes::OpCode;
pub use types::{IntegerType, ValueType};

use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

/// Program root: declared variables, required dependencies and the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(flatten)]
    pub scope: Scope,
    pub block: Node,
}

/// The parts of a program that plugins grow while rewriting it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    /// Declared variables in declaration order.
    #[serde(default)]
    pub variables: IndexMap<String, ValueType>,
    /// Target-language dependencies (imports, usings) the program needs.
    #[serde(default)]
    pub dependencies: IndexSet<String>,
}

impl Program {
    pub fn new(block: Node) -> Self {
        Self {
            scope: Scope::default(),
            block,
        }
    }

    /// Builder-style variable declaration.
    pub fn with_variable(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        self.scope.declare(name, ty);
        self
    }
}

impl Scope {
    /// Declare (or redeclare) a variable.
    pub fn declare(&mut self, name: impl Into<String>, ty: ValueType) {
        self.variables.insert(name.into(), ty);
    }

    pub fn variable(&self, name: &str) -> Option<&ValueType> {
        self.variables.get(name)
    }

    pub fn add_dependency(&mut self, name: impl Into<String>) {
        self.dependencies.insert(name.into());
    }
}

/// An IR node together with its memoized value type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(skip)]
    value_type: OnceCell<ValueType>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

/// Every node shape the IR knows about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeKind {
    Block {
        children: Vec<Node>,
    },
    /// Alternative sub-trees; expanded into separate programs before compilation.
    Variants {
        alternatives: Vec<Node>,
    },
    WhileLoop {
        condition: Box<Node>,
        body: Box<Node>,
    },
    IfStatement {
        condition: Box<Node>,
        consequent: Box<Node>,
        #[serde(default)]
        alternate: Option<Box<Node>>,
    },
    /// `for variable in [low, high)`.
    ForRange {
        variable: Box<Node>,
        low: Box<Node>,
        high: Box<Node>,
        body: Box<Node>,
    },
    /// `for variable in [low, high]` stepping by `step` (1 when absent).
    ForRangeInclusive {
        variable: Box<Node>,
        low: Box<Node>,
        high: Box<Node>,
        #[serde(default)]
        step: Option<Box<Node>>,
        body: Box<Node>,
    },
    ForCLike {
        init: Box<Node>,
        condition: Box<Node>,
        append: Box<Node>,
        body: Box<Node>,
    },
    ForEach {
        variable: Box<Node>,
        collection: Box<Node>,
        body: Box<Node>,
    },
    ForEachKey {
        variable: Box<Node>,
        table: Box<Node>,
        body: Box<Node>,
    },
    ForEachPair {
        key_variable: Box<Node>,
        value_variable: Box<Node>,
        table: Box<Node>,
        body: Box<Node>,
    },
    /// A variable reference. Builtin identifiers name target-language
    /// entities (`true`, `args`) and are never renamed.
    Identifier {
        name: String,
        #[serde(default)]
        builtin: bool,
    },
    IntegerLiteral {
        #[serde(with = "bigint_serde")]
        value: BigInt,
    },
    TextLiteral {
        value: String,
    },
    Assignment {
        variable: Box<Node>,
        expr: Box<Node>,
    },
    /// `(a, b) = (x, y)`
    ManyToManyAssignment {
        variables: Vec<Node>,
        exprs: Vec<Node>,
    },
    /// `a = b = x`
    OneToManyAssignment {
        variables: Vec<Node>,
        expr: Box<Node>,
    },
    /// `a += x`. `name` is the target spelling of `op`, empty until mapped.
    MutatingBinaryOp {
        op: OpCode,
        #[serde(default)]
        name: String,
        variable: Box<Node>,
        right: Box<Node>,
    },
    /// `var a = x`, wrapping an [`NodeKind::Assignment`].
    VarDeclarationWithAssignment {
        assignment: Box<Node>,
    },
    /// Abstract operation, not yet bound to target syntax.
    Op {
        op: OpCode,
        args: Vec<Node>,
    },
    BinaryOp {
        op: OpCode,
        name: String,
        precedence: i32,
        left: Box<Node>,
        right: Box<Node>,
    },
    UnaryOp {
        op: OpCode,
        name: String,
        precedence: i32,
        arg: Box<Node>,
    },
    FunctionCall {
        name: String,
        args: Vec<Node>,
        #[serde(default)]
        op: Option<OpCode>,
    },
    MethodCall {
        object: Box<Node>,
        method: String,
        args: Vec<Node>,
        /// Property access (`s.Length`) rather than a call.
        #[serde(default)]
        property: bool,
        #[serde(default)]
        op: Option<OpCode>,
    },
    IndexCall {
        collection: Box<Node>,
        index: Box<Node>,
        #[serde(default)]
        one_indexed: bool,
        #[serde(default)]
        op: Option<OpCode>,
    },
    /// `condition ? consequent : alternate`
    ConditionalOp {
        condition: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    ArrayConstructor {
        exprs: Vec<Node>,
    },
    ListConstructor {
        exprs: Vec<Node>,
    },
    ArrayGet {
        array: Box<Node>,
        index: Box<Node>,
    },
    ArraySet {
        array: Box<Node>,
        index: Box<Node>,
        value: Box<Node>,
    },
    ListGet {
        list: Box<Node>,
        index: Box<Node>,
    },
    ListSet {
        list: Box<Node>,
        index: Box<Node>,
        value: Box<Node>,
    },
    ListPush {
        list: Box<Node>,
        value: Box<Node>,
    },
    TableGet {
        table: Box<Node>,
        key: Box<Node>,
    },
    TableSet {
        table: Box<Node>,
        key: Box<Node>,
        value: Box<Node>,
    },
    TextGetByte {
        text: Box<Node>,
        index: Box<Node>,
    },
}

impl NodeKind {
    /// Name of the node kind, as used in dependency maps and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Block { .. } => "Block",
            NodeKind::Variants { .. } => "Variants",
            NodeKind::WhileLoop { .. } => "WhileLoop",
            NodeKind::IfStatement { .. } => "IfStatement",
            NodeKind::ForRange { .. } => "ForRange",
            NodeKind::ForRangeInclusive { .. } => "ForRangeInclusive",
            NodeKind::ForCLike { .. } => "ForCLike",
            NodeKind::ForEach { .. } => "ForEach",
            NodeKind::ForEachKey { .. } => "ForEachKey",
            NodeKind::ForEachPair { .. } => "ForEachPair",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::IntegerLiteral { .. } => "IntegerLiteral",
            NodeKind::TextLiteral { .. } => "TextLiteral",
            NodeKind::Assignment { .. } => "Assignment",
            NodeKind::ManyToManyAssignment { .. } => "ManyToManyAssignment",
            NodeKind::OneToManyAssignment { .. } => "OneToManyAssignment",
            NodeKind::MutatingBinaryOp { .. } => "MutatingBinaryOp",
            NodeKind::VarDeclarationWithAssignment { .. } => "VarDeclarationWithAssignment",
            NodeKind::Op { .. } => "Op",
            NodeKind::BinaryOp { .. } => "BinaryOp",
            NodeKind::UnaryOp { .. } => "UnaryOp",
            NodeKind::FunctionCall { .. } => "FunctionCall",
            NodeKind::MethodCall { .. } => "MethodCall",
            NodeKind::IndexCall { .. } => "IndexCall",
            NodeKind::ConditionalOp { .. } => "ConditionalOp",
            NodeKind::ArrayConstructor { .. } => "ArrayConstructor",
            NodeKind::ListConstructor { .. } => "ListConstructor",
            NodeKind::ArrayGet { .. } => "ArrayGet",
            NodeKind::ArraySet { .. } => "ArraySet",
            NodeKind::ListGet { .. } => "ListGet",
            NodeKind::ListSet { .. } => "ListSet",
            NodeKind::ListPush { .. } => "ListPush",
            NodeKind::TableGet { .. } => "TableGet",
            NodeKind::TableSet { .. } => "TableSet",
            NodeKind::TextGetByte { .. } => "TextGetByte",
        }
    }

    /// The opcode a node is tagged with, if any.
    pub fn op(&self) -> Option<OpCode> {
        match self {
            NodeKind::Op { op, .. }
            | NodeKind::BinaryOp { op, .. }
            | NodeKind::UnaryOp { op, .. }
            | NodeKind::MutatingBinaryOp { op, .. } => Some(*op),
            NodeKind::FunctionCall { op, .. }
            | NodeKind::MethodCall { op, .. }
            | NodeKind::IndexCall { op, .. } => *op,
            _ => None,
        }
    }
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            value_type: OnceCell::new(),
        }
    }

    /// The memoized value type, if it has been computed.
    pub fn value_type(&self) -> Option<&ValueType> {
        self.value_type.get()
    }

    /// Attach a precomputed value type. A type that is already set wins.
    pub fn with_value_type(self, ty: ValueType) -> Self {
        let _ = self.value_type.set(ty);
        self
    }

    pub(crate) fn cache_value_type(&self, ty: ValueType) {
        let _ = self.value_type.set(ty);
    }

    /// Whether this is an abstract operation awaiting an op mapping.
    pub fn is_abstract_op(&self) -> bool {
        matches!(self.kind, NodeKind::Op { .. })
    }

    pub fn is_variants(&self) -> bool {
        matches!(self.kind, NodeKind::Variants { .. })
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, NodeKind::Block { .. })
    }

    /// Name of a non-builtin identifier.
    pub fn identifier_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier {
                name,
                builtin: false,
            } => Some(name),
            _ => None,
        }
    }

    /// Tag a target-level replacement with the opcode it implements.
    pub fn tag_op(&mut self, tag: OpCode) {
        match &mut self.kind {
            NodeKind::Op { op, .. }
            | NodeKind::BinaryOp { op, .. }
            | NodeKind::UnaryOp { op, .. }
            | NodeKind::MutatingBinaryOp { op, .. } => *op = tag,
            NodeKind::FunctionCall { op, .. }
            | NodeKind::MethodCall { op, .. }
            | NodeKind::IndexCall { op, .. } => *op = Some(tag),
            _ => {}
        }
    }

    // Builders

    pub fn block(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Block { children })
    }

    pub fn variants(alternatives: Vec<Node>) -> Self {
        Self::new(NodeKind::Variants { alternatives })
    }

    pub fn while_loop(condition: Node, body: Node) -> Self {
        Self::new(NodeKind::WhileLoop {
            condition: Box::new(condition),
            body: Box::new(body),
        })
    }

    pub fn if_stmt(condition: Node, consequent: Node, alternate: Option<Node>) -> Self {
        Self::new(NodeKind::IfStatement {
            condition: Box::new(condition),
            consequent: Box::new(consequent),
            alternate: alternate.map(Box::new),
        })
    }

    pub fn for_range(variable: Node, low: Node, high: Node, body: Node) -> Self {
        Self::new(NodeKind::ForRange {
            variable: Box::new(variable),
            low: Box::new(low),
            high: Box::new(high),
            body: Box::new(body),
        })
    }

    pub fn for_range_inclusive(
        variable: Node,
        low: Node,
        high: Node,
        step: Option<Node>,
        body: Node,
    ) -> Self {
        Self::new(NodeKind::ForRangeInclusive {
            variable: Box::new(variable),
            low: Box::new(low),
            high: Box::new(high),
            step: step.map(Box::new),
            body: Box::new(body),
        })
    }

    pub fn for_c_like(init: Node, condition: Node, append: Node, body: Node) -> Self {
        Self::new(NodeKind::ForCLike {
            init: Box::new(init),
            condition: Box::new(condition),
            append: Box::new(append),
            body: Box::new(body),
        })
    }

    pub fn for_each(variable: Node, collection: Node, body: Node) -> Self {
        Self::new(NodeKind::ForEach {
            variable: Box::new(variable),
            collection: Box::new(collection),
            body: Box::new(body),
        })
    }

    pub fn for_each_key(variable: Node, table: Node, body: Node) -> Self {
        Self::new(NodeKind::ForEachKey {
            variable: Box::new(variable),
            table: Box::new(table),
            body: Box::new(body),
        })
    }

    pub fn for_each_pair(key_variable: Node, value_variable: Node, table: Node, body: Node) -> Self {
        Self::new(NodeKind::ForEachPair {
            key_variable: Box::new(key_variable),
            value_variable: Box::new(value_variable),
            table: Box::new(table),
            body: Box::new(body),
        })
    }

    pub fn id(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Identifier {
            name: name.into(),
            builtin: false,
        })
    }

    /// Identifier naming a target-language entity; exempt from renaming.
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Identifier {
            name: name.into(),
            builtin: true,
        })
    }

    pub fn int(value: impl Into<BigInt>) -> Self {
        Self::new(NodeKind::IntegerLiteral {
            value: value.into(),
        })
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(NodeKind::TextLiteral {
            value: value.into(),
        })
    }

    pub fn assignment(variable: Node, expr: Node) -> Self {
        Self::new(NodeKind::Assignment {
            variable: Box::new(variable),
            expr: Box::new(expr),
        })
    }

    pub fn many_to_many(variables: Vec<Node>, exprs: Vec<Node>) -> Self {
        Self::new(NodeKind::ManyToManyAssignment { variables, exprs })
    }

    pub fn one_to_many(variables: Vec<Node>, expr: Node) -> Self {
        Self::new(NodeKind::OneToManyAssignment {
            variables,
            expr: Box::new(expr),
        })
    }

    pub fn mutating_op(op: OpCode, variable: Node, right: Node) -> Self {
        Self::new(NodeKind::MutatingBinaryOp {
            op,
            name: String::new(),
            variable: Box::new(variable),
            right: Box::new(right),
        })
    }

    pub fn var_declaration(assignment: Node) -> Self {
        Self::new(NodeKind::VarDeclarationWithAssignment {
            assignment: Box::new(assignment),
        })
    }

    /// Abstract operation.
    pub fn op(op: OpCode, args: Vec<Node>) -> Self {
        Self::new(NodeKind::Op { op, args })
    }

    /// Infix operator already spelled for a target.
    pub fn binary_op(op: OpCode, name: impl Into<String>, precedence: i32, left: Node, right: Node) -> Self {
        Self::new(NodeKind::BinaryOp {
            op,
            name: name.into(),
            precedence,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Prefix operator already spelled for a target.
    pub fn unary_op(op: OpCode, name: impl Into<String>, precedence: i32, arg: Node) -> Self {
        Self::new(NodeKind::UnaryOp {
            op,
            name: name.into(),
            precedence,
            arg: Box::new(arg),
        })
    }

    pub fn call(name: impl Into<String>, args: Vec<Node>) -> Self {
        Self::new(NodeKind::FunctionCall {
            name: name.into(),
            args,
            op: None,
        })
    }

    pub fn method_call(object: Node, method: impl Into<String>, args: Vec<Node>) -> Self {
        Self::new(NodeKind::MethodCall {
            object: Box::new(object),
            method: method.into(),
            args,
            property: false,
            op: None,
        })
    }

    pub fn property(object: Node, name: impl Into<String>) -> Self {
        Self::new(NodeKind::MethodCall {
            object: Box::new(object),
            method: name.into(),
            args: Vec::new(),
            property: true,
            op: None,
        })
    }

    pub fn index_call(collection: Node, index: Node, one_indexed: bool) -> Self {
        Self::new(NodeKind::IndexCall {
            collection: Box::new(collection),
            index: Box::new(index),
            one_indexed,
            op: None,
        })
    }

    pub fn conditional(condition: Node, consequent: Node, alternate: Node) -> Self {
        Self::new(NodeKind::ConditionalOp {
            condition: Box::new(condition),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    pub fn array(exprs: Vec<Node>) -> Self {
        Self::new(NodeKind::ArrayConstructor { exprs })
    }

    pub fn list(exprs: Vec<Node>) -> Self {
        Self::new(NodeKind::ListConstructor { exprs })
    }

    pub fn array_get(array: Node, index: Node) -> Self {
        Self::new(NodeKind::ArrayGet {
            array: Box::new(array),
            index: Box::new(index),
        })
    }

    pub fn array_set(array: Node, index: Node, value: Node) -> Self {
        Self::new(NodeKind::ArraySet {
            array: Box::new(array),
            index: Box::new(index),
            value: Box::new(value),
        })
    }

    pub fn list_get(list: Node, index: Node) -> Self {
        Self::new(NodeKind::ListGet {
            list: Box::new(list),
            index: Box::new(index),
        })
    }

    pub fn list_set(list: Node, index: Node, value: Node) -> Self {
        Self::new(NodeKind::ListSet {
            list: Box::new(list),
            index: Box::new(index),
            value: Box::new(value),
        })
    }

    pub fn list_push(list: Node, value: Node) -> Self {
        Self::new(NodeKind::ListPush {
            list: Box::new(list),
            value: Box::new(value),
        })
    }

    pub fn table_get(table: Node, key: Node) -> Self {
        Self::new(NodeKind::TableGet {
            table: Box::new(table),
            key: Box::new(key),
        })
    }

    pub fn table_set(table: Node, key: Node, value: Node) -> Self {
        Self::new(NodeKind::TableSet {
            table: Box::new(table),
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    pub fn text_get_byte(text: Node, index: Node) -> Self {
        Self::new(NodeKind::TextGetByte {
            text: Box::new(text),
            index: Box::new(index),
        })
    }
}

/// Integers travel as decimal strings so no precision is lost in JSON.
/// Plain JSON numbers are accepted on input.
pub(crate) mod bigint_serde {
    use num_bigint::BigInt;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Int(i64),
    }

    fn parse<E: serde::de::Error>(repr: Repr) -> Result<BigInt, E> {
        match repr {
            Repr::Text(s) => s.parse().map_err(E::custom),
            Repr::Int(i) => Ok(BigInt::from(i)),
        }
    }

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        parse(Repr::deserialize(deserializer)?)
    }

    pub mod option {
        use super::{Repr, parse};
        use num_bigint::BigInt;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<BigInt>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.collect_str(v),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<BigInt>, D::Error> {
            Option::<Repr>::deserialize(deserializer)?
                .map(parse)
                .transpose()
        }
    }
}
