//! Static type inference.
//!
//! [`get_type`] computes the value type of a node against the program's
//! declared variables and memoizes it on the node. Integer-valued
//! operations are typed with interval arithmetic (see [`interval`]).

pub mod interval;

use crate::error::CompileError;
use crate::ir::{IntegerType, Node, NodeKind, OpCode, Scope, ValueType};

/// Upper bound for lengths and sizes: the largest 32-bit signed integer.
const MAX_LENGTH: i64 = i32::MAX as i64;

/// Type of `node`, computed once and cached on the node.
pub fn get_type(node: &Node, scope: &Scope) -> Result<ValueType, CompileError> {
    if let Some(ty) = node.value_type() {
        return Ok(ty.clone());
    }
    let ty = calc_type(node, scope)?;
    node.cache_value_type(ty.clone());
    Ok(ty)
}

/// Member types of a collection-typed expression: `[member]` for arrays,
/// lists and sets, `[key, value]` for tables.
pub fn collection_types(node: &Node, scope: &Scope) -> Result<Vec<ValueType>, CompileError> {
    match get_type(node, scope)? {
        ValueType::Array { member, .. } | ValueType::List { member } | ValueType::Set { member } => {
            Ok(vec![*member])
        }
        ValueType::Table { key, value } => Ok(vec![*key, *value]),
        other => Err(CompileError::type_mismatch("a collection", &other)),
    }
}

fn calc_type(node: &Node, scope: &Scope) -> Result<ValueType, CompileError> {
    use NodeKind::*;
    match &node.kind {
        Block { .. }
        | WhileLoop { .. }
        | IfStatement { .. }
        | ForRange { .. }
        | ForRangeInclusive { .. }
        | ForCLike { .. }
        | ForEach { .. }
        | ForEachKey { .. }
        | ForEachPair { .. }
        | ManyToManyAssignment { .. }
        | MutatingBinaryOp { .. }
        | VarDeclarationWithAssignment { .. }
        | ArraySet { .. }
        | ListSet { .. }
        | ListPush { .. }
        | TableSet { .. } => Ok(ValueType::Void),
        Variants { alternatives } => match alternatives.first() {
            Some(first) => get_type(first, scope),
            None => Ok(ValueType::Void),
        },
        Identifier { name, .. } => scope
            .variable(name)
            .cloned()
            .ok_or_else(|| CompileError::UndeclaredVariable(name.clone())),
        IntegerLiteral { value } => Ok(ValueType::Integer(IntegerType::exact(value.clone()))),
        TextLiteral { .. } => Ok(ValueType::Text),
        Assignment { expr, .. } | OneToManyAssignment { expr, .. } => get_type(expr, scope),
        ConditionalOp {
            consequent,
            alternate,
            ..
        } => {
            let consequent = get_type(consequent, scope)?;
            let alternate = get_type(alternate, scope)?;
            Ok(match (&consequent, &alternate) {
                (ValueType::Integer(a), ValueType::Integer(b)) => ValueType::Integer(a.union(b)),
                _ => consequent,
            })
        }
        ArrayConstructor { exprs } => match exprs.first() {
            Some(first) => Ok(ValueType::array(get_type(first, scope)?, exprs.len())),
            None => Err(CompileError::TypeMismatch(
                "empty array constructor has no member type".into(),
            )),
        },
        ListConstructor { exprs } => match exprs.first() {
            Some(first) => Ok(ValueType::list(get_type(first, scope)?)),
            None => Err(CompileError::TypeMismatch(
                "empty list constructor has no member type".into(),
            )),
        },
        ArrayGet { array, .. } => array_member(get_type(array, scope)?),
        ListGet { list, .. } => list_member(get_type(list, scope)?),
        TableGet { table, .. } => table_value(get_type(table, scope)?),
        TextGetByte { .. } => Ok(ValueType::int_range(0, 255)),
        IndexCall {
            collection,
            op: None,
            ..
        } => match get_type(collection, scope)? {
            ValueType::Array { member, .. } | ValueType::List { member } => Ok(*member),
            ValueType::Table { value, .. } => Ok(*value),
            ValueType::Text => Ok(ValueType::Text),
            other => Err(CompileError::type_mismatch("an indexable collection", &other)),
        },
        FunctionCall { name, op: None, .. } => Err(CompileError::UnknownOpcode(name.clone())),
        MethodCall {
            method, op: None, ..
        } => Err(CompileError::UnknownOpcode(method.clone())),
        Op { op, .. }
        | BinaryOp { op, .. }
        | UnaryOp { op, .. }
        | FunctionCall { op: Some(op), .. }
        | MethodCall { op: Some(op), .. }
        | IndexCall { op: Some(op), .. } => op_type(*op, &operands(node), scope),
    }
}

/// Operands of an op-bearing node, in opcode argument order.
fn operands(node: &Node) -> Vec<&Node> {
    match &node.kind {
        NodeKind::Op { args, .. } | NodeKind::FunctionCall { args, .. } => args.iter().collect(),
        NodeKind::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        NodeKind::UnaryOp { arg, .. } => vec![arg.as_ref()],
        NodeKind::MethodCall { object, args, .. } => {
            std::iter::once(object.as_ref()).chain(args.iter()).collect()
        }
        NodeKind::IndexCall {
            collection, index, ..
        } => vec![collection.as_ref(), index.as_ref()],
        _ => Vec::new(),
    }
}

fn op_type(op: OpCode, args: &[&Node], scope: &Scope) -> Result<ValueType, CompileError> {
    use OpCode::*;
    let arg = |i: usize| -> Result<ValueType, CompileError> {
        match args.get(i) {
            Some(node) => get_type(node, scope),
            None => Err(CompileError::TypeMismatch(format!(
                "{op} expects {} operands, got {}",
                op.arity(),
                args.len()
            ))),
        }
    };
    let int_arg = |i: usize| -> Result<IntegerType, CompileError> {
        match arg(i)? {
            ValueType::Integer(int) => Ok(int),
            other => Err(CompileError::type_mismatch("an integer", &other)),
        }
    };

    match op {
        Add | Sub | Mul | Div | TruncDiv | Exp | Mod | Rem | BitAnd | BitOr | BitXor | Gcd
        | Min | Max => {
            let (left, right) = (int_arg(0)?, int_arg(1)?);
            let result = interval::binary(op, &left, &right).unwrap_or_default();
            Ok(ValueType::Integer(result))
        }
        Neg | BitNot | Abs => {
            let result = interval::unary(op, &int_arg(0)?).unwrap_or_default();
            Ok(ValueType::Integer(result))
        }
        TextToInt => Ok(ValueType::int()),
        Cardinality | TextLength => Ok(ValueType::int_range(0, MAX_LENGTH)),
        TextFind => Ok(ValueType::int_range(-1, MAX_LENGTH)),
        TextGetByte => Ok(ValueType::int_range(0, 255)),
        BoolToInt => Ok(ValueType::int_range(0, 1)),
        Lt | Leq | Eq | Neq | Geq | Gt | Or | And | Not | ArrayContains | ListContains
        | TableContainsKey | SetContains | TextContains | True | False => Ok(ValueType::Boolean),
        TextConcat | IntToText | IntToBin | IntToHex | Repeat | TextReplace | TextGetSlice
        | TextGetChar | JoinUsing | Join | RightAlign | IntToBinAligned | IntToHexAligned
        | SimplifyFraction | ByteToChar | TextReversed | ArgvGet => Ok(ValueType::Text),
        Print | Println | ArraySet | ListSet | TableSet | ListPush => Ok(ValueType::Void),
        Argv | TextSplit | TextSplitWhitespace => Ok(ValueType::list(ValueType::Text)),
        Sorted => arg(0),
        ArrayGet => array_member(arg(0)?),
        ListGet => list_member(arg(0)?),
        TableGet => table_value(arg(0)?),
    }
}

fn array_member(ty: ValueType) -> Result<ValueType, CompileError> {
    match ty {
        ValueType::Array { member, .. } => Ok(*member),
        other => Err(CompileError::type_mismatch("an array", &other)),
    }
}

fn list_member(ty: ValueType) -> Result<ValueType, CompileError> {
    match ty {
        ValueType::List { member } => Ok(*member),
        other => Err(CompileError::type_mismatch("a list", &other)),
    }
}

fn table_value(ty: ValueType) -> Result<ValueType, CompileError> {
    match ty {
        ValueType::Table { value, .. } => Ok(*value),
        other => Err(CompileError::type_mismatch("a table", &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use proptest::prelude::*;

    fn scope() -> Scope {
        let mut scope = Scope::default();
        scope.declare("n", ValueType::int_range(0, 9));
        scope.declare("d", ValueType::int());
        scope.declare("p", ValueType::int_range(1, 1000));
        scope.declare("s", ValueType::Text);
        scope.declare("xs", ValueType::list(ValueType::int_range(1, 3)));
        scope.declare(
            "t",
            ValueType::table(ValueType::Text, ValueType::Boolean),
        );
        scope
    }

    #[test]
    fn test_undeclared_variable() {
        let err = get_type(&Node::id("nope"), &scope()).unwrap_err();
        assert_eq!(err.to_string(), "Undeclared variable nope");
    }

    #[test]
    fn test_type_is_memoized() {
        let node = Node::op(OpCode::Add, vec![Node::id("n"), Node::int(1)]);
        let ty = get_type(&node, &scope()).unwrap();
        assert_eq!(ty, ValueType::int_range(1, 10));
        assert_eq!(node.value_type(), Some(&ty));
        // A cached type is returned even when the scope no longer resolves it.
        assert_eq!(get_type(&node, &Scope::default()).unwrap(), ty);
    }

    #[test]
    fn test_mod_by_positive_divisor_keeps_dividend() {
        let node = Node::op(OpCode::Mod, vec![Node::id("n"), Node::id("p")]);
        assert_eq!(get_type(&node, &scope()).unwrap(), ValueType::int_range(0, 9));
    }

    #[test]
    fn test_mod_by_unbounded_divisor_is_not_constant() {
        let node = Node::op(OpCode::Mod, vec![Node::int(5), Node::id("d")]);
        assert_eq!(get_type(&node, &scope()).unwrap(), ValueType::int_range(-5, 5));
    }

    #[test]
    fn test_text_get_byte_is_a_byte() {
        let op = Node::op(OpCode::TextGetByte, vec![Node::id("s"), Node::int(0)]);
        assert_eq!(get_type(&op, &scope()).unwrap(), ValueType::int_range(0, 255));
        let node = Node::text_get_byte(Node::id("s"), Node::int(0));
        assert_eq!(get_type(&node, &scope()).unwrap(), ValueType::int_range(0, 255));
    }

    #[test]
    fn test_accessor_shape_mismatch() {
        let node = Node::array_get(Node::id("xs"), Node::int(0));
        let err = get_type(&node, &scope()).unwrap_err();
        assert!(matches!(err, CompileError::TypeMismatch(_)));
        assert_eq!(
            get_type(&Node::list_get(Node::id("xs"), Node::int(0)), &scope()).unwrap(),
            ValueType::int_range(1, 3)
        );
        assert_eq!(
            get_type(&Node::table_get(Node::id("t"), Node::text("k")), &scope()).unwrap(),
            ValueType::Boolean
        );
    }

    #[test]
    fn test_integer_op_on_text_is_mismatch() {
        let node = Node::op(OpCode::Add, vec![Node::id("s"), Node::int(1)]);
        assert_eq!(
            get_type(&node, &scope()).unwrap_err(),
            CompileError::TypeMismatch("expected an integer, got text".into())
        );
    }

    #[test]
    fn test_untagged_call_is_unknown_opcode() {
        let node = Node::call("frobnicate", vec![]);
        assert_eq!(
            get_type(&node, &scope()).unwrap_err(),
            CompileError::UnknownOpcode("frobnicate".into())
        );
    }

    #[test]
    fn test_tagged_replacement_types_by_opcode() {
        let mut call = Node::method_call(Node::id("s"), "Length", vec![]);
        call.tag_op(OpCode::TextLength);
        assert_eq!(
            get_type(&call, &scope()).unwrap(),
            ValueType::int_range(0, i32::MAX)
        );

        let op = Node::binary_op(OpCode::Lt, "<", 40, Node::id("n"), Node::int(3));
        assert_eq!(get_type(&op, &scope()).unwrap(), ValueType::Boolean);
    }

    #[test]
    fn test_constructors_and_passthrough() {
        let array = Node::array(vec![Node::int(1), Node::int(1)]);
        assert_eq!(
            get_type(&array, &scope()).unwrap(),
            ValueType::array(ValueType::int_range(1, 1), 2)
        );
        let sorted = Node::op(OpCode::Sorted, vec![Node::id("xs")]);
        assert_eq!(
            get_type(&sorted, &scope()).unwrap(),
            ValueType::list(ValueType::int_range(1, 3))
        );
        assert!(get_type(&Node::list(vec![]), &scope()).is_err());
    }

    #[test]
    fn test_collection_types() {
        assert_eq!(
            collection_types(&Node::id("t"), &scope()).unwrap(),
            vec![ValueType::Text, ValueType::Boolean]
        );
        assert!(collection_types(&Node::id("n"), &scope()).is_err());
    }

    proptest! {
        #[test]
        fn integer_literal_types_as_singleton(n in any::<i64>()) {
            let ty = get_type(&Node::int(n), &Scope::default()).unwrap();
            let int = ty.as_integer().unwrap();
            prop_assert_eq!(int.singleton(), Some(&BigInt::from(n)));
        }
    }
}
