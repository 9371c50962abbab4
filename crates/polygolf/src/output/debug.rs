//! C-like rendering of any lowered program.
//!
//! Not a real language: the debug target spells every opcode, either as a
//! C operator or as a call named after the opcode, so any well-typed program
//! compiles. Useful for inspecting what the plugins produce.

use super::{Context, needs_parens, push_token, quote_text, unlowered, unsupported};
use crate::error::CompileError;
use crate::ir::{Node, NodeKind, OpCode, Program};
use crate::target::{OpMap, Target};
use crate::traits::{Emitter, Language};

/// Static instance of the debug language for the registry.
pub static DEBUG_LANGUAGE: DebugLanguage = DebugLanguage;

/// The debug target.
pub struct DebugLanguage;

impl Language for DebugLanguage {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn target(&self) -> Target {
        Target::new(self.name(), DebugEmitter).with_op_map(op_map())
    }
}

/// Operators for everything C has one for, calls for the rest.
fn op_map() -> OpMap {
    OpCode::ALL.iter().fold(OpMap::new(), |map, &op| {
        let token = match op {
            OpCode::Add => "+",
            OpCode::Sub | OpCode::Neg => "-",
            OpCode::Mul => "*",
            OpCode::Div => "/",
            OpCode::Exp => "**",
            OpCode::Mod => "%",
            OpCode::BitAnd => "&",
            OpCode::BitOr => "|",
            OpCode::BitXor => "^",
            OpCode::BitNot => "~",
            OpCode::Lt => "<",
            OpCode::Leq => "<=",
            OpCode::Eq => "==",
            OpCode::Neq => "!=",
            OpCode::Geq => ">=",
            OpCode::Gt => ">",
            OpCode::And => "&&",
            OpCode::Or => "||",
            OpCode::Not => "!",
            OpCode::TextConcat => "..",
            OpCode::True => "true",
            OpCode::False => "false",
            _ => return map.call(op, op.as_str()),
        };
        map.token(op, token)
    })
}

/// Emitter for the debug target.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugEmitter;

impl Emitter for DebugEmitter {
    fn emit(&self, program: &Program) -> Result<String, CompileError> {
        DebugWriter::emit(program)
    }
}

struct DebugWriter {
    output: String,
}

impl DebugWriter {
    fn emit(program: &Program) -> Result<String, CompileError> {
        let mut writer = Self {
            output: String::new(),
        };
        match &program.block.kind {
            NodeKind::Block { children } => {
                for stmt in children {
                    writer.write_stmt(stmt)?;
                }
            }
            _ => writer.write_stmt(&program.block)?,
        }
        Ok(writer.output)
    }

    fn token(&mut self, token: &str) {
        push_token(&mut self.output, token);
    }

    fn write_stmt(&mut self, node: &Node) -> Result<(), CompileError> {
        match &node.kind {
            NodeKind::Block { .. } => self.write_body(node),
            NodeKind::WhileLoop { condition, body } => {
                self.token("while");
                self.write_paren(condition)?;
                self.write_body(body)
            }
            NodeKind::IfStatement {
                condition,
                consequent,
                alternate,
            } => {
                self.token("if");
                self.write_paren(condition)?;
                self.write_body(consequent)?;
                if let Some(alternate) = alternate {
                    self.token("else");
                    self.write_body(alternate)?;
                }
                Ok(())
            }
            NodeKind::ForRange {
                variable,
                low,
                high,
                body,
            } => {
                self.token("for(");
                self.write_expr(variable, Context::TOP)?;
                self.token("in");
                self.write_call("range", [low.as_ref(), high.as_ref()])?;
                self.token(")");
                self.write_body(body)
            }
            NodeKind::ForRangeInclusive {
                variable,
                low,
                high,
                step,
                body,
            } => {
                self.token("for(");
                self.write_expr(variable, Context::TOP)?;
                self.token("in");
                let mut bounds = vec![low.as_ref(), high.as_ref()];
                bounds.extend(step.as_deref());
                self.write_call("range_inclusive", bounds)?;
                self.token(")");
                self.write_body(body)
            }
            NodeKind::ForCLike {
                init,
                condition,
                append,
                body,
            } => {
                self.token("for(");
                self.write_simple(init)?;
                self.token(";");
                self.write_expr(condition, Context::TOP)?;
                self.token(";");
                self.write_simple(append)?;
                self.token(")");
                self.write_body(body)
            }
            NodeKind::ForEach {
                variable,
                collection: source,
                body,
            }
            | NodeKind::ForEachKey {
                variable,
                table: source,
                body,
            } => {
                self.token("for(");
                self.write_expr(variable, Context::TOP)?;
                self.token("in");
                self.write_expr(source, Context::TOP)?;
                self.token(")");
                self.write_body(body)
            }
            NodeKind::ForEachPair {
                key_variable,
                value_variable,
                table,
                body,
            } => {
                self.token("for(");
                self.write_expr(key_variable, Context::TOP)?;
                self.token(",");
                self.write_expr(value_variable, Context::TOP)?;
                self.token("in");
                self.write_expr(table, Context::TOP)?;
                self.token(")");
                self.write_body(body)
            }
            _ => {
                self.write_simple(node)?;
                self.token(";");
                Ok(())
            }
        }
    }

    fn write_body(&mut self, node: &Node) -> Result<(), CompileError> {
        self.token("{");
        match &node.kind {
            NodeKind::Block { children } => {
                for stmt in children {
                    self.write_stmt(stmt)?;
                }
            }
            _ => self.write_stmt(node)?,
        }
        self.token("}");
        Ok(())
    }

    fn write_paren(&mut self, node: &Node) -> Result<(), CompileError> {
        self.token("(");
        self.write_expr(node, Context::TOP)?;
        self.token(")");
        Ok(())
    }

    /// Assignments and expressions, without a terminator.
    fn write_simple(&mut self, node: &Node) -> Result<(), CompileError> {
        match &node.kind {
            NodeKind::Assignment { variable, expr } => {
                self.write_expr(variable, Context::TOP)?;
                self.token("=");
                self.write_expr(expr, Context::TOP)
            }
            NodeKind::ManyToManyAssignment { variables, exprs } => {
                self.write_list(variables)?;
                self.token("=");
                self.write_list(exprs)
            }
            NodeKind::OneToManyAssignment { variables, expr } => {
                for variable in variables {
                    self.write_expr(variable, Context::TOP)?;
                    self.token("=");
                }
                self.write_expr(expr, Context::TOP)
            }
            NodeKind::MutatingBinaryOp {
                name,
                variable,
                right,
                ..
            } => {
                if name.is_empty() {
                    return Err(unlowered(node));
                }
                self.write_expr(variable, Context::TOP)?;
                self.token(&format!("{name}="));
                self.write_expr(right, Context::TOP)
            }
            NodeKind::VarDeclarationWithAssignment { assignment } => {
                self.token("var");
                self.write_simple(assignment)
            }
            _ => self.write_expr(node, Context::TOP),
        }
    }

    fn write_list(&mut self, nodes: &[Node]) -> Result<(), CompileError> {
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                self.token(",");
            }
            self.write_expr(node, Context::TOP)?;
        }
        Ok(())
    }

    fn write_call<'n>(
        &mut self,
        name: &str,
        args: impl IntoIterator<Item = &'n Node>,
    ) -> Result<(), CompileError> {
        self.token(name);
        self.token("(");
        for (i, arg) in args.into_iter().enumerate() {
            if i > 0 {
                self.token(",");
            }
            self.write_expr(arg, Context::TOP)?;
        }
        self.token(")");
        Ok(())
    }

    fn write_expr(&mut self, node: &Node, context: Context) -> Result<(), CompileError> {
        match &node.kind {
            NodeKind::Identifier { name, .. } => self.token(name),
            NodeKind::IntegerLiteral { value } => {
                let text = value.to_string();
                if value.sign() == num_bigint::Sign::Minus
                    && needs_parens(OpCode::Neg.default_precedence(), context)
                {
                    self.token(&format!("({text})"));
                } else {
                    self.token(&text);
                }
            }
            NodeKind::TextLiteral { value } => self.token(&quote_text(value)),
            NodeKind::BinaryOp {
                op,
                name,
                precedence,
                left,
                right,
            } => {
                let parens = needs_parens(*precedence, context);
                if parens {
                    self.token("(");
                }
                let right_assoc = op.is_right_associative();
                self.write_expr(left, Context::left_of(*precedence, right_assoc))?;
                self.token(name);
                self.write_expr(right, Context::right_of(*precedence, right_assoc))?;
                if parens {
                    self.token(")");
                }
            }
            NodeKind::UnaryOp {
                name,
                precedence,
                arg,
                ..
            } => {
                let parens = needs_parens(*precedence, context);
                if parens {
                    self.token("(");
                }
                self.token(name);
                self.write_expr(arg, Context::right_of(*precedence, false))?;
                if parens {
                    self.token(")");
                }
            }
            NodeKind::FunctionCall { name, args, .. } => self.write_call(name, args)?,
            NodeKind::MethodCall {
                object,
                method,
                args,
                property,
                ..
            } => {
                self.write_expr(object, Context::ATOM)?;
                self.token(".");
                if *property {
                    self.token(method);
                } else {
                    self.write_call(method, args)?;
                }
            }
            NodeKind::IndexCall {
                collection, index, ..
            }
            | NodeKind::ArrayGet {
                array: collection,
                index,
            }
            | NodeKind::ListGet {
                list: collection,
                index,
            }
            | NodeKind::TableGet {
                table: collection,
                key: index,
            }
            | NodeKind::TextGetByte {
                text: collection,
                index,
            } => {
                self.write_expr(collection, Context::ATOM)?;
                self.token("[");
                self.write_expr(index, Context::TOP)?;
                self.token("]");
            }
            NodeKind::ArraySet {
                array: collection,
                index,
                value,
            }
            | NodeKind::ListSet {
                list: collection,
                index,
                value,
            }
            | NodeKind::TableSet {
                table: collection,
                key: index,
                value,
            } => {
                self.write_expr(collection, Context::ATOM)?;
                self.token("[");
                self.write_expr(index, Context::TOP)?;
                self.token("]=");
                self.write_expr(value, Context::TOP)?;
            }
            NodeKind::ListPush { list, value } => {
                self.write_expr(list, Context::ATOM)?;
                self.token(".");
                self.write_call("push", [value.as_ref()])?;
            }
            NodeKind::ConditionalOp {
                condition,
                consequent,
                alternate,
            } => {
                let parens = needs_parens(CONDITIONAL_PRECEDENCE, context);
                if parens {
                    self.token("(");
                }
                self.write_expr(condition, Context::left_of(CONDITIONAL_PRECEDENCE, true))?;
                self.token("?");
                self.write_expr(consequent, Context::TOP)?;
                self.token(":");
                self.write_expr(alternate, Context::right_of(CONDITIONAL_PRECEDENCE, true))?;
                if parens {
                    self.token(")");
                }
            }
            NodeKind::ArrayConstructor { exprs } | NodeKind::ListConstructor { exprs } => {
                self.token("[");
                self.write_list(exprs)?;
                self.token("]");
            }
            NodeKind::Assignment { .. }
            | NodeKind::ManyToManyAssignment { .. }
            | NodeKind::OneToManyAssignment { .. }
            | NodeKind::MutatingBinaryOp { .. }
            | NodeKind::VarDeclarationWithAssignment { .. } => {
                self.token("(");
                self.write_simple(node)?;
                self.token(")");
            }
            NodeKind::Op { .. } | NodeKind::Variants { .. } => return Err(unlowered(node)),
            NodeKind::Block { .. }
            | NodeKind::WhileLoop { .. }
            | NodeKind::IfStatement { .. }
            | NodeKind::ForRange { .. }
            | NodeKind::ForRangeInclusive { .. }
            | NodeKind::ForCLike { .. }
            | NodeKind::ForEach { .. }
            | NodeKind::ForEachKey { .. }
            | NodeKind::ForEachPair { .. } => return Err(unsupported("debug", node)),
        }
        Ok(())
    }
}

const CONDITIONAL_PRECEDENCE: i32 = 5;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ValueType;
    use crate::pipeline::apply_target;

    fn emit(block: Vec<Node>) -> Result<String, CompileError> {
        DebugEmitter.emit(&Program::new(Node::block(block)))
    }

    fn add(left: Node, right: Node) -> Node {
        Node::binary_op(OpCode::Add, "+", 100, left, right)
    }

    fn mul(left: Node, right: Node) -> Node {
        Node::binary_op(OpCode::Mul, "*", 110, left, right)
    }

    #[test]
    fn test_precedence_parens() {
        let out = emit(vec![
            mul(add(Node::id("a"), Node::id("b")), Node::id("c")),
            add(Node::id("a"), mul(Node::id("b"), Node::id("c"))),
            Node::binary_op(
                OpCode::Sub,
                "-",
                100,
                Node::id("a"),
                Node::binary_op(OpCode::Sub, "-", 100, Node::id("b"), Node::int(-1)),
            ),
        ])
        .unwrap();
        insta::assert_snapshot!(out, @"(a+b)*c;a+b*c;a-(b- -1);");
    }

    #[test]
    fn test_statement_forms() {
        let out = emit(vec![
            Node::if_stmt(
                Node::binary_op(OpCode::Lt, "<", 40, Node::id("x"), Node::int(3)),
                Node::block(vec![Node::call("print", vec![Node::text("small")])]),
                Some(Node::block(vec![Node::many_to_many(
                    vec![Node::id("x"), Node::id("y")],
                    vec![Node::id("y"), Node::id("x")],
                )])),
            ),
            Node::var_declaration(Node::assignment(Node::id("s"), Node::text("a\"b"))),
        ])
        .unwrap();
        insta::assert_snapshot!(out, @r#"if(x<3){print("small");}else{x,y=y,x;}var s="a\"b";"#);
    }

    #[test]
    fn test_unlowered_nodes_are_fatal() {
        let err = emit(vec![Node::op(OpCode::Neg, vec![Node::int(1)])]).unwrap_err();
        assert_eq!(err, CompileError::UnloweredNode("Op(neg)".into()));
        assert!(err.is_internal());

        let err = emit(vec![Node::variants(vec![Node::int(1)])]).unwrap_err();
        assert_eq!(err, CompileError::UnloweredNode("Variants".into()));
    }

    #[test]
    fn test_fibonacci_program() {
        let program = Program::new(Node::block(vec![
            Node::assignment(Node::id("a"), Node::int(0)),
            Node::assignment(Node::id("b"), Node::int(1)),
            Node::assignment(Node::id("i"), Node::int(1)),
            Node::while_loop(
                Node::op(OpCode::Lt, vec![Node::id("i"), Node::int(32)]),
                Node::block(vec![
                    Node::op(OpCode::Print, vec![Node::id("a")]),
                    Node::assignment(
                        Node::id("t"),
                        Node::op(OpCode::Add, vec![Node::id("a"), Node::id("b")]),
                    ),
                    Node::assignment(Node::id("b"), Node::id("a")),
                    Node::assignment(Node::id("a"), Node::id("t")),
                    Node::assignment(
                        Node::id("i"),
                        Node::op(OpCode::Add, vec![Node::id("i"), Node::int(1)]),
                    ),
                ]),
            ),
        ]))
        .with_variable("a", ValueType::int())
        .with_variable("b", ValueType::int())
        .with_variable("i", ValueType::int())
        .with_variable("t", ValueType::int());

        let out = apply_target(&DEBUG_LANGUAGE.target(), program).unwrap();
        insta::assert_snapshot!(out, @"a=0;b=1;i=1;while(i<32){print(a);t=a+b;b=a;a=t;i=i+1;}");
    }

    #[test]
    fn test_every_opcode_is_spelled() {
        let map = op_map();
        assert_eq!(map.len(), OpCode::ALL.len());
    }
}
