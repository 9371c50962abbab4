//! Lua target.
//!
//! Lua 5.4: floor division and modulo are native (`//`, `%`), bitwise
//! operators exist, arrays are tables indexed from one and there is no
//! compound assignment.

use super::{Context, needs_parens, one_based, push_token, quote_text, unlowered, unsupported};
use crate::error::CompileError;
use crate::ir::{Node, NodeKind, OpCode, Program};
use crate::plugins::{
    EvalStaticExpr, RemoveMutatingBinaryOp, TempVarToMultipleAssignment, UseIndexCalls,
    UseInclusiveForRange,
};
use crate::target::{OpMap, Target};
use crate::traits::{Emitter, Language};

/// Static instance of the Lua language for the registry.
pub static LUA_LANGUAGE: LuaLanguage = LuaLanguage;

/// The Lua target.
pub struct LuaLanguage;

impl Language for LuaLanguage {
    fn name(&self) -> &'static str {
        "lua"
    }

    fn extension(&self) -> &'static str {
        "lua"
    }

    fn target(&self) -> Target {
        Target::new(self.name(), LuaEmitter)
            .with_plugin(RemoveMutatingBinaryOp)
            .with_plugin(TempVarToMultipleAssignment)
            .with_plugin(UseInclusiveForRange)
            .with_plugin(UseIndexCalls::one_indexed())
            .with_plugin(EvalStaticExpr)
            .with_op_map(op_map())
    }
}

fn op_map() -> OpMap {
    OpMap::new()
        .token(OpCode::Add, "+")
        .token(OpCode::Sub, "-")
        .token(OpCode::Mul, "*")
        .token(OpCode::Div, "//")
        .token(OpCode::Mod, "%")
        .token(OpCode::Exp, "^")
        .token(OpCode::BitAnd, "&")
        .token(OpCode::BitOr, "|")
        .token(OpCode::BitXor, "~")
        .token(OpCode::BitNot, "~")
        .token(OpCode::Neg, "-")
        .token(OpCode::Lt, "<")
        .token(OpCode::Leq, "<=")
        .token(OpCode::Eq, "==")
        .token(OpCode::Neq, "~=")
        .token(OpCode::Geq, ">=")
        .token(OpCode::Gt, ">")
        .token(OpCode::And, "and")
        .token(OpCode::Or, "or")
        .precedence(OpCode::Not, "not", 120)
        .precedence(OpCode::TextConcat, "..", 90)
        .precedence(OpCode::TextLength, "#", 120)
        .token(OpCode::True, "true")
        .token(OpCode::False, "false")
        .token(OpCode::Argv, "arg")
        .call(OpCode::Print, "io.write")
        .call(OpCode::Println, "print")
        .call(OpCode::IntToText, "tostring")
        .call(OpCode::TextToInt, "tonumber")
        .call(OpCode::Min, "math.min")
        .call(OpCode::Max, "math.max")
        .call(OpCode::Abs, "math.abs")
        .call(OpCode::Rem, "math.fmod")
        .call(OpCode::ByteToChar, "string.char")
        .method(OpCode::Repeat, "rep")
        .method(OpCode::TextReversed, "reverse")
        .rewrite(OpCode::TextGetByte, |args| match <[Node; 2]>::try_from(args) {
            Ok([text, index]) => Node::method_call(text, "byte", vec![one_based(index)]),
            Err(args) => Node::call("string.byte", args),
        })
        .rewrite(OpCode::ArgvGet, |args| match <[Node; 1]>::try_from(args) {
            Ok([index]) => Node::index_call(Node::builtin("arg"), one_based(index), true),
            Err(args) => Node::call("arg", args),
        })
}

/// Emitter for the Lua target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LuaEmitter;

impl Emitter for LuaEmitter {
    fn emit(&self, program: &Program) -> Result<String, CompileError> {
        LuaWriter::emit(program)
    }
}

/// Emits lowered IR as Lua source, one statement per line.
struct LuaWriter {
    output: String,
}

impl LuaWriter {
    fn emit(program: &Program) -> Result<String, CompileError> {
        let mut writer = Self {
            output: String::new(),
        };
        writer.write_statements(&program.block)?;
        Ok(writer.output)
    }

    fn token(&mut self, token: &str) {
        push_token(&mut self.output, token);
    }

    fn write_statements(&mut self, node: &Node) -> Result<(), CompileError> {
        match &node.kind {
            NodeKind::Block { children } => {
                for (i, stmt) in children.iter().enumerate() {
                    if i > 0 {
                        self.output.push('\n');
                    }
                    self.write_stmt(stmt)?;
                }
                Ok(())
            }
            _ => self.write_stmt(node),
        }
    }

    /// `do`/`then` body followed by `end`.
    fn write_body(&mut self, node: &Node) -> Result<(), CompileError> {
        let empty = matches!(&node.kind, NodeKind::Block { children } if children.is_empty());
        if !empty {
            self.output.push('\n');
            self.write_statements(node)?;
        }
        self.output.push('\n');
        self.token("end");
        Ok(())
    }

    fn write_stmt(&mut self, node: &Node) -> Result<(), CompileError> {
        match &node.kind {
            NodeKind::Block { .. } => self.write_statements(node),
            NodeKind::WhileLoop { condition, body } => {
                self.token("while");
                self.write_expr(condition, Context::TOP)?;
                self.token("do");
                self.write_body(body)
            }
            NodeKind::IfStatement {
                condition,
                consequent,
                alternate,
            } => {
                self.token("if");
                self.write_expr(condition, Context::TOP)?;
                self.token("then");
                match alternate {
                    Some(alternate) => {
                        self.output.push('\n');
                        self.write_statements(consequent)?;
                        self.output.push('\n');
                        self.token("else");
                        self.write_body(alternate)
                    }
                    None => self.write_body(consequent),
                }
            }
            NodeKind::ForRangeInclusive {
                variable,
                low,
                high,
                step,
                body,
            } => {
                self.token("for");
                self.write_expr(variable, Context::TOP)?;
                self.token("=");
                self.write_expr(low, Context::TOP)?;
                self.token(",");
                self.write_expr(high, Context::TOP)?;
                if let Some(step) = step {
                    self.token(",");
                    self.write_expr(step, Context::TOP)?;
                }
                self.token("do");
                self.write_body(body)
            }
            NodeKind::ForEach {
                variable,
                collection,
                body,
            } => {
                self.token("for");
                self.token("_,");
                self.write_expr(variable, Context::TOP)?;
                self.token("in");
                self.write_call("ipairs", std::slice::from_ref(collection.as_ref()))?;
                self.token("do");
                self.write_body(body)
            }
            NodeKind::ForEachKey {
                variable,
                table,
                body,
            } => {
                self.token("for");
                self.write_expr(variable, Context::TOP)?;
                self.token("in");
                self.write_call("pairs", std::slice::from_ref(table.as_ref()))?;
                self.token("do");
                self.write_body(body)
            }
            NodeKind::ForEachPair {
                key_variable,
                value_variable,
                table,
                body,
            } => {
                self.token("for");
                self.write_expr(key_variable, Context::TOP)?;
                self.token(",");
                self.write_expr(value_variable, Context::TOP)?;
                self.token("in");
                self.write_call("pairs", std::slice::from_ref(table.as_ref()))?;
                self.token("do");
                self.write_body(body)
            }
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
            NodeKind::VarDeclarationWithAssignment { assignment } => {
                self.token("local");
                self.write_stmt(assignment)
            }
            NodeKind::FunctionCall { .. } | NodeKind::MethodCall { .. } => {
                self.write_expr(node, Context::TOP)
            }
            NodeKind::Op { .. } | NodeKind::Variants { .. } | NodeKind::MutatingBinaryOp { .. } => {
                Err(unlowered(node))
            }
            _ => Err(unsupported("lua", node)),
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

    fn write_call(&mut self, name: &str, args: &[Node]) -> Result<(), CompileError> {
        self.token(name);
        self.token("(");
        self.write_list(args)?;
        self.token(")");
        Ok(())
    }

    /// Receiver of a method call or index; literals need brackets in Lua.
    fn write_object(&mut self, node: &Node) -> Result<(), CompileError> {
        match &node.kind {
            NodeKind::TextLiteral { .. }
            | NodeKind::IntegerLiteral { .. }
            | NodeKind::ArrayConstructor { .. }
            | NodeKind::ListConstructor { .. } => {
                self.token("(");
                self.write_expr(node, Context::TOP)?;
                self.token(")");
                Ok(())
            }
            _ => self.write_expr(node, Context::ATOM),
        }
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
                self.write_object(object)?;
                if *property {
                    self.token(".");
                    self.token(method);
                } else {
                    self.token(":");
                    self.write_call(method, args)?;
                }
            }
            NodeKind::IndexCall {
                collection, index, ..
            } => {
                self.write_object(collection)?;
                self.token("[");
                self.write_expr(index, Context::TOP)?;
                self.token("]");
            }
            NodeKind::ArrayConstructor { exprs } | NodeKind::ListConstructor { exprs } => {
                self.token("{");
                self.write_list(exprs)?;
                self.token("}");
            }
            NodeKind::Op { .. } | NodeKind::Variants { .. } => return Err(unlowered(node)),
            _ => return Err(unsupported("lua", node)),
        }
        Ok(())
    }
}
