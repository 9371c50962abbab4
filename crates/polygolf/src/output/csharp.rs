//! C# target.
//!
//! Emits top-level statements preceded by the `using` directives the program
//! depends on. Integer division and remainder truncate, so `div` and `mod`
//! only compile when the operands are known to be non-negative.

use super::{Context, needs_parens, push_token, quote_text, unlowered, unsupported};
use crate::error::CompileError;
use crate::ir::{Node, NodeKind, OpCode, Program};
use crate::plugins::{
    AddMutatingBinaryOp, AddVarDeclarations, DivToTruncDiv, EvalStaticExpr, ForRangeToForCLike,
    ModToRem, TempVarToMultipleAssignment, UseIndexCalls,
};
use crate::target::{OpMap, Target};
use crate::traits::{Emitter, Language};

/// Static instance of the C# language for the registry.
pub static CSHARP_LANGUAGE: CSharpLanguage = CSharpLanguage;

/// The C# target.
pub struct CSharpLanguage;

impl Language for CSharpLanguage {
    fn name(&self) -> &'static str {
        "csharp"
    }

    fn extension(&self) -> &'static str {
        "cs"
    }

    fn target(&self) -> Target {
        let mut target = Target::new(self.name(), CSharpEmitter)
            .with_plugin(TempVarToMultipleAssignment)
            .with_plugin(ModToRem)
            .with_plugin(DivToTruncDiv)
            .with_plugin(ForRangeToForCLike)
            .with_plugin(UseIndexCalls::zero_indexed())
            .with_plugin(AddMutatingBinaryOp)
            .with_plugin(EvalStaticExpr)
            .with_plugin(AddVarDeclarations)
            .with_op_map(op_map());
        for op in [
            OpCode::Print,
            OpCode::Println,
            OpCode::Min,
            OpCode::Max,
            OpCode::Abs,
        ] {
            target = target.with_dependency(op.as_str(), "System");
        }
        target
    }
}

// C# binds equality tighter than the bitwise operators, unlike the defaults.
const EQUALITY: i32 = 35;
const BIT_AND: i32 = 30;
const BIT_XOR: i32 = 27;
const BIT_OR: i32 = 25;

fn op_map() -> OpMap {
    OpMap::new()
        .token(OpCode::Add, "+")
        .token(OpCode::Sub, "-")
        .token(OpCode::Mul, "*")
        .token(OpCode::TruncDiv, "/")
        .token(OpCode::Rem, "%")
        .precedence(OpCode::BitAnd, "&", BIT_AND)
        .precedence(OpCode::BitXor, "^", BIT_XOR)
        .precedence(OpCode::BitOr, "|", BIT_OR)
        .token(OpCode::BitNot, "~")
        .token(OpCode::Neg, "-")
        .token(OpCode::Lt, "<")
        .token(OpCode::Leq, "<=")
        .precedence(OpCode::Eq, "==", EQUALITY)
        .precedence(OpCode::Neq, "!=", EQUALITY)
        .token(OpCode::Geq, ">=")
        .token(OpCode::Gt, ">")
        .token(OpCode::And, "&&")
        .token(OpCode::Or, "||")
        .precedence(OpCode::Not, "!", 120)
        .precedence(OpCode::TextConcat, "+", OpCode::Add.default_precedence())
        .token(OpCode::True, "true")
        .token(OpCode::False, "false")
        .token(OpCode::Argv, "args")
        .call(OpCode::Print, "Console.Write")
        .call(OpCode::Println, "Console.WriteLine")
        .call(OpCode::Min, "Math.Min")
        .call(OpCode::Max, "Math.Max")
        .call(OpCode::Abs, "Math.Abs")
        .call(OpCode::TextToInt, "int.Parse")
        .rewrite(OpCode::IntToText, |args| match <[Node; 1]>::try_from(args) {
            Ok([value]) => Node::binary_op(
                OpCode::TextConcat,
                "+",
                OpCode::Add.default_precedence(),
                value,
                Node::text(""),
            ),
            Err(args) => Node::call("Convert.ToString", args),
        })
        .rewrite(OpCode::TextLength, |args| match <[Node; 1]>::try_from(args) {
            Ok([text]) => Node::property(text, "Length"),
            Err(args) => Node::call("Length", args),
        })
        .rewrite(OpCode::TextGetByte, |args| match <[Node; 2]>::try_from(args) {
            Ok([text, index]) => Node::index_call(text, index, false),
            Err(args) => Node::call("GetByte", args),
        })
        .rewrite(OpCode::ArgvGet, |args| match <[Node; 1]>::try_from(args) {
            Ok([index]) => Node::index_call(Node::builtin("args"), index, false),
            Err(args) => Node::call("args", args),
        })
}

/// Emitter for the C# target.
#[derive(Debug, Clone, Copy, Default)]
pub struct CSharpEmitter;

impl Emitter for CSharpEmitter {
    fn emit(&self, program: &Program) -> Result<String, CompileError> {
        CSharpWriter::emit(program)
    }
}

struct CSharpWriter {
    output: String,
}

impl CSharpWriter {
    fn emit(program: &Program) -> Result<String, CompileError> {
        let mut writer = Self {
            output: String::new(),
        };
        for dependency in &program.scope.dependencies {
            writer.token("using");
            writer.token(dependency);
            writer.token(";");
        }
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
            NodeKind::Block { children } => {
                self.token("{");
                for stmt in children {
                    self.write_stmt(stmt)?;
                }
                self.token("}");
                Ok(())
            }
            NodeKind::WhileLoop { condition, body } => {
                self.token("while");
                self.write_paren(condition)?;
                self.write_body(body, false)
            }
            NodeKind::IfStatement {
                condition,
                consequent,
                alternate,
            } => {
                self.token("if");
                self.write_paren(condition)?;
                self.write_body(consequent, alternate.is_some())?;
                if let Some(alternate) = alternate {
                    self.token("else");
                    self.write_body(alternate, false)?;
                }
                Ok(())
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
                self.write_body(body, false)
            }
            NodeKind::ForEach {
                variable,
                collection,
                body,
            } => {
                self.token("foreach(var");
                self.write_expr(variable, Context::TOP)?;
                self.token("in");
                self.write_expr(collection, Context::TOP)?;
                self.token(")");
                self.write_body(body, false)
            }
            NodeKind::ForEachKey {
                variable,
                table,
                body,
            } => {
                self.token("foreach(var");
                self.write_expr(variable, Context::TOP)?;
                self.token("in");
                self.write_expr(table, Context::ATOM)?;
                self.token(".Keys)");
                self.write_body(body, false)
            }
            NodeKind::Variants { .. } | NodeKind::Op { .. } => Err(unlowered(node)),
            NodeKind::ForRange { .. }
            | NodeKind::ForRangeInclusive { .. }
            | NodeKind::ForEachPair { .. } => Err(unsupported("csharp", node)),
            _ => {
                self.write_simple(node)?;
                self.token(";");
                Ok(())
            }
        }
    }

    /// Loop and branch bodies. A single statement goes without braces unless
    /// it declares a variable or could capture a following `else`.
    fn write_body(&mut self, node: &Node, before_else: bool) -> Result<(), CompileError> {
        let single = match &node.kind {
            NodeKind::Block { children } if children.len() == 1 => Some(&children[0]),
            NodeKind::Block { .. } => None,
            _ => Some(node),
        };
        match single {
            Some(stmt)
                if !matches!(stmt.kind, NodeKind::VarDeclarationWithAssignment { .. })
                    && !(before_else && matches!(stmt.kind, NodeKind::IfStatement { .. })) =>
            {
                self.write_stmt(stmt)
            }
            _ => {
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
        }
    }

    fn write_paren(&mut self, node: &Node) -> Result<(), CompileError> {
        self.token("(");
        self.write_expr(node, Context::TOP)?;
        self.token(")");
        Ok(())
    }

    fn write_simple(&mut self, node: &Node) -> Result<(), CompileError> {
        match &node.kind {
            NodeKind::Assignment { variable, expr } => {
                self.write_expr(variable, Context::TOP)?;
                self.token("=");
                self.write_expr(expr, Context::TOP)
            }
            NodeKind::ManyToManyAssignment { variables, exprs } => {
                self.token("(");
                self.write_list(variables)?;
                self.token(")=(");
                self.write_list(exprs)?;
                self.token(")");
                Ok(())
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
            NodeKind::FunctionCall { name, args, .. } => {
                self.token(name);
                self.token("(");
                self.write_list(args)?;
                self.token(")");
            }
            NodeKind::MethodCall {
                object,
                method,
                args,
                property,
                ..
            } => {
                self.write_expr(object, Context::ATOM)?;
                self.token(".");
                self.token(method);
                if !*property {
                    self.token("(");
                    self.write_list(args)?;
                    self.token(")");
                }
            }
            NodeKind::IndexCall {
                collection, index, ..
            } => {
                self.write_expr(collection, Context::ATOM)?;
                self.token("[");
                self.write_expr(index, Context::TOP)?;
                self.token("]");
            }
            NodeKind::ConditionalOp {
                condition,
                consequent,
                alternate,
            } => {
                let parens = needs_parens(CONDITIONAL, context);
                if parens {
                    self.token("(");
                }
                self.write_expr(condition, Context::left_of(CONDITIONAL, true))?;
                self.token("?");
                self.write_expr(consequent, Context::TOP)?;
                self.token(":");
                self.write_expr(alternate, Context::right_of(CONDITIONAL, true))?;
                if parens {
                    self.token(")");
                }
            }
            NodeKind::ArrayConstructor { exprs } => {
                self.token("new[]{");
                self.write_list(exprs)?;
                self.token("}");
            }
            NodeKind::Op { .. } | NodeKind::Variants { .. } => return Err(unlowered(node)),
            _ => return Err(unsupported("csharp", node)),
        }
        Ok(())
    }
}

const CONDITIONAL: i32 = 5;
