//! Nim target.
//!
//! Blocks are indentation based, a call taking one argument can drop its
//! parentheses (`echo x`) and any call can be written as a method of its
//! first argument (`s.len`). `div` and `mod` truncate. Integer power,
//! string helpers and command line access live in the `math`, `strutils`
//! and `os` modules, imported on first use.

use super::{Context, needs_parens, one_based, quote_text, unlowered, unsupported};
use crate::error::CompileError;
use crate::ir::{Node, NodeKind, OpCode, Program};
use crate::plugins::{
    AddMutatingBinaryOp, AddVarDeclarations, DivToTruncDiv, EvalStaticExpr, GolfStringListLiteral,
    MapOps, ModToRem, TempVarToMultipleAssignment, UseIndexCalls, UseInclusiveForRange, UseUfcs,
    UseUnsignedDivision,
};
use crate::target::{OpMap, Target};
use crate::traits::{Emitter, Language};
use num_traits::{One, Signed};

/// Static instance of the Nim language for the registry.
pub static NIM_LANGUAGE: NimLanguage = NimLanguage;

/// The Nim target.
pub struct NimLanguage;

/// Call, method or opcode name to the module that provides it.
const DEPENDENCIES: &[(&str, &str)] = &[
    ("exp", "math"),
    ("floorDiv", "math"),
    ("floorMod", "math"),
    ("repeat", "strutils"),
    ("parseInt", "strutils"),
    ("split", "strutils"),
    ("splitWhitespace", "strutils"),
    ("paramStr", "os"),
    ("commandLineParams", "os"),
];

impl Language for NimLanguage {
    fn name(&self) -> &'static str {
        "nim"
    }

    fn extension(&self) -> &'static str {
        "nim"
    }

    fn target(&self) -> Target {
        let target = Target::new(self.name(), NimEmitter)
            .with_golf_plugin(GolfStringListLiteral)
            .with_plugin(TempVarToMultipleAssignment)
            .with_plugin(ModToRem)
            .with_plugin(DivToTruncDiv)
            .with_plugin(UseInclusiveForRange)
            .with_plugin(UseIndexCalls::zero_indexed())
            .with_plugin(EvalStaticExpr)
            .with_plugin(AddMutatingBinaryOp)
            .with_plugin(MapOps(op_map()))
            .with_plugin(UseUfcs)
            .with_plugin(UseUnsignedDivision)
            .with_plugin(AddVarDeclarations);
        DEPENDENCIES
            .iter()
            .fold(target, |target, (name, module)| target.with_dependency(*name, *module))
    }
}

// Prefix operators bind tighter than any infix operator in Nim, and the
// word operators bind looser than comparisons.
const UNARY: i32 = 140;
const AND: i32 = 20;
const OR: i32 = 10;
const RANGE: i32 = 45;

/// Precedence an opcode is spelled with by [`op_map`].
fn spelled_precedence(op: OpCode) -> i32 {
    match op {
        OpCode::BitAnd => AND,
        OpCode::BitOr | OpCode::BitXor => OR,
        OpCode::Neg | OpCode::Not | OpCode::BitNot | OpCode::IntToText => UNARY,
        _ => op.default_precedence(),
    }
}

fn op_map() -> OpMap {
    OpMap::new()
        .token(OpCode::Add, "+")
        .token(OpCode::Sub, "-")
        .token(OpCode::Mul, "*")
        .token(OpCode::TruncDiv, "div")
        .token(OpCode::Rem, "mod")
        .call(OpCode::Div, "floorDiv")
        .call(OpCode::Mod, "floorMod")
        .token(OpCode::Exp, "^")
        .precedence(OpCode::BitAnd, "and", AND)
        .precedence(OpCode::BitOr, "or", OR)
        .precedence(OpCode::BitXor, "xor", OR)
        .precedence(OpCode::BitNot, "not", UNARY)
        .precedence(OpCode::Neg, "-", UNARY)
        .token(OpCode::Lt, "<")
        .token(OpCode::Leq, "<=")
        .token(OpCode::Eq, "==")
        .token(OpCode::Neq, "!=")
        .token(OpCode::Geq, ">=")
        .token(OpCode::Gt, ">")
        .token(OpCode::And, "and")
        .token(OpCode::Or, "or")
        .precedence(OpCode::Not, "not", UNARY)
        .token(OpCode::TextConcat, "&")
        .precedence(OpCode::IntToText, "$", UNARY)
        .token(OpCode::True, "true")
        .token(OpCode::False, "false")
        .call(OpCode::Println, "echo")
        .rewrite(OpCode::Print, |mut args| {
            args.insert(0, Node::builtin("stdout"));
            Node::call("write", args)
        })
        .call(OpCode::TextLength, "len")
        .call(OpCode::Repeat, "repeat")
        .call(OpCode::TextToInt, "parseInt")
        .call(OpCode::Min, "min")
        .call(OpCode::Max, "max")
        .call(OpCode::Abs, "abs")
        .call(OpCode::BoolToInt, "int")
        .call(OpCode::ByteToChar, "chr")
        .call(OpCode::TextSplit, "split")
        .call(OpCode::TextSplitWhitespace, "splitWhitespace")
        .rewrite(OpCode::TextGetByte, |args| match <[Node; 2]>::try_from(args) {
            Ok([text, index]) => Node::call("ord", vec![Node::index_call(text, index, false)]),
            Err(args) => Node::call("ord", args),
        })
        .rewrite(OpCode::ArgvGet, |args| match <[Node; 1]>::try_from(args) {
            Ok([index]) => Node::call("paramStr", vec![one_based(index)]),
            Err(args) => Node::call("paramStr", args),
        })
        .rewrite(OpCode::Argv, |_| Node::call("commandLineParams", Vec::new()))
}

/// Emitter for the Nim target.
#[derive(Debug, Clone, Copy, Default)]
pub struct NimEmitter;

impl Emitter for NimEmitter {
    fn emit(&self, program: &Program) -> Result<String, CompileError> {
        NimWriter::emit(program)
    }
}

const OPERATOR_CHARS: &str = "=+-*/<>@$~&%|!?^.:\\";

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Nim lexes any run of operator characters as one operator, and a name
/// directly followed by a quote as a raw string call.
fn needs_space(prev: char, next: char) -> bool {
    (is_word_char(prev) && is_word_char(next))
        || (OPERATOR_CHARS.contains(prev) && OPERATOR_CHARS.contains(next))
        || (prev.is_ascii_alphabetic() && next == '"')
}

fn statements(node: &Node) -> &[Node] {
    match &node.kind {
        NodeKind::Block { children } => children.as_slice(),
        _ => std::slice::from_ref(node),
    }
}

fn has_body(node: &Node) -> bool {
    matches!(
        node.kind,
        NodeKind::Block { .. }
            | NodeKind::WhileLoop { .. }
            | NodeKind::IfStatement { .. }
            | NodeKind::ForRange { .. }
            | NodeKind::ForRangeInclusive { .. }
            | NodeKind::ForEach { .. }
    )
}

struct NimWriter {
    output: String,
    indent: usize,
}

impl NimWriter {
    fn emit(program: &Program) -> Result<String, CompileError> {
        let mut writer = Self {
            output: String::new(),
            indent: 0,
        };
        let children = statements(&program.block);
        let multiline = children.iter().any(has_body);
        let dependencies = &program.scope.dependencies;
        if !dependencies.is_empty() {
            writer.token("import");
            for (i, dependency) in dependencies.iter().enumerate() {
                if i > 0 {
                    writer.token(",");
                }
                writer.token(dependency);
            }
            if !children.is_empty() {
                writer.output.push(if multiline { '\n' } else { ';' });
            }
        }
        writer.write_statements(children, multiline)?;
        Ok(writer.output)
    }

    fn token(&mut self, token: &str) {
        if let (Some(prev), Some(next)) = (self.output.chars().next_back(), token.chars().next()) {
            if needs_space(prev, next) {
                self.output.push(' ');
            }
        }
        self.output.push_str(token);
    }

    fn newline(&mut self) {
        self.output.push('\n');
        self.output.extend(std::iter::repeat_n(' ', self.indent));
    }

    fn write_statements(&mut self, children: &[Node], multiline: bool) -> Result<(), CompileError> {
        for (i, stmt) in children.iter().enumerate() {
            if i > 0 {
                if multiline {
                    self.newline();
                } else {
                    self.output.push(';');
                }
            }
            self.write_stmt(stmt)?;
        }
        Ok(())
    }

    /// Body after a `:`. Bodies holding compound statements go on indented
    /// lines of their own; returns whether it did.
    fn write_body(&mut self, node: &Node) -> Result<bool, CompileError> {
        let children = statements(node);
        if children.is_empty() {
            self.token("discard");
            return Ok(false);
        }
        if !children.iter().any(has_body) {
            self.write_statements(children, false)?;
            return Ok(false);
        }
        self.indent += 1;
        for stmt in children {
            self.newline();
            self.write_stmt(stmt)?;
        }
        self.indent -= 1;
        Ok(true)
    }

    fn write_stmt(&mut self, node: &Node) -> Result<(), CompileError> {
        match &node.kind {
            NodeKind::Block { children } => {
                self.write_statements(children, children.iter().any(has_body))
            }
            NodeKind::WhileLoop { condition, body } => {
                self.token("while");
                self.write_expr(condition, Context::TOP)?;
                self.token(":");
                self.write_body(body)?;
                Ok(())
            }
            NodeKind::IfStatement {
                condition,
                consequent,
                alternate,
            } => {
                self.token("if");
                self.write_expr(condition, Context::TOP)?;
                self.token(":");
                let multiline = self.write_body(consequent)?;
                if let Some(alternate) = alternate {
                    if multiline {
                        self.newline();
                    } else {
                        self.output.push(' ');
                    }
                    self.token("else");
                    self.token(":");
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
                self.write_for_header(variable)?;
                self.write_expr(low, Context::left_of(RANGE, false))?;
                self.token("..<");
                self.write_expr(high, Context::right_of(RANGE, false))?;
                self.token(":");
                self.write_body(body)?;
                Ok(())
            }
            NodeKind::ForRangeInclusive {
                variable,
                low,
                high,
                step,
                body,
            } => {
                self.write_for_header(variable)?;
                let step = step.as_deref().filter(|step| {
                    !matches!(&step.kind, NodeKind::IntegerLiteral { value } if value.is_one())
                });
                match step {
                    None => {
                        self.write_expr(low, Context::left_of(RANGE, false))?;
                        self.token("..");
                        self.write_expr(high, Context::right_of(RANGE, false))?;
                    }
                    Some(step) => {
                        let descending = match &step.kind {
                            NodeKind::IntegerLiteral { value } if value.is_negative() => {
                                Some(Node::int(value.abs()))
                            }
                            _ => None,
                        };
                        self.token(if descending.is_some() { "countdown" } else { "countup" });
                        self.token("(");
                        self.write_expr(low, Context::TOP)?;
                        self.token(",");
                        self.write_expr(high, Context::TOP)?;
                        self.token(",");
                        self.write_expr(descending.as_ref().unwrap_or(step), Context::TOP)?;
                        self.token(")");
                    }
                }
                self.token(":");
                self.write_body(body)?;
                Ok(())
            }
            NodeKind::ForEach {
                variable,
                collection,
                body,
            } => {
                self.write_for_header(variable)?;
                self.write_expr(collection, Context::TOP)?;
                self.token(":");
                self.write_body(body)?;
                Ok(())
            }
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
            NodeKind::MutatingBinaryOp {
                op,
                name,
                variable,
                right,
            } => {
                if name.is_empty() {
                    return Err(unlowered(node));
                }
                if name.starts_with(is_word_char) {
                    // Word operators have no compound form.
                    let precedence = spelled_precedence(*op);
                    let right_assoc = op.is_right_associative();
                    self.write_expr(variable, Context::TOP)?;
                    self.token("=");
                    self.write_expr(variable, Context::left_of(precedence, right_assoc))?;
                    self.token(name);
                    self.write_expr(right, Context::right_of(precedence, right_assoc))
                } else {
                    self.write_expr(variable, Context::TOP)?;
                    self.token(&format!("{name}="));
                    self.write_expr(right, Context::TOP)
                }
            }
            NodeKind::VarDeclarationWithAssignment { assignment } => {
                self.token("var");
                self.write_stmt(assignment)
            }
            NodeKind::FunctionCall { name, args, .. } => {
                if self.write_text_call(name, args) {
                    return Ok(());
                }
                self.token(name);
                if args.is_empty() {
                    self.token("()");
                    return Ok(());
                }
                self.write_command_args(args)
            }
            NodeKind::MethodCall {
                object,
                method,
                args,
                property: false,
                ..
            } => {
                self.write_expr(object, Context::ATOM)?;
                self.token(".");
                self.token(method);
                self.write_command_args(args)
            }
            NodeKind::Op { .. } | NodeKind::Variants { .. } => Err(unlowered(node)),
            _ => Err(unsupported("nim", node)),
        }
    }

    fn write_for_header(&mut self, variable: &Node) -> Result<(), CompileError> {
        self.token("for");
        self.write_expr(variable, Context::TOP)?;
        self.token("in");
        Ok(())
    }

    /// Arguments of a statement-level call: command syntax for a single one.
    fn write_command_args(&mut self, args: &[Node]) -> Result<(), CompileError> {
        match args {
            [] => Ok(()),
            [arg] => {
                self.output.push(' ');
                self.write_expr(arg, Context::TOP)
            }
            _ => self.write_args(args),
        }
    }

    /// `name"text"` for a call taking one text literal that needs no
    /// escapes, which Nim reads as a raw string argument.
    fn write_text_call(&mut self, name: &str, args: &[Node]) -> bool {
        let [arg] = args else {
            return false;
        };
        let NodeKind::TextLiteral { value } = &arg.kind else {
            return false;
        };
        let quoted = quote_text(value);
        if quoted.len() != value.len() + 2 {
            return false;
        }
        self.token(name);
        self.output.push_str(&quoted);
        true
    }

    fn write_args(&mut self, args: &[Node]) -> Result<(), CompileError> {
        self.token("(");
        self.write_list(args)?;
        self.token(")");
        Ok(())
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
                if value.is_negative() && needs_parens(UNARY, context) {
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
                if !self.write_text_call(name, args) {
                    self.token(name);
                    self.write_args(args)?;
                }
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
                if !*property && !args.is_empty() {
                    self.write_args(args)?;
                }
            }
            NodeKind::IndexCall {
                collection,
                index,
                one_indexed: false,
                ..
            } => {
                self.write_expr(collection, Context::ATOM)?;
                self.token("[");
                self.write_expr(index, Context::TOP)?;
                self.token("]");
            }
            NodeKind::ListConstructor { exprs } => {
                self.token("@[");
                self.write_list(exprs)?;
                self.token("]");
            }
            NodeKind::ArrayConstructor { exprs } => {
                self.token("[");
                self.write_list(exprs)?;
                self.token("]");
            }
            NodeKind::Op { .. } | NodeKind::Variants { .. } => return Err(unlowered(node)),
            _ => return Err(unsupported("nim", node)),
        }
        Ok(())
    }
}
