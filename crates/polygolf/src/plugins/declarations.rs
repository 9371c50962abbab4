use crate::error::CompileError;
use crate::ir::{Node, NodeKind, ValueType};
use crate::traits::Plugin;
use crate::traverse::{Path, Visitor, used_identifiers, walk_nodes};
use indexmap::IndexSet;

/// Declares variables for targets that require it (`var x = 0;`).
///
/// A variable is declared where it is first assigned, in program order,
/// when that assignment is a top-level statement or the initialiser of a
/// C-style `for`. Variables first assigned anywhere else are declared with a
/// default value at the start of the program. Loop variables of `for each`
/// loops are declared by the loop itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddVarDeclarations;

impl Plugin for AddVarDeclarations {
    fn name(&self) -> &'static str {
        "add_var_declarations"
    }

    fn visitor(&self) -> Box<dyn Visitor + '_> {
        Box::new(DeclarationVisitor::default())
    }
}

/// Per-walk state.
#[derive(Default)]
struct DeclarationVisitor {
    /// Names declared so far.
    declared: IndexSet<String>,
    /// Names assigned so far, declared or not.
    assigned: IndexSet<String>,
}

impl DeclarationVisitor {
    fn declare(&mut self, variable: &Node) {
        if let Some(name) = variable.identifier_name() {
            self.assigned.insert(name.to_string());
            self.declared.insert(name.to_string());
        }
    }

    fn assign(&mut self, variable: &Node) {
        if let Some(name) = variable.identifier_name() {
            self.assigned.insert(name.to_string());
        }
    }
}

impl Visitor for DeclarationVisitor {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        match &path.node().kind {
            NodeKind::VarDeclarationWithAssignment { assignment } => {
                if let NodeKind::Assignment { variable, .. } = &assignment.kind {
                    self.declare(variable);
                }
            }
            NodeKind::ForEach { variable, .. } | NodeKind::ForEachKey { variable, .. } => {
                self.declare(variable);
            }
            NodeKind::ForEachPair {
                key_variable,
                value_variable,
                ..
            } => {
                self.declare(key_variable);
                self.declare(value_variable);
            }
            NodeKind::Assignment { variable, .. } => {
                let Some(name) = variable.identifier_name().map(str::to_string) else {
                    return Ok(());
                };
                let first = self.assigned.insert(name.clone());
                if first && is_declaration_site(path) && self.declared.insert(name) {
                    path.replace_with_map(Node::var_declaration);
                }
            }
            NodeKind::MutatingBinaryOp { variable, .. } => self.assign(variable),
            NodeKind::ManyToManyAssignment { variables, .. }
            | NodeKind::OneToManyAssignment { variables, .. } => {
                for variable in variables {
                    self.assign(variable);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        if path.parent().is_some() {
            return Ok(());
        }
        let used = used_identifiers(path.node());
        let mut defaults = Vec::new();
        for name in used.iter().filter(|n| !self.declared.contains(*n)) {
            if !is_assigned(path.node(), name) {
                continue;
            }
            let ty = path
                .scope()
                .variable(name)
                .cloned()
                .ok_or_else(|| CompileError::UndeclaredVariable(name.clone()))?;
            let value = default_value(&ty)?;
            defaults.push(Node::var_declaration(Node::assignment(Node::id(name.as_str()), value)));
        }
        if defaults.is_empty() {
            return Ok(());
        }
        self.declared.extend(used);
        if let NodeKind::Block { children } = &mut path.node_mut().kind {
            children.splice(0..0, defaults);
        }
        Ok(())
    }
}

/// Top-level statements and `for (init; ...)` initialisers.
fn is_declaration_site(path: &Path<'_>) -> bool {
    let top_level = path.parent_is_block() && path.ancestors().count() == 1;
    let for_init = path.slot().field == "init" && path.parent().is_some_and(|p| p.kind == "ForCLike");
    top_level || for_init
}

fn is_assigned(root: &Node, name: &str) -> bool {
    let mut assigned = false;
    walk_nodes(root, &mut |n| {
        let targets: Vec<&Node> = match &n.kind {
            NodeKind::Assignment { variable, .. } | NodeKind::MutatingBinaryOp { variable, .. } => {
                vec![variable.as_ref()]
            }
            NodeKind::ManyToManyAssignment { variables, .. }
            | NodeKind::OneToManyAssignment { variables, .. } => variables.iter().collect(),
            _ => Vec::new(),
        };
        if targets.iter().any(|t| t.identifier_name() == Some(name)) {
            assigned = true;
        }
    });
    assigned
}

fn default_value(ty: &ValueType) -> Result<Node, CompileError> {
    match ty {
        ValueType::Integer(_) => Ok(Node::int(0)),
        ValueType::Text => Ok(Node::text("")),
        ValueType::Boolean => Ok(Node::builtin("false")),
        other => Err(CompileError::UnsupportedNode {
            language: "declaration".into(),
            kind: format!("default value of {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{OpCode, Program};
    use crate::traverse::visit;

    fn run(program: &mut Program) {
        visit(program, AddVarDeclarations.visitor().as_mut()).unwrap();
    }

    #[test]
    fn test_first_top_level_assignment_declares() {
        let mut program = Program::new(Node::block(vec![
            Node::assignment(Node::id("a"), Node::int(1)),
            Node::assignment(Node::id("a"), Node::int(2)),
        ]))
        .with_variable("a", ValueType::int());
        run(&mut program);
        assert_eq!(
            program.block,
            Node::block(vec![
                Node::var_declaration(Node::assignment(Node::id("a"), Node::int(1))),
                Node::assignment(Node::id("a"), Node::int(2)),
            ])
        );
    }

    #[test]
    fn test_nested_first_assignment_gets_default_declaration() {
        let mut program = Program::new(Node::block(vec![Node::while_loop(
            Node::builtin("true"),
            Node::block(vec![Node::assignment(Node::id("t"), Node::int(5))]),
        )]))
        .with_variable("t", ValueType::int());
        run(&mut program);
        assert_eq!(
            program.block,
            Node::block(vec![
                Node::var_declaration(Node::assignment(Node::id("t"), Node::int(0))),
                Node::while_loop(
                    Node::builtin("true"),
                    Node::block(vec![Node::assignment(Node::id("t"), Node::int(5))]),
                ),
            ])
        );
    }

    #[test]
    fn test_assignment_after_nested_first_assignment_is_not_a_declaration() {
        let mut program = Program::new(Node::block(vec![
            Node::while_loop(
                Node::builtin("true"),
                Node::block(vec![Node::assignment(Node::id("t"), Node::int(5))]),
            ),
            Node::assignment(Node::id("t"), Node::int(6)),
        ]))
        .with_variable("t", ValueType::int());
        run(&mut program);
        assert_eq!(
            program.block,
            Node::block(vec![
                Node::var_declaration(Node::assignment(Node::id("t"), Node::int(0))),
                Node::while_loop(
                    Node::builtin("true"),
                    Node::block(vec![Node::assignment(Node::id("t"), Node::int(5))]),
                ),
                Node::assignment(Node::id("t"), Node::int(6)),
            ])
        );
    }

    #[test]
    fn test_for_init_declares_loop_variable() {
        let mut program = Program::new(Node::block(vec![Node::for_c_like(
            Node::assignment(Node::id("i"), Node::int(0)),
            Node::op(OpCode::Lt, vec![Node::id("i"), Node::int(3)]),
            Node::mutating_op(OpCode::Add, Node::id("i"), Node::int(1)),
            Node::block(vec![]),
        )]))
        .with_variable("i", ValueType::int());
        run(&mut program);
        let NodeKind::Block { children } = &program.block.kind else {
            panic!("expected block");
        };
        assert_eq!(children.len(), 1);
        let NodeKind::ForCLike { init, .. } = &children[0].kind else {
            panic!("expected for loop");
        };
        assert!(matches!(init.kind, NodeKind::VarDeclarationWithAssignment { .. }));
    }

    #[test]
    fn test_state_is_per_walk() {
        let make = || {
            Program::new(Node::block(vec![Node::assignment(Node::id("a"), Node::int(1))]))
                .with_variable("a", ValueType::int())
        };
        let plugin = AddVarDeclarations;
        let mut first = make();
        let mut second = make();
        visit(&mut first, plugin.visitor().as_mut()).unwrap();
        visit(&mut second, plugin.visitor().as_mut()).unwrap();
        assert_eq!(first, second);
    }
}
