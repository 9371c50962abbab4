//! Applying a target to one concrete program.
//!
//! Steps, in order:
//! 1. every plugin, one full walk each, in list order;
//! 2. dependency discovery from the target's dependency map;
//! 3. identifier allocation over the rewritten tree;
//! 4. opcode-to-syntax mapping;
//! 5. identifier renaming;
//! 6. emission.

use crate::error::CompileError;
use crate::idents::allocate;
use crate::ir::{Node, NodeKind, Program};
use crate::plugins::map_ops;
use crate::target::Target;
use crate::traits::Plugin;
use crate::traverse::{Path, Visitor, used_identifiers, visit, walk_nodes};
use indexmap::IndexMap;

/// Compile one program that contains no variant markers.
#[tracing::instrument(level = "debug", skip_all, fields(language = %target.name))]
pub fn apply_target(target: &Target, mut program: Program) -> Result<String, CompileError> {
    lower(target, &mut program)?;
    let output = target.emitter.emit(&program)?;
    tracing::debug!(length = output.len(), "emitted");
    Ok(output)
}

/// Steps 1-5: rewrite `program` in place until it is ready for emission.
pub fn lower(target: &Target, program: &mut Program) -> Result<(), CompileError> {
    apply_plugins(&target.plugins, program)?;

    if let Some(dependency_map) = &target.dependency_map {
        add_dependencies(program, dependency_map);
    }

    let names = used_identifiers(&program.block);
    let idents = allocate(names.iter().map(String::as_str), target.ident_gen.as_ref());
    tracing::trace!(?idents, "allocated identifiers");

    if let Some(op_map) = &target.op_map {
        map_ops(program, op_map)?;
    }

    rename_identifiers(program, &idents)
}

/// Run each plugin over the whole program, in order.
pub fn apply_plugins(plugins: &[Box<dyn Plugin>], program: &mut Program) -> Result<(), CompileError> {
    for plugin in plugins {
        tracing::debug!(plugin = plugin.name(), "applying plugin");
        visit(program, plugin.visitor().as_mut())?;
    }
    Ok(())
}

/// Add every dependency whose discriminant appears in the tree.
///
/// A node's discriminants are its opcode tag, its kind name and, for calls,
/// the called function or method name.
pub fn add_dependencies(program: &mut Program, dependency_map: &IndexMap<String, String>) {
    let mut found = Vec::new();
    walk_nodes(&program.block, &mut |node| {
        for key in discriminants(node) {
            if let Some(dependency) = dependency_map.get(key) {
                found.push(dependency.clone());
            }
        }
    });
    for dependency in found {
        program.scope.add_dependency(dependency);
    }
}

fn discriminants(node: &Node) -> Vec<&str> {
    let mut keys = vec![node.kind.name()];
    if let Some(op) = node.kind.op() {
        keys.push(op.as_str());
    }
    match &node.kind {
        NodeKind::FunctionCall { name, .. } => keys.push(name),
        NodeKind::MethodCall { method, .. } => keys.push(method),
        _ => {}
    }
    keys
}

/// Rename every non-builtin identifier, and the declared variables, through
/// `idents`. Declared variables the tree never mentions are dropped.
pub fn rename_identifiers(
    program: &mut Program,
    idents: &IndexMap<String, String>,
) -> Result<(), CompileError> {
    visit(program, &mut Renamer { idents })?;
    let variables = std::mem::take(&mut program.scope.variables);
    program.scope.variables = variables
        .into_iter()
        .filter_map(|(name, ty)| idents.get(&name).map(|out| (out.clone(), ty)))
        .collect();
    Ok(())
}

struct Renamer<'m> {
    idents: &'m IndexMap<String, String>,
}

impl Visitor for Renamer<'_> {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), CompileError> {
        if let NodeKind::Identifier {
            name,
            builtin: false,
        } = &mut path.node_mut().kind
        {
            let out = self
                .idents
                .get(name.as_str())
                .ok_or_else(|| CompileError::IncompleteIdentifierMap(name.clone()))?;
            *name = out.clone();
        }
        Ok(())
    }
}
