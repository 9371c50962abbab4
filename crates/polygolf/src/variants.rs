//! Variant expansion and shortest-output selection.
//!
//! A program may contain [`NodeKind::Variants`] markers, each offering
//! equivalent alternative sub-trees. [`expand_variants`] enumerates the full
//! cross-product of concrete programs, [`select_shortest`] compiles each one
//! and keeps the shortest output, and [`compile`] does both.
//!
//! Enumeration order is fixed: the first marker in pre-order varies slowest.
//! Selection reduces in that order whether or not compilation runs in
//! parallel, so ties always go to the earliest program.

use crate::config::CompileConfig;
use crate::error::CompileError;
use crate::ir::{Node, NodeKind, Program};
use crate::pipeline::{apply_plugins, apply_target};
use crate::target::Target;
use crate::traverse::{children, children_mut};
use indexmap::IndexMap;
use rayon::prelude::*;

/// Compile `program` for `target` with the default configuration.
pub fn compile(target: &Target, program: Program) -> Result<String, CompileError> {
    compile_with_config(target, program, &CompileConfig::default())
}

/// Run the target's golf stage, expand variants, enforce the configured
/// fan-out limit, then select the shortest successful output.
#[tracing::instrument(level = "debug", skip_all, fields(language = %target.name))]
pub fn compile_with_config(
    target: &Target,
    mut program: Program,
    config: &CompileConfig,
) -> Result<String, CompileError> {
    apply_plugins(&target.golf_plugins, &mut program)?;

    if let Some(limit) = config.variants.max {
        let count = count_variants(&program.block);
        if count > limit {
            return Err(CompileError::VariantBudget { count, limit });
        }
    }

    let programs = expand_variants(&program);
    tracing::debug!(count = programs.len(), "expanded variants");

    if config.variants.parallel {
        select_shortest_parallel(target, programs)
    } else {
        select_shortest(target, programs)
    }
}

/// Number of concrete programs `node` expands to, saturating at `usize::MAX`.
pub fn count_variants(node: &Node) -> usize {
    match &node.kind {
        NodeKind::Variants { alternatives } => alternatives
            .iter()
            .map(count_variants)
            .fold(0, usize::saturating_add),
        _ => children(node)
            .into_iter()
            .map(|(_, child)| count_variants(child))
            .fold(1, usize::saturating_mul),
    }
}

/// Every concrete program `program` stands for, in enumeration order.
///
/// A block chosen as the alternative of a statement-level marker is spliced
/// into the enclosing block rather than nested in it.
pub fn expand_variants(program: &Program) -> Vec<Program> {
    expand(&program.block)
        .into_iter()
        .map(|block| Program {
            scope: program.scope.clone(),
            block,
        })
        .collect()
}

fn expand(node: &Node) -> Vec<Node> {
    if !contains_variants(node) {
        return vec![node.clone()];
    }
    match &node.kind {
        NodeKind::Variants { alternatives } => alternatives.iter().flat_map(expand).collect(),
        NodeKind::Block { children } => {
            let options: Vec<Vec<Vec<Node>>> = children.iter().map(expand_statement).collect();
            cross_product(&options)
                .into_iter()
                .map(|parts| Node::block(parts.into_iter().flatten().collect()))
                .collect()
        }
        _ => {
            let options: Vec<Vec<Node>> = children(node)
                .into_iter()
                .map(|(_, child)| expand(child))
                .collect();
            cross_product(&options)
                .into_iter()
                .map(|replacements| rebuild(node, replacements))
                .collect()
        }
    }
}

/// Expansions of one block child, each as the statements it contributes.
fn expand_statement(node: &Node) -> Vec<Vec<Node>> {
    match &node.kind {
        NodeKind::Variants { alternatives } => alternatives
            .iter()
            .flat_map(expand)
            .map(|alt| match alt.kind {
                NodeKind::Block { children } => children,
                kind => vec![Node::new(kind)],
            })
            .collect(),
        _ => expand(node).into_iter().map(|n| vec![n]).collect(),
    }
}

fn contains_variants(node: &Node) -> bool {
    node.is_variants()
        || children(node)
            .into_iter()
            .any(|(_, child)| contains_variants(child))
}

/// Copy of `node` with its children replaced, in [`children_mut`] order.
/// The copy starts without a cached type.
fn rebuild(node: &Node, replacements: Vec<Node>) -> Node {
    let mut copy = Node::new(node.kind.clone());
    for ((_, slot), replacement) in children_mut(&mut copy).into_iter().zip(replacements) {
        *slot = replacement;
    }
    copy
}

/// All combinations picking one item per position; the first position
/// varies slowest.
fn cross_product<T: Clone>(options: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut out: Vec<Vec<T>> = vec![Vec::new()];
    for choices in options {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                choices.iter().map(move |choice| {
                    let mut next = prefix.clone();
                    next.push(choice.clone());
                    next
                })
            })
            .collect();
    }
    out
}

/// Compile every program in order and return the shortest output.
#[tracing::instrument(level = "debug", skip_all, fields(language = %target.name, count = programs.len()))]
pub fn select_shortest(target: &Target, programs: Vec<Program>) -> Result<String, CompileError> {
    let attempts = programs.len();
    reduce(
        programs.into_iter().map(|p| apply_target(target, p)),
        attempts,
    )
}

/// Like [`select_shortest`], compiling the programs on the rayon pool.
/// Results are reduced in enumeration order, so the output is identical.
#[tracing::instrument(level = "debug", skip_all, fields(language = %target.name, count = programs.len()))]
pub fn select_shortest_parallel(
    target: &Target,
    programs: Vec<Program>,
) -> Result<String, CompileError> {
    let attempts = programs.len();
    let results: Vec<Result<String, CompileError>> = programs
        .into_par_iter()
        .map(|p| apply_target(target, p))
        .collect();
    reduce(results, attempts)
}

/// Shortest success (first one wins ties), else the most frequent failure.
///
/// Output length is measured in bytes.
fn reduce(
    results: impl IntoIterator<Item = Result<String, CompileError>>,
    attempts: usize,
) -> Result<String, CompileError> {
    let mut best: Option<String> = None;
    let mut tally: IndexMap<String, usize> = IndexMap::new();
    let mut most_common: Option<(String, usize)> = None;
    let mut sole_error = None;

    for result in results {
        match result {
            Ok(output) => {
                if best.as_ref().is_none_or(|b| output.len() < b.len()) {
                    best = Some(output);
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "variant failed");
                let message = err.to_string();
                let count = tally.entry(message.clone()).or_insert(0);
                *count += 1;
                if most_common.as_ref().is_none_or(|(_, max)| *count > *max) {
                    most_common = Some((message, *count));
                }
                sole_error = Some(err);
            }
        }
    }

    if let Some(output) = best {
        tracing::debug!(length = output.len(), "selected shortest output");
        return Ok(output);
    }
    if attempts == 1 {
        if let Some(err) = sole_error {
            return Err(err);
        }
    }
    Err(CompileError::AllVariantsFailed {
        message: most_common.map(|(message, _)| message).unwrap_or_default(),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{OpCode, ValueType};

    fn print(name: &str) -> Node {
        Node::op(OpCode::Print, vec![Node::id(name)])
    }

    fn two_by_three() -> Program {
        Program::new(Node::block(vec![
            Node::variants(vec![print("a"), print("b")]),
            Node::variants(vec![print("x"), print("y"), print("z")]),
        ]))
    }

    fn statements(program: &Program) -> Vec<Node> {
        match &program.block.kind {
            NodeKind::Block { children } => children.clone(),
            _ => panic!("expected block"),
        }
    }

    #[test]
    fn test_independent_markers_multiply() {
        let program = two_by_three();
        assert_eq!(count_variants(&program.block), 6);
        let expanded = expand_variants(&program);
        assert_eq!(expanded.len(), 6);
        assert_eq!(statements(&expanded[0]), vec![print("a"), print("x")]);
        assert_eq!(statements(&expanded[2]), vec![print("a"), print("z")]);
        assert_eq!(statements(&expanded[3]), vec![print("b"), print("x")]);
        assert_eq!(statements(&expanded[5]), vec![print("b"), print("z")]);
    }

    #[test]
    fn test_nested_markers() {
        let inner = Node::variants(vec![Node::int(1), Node::int(2)]);
        let program = Program::new(Node::block(vec![Node::op(
            OpCode::Print,
            vec![Node::variants(vec![inner, Node::int(3)])],
        )]));
        assert_eq!(count_variants(&program.block), 3);
        let values: Vec<Node> = expand_variants(&program)
            .iter()
            .map(|p| statements(p).remove(0))
            .collect();
        assert_eq!(
            values,
            vec![
                Node::op(OpCode::Print, vec![Node::int(1)]),
                Node::op(OpCode::Print, vec![Node::int(2)]),
                Node::op(OpCode::Print, vec![Node::int(3)]),
            ]
        );
    }

    #[test]
    fn test_block_alternative_is_spliced() {
        let program = Program::new(Node::block(vec![
            print("a"),
            Node::variants(vec![
                Node::block(vec![print("b"), print("c")]),
                print("d"),
            ]),
        ]));
        let expanded = expand_variants(&program);
        assert_eq!(
            statements(&expanded[0]),
            vec![print("a"), print("b"), print("c")]
        );
        assert_eq!(statements(&expanded[1]), vec![print("a"), print("d")]);
    }

    #[test]
    fn test_program_without_markers_is_itself() {
        let program = Program::new(Node::block(vec![print("a")]))
            .with_variable("a", ValueType::int());
        assert_eq!(count_variants(&program.block), 1);
        assert_eq!(expand_variants(&program), vec![program]);
    }

    #[test]
    fn test_empty_marker_has_no_expansion() {
        let program = Program::new(Node::block(vec![Node::variants(Vec::new())]));
        assert_eq!(count_variants(&program.block), 0);
        assert!(expand_variants(&program).is_empty());
    }

    #[test]
    fn test_expanded_nodes_start_untyped() {
        let op = Node::op(
            OpCode::Add,
            vec![Node::variants(vec![Node::int(1), Node::int(2)]), Node::int(1)],
        )
        .with_value_type(ValueType::int_range(2, 3));
        let program = Program::new(Node::block(vec![op]));
        for concrete in expand_variants(&program) {
            assert!(statements(&concrete)[0].value_type().is_none());
        }
    }

    #[test]
    fn test_shortest_wins_and_first_breaks_ties() {
        let results = vec![
            Err(CompileError::UndeclaredVariable("x".into())),
            Ok("abcd".to_string()),
            Ok("xyz".to_string()),
            Ok("abc".to_string()),
        ];
        assert_eq!(reduce(results, 4).unwrap(), "xyz");
    }

    #[test]
    fn test_most_common_failure_is_reported() {
        let foo = || CompileError::UnsupportedOperator(OpCode::BitXor);
        let undeclared = || CompileError::UndeclaredVariable("x".into());
        let results = vec![
            Err(undeclared()),
            Err(foo()),
            Err(foo()),
            Err(undeclared()),
            Err(foo()),
            Err(foo()),
        ];
        let err = reduce(results, 6).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No variant could be compiled. Most common error follows. Unsupported operator bit_xor"
        );
    }

    #[test]
    fn test_first_message_to_reach_max_wins_ties() {
        let results = vec![
            Err(CompileError::UndeclaredVariable("a".into())),
            Err(CompileError::UndeclaredVariable("b".into())),
            Err(CompileError::UndeclaredVariable("b".into())),
            Err(CompileError::UndeclaredVariable("a".into())),
        ];
        let err = reduce(results, 4).unwrap_err();
        assert_eq!(
            err,
            CompileError::AllVariantsFailed {
                message: "Undeclared variable b".into(),
                attempts: 4,
            }
        );
    }

    #[test]
    fn test_single_program_failure_is_passed_through() {
        let err = reduce(vec![Err(CompileError::UnknownOpcode("frob".into()))], 1).unwrap_err();
        assert_eq!(err, CompileError::UnknownOpcode("frob".into()));
    }

    #[test]
    fn test_no_programs() {
        let err = reduce(Vec::<Result<String, CompileError>>::new(), 0).unwrap_err();
        assert_eq!(
            err,
            CompileError::AllVariantsFailed {
                message: String::new(),
                attempts: 0,
            }
        );
    }

    #[test]
    fn test_budget_is_enforced() {
        let target = Target::new("debug", crate::output::DebugEmitter);
        let config = CompileConfig {
            variants: crate::config::VariantsConfig {
                parallel: false,
                max: Some(4),
            },
            ..CompileConfig::default()
        };
        let err = compile_with_config(&target, two_by_three(), &config).unwrap_err();
        assert_eq!(err, CompileError::VariantBudget { count: 6, limit: 4 });
    }
}
