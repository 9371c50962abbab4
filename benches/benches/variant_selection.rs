use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use polygolf::config::VariantsConfig;
use polygolf::{CompileConfig, Node, OpCode, Program, ValueType, compile_with_config};

/// `width` independent statements, each with three spellings of `x = x + k`.
fn wide_program(width: usize) -> Program {
    let statements = (0..width)
        .map(|k| {
            let k = k as i64;
            let x = || Node::id("x");
            Node::variants(vec![
                Node::assignment(x(), Node::op(OpCode::Add, vec![x(), Node::int(k)])),
                Node::assignment(x(), Node::op(OpCode::Sub, vec![x(), Node::int(-k)])),
                Node::mutating_op(OpCode::Add, x(), Node::int(k)),
            ])
        })
        .collect();
    Program::new(Node::block(statements)).with_variable("x", ValueType::int())
}

fn bench_variant_selection(c: &mut Criterion) {
    let Some(lua) = polygolf::language_for_name("lua") else {
        return;
    };
    let target = lua.target();
    let mut group = c.benchmark_group("variant_selection");

    for width in [2, 4, 6] {
        let program = wide_program(width);
        for parallel in [false, true] {
            let config = CompileConfig {
                variants: VariantsConfig {
                    parallel,
                    max: None,
                },
                ..CompileConfig::default()
            };
            let mode = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(mode, width), &program, |b, program| {
                b.iter(|| {
                    let out = compile_with_config(&target, black_box(program.clone()), &config);
                    black_box(out)
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_variant_selection);
criterion_main!(benches);
