//! Criterion benchmarks for span scanning, expression evaluation and
//! whole-document substitution.
//!
//! Run:
//!   cargo bench
//!   cargo bench -- span_scanning   # one group
//!   cargo bench -- documents       # one group

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use indexmap::IndexMap;
use yamlscript::span::{self, SpanSyntax};
use yamlscript::substitute::{substitute, substitute_string};
use yamlscript::{parser, Environment, Evaluator, Value};

// ── Data builders ─────────────────────────────────────────────────────────────

fn context() -> Value {
    Value::from_json_str(
        r#"{"my_key":"name","my_name":"James","my_int":10,"my":{"name":"David"},
            "names":[{"name":"James"},{"name":"David"}],"ints":[0,1,2,3]}"#,
    )
    .unwrap()
}

/// `n` entries mixing plain text, variables and expressions.
fn document(n: usize) -> Value {
    let mut root = IndexMap::new();
    for i in 0..n {
        let mut entry = IndexMap::new();
        entry.insert("id".to_string(), Value::from(i));
        entry.insert("label".to_string(), Value::from(format!("item {i}")));
        entry.insert("owner".to_string(), Value::from("${my.name}"));
        entry.insert("total".to_string(), Value::from(format!("$(sum(${{ints}}) + {i})")));
        entry.insert("note".to_string(), Value::from("\\${escaped} for ${my_name}"));
        root.insert(format!("entry_{i}"), Value::object(entry));
    }
    Value::object(root)
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_span_scanning(c: &mut Criterion) {
    let mut group = c.benchmark_group("span_scanning");
    group.sample_size(300);

    let cases = [
        ("no_spans", "just some text with a $200 price tag"),
        ("one_variable", "Hello ${user.name}, welcome back"),
        ("nested", "${a.${b.${c}}} and ${d}"),
        ("escaped", "\\${a} \\${b} ${c}"),
    ];
    for (name, input) in cases {
        group.bench_function(name, |b| {
            b.iter(|| black_box(span::find(black_box(input), &SpanSyntax::VARIABLE)))
        });
    }
    group.finish();
}

fn bench_expressions(c: &mut Criterion) {
    let mut group = c.benchmark_group("expressions");
    group.sample_size(300);
    let env = Environment::default();

    let cases = [
        ("arithmetic", "(1 + 2) * 3 - 4 / 5"),
        ("sum", "sum([0, 1, 2, 3])"),
        ("comprehension", "[i * 2 for i in [0, 1, 2, 3] if i > 0]"),
        ("dates", "date('1970-01-31') + months(1)"),
    ];
    for (name, source) in cases {
        let ast = parser::parse(source).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut evaluator = Evaluator::new(env.clone());
                black_box(evaluator.evaluate(black_box(&ast)))
            })
        });
    }
    group.finish();
}

fn bench_strings(c: &mut Criterion) {
    let mut group = c.benchmark_group("strings");
    group.sample_size(300);
    let ctx = context();
    let env = Environment::default();

    let cases = [
        ("plain", "nothing to do here"),
        ("variable", "${my.name}"),
        ("expression", "$(sum(${ints}))"),
        ("mixed", "$('${names.0.name}')-${names.1.name}-$(${my_int} * 2)"),
    ];
    for (name, input) in cases {
        group.bench_function(name, |b| {
            b.iter(|| black_box(substitute_string(black_box(input), &ctx, &env)))
        });
    }
    group.finish();
}

fn bench_documents(c: &mut Criterion) {
    let mut group = c.benchmark_group("documents");
    let ctx = context();
    let env = Environment::default();

    for n in [10usize, 100, 1000] {
        let doc = document(n);
        group.bench_with_input(BenchmarkId::new("substitute", n), &doc, |b, d| {
            b.iter(|| black_box(substitute(black_box(d), &ctx, &env)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_span_scanning,
    bench_expressions,
    bench_strings,
    bench_documents,
);
criterion_main!(benches);
