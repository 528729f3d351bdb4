use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use cairn::{Codebase, PrintEnv, Reference, Runtime, RuntimeConfig, Term};

fn fib_store() -> (Codebase, Reference) {
    let mut store = Codebase::new();
    let fib = Term::lambda(
        ["n"],
        Term::if_then_else(
            Term::call2("Int.<", Term::var("n"), Term::int(2)),
            Term::var("n"),
            Term::call2(
                "Int.+",
                Term::apply(
                    Term::var("fib"),
                    [Term::call2("Int.-", Term::var("n"), Term::int(1))],
                ),
                Term::apply(
                    Term::var("fib"),
                    [Term::call2("Int.-", Term::var("n"), Term::int(2))],
                ),
            ),
        ),
    );
    let refs = store.add_term_group(vec![("fib".to_string(), fib)]);
    (store, refs[0].clone())
}

fn bench_warm_evaluate(c: &mut Criterion) {
    let (store, fib) = fib_store();
    let env = PrintEnv::new();
    let mut group = c.benchmark_group("evaluate/warm");
    for n in [10, 15, 20] {
        let mut runtime = Runtime::with_config(RuntimeConfig::default());
        let term = Term::apply(Term::Ref(fib.clone()), [Term::int(n)]);
        runtime.evaluate(&store, &env, &term).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &term, |b, term| {
            b.iter(|| black_box(runtime.evaluate(&store, &env, term).unwrap()))
        });
    }
    group.finish();
}

fn bench_cold_evaluate(c: &mut Criterion) {
    let (store, fib) = fib_store();
    let env = PrintEnv::new();
    let term = Term::apply(Term::Ref(fib), [Term::int(5)]);
    c.bench_function("evaluate/cold", |b| {
        b.iter(|| {
            let mut runtime = Runtime::with_config(RuntimeConfig::default());
            black_box(runtime.evaluate(&store, &env, &term).unwrap())
        })
    });
}

criterion_group!(benches, bench_warm_evaluate, bench_cold_evaluate);
criterion_main!(benches);
