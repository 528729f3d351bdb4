use std::rc::Rc;

use cairn::bytecode::pipeline;
use cairn::runtime::{builtins::base_context, LoadError};
use cairn::syntax::{ConstructorDecl, MatchCase, Pattern, Type, TypeDecl};
use cairn::{Codebase, EvalError, PrintEnv, Reference, Runtime, RuntimeConfig, Term};

fn even_odd(store: &mut Codebase) -> (Reference, Reference) {
    let step = |name: &str, other: &str, base: bool| {
        Term::lambda(
            [name],
            Term::if_then_else(
                Term::call2("Int.==", Term::var(name), Term::int(0)),
                Term::boolean(base),
                Term::apply(
                    Term::var(other),
                    [Term::call2("Int.-", Term::var(name), Term::int(1))],
                ),
            ),
        )
    };
    let refs = store.add_term_group(vec![
        ("even".to_string(), step("n", "odd", true)),
        ("odd".to_string(), step("m", "even", false)),
    ]);
    (refs[0].clone(), refs[1].clone())
}

fn evaluate(runtime: &mut Runtime, store: &Codebase, term: &Term) -> Result<Term, EvalError> {
    runtime.evaluate(store, &PrintEnv::new(), term)
}

#[test]
fn mutually_recursive_terms_load_and_run() {
    let mut store = Codebase::new();
    let (even, odd) = even_odd(&mut store);
    let mut runtime = Runtime::with_config(RuntimeConfig::default());

    let term = Term::apply(Term::Ref(even.clone()), [Term::int(10)]);
    assert_eq!(evaluate(&mut runtime, &store, &term).unwrap(), Term::boolean(true));

    let ctx = runtime.context();
    let even_id = ctx.term_id(&even).unwrap();
    let odd_id = ctx.term_id(&odd).unwrap();
    let even_code = ctx.combinator_set(even_id).cloned().unwrap();

    let term = Term::apply(Term::Ref(odd.clone()), [Term::int(7)]);
    assert_eq!(evaluate(&mut runtime, &store, &term).unwrap(), Term::boolean(true));

    let ctx = runtime.context();
    assert_eq!(ctx.term_id(&even), Some(even_id));
    assert_eq!(ctx.term_id(&odd), Some(odd_id));
    assert!(Rc::ptr_eq(&even_code, ctx.combinator_set(even_id).unwrap()));
}

#[test]
fn local_letrec_runs_without_the_store() {
    let mut runtime = Runtime::with_config(RuntimeConfig::default());
    let sum_to = Term::lambda(
        ["n"],
        Term::if_then_else(
            Term::call2("Int.==", Term::var("n"), Term::int(0)),
            Term::int(0),
            Term::call2(
                "Int.+",
                Term::var("n"),
                Term::apply(
                    Term::var("sum"),
                    [Term::call2("Int.-", Term::var("n"), Term::int(1))],
                ),
            ),
        ),
    );
    let term = Term::let_in(
        "limit",
        Term::int(4),
        Term::let_rec(
            [("sum", sum_to)],
            Term::apply(Term::var("sum"), [Term::var("limit")]),
        ),
    );
    assert_eq!(
        evaluate(&mut runtime, &Codebase::new(), &term).unwrap(),
        Term::int(10)
    );
}

#[test]
fn mutually_recursive_types_load() {
    let mut store = Codebase::new();
    let refs = store.add_type_group(vec![
        (
            "Tree".to_string(),
            TypeDecl::data(vec![ConstructorDecl::new(
                "Node",
                vec![Type::builtin("Int"), Type::Var("Forest".into())],
            )]),
        ),
        (
            "Forest".to_string(),
            TypeDecl::data(vec![
                ConstructorDecl::new("Nil", vec![]),
                ConstructorDecl::new(
                    "Cons",
                    vec![Type::Var("Tree".into()), Type::Var("Forest".into())],
                ),
            ]),
        ),
    ]);
    let (tree, forest) = (refs[0].clone(), refs[1].clone());
    let ctor = |type_ref: &Reference, tag| Term::Constructor {
        type_ref: type_ref.clone(),
        tag,
    };
    let root_label = store.add_term(Term::lambda(
        ["t"],
        Term::match_on(
            Term::var("t"),
            vec![MatchCase::new(
                Pattern::Constructor {
                    type_ref: tree.clone(),
                    tag: 0,
                    args: vec![Pattern::Var("label".into()), Pattern::Wildcard],
                },
                Term::var("label"),
            )],
        ),
    ));

    let leaf = Term::apply(ctor(&tree, 0), [Term::int(7), ctor(&forest, 0)]);
    let term = Term::apply(Term::Ref(root_label), [leaf]);
    let mut runtime = Runtime::with_config(RuntimeConfig::default());

    assert_eq!(evaluate(&mut runtime, &store, &term).unwrap(), Term::int(7));
    assert!(runtime.context().type_id(&tree).is_some());
    assert!(runtime.context().type_id(&forest).is_some());
}

#[test]
fn compiling_before_types_are_loaded_is_fatal() {
    let mut store = Codebase::new();
    let boxed = store.add_type(TypeDecl::data(vec![ConstructorDecl::new(
        "Box",
        vec![Type::builtin("Int")],
    )]));
    let term = Term::apply(
        Term::Constructor {
            type_ref: boxed.clone(),
            tag: 0,
        },
        [Term::int(1)],
    );
    let mut ctx = base_context();
    assert_eq!(
        pipeline::compile_request(&mut ctx, term),
        Err(LoadError::MissingArity(boxed))
    );
}

#[test]
fn missing_store_entries_are_fatal_and_not_committed() {
    let mut store = Codebase::new();
    let boxed = store.add_type(TypeDecl::data(vec![ConstructorDecl::new(
        "Box",
        vec![Type::builtin("Int")],
    )]));
    let mut partial = Codebase::new();
    let user = Term::lambda(
        ["x"],
        Term::apply(
            Term::Constructor {
                type_ref: boxed.clone(),
                tag: 0,
            },
            [Term::var("x")],
        ),
    );
    let user_ref = partial.add_term(user);

    let mut runtime = Runtime::with_config(RuntimeConfig::default());
    let before = runtime.context().clone();
    let term = Term::apply(Term::Ref(user_ref), [Term::int(1)]);

    match evaluate(&mut runtime, &partial, &term) {
        Err(EvalError::Fatal(LoadError::MissingType(missing))) => assert_eq!(missing, boxed),
        other => panic!("expected a missing type, got {:?}", other),
    }
    assert_eq!(runtime.context(), &before);
}

#[test]
fn loading_is_incremental() {
    let mut store = Codebase::new();
    let (even, _) = even_odd(&mut store);
    let wrapper = store.add_term(Term::lambda(
        ["n"],
        Term::apply(Term::Ref(even.clone()), [Term::var("n")]),
    ));
    let mut runtime = Runtime::with_config(RuntimeConfig::default());

    evaluate(&mut runtime, &store, &Term::apply(Term::Ref(even), [Term::int(2)])).unwrap();
    let loaded = runtime.context().terms().len();
    evaluate(&mut runtime, &store, &Term::apply(Term::Ref(wrapper.clone()), [Term::int(3)])).unwrap();

    // the wrapper and the new request; nothing from the even/odd group again
    assert_eq!(runtime.context().terms().len(), loaded + 2);
    assert!(runtime.context().term_id(&wrapper).is_some());
}

fn local_even_odd(body: Term) -> Term {
    let step = |name: &str, other: &str, base: bool| {
        Term::lambda(
            [name],
            Term::if_then_else(
                Term::call2("Int.==", Term::var(name), Term::int(0)),
                Term::boolean(base),
                Term::apply(
                    Term::var(other),
                    [Term::call2("Int.-", Term::var(name), Term::int(1))],
                ),
            ),
        )
    };
    Term::let_rec(
        [("even", step("n", "odd", true)), ("odd", step("m", "even", false))],
        body,
    )
}

#[test]
fn request_letrec_members_are_shared_across_requests() {
    let store = Codebase::new();
    let mut runtime = Runtime::with_config(RuntimeConfig::default());

    let first = local_even_odd(Term::apply(Term::var("even"), [Term::int(10)]));
    assert_eq!(evaluate(&mut runtime, &store, &first).unwrap(), Term::boolean(true));
    let loaded = runtime.context().terms().len();
    let combinators = runtime.context().combinators().clone();

    let second = local_even_odd(Term::apply(Term::var("odd"), [Term::int(7)]));
    assert_eq!(evaluate(&mut runtime, &store, &second).unwrap(), Term::boolean(true));

    // only the new entry point; the members hash the same both times
    let ctx = runtime.context();
    assert_eq!(ctx.terms().len(), loaded + 1);
    for (id, set) in &combinators {
        assert!(Rc::ptr_eq(set, ctx.combinator_set(*id).unwrap()));
    }
}

#[test]
fn failed_compiles_roll_back_what_the_load_added() {
    let mut store = Codebase::new();
    let boxed = store.add_type(TypeDecl::data(vec![ConstructorDecl::new(
        "Box",
        vec![Type::builtin("Int")],
    )]));
    let broken = store.add_term(Term::lambda(
        ["x"],
        Term::apply(
            Term::Constructor {
                type_ref: boxed.clone(),
                tag: 3,
            },
            [Term::var("x")],
        ),
    ));
    let mut runtime = Runtime::with_config(RuntimeConfig::default());
    evaluate(&mut runtime, &store, &Term::int(0)).unwrap();
    let before = runtime.context().clone();

    let term = Term::apply(Term::Ref(broken.clone()), [Term::int(1)]);
    assert!(matches!(
        evaluate(&mut runtime, &store, &term),
        Err(EvalError::Fatal(LoadError::UnknownConstructor { .. }))
    ));
    let ctx = runtime.context();
    assert_eq!(ctx, &before);
    assert_eq!(ctx.type_id(&boxed), None);
    assert_eq!(ctx.term_id(&broken), None);

    // the session keeps working and reuses the ids it handed back
    let next = ctx.terms().next_id();
    evaluate(&mut runtime, &store, &Term::int(1)).unwrap();
    assert_eq!(runtime.context().terms().len() as u64, next + 1);
}
