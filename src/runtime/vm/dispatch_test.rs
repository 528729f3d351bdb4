use std::{
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

use crate::{
    bytecode::combinator::{Branches, Callee, Comb, CombinatorSet, DataCase, Operand, Section},
    primop::{ForeignTable, PrimOp},
    runtime::{config::RuntimeConfig, error::Fault, numbering::Word, value::Value, vm::Machine},
    syntax::term::Literal,
};

fn int(v: i64) -> Operand {
    Operand::Lit(Literal::Int(v))
}

fn comb(arity: usize, frame_size: usize, body: Section) -> Comb {
    Comb {
        arity,
        frame_size,
        body: Rc::new(body),
    }
}

fn run_with(config: RuntimeConfig, sets: Vec<(Word, Vec<Comb>)>) -> Result<Value, Fault> {
    let combinators: HashMap<Word, Rc<CombinatorSet>> = sets
        .into_iter()
        .map(|(id, combs)| (id, Rc::new(CombinatorSet::new(combs))))
        .collect();
    let foreign = ForeignTable::builtin();
    let backrefs = BTreeMap::new();
    let mut machine = Machine::new(&combinators, &foreign, &backrefs, &config);
    let mut result = None;
    machine.run(0, |value| result = Some(value))?;
    Ok(result.expect("machine delivered a result"))
}

fn run(sets: Vec<(Word, Vec<Comb>)>) -> Result<Value, Fault> {
    run_with(RuntimeConfig::default(), sets)
}

fn let_in(slot: usize, value: Section, body: Section) -> Section {
    Section::Let {
        slot,
        value: Rc::new(value),
        body: Rc::new(body),
    }
}

#[test]
fn primitive_sections_return_directly() {
    let entry = comb(
        0,
        0,
        Section::Prim {
            op: PrimOp::ISub,
            args: vec![int(10), int(3)],
        },
    );
    let result = run(vec![(0, vec![entry])]).unwrap();
    assert!(matches!(result, Value::Int(7)));
}

#[test]
fn let_binds_the_value_for_the_body() {
    let entry = comb(
        0,
        2,
        let_in(
            0,
            Section::Prim {
                op: PrimOp::IMul,
                args: vec![int(4), int(5)],
            },
            let_in(
                1,
                Section::Prim {
                    op: PrimOp::IAdd,
                    args: vec![Operand::Local(0), int(1)],
                },
                Section::Return(Operand::Local(1)),
            ),
        ),
    );
    let result = run(vec![(0, vec![entry])]).unwrap();
    assert!(matches!(result, Value::Int(21)));
}

#[test]
fn data_match_binds_constructor_fields() {
    let mut cases = BTreeMap::new();
    cases.insert(
        0,
        DataCase {
            fields: vec![],
            body: Rc::new(Section::Return(int(0))),
        },
    );
    cases.insert(
        1,
        DataCase {
            fields: vec![1],
            body: Rc::new(Section::Return(Operand::Local(1))),
        },
    );
    let entry = comb(
        0,
        2,
        let_in(
            0,
            Section::Construct {
                type_id: 4,
                tag: 1,
                args: vec![int(5)],
            },
            Section::Match {
                scrutinee: 0,
                branches: Branches::Data {
                    cases,
                    default: None,
                },
            },
        ),
    );
    let result = run(vec![(0, vec![entry])]).unwrap();
    assert!(matches!(result, Value::Int(5)));
}

#[test]
fn literal_match_falls_back_to_default() {
    let entry = comb(
        0,
        1,
        let_in(
            0,
            Section::Return(Operand::Lit(Literal::Text("b".to_string()))),
            Section::Match {
                scrutinee: 0,
                branches: Branches::Literal {
                    cases: vec![(Literal::Text("a".to_string()), Rc::new(Section::Return(int(1))))],
                    default: Some(Rc::new(Section::Return(int(2)))),
                },
            },
        ),
    );
    let result = run(vec![(0, vec![entry])]).unwrap();
    assert!(matches!(result, Value::Int(2)));
}

#[test]
fn unmatched_scrutinee_is_a_match_failure() {
    let entry = comb(
        0,
        1,
        let_in(
            0,
            Section::Construct {
                type_id: 4,
                tag: 2,
                args: vec![],
            },
            Section::Match {
                scrutinee: 0,
                branches: Branches::Data {
                    cases: BTreeMap::new(),
                    default: None,
                },
            },
        ),
    );
    let err = run(vec![(0, vec![entry])]).unwrap_err();
    assert!(matches!(err, Fault::MatchFailure));
}

#[test]
fn bug_faults_with_its_payload() {
    let entry = comb(
        0,
        0,
        Section::Prim {
            op: PrimOp::Bug,
            args: vec![int(99)],
        },
    );
    let err = run(vec![(0, vec![entry])]).unwrap_err();
    assert!(matches!(err, Fault::Bug(Value::Int(99))));
}

#[test]
fn unbounded_recursion_overflows_the_stack() {
    let entry = comb(
        0,
        0,
        Section::Call {
            callee: Callee::Comb(1),
            args: vec![int(0)],
        },
    );
    let looping = comb(
        1,
        2,
        let_in(
            1,
            Section::Call {
                callee: Callee::Comb(1),
                args: vec![Operand::Local(0)],
            },
            Section::Return(Operand::Local(1)),
        ),
    );
    let config = RuntimeConfig::default().with_max_frames(64);
    let err = run_with(config, vec![(0, vec![entry]), (1, vec![looping])]).unwrap_err();
    assert!(matches!(err, Fault::StackOverflow(64)));
}

#[test]
fn reading_an_unwritten_slot_faults() {
    let entry = comb(0, 1, Section::Return(Operand::Local(0)));
    let err = run(vec![(0, vec![entry])]).unwrap_err();
    assert_eq!(err.to_string(), "read from uninitialized slot s0");
}
