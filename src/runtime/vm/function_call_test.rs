use std::{
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

use crate::{
    bytecode::combinator::{Callee, Comb, CombRef, CombinatorSet, Operand, Section},
    primop::{ForeignTable, PrimOp},
    runtime::{
        config::RuntimeConfig,
        error::Fault,
        numbering::Word,
        value::Value,
        vm::Machine,
    },
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

fn run(sets: Vec<(Word, Vec<Comb>)>) -> Result<Value, Fault> {
    let combinators: HashMap<Word, Rc<CombinatorSet>> = sets
        .into_iter()
        .map(|(id, combs)| (id, Rc::new(CombinatorSet::new(combs))))
        .collect();
    let foreign = ForeignTable::builtin();
    let backrefs = BTreeMap::new();
    let config = RuntimeConfig::default();
    let mut machine = Machine::new(&combinators, &foreign, &backrefs, &config);
    let mut result = None;
    machine.run(0, |value| result = Some(value))?;
    Ok(result.expect("machine delivered a result"))
}

fn add() -> Comb {
    comb(
        2,
        2,
        Section::Prim {
            op: PrimOp::IAdd,
            args: vec![Operand::Local(0), Operand::Local(1)],
        },
    )
}

#[test]
fn exact_call_enters_the_combinator() {
    let entry = comb(
        0,
        0,
        Section::Call {
            callee: Callee::Comb(1),
            args: vec![int(2), int(3)],
        },
    );
    let result = run(vec![(0, vec![entry]), (1, vec![add()])]).unwrap();
    assert!(matches!(result, Value::Int(5)));
}

#[test]
fn short_call_builds_a_closure() {
    let entry = comb(
        0,
        1,
        Section::Let {
            slot: 0,
            value: Rc::new(Section::Call {
                callee: Callee::Comb(1),
                args: vec![int(2)],
            }),
            body: Rc::new(Section::Call {
                callee: Callee::Local(0),
                args: vec![int(40)],
            }),
        },
    );
    let result = run(vec![(0, vec![entry]), (1, vec![add()])]).unwrap();
    assert!(matches!(result, Value::Int(42)));
}

#[test]
fn long_call_applies_the_result_to_the_rest() {
    let curried = vec![
        comb(
            1,
            1,
            Section::Closure {
                comb: CombRef { id: 2, index: 1 },
                captured: vec![Operand::Local(0)],
            },
        ),
        comb(
            2,
            2,
            Section::Prim {
                op: PrimOp::IMul,
                args: vec![Operand::Local(0), Operand::Local(1)],
            },
        ),
    ];
    let entry = comb(
        0,
        0,
        Section::Call {
            callee: Callee::Comb(2),
            args: vec![int(6), int(7)],
        },
    );
    let result = run(vec![(0, vec![entry]), (2, curried)]).unwrap();
    assert!(matches!(result, Value::Int(42)));
}

#[test]
fn applying_a_non_function_faults() {
    let entry = comb(
        0,
        1,
        Section::Let {
            slot: 0,
            value: Rc::new(Section::Return(int(1))),
            body: Rc::new(Section::Call {
                callee: Callee::Local(0),
                args: vec![],
            }),
        },
    );
    let err = run(vec![(0, vec![entry])]).unwrap_err();
    assert_eq!(err.to_string(), "not a function: Int");
}

#[test]
fn unknown_combinator_faults() {
    let entry = comb(
        0,
        0,
        Section::Call {
            callee: Callee::Comb(9),
            args: vec![],
        },
    );
    let err = run(vec![(0, vec![entry])]).unwrap_err();
    assert_eq!(err.to_string(), "unknown combinator #9.0");
}
