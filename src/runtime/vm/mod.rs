use std::{
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

use crate::{
    bytecode::combinator::{CombRef, CombinatorSet, Operand, Section},
    primop::ForeignTable,
    runtime::{
        config::RuntimeConfig,
        error::Fault,
        numbering::Word,
        value::{Frame, Value},
    },
    syntax::{reference::Reference, term::Literal},
};

mod dispatch;
mod effects;
mod function_call;
mod trace;

/// What the machine does next: run a section in a frame environment, or
/// deliver a value to the topmost continuation frame.
pub(crate) enum Control {
    Eval {
        env: Vec<Value>,
        comb: CombRef,
        code: Rc<Section>,
    },
    Return(Value),
}

/// Strict stack machine over compiled combinators.
///
/// The machine borrows everything it needs from the evaluation context and
/// owns only its continuation stack, so one instance serves one run.
pub struct Machine<'a> {
    combinators: &'a HashMap<Word, Rc<CombinatorSet>>,
    foreign: &'a ForeignTable,
    backrefs: &'a BTreeMap<Word, Reference>,
    stack: Vec<Frame>,
    max_frames: usize,
    trace: bool,
    steps: u64,
}

impl<'a> Machine<'a> {
    pub fn new(
        combinators: &'a HashMap<Word, Rc<CombinatorSet>>,
        foreign: &'a ForeignTable,
        backrefs: &'a BTreeMap<Word, Reference>,
        config: &RuntimeConfig,
    ) -> Self {
        Self {
            combinators,
            foreign,
            backrefs,
            stack: Vec::new(),
            max_frames: config.max_frames,
            trace: config.trace,
            steps: 0,
        }
    }

    /// Runs the entry combinator of term `entry` with no arguments until the
    /// continuation stack is empty, handing the final value to `on_result`.
    pub fn run<F: FnOnce(Value)>(&mut self, entry: Word, on_result: F) -> Result<(), Fault> {
        let mut control = self.call(CombRef { id: entry, index: 0 }, Vec::new())?;
        loop {
            self.steps += 1;
            control = match control {
                Control::Eval { env, comb, code } => {
                    if self.trace {
                        self.trace_section(comb, &code);
                    }
                    self.eval(env, comb, code)?
                }
                Control::Return(value) => match self.stack.pop() {
                    None => {
                        on_result(value);
                        return Ok(());
                    }
                    Some(frame) => self.resume(frame, value)?,
                },
            };
        }
    }

    /// Number of machine steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn push_frame(&mut self, frame: Frame) -> Result<(), Fault> {
        if self.stack.len() >= self.max_frames {
            return Err(Fault::StackOverflow(self.max_frames));
        }
        self.stack.push(frame);
        Ok(())
    }

    fn resume(&mut self, frame: Frame, value: Value) -> Result<Control, Fault> {
        match frame {
            Frame::Bind {
                mut env,
                comb,
                slot,
                body,
            } => {
                store(&mut env, slot, value)?;
                Ok(Control::Eval {
                    env,
                    comb,
                    code: body,
                })
            }
            Frame::Apply { args } => self.apply(value, args),
            Frame::Delimit { handler, .. } => self.apply(handler, vec![Value::Pure(Rc::new(value))]),
        }
    }

    fn operand(&self, env: &[Value], operand: &Operand) -> Result<Value, Fault> {
        match operand {
            Operand::Local(slot) => local(env, *slot),
            Operand::Lit(lit) => Ok(literal_value(lit)),
        }
    }

    fn operands(&self, env: &[Value], operands: &[Operand]) -> Result<Vec<Value>, Fault> {
        operands.iter().map(|op| self.operand(env, op)).collect()
    }
}

pub(crate) fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(v) => Value::Int(*v),
        Literal::Boolean(v) => Value::Boolean(*v),
        Literal::Text(v) => Value::Text(v.as_str().into()),
    }
}

fn local(env: &[Value], slot: usize) -> Result<Value, Fault> {
    match env.get(slot) {
        Some(Value::Uninit) => Err(Fault::Runtime(format!(
            "read from uninitialized slot s{}",
            slot
        ))),
        Some(value) => Ok(value.clone()),
        None => Err(Fault::Runtime(format!("slot s{} out of range", slot))),
    }
}

fn store(env: &mut [Value], slot: usize, value: Value) -> Result<(), Fault> {
    match env.get_mut(slot) {
        Some(cell) => {
            *cell = value;
            Ok(())
        }
        None => Err(Fault::Runtime(format!("slot s{} out of range", slot))),
    }
}

#[cfg(test)]
mod dispatch_test;
#[cfg(test)]
mod function_call_test;
