use std::rc::Rc;

use crate::bytecode::combinator::{Branches, Callee, CombRef, Section};
use crate::runtime::{error::Fault, value::{Frame, Value}};
use crate::syntax::term::Literal;

use super::{Control, Machine, local, store};

impl Machine<'_> {
    pub(super) fn eval(
        &mut self,
        mut env: Vec<Value>,
        comb: CombRef,
        code: Rc<Section>,
    ) -> Result<Control, Fault> {
        match &*code {
            Section::Let { slot, value, body } => {
                if let Some(result) = self.direct(&env, value)? {
                    store(&mut env, *slot, result)?;
                    return Ok(Control::Eval {
                        env,
                        comb,
                        code: body.clone(),
                    });
                }
                self.push_frame(Frame::Bind {
                    env: env.clone(),
                    comb,
                    slot: *slot,
                    body: body.clone(),
                })?;
                Ok(Control::Eval {
                    env,
                    comb,
                    code: value.clone(),
                })
            }
            Section::Call { callee, args } => {
                let args = self.operands(&env, args)?;
                match callee {
                    Callee::Comb(id) => self.call(CombRef { id: *id, index: 0 }, args),
                    Callee::Local(slot) => {
                        let function = local(&env, *slot)?;
                        self.apply(function, args)
                    }
                }
            }
            Section::Request { ability, tag, args } => {
                let args = self.operands(&env, args)?;
                self.request(*ability, *tag, args)
            }
            Section::Match {
                scrutinee,
                branches,
            } => {
                let value = local(&env, *scrutinee)?;
                self.select(env, comb, value, branches)
            }
            Section::Handle {
                abilities,
                handler,
                body,
            } => {
                let handler = self.operand(&env, handler)?;
                self.push_frame(Frame::Delimit {
                    abilities: abilities.as_slice().into(),
                    handler,
                })?;
                Ok(Control::Eval {
                    env,
                    comb,
                    code: body.clone(),
                })
            }
            Section::MatchFail => Err(Fault::MatchFailure),
            Section::Return(_)
            | Section::Prim { .. }
            | Section::Construct { .. }
            | Section::Closure { .. } => match self.direct(&env, &code)? {
                Some(value) => Ok(Control::Return(value)),
                None => Err(Fault::Runtime("section produced no value".to_string())),
            },
        }
    }

    /// Evaluates sections that produce a value without touching the
    /// continuation stack. Returns `None` for everything else.
    pub(super) fn direct(&self, env: &[Value], section: &Section) -> Result<Option<Value>, Fault> {
        let value = match section {
            Section::Return(op) => self.operand(env, op)?,
            Section::Prim { op, args } => {
                let args = self.operands(env, args)?;
                self.foreign.call(*op, args)?
            }
            Section::Construct { type_id, tag, args } => Value::Data {
                type_id: *type_id,
                tag: *tag,
                fields: self.operands(env, args)?.into(),
            },
            Section::Closure { comb, captured } => Value::Closure {
                comb: *comb,
                args: self.operands(env, captured)?.into(),
            },
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    fn select(
        &mut self,
        mut env: Vec<Value>,
        comb: CombRef,
        value: Value,
        branches: &Branches,
    ) -> Result<Control, Fault> {
        let (body, default) = match branches {
            Branches::Data { cases, default } => {
                let case = match &value {
                    Value::Data { tag, fields, .. } => cases.get(tag).map(|case| (case, fields)),
                    _ => None,
                };
                match case {
                    Some((case, fields)) => {
                        bind_all(&mut env, &case.fields, fields.iter().cloned())?;
                        (Some(case.body.clone()), default)
                    }
                    None => (None, default),
                }
            }
            Branches::Literal { cases, default } => {
                let body = cases
                    .iter()
                    .find(|(lit, _)| literal_matches(lit, &value))
                    .map(|(_, body)| body.clone());
                (body, default)
            }
            Branches::Request {
                cases,
                pure,
                default,
            } => match &value {
                Value::Request {
                    ability,
                    tag,
                    args,
                    continuation,
                } => match cases.get(&(*ability, *tag)) {
                    Some(case) => {
                        bind_all(&mut env, &case.args, args.iter().cloned())?;
                        store(
                            &mut env,
                            case.continuation,
                            Value::Continuation(continuation.clone()),
                        )?;
                        (Some(case.body.clone()), default)
                    }
                    None => (None, default),
                },
                Value::Pure(inner) => match pure {
                    Some((slot, body)) => {
                        store(&mut env, *slot, (**inner).clone())?;
                        (Some(body.clone()), default)
                    }
                    None => (None, default),
                },
                _ => (None, default),
            },
        };

        match body.or_else(|| default.clone()) {
            Some(code) => Ok(Control::Eval { env, comb, code }),
            None => Err(Fault::MatchFailure),
        }
    }
}

fn bind_all(
    env: &mut [Value],
    slots: &[usize],
    values: impl ExactSizeIterator<Item = Value>,
) -> Result<(), Fault> {
    if slots.len() != values.len() {
        return Err(Fault::Runtime(format!(
            "constructor has {} fields, pattern binds {}",
            values.len(),
            slots.len()
        )));
    }
    for (slot, value) in slots.iter().zip(values) {
        store(env, *slot, value)?;
    }
    Ok(())
}

fn literal_matches(lit: &Literal, value: &Value) -> bool {
    match (lit, value) {
        (Literal::Int(a), Value::Int(b)) => a == b,
        (Literal::Boolean(a), Value::Boolean(b)) => a == b,
        (Literal::Text(a), Value::Text(b)) => a.as_str() == &**b,
        _ => false,
    }
}
