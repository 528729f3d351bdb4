use std::cmp::Ordering;

use crate::bytecode::combinator::CombRef;
use crate::runtime::{error::Fault, value::{Frame, Value}};

use super::{Control, Machine};

impl Machine<'_> {
    /// Calls a combinator. Exact calls enter the body, short calls build a
    /// closure, and long calls enter with the leading arguments and apply the
    /// result to the rest.
    pub(super) fn call(&mut self, comb: CombRef, mut args: Vec<Value>) -> Result<Control, Fault> {
        let (arity, frame_size, body) = {
            let target = self
                .combinators
                .get(&comb.id)
                .and_then(|set| set.get(comb.index))
                .ok_or_else(|| Fault::Runtime(format!("unknown combinator {}", self.describe(comb))))?;
            (target.arity, target.frame_size, target.body.clone())
        };

        match args.len().cmp(&arity) {
            Ordering::Less => Ok(Control::Return(Value::Closure {
                comb,
                args: args.into(),
            })),
            Ordering::Equal => {
                args.resize(frame_size.max(arity), Value::Uninit);
                Ok(Control::Eval {
                    env: args,
                    comb,
                    code: body,
                })
            }
            Ordering::Greater => {
                let rest = args.split_off(arity);
                self.push_frame(Frame::Apply { args: rest })?;
                args.resize(frame_size.max(arity), Value::Uninit);
                Ok(Control::Eval {
                    env: args,
                    comb,
                    code: body,
                })
            }
        }
    }

    pub(super) fn apply(&mut self, function: Value, args: Vec<Value>) -> Result<Control, Fault> {
        match &function {
            Value::Closure { comb, args: held } => {
                let mut all = Vec::with_capacity(held.len() + args.len());
                all.extend(held.iter().cloned());
                all.extend(args);
                self.call(*comb, all)
            }
            Value::Continuation(frames) => self.resume_continuation(frames, args),
            other => Err(Fault::Runtime(format!(
                "not a function: {}",
                other.type_name()
            ))),
        }
    }
}
