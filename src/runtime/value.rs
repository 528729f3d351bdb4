use std::{fmt, mem, rc::Rc};

use crate::bytecode::combinator::{CombRef, Section};
use crate::runtime::numbering::Word;

/// Runtime value produced and consumed by the machine.
///
/// Heap-backed variants share their payload through `Rc`; values are
/// immutable once built and never form cycles.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Boolean(bool),
    Text(Rc<str>),
    /// Constructor `tag` of the data type numbered `type_id`.
    Data {
        type_id: Word,
        tag: u32,
        fields: Rc<[Value]>,
    },
    /// A combinator partially applied to `args`.
    Closure { comb: CombRef, args: Rc<[Value]> },
    /// Captured frames of a handled computation, resumable once per call.
    Continuation(Rc<[Frame]>),
    /// An operation request delivered to a handler.
    Request {
        ability: Word,
        tag: u32,
        args: Rc<[Value]>,
        continuation: Rc<[Frame]>,
    },
    /// A handled computation that finished with a value.
    Pure(Rc<Value>),
    /// Frame slot not yet written.
    Uninit,
}

/// One entry of the machine's continuation stack.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Waits for a value to store in `slot` before running `body`.
    Bind {
        env: Vec<Value>,
        comb: CombRef,
        slot: usize,
        body: Rc<Section>,
    },
    /// Applies the returned value to the remaining arguments of an
    /// over-saturated call.
    Apply { args: Vec<Value> },
    /// Delimits a `handle` block.
    Delimit {
        abilities: Rc<[Word]>,
        handler: Value,
    },
}

impl Value {
    /// Canonical runtime type label used in fault messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Boolean(_) => "Boolean",
            Value::Text(_) => "Text",
            Value::Data { .. } => "Data",
            Value::Closure { .. } => "Closure",
            Value::Continuation(_) => "Continuation",
            Value::Request { .. } => "Request",
            Value::Pure(_) => "Pure",
            Value::Uninit => "Uninit",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Piece<'a> {
            Value(&'a Value),
            Text(&'static str),
        }

        let mut pending = vec![Piece::Value(self)];
        while let Some(piece) = pending.pop() {
            let value = match piece {
                Piece::Value(value) => value,
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
            };
            match value {
                Value::Int(v) => write!(f, "{}", v)?,
                Value::Boolean(v) => write!(f, "{}", v)?,
                Value::Text(v) => write!(f, "{:?}", v)?,
                Value::Data {
                    type_id,
                    tag,
                    fields,
                } => {
                    write!(f, "{}#{}", type_id, tag)?;
                    for field in fields.iter().rev() {
                        pending.push(Piece::Text(")"));
                        pending.push(Piece::Value(field));
                        pending.push(Piece::Text(" ("));
                    }
                }
                Value::Closure { comb, args } => write!(f, "<closure {}/{}>", comb, args.len())?,
                Value::Continuation(frames) => write!(f, "<continuation {}>", frames.len())?,
                Value::Request { ability, tag, .. } => write!(f, "<request {}#{}>", ability, tag)?,
                Value::Pure(inner) => {
                    f.write_str("{ ")?;
                    pending.push(Piece::Text(" }"));
                    pending.push(Piece::Value(inner));
                }
                Value::Uninit => write!(f, "<uninit>")?,
            }
        }
        Ok(())
    }
}

/// Drops nested values from a work list instead of recursively, so a long
/// chain of data (a list built by the program, say) cannot exhaust the native
/// stack. Only uniquely owned payloads are taken apart; shared ones just lose
/// a reference.
impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        take_children(self, &mut pending);
        while let Some(mut value) = pending.pop() {
            take_children(&mut value, &mut pending);
        }
    }
}

fn take_children(value: &mut Value, pending: &mut Vec<Value>) {
    match value {
        Value::Data { fields: values, .. } | Value::Closure { args: values, .. } => {
            take_values(values, pending)
        }
        Value::Request {
            args, continuation, ..
        } => {
            take_values(args, pending);
            take_frames(continuation, pending);
        }
        Value::Continuation(frames) => take_frames(frames, pending),
        Value::Pure(inner) => {
            if let Some(inner) = Rc::get_mut(inner) {
                pending.push(mem::replace(inner, Value::Uninit));
            }
        }
        Value::Int(_) | Value::Boolean(_) | Value::Text(_) | Value::Uninit => {}
    }
}

fn take_values(values: &mut Rc<[Value]>, pending: &mut Vec<Value>) {
    if let Some(values) = Rc::get_mut(values) {
        pending.extend(values.iter_mut().map(|v| mem::replace(v, Value::Uninit)));
    }
}

fn take_frames(frames: &mut Rc<[Frame]>, pending: &mut Vec<Value>) {
    let Some(frames) = Rc::get_mut(frames) else {
        return;
    };
    for frame in frames.iter_mut() {
        match frame {
            Frame::Bind { env, .. } => pending.append(env),
            Frame::Apply { args } => pending.append(args),
            Frame::Delimit { handler, .. } => pending.push(mem::replace(handler, Value::Uninit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::combinator::{CombRef, Section};

    fn cons_list(len: usize) -> Value {
        let mut list = Value::Data {
            type_id: 9,
            tag: 0,
            fields: Rc::from(Vec::new()),
        };
        for n in 0..len {
            list = Value::Data {
                type_id: 9,
                tag: 1,
                fields: Rc::from(vec![Value::Int(n as i64), list]),
            };
        }
        list
    }

    #[test]
    fn dropping_a_long_list_does_not_recurse() {
        drop(cons_list(200_000));
    }

    #[test]
    fn dropping_a_deep_continuation_does_not_recurse() {
        let mut value = Value::Int(0);
        for _ in 0..200_000 {
            let frame = Frame::Bind {
                env: vec![value],
                comb: CombRef { id: 0, index: 0 },
                slot: 0,
                body: Rc::new(Section::MatchFail),
            };
            value = Value::Pure(Rc::new(Value::Continuation(Rc::from(vec![frame]))));
        }
        drop(value);
    }

    #[test]
    fn shared_payloads_survive_dropping_one_owner() {
        let shared: Rc<[Value]> = Rc::from(vec![Value::Int(1)]);
        let a = Value::Closure {
            comb: CombRef { id: 3, index: 0 },
            args: shared.clone(),
        };
        drop(a);
        assert!(matches!(shared[0], Value::Int(1)));
    }

    #[test]
    fn display_nests_fields_in_parentheses() {
        let pair = Value::Data {
            type_id: 4,
            tag: 0,
            fields: Rc::from(vec![Value::Int(1), Value::Pure(Rc::new(Value::Text("a".into())))]),
        };
        assert_eq!(pair.to_string(), "4#0 (1) ({ \"a\" })");
    }

    #[test]
    fn display_of_a_long_list_does_not_recurse() {
        let list = cons_list(100_000);
        assert!(list.to_string().starts_with("9#1 (99999) (9#1 (99998)"));
    }
}
