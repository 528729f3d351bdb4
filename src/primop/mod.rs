use std::rc::Rc;

use crate::runtime::{error::Fault, value::Value};

/// Primitive operations backing the builtin terms.
///
/// IDs index the foreign-call table, so existing discriminants must remain
/// stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PrimOp {
    /// Integer addition: `Int x Int -> Int`.
    IAdd = 0,
    ISub = 1,
    IMul = 2,
    /// Truncating division; dividing by zero faults.
    IDiv = 3,
    IMod = 4,
    INeg = 5,
    IEq = 6,
    ILt = 7,
    ILe = 8,
    IGt = 9,
    IGe = 10,
    IToText = 11,
    BNot = 12,
    TConcat = 13,
    TSize = 14,
    TEq = 15,
    /// Raises a fault carrying its argument.
    Bug = 16,
}

impl PrimOp {
    pub const ALL: [PrimOp; 17] = [
        PrimOp::IAdd,
        PrimOp::ISub,
        PrimOp::IMul,
        PrimOp::IDiv,
        PrimOp::IMod,
        PrimOp::INeg,
        PrimOp::IEq,
        PrimOp::ILt,
        PrimOp::ILe,
        PrimOp::IGt,
        PrimOp::IGe,
        PrimOp::IToText,
        PrimOp::BNot,
        PrimOp::TConcat,
        PrimOp::TSize,
        PrimOp::TEq,
        PrimOp::Bug,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Returns the fixed argument count for this operation.
    pub fn arity(self) -> usize {
        match self {
            Self::INeg | Self::IToText | Self::BNot | Self::TSize | Self::Bug => 1,
            _ => 2,
        }
    }

    /// Name of the builtin term backed by this operation.
    pub fn builtin_name(self) -> &'static str {
        match self {
            Self::IAdd => "Int.+",
            Self::ISub => "Int.-",
            Self::IMul => "Int.*",
            Self::IDiv => "Int./",
            Self::IMod => "Int.%",
            Self::INeg => "Int.negate",
            Self::IEq => "Int.==",
            Self::ILt => "Int.<",
            Self::ILe => "Int.<=",
            Self::IGt => "Int.>",
            Self::IGe => "Int.>=",
            Self::IToText => "Int.toText",
            Self::BNot => "Boolean.not",
            Self::TConcat => "Text.++",
            Self::TSize => "Text.size",
            Self::TEq => "Text.==",
            Self::Bug => "bug",
        }
    }

    /// Human-readable name used in traces and disassembly.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::IAdd => "iadd",
            Self::ISub => "isub",
            Self::IMul => "imul",
            Self::IDiv => "idiv",
            Self::IMod => "imod",
            Self::INeg => "ineg",
            Self::IEq => "ieq",
            Self::ILt => "ilt",
            Self::ILe => "ile",
            Self::IGt => "igt",
            Self::IGe => "ige",
            Self::IToText => "itotext",
            Self::BNot => "bnot",
            Self::TConcat => "tconcat",
            Self::TSize => "tsize",
            Self::TEq => "teq",
            Self::Bug => "bug",
        }
    }
}

/// Signature of an entry in the foreign-call table.
pub type ForeignFn = fn(PrimOp, Vec<Value>) -> Result<Value, Fault>;

/// Foreign calls available to running code, indexed by [`PrimOp::id`].
#[derive(Clone)]
pub struct ForeignTable {
    entries: Vec<ForeignFn>,
}

impl ForeignTable {
    pub fn builtin() -> Self {
        Self {
            entries: PrimOp::ALL.iter().map(|_| execute_primop as ForeignFn).collect(),
        }
    }

    pub fn call(&self, op: PrimOp, args: Vec<Value>) -> Result<Value, Fault> {
        match self.entries.get(op.id() as usize) {
            Some(entry) => entry(op, args),
            None => Err(Fault::Runtime(format!(
                "no foreign function registered for {}",
                op.display_name()
            ))),
        }
    }
}

impl Default for ForeignTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Executes a primitive operation with machine values.
///
/// Arity is validated here so malformed combinators fail with a fault
/// instead of a panic.
pub fn execute_primop(op: PrimOp, args: Vec<Value>) -> Result<Value, Fault> {
    if args.len() != op.arity() {
        return Err(Fault::Runtime(format!(
            "primop {} expects {} arguments, got {}",
            op.display_name(),
            op.arity(),
            args.len()
        )));
    }

    match op {
        PrimOp::IAdd => int2(args, op, |a, b| Ok(Value::Int(a.wrapping_add(b)))),
        PrimOp::ISub => int2(args, op, |a, b| Ok(Value::Int(a.wrapping_sub(b)))),
        PrimOp::IMul => int2(args, op, |a, b| Ok(Value::Int(a.wrapping_mul(b)))),
        PrimOp::IDiv => int2(args, op, |a, b| {
            if b == 0 {
                return Err(Fault::Runtime("division by zero".to_string()));
            }
            Ok(Value::Int(a.wrapping_div(b)))
        }),
        PrimOp::IMod => int2(args, op, |a, b| {
            if b == 0 {
                return Err(Fault::Runtime("division by zero".to_string()));
            }
            Ok(Value::Int(a.wrapping_rem(b)))
        }),
        PrimOp::INeg => Ok(Value::Int(expect_int(&args[0], op)?.wrapping_neg())),
        PrimOp::IEq => int2(args, op, |a, b| Ok(Value::Boolean(a == b))),
        PrimOp::ILt => int2(args, op, |a, b| Ok(Value::Boolean(a < b))),
        PrimOp::ILe => int2(args, op, |a, b| Ok(Value::Boolean(a <= b))),
        PrimOp::IGt => int2(args, op, |a, b| Ok(Value::Boolean(a > b))),
        PrimOp::IGe => int2(args, op, |a, b| Ok(Value::Boolean(a >= b))),
        PrimOp::IToText => Ok(Value::Text(expect_int(&args[0], op)?.to_string().into())),
        PrimOp::BNot => match &args[0] {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            other => Err(type_error(op, "Boolean", other)),
        },
        PrimOp::TConcat => {
            let left = expect_text(&args[0], op)?;
            let right = expect_text(&args[1], op)?;
            let joined: Rc<str> = format!("{}{}", left, right).into();
            Ok(Value::Text(joined))
        }
        PrimOp::TSize => Ok(Value::Int(expect_text(&args[0], op)?.chars().count() as i64)),
        PrimOp::TEq => {
            let left = expect_text(&args[0], op)?;
            let right = expect_text(&args[1], op)?;
            Ok(Value::Boolean(left == right))
        }
        PrimOp::Bug => {
            let mut args = args;
            Err(Fault::Bug(args.remove(0)))
        }
    }
}

/// Helper for binary integer primops.
fn int2<F>(args: Vec<Value>, op: PrimOp, f: F) -> Result<Value, Fault>
where
    F: FnOnce(i64, i64) -> Result<Value, Fault>,
{
    let left = expect_int(&args[0], op)?;
    let right = expect_int(&args[1], op)?;
    f(left, right)
}

fn expect_int(value: &Value, op: PrimOp) -> Result<i64, Fault> {
    match value {
        Value::Int(v) => Ok(*v),
        other => Err(type_error(op, "Int", other)),
    }
}

fn expect_text(value: &Value, op: PrimOp) -> Result<&str, Fault> {
    match value {
        Value::Text(v) => Ok(v),
        other => Err(type_error(op, "Text", other)),
    }
}

/// Standardized type-mismatch fault for primops.
fn type_error(op: PrimOp, expected: &str, got: &Value) -> Fault {
    Fault::Runtime(format!(
        "primop {} expected {}, got {}",
        op.display_name(),
        expected,
        got.type_name()
    ))
}
