use std::{collections::BTreeMap, fmt, rc::Rc};

use crate::primop::PrimOp;
use crate::runtime::numbering::Word;
use crate::syntax::term::Literal;

/// Address of one combinator: the term id owning the set and the position
/// inside it. Position 0 is the term's entry point; lifted lambdas follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CombRef {
    pub id: Word,
    pub index: usize,
}

impl fmt::Display for CombRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.id, self.index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Frame slot of the running combinator.
    Local(usize),
    Lit(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    /// Entry combinator of a term.
    Comb(Word),
    Local(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Return(Operand),
    /// Evaluates `value`, stores the result in `slot`, continues with `body`.
    Let {
        slot: usize,
        value: Rc<Section>,
        body: Rc<Section>,
    },
    Call {
        callee: Callee,
        args: Vec<Operand>,
    },
    Prim {
        op: PrimOp,
        args: Vec<Operand>,
    },
    Construct {
        type_id: Word,
        tag: u32,
        args: Vec<Operand>,
    },
    Request {
        ability: Word,
        tag: u32,
        args: Vec<Operand>,
    },
    Closure {
        comb: CombRef,
        captured: Vec<Operand>,
    },
    Match {
        scrutinee: usize,
        branches: Branches,
    },
    Handle {
        abilities: Vec<Word>,
        handler: Operand,
        body: Rc<Section>,
    },
    MatchFail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Branches {
    Data {
        cases: BTreeMap<u32, DataCase>,
        default: Option<Rc<Section>>,
    },
    Literal {
        cases: Vec<(Literal, Rc<Section>)>,
        default: Option<Rc<Section>>,
    },
    Request {
        cases: BTreeMap<(Word, u32), RequestCase>,
        pure: Option<(usize, Rc<Section>)>,
        default: Option<Rc<Section>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataCase {
    pub fields: Vec<usize>,
    pub body: Rc<Section>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestCase {
    pub args: Vec<usize>,
    pub continuation: usize,
    pub body: Rc<Section>,
}

/// A supercombinator: `arity` parameters in slots `0..arity`, the remaining
/// slots up to `frame_size` filled by `Let` and match bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Comb {
    pub arity: usize,
    pub frame_size: usize,
    pub body: Rc<Section>,
}

/// All combinators compiled from one term.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinatorSet {
    pub combs: Vec<Comb>,
}

impl CombinatorSet {
    pub fn new(combs: Vec<Comb>) -> Self {
        Self { combs }
    }

    pub fn entry(&self) -> Option<&Comb> {
        self.combs.first()
    }

    pub fn get(&self, index: usize) -> Option<&Comb> {
        self.combs.get(index)
    }

    pub fn len(&self) -> usize {
        self.combs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combs.is_empty()
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Local(slot) => write!(f, "s{}", slot),
            Operand::Lit(lit) => write!(f, "{}", lit),
        }
    }
}

/// Human-readable listing of a combinator set, one combinator per block.
pub fn disassemble(set: &CombinatorSet) -> String {
    let mut out = String::new();
    for (index, comb) in set.combs.iter().enumerate() {
        out.push_str(&format!(
            "comb {} (arity {}, frame {}):\n",
            index, comb.arity, comb.frame_size
        ));
        write_section(&mut out, &comb.body, 1);
    }
    out
}

fn operands(args: &[Operand]) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn slots(slots: &[usize]) -> String {
    slots
        .iter()
        .map(|s| format!("s{}", s))
        .collect::<Vec<_>>()
        .join(", ")
}

fn line(out: &mut String, depth: usize, text: &str) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(text);
    out.push('\n');
}

fn inline(section: &Section) -> Option<String> {
    Some(match section {
        Section::Return(op) => format!("return {}", op),
        Section::Call { callee, args } => match callee {
            Callee::Comb(id) => format!("call #{}({})", id, operands(args)),
            Callee::Local(slot) => format!("call s{}({})", slot, operands(args)),
        },
        Section::Prim { op, args } => format!("prim {}({})", op.display_name(), operands(args)),
        Section::Construct { type_id, tag, args } => {
            format!("construct {}#{}({})", type_id, tag, operands(args))
        }
        Section::Request { ability, tag, args } => {
            format!("request {}#{}({})", ability, tag, operands(args))
        }
        Section::Closure { comb, captured } => format!("closure {}[{}]", comb, operands(captured)),
        Section::MatchFail => "match-fail".to_string(),
        Section::Let { .. } | Section::Match { .. } | Section::Handle { .. } => return None,
    })
}

fn write_section(out: &mut String, section: &Section, depth: usize) {
    if let Some(text) = inline(section) {
        line(out, depth, &text);
        return;
    }
    match section {
        Section::Let { slot, value, body } => {
            match inline(value) {
                Some(text) => line(out, depth, &format!("let s{} = {}", slot, text)),
                None => {
                    line(out, depth, &format!("let s{} =", slot));
                    write_section(out, value, depth + 1);
                }
            }
            write_section(out, body, depth);
        }
        Section::Match {
            scrutinee,
            branches,
        } => {
            line(out, depth, &format!("match s{}", scrutinee));
            write_branches(out, branches, depth + 1);
        }
        Section::Handle {
            abilities,
            handler,
            body,
        } => {
            let abilities = abilities
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            line(out, depth, &format!("handle [{}] with {}", abilities, handler));
            write_section(out, body, depth + 1);
        }
        _ => {}
    }
}

fn write_branches(out: &mut String, branches: &Branches, depth: usize) {
    let default = match branches {
        Branches::Data { cases, default } => {
            for (tag, case) in cases {
                line(out, depth, &format!("#{} [{}] ->", tag, slots(&case.fields)));
                write_section(out, &case.body, depth + 1);
            }
            default
        }
        Branches::Literal { cases, default } => {
            for (lit, body) in cases {
                line(out, depth, &format!("{} ->", lit));
                write_section(out, body, depth + 1);
            }
            default
        }
        Branches::Request {
            cases,
            pure,
            default,
        } => {
            if let Some((slot, body)) = pure {
                line(out, depth, &format!("{{ s{} }} ->", slot));
                write_section(out, body, depth + 1);
            }
            for ((ability, tag), case) in cases {
                line(
                    out,
                    depth,
                    &format!(
                        "{{ {}#{} [{}] k s{} }} ->",
                        ability,
                        tag,
                        slots(&case.args),
                        case.continuation
                    ),
                );
                write_section(out, &case.body, depth + 1);
            }
            default
        }
    };
    if let Some(body) = default {
        line(out, depth, "_ ->");
        write_section(out, body, depth + 1);
    }
}
