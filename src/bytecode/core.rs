use std::collections::{BTreeMap, BTreeSet};

use crate::syntax::{reference::Reference, term::Literal};

/// Intermediate form between pattern splitting and normalization.
///
/// Constructors and requests are always saturated, matches inspect a single
/// variable one level deep, and after lambda lifting `Lambda` and `LetRec`
/// no longer occur.
#[derive(Debug, Clone, PartialEq)]
pub enum Core {
    Var(String),
    Ref(Reference),
    Lit(Literal),
    Lambda {
        params: Vec<String>,
        body: Box<Core>,
    },
    Apply {
        func: Box<Core>,
        args: Vec<Core>,
    },
    Let {
        name: String,
        value: Box<Core>,
        body: Box<Core>,
    },
    LetRec {
        bindings: Vec<(String, Core)>,
        body: Box<Core>,
    },
    Construct {
        type_ref: Reference,
        tag: u32,
        args: Vec<Core>,
    },
    Request {
        type_ref: Reference,
        tag: u32,
        args: Vec<Core>,
    },
    Match {
        scrutinee: String,
        branches: CoreBranches,
    },
    Handle {
        abilities: Vec<Reference>,
        handler: Box<Core>,
        body: Box<Core>,
    },
    /// Lifted combinator `comb` of the current set applied to `captured`.
    Closure {
        comb: usize,
        captured: Vec<String>,
    },
    MatchFail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CoreBranches {
    Data {
        cases: BTreeMap<u32, (Vec<String>, Core)>,
        default: Option<Box<Core>>,
    },
    Literal {
        cases: Vec<(Literal, Core)>,
        default: Option<Box<Core>>,
    },
    Request {
        cases: BTreeMap<(Reference, u32), RequestArm>,
        pure: Option<(String, Box<Core>)>,
        default: Option<Box<Core>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestArm {
    pub args: Vec<String>,
    pub continuation: String,
    pub body: Core,
}

impl Core {
    pub fn let_in(name: impl Into<String>, value: Core, body: Core) -> Self {
        Core::Let {
            name: name.into(),
            value: Box::new(value),
            body: Box::new(body),
        }
    }

    /// Variables used but not bound inside this expression.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut free = BTreeSet::new();
        collect_free(self, &mut Vec::new(), &mut free);
        free
    }
}

fn collect_free(core: &Core, bound: &mut Vec<String>, free: &mut BTreeSet<String>) {
    match core {
        Core::Var(name) => {
            if !bound.contains(name) {
                free.insert(name.clone());
            }
        }
        Core::Ref(_) | Core::Lit(_) | Core::MatchFail => {}
        Core::Lambda { params, body } => {
            within(bound, params.iter().cloned(), |bound| collect_free(body, bound, free));
        }
        Core::Apply { func, args } => {
            collect_free(func, bound, free);
            for arg in args {
                collect_free(arg, bound, free);
            }
        }
        Core::Let { name, value, body } => {
            collect_free(value, bound, free);
            within(bound, [name.clone()], |bound| collect_free(body, bound, free));
        }
        Core::LetRec { bindings, body } => {
            let names = bindings.iter().map(|(name, _)| name.clone());
            within(bound, names, |bound| {
                for (_, value) in bindings {
                    collect_free(value, bound, free);
                }
                collect_free(body, bound, free);
            });
        }
        Core::Construct { args, .. } | Core::Request { args, .. } => {
            for arg in args {
                collect_free(arg, bound, free);
            }
        }
        Core::Match {
            scrutinee,
            branches,
        } => {
            if !bound.contains(scrutinee) {
                free.insert(scrutinee.clone());
            }
            collect_free_branches(branches, bound, free);
        }
        Core::Handle { handler, body, .. } => {
            collect_free(handler, bound, free);
            collect_free(body, bound, free);
        }
        Core::Closure { captured, .. } => {
            for name in captured {
                if !bound.contains(name) {
                    free.insert(name.clone());
                }
            }
        }
    }
}

fn collect_free_branches(branches: &CoreBranches, bound: &mut Vec<String>, free: &mut BTreeSet<String>) {
    let default = match branches {
        CoreBranches::Data { cases, default } => {
            for (fields, body) in cases.values() {
                within(bound, fields.iter().cloned(), |bound| collect_free(body, bound, free));
            }
            default
        }
        CoreBranches::Literal { cases, default } => {
            for (_, body) in cases {
                collect_free(body, bound, free);
            }
            default
        }
        CoreBranches::Request {
            cases,
            pure,
            default,
        } => {
            for arm in cases.values() {
                let names = arm.args.iter().chain([&arm.continuation]).cloned();
                within(bound, names, |bound| collect_free(&arm.body, bound, free));
            }
            if let Some((name, body)) = pure {
                within(bound, [name.clone()], |bound| collect_free(body, bound, free));
            }
            default
        }
    };
    if let Some(default) = default {
        collect_free(default, bound, free);
    }
}

fn within<I, F>(bound: &mut Vec<String>, names: I, f: F)
where
    I: IntoIterator<Item = String>,
    F: FnOnce(&mut Vec<String>),
{
    let mark = bound.len();
    bound.extend(names);
    f(bound);
    bound.truncate(mark);
}
