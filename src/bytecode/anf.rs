use std::collections::BTreeMap;

use crate::bytecode::{
    core::{Core, CoreBranches},
    fresh::NameSupply,
    lambda_lift::Lifted,
};
use crate::runtime::error::LoadError;
use crate::syntax::{reference::Reference, term::Literal};

#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Var(String),
    Lit(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnfCallee {
    Ref(Reference),
    Var(String),
}

/// Administrative normal form: every operand is an atom and every
/// intermediate result has a name.
#[derive(Debug, Clone, PartialEq)]
pub enum Anf {
    Atom(Atom),
    Let {
        name: String,
        value: Box<Anf>,
        body: Box<Anf>,
    },
    Call {
        callee: AnfCallee,
        args: Vec<Atom>,
    },
    Construct {
        type_ref: Reference,
        tag: u32,
        args: Vec<Atom>,
    },
    Request {
        type_ref: Reference,
        tag: u32,
        args: Vec<Atom>,
    },
    Closure {
        comb: usize,
        captured: Vec<String>,
    },
    Match {
        scrutinee: String,
        branches: AnfBranches,
    },
    Handle {
        abilities: Vec<Reference>,
        handler: Atom,
        body: Box<Anf>,
    },
    MatchFail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnfBranches {
    Data {
        cases: BTreeMap<u32, (Vec<String>, Anf)>,
        default: Option<Box<Anf>>,
    },
    Literal {
        cases: Vec<(Literal, Anf)>,
        default: Option<Box<Anf>>,
    },
    Request {
        cases: BTreeMap<(Reference, u32), (Vec<String>, String, Anf)>,
        pure: Option<(String, Box<Anf>)>,
        default: Option<Box<Anf>>,
    },
}

/// A lifted combinator in normal form.
#[derive(Debug, Clone, PartialEq)]
pub struct AnfComb {
    pub params: Vec<String>,
    pub body: Anf,
}

pub fn normalize(combs: Vec<Lifted>) -> Result<Vec<AnfComb>, LoadError> {
    let mut normalizer = Normalizer {
        names: NameSupply::new("a"),
    };
    combs
        .into_iter()
        .map(|Lifted { params, body }| {
            Ok(AnfComb {
                params,
                body: normalizer.expr(body)?,
            })
        })
        .collect()
}

struct Normalizer {
    names: NameSupply,
}

impl Normalizer {
    fn expr(&mut self, core: Core) -> Result<Anf, LoadError> {
        let mut bindings = Vec::new();
        let anf = match core {
            Core::Var(name) => Anf::Atom(Atom::Var(name)),
            Core::Lit(lit) => Anf::Atom(Atom::Lit(lit)),
            // A bare reference is a call with no arguments: it evaluates a
            // constant term, or yields a closure over a function term.
            Core::Ref(reference) => Anf::Call {
                callee: AnfCallee::Ref(reference),
                args: Vec::new(),
            },
            Core::Apply { func, args } => {
                let callee = match *func {
                    Core::Ref(reference) => AnfCallee::Ref(reference),
                    other => match self.atom(other, &mut bindings)? {
                        Atom::Var(name) => AnfCallee::Var(name),
                        Atom::Lit(lit) => {
                            return Err(LoadError::Malformed(format!(
                                "literal {} applied as a function",
                                lit
                            )));
                        }
                    },
                };
                let args = self.atoms(args, &mut bindings)?;
                Anf::Call { callee, args }
            }
            Core::Let { name, value, body } => Anf::Let {
                name,
                value: Box::new(self.expr(*value)?),
                body: Box::new(self.expr(*body)?),
            },
            Core::Construct {
                type_ref,
                tag,
                args,
            } => Anf::Construct {
                type_ref,
                tag,
                args: self.atoms(args, &mut bindings)?,
            },
            Core::Request {
                type_ref,
                tag,
                args,
            } => Anf::Request {
                type_ref,
                tag,
                args: self.atoms(args, &mut bindings)?,
            },
            Core::Closure { comb, captured } => Anf::Closure { comb, captured },
            Core::Match {
                scrutinee,
                branches,
            } => Anf::Match {
                scrutinee,
                branches: self.branches(branches)?,
            },
            Core::Handle {
                abilities,
                handler,
                body,
            } => Anf::Handle {
                abilities,
                handler: self.atom(*handler, &mut bindings)?,
                body: Box::new(self.expr(*body)?),
            },
            Core::MatchFail => Anf::MatchFail,
            Core::Lambda { .. } | Core::LetRec { .. } => {
                return Err(LoadError::Malformed(
                    "lambda left after lifting".to_string(),
                ));
            }
        };
        Ok(bindings
            .into_iter()
            .rev()
            .fold(anf, |body, (name, value)| Anf::Let {
                name,
                value: Box::new(value),
                body: Box::new(body),
            }))
    }

    /// Names `core` unless it is already an atom. The binding is queued in
    /// `bindings`, which the caller wraps around its own expression.
    fn atom(&mut self, core: Core, bindings: &mut Vec<(String, Anf)>) -> Result<Atom, LoadError> {
        match core {
            Core::Var(name) => Ok(Atom::Var(name)),
            Core::Lit(lit) => Ok(Atom::Lit(lit)),
            other => {
                let value = self.expr(other)?;
                let name = self.names.fresh();
                bindings.push((name.clone(), value));
                Ok(Atom::Var(name))
            }
        }
    }

    fn atoms(&mut self, cores: Vec<Core>, bindings: &mut Vec<(String, Anf)>) -> Result<Vec<Atom>, LoadError> {
        cores
            .into_iter()
            .map(|core| self.atom(core, bindings))
            .collect()
    }

    fn branches(&mut self, branches: CoreBranches) -> Result<AnfBranches, LoadError> {
        Ok(match branches {
            CoreBranches::Data { cases, default } => AnfBranches::Data {
                cases: cases
                    .into_iter()
                    .map(|(tag, (fields, body))| Ok((tag, (fields, self.expr(body)?))))
                    .collect::<Result<_, LoadError>>()?,
                default: self.default(default)?,
            },
            CoreBranches::Literal { cases, default } => AnfBranches::Literal {
                cases: cases
                    .into_iter()
                    .map(|(lit, body)| Ok((lit, self.expr(body)?)))
                    .collect::<Result<_, LoadError>>()?,
                default: self.default(default)?,
            },
            CoreBranches::Request {
                cases,
                pure,
                default,
            } => AnfBranches::Request {
                cases: cases
                    .into_iter()
                    .map(|(op, arm)| Ok((op, (arm.args, arm.continuation, self.expr(arm.body)?))))
                    .collect::<Result<_, LoadError>>()?,
                pure: match pure {
                    Some((name, body)) => Some((name, Box::new(self.expr(*body)?))),
                    None => None,
                },
                default: self.default(default)?,
            },
        })
    }

    fn default(&mut self, default: Option<Box<Core>>) -> Result<Option<Box<Anf>>, LoadError> {
        default
            .map(|core| self.expr(*core).map(Box::new))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_calls_are_named_left_to_right() {
        // Int.+ (Int.* 2 3) 4
        let mul = Core::Apply {
            func: Box::new(Core::Ref(Reference::builtin("Int.*"))),
            args: vec![Core::Lit(Literal::Int(2)), Core::Lit(Literal::Int(3))],
        };
        let add = Core::Apply {
            func: Box::new(Core::Ref(Reference::builtin("Int.+"))),
            args: vec![mul, Core::Lit(Literal::Int(4))],
        };
        let combs = normalize(vec![Lifted {
            params: Vec::new(),
            body: add,
        }])
        .unwrap();

        assert_eq!(
            combs[0].body,
            Anf::Let {
                name: "%a0".into(),
                value: Box::new(Anf::Call {
                    callee: AnfCallee::Ref(Reference::builtin("Int.*")),
                    args: vec![Atom::Lit(Literal::Int(2)), Atom::Lit(Literal::Int(3))],
                }),
                body: Box::new(Anf::Call {
                    callee: AnfCallee::Ref(Reference::builtin("Int.+")),
                    args: vec![Atom::Var("%a0".into()), Atom::Lit(Literal::Int(4))],
                }),
            }
        );
    }

    #[test]
    fn applying_a_literal_is_malformed() {
        let core = Core::Apply {
            func: Box::new(Core::Lit(Literal::Int(1))),
            args: Vec::new(),
        };
        let result = normalize(vec![Lifted {
            params: Vec::new(),
            body: core,
        }]);
        assert!(matches!(result, Err(LoadError::Malformed(_))));
    }
}
