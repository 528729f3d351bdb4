use std::{collections::BTreeMap, rc::Rc};

use crate::bytecode::{
    anf::{Anf, AnfBranches, AnfCallee, AnfComb, Atom},
    combinator::{Branches, Callee, Comb, CombRef, CombinatorSet, DataCase, Operand, RequestCase, Section},
};
use crate::runtime::{
    error::LoadError,
    numbering::{RefNumbering, Word},
};

/// Resolves names to frame slots and references to runtime ids.
///
/// Parameters take slots `0..arity`; every other binder gets the next free
/// slot, so no two binders of a combinator share one.
pub fn emit(
    terms: &RefNumbering,
    types: &RefNumbering,
    id: Word,
    combs: Vec<AnfComb>,
) -> Result<CombinatorSet, LoadError> {
    let mut emitter = Emitter {
        terms,
        types,
        id,
        scope: Vec::new(),
        next_slot: 0,
    };
    let combs = combs
        .into_iter()
        .map(|comb| emitter.comb(comb))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CombinatorSet::new(combs))
}

struct Emitter<'a> {
    terms: &'a RefNumbering,
    types: &'a RefNumbering,
    id: Word,
    scope: Vec<(String, usize)>,
    next_slot: usize,
}

impl Emitter<'_> {
    fn comb(&mut self, comb: AnfComb) -> Result<Comb, LoadError> {
        self.scope.clear();
        self.next_slot = 0;
        let arity = comb.params.len();
        for param in comb.params {
            self.bind(param);
        }
        let body = self.section(comb.body)?;
        Ok(Comb {
            arity,
            frame_size: self.next_slot,
            body: Rc::new(body),
        })
    }

    fn bind(&mut self, name: String) -> usize {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.scope.push((name, slot));
        slot
    }

    fn bind_all(&mut self, names: Vec<String>) -> Vec<usize> {
        names.into_iter().map(|name| self.bind(name)).collect()
    }

    fn lookup(&self, name: &str) -> Result<usize, LoadError> {
        self.scope
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, slot)| *slot)
            .ok_or_else(|| LoadError::Malformed(format!("unbound variable `{}`", name)))
    }

    fn operand(&self, atom: Atom) -> Result<Operand, LoadError> {
        match atom {
            Atom::Var(name) => Ok(Operand::Local(self.lookup(&name)?)),
            Atom::Lit(lit) => Ok(Operand::Lit(lit)),
        }
    }

    fn operands(&self, atoms: Vec<Atom>) -> Result<Vec<Operand>, LoadError> {
        atoms.into_iter().map(|atom| self.operand(atom)).collect()
    }

    /// Emits `anf` with `names` bound, dropping them from scope afterwards.
    fn scoped(&mut self, names: Vec<String>, anf: Anf) -> Result<(Vec<usize>, Rc<Section>), LoadError> {
        let mark = self.scope.len();
        let slots = self.bind_all(names);
        let body = self.section(anf)?;
        self.scope.truncate(mark);
        Ok((slots, Rc::new(body)))
    }

    fn section(&mut self, anf: Anf) -> Result<Section, LoadError> {
        Ok(match anf {
            Anf::Atom(atom) => Section::Return(self.operand(atom)?),
            Anf::Let { name, value, body } => {
                let value = Rc::new(self.section(*value)?);
                let (slots, body) = self.scoped(vec![name], *body)?;
                Section::Let {
                    slot: slots[0],
                    value,
                    body,
                }
            }
            Anf::Call { callee, args } => {
                let callee = match callee {
                    AnfCallee::Ref(reference) => Callee::Comb(self.terms.id(&reference)?),
                    AnfCallee::Var(name) => Callee::Local(self.lookup(&name)?),
                };
                Section::Call {
                    callee,
                    args: self.operands(args)?,
                }
            }
            Anf::Construct {
                type_ref,
                tag,
                args,
            } => Section::Construct {
                type_id: self.types.id(&type_ref)?,
                tag,
                args: self.operands(args)?,
            },
            Anf::Request {
                type_ref,
                tag,
                args,
            } => Section::Request {
                ability: self.types.id(&type_ref)?,
                tag,
                args: self.operands(args)?,
            },
            Anf::Closure { comb, captured } => Section::Closure {
                comb: CombRef {
                    id: self.id,
                    index: comb,
                },
                captured: captured
                    .into_iter()
                    .map(|name| Ok(Operand::Local(self.lookup(&name)?)))
                    .collect::<Result<_, LoadError>>()?,
            },
            Anf::Match {
                scrutinee,
                branches,
            } => Section::Match {
                scrutinee: self.lookup(&scrutinee)?,
                branches: self.branches(branches)?,
            },
            Anf::Handle {
                abilities,
                handler,
                body,
            } => Section::Handle {
                abilities: abilities
                    .iter()
                    .map(|ability| self.types.id(ability))
                    .collect::<Result<_, _>>()?,
                handler: self.operand(handler)?,
                body: Rc::new(self.section(*body)?),
            },
            Anf::MatchFail => Section::MatchFail,
        })
    }

    fn branches(&mut self, branches: AnfBranches) -> Result<Branches, LoadError> {
        Ok(match branches {
            AnfBranches::Data { cases, default } => {
                let mut out = BTreeMap::new();
                for (tag, (fields, body)) in cases {
                    let (fields, body) = self.scoped(fields, body)?;
                    out.insert(tag, DataCase { fields, body });
                }
                Branches::Data {
                    cases: out,
                    default: self.default(default)?,
                }
            }
            AnfBranches::Literal { cases, default } => {
                let mut out = Vec::with_capacity(cases.len());
                for (lit, body) in cases {
                    out.push((lit, Rc::new(self.section(body)?)));
                }
                Branches::Literal {
                    cases: out,
                    default: self.default(default)?,
                }
            }
            AnfBranches::Request {
                cases,
                pure,
                default,
            } => {
                let mut out = BTreeMap::new();
                for ((ability, tag), (args, continuation, body)) in cases {
                    let ability = self.types.id(&ability)?;
                    let mut names = args;
                    names.push(continuation);
                    let (mut slots, body) = self.scoped(names, body)?;
                    let continuation = slots.pop().unwrap_or_default();
                    out.insert(
                        (ability, tag),
                        RequestCase {
                            args: slots,
                            continuation,
                            body,
                        },
                    );
                }
                let pure = match pure {
                    Some((name, body)) => {
                        let (slots, body) = self.scoped(vec![name], *body)?;
                        Some((slots[0], body))
                    }
                    None => None,
                };
                Branches::Request {
                    cases: out,
                    pure,
                    default: self.default(default)?,
                }
            }
        })
    }

    fn default(&mut self, default: Option<Box<Anf>>) -> Result<Option<Rc<Section>>, LoadError> {
        default
            .map(|anf| self.section(*anf).map(Rc::new))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::Namespace;
    use crate::syntax::reference::Reference;

    #[test]
    fn unbound_variables_are_malformed() {
        let terms = RefNumbering::new(Namespace::Term);
        let types = RefNumbering::new(Namespace::Type);
        let comb = AnfComb {
            params: Vec::new(),
            body: Anf::Atom(Atom::Var("x".into())),
        };
        assert!(matches!(
            emit(&terms, &types, 0, vec![comb]),
            Err(LoadError::Malformed(_))
        ));
    }

    #[test]
    fn references_resolve_through_the_numbering() {
        let mut terms = RefNumbering::new(Namespace::Term);
        let types = RefNumbering::new(Namespace::Type);
        let double = Reference::builtin("double");
        terms.allocate(&Reference::builtin("other"));
        terms.allocate(&double);

        let comb = AnfComb {
            params: vec!["x".into()],
            body: Anf::Call {
                callee: AnfCallee::Ref(double.clone()),
                args: vec![Atom::Var("x".into())],
            },
        };
        let set = emit(&terms, &types, 5, vec![comb]).unwrap();
        let entry = set.entry().unwrap();
        assert_eq!(entry.arity, 1);
        assert_eq!(
            *entry.body,
            Section::Call {
                callee: Callee::Comb(1),
                args: vec![Operand::Local(0)],
            }
        );

        let missing = AnfComb {
            params: Vec::new(),
            body: Anf::Call {
                callee: AnfCallee::Ref(Reference::builtin("nowhere")),
                args: Vec::new(),
            },
        };
        assert!(matches!(
            emit(&terms, &types, 5, vec![missing]),
            Err(LoadError::UnknownReference { .. })
        ));
    }
}
