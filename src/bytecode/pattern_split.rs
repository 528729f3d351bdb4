//! Compiles nested pattern matches into single-level decision trees.
//!
//! A match is a matrix of pattern rows over a vector of occurrences
//! (variables holding the values still to inspect). The first row that needs
//! inspection picks the column to switch on; every case of the switch
//! specializes the matrix to the rows compatible with it, replacing the
//! column by the constructor's sub-patterns. Variable and `as` patterns turn
//! into bindings of the occurrence, emitted when a row reaches its body.
//! Guards that fail fall through to the remaining rows.

use std::collections::{BTreeMap, HashMap};

use crate::bytecode::{
    core::{Core, CoreBranches, RequestArm},
    fresh::NameSupply,
};
use crate::runtime::{context::ConstructorArity, error::LoadError};
use crate::syntax::{
    reference::Reference,
    term::{Literal, MatchCase, Pattern, Term},
};

pub fn split_patterns(
    arities: &HashMap<Reference, ConstructorArity>,
    term: &Term,
) -> Result<Core, LoadError> {
    let mut splitter = Splitter {
        arities,
        names: NameSupply::new("m"),
    };
    splitter.term(term)
}

struct Splitter<'a> {
    arities: &'a HashMap<Reference, ConstructorArity>,
    names: NameSupply,
}

enum Switch {
    Data(Reference),
    Literal,
    Request,
}

#[derive(Clone)]
struct Row<'t> {
    patterns: Vec<Pattern>,
    bindings: Vec<(String, String)>,
    guard: Option<&'t Term>,
    body: &'t Term,
}

impl Row<'_> {
    /// Moves variable and `as` patterns into bindings of their occurrence.
    fn bind_variables(mut self, occurrences: &[String]) -> Self {
        for (pattern, occurrence) in self.patterns.iter_mut().zip(occurrences) {
            loop {
                match std::mem::replace(pattern, Pattern::Wildcard) {
                    Pattern::Var(name) => {
                        self.bindings.push((name, occurrence.clone()));
                    }
                    Pattern::As { name, pattern: inner } => {
                        self.bindings.push((name, occurrence.clone()));
                        *pattern = *inner;
                        continue;
                    }
                    other => *pattern = other,
                }
                break;
            }
        }
        self
    }

    /// The row with column `col` replaced by `replacement`, placed in front.
    fn specialize(&self, col: usize, replacement: Vec<Pattern>) -> Self {
        let mut patterns = replacement;
        patterns.extend(
            self.patterns
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != col)
                .map(|(_, p)| p.clone()),
        );
        Row {
            patterns,
            bindings: self.bindings.clone(),
            guard: self.guard,
            body: self.body,
        }
    }
}

impl<'a> Splitter<'a> {
    fn term(&mut self, term: &Term) -> Result<Core, LoadError> {
        Ok(match term {
            Term::Var(name) => Core::Var(name.clone()),
            Term::Ref(reference) => Core::Ref(reference.clone()),
            Term::Literal(lit) => Core::Lit(lit.clone()),
            Term::Lambda { params, body } => Core::Lambda {
                params: params.clone(),
                body: Box::new(self.term(body)?),
            },
            Term::Apply { func, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.term(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                match &**func {
                    Term::Constructor { type_ref, tag } => Core::Construct {
                        type_ref: type_ref.clone(),
                        tag: *tag,
                        args,
                    },
                    Term::Request { type_ref, tag } => Core::Request {
                        type_ref: type_ref.clone(),
                        tag: *tag,
                        args,
                    },
                    other => Core::Apply {
                        func: Box::new(self.term(other)?),
                        args,
                    },
                }
            }
            Term::Let { name, value, body } => {
                Core::let_in(name.clone(), self.term(value)?, self.term(body)?)
            }
            Term::LetRec { bindings, body } => Core::LetRec {
                bindings: bindings
                    .iter()
                    .map(|(name, value)| Ok((name.clone(), self.term(value)?)))
                    .collect::<Result<Vec<_>, LoadError>>()?,
                body: Box::new(self.term(body)?),
            },
            Term::Constructor { type_ref, tag } | Term::Request { type_ref, tag } => {
                return Err(LoadError::Malformed(format!(
                    "unsaturated occurrence of {}#{}",
                    type_ref, tag
                )));
            }
            Term::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let flag = self.names.fresh();
                let test = Core::Match {
                    scrutinee: flag.clone(),
                    branches: CoreBranches::Literal {
                        cases: vec![(Literal::Boolean(true), self.term(then_branch)?)],
                        default: Some(Box::new(self.term(else_branch)?)),
                    },
                };
                Core::let_in(flag, self.term(condition)?, test)
            }
            Term::Match { scrutinee, cases } => {
                let occurrence = self.names.fresh();
                let rows = cases
                    .iter()
                    .map(|MatchCase { pattern, guard, body }| Row {
                        patterns: vec![pattern.clone()],
                        bindings: Vec::new(),
                        guard: guard.as_ref(),
                        body,
                    })
                    .collect();
                let tree = self.rows(std::slice::from_ref(&occurrence), rows)?;
                Core::let_in(occurrence, self.term(scrutinee)?, tree)
            }
            Term::Handle {
                abilities,
                handler,
                body,
            } => Core::Handle {
                abilities: abilities.clone(),
                handler: Box::new(self.term(handler)?),
                body: Box::new(self.term(body)?),
            },
            Term::Ann { term, .. } => self.term(term)?,
        })
    }

    fn rows(&mut self, occurrences: &[String], rows: Vec<Row<'_>>) -> Result<Core, LoadError> {
        let mut rows: Vec<Row<'_>> = rows
            .into_iter()
            .map(|row| row.bind_variables(occurrences))
            .collect();
        if rows.is_empty() {
            return Ok(Core::MatchFail);
        }

        let column = rows[0]
            .patterns
            .iter()
            .position(|p| !matches!(p, Pattern::Wildcard));
        let Some(col) = column else {
            let first = rows.remove(0);
            return self.leaf(occurrences, first, rows);
        };

        let switch = match &rows[0].patterns[col] {
            Pattern::Constructor { type_ref, .. } => Switch::Data(type_ref.clone()),
            Pattern::Literal(_) => Switch::Literal,
            Pattern::EffectPure(_) | Pattern::EffectBind { .. } => Switch::Request,
            Pattern::Wildcard | Pattern::Var(_) | Pattern::As { .. } => {
                return Err(LoadError::Malformed(
                    "variable pattern survived binding".to_string(),
                ));
            }
        };
        match switch {
            Switch::Data(type_ref) => self.split_data(occurrences, rows, col, &type_ref),
            Switch::Literal => self.split_literal(occurrences, rows, col),
            Switch::Request => self.split_request(occurrences, rows, col),
        }
    }

    /// A row whose remaining patterns are all wildcards: bind its variables
    /// and run the body, or test its guard and fall through on failure.
    fn leaf(&mut self, occurrences: &[String], row: Row<'_>, rest: Vec<Row<'_>>) -> Result<Core, LoadError> {
        let body = bind_all(&row.bindings, self.term(row.body)?);
        let Some(guard) = row.guard else {
            return Ok(body);
        };
        let guard = bind_all(&row.bindings, self.term(guard)?);
        let fallthrough = self.rows(occurrences, rest)?;
        let flag = self.names.fresh();
        Ok(Core::let_in(
            flag.clone(),
            guard,
            Core::Match {
                scrutinee: flag,
                branches: CoreBranches::Literal {
                    cases: vec![(Literal::Boolean(true), body)],
                    default: Some(Box::new(fallthrough)),
                },
            },
        ))
    }

    fn split_data(
        &mut self,
        occurrences: &[String],
        rows: Vec<Row<'_>>,
        col: usize,
        type_ref: &Reference,
    ) -> Result<Core, LoadError> {
        let arities = self.arities;
        let arity = arities
            .get(type_ref)
            .ok_or_else(|| LoadError::MissingArity(type_ref.clone()))?;
        let constructor_count = match arity {
            ConstructorArity::Record { .. } => 1,
            ConstructorArity::Sum(counts) | ConstructorArity::Ability(counts) => counts.len(),
        };

        let mut tags: Vec<u32> = Vec::new();
        for row in &rows {
            if let Pattern::Constructor { tag, .. } = &row.patterns[col] {
                if !tags.contains(tag) {
                    tags.push(*tag);
                }
            }
        }

        let rest = without(occurrences, col);
        let mut cases = BTreeMap::new();
        for tag in tags {
            let fields = arity.arity(tag).ok_or_else(|| LoadError::UnknownConstructor {
                type_ref: type_ref.clone(),
                tag,
            })?;
            let mut specialized = Vec::new();
            for row in &rows {
                match &row.patterns[col] {
                    Pattern::Constructor { tag: t, args, .. } if *t == tag => {
                        if args.len() != fields {
                            return Err(LoadError::Malformed(format!(
                                "pattern for {}#{} binds {} fields, constructor has {}",
                                type_ref,
                                tag,
                                args.len(),
                                fields
                            )));
                        }
                        specialized.push(row.specialize(col, args.clone()));
                    }
                    Pattern::Wildcard => {
                        specialized.push(row.specialize(col, vec![Pattern::Wildcard; fields]));
                    }
                    _ => {}
                }
            }
            let names = self.names.fresh_n(fields);
            let mut sub = names.clone();
            sub.extend(rest.iter().cloned());
            let body = self.rows(&sub, specialized)?;
            cases.insert(tag, (names, body));
        }

        let default = if cases.len() < constructor_count {
            Some(Box::new(self.default_rows(&rest, &rows, col)?))
        } else {
            None
        };
        Ok(Core::Match {
            scrutinee: occurrences[col].clone(),
            branches: CoreBranches::Data { cases, default },
        })
    }

    fn split_literal(
        &mut self,
        occurrences: &[String],
        rows: Vec<Row<'_>>,
        col: usize,
    ) -> Result<Core, LoadError> {
        let mut literals: Vec<Literal> = Vec::new();
        for row in &rows {
            if let Pattern::Literal(lit) = &row.patterns[col] {
                if !literals.contains(lit) {
                    literals.push(lit.clone());
                }
            }
        }

        let rest = without(occurrences, col);
        let mut cases = Vec::with_capacity(literals.len());
        for lit in literals {
            let specialized: Vec<Row<'_>> = rows
                .iter()
                .filter(|row| match &row.patterns[col] {
                    Pattern::Literal(other) => *other == lit,
                    Pattern::Wildcard => true,
                    _ => false,
                })
                .map(|row| row.specialize(col, Vec::new()))
                .collect();
            let body = self.rows(&rest, specialized)?;
            cases.push((lit, body));
        }

        let default = self.default_rows(&rest, &rows, col)?;
        Ok(Core::Match {
            scrutinee: occurrences[col].clone(),
            branches: CoreBranches::Literal {
                cases,
                default: Some(Box::new(default)),
            },
        })
    }

    fn split_request(
        &mut self,
        occurrences: &[String],
        rows: Vec<Row<'_>>,
        col: usize,
    ) -> Result<Core, LoadError> {
        let mut operations: Vec<(Reference, u32)> = Vec::new();
        let mut has_pure = false;
        for row in &rows {
            match &row.patterns[col] {
                Pattern::EffectBind { type_ref, tag, .. } => {
                    let op = (type_ref.clone(), *tag);
                    if !operations.contains(&op) {
                        operations.push(op);
                    }
                }
                Pattern::EffectPure(_) => has_pure = true,
                _ => {}
            }
        }

        let rest = without(occurrences, col);
        let mut cases = BTreeMap::new();
        for (type_ref, tag) in operations {
            let expected = self
                .arities
                .get(&type_ref)
                .ok_or_else(|| LoadError::MissingArity(type_ref.clone()))?
                .arity(tag)
                .ok_or_else(|| LoadError::UnknownConstructor {
                    type_ref: type_ref.clone(),
                    tag,
                })?;
            let mut specialized = Vec::new();
            for row in &rows {
                match &row.patterns[col] {
                    Pattern::EffectBind {
                        type_ref: r,
                        tag: t,
                        args,
                        continuation,
                    } if *r == type_ref && *t == tag => {
                        if args.len() != expected {
                            return Err(LoadError::Malformed(format!(
                                "pattern for operation {}#{} binds {} arguments, operation takes {}",
                                type_ref,
                                tag,
                                args.len(),
                                expected
                            )));
                        }
                        let mut replacement = args.clone();
                        replacement.push(Pattern::Var(continuation.clone()));
                        specialized.push(row.specialize(col, replacement));
                    }
                    Pattern::Wildcard => {
                        specialized.push(row.specialize(col, vec![Pattern::Wildcard; expected + 1]));
                    }
                    _ => {}
                }
            }
            let args = self.names.fresh_n(expected);
            let continuation = self.names.fresh();
            let mut sub = args.clone();
            sub.push(continuation.clone());
            sub.extend(rest.iter().cloned());
            let body = self.rows(&sub, specialized)?;
            cases.insert(
                (type_ref, tag),
                RequestArm {
                    args,
                    continuation,
                    body,
                },
            );
        }

        let pure = if has_pure {
            let specialized: Vec<Row<'_>> = rows
                .iter()
                .filter_map(|row| match &row.patterns[col] {
                    Pattern::EffectPure(inner) => Some(row.specialize(col, vec![(**inner).clone()])),
                    Pattern::Wildcard => Some(row.specialize(col, vec![Pattern::Wildcard])),
                    _ => None,
                })
                .collect();
            let name = self.names.fresh();
            let mut sub = vec![name.clone()];
            sub.extend(rest.iter().cloned());
            let body = self.rows(&sub, specialized)?;
            Some((name, Box::new(body)))
        } else {
            None
        };

        let has_default = rows
            .iter()
            .any(|row| matches!(row.patterns[col], Pattern::Wildcard));
        let default = if has_default {
            Some(Box::new(self.default_rows(&rest, &rows, col)?))
        } else {
            None
        };
        Ok(Core::Match {
            scrutinee: occurrences[col].clone(),
            branches: CoreBranches::Request {
                cases,
                pure,
                default,
            },
        })
    }

    /// Rows that match whatever value sits in column `col`.
    fn default_rows(&mut self, rest: &[String], rows: &[Row<'_>], col: usize) -> Result<Core, LoadError> {
        let remaining: Vec<Row<'_>> = rows
            .iter()
            .filter(|row| matches!(row.patterns[col], Pattern::Wildcard))
            .map(|row| row.specialize(col, Vec::new()))
            .collect();
        self.rows(rest, remaining)
    }
}

fn without(occurrences: &[String], col: usize) -> Vec<String> {
    occurrences
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != col)
        .map(|(_, o)| o.clone())
        .collect()
}

fn bind_all(bindings: &[(String, String)], body: Core) -> Core {
    bindings
        .iter()
        .rev()
        .fold(body, |body, (name, occurrence)| {
            Core::let_in(name.clone(), Core::Var(occurrence.clone()), body)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nat() -> (Reference, HashMap<Reference, ConstructorArity>) {
        let nat = Reference::builtin("Nat");
        let mut arities = HashMap::new();
        arities.insert(nat.clone(), ConstructorArity::Sum(vec![0, 1]));
        (nat, arities)
    }

    fn succ(nat: &Reference, inner: Pattern) -> Pattern {
        Pattern::Constructor {
            type_ref: nat.clone(),
            tag: 1,
            args: vec![inner],
        }
    }

    #[test]
    fn if_lowers_to_a_boolean_match() {
        let term = Term::if_then_else(Term::boolean(true), Term::int(1), Term::int(2));
        let core = split_patterns(&HashMap::new(), &term).unwrap();
        assert_eq!(
            core,
            Core::let_in(
                "%m0",
                Core::Lit(Literal::Boolean(true)),
                Core::Match {
                    scrutinee: "%m0".into(),
                    branches: CoreBranches::Literal {
                        cases: vec![(Literal::Boolean(true), Core::Lit(Literal::Int(1)))],
                        default: Some(Box::new(Core::Lit(Literal::Int(2)))),
                    },
                },
            )
        );
    }

    #[test]
    fn nested_constructor_patterns_become_nested_switches() {
        let (nat, arities) = nat();
        let term = Term::match_on(
            Term::var("n"),
            vec![
                MatchCase::new(succ(&nat, succ(&nat, Pattern::Var("m".into()))), Term::var("m")),
                MatchCase::new(Pattern::Wildcard, Term::int(0)),
            ],
        );
        let core = split_patterns(&arities, &term).unwrap();

        let Core::Let { body, .. } = core else {
            panic!("scrutinee is bound first");
        };
        let Core::Match {
            branches: CoreBranches::Data { cases, default },
            ..
        } = *body
        else {
            panic!("outer switch is a data match");
        };
        assert_eq!(cases.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(default, Some(Box::new(Core::Lit(Literal::Int(0)))));

        let (fields, inner) = &cases[&1];
        assert_eq!(fields.len(), 1);
        assert!(matches!(
            inner,
            Core::Match { scrutinee, branches: CoreBranches::Data { .. } } if scrutinee == &fields[0]
        ));
    }

    #[test]
    fn failed_guard_falls_through() {
        let term = Term::match_on(
            Term::int(3),
            vec![
                MatchCase::guarded(Pattern::Var("x".into()), Term::boolean(false), Term::int(1)),
                MatchCase::new(Pattern::Wildcard, Term::int(2)),
            ],
        );
        let core = split_patterns(&HashMap::new(), &term).unwrap();
        let Core::Let { body, .. } = core else {
            panic!("scrutinee is bound first");
        };
        let Core::Let { body: test, .. } = *body else {
            panic!("guard flag is bound");
        };
        assert!(matches!(
            *test,
            Core::Match {
                branches: CoreBranches::Literal { ref default, .. },
                ..
            } if default.as_deref() == Some(&Core::Lit(Literal::Int(2)))
        ));
    }

    #[test]
    fn effect_patterns_build_request_switches() {
        let store = Reference::builtin("Store");
        let mut arities = HashMap::new();
        arities.insert(store.clone(), ConstructorArity::Ability(vec![0, 1]));
        let term = Term::match_on(
            Term::var("r"),
            vec![
                MatchCase::new(
                    Pattern::EffectBind {
                        type_ref: store.clone(),
                        tag: 0,
                        args: vec![],
                        continuation: "k".into(),
                    },
                    Term::apply(Term::var("k"), [Term::int(1)]),
                ),
                MatchCase::new(Pattern::EffectPure(Box::new(Pattern::Var("v".into()))), Term::var("v")),
            ],
        );
        let core = split_patterns(&arities, &term).unwrap();
        let Core::Let { body, .. } = core else {
            panic!("scrutinee is bound first");
        };
        let Core::Match {
            branches: CoreBranches::Request { cases, pure, default },
            ..
        } = *body
        else {
            panic!("handler match is a request switch");
        };
        assert!(cases.contains_key(&(store, 0)));
        assert!(pure.is_some());
        assert!(default.is_none());
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        let (nat, arities) = nat();
        let term = Term::match_on(
            Term::var("n"),
            vec![MatchCase::new(
                Pattern::Constructor {
                    type_ref: nat,
                    tag: 1,
                    args: vec![],
                },
                Term::int(0),
            )],
        );
        assert!(matches!(
            split_patterns(&arities, &term),
            Err(LoadError::Malformed(_))
        ));
    }
}
