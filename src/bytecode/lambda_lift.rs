use std::collections::BTreeSet;

use crate::bytecode::core::{Core, CoreBranches, RequestArm};
use crate::runtime::error::LoadError;

/// A supercombinator: no free variables besides its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Lifted {
    pub params: Vec<String>,
    pub body: Core,
}

/// Hoists every nested lambda into its own combinator.
///
/// Combinator 0 is the term itself; a term that is a lambda takes the
/// lambda's parameters directly. A lifted lambda takes its free variables
/// first, then its own parameters, and its occurrence becomes a
/// [`Core::Closure`] over the free variables. Members of a local letrec are
/// lifted together and see each other as closures over the group's shared
/// free variables.
pub fn lambda_lift(core: Core) -> Result<Vec<Lifted>, LoadError> {
    let mut lifter = Lifter { combs: vec![None] };
    let entry = match core {
        Core::Lambda { params, body } => Lifted {
            params,
            body: lifter.lift(*body)?,
        },
        other => Lifted {
            params: Vec::new(),
            body: lifter.lift(other)?,
        },
    };
    lifter.combs[0] = Some(entry);
    lifter
        .combs
        .into_iter()
        .map(|comb| comb.ok_or_else(|| LoadError::Malformed("unfilled combinator slot".to_string())))
        .collect()
}

struct Lifter {
    combs: Vec<Option<Lifted>>,
}

impl Lifter {
    fn reserve(&mut self) -> usize {
        self.combs.push(None);
        self.combs.len() - 1
    }

    fn lift(&mut self, core: Core) -> Result<Core, LoadError> {
        Ok(match core {
            Core::Var(_) | Core::Ref(_) | Core::Lit(_) | Core::Closure { .. } | Core::MatchFail => core,
            Core::Lambda { params, body } => {
                let captured: Vec<String> = Core::Lambda {
                    params: params.clone(),
                    body: body.clone(),
                }
                .free_vars()
                .into_iter()
                .collect();
                let index = self.reserve();
                let body = self.lift(*body)?;
                let mut all = captured.clone();
                all.extend(params);
                self.combs[index] = Some(Lifted { params: all, body });
                Core::Closure {
                    comb: index,
                    captured,
                }
            }
            Core::LetRec { bindings, body } => self.lift_group(bindings, *body)?,
            Core::Apply { func, args } => Core::Apply {
                func: Box::new(self.lift(*func)?),
                args: self.lift_all(args)?,
            },
            Core::Let { name, value, body } => Core::Let {
                name,
                value: Box::new(self.lift(*value)?),
                body: Box::new(self.lift(*body)?),
            },
            Core::Construct {
                type_ref,
                tag,
                args,
            } => Core::Construct {
                type_ref,
                tag,
                args: self.lift_all(args)?,
            },
            Core::Request {
                type_ref,
                tag,
                args,
            } => Core::Request {
                type_ref,
                tag,
                args: self.lift_all(args)?,
            },
            Core::Match {
                scrutinee,
                branches,
            } => Core::Match {
                scrutinee,
                branches: self.lift_branches(branches)?,
            },
            Core::Handle {
                abilities,
                handler,
                body,
            } => Core::Handle {
                abilities,
                handler: Box::new(self.lift(*handler)?),
                body: Box::new(self.lift(*body)?),
            },
        })
    }

    fn lift_all(&mut self, cores: Vec<Core>) -> Result<Vec<Core>, LoadError> {
        cores.into_iter().map(|core| self.lift(core)).collect()
    }

    fn lift_group(&mut self, bindings: Vec<(String, Core)>, body: Core) -> Result<Core, LoadError> {
        let names: BTreeSet<String> = bindings.iter().map(|(name, _)| name.clone()).collect();

        let mut shared = BTreeSet::new();
        for (name, value) in &bindings {
            if !matches!(value, Core::Lambda { .. }) {
                return Err(LoadError::Malformed(format!(
                    "local recursive binding `{}` is not a function",
                    name
                )));
            }
            shared.extend(value.free_vars().into_iter().filter(|v| !names.contains(v)));
        }
        let shared: Vec<String> = shared.into_iter().collect();

        let slots: Vec<(String, usize)> = bindings
            .iter()
            .map(|(name, _)| (name.clone(), self.reserve()))
            .collect();
        let sibling_closures = |used: &BTreeSet<String>, body: Core| {
            slots
                .iter()
                .rev()
                .filter(|(name, _)| used.contains(name))
                .fold(body, |body, (name, index)| {
                    let closure = Core::Closure {
                        comb: *index,
                        captured: shared.clone(),
                    };
                    Core::let_in(name.clone(), closure, body)
                })
        };

        let mut lifted = Vec::with_capacity(bindings.len());
        for ((_, value), (_, index)) in bindings.into_iter().zip(&slots) {
            let Core::Lambda { params, body } = value else {
                continue;
            };
            let used: BTreeSet<String> = body
                .free_vars()
                .into_iter()
                .filter(|v| names.contains(v) && !params.contains(v))
                .collect();
            let body = self.lift(*body)?;
            let mut all = shared.clone();
            all.extend(params);
            lifted.push((*index, Lifted {
                params: all,
                body: sibling_closures(&used, body),
            }));
        }
        for (index, comb) in lifted {
            self.combs[index] = Some(comb);
        }

        let used: BTreeSet<String> = body
            .free_vars()
            .into_iter()
            .filter(|v| names.contains(v))
            .collect();
        let body = self.lift(body)?;
        Ok(sibling_closures(&used, body))
    }

    fn lift_branches(&mut self, branches: CoreBranches) -> Result<CoreBranches, LoadError> {
        Ok(match branches {
            CoreBranches::Data { cases, default } => CoreBranches::Data {
                cases: cases
                    .into_iter()
                    .map(|(tag, (fields, body))| Ok((tag, (fields, self.lift(body)?))))
                    .collect::<Result<_, LoadError>>()?,
                default: self.lift_default(default)?,
            },
            CoreBranches::Literal { cases, default } => CoreBranches::Literal {
                cases: cases
                    .into_iter()
                    .map(|(lit, body)| Ok((lit, self.lift(body)?)))
                    .collect::<Result<_, LoadError>>()?,
                default: self.lift_default(default)?,
            },
            CoreBranches::Request {
                cases,
                pure,
                default,
            } => CoreBranches::Request {
                cases: cases
                    .into_iter()
                    .map(|(op, arm)| {
                        Ok((
                            op,
                            RequestArm {
                                args: arm.args,
                                continuation: arm.continuation,
                                body: self.lift(arm.body)?,
                            },
                        ))
                    })
                    .collect::<Result<_, LoadError>>()?,
                pure: match pure {
                    Some((name, body)) => Some((name, Box::new(self.lift(*body)?))),
                    None => None,
                },
                default: self.lift_default(default)?,
            },
        })
    }

    fn lift_default(&mut self, default: Option<Box<Core>>) -> Result<Option<Box<Core>>, LoadError> {
        default
            .map(|core| self.lift(*core).map(Box::new))
            .transpose()
    }
}
