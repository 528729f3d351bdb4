use serde::{Deserialize, Serialize};

use crate::syntax::{reference::Reference, types::Type};

/// Literal values that appear directly in source terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Boolean(bool),
    Text(String),
}

/// Surface term as handed over by the type checker.
///
/// Terms are closed over references: everything not bound locally is either a
/// `Ref` to a term definition or a `Constructor`/`Request` of a type
/// declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    Var(String),
    Ref(Reference),
    Literal(Literal),
    Lambda {
        params: Vec<String>,
        body: Box<Term>,
    },
    Apply {
        func: Box<Term>,
        args: Vec<Term>,
    },
    Let {
        name: String,
        value: Box<Term>,
        body: Box<Term>,
    },
    LetRec {
        bindings: Vec<(String, Term)>,
        body: Box<Term>,
    },
    /// Data constructor `tag` of the data declaration `type_ref`.
    Constructor {
        type_ref: Reference,
        tag: u32,
    },
    /// Operation `tag` of the ability declaration `type_ref`.
    Request {
        type_ref: Reference,
        tag: u32,
    },
    If {
        condition: Box<Term>,
        then_branch: Box<Term>,
        else_branch: Box<Term>,
    },
    Match {
        scrutinee: Box<Term>,
        cases: Vec<MatchCase>,
    },
    /// Runs `body` with requests of `abilities` delivered to `handler`.
    Handle {
        abilities: Vec<Reference>,
        handler: Box<Term>,
        body: Box<Term>,
    },
    Ann {
        term: Box<Term>,
        ty: Type,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub guard: Option<Term>,
    pub body: Term,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    Wildcard,
    Var(String),
    As {
        name: String,
        pattern: Box<Pattern>,
    },
    Literal(Literal),
    Constructor {
        type_ref: Reference,
        tag: u32,
        args: Vec<Pattern>,
    },
    /// `{ p }`: the handled computation finished with a value matching `p`.
    EffectPure(Box<Pattern>),
    /// `{ op args -> k }`: the handled computation requested an operation.
    EffectBind {
        type_ref: Reference,
        tag: u32,
        args: Vec<Pattern>,
        continuation: String,
    },
}

impl Pattern {
    /// Whether the pattern matches every value without inspecting it.
    pub fn is_irrefutable(&self) -> bool {
        match self {
            Pattern::Wildcard | Pattern::Var(_) => true,
            Pattern::As { pattern, .. } => pattern.is_irrefutable(),
            _ => false,
        }
    }
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    pub fn int(value: i64) -> Self {
        Term::Literal(Literal::Int(value))
    }

    pub fn boolean(value: bool) -> Self {
        Term::Literal(Literal::Boolean(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Term::Literal(Literal::Text(value.into()))
    }

    pub fn builtin(name: &str) -> Self {
        Term::Ref(Reference::builtin(name))
    }

    pub fn lambda<S: Into<String>>(params: impl IntoIterator<Item = S>, body: Term) -> Self {
        Term::Lambda {
            params: params.into_iter().map(Into::into).collect(),
            body: Box::new(body),
        }
    }

    pub fn apply(func: Term, args: impl IntoIterator<Item = Term>) -> Self {
        Term::Apply {
            func: Box::new(func),
            args: args.into_iter().collect(),
        }
    }

    pub fn let_in(name: impl Into<String>, value: Term, body: Term) -> Self {
        Term::Let {
            name: name.into(),
            value: Box::new(value),
            body: Box::new(body),
        }
    }

    pub fn let_rec<S: Into<String>>(bindings: impl IntoIterator<Item = (S, Term)>, body: Term) -> Self {
        Term::LetRec {
            bindings: bindings
                .into_iter()
                .map(|(name, term)| (name.into(), term))
                .collect(),
            body: Box::new(body),
        }
    }

    pub fn if_then_else(condition: Term, then_branch: Term, else_branch: Term) -> Self {
        Term::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    pub fn match_on(scrutinee: Term, cases: Vec<MatchCase>) -> Self {
        Term::Match {
            scrutinee: Box::new(scrutinee),
            cases,
        }
    }

    pub fn handle(abilities: Vec<Reference>, handler: Term, body: Term) -> Self {
        Term::Handle {
            abilities,
            handler: Box::new(handler),
            body: Box::new(body),
        }
    }

    /// Binary call of a builtin, e.g. `Term::call2("Int.+", a, b)`.
    pub fn call2(builtin: &str, left: Term, right: Term) -> Self {
        Term::apply(Term::builtin(builtin), [left, right])
    }
}

impl MatchCase {
    pub fn new(pattern: Pattern, body: Term) -> Self {
        Self {
            pattern,
            guard: None,
            body,
        }
    }

    pub fn guarded(pattern: Pattern, guard: Term, body: Term) -> Self {
        Self {
            pattern,
            guard: Some(guard),
            body,
        }
    }
}
