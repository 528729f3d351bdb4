use std::fmt;

use crate::syntax::{
    print_env::PrintEnv,
    term::{Literal, MatchCase, Pattern, Term},
    types::Type,
};

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Boolean(v) => write!(f, "{}", v),
            Literal::Text(v) => write!(f, "{:?}", v),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_with(&PrintEnv::default()))
    }
}

impl Term {
    /// Renders the term on a single line, naming references through `env`.
    pub fn display_with(&self, env: &PrintEnv) -> String {
        let mut out = String::new();
        write_term(&mut out, self, env);
        out
    }

    fn is_atomic(&self) -> bool {
        matches!(
            self,
            Term::Var(_)
                | Term::Ref(_)
                | Term::Literal(_)
                | Term::Constructor { .. }
                | Term::Request { .. }
        )
    }
}

fn write_term(out: &mut String, term: &Term, env: &PrintEnv) {
    match term {
        Term::Var(name) => out.push_str(name),
        Term::Ref(reference) => out.push_str(&env.term_name(reference)),
        Term::Literal(lit) => out.push_str(&lit.to_string()),
        Term::Constructor { type_ref, tag } | Term::Request { type_ref, tag } => {
            out.push_str(&env.constructor_name(type_ref, *tag))
        }
        Term::Lambda { params, body } => {
            out.push_str(&params.join(" "));
            out.push_str(" -> ");
            write_term(out, body, env);
        }
        Term::Apply { func, args } => {
            if func.is_atomic() || matches!(**func, Term::Apply { .. }) {
                write_term(out, func, env);
            } else {
                write_parens(out, func, env);
            }
            for arg in args {
                out.push(' ');
                if arg.is_atomic() {
                    write_term(out, arg, env);
                } else {
                    write_parens(out, arg, env);
                }
            }
        }
        Term::Let { name, value, body } => {
            out.push_str("let ");
            out.push_str(name);
            out.push_str(" = ");
            write_term(out, value, env);
            out.push_str("; ");
            write_term(out, body, env);
        }
        Term::LetRec { bindings, body } => {
            out.push_str("letrec ");
            for (name, value) in bindings {
                out.push_str(name);
                out.push_str(" = ");
                write_term(out, value, env);
                out.push_str("; ");
            }
            write_term(out, body, env);
        }
        Term::If {
            condition,
            then_branch,
            else_branch,
        } => {
            out.push_str("if ");
            write_term(out, condition, env);
            out.push_str(" then ");
            write_term(out, then_branch, env);
            out.push_str(" else ");
            write_term(out, else_branch, env);
        }
        Term::Match { scrutinee, cases } => {
            out.push_str("match ");
            write_term(out, scrutinee, env);
            out.push_str(" with");
            for (i, case) in cases.iter().enumerate() {
                out.push_str(if i == 0 { " " } else { " | " });
                write_case(out, case, env);
            }
        }
        Term::Handle { handler, body, .. } => {
            out.push_str("handle ");
            write_term(out, body, env);
            out.push_str(" with ");
            write_term(out, handler, env);
        }
        Term::Ann { term, ty } => {
            write_parens(out, term, env);
            out.push_str(" : ");
            write_type(out, ty, env);
        }
    }
}

fn write_parens(out: &mut String, term: &Term, env: &PrintEnv) {
    out.push('(');
    write_term(out, term, env);
    out.push(')');
}

fn write_case(out: &mut String, case: &MatchCase, env: &PrintEnv) {
    write_pattern(out, &case.pattern, env);
    if let Some(guard) = &case.guard {
        out.push_str(" | ");
        write_term(out, guard, env);
    }
    out.push_str(" -> ");
    write_term(out, &case.body, env);
}

fn write_pattern(out: &mut String, pattern: &Pattern, env: &PrintEnv) {
    match pattern {
        Pattern::Wildcard => out.push('_'),
        Pattern::Var(name) => out.push_str(name),
        Pattern::As { name, pattern } => {
            out.push_str(name);
            out.push('@');
            write_pattern(out, pattern, env);
        }
        Pattern::Literal(lit) => out.push_str(&lit.to_string()),
        Pattern::Constructor {
            type_ref,
            tag,
            args,
        } => {
            if !args.is_empty() {
                out.push('(');
            }
            out.push_str(&env.constructor_name(type_ref, *tag));
            for arg in args {
                out.push(' ');
                write_pattern(out, arg, env);
            }
            if !args.is_empty() {
                out.push(')');
            }
        }
        Pattern::EffectPure(inner) => {
            out.push_str("{ ");
            write_pattern(out, inner, env);
            out.push_str(" }");
        }
        Pattern::EffectBind {
            type_ref,
            tag,
            args,
            continuation,
        } => {
            out.push_str("{ ");
            out.push_str(&env.constructor_name(type_ref, *tag));
            for arg in args {
                out.push(' ');
                write_pattern(out, arg, env);
            }
            out.push_str(" -> ");
            out.push_str(continuation);
            out.push_str(" }");
        }
    }
}

fn write_type(out: &mut String, ty: &Type, env: &PrintEnv) {
    match ty {
        Type::Ref(reference) => out.push_str(&env.type_name(reference)),
        Type::Var(name) => out.push_str(name),
        Type::Apply { func, args } => {
            write_type(out, func, env);
            for arg in args {
                out.push(' ');
                write_type(out, arg, env);
            }
        }
        Type::Arrow {
            input,
            abilities,
            output,
        } => {
            write_type(out, input, env);
            out.push_str(" ->");
            if !abilities.is_empty() {
                out.push('{');
                for (i, ability) in abilities.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_type(out, ability, env);
                }
                out.push('}');
            }
            out.push(' ');
            write_type(out, output, env);
        }
    }
}
