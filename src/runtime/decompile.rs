use crate::runtime::{context::EvalContext, value::Value};
use crate::syntax::term::{Literal, Term};

enum Task<'a> {
    Visit(&'a Value),
    /// Applies `head` to the last `args` terms built.
    Apply { head: Term, args: usize },
}

/// Rebuilds a surface term from a machine value.
///
/// Returns `None` for values with no surface form: continuations, closures
/// over lifted lambdas, and anything mentioning an id the context does not
/// know. Runs on explicit work stacks, so arbitrarily deep data is fine.
pub fn decompile(ctx: &EvalContext, value: &Value) -> Option<Term> {
    let mut tasks = vec![Task::Visit(value)];
    let mut built: Vec<Term> = Vec::new();

    while let Some(task) = tasks.pop() {
        let (head, args) = match task {
            Task::Apply { head, args } => {
                let args = built.split_off(built.len().checked_sub(args)?);
                built.push(Term::apply(head, args));
                continue;
            }
            Task::Visit(value) => match value {
                Value::Int(v) => (Term::Literal(Literal::Int(*v)), &[][..]),
                Value::Boolean(v) => (Term::Literal(Literal::Boolean(*v)), &[][..]),
                Value::Text(v) => (Term::Literal(Literal::Text(v.to_string())), &[][..]),
                Value::Data {
                    type_id,
                    tag,
                    fields,
                } => {
                    let type_ref = ctx.types().reference(*type_id).ok()?.clone();
                    let head = Term::Constructor {
                        type_ref,
                        tag: *tag,
                    };
                    (head, &fields[..])
                }
                Value::Closure { comb, args } => {
                    if comb.index != 0 {
                        return None;
                    }
                    let head = if ctx.is_intermediate(comb.id) {
                        (**ctx.term_ast(comb.id)?).clone()
                    } else {
                        Term::Ref(ctx.backrefs().get(&comb.id)?.clone())
                    };
                    (head, &args[..])
                }
                Value::Request {
                    ability, tag, args, ..
                } => {
                    let type_ref = ctx.types().reference(*ability).ok()?.clone();
                    let head = Term::Request {
                        type_ref,
                        tag: *tag,
                    };
                    (head, &args[..])
                }
                Value::Pure(inner) => {
                    tasks.push(Task::Visit(inner));
                    continue;
                }
                Value::Continuation(_) | Value::Uninit => return None,
            },
        };

        if args.is_empty() {
            built.push(head);
            continue;
        }
        tasks.push(Task::Apply {
            head,
            args: args.len(),
        });
        tasks.extend(args.iter().rev().map(Task::Visit));
    }

    built.pop()
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::bytecode::combinator::CombRef;
    use crate::runtime::builtins::{base_context, unit};
    use crate::runtime::numbering::Word;
    use crate::syntax::reference::Reference;
    use crate::syntax::types::{ConstructorDecl, Type, TypeDecl};

    #[test]
    fn primitives_become_literals() {
        let ctx = base_context();
        assert_eq!(decompile(&ctx, &Value::Int(-4)), Some(Term::int(-4)));
        assert_eq!(
            decompile(&ctx, &Value::Text("hi".into())),
            Some(Term::text("hi"))
        );
    }

    #[test]
    fn nullary_data_is_a_bare_constructor() {
        let ctx = base_context();
        let unit_id = ctx.type_id(&Reference::builtin("Unit")).unwrap();
        let value = Value::Data {
            type_id: unit_id,
            tag: 0,
            fields: Rc::from(Vec::new()),
        };
        assert_eq!(decompile(&ctx, &value), Some(unit()));
    }

    #[test]
    fn partial_builtin_application_names_the_builtin() {
        let ctx = base_context();
        let plus = ctx.term_id(&Reference::builtin("Int.+")).unwrap();
        let value = Value::Closure {
            comb: CombRef { id: plus, index: 0 },
            args: Rc::from(vec![Value::Int(1)]),
        };
        assert_eq!(
            decompile(&ctx, &value),
            Some(Term::apply(Term::builtin("Int.+"), [Term::int(1)]))
        );
    }

    #[test]
    fn lifted_closures_and_continuations_have_no_surface_form() {
        let ctx = base_context();
        let lifted = Value::Closure {
            comb: CombRef { id: 0, index: 1 },
            args: Rc::from(Vec::new()),
        };
        assert_eq!(decompile(&ctx, &lifted), None);
        assert_eq!(decompile(&ctx, &Value::Continuation(Rc::from(Vec::new()))), None);
    }

    fn list_context() -> (EvalContext, Reference, Word) {
        let mut ctx = base_context();
        let list = Reference::builtin("List");
        let decl = TypeDecl::data(vec![
            ConstructorDecl::new("Nil", vec![]),
            ConstructorDecl::new("Cons", vec![Type::builtin("Int"), Type::Ref(list.clone())]),
        ]);
        let id = ctx.register_type(&list, decl);
        (ctx, list, id)
    }

    #[test]
    fn fields_keep_their_order_through_nesting() {
        let (ctx, list, id) = list_context();
        let nil = Value::Data {
            type_id: id,
            tag: 0,
            fields: Rc::from(Vec::new()),
        };
        let value = Value::Pure(Rc::new(Value::Data {
            type_id: id,
            tag: 1,
            fields: Rc::from(vec![Value::Int(1), nil]),
        }));
        let ctor = |tag| Term::Constructor {
            type_ref: list.clone(),
            tag,
        };
        assert_eq!(
            decompile(&ctx, &value),
            Some(Term::apply(ctor(1), [Term::int(1), ctor(0)]))
        );
    }

    #[test]
    fn long_lists_decompile_without_recursion() {
        const LEN: i64 = 100_000;
        let (ctx, list, id) = list_context();
        let mut value = Value::Data {
            type_id: id,
            tag: 0,
            fields: Rc::from(Vec::new()),
        };
        for n in 1..=LEN {
            value = Value::Data {
                type_id: id,
                tag: 1,
                fields: Rc::from(vec![Value::Int(n), value]),
            };
        }

        let mut term = decompile(&ctx, &value).unwrap();
        let mut expected = LEN;
        // Walk the spine by value so each cell is freed on its own.
        loop {
            match term {
                Term::Apply { func, mut args } => {
                    assert_eq!(
                        *func,
                        Term::Constructor {
                            type_ref: list.clone(),
                            tag: 1
                        }
                    );
                    let rest = args.pop().unwrap();
                    assert_eq!(args, vec![Term::int(expected)]);
                    expected -= 1;
                    term = rest;
                }
                nil => {
                    assert_eq!(nil, Term::Constructor { type_ref: list, tag: 0 });
                    break;
                }
            }
        }
        assert_eq!(expected, 0);
    }
}
