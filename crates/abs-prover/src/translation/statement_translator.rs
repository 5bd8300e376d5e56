// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Statement translation, including the call desugarings: a synchronous
//! call on another object becomes an asynchronous call plus an awaiting
//! read, and a `return` of a call splits into the call and a plain return.

use std::collections::BTreeSet;

use crate::ast::{self, Exp, SpecKind};
use crate::data::exprs::{Expr, Location};
use crate::data::statements::{Branch, Stmt};
use crate::data::terms::Field;
use crate::data::types::AbsType;
use crate::error::{ProverError, Result};
use crate::session::Session;
use crate::translation::expression_translator::{
    translate_expression, translate_guard, translate_pattern, SubstMap, TypeBinding,
};
use crate::translation::{extract_spec, SPECIAL_KEYWORDS};

pub fn translate_statement(
    input: &ast::Stmt,
    return_type: &AbsType,
    subst: &SubstMap,
    session: &mut Session,
) -> Result<Stmt> {
    match input {
        ast::Stmt::Skip => Ok(Stmt::Skip),
        ast::Stmt::Expression { exp, resolves } => {
            let loc = Location::Var(session.fresh_var(exp.ty()));
            translate_top_level(loc, exp, return_type, resolves, subst, false, session)
        }
        ast::Stmt::VarDecl {
            name,
            ty,
            init,
            resolves,
        } => {
            if SPECIAL_KEYWORDS.contains(&name.as_str()) {
                return Err(ProverError::SpecialKeywordMisuse(format!(
                    "declarations cannot be named with special keywords: {name}"
                )));
            }
            let loc = Location::Var(crate::data::terms::ProgVar::new(name.clone(), ty.clone()));
            let init = init.clone().unwrap_or(Exp::Null);
            translate_top_level(loc, &init, return_type, resolves, subst, true, session)
        }
        ast::Stmt::Assign {
            loc,
            value,
            resolves,
        } => {
            let loc = match loc {
                Exp::FieldUse { name, ty } => {
                    Location::Field(Field::new(format!("{name}_f"), ty.clone()))
                }
                Exp::VarUse { name, ty } => {
                    Location::Var(crate::data::terms::ProgVar::new(name.clone(), ty.clone()))
                }
                other => {
                    return Err(ProverError::UnsupportedConstruct(format!(
                        "assignment target: {other:?}"
                    )))
                }
            };
            translate_top_level(loc, value, return_type, resolves, subst, true, session)
        }
        ast::Stmt::Block(stmts) => {
            let mut translated = Vec::new();
            for s in stmts {
                translated.push(translate_statement(s, return_type, subst, session)?);
            }
            Ok(Stmt::seq_all(translated))
        }
        ast::Stmt::While {
            cond,
            body,
            invariants,
        } => {
            let (cond_expr, hoisted) =
                translate_expression(cond, return_type, subst, false, &TypeBinding::new(), session)?;
            let annotations: Vec<_> = invariants
                .iter()
                .map(|inv| ast::Annotation {
                    kind: SpecKind::WhileInv,
                    value: inv.clone(),
                })
                .collect();
            let invariant = extract_spec(&annotations, SpecKind::WhileInv, return_type, session)?;
            let body = translate_statement(body, return_type, subst, session)?;
            Ok(prepend(
                hoisted,
                Stmt::While {
                    cond: cond_expr,
                    body: Box::new(body),
                    pp: session.fresh_pp(),
                    invariant,
                },
            ))
        }
        ast::Stmt::Await(guard) => Ok(Stmt::Await {
            guard: translate_guard(guard, return_type, subst, session)?,
            pp: session.fresh_pp(),
        }),
        // suspend; is shorthand for await True;
        ast::Stmt::Suspend => Ok(Stmt::Await {
            guard: Expr::bool_true(),
            pp: session.fresh_pp(),
        }),
        ast::Stmt::Return(exp) => desugar_return(exp, return_type, subst, session),
        ast::Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let (cond_expr, hoisted) =
                translate_expression(cond, return_type, subst, false, &TypeBinding::new(), session)?;
            let then_branch = translate_statement(then_branch, return_type, subst, session)?;
            let else_branch = match else_branch {
                Some(s) => translate_statement(s, return_type, subst, session)?,
                None => Stmt::Skip,
            };
            Ok(prepend(
                hoisted,
                Stmt::If {
                    cond: cond_expr,
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                },
            ))
        }
        ast::Stmt::Assert(cond) => {
            let (expr, hoisted) =
                translate_expression(cond, return_type, subst, false, &TypeBinding::new(), session)?;
            Ok(prepend(hoisted, Stmt::Assert(expr)))
        }
        ast::Stmt::Case {
            scrutinee,
            branches,
        } => {
            let scrutinee_ty = scrutinee.ty();
            let mut arms = Vec::new();
            for br in branches {
                let mut inner = subst.clone();
                for (var, var_ty) in br.pattern.free_pattern_vars() {
                    let ph = session.fresh_placeholder(var_ty);
                    inner.insert(var, Expr::Var(ph));
                }
                let pattern = translate_pattern(
                    &br.pattern,
                    &scrutinee_ty,
                    return_type,
                    &inner,
                    &TypeBinding::new(),
                    session,
                )?;
                let body = translate_statement(&br.body, return_type, &inner, session)?;
                arms.push(Branch { pattern, body });
            }
            let (expr, hoisted) = translate_expression(
                scrutinee,
                return_type,
                subst,
                false,
                &TypeBinding::new(),
                session,
            )?;
            Ok(prepend(
                hoisted,
                Stmt::Branch {
                    scrutinee: expr,
                    branches: arms,
                },
            ))
        }
        // die aborts the method; its reason carries no logical content.
        ast::Stmt::Die(_) => Ok(Stmt::Assert(Expr::bool_false())),
        ast::Stmt::Throw(reason) => {
            let (expr, hoisted) = translate_expression(
                reason,
                return_type,
                subst,
                false,
                &TypeBinding::new(),
                session,
            )?;
            Ok(prepend(hoisted, Stmt::Throw(expr)))
        }
        ast::Stmt::TryCatchFinally => Err(ProverError::UnsupportedConstruct(
            "try/catch/finally is not core ABS".to_string(),
        )),
        ast::Stmt::MoveCogTo => Err(ProverError::UnsupportedConstruct(
            "movecogto is not core ABS".to_string(),
        )),
        ast::Stmt::Duration => Err(ProverError::UnsupportedConstruct(
            "duration is not core ABS".to_string(),
        )),
        ast::Stmt::Foreach => Err(ProverError::UnsupportedConstruct(
            "foreach is not core ABS; flatten the model first".to_string(),
        )),
    }
}

/// Top-level expressions with statement-level meaning are unified here:
/// future reads, object creation, and calls each have a dedicated
/// statement form; everything else becomes an assignment or effect.
pub fn translate_top_level(
    loc: Location,
    exp: &Exp,
    return_type: &AbsType,
    resolves: &BTreeSet<String>,
    subst: &SubstMap,
    assign: bool,
    session: &mut Session,
) -> Result<Stmt> {
    match exp {
        Exp::Get(_) => {
            let (fut_read, _) =
                translate_expression(exp, return_type, subst, true, &TypeBinding::new(), session)?;
            Ok(Stmt::SyncStmt {
                loc,
                fut_read,
                resolves: resolves.clone(),
                pp: session.fresh_pp(),
            })
        }
        Exp::New { .. } => {
            let (expr, _) =
                translate_expression(exp, return_type, subst, true, &TypeBinding::new(), session)?;
            Ok(Stmt::AllocateStmt { loc, expr })
        }
        Exp::Call {
            callee,
            is_async: true,
            ..
        } => {
            let (callee_expr, _) = translate_expression(
                callee,
                return_type,
                subst,
                true,
                &TypeBinding::new(),
                session,
            )?;
            let (call, _) =
                translate_expression(exp, return_type, subst, true, &TypeBinding::new(), session)?;
            Ok(Stmt::CallStmt {
                loc,
                callee: callee_expr,
                call,
            })
        }
        Exp::Call {
            is_async: false, ..
        } => desugar_sync_call(loc, exp, return_type, subst, session),
        _ => {
            let (expr, hoisted) = translate_expression(
                exp,
                return_type,
                subst,
                false,
                &TypeBinding::new(),
                session,
            )?;
            let stmt = if assign {
                Stmt::Assign { loc, expr }
            } else {
                Stmt::ExprStmt(expr)
            };
            Ok(prepend(hoisted, stmt))
        }
    }
}

/// A synchronous call on `this` stays synchronous; on any other callee it
/// is rewritten into an asynchronous call whose future is read at once.
fn desugar_sync_call(
    loc: Location,
    call: &Exp,
    return_type: &AbsType,
    subst: &SubstMap,
    session: &mut Session,
) -> Result<Stmt> {
    let Exp::Call {
        callee, method_name, ..
    } = call
    else {
        return Err(ProverError::UnsupportedConstruct(format!(
            "not a call: {call:?}"
        )));
    };
    let (callee_expr, _) =
        translate_expression(callee, return_type, subst, true, &TypeBinding::new(), session)?;
    let (call_expr, _) =
        translate_expression(call, return_type, subst, true, &TypeBinding::new(), session)?;

    if **callee == Exp::This {
        return Ok(Stmt::SyncCallStmt {
            loc,
            callee: callee_expr,
            call: call_expr,
        });
    }

    let fut = session.fresh_var(AbsType::Future(Box::new(loc.ty().clone())));
    let call_stmt = Stmt::CallStmt {
        loc: Location::Var(fut.clone()),
        callee: callee_expr,
        call: call_expr,
    };
    let sync_stmt = Stmt::SyncStmt {
        loc,
        fut_read: Expr::Poll(Box::new(Expr::Var(fut))),
        resolves: BTreeSet::from([method_name.clone()]),
        pp: session.fresh_pp(),
    };
    Ok(Stmt::seq(call_stmt, sync_stmt))
}

fn desugar_return(
    exp: &Exp,
    return_type: &AbsType,
    subst: &SubstMap,
    session: &mut Session,
) -> Result<Stmt> {
    if let Exp::Call { is_async, .. } = exp {
        let loc = session.fresh_var(return_type.clone());
        let call_stmt = if *is_async {
            let Exp::Call { callee, .. } = exp else {
                unreachable!()
            };
            let (callee_expr, _) = translate_expression(
                callee,
                return_type,
                subst,
                true,
                &TypeBinding::new(),
                session,
            )?;
            let (call, _) =
                translate_expression(exp, return_type, subst, true, &TypeBinding::new(), session)?;
            Stmt::CallStmt {
                loc: Location::Var(loc.clone()),
                callee: callee_expr,
                call,
            }
        } else {
            desugar_sync_call(Location::Var(loc.clone()), exp, return_type, subst, session)?
        };
        return Ok(Stmt::seq(call_stmt, Stmt::Return(Expr::Var(loc))));
    }
    let (expr, hoisted) =
        translate_expression(exp, return_type, subst, false, &TypeBinding::new(), session)?;
    Ok(prepend(hoisted, Stmt::Return(expr)))
}

fn prepend(hoisted: Vec<Stmt>, stmt: Stmt) -> Stmt {
    let mut all = hoisted;
    all.push(stmt);
    Stmt::seq_all(all)
}
