// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Expression translation. Returns the translated expression together with
//! the statements a desugared case expression hoisted out of it; callers
//! prepend those statements before the statement the expression occurs in.

use std::collections::BTreeMap;

use crate::ast::{Exp, Guard, Pattern};
use crate::data::exprs::{BranchExpr, Expr};
use crate::data::statements::{Branch, Stmt};
use crate::data::terms::{Field, ProgVar};
use crate::data::types::{AbsType, STDLIB_PREFIX};
use crate::error::{ProverError, Result};
use crate::session::{smt_function_name, Session};
use crate::translation::{is_builtin_function, SPECIAL_KEYWORDS};

/// Pending substitution of source variables by translated expressions;
/// carries `let` bindings and pattern placeholders into subterms.
pub type SubstMap = BTreeMap<String, Expr>;

/// Resolution of type parameters at a concretization site.
pub type TypeBinding = BTreeMap<String, AbsType>;

pub fn translate_expression(
    input: &Exp,
    return_type: &AbsType,
    subst: &SubstMap,
    full_expr: bool,
    binding: &TypeBinding,
    session: &mut Session,
) -> Result<(Expr, Vec<Stmt>)> {
    match input {
        Exp::FieldUse { name, ty } => {
            if SPECIAL_KEYWORDS.contains(&name.as_str()) {
                return Err(ProverError::SpecialKeywordMisuse(format!(
                    "fields cannot be named with special keywords: {name}"
                )));
            }
            if ty.is_unknown() {
                return Err(ProverError::UnknownDeclaration(format!(
                    "field {name} not defined"
                )));
            }
            let field = Field::new(format!("{name}_f"), ty.apply_binding(binding));
            Ok((Expr::Field(field), vec![]))
        }
        Exp::VarUse { name, ty } => {
            if SPECIAL_KEYWORDS.contains(&name.as_str()) {
                return Err(ProverError::SpecialKeywordMisuse(format!(
                    "variables cannot be named with special keywords: {name}"
                )));
            }
            if name == "result" {
                if return_type.is_unknown() {
                    return Err(ProverError::UnknownTypeTranslation(
                        "result used where the return type is unknown".to_string(),
                    ));
                }
                return Ok((Expr::Var(ProgVar::ret(return_type.clone())), vec![]));
            }
            let bound = ty.apply_binding(binding);
            // Future-typed variables name the future itself even under a
            // pending substitution; the claim guard needs the original.
            if ty.is_future() {
                return Ok((Expr::Var(ProgVar::new(name.clone(), bound)), vec![]));
            }
            match subst.get(name) {
                Some(replacement) => Ok((replacement.clone(), vec![])),
                None => Ok((Expr::Var(ProgVar::new(name.clone(), bound)), vec![])),
            }
        }
        Exp::IntLiteral(content) => Ok((Expr::constant(content.clone(), AbsType::Int), vec![])),
        Exp::FloatLiteral(content) => {
            Ok((Expr::constant(content.clone(), AbsType::Float), vec![]))
        }
        Exp::StringLiteral(content) => Ok((
            Expr::constant(format!("\"{content}\""), AbsType::Str),
            vec![],
        )),
        Exp::Null => Ok((Expr::constant("0", AbsType::Int), vec![])),
        Exp::This => Ok((Expr::constant("1", AbsType::Int), vec![])),
        Exp::Let {
            var_name,
            value,
            body,
        } => {
            let (bound_value, mut stmts) =
                translate_expression(value, return_type, subst, full_expr, binding, session)?;
            let mut inner = subst.clone();
            inner.insert(var_name.clone(), bound_value);
            let (body_expr, body_stmts) =
                translate_expression(body, return_type, &inner, full_expr, binding, session)?;
            stmts.extend(body_stmts);
            Ok((body_expr, stmts))
        }
        Exp::Get(inner) => {
            let (expr, stmts) =
                translate_expression(inner, return_type, subst, full_expr, binding, session)?;
            Ok((Expr::Poll(Box::new(expr)), stmts))
        }
        Exp::New { class, args, ty } => {
            let mut stmts = Vec::new();
            let mut params = Vec::new();
            for arg in args {
                let (expr, sub) =
                    translate_expression(arg, return_type, subst, full_expr, binding, session)?;
                params.push(expr);
                stmts.extend(sub);
            }
            let simple = class.rsplit('.').next().unwrap_or(class);
            let name = session.fresh_object(simple);
            session
                .adts
                .objects
                .insert(name.clone(), vec![ty.apply_binding(binding)]);
            Ok((Expr::sexpr(name, params), stmts))
        }
        Exp::Binary { op, left, right } => {
            if !crate::data::terms::BINARIES.contains(&op.as_str()) && op != "->" {
                return Err(ProverError::UnsupportedConstruct(format!(
                    "binary operator `{op}`"
                )));
            }
            let (l, mut stmts) =
                translate_expression(left, return_type, subst, full_expr, binding, session)?;
            let (r, rs) =
                translate_expression(right, return_type, subst, full_expr, binding, session)?;
            stmts.extend(rs);
            Ok((Expr::sexpr(op.clone(), vec![l, r]), stmts))
        }
        Exp::Unary { op, operand } => {
            if op != "-" && op != "!" {
                return Err(ProverError::UnsupportedConstruct(format!(
                    "unary operator `{op}`"
                )));
            }
            let (e, stmts) =
                translate_expression(operand, return_type, subst, full_expr, binding, session)?;
            Ok((Expr::sexpr(op.clone(), vec![e]), stmts))
        }
        Exp::DataConstructor {
            constructor,
            qualified,
            ty,
            args,
        } => match constructor.as_str() {
            "Unit" => Ok((Expr::unit(), vec![])),
            "True" => Ok((Expr::bool_true(), vec![])),
            "False" => Ok((Expr::bool_false(), vec![])),
            _ => {
                let qualified = qualified.as_ref().ok_or_else(|| {
                    ProverError::UnknownDeclaration(format!(
                        "data constructor {constructor} could not be resolved"
                    ))
                })?;
                if ty.is_unknown() {
                    return Err(ProverError::UnknownDeclaration(format!(
                        "wrong use of data constructor {constructor}"
                    )));
                }
                let mut stmts = Vec::new();
                let mut params = Vec::new();
                for arg in args {
                    let (expr, sub) = translate_expression(
                        arg, return_type, subst, full_expr, binding, session,
                    )?;
                    params.push(expr);
                    stmts.extend(sub);
                }
                Ok((
                    Expr::DataTypeExpr {
                        constructor: qualified.clone(),
                        ty: ty.apply_binding(binding),
                        args: params,
                    },
                    stmts,
                ))
            }
        },
        Exp::FnApp { name, decl, args } => {
            translate_fn_app(name, decl.as_deref(), args, return_type, subst, full_expr, binding, session)
        }
        Exp::IfExp {
            cond,
            then_exp,
            else_exp,
        } => {
            let (c, mut stmts) =
                translate_expression(cond, return_type, subst, full_expr, binding, session)?;
            let (t, ts) =
                translate_expression(then_exp, return_type, subst, full_expr, binding, session)?;
            let (e, es) =
                translate_expression(else_exp, return_type, subst, full_expr, binding, session)?;
            stmts.extend(ts);
            stmts.extend(es);
            Ok((Expr::sexpr("ite", vec![c, t, e]), stmts))
        }
        Exp::Call {
            callee,
            method_qualified,
            args,
            is_async,
            ..
        } => {
            let mut params = Vec::new();
            for arg in args {
                let (expr, _) =
                    translate_expression(arg, return_type, subst, true, binding, session)?;
                params.push(expr);
            }
            let expr = if *is_async || **callee != Exp::This {
                Expr::CallExpr {
                    method: method_qualified.clone(),
                    args: params,
                }
            } else {
                Expr::SyncCallExpr {
                    method: method_qualified.clone(),
                    args: params,
                }
            };
            Ok((expr, vec![]))
        }
        Exp::Case {
            scrutinee,
            branches,
            ty,
            free_vars,
        } => {
            if full_expr {
                let (match_expr, _) =
                    translate_expression(scrutinee, return_type, subst, true, binding, session)?;
                let expected_ty = ty.apply_binding(binding);
                let expected_sort = session.adts.lib_prefix(&expected_ty)?;
                let mut arms = Vec::new();
                for br in branches {
                    let mut inner = subst.clone();
                    for (var, var_ty) in br.pattern.free_pattern_vars() {
                        let ph = session.fresh_placeholder(var_ty.apply_binding(binding));
                        inner.insert(var, Expr::Var(ph));
                    }
                    let pattern = translate_pattern(
                        &br.pattern,
                        &br.pattern_ty.apply_binding(binding),
                        return_type,
                        &inner,
                        binding,
                        session,
                    )?;
                    let (body, _) =
                        translate_expression(&br.body, return_type, &inner, true, binding, session)?;
                    arms.push(BranchExpr { pattern, body });
                }
                Ok((
                    Expr::CaseExpr {
                        scrutinee: Box::new(match_expr),
                        expected_sort,
                        branches: arms,
                        free_vars: free_vars.clone(),
                        expected_ty,
                    },
                    vec![],
                ))
            } else {
                // Desugared into a branch statement assigning a fresh
                // variable; the statement is hoisted to the caller.
                let new_var = session.fresh_var(return_type.clone());
                let (match_expr, mut stmts) =
                    translate_expression(scrutinee, return_type, subst, false, binding, session)?;
                let mut arms = Vec::new();
                let mut last_is_wildcard = false;
                for br in branches {
                    let mut inner = subst.clone();
                    for (var, var_ty) in br.pattern.free_pattern_vars() {
                        let ph = session.fresh_placeholder(var_ty.apply_binding(binding));
                        inner.insert(var, Expr::Var(ph));
                    }
                    let pattern = translate_pattern(
                        &br.pattern,
                        &br.pattern_ty.apply_binding(binding),
                        return_type,
                        &inner,
                        binding,
                        session,
                    )?;
                    let (body, body_stmts) = translate_expression(
                        &br.body, return_type, &inner, false, binding, session,
                    )?;
                    stmts.extend(body_stmts);
                    last_is_wildcard = matches!(br.pattern, Pattern::Underscore { .. });
                    arms.push(Branch {
                        pattern,
                        body: Stmt::Assign {
                            loc: crate::data::exprs::Location::Var(new_var.clone()),
                            expr: body,
                        },
                    });
                }
                // Source cases need not be exhaustive; close them with a
                // wildcard arm assigning an unconstrained value.
                if !last_is_wildcard {
                    let wildcard =
                        session.fresh_wildcard_var(scrutinee.ty().apply_binding(binding));
                    let unconstrained = session.fresh_var(return_type.clone());
                    arms.push(Branch {
                        pattern: Expr::Var(wildcard),
                        body: Stmt::Assign {
                            loc: crate::data::exprs::Location::Var(new_var.clone()),
                            expr: Expr::Var(unconstrained),
                        },
                    });
                }
                stmts.push(Stmt::Branch {
                    scrutinee: match_expr,
                    branches: arms,
                });
                Ok((Expr::Var(new_var), stmts))
            }
        }
        Exp::As { exp, iface } => {
            let (e, stmts) =
                translate_expression(exp, return_type, subst, full_expr, binding, session)?;
            let implements = Expr::Implements {
                value: Box::new(e.clone()),
                iface: iface.apply_binding(binding),
            };
            let null = Expr::constant("0", AbsType::Int);
            let guard = Expr::sexpr(
                "and",
                vec![
                    Expr::sexpr("not", vec![Expr::sexpr("=", vec![e.clone(), null.clone()])]),
                    implements,
                ],
            );
            Ok((Expr::sexpr("ite", vec![guard, e, null]), stmts))
        }
        Exp::Implements { exp, iface } => {
            let (e, stmts) =
                translate_expression(exp, return_type, subst, full_expr, binding, session)?;
            Ok((
                Expr::Implements {
                    value: Box::new(e),
                    iface: iface.apply_binding(binding),
                },
                stmts,
            ))
        }
        Exp::ListLiteral { elems, ty } => {
            let mut stmts = Vec::new();
            let mut list = Expr::DataTypeExpr {
                constructor: "ABS.StdLib.Nil".to_string(),
                ty: ty.clone(),
                args: vec![],
            };
            for elem in elems.iter().rev() {
                let (expr, sub) =
                    translate_expression(elem, return_type, subst, full_expr, binding, session)?;
                stmts.extend(sub);
                list = Expr::DataTypeExpr {
                    constructor: "ABS.StdLib.Cons".to_string(),
                    ty: ty.clone(),
                    args: vec![expr, list],
                };
            }
            Ok((list, stmts))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn translate_fn_app(
    name: &str,
    decl: Option<&str>,
    args: &[Exp],
    return_type: &AbsType,
    subst: &SubstMap,
    full_expr: bool,
    binding: &TypeBinding,
    session: &mut Session,
) -> Result<(Expr, Vec<Stmt>)> {
    if name == "match" {
        return Err(ProverError::SpecialKeywordMisuse(
            "function applications cannot be named with special keywords: match".to_string(),
        ));
    }
    // Access to the value of a resolved future.
    if name == "valueOf" {
        let first = args.first().ok_or_else(|| {
            ProverError::SpecialKeywordMisuse("`valueOf` takes one argument".to_string())
        })?;
        let (expr, stmts) =
            translate_expression(first, return_type, subst, full_expr, binding, session)?;
        return Ok((Expr::Poll(Box::new(expr)), stmts));
    }
    if is_builtin_function(name) {
        let (params, stmts) =
            translate_all(args, return_type, subst, full_expr, binding, session)?;
        return Ok((Expr::sexpr(name, params), stmts));
    }
    // Role membership for session-local specifications; the role must be a
    // literal so it can be quoted on the solver side.
    if name == "hasRole" {
        let (field_arg, role_arg) = match args {
            [f, r] => (f, r),
            _ => {
                return Err(ProverError::UnsupportedConstruct(
                    "hasRole takes a field and a role literal".to_string(),
                ))
            }
        };
        let role = match role_arg {
            Exp::StringLiteral(content) => {
                Expr::constant(format!("\"{content}\""), AbsType::Str)
            }
            _ => {
                return Err(ProverError::UnsupportedConstruct(
                    "hasRole expects a string literal role".to_string(),
                ))
            }
        };
        let (field, stmts) =
            translate_expression(field_arg, return_type, subst, full_expr, binding, session)?;
        return Ok((Expr::sexpr("hasRole", vec![field, role]), stmts));
    }
    let Some(qualified) = decl else {
        // Unresolved names are only legal as special heap keywords inside
        // specifications.
        if crate::data::conversion::SPECIAL_HEAP_KEYWORDS.contains(&name) {
            let (params, stmts) =
                translate_all(args, return_type, subst, full_expr, binding, session)?;
            return Ok((Expr::sexpr(name, params), stmts));
        }
        return Err(ProverError::UnknownDeclaration(format!(
            "unknown declaration of function {name}"
        )));
    };
    if session.functions.by_qualified(qualified).is_some() {
        let (params, stmts) =
            translate_all(args, return_type, subst, full_expr, binding, session)?;
        return Ok((Expr::sexpr(smt_function_name(qualified), params), stmts));
    }
    // random is not a function; each occurrence is an unconstrained value.
    if qualified == format!("{STDLIB_PREFIX}random") {
        return Ok((Expr::Var(session.fresh_var(AbsType::Int)), vec![]));
    }
    Err(ProverError::UnsupportedConstruct(format!(
        "function application of {qualified} is not supported"
    )))
}

fn translate_all(
    args: &[Exp],
    return_type: &AbsType,
    subst: &SubstMap,
    full_expr: bool,
    binding: &TypeBinding,
    session: &mut Session,
) -> Result<(Vec<Expr>, Vec<Stmt>)> {
    let mut params = Vec::new();
    let mut stmts = Vec::new();
    for arg in args {
        let (expr, sub) =
            translate_expression(arg, return_type, subst, full_expr, binding, session)?;
        params.push(expr);
        stmts.extend(sub);
    }
    Ok((params, stmts))
}

pub fn translate_guard(
    input: &Guard,
    return_type: &AbsType,
    subst: &SubstMap,
    session: &mut Session,
) -> Result<Expr> {
    match input {
        Guard::Exp(e) => Ok(translate_expression(
            e,
            return_type,
            subst,
            false,
            &TypeBinding::new(),
            session,
        )?
        .0),
        Guard::And(left, right) => Ok(Expr::sexpr(
            "&&",
            vec![
                translate_guard(left, return_type, subst, session)?,
                translate_guard(right, return_type, subst, session)?,
            ],
        )),
        Guard::Claim { var } => {
            let (guarded, _) = translate_expression(
                var,
                return_type,
                subst,
                true,
                &TypeBinding::new(),
                session,
            )?;
            Ok(Expr::Claim {
                guarded: Box::new(guarded),
            })
        }
    }
}

/// Translates a pattern into the expression the branch matcher compares
/// against. `override_ty` types wildcards whose own type is unresolved.
pub fn translate_pattern(
    pattern: &Pattern,
    override_ty: &AbsType,
    return_type: &AbsType,
    subst: &SubstMap,
    binding: &TypeBinding,
    session: &mut Session,
) -> Result<Expr> {
    match pattern {
        Pattern::Var { name, ty } => match subst.get(name) {
            Some(replacement) => Ok(replacement.clone()),
            None => Ok(Expr::Var(ProgVar::new(
                name.clone(),
                ty.apply_binding(binding),
            ))),
        },
        Pattern::Literal(lit) => Ok(translate_expression(
            lit,
            return_type,
            subst,
            true,
            binding,
            session,
        )?
        .0),
        Pattern::Underscore { ty } => {
            let ty = if ty.is_unknown() { override_ty } else { ty };
            Ok(Expr::Var(
                session.fresh_wildcard_var(ty.apply_binding(binding)),
            ))
        }
        Pattern::Constructor {
            constructor,
            module,
            ty,
            args,
        } => {
            let qualified = if constructor == "True" || constructor == "False" {
                constructor.to_lowercase()
            } else if ty.qualified_name().starts_with(STDLIB_PREFIX) {
                format!("{STDLIB_PREFIX}{constructor}")
            } else {
                type_with_module(constructor, module)
            };
            let bound = ty.apply_binding(binding);
            let mut params = Vec::new();
            for arg in args {
                let arg_ty = pattern_ty(arg).apply_binding(binding);
                params.push(translate_pattern(
                    arg,
                    &arg_ty,
                    return_type,
                    subst,
                    binding,
                    session,
                )?);
            }
            Ok(Expr::DataTypeExpr {
                constructor: qualified,
                ty: bound,
                args: params,
            })
        }
    }
}

fn pattern_ty(pattern: &Pattern) -> AbsType {
    match pattern {
        Pattern::Var { ty, .. }
        | Pattern::Underscore { ty }
        | Pattern::Constructor { ty, .. } => ty.clone(),
        Pattern::Literal(lit) => lit.ty(),
    }
}

fn type_with_module(constructor: &str, module: &str) -> String {
    if constructor.starts_with(&format!("{module}.")) {
        constructor.to_string()
    } else {
        format!("{module}.{constructor}")
    }
}
