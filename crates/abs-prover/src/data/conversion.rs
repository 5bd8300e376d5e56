// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Lowering of intermediate expressions into terms and formulas.

use crate::data::cases;
use crate::data::exprs::Expr;
use crate::data::formulas::Formula;
use crate::data::terms::{BranchTerm, CaseTerm, ProgVar, Term};
use crate::error::{ProverError, Result};

/// Heap names usable as wrapping keywords in specifications: `old(..)`
/// reads the pre-state heap, `last(..)` the heap at the latest release
/// point.
pub const SPECIAL_HEAP_KEYWORDS: &[&str] = &["old", "last"];

pub fn special_heap_var(keyword: &str) -> Option<ProgVar> {
    match keyword {
        "old" => Some(ProgVar::old_heap()),
        "last" => Some(ProgVar::last_heap()),
        _ => None,
    }
}

pub fn expr_to_term(input: &Expr) -> Result<Term> {
    expr_to_term_on(input, None)
}

fn expr_to_term_on(input: &Expr, heap_keyword: Option<&str>) -> Result<Term> {
    match input {
        Expr::Var(v) => Ok(Term::Var(v.clone())),
        Expr::Field(f) => match heap_keyword {
            None => Ok(Term::select(f.clone())),
            Some(kw) => {
                let heap = special_heap_var(kw).ok_or_else(|| {
                    ProverError::SpecialKeywordMisuse(format!(
                        "heap keyword `{kw}` is not supported"
                    ))
                })?;
                Ok(Term::select_on(Term::Var(heap), f.clone()))
            }
        },
        Expr::Poll(inner) => Ok(Term::value_of(expr_to_term_on(inner, heap_keyword)?)),
        Expr::Const { name, .. } => Ok(Term::func(name.clone())),
        Expr::SExpr { op, args } => {
            if SPECIAL_HEAP_KEYWORDS.contains(&op.as_str()) {
                if args.len() == 1 {
                    return expr_to_term_on(&args[0], Some(op));
                }
                return Err(ProverError::SpecialKeywordMisuse(format!(
                    "`{op}` takes one argument, got {}",
                    args.len()
                )));
            }
            Ok(Term::Function {
                name: op.clone(),
                params: args
                    .iter()
                    .map(|a| expr_to_term_on(a, heap_keyword))
                    .collect::<Result<_>>()?,
            })
        }
        Expr::DataTypeExpr {
            constructor,
            ty,
            args,
        } => Term::data_const(
            constructor.clone(),
            ty.clone(),
            args.iter()
                .map(|a| expr_to_term_on(a, heap_keyword))
                .collect::<Result<_>>()?,
        ),
        Expr::CaseExpr {
            scrutinee,
            expected_sort,
            branches,
            free_vars,
            expected_ty,
        } => Ok(Term::Case(CaseTerm {
            scrutinee: Box::new(expr_to_term(scrutinee)?),
            expected_sort: expected_sort.clone(),
            branches: branches
                .iter()
                .map(|b| {
                    Ok(BranchTerm::new(
                        expr_to_term_on(&b.pattern, heap_keyword)?,
                        expr_to_term_on(&b.body, heap_keyword)?,
                    ))
                })
                .collect::<Result<_>>()?,
            free_vars: free_vars.clone(),
            expected_ty: expected_ty.clone(),
        })),
        Expr::Implements { value, iface } => Ok(Term::Implements {
            value: Box::new(expr_to_term_on(value, heap_keyword)?),
            iface: iface.clone(),
        }),
        // The claim itself carries no logical content; the driver reads
        // the guarded variable off the statement.
        Expr::Claim { .. } => Ok(Term::func("true")),
        Expr::CallExpr { .. } | Expr::SyncCallExpr { .. } => Err(
            ProverError::UnsupportedConstruct(format!(
                "call expression in logic position: {}",
                input.pretty()
            )),
        ),
    }
}

pub fn expr_to_form(input: &Expr) -> Result<Formula> {
    expr_to_form_on(input, None)
}

fn expr_to_form_on(input: &Expr, heap_keyword: Option<&str>) -> Result<Formula> {
    if let Expr::SExpr { op, args } = input {
        match (op.as_str(), args.len()) {
            ("&&", 2) => {
                return Ok(Formula::and(
                    expr_to_form_on(&args[0], heap_keyword)?,
                    expr_to_form_on(&args[1], heap_keyword)?,
                ))
            }
            ("||", 2) => {
                return Ok(Formula::or(
                    expr_to_form_on(&args[0], heap_keyword)?,
                    expr_to_form_on(&args[1], heap_keyword)?,
                ))
            }
            ("->", 2) => {
                return Ok(Formula::implies(
                    expr_to_form_on(&args[0], heap_keyword)?,
                    expr_to_form_on(&args[1], heap_keyword)?,
                ))
            }
            ("!", 1) => return Ok(Formula::not(expr_to_form_on(&args[0], heap_keyword)?)),
            ("!=", _) => {
                return Ok(Formula::not(expr_to_form_on(
                    &Expr::sexpr("=", args.clone()),
                    heap_keyword,
                )?))
            }
            _ => {}
        }
        if SPECIAL_HEAP_KEYWORDS.contains(&op.as_str()) {
            if args.len() == 1 {
                return expr_to_form_on(&args[0], Some(op));
            }
            return Err(ProverError::SpecialKeywordMisuse(format!(
                "`{op}` takes one argument, got {}",
                args.len()
            )));
        }
        return Ok(Formula::Predicate {
            name: op.clone(),
            params: args
                .iter()
                .map(|a| expr_to_term_on(a, heap_keyword))
                .collect::<Result<_>>()?,
        });
    }
    if let Expr::Implements { value, iface } = input {
        return Ok(Formula::Implements {
            value: Box::new(expr_to_term(value)?),
            iface: iface.clone(),
        });
    }
    match input {
        Expr::Field(_) | Expr::Var(_) | Expr::Const { .. } | Expr::Claim { .. } => expr_to_form_on(
            &Expr::sexpr("=", vec![input.clone(), Expr::bool_true()]),
            heap_keyword,
        ),
        _ => Err(ProverError::UnsupportedConstruct(format!(
            "expression cannot be converted to a formula: {}",
            input.pretty()
        ))),
    }
}

/// Compiled form of a case term: nested `Ite` over discriminator tests,
/// ending in a fresh-wildcard default. See `smt::pattern` for the full
/// compilation including placeholder resolution; this free function covers
/// the non-generic subset used outside the encoder.
pub fn branch_guard(case: &CaseTerm, branch: &BranchTerm) -> Formula {
    match &branch.pattern {
        Term::DataTypeConst {
            constructor,
            ty,
            params,
        } => cases::extract_pattern_matching(&case.scrutinee, constructor, ty, params, &case.free_vars),
        Term::Var(v) if case.free_vars.contains(&v.name) => {
            Formula::eq((*case.scrutinee).clone(), branch.pattern.clone())
        }
        _ => Formula::True,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::terms::Field;
    use crate::data::types::AbsType;

    #[test]
    fn field_reads_select_on_the_current_heap() {
        let f = Field::new("balance_f", AbsType::Int);
        let t = expr_to_term(&Expr::Field(f)).unwrap();
        assert_eq!(t.pretty(), "select(heap, balance_f)");
    }

    #[test]
    fn old_keyword_switches_the_heap() {
        let f = Field::new("balance_f", AbsType::Int);
        let wrapped = Expr::sexpr("old", vec![Expr::Field(f)]);
        let t = expr_to_term(&wrapped).unwrap();
        assert_eq!(t.pretty(), "select(old, balance_f)");
    }

    #[test]
    fn old_keyword_arity_is_checked() {
        let err = expr_to_term(&Expr::sexpr("old", vec![])).unwrap_err();
        assert!(matches!(err, ProverError::SpecialKeywordMisuse(_)));
    }

    #[test]
    fn boolean_atoms_become_equalities_with_true() {
        let v = Expr::Var(ProgVar::new("b", AbsType::Bool));
        let f = expr_to_form(&v).unwrap();
        assert_eq!(f.pretty(), "(b = true)");
    }

    #[test]
    fn neq_becomes_negated_equality() {
        let f = expr_to_form(&Expr::sexpr(
            "!=",
            vec![
                Expr::Var(ProgVar::new("x", AbsType::Int)),
                Expr::constant("0", AbsType::Int),
            ],
        ))
        .unwrap();
        assert_eq!(f.pretty(), "!(x = 0)");
    }

    #[test]
    fn calls_are_rejected_in_logic_position() {
        let call = Expr::CallExpr {
            method: "M.C.m".into(),
            args: vec![],
        };
        assert!(matches!(
            expr_to_term(&call),
            Err(ProverError::UnsupportedConstruct(_))
        ));
    }
}
