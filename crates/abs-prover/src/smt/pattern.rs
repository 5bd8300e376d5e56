// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Compilation of case terms into nested `ite` chains.
//!
//! Each branch contributes a guard (discriminator tests plus equality tests
//! on constrained positions) and a body in which bound pattern variables are
//! replaced by selector chains over the scrutinee. Branches are folded
//! right-to-left; the innermost alternative is a fresh unconstrained
//! wildcard of the expected sort, so a non-exhaustive match stays sound.

use crate::data::cases;
use crate::data::formulas::Formula;
use crate::data::terms::{CaseTerm, Term};
use crate::error::{ProverError, Result};
use crate::smt::SmtEncoder;
use crate::subst::{replace_in_term, TermMap};

impl SmtEncoder<'_> {
    pub(crate) fn compile_case(&mut self, case: &CaseTerm) -> Result<Term> {
        if case.branches.is_empty() {
            return Err(ProverError::EmptyCaseBranches);
        }
        let scrutinee = case.scrutinee.as_ref();
        // Scrutinees named `data` stand for an already-destructed value, so
        // equality obligations on constrained positions are redundant.
        let constrained = !matches!(scrutinee, Term::Var(v) if v.name == "data");

        let default = Term::func(self.create_wildcard(&case.expected_ty)?);
        let mut acc = default;
        for branch in case.branches.iter().rev() {
            let (guard, body) = match &branch.pattern {
                Term::DataTypeConst {
                    constructor,
                    ty,
                    params,
                } if ty.is_concrete_generic() => {
                    self.session.adts.add_generic(ty);
                    let mut matches = Formula::True;
                    if constrained {
                        for (param, path) in
                            cases::concrete_param_paths(constructor, ty, params)
                        {
                            matches = Formula::and(
                                matches,
                                Formula::predicate(
                                    "=",
                                    vec![param, cases::selector_chain(scrutinee, &path)],
                                ),
                            );
                        }
                    }
                    let mut map = TermMap::new();
                    for (ph, path) in cases::placeholder_paths(constructor, ty, params) {
                        let chain = cases::selector_chain(scrutinee, &path);
                        self.session
                            .placeholders
                            .insert(ph.clone(), chain.clone());
                        map.insert(Term::Var(ph), chain);
                    }
                    let guard = Formula::and(
                        Formula::is(
                            cases::selector_base(constructor, ty),
                            scrutinee.clone(),
                        ),
                        matches,
                    );
                    (guard, replace_in_term(&branch.body, &map))
                }
                Term::DataTypeConst {
                    constructor,
                    ty,
                    params,
                } => {
                    let guard = cases::extract_pattern_matching(
                        scrutinee,
                        constructor,
                        ty,
                        params,
                        &case.free_vars,
                    );
                    let mut map = TermMap::new();
                    for ph in branch.body.collect_terms(Term::is_placeholder) {
                        let path = cases::selector_path_for(constructor, ty, params, &ph);
                        if !path.is_empty() {
                            map.insert(ph.clone(), cases::selector_chain(scrutinee, &path));
                        }
                    }
                    let body = if map.is_empty() {
                        // The body may be a bound position itself, e.g. the
                        // tail of a cons pattern.
                        let path =
                            cases::selector_path_for(constructor, ty, params, &branch.body);
                        if path.is_empty() {
                            branch.body.clone()
                        } else {
                            cases::selector_chain(scrutinee, &path)
                        }
                    } else {
                        replace_in_term(&branch.body, &map)
                    };
                    (guard, body)
                }
                Term::Var(v) if case.free_vars.contains(&v.name) => (
                    Formula::eq(scrutinee.clone(), branch.pattern.clone()),
                    branch.body.clone(),
                ),
                Term::Var(_) => {
                    // A binding or wildcard variable matches unconditionally;
                    // occurrences in the body denote the scrutinee.
                    let map = TermMap::from([(branch.pattern.clone(), scrutinee.clone())]);
                    (Formula::True, replace_in_term(&branch.body, &map))
                }
                other => (
                    Formula::eq(scrutinee.clone(), other.clone()),
                    branch.body.clone(),
                ),
            };
            acc = Term::Ite {
                cond: Box::new(guard),
                then_branch: Box::new(body),
                else_branch: Box::new(acc),
            };
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::data::terms::{BranchTerm, ProgVar, VarKind};
    use crate::data::types::AbsType;
    use crate::session::Session;

    fn list_int() -> AbsType {
        AbsType::data_with("ABS.StdLib.List", vec![AbsType::Int])
    }

    fn placeholder(name: &str) -> ProgVar {
        ProgVar {
            name: name.to_string(),
            ty: AbsType::Int,
            kind: VarKind::Placeholder,
        }
    }

    fn case(scrutinee: Term, branches: Vec<BranchTerm>, expected_ty: AbsType) -> CaseTerm {
        CaseTerm {
            scrutinee: Box::new(scrutinee),
            expected_sort: "Int".into(),
            branches,
            free_vars: BTreeSet::new(),
            expected_ty,
        }
    }

    #[test]
    fn empty_branches_are_rejected() {
        let mut session = Session::new();
        let mut encoder = SmtEncoder::new(&mut session);
        let c = case(Term::func("l"), vec![], AbsType::Int);
        assert!(matches!(
            encoder.compile_case(&c),
            Err(ProverError::EmptyCaseBranches)
        ));
    }

    #[test]
    fn boolean_patterns_fold_into_equality_guards() {
        let mut session = Session::new();
        let mut encoder = SmtEncoder::new(&mut session);
        let b = Term::Var(ProgVar::new("b", AbsType::Bool));
        let tru = Term::DataTypeConst {
            constructor: "true".into(),
            ty: AbsType::Bool,
            params: vec![],
        };
        let fls = Term::DataTypeConst {
            constructor: "false".into(),
            ty: AbsType::Bool,
            params: vec![],
        };
        let c = case(
            b,
            vec![
                BranchTerm::new(tru, Term::int(1)),
                BranchTerm::new(fls, Term::int(0)),
            ],
            AbsType::Int,
        );
        let compiled = encoder.compile_case(&c).unwrap();
        let rendered = encoder.term_to_smt(&compiled).unwrap();
        assert!(rendered.starts_with("(ite (= b true) 1"));
        assert!(rendered.contains("(ite (= b false) 0"));
    }

    #[test]
    fn generic_pattern_binds_placeholders_to_selector_chains() {
        let mut session = Session::new();
        let mut encoder = SmtEncoder::new(&mut session);
        let l = Term::Var(ProgVar::new("l", list_int()));
        let head = placeholder("_ph0");
        let tail = placeholder("_ph1");
        let cons = Term::DataTypeConst {
            constructor: "ABS.StdLib.Cons".into(),
            ty: list_int(),
            params: vec![
                Term::Var(head.clone()),
                Term::Var(ProgVar {
                    ty: list_int(),
                    ..tail.clone()
                }),
            ],
        };
        let nil = Term::DataTypeConst {
            constructor: "ABS.StdLib.Nil".into(),
            ty: list_int(),
            params: vec![],
        };
        let c = case(
            l,
            vec![
                BranchTerm::new(cons, Term::Var(head.clone())),
                BranchTerm::new(nil, Term::int(0)),
            ],
            AbsType::Int,
        );
        let compiled = encoder.compile_case(&c).unwrap();
        let rendered = encoder.term_to_smt(&compiled).unwrap();
        assert!(rendered.contains("((_ is ABS.StdLib.Cons_ABS.StdLib.Int) l)"));
        assert!(rendered.contains("(ABS.StdLib.Cons_ABS.StdLib.Int_0 l)"));
        assert!(rendered.contains("((_ is ABS.StdLib.Nil_ABS.StdLib.Int) l)"));
        // The head placeholder is recorded for enclosing guards.
        assert!(session.placeholders.contains_key(&head));
        assert!(session.adts.is_known_generic(&list_int()));
    }

    #[test]
    fn non_exhaustive_match_falls_through_to_a_wildcard() {
        let mut session = Session::new();
        let mut encoder = SmtEncoder::new(&mut session);
        let b = Term::Var(ProgVar::new("b", AbsType::Bool));
        let tru = Term::DataTypeConst {
            constructor: "true".into(),
            ty: AbsType::Bool,
            params: vec![],
        };
        let c = case(b, vec![BranchTerm::new(tru, Term::int(1))], AbsType::Int);
        let compiled = encoder.compile_case(&c).unwrap();
        match compiled {
            Term::Ite { else_branch, .. } => {
                assert_eq!(else_branch.pretty(), "_0");
            }
            other => panic!("BUG: not an ite: {other:?}"),
        }
    }

    #[test]
    fn variable_pattern_matches_unconditionally() {
        let mut session = Session::new();
        let mut encoder = SmtEncoder::new(&mut session);
        let x = Term::Var(ProgVar::new("x", AbsType::Int));
        let bound = Term::Var(ProgVar::new("y", AbsType::Int));
        let c = case(
            x.clone(),
            vec![BranchTerm::new(
                bound.clone(),
                Term::func_with("+", vec![bound, Term::int(1)]),
            )],
            AbsType::Int,
        );
        let compiled = encoder.compile_case(&c).unwrap();
        match &compiled {
            Term::Ite {
                cond, then_branch, ..
            } => {
                assert_eq!(**cond, Formula::True);
                assert_eq!(then_branch.pretty(), "(x + 1)");
            }
            other => panic!("BUG: not an ite: {other:?}"),
        }
    }
}
