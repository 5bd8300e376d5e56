// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Substitution, update application, and node replacement.
//!
//! Substitution is capture-avoiding by construction: the only binding scopes
//! of the representation are quantifier bodies and case branches (left
//! untouched), and updates, which shadow sequentially — when an update
//! assigns a variable that is a substitution key, the part evaluated after
//! that assignment is not substituted.

use std::collections::BTreeMap;

use crate::data::formulas::Formula;
use crate::data::terms::{ProgVar, Term};
use crate::data::updates::UpdateElement;

/// Wholesale-node binding map: keys are matched against whole nodes, not
/// just variables.
pub type TermMap = BTreeMap<Term, Term>;

pub fn single(v: &ProgVar, replacement: &Term) -> TermMap {
    TermMap::from([(Term::Var(v.clone()), replacement.clone())])
}

fn shadows(update: &UpdateElement, map: &TermMap) -> bool {
    map.keys()
        .any(|k| matches!(k, Term::Var(v) if update.assigns(v)))
}

pub fn subst_term(term: &Term, map: &TermMap) -> Term {
    if let Some(replacement) = map.get(term) {
        return replacement.clone();
    }
    match term {
        Term::Var(_) | Term::Field(_) => term.clone(),
        Term::Function { name, params } => Term::Function {
            name: name.clone(),
            params: params.iter().map(|p| subst_term(p, map)).collect(),
        },
        Term::DataTypeConst {
            constructor,
            ty,
            params,
        } => Term::DataTypeConst {
            constructor: constructor.clone(),
            ty: ty.clone(),
            params: params.iter().map(|p| subst_term(p, map)).collect(),
        },
        Term::Ite {
            cond,
            then_branch,
            else_branch,
        } => Term::Ite {
            cond: Box::new(subst_formula(cond, map)),
            then_branch: Box::new(subst_term(then_branch, map)),
            else_branch: Box::new(subst_term(else_branch, map)),
        },
        // Case branches bind their pattern variables.
        Term::Case(_) => term.clone(),
        Term::Implements { value, iface } => Term::Implements {
            value: Box::new(subst_term(value, map)),
            iface: iface.clone(),
        },
        Term::UpdateOn { update, target } => {
            let substituted = Box::new(subst_update(update, map));
            if shadows(update, map) {
                Term::UpdateOn {
                    update: substituted,
                    target: target.clone(),
                }
            } else {
                Term::UpdateOn {
                    update: substituted,
                    target: Box::new(subst_term(target, map)),
                }
            }
        }
    }
}

pub fn subst_formula(formula: &Formula, map: &TermMap) -> Formula {
    match formula {
        Formula::True | Formula::False => formula.clone(),
        Formula::Not(inner) => Formula::not(subst_formula(inner, map)),
        Formula::And(a, b) => Formula::and(subst_formula(a, map), subst_formula(b, map)),
        Formula::Or(a, b) => Formula::or(subst_formula(a, map), subst_formula(b, map)),
        Formula::Impl(a, b) => Formula::implies(subst_formula(a, map), subst_formula(b, map)),
        Formula::Eq(a, b) => Formula::eq(subst_term(a, map), subst_term(b, map)),
        Formula::Predicate { name, params } => Formula::Predicate {
            name: name.clone(),
            params: params.iter().map(|p| subst_term(p, map)).collect(),
        },
        Formula::Is { constructor, term } => Formula::Is {
            constructor: constructor.clone(),
            term: Box::new(subst_term(term, map)),
        },
        Formula::Implements { value, iface } => Formula::Implements {
            value: Box::new(subst_term(value, map)),
            iface: iface.clone(),
        },
        // Quantifiers bind their variables.
        Formula::Quantifier { .. } => formula.clone(),
        Formula::UpdateOn { update, target } => {
            let substituted = Box::new(subst_update(update, map));
            if shadows(update, map) {
                Formula::UpdateOn {
                    update: substituted,
                    target: target.clone(),
                }
            } else {
                Formula::UpdateOn {
                    update: substituted,
                    target: Box::new(subst_formula(target, map)),
                }
            }
        }
    }
}

pub fn subst_update(update: &UpdateElement, map: &TermMap) -> UpdateElement {
    match update {
        UpdateElement::Empty => UpdateElement::Empty,
        UpdateElement::Elementary { lhs, rhs } => UpdateElement::Elementary {
            lhs: lhs.clone(),
            rhs: subst_term(rhs, map),
        },
        UpdateElement::Chain(left, right) => {
            let new_left = subst_update(left, map);
            if shadows(left, map) {
                UpdateElement::Chain(Box::new(new_left), right.clone())
            } else {
                UpdateElement::Chain(Box::new(new_left), Box::new(subst_update(right, map)))
            }
        }
    }
}

/// Resolves one update against a term: empty is a no-op, elementary is a
/// single substitution, a chain applies the later (right) update first so
/// the earlier one substitutes through its result.
pub fn apply_to_term(update: &UpdateElement, target: &Term) -> Term {
    match update {
        UpdateElement::Empty => target.clone(),
        UpdateElement::Elementary { lhs, rhs } => subst_term(target, &single(lhs, rhs)),
        UpdateElement::Chain(left, right) => apply_to_term(left, &apply_to_term(right, target)),
    }
}

pub fn apply_to_formula(update: &UpdateElement, target: &Formula) -> Formula {
    match update {
        UpdateElement::Empty => target.clone(),
        UpdateElement::Elementary { lhs, rhs } => subst_formula(target, &single(lhs, rhs)),
        UpdateElement::Chain(left, right) => {
            apply_to_formula(left, &apply_to_formula(right, target))
        }
    }
}

/// Pushes every pending update down to the leaves until none remains.
/// Terminates because each application strictly reduces update nesting.
pub fn deupdatify_term(term: &Term) -> Term {
    match term {
        Term::UpdateOn { update, target } => deupdatify_term(&apply_to_term(update, target)),
        Term::Var(_) | Term::Field(_) => term.clone(),
        Term::Function { name, params } => Term::Function {
            name: name.clone(),
            params: params.iter().map(deupdatify_term).collect(),
        },
        Term::DataTypeConst {
            constructor,
            ty,
            params,
        } => Term::DataTypeConst {
            constructor: constructor.clone(),
            ty: ty.clone(),
            params: params.iter().map(deupdatify_term).collect(),
        },
        Term::Case(case) => {
            let mut case = case.clone();
            case.scrutinee = Box::new(deupdatify_term(&case.scrutinee));
            for branch in &mut case.branches {
                branch.body = deupdatify_term(&branch.body);
            }
            Term::Case(case)
        }
        Term::Ite {
            cond,
            then_branch,
            else_branch,
        } => Term::Ite {
            cond: Box::new(deupdatify_formula(cond)),
            then_branch: Box::new(deupdatify_term(then_branch)),
            else_branch: Box::new(deupdatify_term(else_branch)),
        },
        Term::Implements { value, iface } => Term::Implements {
            value: Box::new(deupdatify_term(value)),
            iface: iface.clone(),
        },
    }
}

pub fn deupdatify_formula(formula: &Formula) -> Formula {
    match formula {
        Formula::UpdateOn { update, target } => {
            deupdatify_formula(&apply_to_formula(update, target))
        }
        Formula::True | Formula::False => formula.clone(),
        Formula::Not(inner) => Formula::not(deupdatify_formula(inner)),
        Formula::And(a, b) => Formula::and(deupdatify_formula(a), deupdatify_formula(b)),
        Formula::Or(a, b) => Formula::or(deupdatify_formula(a), deupdatify_formula(b)),
        Formula::Impl(a, b) => Formula::implies(deupdatify_formula(a), deupdatify_formula(b)),
        Formula::Eq(a, b) => Formula::eq(deupdatify_term(a), deupdatify_term(b)),
        Formula::Predicate { name, params } => Formula::Predicate {
            name: name.clone(),
            params: params.iter().map(deupdatify_term).collect(),
        },
        Formula::Is { constructor, term } => Formula::Is {
            constructor: constructor.clone(),
            term: Box::new(deupdatify_term(term)),
        },
        Formula::Implements { value, iface } => Formula::Implements {
            value: Box::new(deupdatify_term(value)),
            iface: iface.clone(),
        },
        Formula::Quantifier { kind, vars, body } => Formula::Quantifier {
            kind: *kind,
            vars: vars.clone(),
            body: Box::new(deupdatify_formula(body)),
        },
    }
}

/// Wholesale node replacement, recursing through every position including
/// binding scopes. Used for placeholder resolution where the keys are
/// unique fresh variables that cannot be captured.
pub fn replace_in_term(term: &Term, map: &TermMap) -> Term {
    if let Some(replacement) = map.get(term) {
        return replacement.clone();
    }
    match term {
        Term::Var(_) | Term::Field(_) => term.clone(),
        Term::Function { name, params } => Term::Function {
            name: name.clone(),
            params: params.iter().map(|p| replace_in_term(p, map)).collect(),
        },
        Term::DataTypeConst {
            constructor,
            ty,
            params,
        } => Term::DataTypeConst {
            constructor: constructor.clone(),
            ty: ty.clone(),
            params: params.iter().map(|p| replace_in_term(p, map)).collect(),
        },
        Term::Case(case) => {
            let mut case = case.clone();
            case.scrutinee = Box::new(replace_in_term(&case.scrutinee, map));
            for branch in &mut case.branches {
                branch.pattern = replace_in_term(&branch.pattern, map);
                branch.body = replace_in_term(&branch.body, map);
            }
            Term::Case(case)
        }
        Term::Ite {
            cond,
            then_branch,
            else_branch,
        } => Term::Ite {
            cond: Box::new(replace_in_formula(cond, map)),
            then_branch: Box::new(replace_in_term(then_branch, map)),
            else_branch: Box::new(replace_in_term(else_branch, map)),
        },
        Term::Implements { value, iface } => Term::Implements {
            value: Box::new(replace_in_term(value, map)),
            iface: iface.clone(),
        },
        Term::UpdateOn { update, target } => Term::UpdateOn {
            update: update.clone(),
            target: Box::new(replace_in_term(target, map)),
        },
    }
}

pub fn replace_in_formula(formula: &Formula, map: &TermMap) -> Formula {
    match formula {
        Formula::True | Formula::False => formula.clone(),
        Formula::Not(inner) => Formula::not(replace_in_formula(inner, map)),
        Formula::And(a, b) => Formula::and(replace_in_formula(a, map), replace_in_formula(b, map)),
        Formula::Or(a, b) => Formula::or(replace_in_formula(a, map), replace_in_formula(b, map)),
        Formula::Impl(a, b) => {
            Formula::implies(replace_in_formula(a, map), replace_in_formula(b, map))
        }
        Formula::Eq(a, b) => Formula::eq(replace_in_term(a, map), replace_in_term(b, map)),
        Formula::Predicate { name, params } => Formula::Predicate {
            name: name.clone(),
            params: params.iter().map(|p| replace_in_term(p, map)).collect(),
        },
        Formula::Is { constructor, term } => Formula::Is {
            constructor: constructor.clone(),
            term: Box::new(replace_in_term(term, map)),
        },
        Formula::Implements { value, iface } => Formula::Implements {
            value: Box::new(replace_in_term(value, map)),
            iface: iface.clone(),
        },
        Formula::Quantifier { kind, vars, body } => Formula::Quantifier {
            kind: *kind,
            vars: vars.clone(),
            body: Box::new(replace_in_formula(body, map)),
        },
        Formula::UpdateOn { update, target } => Formula::UpdateOn {
            update: update.clone(),
            target: Box::new(replace_in_formula(target, map)),
        },
    }
}

/// Swaps whole subformulas, used to rewrite predicates inside an obligation.
pub fn replace_formula(formula: &Formula, old: &Formula, new: &Formula) -> Formula {
    if formula == old {
        return new.clone();
    }
    match formula {
        Formula::Not(inner) => Formula::not(replace_formula(inner, old, new)),
        Formula::And(a, b) => Formula::and(
            replace_formula(a, old, new),
            replace_formula(b, old, new),
        ),
        Formula::Or(a, b) => Formula::or(
            replace_formula(a, old, new),
            replace_formula(b, old, new),
        ),
        Formula::Impl(a, b) => Formula::implies(
            replace_formula(a, old, new),
            replace_formula(b, old, new),
        ),
        Formula::Quantifier { kind, vars, body } => Formula::Quantifier {
            kind: *kind,
            vars: vars.clone(),
            body: Box::new(replace_formula(body, old, new)),
        },
        Formula::UpdateOn { update, target } => Formula::UpdateOn {
            update: update.clone(),
            target: Box::new(replace_formula(target, old, new)),
        },
        _ => formula.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::AbsType;

    fn var(name: &str) -> ProgVar {
        ProgVar::new(name, AbsType::Int)
    }

    fn update_on(update: UpdateElement, target: Formula) -> Formula {
        Formula::UpdateOn {
            update: Box::new(update),
            target: Box::new(target),
        }
    }

    #[test]
    fn chain_shadowing_blocks_later_part() {
        // Substituting x->a through {y:=x}{x:=c}{z:=x} must stop at x:=c.
        let chain = UpdateElement::chain(
            UpdateElement::elementary(var("y"), Term::Var(var("x"))),
            UpdateElement::chain(
                UpdateElement::elementary(var("x"), Term::func("c")),
                UpdateElement::elementary(var("z"), Term::Var(var("x"))),
            ),
        );
        let out = subst_update(&chain, &single(&var("x"), &Term::func("a")));
        assert_eq!(out.pretty(), "y := a}{x := c}{z := x");
    }

    #[test]
    fn update_shadowing_blocks_target() {
        // {x:=1}(x = x) substituted with x->a leaves the target alone.
        let f = update_on(
            UpdateElement::elementary(var("x"), Term::int(1)),
            Formula::eq(Term::Var(var("x")), Term::Var(var("x"))),
        );
        let out = subst_formula(&f, &single(&var("x"), &Term::func("a")));
        assert_eq!(out.pretty(), "{x := 1}(x = x)");
    }

    #[test]
    fn apply_resolves_right_before_left() {
        // apply({x:=a}{y:=x}, y) = a
        let chain = UpdateElement::chain(
            UpdateElement::elementary(var("x"), Term::func("a")),
            UpdateElement::elementary(var("y"), Term::Var(var("x"))),
        );
        let out = apply_to_term(&chain, &Term::Var(var("y")));
        assert_eq!(out, Term::func("a"));
    }

    #[test]
    fn deupdatify_leaves_no_updates_and_is_idempotent() {
        let f = Formula::and(
            update_on(
                UpdateElement::chain(
                    UpdateElement::elementary(var("x"), Term::int(1)),
                    UpdateElement::elementary(var("y"), Term::Var(var("x"))),
                ),
                Formula::eq(Term::Var(var("y")), Term::int(1)),
            ),
            Formula::eq(
                Term::UpdateOn {
                    update: Box::new(UpdateElement::elementary(var("z"), Term::int(2))),
                    target: Box::new(Term::Var(var("z"))),
                },
                Term::int(2),
            ),
        );
        let out = deupdatify_formula(&f);
        assert!(!out.has_updates());
        assert_eq!(deupdatify_formula(&out), out);
        assert_eq!(out.pretty(), "((1 = 1) /\\ (2 = 2))");
    }

    #[test]
    fn replace_recurses_into_case_branches() {
        use crate::data::terms::{BranchTerm, CaseTerm};
        use std::collections::BTreeSet;

        let ph = ProgVar {
            name: "_ph0".to_string(),
            ty: AbsType::Int,
            kind: crate::data::terms::VarKind::Placeholder,
        };
        let case = Term::Case(CaseTerm {
            scrutinee: Box::new(Term::Var(var("l"))),
            expected_sort: "ABS.StdLib.Int".to_string(),
            branches: vec![BranchTerm::new(
                Term::Var(ph.clone()),
                Term::Var(ph.clone()),
            )],
            free_vars: BTreeSet::new(),
            expected_ty: AbsType::Int,
        });
        let map = single(&ph, &Term::func("head"));
        let out = replace_in_term(&case, &map);
        match out {
            Term::Case(c) => {
                assert_eq!(c.branches[0].body, Term::func("head"));
            }
            other => panic!("BUG: not a case: {other:?}"),
        }
    }
}
