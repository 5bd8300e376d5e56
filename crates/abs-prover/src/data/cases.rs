// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Structural helpers over constructor patterns.
//!
//! A constructor pattern `C(p0, .., pn)` decomposes a scrutinee through the
//! selector functions `C_0 .. C_n`. The helpers here compute selector paths
//! (parent-first name lists) for placeholders and concrete subterms, and the
//! discriminator/equality formula a pattern contributes to its branch guard.

use std::collections::{BTreeMap, BTreeSet};

use crate::data::formulas::Formula;
use crate::data::terms::{ProgVar, Term};
use crate::data::types::{generic_constructor_name, AbsType};

/// Selector-name base of a pattern constructor: mangled for concrete
/// generic instantiations so selectors never collide across instantiations.
pub fn selector_base(constructor: &str, ty: &AbsType) -> String {
    generic_constructor_name(constructor, ty)
}

/// Applies a parent-first selector path to a base term:
/// `["C_1", "D_0"]` over `s` yields `D_0(C_1(s))`.
pub fn selector_chain(base: &Term, path: &[String]) -> Term {
    path.iter().fold(base.clone(), |acc, name| {
        Term::func_with(name.clone(), vec![acc])
    })
}

/// Selector paths of every placeholder bound by the pattern, parent-first.
pub fn placeholder_paths(
    constructor: &str,
    ty: &AbsType,
    params: &[Term],
) -> BTreeMap<ProgVar, Vec<String>> {
    let base = selector_base(constructor, ty);
    let mut out = BTreeMap::new();
    for (i, param) in params.iter().enumerate() {
        let selector = format!("{base}_{i}");
        match param {
            Term::Var(v) if param.is_placeholder() => {
                out.insert(v.clone(), vec![selector]);
            }
            Term::DataTypeConst {
                constructor: inner_ctor,
                ty: inner_ty,
                params: inner_params,
            } => {
                for (ph, mut path) in placeholder_paths(inner_ctor, inner_ty, inner_params) {
                    path.insert(0, selector.clone());
                    out.insert(ph, path);
                }
            }
            _ => {}
        }
    }
    out
}

/// Selector paths of every non-placeholder parameter, parent-first. These
/// parameters constrain the match instead of binding a name.
pub fn concrete_param_paths(
    constructor: &str,
    ty: &AbsType,
    params: &[Term],
) -> BTreeMap<Term, Vec<String>> {
    let base = selector_base(constructor, ty);
    let mut out = BTreeMap::new();
    for (i, param) in params.iter().enumerate() {
        let selector = format!("{base}_{i}");
        match param {
            Term::DataTypeConst {
                constructor: inner_ctor,
                ty: inner_ty,
                params: inner_params,
            } => {
                for (term, mut path) in concrete_param_paths(inner_ctor, inner_ty, inner_params) {
                    path.insert(0, selector.clone());
                    out.insert(term, path);
                }
            }
            _ if !param.is_placeholder() => {
                out.insert(param.clone(), vec![selector]);
            }
            _ => {}
        }
    }
    out
}

/// Selector path from the pattern root to `elem`, or empty when `elem` does
/// not occur in the pattern.
pub fn selector_path_for(
    constructor: &str,
    ty: &AbsType,
    params: &[Term],
    elem: &Term,
) -> Vec<String> {
    let base = selector_base(constructor, ty);
    if let Some(index) = params.iter().position(|p| p == elem) {
        return vec![format!("{base}_{index}")];
    }
    for (i, param) in params.iter().enumerate() {
        if let Term::DataTypeConst {
            constructor: inner_ctor,
            ty: inner_ty,
            params: inner_params,
        } = param
        {
            let inner = selector_path_for(inner_ctor, inner_ty, inner_params, elem);
            if !inner.is_empty() {
                let mut path = vec![format!("{base}_{i}")];
                path.extend(inner);
                return path;
            }
        }
    }
    vec![]
}

/// The formula a constructor pattern contributes to its branch guard: a
/// discriminator test on the scrutinee (plain equality for boolean
/// constructors), conjoined with recursive tests on nested constructor
/// parameters and equality tests on free-variable parameters.
pub fn extract_pattern_matching(
    scrutinee: &Term,
    constructor: &str,
    ty: &AbsType,
    params: &[Term],
    free_vars: &BTreeSet<String>,
) -> Formula {
    let base = selector_base(constructor, ty);
    let head = if ty.is_bool() {
        Formula::eq(
            scrutinee.clone(),
            Term::DataTypeConst {
                constructor: constructor.to_string(),
                ty: ty.clone(),
                params: params.to_vec(),
            },
        )
    } else {
        Formula::is(base.clone(), scrutinee.clone())
    };
    params.iter().enumerate().fold(head, |acc, (i, param)| {
        let selector = Term::func_with(format!("{base}_{i}"), vec![scrutinee.clone()]);
        let test = match param {
            Term::DataTypeConst {
                constructor: inner_ctor,
                ty: inner_ty,
                params: inner_params,
            } => extract_pattern_matching(&selector, inner_ctor, inner_ty, inner_params, free_vars),
            Term::Var(v) if free_vars.contains(&v.name) => {
                Formula::eq(selector, param.clone())
            }
            _ => Formula::True,
        };
        Formula::and(acc, test)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::terms::VarKind;

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

    // Cons(ph_x, Cons(ph_y, Nil)) at List<Int>
    fn nested_cons() -> (String, AbsType, Vec<Term>) {
        let nil = Term::DataTypeConst {
            constructor: "ABS.StdLib.Nil".into(),
            ty: list_int(),
            params: vec![],
        };
        let inner = Term::DataTypeConst {
            constructor: "ABS.StdLib.Cons".into(),
            ty: list_int(),
            params: vec![Term::Var(placeholder("_ph1")), nil],
        };
        (
            "ABS.StdLib.Cons".into(),
            list_int(),
            vec![Term::Var(placeholder("_ph0")), inner],
        )
    }

    #[test]
    fn placeholder_paths_are_parent_first() {
        let (ctor, ty, params) = nested_cons();
        let paths = placeholder_paths(&ctor, &ty, &params);
        let base = selector_base(&ctor, &ty);
        assert_eq!(paths[&placeholder("_ph0")], vec![format!("{base}_0")]);
        assert_eq!(
            paths[&placeholder("_ph1")],
            vec![format!("{base}_1"), format!("{base}_0")]
        );
    }

    #[test]
    fn selector_chain_applies_parent_innermost() {
        let scrutinee = Term::func("l");
        let chained = selector_chain(&scrutinee, &["C_1".to_string(), "D_0".to_string()]);
        assert_eq!(chained.pretty(), "D_0(C_1(l))");
    }

    #[test]
    fn selector_path_finds_nested_element() {
        let (ctor, ty, params) = nested_cons();
        let base = selector_base(&ctor, &ty);
        let path = selector_path_for(&ctor, &ty, &params, &Term::Var(placeholder("_ph1")));
        assert_eq!(path, vec![format!("{base}_1"), format!("{base}_0")]);
        assert!(selector_path_for(&ctor, &ty, &params, &Term::func("absent")).is_empty());
    }

    #[test]
    fn extraction_emits_discriminators_and_selector_indices() {
        let (ctor, ty, params) = nested_cons();
        let f = extract_pattern_matching(
            &Term::func("l"),
            &ctor,
            &ty,
            &params,
            &BTreeSet::new(),
        );
        let rendered = f.pretty();
        let base = selector_base(&ctor, &ty);
        assert!(rendered.contains(&format!("is({base}, l)")));
        // Nested discriminator applies to the tail selector, index 1.
        assert!(rendered.contains(&format!("is({base}, {base}_1(l))")));
    }

    #[test]
    fn boolean_patterns_test_by_equality() {
        let f = extract_pattern_matching(
            &Term::func("b"),
            "ABS.StdLib.True",
            &AbsType::Bool,
            &[],
            &BTreeSet::new(),
        );
        assert!(matches!(f, Formula::Eq(..)));
    }
}
