// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Translation of the typed source AST into the intermediate representation.
//!
//! The translator desugars on the way down: case expressions become branch
//! statements over a fresh variable, synchronous calls on other objects
//! become an asynchronous call followed by an awaiting read, and `return`
//! of a call is split into the call and a plain return of its result.

mod expression_translator;
mod statement_translator;

use std::collections::BTreeSet;

use once_cell::sync::Lazy;

pub use expression_translator::{
    translate_expression, translate_guard, translate_pattern, SubstMap, TypeBinding,
};
pub use statement_translator::{translate_statement, translate_top_level};

use crate::ast::{Annotation, SpecKind};
use crate::data::conversion::expr_to_form;
use crate::data::formulas::Formula;
use crate::data::types::AbsType;
use crate::error::Result;
use crate::session::Session;

/// Functions of the standard library with a solver-side axiomatization;
/// calls keep their simple name instead of being resolved to a definition.
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "abs",
    "head",
    "tail",
    "appendright",
    "concatenate",
    "length",
    "list",
    "nth",
    "without",
    "fst",
    "snd",
    "fstT",
    "sndT",
    "trdT",
    "contains",
    "emptyMap",
    "lookup",
    "map",
    "println",
    "toString",
];

static BUILTIN_LOOKUP: Lazy<BTreeSet<&'static str>> =
    Lazy::new(|| BUILTIN_FUNCTIONS.iter().copied().collect());

pub fn is_builtin_function(name: &str) -> bool {
    BUILTIN_LOOKUP.contains(name)
}

/// Names reserved for the specification language; programs cannot declare
/// or reference them.
pub const SPECIAL_KEYWORDS: &[&str] = &["old", "last", "match"];

/// Conjunction of all annotations of the given kind, translated to a
/// formula. `True` when none are present.
pub fn extract_spec(
    annotations: &[Annotation],
    kind: SpecKind,
    return_type: &AbsType,
    session: &mut Session,
) -> Result<Formula> {
    let mut spec = Formula::True;
    for ann in annotations.iter().filter(|a| a.kind == kind) {
        let (expr, _) = translate_expression(
            &ann.value,
            return_type,
            &SubstMap::new(),
            true,
            &TypeBinding::new(),
            session,
        )?;
        spec = Formula::and(spec, expr_to_form(&expr)?);
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Exp;

    #[test]
    fn no_matching_annotation_yields_true() {
        let mut session = Session::new();
        let spec = extract_spec(&[], SpecKind::Ensures, &AbsType::Int, &mut session).unwrap();
        assert_eq!(spec, Formula::True);
    }

    #[test]
    fn annotations_of_the_kind_are_conjoined() {
        let mut session = Session::new();
        let geq = |n: &str| Exp::Binary {
            op: ">=".into(),
            left: Box::new(Exp::VarUse {
                name: n.into(),
                ty: AbsType::Int,
            }),
            right: Box::new(Exp::IntLiteral("0".into())),
        };
        let anns = vec![
            Annotation {
                kind: SpecKind::Requires,
                value: geq("x"),
            },
            Annotation {
                kind: SpecKind::Ensures,
                value: geq("y"),
            },
            Annotation {
                kind: SpecKind::Requires,
                value: geq("z"),
            },
        ];
        let spec = extract_spec(&anns, SpecKind::Requires, &AbsType::Int, &mut session).unwrap();
        assert_eq!(spec.pretty(), "((x >= 0) /\\ (z >= 0))");
    }
}
