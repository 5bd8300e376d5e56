// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Binding of partially instantiated generic terms against concrete types.
//!
//! Container literals (an empty list, a `Nil` inside a `Cons`) carry only
//! partially resolved types; the concrete element type must be inferred from
//! context, usually from the other side of an equality. `bound_terms` is
//! that reconciliation step; `bound_generic` pushes a concrete binding type
//! through a term, retyping constructors and variables.

use itertools::Itertools;

use crate::data::terms::{Field, ProgVar, Term, VarKind};
use crate::data::types::AbsType;
use crate::error::{ProverError, Result};

/// Container types represented as internally-recursive constructors: their
/// constructor parameters are typed `[element, container-itself]` rather
/// than by the declared argument list.
const RECURSIVE_CONTAINERS: &[&str] = &["List", "Set", "Map"];

/// A data constructor whose type mentions an unbound parameter.
pub fn is_unbound_generic(term: &Term) -> bool {
    matches!(term, Term::DataTypeConst { ty, .. } if ty.is_generic() && ty.has_unbound())
}

/// A data constructor whose type is not (fully) known.
pub fn is_not_well_known(term: &Term) -> bool {
    matches!(term, Term::DataTypeConst { ty, .. } if ty.has_unknown())
}

/// Re-derives the concrete type of a term. Typed leaves and constructors
/// answer directly; literals answer by shape; anything else is `Unknown`.
pub fn return_type(term: &Term) -> AbsType {
    match term {
        Term::Var(v) => v.ty.clone(),
        Term::Field(f) => f.ty.clone(),
        Term::DataTypeConst { ty, .. } => ty.clone(),
        Term::Case(case) => case.expected_ty.clone(),
        Term::Ite { then_branch, .. } => return_type(then_branch),
        Term::Implements { .. } => AbsType::Bool,
        Term::UpdateOn { target, .. } => return_type(target),
        Term::Function { name, params } => match name.as_str() {
            "true" | "false" | "&&" | "||" | "!" | "=" | "!=" | "<" | "<=" | ">" | ">=" => {
                AbsType::Bool
            }
            "+" | "-" | "*" | "/" | "%" => AbsType::Int,
            _ if params.is_empty() && is_int_literal(name) => AbsType::Int,
            _ => AbsType::Unknown,
        },
    }
}

// Integer literals are unbounded in the source language.
fn is_int_literal(name: &str) -> bool {
    name.parse::<num::BigInt>().is_ok()
}

/// Pushes `binding` through `unbound`, retyping every constructor and typed
/// leaf. Fails with `UnboundTypeMismatch` when the shapes disagree, except
/// against a bounded target, which accepts anything.
pub fn bound_generic(binding: &AbsType, unbound: &Term) -> Result<Term> {
    match unbound {
        Term::Function { .. } => Ok(unbound.clone()),
        Term::Var(v) => Ok(Term::Var(ProgVar {
            name: v.name.clone(),
            ty: binding.clone(),
            kind: v.kind,
        })),
        Term::Field(f) => Ok(Term::Field(Field::new(f.name.clone(), binding.clone()))),
        Term::DataTypeConst {
            constructor,
            ty,
            params,
        } => {
            let binding_has_args = binding.is_generic();
            let term_has_args = ty.is_generic();
            if binding_has_args != term_has_args
                || binding.type_args().len() != ty.type_args().len()
            {
                if matches!(binding, AbsType::Bounded(_)) {
                    if ty.has_unknown() {
                        return Ok(Term::DataTypeConst {
                            constructor: constructor.clone(),
                            ty: binding.clone(),
                            params: params.clone(),
                        });
                    }
                    return Ok(unbound.clone());
                }
                return Err(mismatch(unbound, binding));
            }
            if !binding_has_args {
                // Nothing to instantiate; just adopt the concrete type.
                return Ok(Term::DataTypeConst {
                    constructor: constructor.clone(),
                    ty: binding.clone(),
                    params: params.clone(),
                });
            }
            let param_types: Vec<AbsType> =
                if RECURSIVE_CONTAINERS.contains(&binding.simple_name().as_str()) {
                    vec![binding.type_args()[0].clone(), binding.clone()]
                } else {
                    if binding.type_args().len() < params.len() {
                        return Err(mismatch(unbound, binding));
                    }
                    binding.type_args().to_vec()
                };
            let bound_params: Vec<Term> = param_types
                .iter()
                .zip(params.iter())
                .map(|(t, p)| bound_generic(t, p))
                .try_collect()?;
            Ok(Term::DataTypeConst {
                constructor: constructor.clone(),
                ty: binding.clone(),
                params: bound_params,
            })
        }
        _ => Ok(unbound.clone()),
    }
}

/// Reconciles the two sides of an equality: the side with an unresolved
/// type is bound against the return type of the other. Wildcard terms
/// unify trivially with the opposite side. Both sides unresolved is a
/// binding failure.
pub fn bound_terms(term1: &Term, term2: &Term) -> Result<(Term, Term)> {
    let t1_unbound = is_unbound_generic(term1);
    let t2_unbound = is_unbound_generic(term2);
    let t1_unknown = is_not_well_known(term1);
    let t2_unknown = is_not_well_known(term2);

    if t1_unknown && t2_unknown {
        return Err(mismatch(term1, &return_type(term2)));
    }

    let mut bound1 = term1.clone();
    let mut bound2 = term2.clone();
    let t1_resolved = !t1_unbound && !t1_unknown;
    let t2_resolved = !t2_unbound && !t2_unknown;

    if !t1_resolved && !t2_unknown {
        bound1 = bound_generic(&return_type(term2), term1)?;
    } else if !t2_resolved {
        bound2 = bound_generic(&return_type(term1), term2)?;
    }

    if term1.is_wildcard() {
        bound1 = bound2.clone();
    } else if term2.is_wildcard() {
        bound2 = bound1.clone();
    }

    Ok((bound1, bound2))
}

fn mismatch(term: &Term, binding: &AbsType) -> ProverError {
    ProverError::UnboundTypeMismatch {
        term: term.pretty(),
        binding: binding.to_string(),
    }
}

/// Fresh wildcard program variable, used when a pattern binds nothing.
pub fn wildcard(name: impl Into<String>, ty: AbsType) -> ProgVar {
    ProgVar {
        name: name.into(),
        ty,
        kind: VarKind::WildCard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(elem: AbsType) -> AbsType {
        AbsType::data_with("ABS.StdLib.List", vec![elem])
    }

    fn unbound_list() -> AbsType {
        list_of(AbsType::Bounded("A".into()))
    }

    fn nil(ty: AbsType) -> Term {
        Term::DataTypeConst {
            constructor: "ABS.StdLib.Nil".into(),
            ty,
            params: vec![],
        }
    }

    #[test]
    fn binds_recursive_list_constructor() {
        // Cons(1, Nil) at List<Unbound> bound against List<Int>.
        let unbound = Term::DataTypeConst {
            constructor: "ABS.StdLib.Cons".into(),
            ty: unbound_list(),
            params: vec![Term::int(1), nil(unbound_list())],
        };
        let bound = bound_generic(&list_of(AbsType::Int), &unbound).unwrap();
        match &bound {
            Term::DataTypeConst { ty, params, .. } => {
                assert_eq!(*ty, list_of(AbsType::Int));
                assert_eq!(return_type(&params[1]), list_of(AbsType::Int));
            }
            other => panic!("BUG: not a constructor: {other:?}"),
        }
        // Round-trip: re-deriving the type yields the binding type.
        assert_eq!(return_type(&bound), list_of(AbsType::Int));
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let unbound = nil(unbound_list());
        let err = bound_generic(&AbsType::Int, &unbound).unwrap_err();
        assert!(matches!(err, ProverError::UnboundTypeMismatch { .. }));
    }

    #[test]
    fn bounded_target_accepts_anything() {
        let concrete = nil(list_of(AbsType::Int));
        let bound = bound_generic(&AbsType::Bounded("A".into()), &concrete).unwrap();
        assert_eq!(bound, concrete);
    }

    #[test]
    fn bound_terms_resolves_the_unbound_side() {
        let concrete = Term::Var(ProgVar::new("l", list_of(AbsType::Int)));
        let unbound = nil(unbound_list());
        let (b1, b2) = bound_terms(&unbound, &concrete).unwrap();
        assert_eq!(return_type(&b1), list_of(AbsType::Int));
        assert_eq!(b2, concrete);
    }

    #[test]
    fn bound_terms_rejects_two_unknown_sides() {
        let u1 = nil(list_of(AbsType::Unknown));
        let u2 = nil(list_of(AbsType::Unknown));
        assert!(bound_terms(&u1, &u2).is_err());
    }

    #[test]
    fn wildcards_unify_trivially() {
        let wc = Term::Var(wildcard("_w0", AbsType::Int));
        let concrete = Term::int(5);
        let (b1, b2) = bound_terms(&wc, &concrete).unwrap();
        assert_eq!(b1, concrete);
        assert_eq!(b2, concrete);
    }
}
