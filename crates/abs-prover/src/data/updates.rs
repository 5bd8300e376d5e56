// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Explicit substitution updates.
//!
//! An update records pending assignments of a symbolic execution, applied
//! lazily to terms and formulas. A `Chain` composes sequentially: the left
//! update happens first, the right update reads the state the left one
//! produced.

use std::collections::BTreeMap;

use crate::data::terms::{ProgVar, Term};
use crate::subst;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpdateElement {
    Empty,
    Elementary { lhs: ProgVar, rhs: Term },
    Chain(Box<UpdateElement>, Box<UpdateElement>),
}

impl UpdateElement {
    pub fn elementary(lhs: ProgVar, rhs: Term) -> UpdateElement {
        UpdateElement::Elementary { lhs, rhs }
    }

    pub fn chain(left: UpdateElement, right: UpdateElement) -> UpdateElement {
        UpdateElement::Chain(Box::new(left), Box::new(right))
    }

    /// Whether this update writes `v` anywhere.
    pub fn assigns(&self, v: &ProgVar) -> bool {
        match self {
            UpdateElement::Empty => false,
            UpdateElement::Elementary { lhs, .. } => lhs == v,
            UpdateElement::Chain(left, right) => left.assigns(v) || right.assigns(v),
        }
    }

    /// Visits every term in right-hand sides, outside-in.
    pub fn for_each_term(&self, f: &mut impl FnMut(&Term)) {
        match self {
            UpdateElement::Empty => {}
            UpdateElement::Elementary { rhs, .. } => rhs.for_each_node(f),
            UpdateElement::Chain(left, right) => {
                left.for_each_term(f);
                right.for_each_term(f);
            }
        }
    }

    pub fn pretty(&self) -> String {
        match self {
            UpdateElement::Empty => "empty".to_string(),
            UpdateElement::Elementary { lhs, rhs } => {
                format!("{} := {}", lhs.name, rhs.pretty())
            }
            UpdateElement::Chain(left, right) => {
                format!("{}}}{{{}", left.pretty(), right.pretty())
            }
        }
    }
}

/// Re-associates a chain tree into a right-linked list: no `Chain` as the
/// left child of a `Chain`, no `Empty` links. The tree shape carries no
/// semantics, only the left-to-right order of elementary updates.
pub fn normalize_update(update: UpdateElement) -> UpdateElement {
    match update {
        UpdateElement::Chain(left, right) => match *left {
            UpdateElement::Chain(ll, lr) => {
                normalize_update(UpdateElement::Chain(ll, Box::new(UpdateElement::Chain(lr, right))))
            }
            UpdateElement::Empty => normalize_update(*right),
            elem => match normalize_update(*right) {
                UpdateElement::Empty => elem,
                rest => UpdateElement::chain(elem, rest),
            },
        },
        other => other,
    }
}

// Dead-write elimination on a normalized chain. The head write is folded
// forward into the tail by substitution (reads of the head's variable before
// any rebinding see its right-hand side), then dropped if the tail
// reassigns the same variable.
fn remove_duplicates(update: UpdateElement) -> UpdateElement {
    match update {
        UpdateElement::Chain(left, right) => match *left {
            UpdateElement::Elementary { lhs, rhs } => {
                let map = BTreeMap::from([(Term::Var(lhs.clone()), rhs.clone())]);
                let rest = subst::subst_update(&right, &map);
                if right.assigns(&lhs) {
                    remove_duplicates(rest)
                } else {
                    UpdateElement::chain(
                        UpdateElement::Elementary { lhs, rhs },
                        remove_duplicates(rest),
                    )
                }
            }
            other => UpdateElement::chain(other, remove_duplicates(*right)),
        },
        other => other,
    }
}

/// Normalization followed by dead-write elimination. Idempotent, and
/// equivalent to the input under `apply`.
pub fn simplify_update(update: UpdateElement) -> UpdateElement {
    remove_duplicates(normalize_update(update))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::AbsType;

    fn var(name: &str) -> ProgVar {
        ProgVar::new(name, AbsType::Int)
    }

    fn assign(lhs: &str, rhs: Term) -> UpdateElement {
        UpdateElement::elementary(var(lhs), rhs)
    }

    #[test]
    fn normalize_produces_right_linked_list() {
        let u = UpdateElement::chain(
            UpdateElement::chain(assign("x", Term::func("a")), assign("y", Term::func("b"))),
            assign("z", Term::func("c")),
        );
        let n = normalize_update(u);
        match &n {
            UpdateElement::Chain(left, _) => {
                assert!(matches!(**left, UpdateElement::Elementary { .. }))
            }
            other => panic!("BUG: not a chain: {other:?}"),
        }
        assert_eq!(n.pretty(), "x := a}{y := b}{z := c");
    }

    #[test]
    fn normalize_drops_empty_links() {
        let u = UpdateElement::chain(
            UpdateElement::Empty,
            UpdateElement::chain(assign("x", Term::func("a")), UpdateElement::Empty),
        );
        assert_eq!(normalize_update(u), assign("x", Term::func("a")));
    }

    #[test]
    fn simplify_preserves_read_before_overwrite() {
        // {x:=a}{y:=x}{x:=c} -> {y:=a}{x:=c}
        let u = UpdateElement::chain(
            UpdateElement::chain(
                assign("x", Term::func("a")),
                assign("y", Term::Var(var("x"))),
            ),
            assign("x", Term::func("c")),
        );
        let s = simplify_update(u);
        assert_eq!(s.pretty(), "y := a}{x := c");
    }

    #[test]
    fn simplify_threads_surviving_write_through_reads() {
        // {x:=a}{x:=b}{y:=x} -> {x:=b}{y:=b}
        let u = UpdateElement::chain(
            UpdateElement::chain(assign("x", Term::func("a")), assign("x", Term::func("b"))),
            assign("y", Term::Var(var("x"))),
        );
        let s = simplify_update(u);
        assert_eq!(s.pretty(), "x := b}{y := b");
    }

    #[test]
    fn simplify_is_idempotent() {
        let chains = vec![
            UpdateElement::chain(
                UpdateElement::chain(
                    assign("x", Term::func("a")),
                    assign("y", Term::Var(var("x"))),
                ),
                assign("x", Term::func("c")),
            ),
            UpdateElement::chain(
                UpdateElement::chain(assign("x", Term::func("a")), assign("x", Term::func("b"))),
                assign("y", Term::Var(var("x"))),
            ),
            UpdateElement::chain(
                UpdateElement::chain(
                    assign("x", Term::func("a")),
                    assign("x", Term::func_with("f", vec![Term::Var(var("x"))])),
                ),
                assign("y", Term::Var(var("x"))),
            ),
        ];
        for u in chains {
            let once = simplify_update(u);
            assert_eq!(simplify_update(once.clone()), once);
        }
    }
}
