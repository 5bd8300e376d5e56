// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Formulas of the proof-obligation logic.

use crate::data::terms::{pretty_fn, ProgVar, Term};
use crate::data::types::AbsType;
use crate::data::updates::UpdateElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QuantifierKind {
    Forall,
    Exists,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Formula {
    True,
    False,
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Impl(Box<Formula>, Box<Formula>),
    Eq(Box<Term>, Box<Term>),
    /// Uninterpreted or built-in predicate over terms. `=` as a predicate
    /// name triggers generic binding of its two sides before rendering.
    Predicate { name: String, params: Vec<Term> },
    /// Constructor discriminator test, `(_ is C) t`.
    Is { constructor: String, term: Box<Term> },
    Implements { value: Box<Term>, iface: AbsType },
    Quantifier {
        kind: QuantifierKind,
        vars: Vec<ProgVar>,
        body: Box<Formula>,
    },
    /// An update applied to a formula; eliminated by `deupdatify`.
    UpdateOn {
        update: Box<UpdateElement>,
        target: Box<Formula>,
    },
}

impl Formula {
    pub fn not(f: Formula) -> Formula {
        Formula::Not(Box::new(f))
    }

    pub fn and(a: Formula, b: Formula) -> Formula {
        Formula::And(Box::new(a), Box::new(b))
    }

    pub fn or(a: Formula, b: Formula) -> Formula {
        Formula::Or(Box::new(a), Box::new(b))
    }

    pub fn implies(a: Formula, b: Formula) -> Formula {
        Formula::Impl(Box::new(a), Box::new(b))
    }

    pub fn eq(a: Term, b: Term) -> Formula {
        Formula::Eq(Box::new(a), Box::new(b))
    }

    pub fn predicate(name: impl Into<String>, params: Vec<Term>) -> Formula {
        Formula::Predicate {
            name: name.into(),
            params,
        }
    }

    pub fn is(constructor: impl Into<String>, term: Term) -> Formula {
        Formula::Is {
            constructor: constructor.into(),
            term: Box::new(term),
        }
    }

    /// Visits every term occurring in the formula, outside-in, recursing
    /// into subterms.
    pub fn for_each_term(&self, f: &mut impl FnMut(&Term)) {
        match self {
            Formula::True | Formula::False => {}
            Formula::Not(inner) => inner.for_each_term(f),
            Formula::And(a, b) | Formula::Or(a, b) | Formula::Impl(a, b) => {
                a.for_each_term(f);
                b.for_each_term(f);
            }
            Formula::Eq(a, b) => {
                a.for_each_node(f);
                b.for_each_node(f);
            }
            Formula::Predicate { params, .. } => {
                for p in params {
                    p.for_each_node(f);
                }
            }
            Formula::Is { term, .. } => term.for_each_node(f),
            Formula::Implements { value, .. } => value.for_each_node(f),
            Formula::Quantifier { body, .. } => body.for_each_term(f),
            Formula::UpdateOn { update, target } => {
                update.for_each_term(f);
                target.for_each_term(f);
            }
        }
    }

    /// Collects every term in the formula matching `pred`.
    pub fn collect_terms(&self, pred: impl Fn(&Term) -> bool) -> Vec<Term> {
        let mut out = Vec::new();
        self.for_each_term(&mut |t| {
            if pred(t) {
                out.push(t.clone());
            }
        });
        out
    }

    /// Whether any `UpdateOn` node remains, in the formula or inside its
    /// terms.
    pub fn has_updates(&self) -> bool {
        fn go(f: &Formula) -> bool {
            match f {
                Formula::UpdateOn { .. } => true,
                Formula::True | Formula::False => false,
                Formula::Not(inner) => go(inner),
                Formula::And(a, b) | Formula::Or(a, b) | Formula::Impl(a, b) => go(a) || go(b),
                Formula::Quantifier { body, .. } => go(body),
                Formula::Eq(..)
                | Formula::Predicate { .. }
                | Formula::Is { .. }
                | Formula::Implements { .. } => {
                    let mut found = false;
                    f.for_each_term(&mut |t| match t {
                        Term::UpdateOn { .. } => found = true,
                        Term::Ite { cond, .. } => found |= go(cond),
                        _ => {}
                    });
                    found
                }
            }
        }
        go(self)
    }

    pub fn pretty(&self) -> String {
        match self {
            Formula::True => "true".to_string(),
            Formula::False => "false".to_string(),
            Formula::Not(inner) => format!("!{}", inner.pretty()),
            // Neutral elements are noise in the common fold results.
            Formula::And(a, b) => match (a.as_ref(), b.as_ref()) {
                (Formula::True, other) | (other, Formula::True) => other.pretty(),
                _ => format!("({} /\\ {})", a.pretty(), b.pretty()),
            },
            Formula::Or(a, b) => match (a.as_ref(), b.as_ref()) {
                (Formula::False, other) | (other, Formula::False) => other.pretty(),
                _ => format!("({} \\/ {})", a.pretty(), b.pretty()),
            },
            Formula::Impl(a, b) => format!("({} -> {})", a.pretty(), b.pretty()),
            Formula::Eq(a, b) => format!("({} = {})", a.pretty(), b.pretty()),
            Formula::Predicate { name, params } => pretty_fn(name, params),
            Formula::Is { constructor, term } => {
                format!("is({}, {})", constructor, term.pretty())
            }
            Formula::Implements { value, iface } => {
                format!("{} implements {}", value.pretty(), iface)
            }
            Formula::Quantifier { kind, vars, body } => {
                let kw = match kind {
                    QuantifierKind::Forall => "forall",
                    QuantifierKind::Exists => "exists",
                };
                let vars = vars
                    .iter()
                    .map(|v| format!("{}:{}", v.name, v.ty))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({} {}. {})", kw, vars, body.pretty())
            }
            Formula::UpdateOn { update, target } => {
                format!("{{{}}}{}", update.pretty(), target.pretty())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_drops_neutral_conjuncts() {
        let f = Formula::and(
            Formula::True,
            Formula::eq(Term::func("x"), Term::int(1)),
        );
        assert_eq!(f.pretty(), "(x = 1)");
    }

    #[test]
    fn collect_reaches_predicate_params() {
        let f = Formula::implies(
            Formula::predicate(">=", vec![Term::func("x"), Term::int(0)]),
            Formula::predicate("=", vec![Term::func("y"), Term::func("x")]),
        );
        let xs = f.collect_terms(|t| matches!(t, Term::Function { name, .. } if name == "x"));
        assert_eq!(xs.len(), 2);
    }
}
