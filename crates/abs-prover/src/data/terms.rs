// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! First-order terms of the proof-obligation logic.

use std::collections::BTreeSet;

use crate::data::formulas::Formula;
use crate::data::types::AbsType;
use crate::data::updates::UpdateElement;
use crate::error::{ProverError, Result};

/// Binary operators rendered infix by `pretty`.
pub const BINARIES: &[&str] = &[
    ">=", "<=", "<", ">", "=", "!=", "+", "-", "*", "/", "%", "&&", "||",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarKind {
    Plain,
    /// The distinguished `result` variable of a method contract.
    Return,
    /// Stands for a value bound by a pattern; resolved to a selector chain
    /// during pattern compilation.
    Placeholder,
    /// An unconstrained fresh value.
    WildCard,
}

/// A program (or logical) variable together with its declared type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgVar {
    pub name: String,
    pub ty: AbsType,
    pub kind: VarKind,
}

impl ProgVar {
    pub fn new(name: impl Into<String>, ty: AbsType) -> Self {
        ProgVar {
            name: name.into(),
            ty,
            kind: VarKind::Plain,
        }
    }

    pub fn ret(ty: AbsType) -> Self {
        ProgVar {
            name: "result".to_string(),
            ty,
            kind: VarKind::Return,
        }
    }

    pub fn heap() -> Self {
        ProgVar::new("heap", AbsType::Heap)
    }

    pub fn old_heap() -> Self {
        ProgVar::new("old", AbsType::Heap)
    }

    pub fn last_heap() -> Self {
        ProgVar::new("last", AbsType::Heap)
    }

    pub fn is_special_heap(&self) -> bool {
        matches!(self.ty, AbsType::Heap)
    }
}

/// A field of the single implicit object under verification. Field names
/// carry the `_f` suffix to keep them apart from locals.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Field {
    pub name: String,
    pub ty: AbsType,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: AbsType) -> Self {
        Field {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Var(ProgVar),
    Field(Field),
    /// Uninterpreted or built-in function application. Literals are
    /// zero-parameter functions whose name is the literal.
    Function { name: String, params: Vec<Term> },
    /// Saturated data-constructor application at a specific type.
    DataTypeConst {
        constructor: String,
        ty: AbsType,
        params: Vec<Term>,
    },
    Case(CaseTerm),
    Ite {
        cond: Box<Formula>,
        then_branch: Box<Term>,
        else_branch: Box<Term>,
    },
    /// Term-level membership test against an interface type.
    Implements { value: Box<Term>, iface: AbsType },
    /// An update applied to a term; eliminated by `deupdatify`.
    UpdateOn {
        update: Box<UpdateElement>,
        target: Box<Term>,
    },
}

/// One arm of a case term: a pattern paired with its result.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchTerm {
    pub pattern: Term,
    pub body: Term,
}

impl BranchTerm {
    pub fn new(pattern: Term, body: Term) -> Self {
        BranchTerm { pattern, body }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaseTerm {
    pub scrutinee: Box<Term>,
    /// Solver sort the compiled term must have.
    pub expected_sort: String,
    pub branches: Vec<BranchTerm>,
    /// Names free in the enclosing obligation; pattern variables with these
    /// names test for equality instead of binding.
    pub free_vars: BTreeSet<String>,
    pub expected_ty: AbsType,
}

impl Term {
    pub fn func(name: impl Into<String>) -> Term {
        Term::Function {
            name: name.into(),
            params: vec![],
        }
    }

    pub fn func_with(name: impl Into<String>, params: Vec<Term>) -> Term {
        Term::Function {
            name: name.into(),
            params,
        }
    }

    pub fn int(n: i64) -> Term {
        Term::func(n.to_string())
    }

    /// Checked data-constructor application. `Cons` requires at least two
    /// parameters (head and tail).
    pub fn data_const(
        constructor: impl Into<String>,
        ty: AbsType,
        params: Vec<Term>,
    ) -> Result<Term> {
        let constructor = constructor.into();
        if constructor.ends_with("Cons") && params.len() < 2 {
            return Err(ProverError::TooFewConstructorParams {
                constructor,
                required: 2,
                actual: params.len(),
            });
        }
        Ok(Term::DataTypeConst {
            constructor,
            ty,
            params,
        })
    }

    /// Heap read of `field` on the current heap.
    pub fn select(field: Field) -> Term {
        Term::select_on(Term::Var(ProgVar::heap()), field)
    }

    pub fn select_on(heap: Term, field: Field) -> Term {
        Term::func_with("select", vec![heap, Term::Field(field)])
    }

    /// Heap write, `store(heap, field, value)`.
    pub fn store(heap: Term, field: Field, value: Term) -> Term {
        Term::func_with("store", vec![heap, Term::Field(field), value])
    }

    /// Havoc of the heap at a release point.
    pub fn anon(heap: Term) -> Term {
        Term::func_with("anon", vec![heap])
    }

    /// The resolved value of a future.
    pub fn value_of(fut: Term) -> Term {
        Term::func_with("valueOf", vec![fut])
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Term::Var(v) if v.kind == VarKind::Placeholder)
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Term::Var(v) if v.kind == VarKind::WildCard)
    }

    /// Visits this term and every subterm, formulas and updates included.
    pub fn for_each_node(&self, f: &mut impl FnMut(&Term)) {
        f(self);
        match self {
            Term::Var(_) | Term::Field(_) => {}
            Term::Function { params, .. } | Term::DataTypeConst { params, .. } => {
                for p in params {
                    p.for_each_node(f);
                }
            }
            Term::Case(case) => {
                case.scrutinee.for_each_node(f);
                for branch in &case.branches {
                    branch.pattern.for_each_node(f);
                    branch.body.for_each_node(f);
                }
            }
            Term::Ite {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.for_each_term(f);
                then_branch.for_each_node(f);
                else_branch.for_each_node(f);
            }
            Term::Implements { value, .. } => value.for_each_node(f),
            Term::UpdateOn { update, target } => {
                update.for_each_term(f);
                target.for_each_node(f);
            }
        }
    }

    /// Collects every subterm matching `pred`, outside-in.
    pub fn collect_terms(&self, pred: impl Fn(&Term) -> bool) -> Vec<Term> {
        let mut out = Vec::new();
        self.for_each_node(&mut |t| {
            if pred(t) {
                out.push(t.clone());
            }
        });
        out
    }

    pub fn pretty(&self) -> String {
        match self {
            Term::Var(v) => v.name.clone(),
            Term::Field(f) => f.name.clone(),
            Term::Function { name, params } => pretty_fn(name, params),
            Term::DataTypeConst {
                constructor,
                params,
                ..
            } => pretty_fn(constructor, params),
            Term::Case(case) => {
                let arms = case
                    .branches
                    .iter()
                    .map(|b| format!("{} => {}", b.pattern.pretty(), b.body.pretty()))
                    .collect::<Vec<_>>()
                    .join(" | ");
                format!("case {} {{ {} }}", case.scrutinee.pretty(), arms)
            }
            Term::Ite {
                cond,
                then_branch,
                else_branch,
            } => format!(
                "if {} then {} else {}",
                cond.pretty(),
                then_branch.pretty(),
                else_branch.pretty()
            ),
            Term::Implements { value, iface } => {
                format!("{} implements {}", value.pretty(), iface)
            }
            Term::UpdateOn { update, target } => {
                format!("{{{}}}{}", update.pretty(), target.pretty())
            }
        }
    }
}

pub(crate) fn pretty_fn(name: &str, params: &[Term]) -> String {
    if params.len() == 2 && BINARIES.contains(&name) {
        format!("({} {} {})", params[0].pretty(), name, params[1].pretty())
    } else if params.is_empty() {
        name.to_string()
    } else {
        format!(
            "{}({})",
            name,
            params
                .iter()
                .map(Term::pretty)
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
