// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Intermediate expression language, the target of the translator and the
//! input of the symbolic-execution driver.

use std::collections::BTreeSet;

use crate::data::terms::{Field, ProgVar, VarKind};
use crate::data::types::AbsType;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
    Var(ProgVar),
    Field(Field),
    /// A literal: its name is the solver spelling (`"0"`, `"true"`, a
    /// quoted string, an object id).
    Const { name: String, ty: AbsType },
    /// Operator or function application by name.
    SExpr { op: String, args: Vec<Expr> },
    DataTypeExpr {
        constructor: String,
        ty: AbsType,
        args: Vec<Expr>,
    },
    CaseExpr {
        scrutinee: Box<Expr>,
        expected_sort: String,
        branches: Vec<BranchExpr>,
        free_vars: BTreeSet<String>,
        expected_ty: AbsType,
    },
    /// Asynchronous method call; evaluates to a future.
    CallExpr { method: String, args: Vec<Expr> },
    /// Synchronous method call on `this`.
    SyncCallExpr { method: String, args: Vec<Expr> },
    /// Read of a resolved future.
    Poll(Box<Expr>),
    Implements { value: Box<Expr>, iface: AbsType },
    /// Opaque claim-guard placeholder; keeps a back-reference to the
    /// guarded future variable for the driver.
    Claim { guarded: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchExpr {
    pub pattern: Expr,
    pub body: Expr,
}

/// Assignment target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Location {
    Var(ProgVar),
    Field(Field),
}

impl Location {
    pub fn ty(&self) -> &AbsType {
        match self {
            Location::Var(v) => &v.ty,
            Location::Field(f) => &f.ty,
        }
    }
}

impl Expr {
    pub fn sexpr(op: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::SExpr {
            op: op.into(),
            args,
        }
    }

    pub fn constant(name: impl Into<String>, ty: AbsType) -> Expr {
        Expr::Const {
            name: name.into(),
            ty,
        }
    }

    pub fn unit() -> Expr {
        Expr::constant("Unit", AbsType::Unit)
    }

    pub fn bool_true() -> Expr {
        Expr::constant("true", AbsType::Bool)
    }

    pub fn bool_false() -> Expr {
        Expr::constant("false", AbsType::Bool)
    }

    pub fn is_wildcard_var(&self) -> bool {
        matches!(self, Expr::Var(v) if v.kind == VarKind::WildCard)
    }

    pub fn pretty(&self) -> String {
        match self {
            Expr::Var(v) => v.name.clone(),
            Expr::Field(f) => f.name.clone(),
            Expr::Const { name, .. } => name.clone(),
            Expr::SExpr { op, args } | Expr::CallExpr { method: op, args }
            | Expr::SyncCallExpr { method: op, args } => {
                if args.is_empty() {
                    op.clone()
                } else {
                    format!(
                        "{}({})",
                        op,
                        args.iter().map(Expr::pretty).collect::<Vec<_>>().join(", ")
                    )
                }
            }
            Expr::DataTypeExpr {
                constructor, args, ..
            } => {
                if args.is_empty() {
                    constructor.clone()
                } else {
                    format!(
                        "{}({})",
                        constructor,
                        args.iter().map(Expr::pretty).collect::<Vec<_>>().join(", ")
                    )
                }
            }
            Expr::CaseExpr {
                scrutinee, branches, ..
            } => {
                let arms = branches
                    .iter()
                    .map(|b| format!("{} => {}", b.pattern.pretty(), b.body.pretty()))
                    .collect::<Vec<_>>()
                    .join(" | ");
                format!("case {} {{ {} }}", scrutinee.pretty(), arms)
            }
            Expr::Poll(inner) => format!("{}.get", inner.pretty()),
            Expr::Implements { value, iface } => {
                format!("{} implements {}", value.pretty(), iface)
            }
            Expr::Claim { guarded } => format!("{}?", guarded.pretty()),
        }
    }
}
