// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Data model of the logic engine: types, terms, formulas, updates, and the
//! intermediate program representation.

pub mod cases;
pub mod conversion;
pub mod exprs;
pub mod formulas;
pub mod statements;
pub mod terms;
pub mod types;
pub mod updates;

pub use exprs::{BranchExpr, Expr, Location};
pub use formulas::{Formula, QuantifierKind};
pub use statements::{Branch, Stmt};
pub use terms::{BranchTerm, CaseTerm, Field, ProgVar, Term, VarKind};
pub use types::AbsType;
pub use updates::UpdateElement;
