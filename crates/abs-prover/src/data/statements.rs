// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Intermediate statement language.

use std::collections::BTreeSet;

use crate::data::exprs::{Expr, Location};
use crate::data::formulas::Formula;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stmt {
    Skip,
    Assign { loc: Location, expr: Expr },
    Seq(Box<Stmt>, Box<Stmt>),
    /// Pattern-matching branch statement.
    Branch {
        scrutinee: Expr,
        branches: Vec<Branch>,
    },
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Box<Stmt>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        /// Program point of the loop head, for naming anonymized heaps.
        pp: usize,
        invariant: Formula,
    },
    Await { guard: Expr, pp: usize },
    Return(Expr),
    Assert(Expr),
    Throw(Expr),
    /// Asynchronous call: `loc` receives the future.
    CallStmt {
        loc: Location,
        callee: Expr,
        call: Expr,
    },
    /// Awaiting read of a future into `loc`. `resolves` names the methods
    /// whose postconditions may be assumed for the read value.
    SyncStmt {
        loc: Location,
        fut_read: Expr,
        resolves: BTreeSet<String>,
        pp: usize,
    },
    /// Synchronous call on `this`, no future involved.
    SyncCallStmt {
        loc: Location,
        callee: Expr,
        call: Expr,
    },
    /// Object creation: `loc` receives the fresh object id.
    AllocateStmt { loc: Location, expr: Expr },
    /// Expression evaluated for effect only.
    ExprStmt(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Branch {
    pub pattern: Expr,
    pub body: Stmt,
}

impl Stmt {
    /// Sequential composition, eliding `Skip` on either side.
    pub fn seq(first: Stmt, second: Stmt) -> Stmt {
        match (first, second) {
            (Stmt::Skip, s) | (s, Stmt::Skip) => s,
            (a, b) => Stmt::Seq(Box::new(a), Box::new(b)),
        }
    }

    /// Folds a statement list into a right-nested sequence.
    pub fn seq_all(stmts: Vec<Stmt>) -> Stmt {
        stmts
            .into_iter()
            .rev()
            .fold(Stmt::Skip, |acc, s| Stmt::seq(s, acc))
    }
}
