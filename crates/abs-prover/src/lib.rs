// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Symbolic logic engine for deductive verification of ABS models.
//!
//! The engine takes proof obligations over a typed first-order logic with
//! explicit substitution updates, heaps, and futures, and discharges them
//! through an external SMT solver. The pipeline is:
//!
//! 1. [`translation`] lowers frontend expressions and statements into the
//!    logic ([`data`]), desugaring case expressions, synchronous calls, and
//!    return statements along the way;
//! 2. [`subst`] normalizes and eliminates substitution updates;
//! 3. [`smt`] compiles the update-free obligation into a complete SMT-LIB
//!    script and runs the solver, reading `unsat` as proved.
//!
//! All per-run state lives in a [`session::Session`] value owned by the
//! caller; independent obligations can be checked concurrently with
//! independent sessions.

pub mod ast;
pub mod data;
pub mod error;
pub mod generics;
pub mod session;
pub mod smt;
pub mod subst;
pub mod translation;

pub use error::{ProverError, Result};
pub use session::Session;
pub use smt::runner::{evaluate, SolverOptions, Verdict};
