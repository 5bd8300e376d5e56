// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy of the logic engine.
//!
//! Translation errors and type-resolution errors indicate unsupported or
//! malformed source input; representation-invariant errors indicate a
//! malformed intermediate tree. All of them are ordinary fatal errors that
//! propagate to the caller: a batch driver may catch them per proof
//! obligation and continue with the next one.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProverError>;

#[derive(Debug, Error)]
pub enum ProverError {
    // -- translation errors --
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    #[error("special keyword misused: {0}")]
    SpecialKeywordMisuse(String),

    #[error("unknown declaration: {0}")]
    UnknownDeclaration(String),

    // -- type-resolution errors --
    #[error("type cannot be translated to solver syntax: {0}")]
    UnknownTypeTranslation(String),

    #[error("term with unbound type `{term}` does not match binding type `{binding}`")]
    UnboundTypeMismatch { term: String, binding: String },

    #[error("parameter type cannot be translated: {0}")]
    ParameterTypeTranslation(String),

    // -- representation-invariant errors --
    #[error("case term without branches")]
    EmptyCaseBranches,

    #[error("constructor `{constructor}` requires at least {required} parameters, got {actual}")]
    TooFewConstructorParams {
        constructor: String,
        required: usize,
        actual: usize,
    },

    #[error("updates are not translatable to solver syntax")]
    UpdateNotTranslatable,

    // -- solver-interaction errors --
    #[error("failed to launch solver: {0}")]
    SolverLaunch(#[from] std::io::Error),

    #[error("solver timed out after {0:?}")]
    SolverTimeout(Duration),

    #[error("unexpected solver output: {0}")]
    SolverVerdict(String),
}
