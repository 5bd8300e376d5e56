// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Typed source AST, the shape the external frontend hands to the
//! translator. Types are already resolved; declaration references carry
//! qualified names where the frontend could resolve them and `None` where
//! it could not (specifications are not type-checked by the compiler).

use std::collections::BTreeSet;

use crate::data::types::AbsType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exp {
    FieldUse { name: String, ty: AbsType },
    VarUse { name: String, ty: AbsType },
    IntLiteral(String),
    FloatLiteral(String),
    StringLiteral(String),
    Null,
    This,
    /// `let var = value in body`; the binding overrides any outer
    /// substitution of the same name.
    Let {
        var_name: String,
        value: Box<Exp>,
        body: Box<Exp>,
    },
    /// `e.get`, the blocking read of a future.
    Get(Box<Exp>),
    New {
        class: String,
        args: Vec<Exp>,
        ty: AbsType,
    },
    Binary {
        op: String,
        left: Box<Exp>,
        right: Box<Exp>,
    },
    Unary { op: String, operand: Box<Exp> },
    DataConstructor {
        constructor: String,
        /// `None` when the constructor could not be resolved.
        qualified: Option<String>,
        ty: AbsType,
        args: Vec<Exp>,
    },
    FnApp {
        name: String,
        /// Qualified name of the resolved declaration, if any.
        decl: Option<String>,
        args: Vec<Exp>,
    },
    IfExp {
        cond: Box<Exp>,
        then_exp: Box<Exp>,
        else_exp: Box<Exp>,
    },
    Call {
        callee: Box<Exp>,
        /// `<Class>.<method>`.
        method_qualified: String,
        method_name: String,
        args: Vec<Exp>,
        is_async: bool,
    },
    Case {
        scrutinee: Box<Exp>,
        branches: Vec<CaseBranch>,
        ty: AbsType,
        free_vars: BTreeSet<String>,
    },
    /// `e as I`: the value when it implements the interface, null otherwise.
    As { exp: Box<Exp>, iface: AbsType },
    Implements { exp: Box<Exp>, iface: AbsType },
    ListLiteral { elems: Vec<Exp>, ty: AbsType },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseBranch {
    pub pattern: Pattern,
    pub body: Exp,
    /// Declared type of the pattern position.
    pub pattern_ty: AbsType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Var { name: String, ty: AbsType },
    Literal(Exp),
    /// `_`; carries the resolved type of its position, `Unknown` when the
    /// frontend could not determine it.
    Underscore { ty: AbsType },
    Constructor {
        constructor: String,
        module: String,
        ty: AbsType,
        args: Vec<Pattern>,
    },
}

impl Pattern {
    /// Variables the pattern binds, left to right.
    pub fn free_pattern_vars(&self) -> Vec<(String, AbsType)> {
        match self {
            Pattern::Var { name, ty } => vec![(name.clone(), ty.clone())],
            Pattern::Constructor { args, .. } => {
                args.iter().flat_map(Pattern::free_pattern_vars).collect()
            }
            Pattern::Literal(_) | Pattern::Underscore { .. } => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Exp(Exp),
    And(Box<Guard>, Box<Guard>),
    /// `fut?`, the claim that a future is resolved.
    Claim { var: Exp },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    Requires,
    Ensures,
    WhileInv,
    ObjInv,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub kind: SpecKind,
    pub value: Exp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Skip,
    Expression {
        exp: Exp,
        /// Methods this statement's future read may resolve, from a
        /// `Resolves` annotation.
        resolves: BTreeSet<String>,
    },
    VarDecl {
        name: String,
        ty: AbsType,
        init: Option<Exp>,
        resolves: BTreeSet<String>,
    },
    Assign {
        loc: Exp,
        value: Exp,
        resolves: BTreeSet<String>,
    },
    Block(Vec<Stmt>),
    While {
        cond: Exp,
        body: Box<Stmt>,
        invariants: Vec<Exp>,
    },
    Await(Guard),
    Suspend,
    Return(Exp),
    If {
        cond: Exp,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Assert(Exp),
    Case {
        scrutinee: Exp,
        branches: Vec<CaseStmtBranch>,
    },
    Die(Exp),
    Throw(Exp),
    // Not core ABS; the translator rejects these.
    TryCatchFinally,
    MoveCogTo,
    Duration,
    Foreach,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseStmtBranch {
    pub pattern: Pattern,
    pub body: Stmt,
}

impl Exp {
    /// Best-effort static type of the expression; `Unknown` where the
    /// shape does not determine it.
    pub fn ty(&self) -> AbsType {
        match self {
            Exp::FieldUse { ty, .. } | Exp::VarUse { ty, .. } => ty.clone(),
            Exp::IntLiteral(_) => AbsType::Int,
            Exp::FloatLiteral(_) => AbsType::Float,
            Exp::StringLiteral(_) => AbsType::Str,
            Exp::Null | Exp::This => AbsType::Int,
            Exp::Let { body, .. } => body.ty(),
            Exp::Get(inner) => match inner.ty() {
                AbsType::Future(t) => *t,
                _ => AbsType::Unknown,
            },
            Exp::New { ty, .. } => ty.clone(),
            Exp::Binary { op, .. } => match op.as_str() {
                "&&" | "||" | "=" | "!=" | "<" | "<=" | ">" | ">=" => AbsType::Bool,
                _ => AbsType::Int,
            },
            Exp::Unary { op, .. } => {
                if op == "!" {
                    AbsType::Bool
                } else {
                    AbsType::Int
                }
            }
            Exp::DataConstructor { ty, .. } => ty.clone(),
            Exp::IfExp { then_exp, .. } => then_exp.ty(),
            Exp::Case { ty, .. } => ty.clone(),
            Exp::As { iface, .. } => iface.clone(),
            Exp::Implements { .. } => AbsType::Bool,
            Exp::ListLiteral { ty, .. } => ty.clone(),
            Exp::FnApp { .. } | Exp::Call { .. } => AbsType::Unknown,
        }
    }
}
