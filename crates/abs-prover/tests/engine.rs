// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! End-to-end obligations: build formulas, generate the solver script, and
//! where a solver is installed, discharge them. Tests that need `z3` skip
//! themselves when the binary is not on the path.

use std::collections::BTreeSet;
use std::process::Command;

use abs_prover::data::formulas::Formula;
use abs_prover::data::terms::{BranchTerm, CaseTerm, ProgVar, Term, VarKind};
use abs_prover::data::types::AbsType;
use abs_prover::data::updates::{simplify_update, UpdateElement};
use abs_prover::error::ProverError;
use abs_prover::session::{ConstructorDecl, DataTypeDecl, Session};
use abs_prover::smt::generate_smt;
use abs_prover::smt::runner::{check_script, evaluate, SolverOptions};
use abs_prover::subst::{apply_to_formula, deupdatify_formula};

fn solver_available() -> bool {
    Command::new("z3").arg("--version").output().is_ok()
}

fn int_var(name: &str) -> ProgVar {
    ProgVar::new(name, AbsType::Int)
}

fn list_int() -> AbsType {
    AbsType::data_with("ABS.StdLib.List", vec![AbsType::Int])
}

fn session_with_containers() -> Session {
    let mut session = Session::new();
    session.adts.register_data_type(DataTypeDecl {
        qualified_name: "ABS.StdLib.List".into(),
        type_params: vec!["A".into()],
        constructors: vec![
            ConstructorDecl {
                name: "ABS.StdLib.Nil".into(),
                args: vec![],
            },
            ConstructorDecl {
                name: "ABS.StdLib.Cons".into(),
                args: vec![
                    AbsType::Param("A".into()),
                    AbsType::data_with("ABS.StdLib.List", vec![AbsType::Param("A".into())]),
                ],
            },
        ],
    });
    session.adts.register_data_type(DataTypeDecl {
        qualified_name: "ABS.StdLib.Pair".into(),
        type_params: vec!["A".into(), "B".into()],
        constructors: vec![ConstructorDecl {
            name: "ABS.StdLib.Pair".into(),
            args: vec![AbsType::Param("A".into()), AbsType::Param("B".into())],
        }],
    });
    session
}

fn assigned(update: UpdateElement, post: Formula) -> Formula {
    Formula::UpdateOn {
        update: Box::new(update),
        target: Box::new(post),
    }
}

#[test]
fn consistent_literal_assignment_proves() {
    if !solver_available() {
        eprintln!("z3 not found, skipping");
        return;
    }
    let mut session = Session::new();
    let post = assigned(
        UpdateElement::elementary(int_var("x"), Term::int(3)),
        Formula::eq(Term::Var(int_var("x")), Term::int(3)),
    );
    let proved = evaluate(&mut session, &Formula::True, &post, &SolverOptions::default()).unwrap();
    assert!(proved);
}

#[test]
fn inconsistent_postcondition_is_disproved() {
    if !solver_available() {
        eprintln!("z3 not found, skipping");
        return;
    }
    let mut session = Session::new();
    let post = assigned(
        UpdateElement::elementary(int_var("x"), Term::int(3)),
        Formula::eq(Term::Var(int_var("x")), Term::int(4)),
    );
    let proved = evaluate(&mut session, &Formula::True, &post, &SolverOptions::default()).unwrap();
    assert!(!proved);
}

fn placeholder(name: &str) -> ProgVar {
    ProgVar {
        name: name.to_string(),
        ty: AbsType::Int,
        kind: VarKind::Placeholder,
    }
}

fn cons(head: Term, tail: Term) -> Term {
    Term::DataTypeConst {
        constructor: "ABS.StdLib.Cons".into(),
        ty: list_int(),
        params: vec![head, tail],
    }
}

fn nil() -> Term {
    Term::DataTypeConst {
        constructor: "ABS.StdLib.Nil".into(),
        ty: list_int(),
        params: vec![],
    }
}

/// The two-element-list obligation: `l = Cons(1, Cons(2, Nil))` entails
/// that matching `Cons(x, Cons(y, Nil))` yields `x + y = 3`.
fn list_case_obligation() -> (Session, ProgVar, Formula, Formula) {
    let session = session_with_containers();
    let l = ProgVar::new("l", list_int());
    let pattern = cons(
        Term::Var(placeholder("_ph0")),
        cons(Term::Var(placeholder("_ph1")), nil()),
    );
    let body = Term::func_with(
        "+",
        vec![
            Term::Var(placeholder("_ph0")),
            Term::Var(placeholder("_ph1")),
        ],
    );
    let case = Term::Case(CaseTerm {
        scrutinee: Box::new(Term::Var(l.clone())),
        expected_sort: "ABS.StdLib.Int".into(),
        branches: vec![BranchTerm::new(pattern, body)],
        free_vars: BTreeSet::new(),
        expected_ty: AbsType::Int,
    });
    let ante = Formula::eq(Term::Var(l.clone()), cons(Term::int(1), cons(Term::int(2), nil())));
    let succ = Formula::predicate("=", vec![case, Term::int(3)]);
    (session, l, ante, succ)
}

#[test]
fn list_pattern_obligation_proves() {
    if !solver_available() {
        eprintln!("z3 not found, skipping");
        return;
    }
    let (mut session, _, ante, succ) = list_case_obligation();
    let proved = evaluate(&mut session, &ante, &succ, &SolverOptions::default()).unwrap();
    assert!(proved);
}

#[test]
fn list_case_script_declares_the_instantiation_and_selectors() {
    let (mut session, _, ante, succ) = list_case_obligation();
    let script = generate_smt(&mut session, &ante, &succ, false).unwrap();
    assert!(script.contains("(ABS.StdLib.List_ABS.StdLib.Int 0)"));
    assert!(script.contains("ABS.StdLib.Cons_ABS.StdLib.Int_0"));
    assert!(script.contains("((_ is ABS.StdLib.Cons_ABS.StdLib.Int) l)"));
    assert!(script.contains("(declare-const l ABS.StdLib.List_ABS.StdLib.Int)"));
    // Non-exhaustive match: the fallthrough wildcard is declared.
    assert!(script.contains("(declare-const _0 ABS.StdLib.Int)"));
}

#[test]
fn pair_equality_emits_one_instantiation() {
    let mut session = session_with_containers();
    let p = ProgVar::new(
        "p",
        AbsType::data_with("ABS.StdLib.Pair", vec![AbsType::Int, AbsType::Bool]),
    );
    // Literal with both type arguments still unresolved; the equality
    // against `p` binds it.
    let literal = Term::DataTypeConst {
        constructor: "ABS.StdLib.Pair".into(),
        ty: AbsType::data_with(
            "ABS.StdLib.Pair",
            vec![AbsType::Bounded("A".into()), AbsType::Bounded("B".into())],
        ),
        params: vec![Term::int(1), Term::func("true")],
    };
    let ante = Formula::eq(Term::Var(p), literal);
    let script = generate_smt(&mut session, &ante, &Formula::True, false).unwrap();
    assert!(script.contains("(= p (ABS.StdLib.Pair_ABS.StdLib.Int_ABS.StdLib.Bool 1 true))"));
    let declarations = script
        .matches("(ABS.StdLib.Pair_ABS.StdLib.Int_ABS.StdLib.Bool 0)")
        .count();
    assert_eq!(declarations, 1);
}

#[test]
fn simplified_updates_preserve_meaning() {
    let assign = |lhs: &str, rhs: Term| UpdateElement::elementary(int_var(lhs), rhs);
    let read = Formula::eq(Term::Var(int_var("y")), Term::Var(int_var("x")));
    let chains = vec![
        // {x:=a}{y:=x}{x:=c}
        UpdateElement::chain(
            UpdateElement::chain(
                assign("x", Term::func("a")),
                assign("y", Term::Var(int_var("x"))),
            ),
            assign("x", Term::func("c")),
        ),
        // {x:=a}{x:=b}{y:=x}
        UpdateElement::chain(
            UpdateElement::chain(assign("x", Term::func("a")), assign("x", Term::func("b"))),
            assign("y", Term::Var(int_var("x"))),
        ),
    ];
    for u in chains {
        let direct = apply_to_formula(&u, &read);
        let simplified = apply_to_formula(&simplify_update(u), &read);
        assert_eq!(direct, simplified);
    }
}

#[test]
fn deupdatify_is_idempotent_and_update_free() {
    let inner = assigned(
        UpdateElement::elementary(int_var("y"), Term::Var(int_var("x"))),
        Formula::eq(Term::Var(int_var("y")), Term::int(1)),
    );
    let nested = assigned(UpdateElement::elementary(int_var("x"), Term::int(1)), inner);
    let once = deupdatify_formula(&nested);
    assert!(!once.has_updates());
    assert_eq!(deupdatify_formula(&once), once);
    assert_eq!(once, Formula::eq(Term::int(1), Term::int(1)));
}

#[test]
fn encoder_deupdatifies_before_rendering() {
    let mut session = Session::new();
    let wrapped = Formula::Predicate {
        name: ">=".into(),
        params: vec![
            Term::UpdateOn {
                update: Box::new(UpdateElement::elementary(int_var("x"), Term::int(1))),
                target: Box::new(Term::Var(int_var("x"))),
            },
            Term::int(0),
        ],
    };
    let script = generate_smt(&mut session, &wrapped, &Formula::True, false).unwrap();
    assert!(script.contains("(assert (>= 1 0))"));
}

#[test]
fn missing_solver_binary_is_a_launch_error() {
    let options = SolverOptions {
        solver_path: "definitely-not-a-solver".into(),
        ..SolverOptions::default()
    };
    let err = check_script("(check-sat)\n", &options).unwrap_err();
    assert!(matches!(err, ProverError::SolverLaunch(_)));
}

#[test]
fn model_dump_only_on_request() {
    let mut session = Session::new();
    let ante = Formula::predicate(">=", vec![Term::Var(int_var("x")), Term::int(0)]);
    let plain = generate_smt(&mut session, &ante, &Formula::True, false).unwrap();
    assert!(!plain.contains("(get-model)"));
    let mut session = Session::new();
    let with_model = generate_smt(&mut session, &ante, &Formula::True, true).unwrap();
    assert!(with_model.contains("(get-model)"));
    assert!(with_model.ends_with("(exit)\n"));
}
