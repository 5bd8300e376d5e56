// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Solver-facing encoder: renders terms and formulas as SMT-LIB and
//! assembles a complete, self-contained script per proof obligation.
//!
//! The script layout is fixed: options, built-in sort bindings, datatype
//! declarations, interface extensions, generic instantiations, heap
//! declarations, wildcard declarations, parametric function definitions,
//! direct function definitions, field and variable declarations with
//! uniqueness and interface assertions, object declarations, and finally
//! the obligation itself as `assert ante; assert (not succ); check-sat`.

pub mod elements;
mod pattern;
pub mod runner;

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use crate::data::conversion::{expr_to_form, expr_to_term};
use crate::data::formulas::{Formula, QuantifierKind};
use crate::data::terms::{Field, ProgVar, Term, VarKind};
use crate::data::types::{generic_constructor_name, AbsType};
use crate::error::{ProverError, Result};
use crate::generics;
use crate::session::{FunctionDecl, FunctionRepos, Session};
use crate::smt::elements::{Block, ProofElement};
use crate::subst::{replace_in_formula, TermMap};
use crate::translation::{translate_expression, SubstMap, TypeBinding};

/// Source sorts bound to solver sorts by `define-sort`.
const BUILTIN_SORTS: &[(&str, &str)] = &[
    ("ABS.StdLib.Int", "Int"),
    ("ABS.StdLib.Float", "Real"),
    ("ABS.StdLib.Bool", "Bool"),
    ("ABS.StdLib.String", "String"),
    ("Field", "Int"),
    ("Interface", "Int"),
];

fn sanitized(prefix: &str) -> String {
    prefix.replace('.', "_")
}

/// Stateful renderer for one script. Wildcard names and `valueOf` uses are
/// collected while rendering and declared afterwards, which is why the
/// obligation is rendered before the header blocks are assembled.
pub struct SmtEncoder<'a> {
    pub(crate) session: &'a mut Session,
    wildcards: BTreeMap<String, String>,
    wildcard_counter: usize,
    /// Future-read accessors encountered: sanitized prefix to result sort.
    value_ofs: BTreeMap<String, String>,
}

impl<'a> SmtEncoder<'a> {
    pub fn new(session: &'a mut Session) -> Self {
        SmtEncoder {
            session,
            wildcards: BTreeMap::new(),
            wildcard_counter: 0,
            value_ofs: BTreeMap::new(),
        }
    }

    /// A fresh wildcard constant of the given type, declared in the
    /// wildcard block of the final script.
    pub(crate) fn create_wildcard(&mut self, ty: &AbsType) -> Result<String> {
        let sort = self.translate_type(ty, false)?;
        let name = format!("_{}", self.wildcard_counter);
        self.wildcard_counter += 1;
        self.wildcards.insert(name.clone(), sort);
        Ok(name)
    }

    /// Solver sort of a source type. Interface- and reference-typed
    /// declarations use the `Interface`/`Int` binding when used as a
    /// declaration sort (`as_decl`).
    pub fn translate_type(&mut self, ty: &AbsType, as_decl: bool) -> Result<String> {
        match ty {
            AbsType::Unknown | AbsType::Heap => {
                Err(ProverError::UnknownTypeTranslation(ty.to_string()))
            }
            AbsType::Param(name) => Err(ProverError::ParameterTypeTranslation(format!(
                "type parameter `{name}` cannot be translated"
            ))),
            AbsType::Bounded(_) => Ok("UNBOUND".to_string()),
            AbsType::Interface(_) if as_decl => Ok("Interface".to_string()),
            _ if ty.is_concrete_generic() => {
                self.session.adts.add_generic(ty);
                Ok(ty.generic_sort_name())
            }
            _ => self.session.adts.lib_prefix(ty),
        }
    }

    fn heap_symbol(&mut self, heap: &ProgVar, prefix: &str) -> String {
        self.session.adts.mark_heap_used(prefix.to_string());
        format!("{}_{}", heap.name, sanitized(prefix))
    }

    /// Renders a term in heap position, specializing the heap symbol and
    /// the havoc function to the per-type heap of `prefix`.
    fn heap_to_smt(&mut self, term: &Term, prefix: &str) -> Result<String> {
        match term {
            Term::Var(v) if v.is_special_heap() => Ok(self.heap_symbol(v, prefix)),
            Term::Function { name, params } if name == "anon" && params.len() == 1 => {
                let inner = self.heap_to_smt(&params[0], prefix)?;
                Ok(format!("(anon_{} {inner})", sanitized(prefix)))
            }
            Term::Function { name, params } if name == "store" && params.len() == 3 => {
                let heap = self.heap_to_smt(&params[0], prefix)?;
                let field = self.term_to_smt(&params[1])?;
                let value = self.term_to_smt(&params[2])?;
                Ok(format!("(store {heap} {field} {value})"))
            }
            other => self.term_to_smt(other),
        }
    }

    pub fn term_to_smt(&mut self, term: &Term) -> Result<String> {
        match term {
            Term::Var(v) => Ok(v.name.clone()),
            Term::Field(f) => Ok(f.name.clone()),
            Term::Function { name, params } if name == "valueOf" => {
                let fut = params.first().ok_or_else(|| {
                    ProverError::UnknownTypeTranslation("valueOf without argument".to_string())
                })?;
                let held = match generics::return_type(fut) {
                    AbsType::Future(inner) => *inner,
                    other => {
                        return Err(ProverError::UnknownTypeTranslation(format!(
                            "valueOf expects a future, got `{}` of type {other}",
                            fut.pretty()
                        )))
                    }
                };
                let prefix = self.session.adts.lib_prefix(&held)?;
                let result_sort = self.translate_type(&held, false)?;
                let san = sanitized(&prefix);
                self.value_ofs.insert(san.clone(), result_sort);
                Ok(format!("(valueOf_{} {})", san, self.term_to_smt(fut)?))
            }
            Term::Function { name, params } if name == "select" && params.len() == 2 => {
                let field = match &params[1] {
                    Term::Field(f) => f.clone(),
                    other => {
                        return Err(ProverError::UnknownTypeTranslation(format!(
                            "select expects a field, got `{}`",
                            other.pretty()
                        )))
                    }
                };
                if field.ty.is_unknown() {
                    return Err(ProverError::UnknownTypeTranslation(format!(
                        "field `{}` has no resolved type",
                        field.name
                    )));
                }
                let prefix = self.session.adts.lib_prefix(&field.ty)?;
                let heap = self.heap_to_smt(&params[0], &prefix)?;
                Ok(format!("(select {heap} {})", field.name))
            }
            Term::Function { name, params } if name == "store" && params.len() == 3 => {
                let field_ty = match &params[1] {
                    Term::Field(f) => f.ty.clone(),
                    other => {
                        return Err(ProverError::UnknownTypeTranslation(format!(
                            "store expects a field, got `{}`",
                            other.pretty()
                        )))
                    }
                };
                let prefix = self.session.adts.lib_prefix(&field_ty)?;
                self.heap_to_smt(term, &prefix)
            }
            Term::Function { name, params } if params.is_empty() => {
                // Bare negative literals are not legal solver syntax.
                if let Some(rest) = name.strip_prefix('-') {
                    if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                        return Ok(format!("(- {rest})"));
                    }
                }
                Ok(name.clone())
            }
            Term::Function { name, params } => {
                let rendered = params
                    .iter()
                    .map(|p| self.term_to_smt(p))
                    .collect::<Result<Vec<_>>>()?
                    .join(" ");
                if self.session.functions.is_parametric(name) {
                    let mangled = self.concretize(name, params)?;
                    return Ok(format!("({mangled} {rendered})"));
                }
                let real = if name == "%" { "mod" } else { name.as_str() };
                Ok(format!("({real} {rendered})"))
            }
            Term::DataTypeConst {
                constructor,
                ty,
                params,
            } => {
                if ty.is_concrete_generic() {
                    self.session.adts.add_generic(ty);
                }
                let name = generic_constructor_name(constructor, ty);
                if params.is_empty() {
                    return Ok(name);
                }
                let rendered = params
                    .iter()
                    .map(|p| self.term_to_smt(p))
                    .collect::<Result<Vec<_>>>()?
                    .join(" ");
                Ok(format!("({name} {rendered})"))
            }
            Term::Case(case) => {
                let compiled = self.compile_case(case)?;
                self.term_to_smt(&compiled)
            }
            Term::Ite {
                cond,
                then_branch,
                else_branch,
            } => Ok(format!(
                "(ite {} {} {})",
                self.formula_to_smt(cond)?,
                self.term_to_smt(then_branch)?,
                self.term_to_smt(else_branch)?
            )),
            Term::Implements { value, iface } => Ok(format!(
                "(implements {} {})",
                self.term_to_smt(value)?,
                iface.qualified_name()
            )),
            Term::UpdateOn { .. } => Err(ProverError::UpdateNotTranslatable),
        }
    }

    pub fn formula_to_smt(&mut self, formula: &Formula) -> Result<String> {
        match formula {
            Formula::True => Ok("true".to_string()),
            Formula::False => Ok("false".to_string()),
            Formula::Not(inner) => Ok(format!("(not {})", self.formula_to_smt(inner)?)),
            Formula::And(a, b) => Ok(format!(
                "(and {} {})",
                self.formula_to_smt(a)?,
                self.formula_to_smt(b)?
            )),
            Formula::Or(a, b) => Ok(format!(
                "(or {} {})",
                self.formula_to_smt(a)?,
                self.formula_to_smt(b)?
            )),
            Formula::Impl(a, b) => Ok(format!(
                "(=> {} {})",
                self.formula_to_smt(a)?,
                self.formula_to_smt(b)?
            )),
            Formula::Eq(a, b) => {
                let (a, b) = generics::bound_terms(a, b)?;
                Ok(format!(
                    "(= {} {})",
                    self.term_to_smt(&a)?,
                    self.term_to_smt(&b)?
                ))
            }
            Formula::Predicate { name, params } => {
                if params.is_empty() {
                    return Ok(name.clone());
                }
                // Equality is the unification point of the generic binder.
                let bound;
                let params = if name == "=" && params.len() == 2 {
                    let (a, b) = generics::bound_terms(&params[0], &params[1])?;
                    bound = vec![a, b];
                    &bound
                } else {
                    params
                };
                let rendered = params
                    .iter()
                    .map(|p| self.term_to_smt(p))
                    .collect::<Result<Vec<_>>>()?
                    .join(" ");
                let real = if name == "%" { "mod" } else { name.as_str() };
                Ok(format!("({real} {rendered})"))
            }
            Formula::Is { constructor, term } => Ok(format!(
                "((_ is {constructor}) {})",
                self.term_to_smt(term)?
            )),
            Formula::Implements { value, iface } => Ok(format!(
                "(implements {} {})",
                self.term_to_smt(value)?,
                iface.qualified_name()
            )),
            Formula::Quantifier { kind, vars, body } => {
                if vars.is_empty() {
                    return self.formula_to_smt(body);
                }
                let kw = match kind {
                    QuantifierKind::Forall => "forall",
                    QuantifierKind::Exists => "exists",
                };
                let bound = vars
                    .iter()
                    .map(|v| {
                        Ok(format!(
                            "({} {})",
                            v.name,
                            self.translate_type(&v.ty, true)?
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?
                    .join(" ");
                Ok(format!("({kw} ({bound}) {})", self.formula_to_smt(body)?))
            }
            Formula::UpdateOn { .. } => Err(ProverError::UpdateNotTranslatable),
        }
    }

    /// Mangles a parametric-function application and records the
    /// instantiation so the script can define it once.
    fn concretize(&mut self, name: &str, params: &[Term]) -> Result<String> {
        let decl = self
            .session
            .functions
            .by_smt_name(name)
            .cloned()
            .ok_or_else(|| {
                ProverError::UnknownDeclaration(format!("no declaration for function {name}"))
            })?;
        let arg_types: Vec<AbsType> = params.iter().map(generics::return_type).collect();
        let binding = FunctionRepos::type_param_binding(&decl, &arg_types)?;
        let mangled = FunctionRepos::concretized_name(&decl, &binding);
        self.session.functions.record_instantiation(
            mangled.clone(),
            decl.qualified_name.clone(),
            binding,
        );
        Ok(mangled)
    }

    /// `define-fun-rec` text for one function under one type binding.
    fn function_definition(
        &mut self,
        mangled: &str,
        decl: &FunctionDecl,
        binding: &TypeBinding,
    ) -> Result<String> {
        let (expr, _) = translate_expression(
            &decl.body,
            &decl.result,
            &SubstMap::new(),
            true,
            binding,
            self.session,
        )?;
        let body = self.term_to_smt(&expr_to_term(&expr)?)?;
        let params = decl
            .params
            .iter()
            .map(|(name, ty)| {
                Ok(format!(
                    "({name} {})",
                    self.translate_type(&ty.apply_binding(binding), true)?
                ))
            })
            .collect::<Result<Vec<_>>>()?
            .join(" ");
        let result = self.translate_type(&decl.result.apply_binding(binding), true)?;
        Ok(format!(
            "(define-fun-rec {mangled} ({params}) {result}\n    {body})"
        ))
    }

    /// Opaque declaration plus the contract axiom
    /// `forall args. requires => ensures[result := f(args)]`.
    fn contract_declaration(&mut self, name: &str, decl: &FunctionDecl) -> Result<String> {
        let arg_sorts = decl
            .params
            .iter()
            .map(|(_, ty)| self.translate_type(ty, true))
            .collect::<Result<Vec<_>>>()?
            .join(" ");
        let result = self.translate_type(&decl.result, true)?;
        let mut out = format!("(declare-fun {name} ({arg_sorts}) {result})\n");

        let vars: Vec<ProgVar> = decl
            .params
            .iter()
            .map(|(n, ty)| ProgVar::new(n.clone(), ty.clone()))
            .collect();
        let application = Term::func_with(
            name.to_string(),
            vars.iter().map(|v| Term::Var(v.clone())).collect(),
        );
        let empty = SubstMap::new();
        let binding = TypeBinding::new();
        let mut spec = Formula::True;
        if let Some(requires) = &decl.requires {
            let (expr, _) = translate_expression(
                requires,
                &decl.result,
                &empty,
                true,
                &binding,
                self.session,
            )?;
            spec = expr_to_form(&expr)?;
        }
        if let Some(ensures) = &decl.ensures {
            let (expr, _) =
                translate_expression(ensures, &decl.result, &empty, true, &binding, self.session)?;
            let post = replace_in_formula(
                &expr_to_form(&expr)?,
                &TermMap::from([(
                    Term::Var(ProgVar::ret(decl.result.clone())),
                    application,
                )]),
            );
            let axiom = Formula::Quantifier {
                kind: QuantifierKind::Forall,
                vars,
                body: Box::new(Formula::implies(spec, post)),
            };
            out.push_str(&format!("(assert {})\n", self.formula_to_smt(&axiom)?));
        }
        Ok(out)
    }
}

/// Every named atom a rendered obligation mentions, partitioned the way the
/// declaration blocks need them.
#[derive(Default)]
struct Atoms {
    vars: BTreeSet<ProgVar>,
    fields: BTreeSet<Field>,
    funcs: BTreeSet<String>,
    objects: BTreeSet<Term>,
    generics: BTreeSet<AbsType>,
    placeholders: BTreeSet<ProgVar>,
}

fn collect_atoms(formula: &Formula, atoms: &mut Atoms) {
    formula.for_each_term(&mut |t| match t {
        Term::Var(v) if v.is_special_heap() => {}
        // Placeholders are resolved to selector chains during pattern
        // compilation; they are never declared.
        Term::Var(v) if v.kind == VarKind::Placeholder => {
            atoms.placeholders.insert(v.clone());
        }
        Term::Var(v) => {
            atoms.vars.insert(v.clone());
        }
        Term::Field(f) => {
            atoms.fields.insert(f.clone());
        }
        Term::Function { name, .. } if name.starts_with("NEW") => {
            atoms.objects.insert(t.clone());
        }
        Term::Function { name, .. } => {
            atoms.funcs.insert(name.clone());
        }
        Term::DataTypeConst { ty, .. } if ty.is_concrete_generic() => {
            atoms.generics.insert(ty.clone());
        }
        _ => {}
    });
}

/// Generates the complete solver script for the obligation `ante ⊨ succ`,
/// encoded as the unsatisfiability of `ante ∧ ¬succ`.
pub fn generate_smt(
    session: &mut Session,
    ante: &Formula,
    succ: &Formula,
    dump_model: bool,
) -> Result<String> {
    let mut pre = crate::subst::deupdatify_formula(ante);
    let post = crate::subst::deupdatify_formula(succ);

    let mut atoms = Atoms::default();
    collect_atoms(&pre, &mut atoms);
    let mut post_atoms = Atoms::default();
    collect_atoms(&post, &mut post_atoms);

    // Placeholders only the antecedent still mentions carry no binding
    // obligation; they degrade to unconstrained wildcards.
    let unused: Vec<ProgVar> = atoms
        .placeholders
        .difference(&post_atoms.placeholders)
        .cloned()
        .collect();
    if !unused.is_empty() {
        let mut map = TermMap::new();
        for ph in &unused {
            let wildcard = session.fresh_wildcard_var(ph.ty.clone());
            atoms.vars.insert(wildcard.clone());
            map.insert(Term::Var(ph.clone()), Term::Var(wildcard));
        }
        pre = replace_in_formula(&pre, &map);
    }
    atoms.vars.extend(post_atoms.vars);
    atoms.fields.extend(post_atoms.fields);
    atoms.funcs.extend(post_atoms.funcs);
    atoms.objects.extend(post_atoms.objects);
    atoms.generics.extend(post_atoms.generics);

    for generic in &atoms.generics {
        session.adts.add_generic(generic);
    }
    // Field types induce the used per-type heaps.
    for field in &atoms.fields {
        let prefix = session.adts.lib_prefix(&field.ty)?;
        session.adts.mark_heap_used(prefix);
    }

    let mut encoder = SmtEncoder::new(session);
    let pre_smt = encoder.formula_to_smt(&pre)?;
    let post_smt = encoder.formula_to_smt(&post)?;

    // Function definitions may themselves call functions and instantiate
    // generics, so both groups are rendered to a fixpoint before any block
    // is assembled.
    let mut parametric_defs: BTreeMap<String, String> = BTreeMap::new();
    let mut direct_defs: Vec<String> = Vec::new();
    let mut contract_decls: Vec<String> = Vec::new();
    let mut emitted: BTreeSet<String> = BTreeSet::new();
    let mut worklist: Vec<String> = atoms.funcs.iter().cloned().collect();
    loop {
        let pending: Vec<(String, String, TypeBinding)> = encoder
            .session
            .functions
            .instantiations()
            .filter(|(mangled, _)| !parametric_defs.contains_key(*mangled))
            .map(|(mangled, (qualified, binding))| {
                (mangled.clone(), qualified.clone(), binding.clone())
            })
            .collect();
        if pending.is_empty() && worklist.is_empty() {
            break;
        }
        for (mangled, qualified, binding) in pending {
            let decl = encoder
                .session
                .functions
                .by_qualified(&qualified)
                .cloned()
                .ok_or_else(|| {
                    ProverError::UnknownDeclaration(format!(
                        "no declaration for function {qualified}"
                    ))
                })?;
            let definition = encoder.function_definition(&mangled, &decl, &binding)?;
            parametric_defs.insert(mangled, definition);
        }
        while let Some(name) = worklist.pop() {
            if !emitted.insert(name.clone()) || encoder.session.functions.is_parametric(&name) {
                continue;
            }
            let Some(decl) = encoder.session.functions.by_smt_name(&name).cloned() else {
                continue;
            };
            if decl.has_contract() {
                contract_decls.push(encoder.contract_declaration(&name, &decl)?);
                continue;
            }
            let definition = encoder.function_definition(&name, &decl, &TypeBinding::new())?;
            // Callees of this body join the worklist.
            for line_name in definition
                .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
                .filter(|s| !s.is_empty())
            {
                if encoder.session.functions.by_smt_name(line_name).is_some()
                    && !emitted.contains(line_name)
                {
                    worklist.push(line_name.to_string());
                }
            }
            direct_defs.push(definition);
        }
    }

    let mut out = String::new();
    header_block(encoder.session, &encoder.value_ofs).render(&mut out);
    out.push('\n');
    datatypes_block(encoder.session).render(&mut out);
    interface_block(encoder.session).render(&mut out);
    out.push('\n');
    generics_block(&mut encoder)?.render(&mut out);
    heaps_block(encoder.session).render(&mut out);

    let mut wildcard_block = Block::new("WILDCARDS");
    for (name, sort) in &encoder.wildcards {
        wildcard_block.push(ProofElement::DeclareConst {
            name: name.clone(),
            sort: sort.clone(),
        });
    }
    wildcard_block.render(&mut out);
    out.push('\n');

    let mut parametric_block = Block::new("PARAMETRIC FUNCTIONS");
    for definition in parametric_defs.values() {
        parametric_block.push(ProofElement::Raw(definition.clone()));
    }
    parametric_block.render(&mut out);
    let mut functions_block = Block::new("FUNCTIONS");
    for definition in contract_decls.iter().chain(direct_defs.iter()) {
        functions_block.push(ProofElement::Raw(definition.clone()));
    }
    functions_block.render(&mut out);
    out.push('\n');

    fields_block(&mut encoder, &atoms.fields)?.render(&mut out);
    vars_block(&mut encoder, &atoms.vars)?.render(&mut out);
    objects_block(&mut encoder, &atoms.objects)?.render(&mut out);
    out.push('\n');

    let mut obligation = Block::delimited("PROOF OBLIGATION", "END PROOF OBLIGATION");
    obligation.push(ProofElement::Assertion(pre_smt));
    obligation.push(ProofElement::Assertion(format!("(not {post_smt})")));
    obligation.render(&mut out);
    out.push_str("(check-sat)\n");
    if dump_model {
        out.push_str("(get-model)\n");
    }
    out.push_str("(exit)\n");
    Ok(out)
}

fn header_block(session: &Session, value_ofs: &BTreeMap<String, String>) -> Block {
    let mut header = Block::delimited("HEADER", "END HEADER");

    let mut options = Block::new("SOLVER OPTIONS");
    options.push(ProofElement::Option("set-option :produce-models true".into()));
    options.push(ProofElement::Option("set-logic ALL".into()));
    header.push(ProofElement::Block(options));

    let mut sorts = Block::new("Builtin Types");
    for (name, definition) in BUILTIN_SORTS {
        sorts.push(ProofElement::DefineSort {
            name: (*name).to_string(),
            definition: (*definition).to_string(),
        });
    }
    sorts.push(ProofElement::DeclareSort("UNBOUND".into()));
    sorts.push(ProofElement::DeclareSort("ABS.StdLib.Fut".into()));
    header.push(ProofElement::Block(sorts));

    let mut funs = Block::new("Builtin Functions");
    funs.push(ProofElement::DeclareFun {
        name: "hasRole".into(),
        args: vec!["Int".into(), "String".into()],
        result: "Bool".into(),
    });
    funs.push(ProofElement::DeclareFun {
        name: "implements".into(),
        args: vec!["ABS.StdLib.Int".into(), "Interface".into()],
        result: "Bool".into(),
    });
    funs.push(ProofElement::DeclareFun {
        name: "extends".into(),
        args: vec!["Interface".into(), "Interface".into()],
        result: "Bool".into(),
    });
    header.push(ProofElement::Block(funs));

    header.push(ProofElement::DeclareConst {
        name: "Unit".into(),
        sort: "Int".into(),
    });
    header.push(ProofElement::Assertion("(= Unit 0)".into()));
    // Interface extension is transitive and propagates implements.
    header.push(ProofElement::Assertion(
        "(forall ((i1 Interface) (i2 Interface) (i3 Interface)) \
         (=> (and (extends i1 i2) (extends i2 i3)) (extends i1 i3)))"
            .into(),
    ));
    header.push(ProofElement::Assertion(
        "(forall ((i1 Interface) (i2 Interface) (obj ABS.StdLib.Int)) \
         (=> (and (extends i1 i2) (implements obj i1)) (implements obj i2)))"
            .into(),
    ));

    let mut primitives = Block::new("Primitive Declaration");
    for name in &session.adts.primitives {
        primitives.push(ProofElement::DeclareSort(name.clone()));
    }
    let mut declared: BTreeSet<String> = BTreeSet::new();
    for (san, result) in [
        ("ABS_StdLib_Int", "Int"),
        ("ABS_StdLib_Bool", "Bool"),
        ("ABS_StdLib_Float", "Real"),
    ] {
        declared.insert(san.to_string());
        primitives.push(ProofElement::DeclareFun {
            name: format!("valueOf_{san}"),
            args: vec!["ABS.StdLib.Fut".into()],
            result: result.into(),
        });
    }
    for (san, result) in value_ofs {
        // Generic value reads are declared with their instantiation.
        if declared.contains(san) || session.adts.is_known_generic_sort(result) {
            continue;
        }
        primitives.push(ProofElement::DeclareFun {
            name: format!("valueOf_{san}"),
            args: vec!["ABS.StdLib.Fut".into()],
            result: result.clone(),
        });
    }
    header.push(ProofElement::Block(primitives));
    header
}

fn datatypes_block(session: &mut Session) -> Block {
    let mut block = Block::new("data type declaration");
    let mut names = Vec::new();
    let mut bodies = Vec::new();
    for decl in session.adts.dtypes.values() {
        names.push(format!("({} 0)", decl.qualified_name));
        let ctors = decl
            .constructors
            .iter()
            .map(|ctor| {
                let selectors = ctor
                    .args
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| {
                        format!("({}_{i} {})", ctor.name, sort_of(session, ty))
                    })
                    .join(" ");
                if selectors.is_empty() {
                    format!("({})", ctor.name)
                } else {
                    format!("({} {selectors})", ctor.name)
                }
            })
            .join(" ");
        bodies.push(format!("({ctors})"));
    }
    if !session.adts.exceptions.is_empty() {
        names.push("(ABS.StdLib.Exception 0)".to_string());
        let ctors = session
            .adts
            .exceptions
            .iter()
            .map(|c| format!("({c})"))
            .join(" ");
        bodies.push(format!("({ctors})"));
    }
    if !names.is_empty() {
        block.push(ProofElement::Raw(format!(
            "(declare-datatypes ({}) ({}))",
            names.join(" "),
            bodies.join(" ")
        )));
    }
    block
}

// Sort of a constructor argument inside a datatype declaration; unlike
// `translate_type` this tolerates recursive references by name.
fn sort_of(session: &Session, ty: &AbsType) -> String {
    if ty.is_concrete_generic() {
        return ty.generic_sort_name();
    }
    session
        .adts
        .lib_prefix(ty)
        .unwrap_or_else(|_| "UNBOUND".to_string())
}

fn interface_block(session: &Session) -> Block {
    let mut block = Block::new("interface type declaration");
    for decl in session.adts.interfaces.values() {
        block.push(ProofElement::DeclareConst {
            name: decl.qualified_name.clone(),
            sort: "Interface".into(),
        });
    }
    if session.adts.interfaces.len() > 1 {
        let all = session.adts.interfaces.keys().join(" ");
        block.push(ProofElement::Assertion(format!("(distinct {all})")));
    }
    for decl in session.adts.interfaces.values() {
        for parent in &decl.extends {
            block.push(ProofElement::Assertion(format!(
                "(extends {} {parent})",
                decl.qualified_name
            )));
        }
    }
    block
}

fn generics_block(encoder: &mut SmtEncoder<'_>) -> Result<Block> {
    let mut block = Block::new("generics declaration");
    let instantiations: Vec<AbsType> =
        encoder.session.adts.concrete_generics().cloned().collect();
    if instantiations.is_empty() {
        return Ok(block);
    }
    let mut names = Vec::new();
    let mut bodies = Vec::new();
    let mut value_ofs = Vec::new();
    for ty in &instantiations {
        let sort = ty.generic_sort_name();
        let Some(decl) = encoder
            .session
            .adts
            .parametric
            .get(&ty.qualified_name())
            .cloned()
        else {
            log::warn!("no parametric declaration for {}", ty.qualified_name());
            block.push(ProofElement::DeclareSort(sort));
            continue;
        };
        let binding: TypeBinding = decl
            .type_params
            .iter()
            .cloned()
            .zip(ty.type_args().iter().cloned())
            .collect();
        names.push(format!("({sort} 0)"));
        let ctors = decl
            .constructors
            .iter()
            .map(|ctor| {
                let mangled = generic_constructor_name(&ctor.name, ty);
                let selectors = ctor
                    .args
                    .iter()
                    .enumerate()
                    .map(|(i, arg)| {
                        let bound = arg.apply_binding(&binding);
                        format!("({mangled}_{i} {})", sort_of(encoder.session, &bound))
                    })
                    .join(" ");
                if selectors.is_empty() {
                    format!("({mangled})")
                } else {
                    format!("({mangled} {selectors})")
                }
            })
            .join(" ");
        bodies.push(format!("({ctors})"));
        value_ofs.push(ProofElement::DeclareFun {
            name: format!("valueOf_{}", sanitized(&sort)),
            args: vec!["ABS.StdLib.Fut".into()],
            result: sort,
        });
    }
    if !names.is_empty() {
        block.push(ProofElement::Raw(format!(
            "(declare-datatypes ({}) ({}))",
            names.join(" "),
            bodies.join(" ")
        )));
        for decl in value_ofs {
            block.push(decl);
        }
    }
    Ok(block)
}

fn heaps_block(session: &Session) -> Block {
    let mut block = Block::delimited("HEAPS DECLARATION", "END HEAPS DECLARATION");
    for prefix in &session.adts.heap_types {
        if !session.adts.used_heaps().contains(prefix) {
            block.push(ProofElement::Raw(format!(
                "; no fields of type {prefix}: omitting its heap"
            )));
            continue;
        }
        let san = sanitized(prefix);
        block.push(ProofElement::DefineSort {
            name: format!("{san}_HeapType"),
            definition: format!("(Array Field {prefix})"),
        });
        for heap in ["heap", "old", "last"] {
            block.push(ProofElement::DeclareConst {
                name: format!("{heap}_{san}"),
                sort: format!("{san}_HeapType"),
            });
        }
        block.push(ProofElement::DeclareFun {
            name: format!("anon_{san}"),
            args: vec![format!("{san}_HeapType")],
            result: format!("{san}_HeapType"),
        });
    }
    block
}

fn fields_block(encoder: &mut SmtEncoder<'_>, fields: &BTreeSet<Field>) -> Result<Block> {
    let mut block = Block::delimited("FIELDS BLOCK", "END FIELDS");
    for field in fields {
        block.push(ProofElement::DeclareConst {
            name: field.name.clone(),
            sort: "Field".into(),
        });
    }
    // Distinct fields of the same heap never alias.
    let mut constraints = Block::new("Fields Constraints");
    for (f1, f2) in fields.iter().tuple_combinations() {
        if encoder.session.adts.lib_prefix(&f1.ty)? == encoder.session.adts.lib_prefix(&f2.ty)? {
            constraints.push(ProofElement::Assertion(format!(
                "(not (= {} {}))",
                f1.name, f2.name
            )));
        }
    }
    block.push(ProofElement::Block(constraints));
    Ok(block)
}

fn vars_block(encoder: &mut SmtEncoder<'_>, vars: &BTreeSet<ProgVar>) -> Result<Block> {
    let mut block = Block::delimited("Variable Declaration", "End Variable Declaration");
    let mut implements = Block::new("Implement Assertions");
    for var in vars {
        block.push(ProofElement::DeclareConst {
            name: var.name.clone(),
            sort: encoder.translate_type(&var.ty, true)?,
        });
        if let AbsType::Interface(name) = &var.ty {
            implements.push(ProofElement::Assertion(format!(
                "(implements {} {name})",
                var.name
            )));
        }
    }
    block.push(ProofElement::Block(implements));
    Ok(block)
}

fn objects_block(encoder: &mut SmtEncoder<'_>, objects: &BTreeSet<Term>) -> Result<Block> {
    let mut block = Block::delimited("OBJECTS", "END OBJECTS");
    let mut assertions = Block::new("Interface Implementation Assertions");
    for object in objects {
        let Term::Function { name, params } = object else {
            continue;
        };
        let args = params
            .iter()
            .map(|p| encoder.translate_type(&generics::return_type(p), true))
            .collect::<Result<Vec<_>>>()?;
        block.push(ProofElement::DeclareFun {
            name: name.clone(),
            args,
            result: "Int".into(),
        });
        let rendered = encoder.term_to_smt(object)?;
        if let Some(ifaces) = encoder.session.adts.objects.get(name).cloned() {
            for iface in ifaces {
                assertions.push(ProofElement::Assertion(format!(
                    "(implements {rendered} {})",
                    iface.qualified_name()
                )));
            }
        }
    }
    block.push(ProofElement::Block(assertions));
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_var(name: &str) -> Term {
        Term::Var(ProgVar::new(name, AbsType::Int))
    }

    #[test]
    fn negative_literals_are_parenthesized() {
        let mut session = Session::new();
        let mut encoder = SmtEncoder::new(&mut session);
        assert_eq!(encoder.term_to_smt(&Term::func("-1")).unwrap(), "(- 1)");
        assert_eq!(encoder.term_to_smt(&Term::func("-")).unwrap(), "-");
    }

    #[test]
    fn modulo_renders_as_mod() {
        let mut session = Session::new();
        let mut encoder = SmtEncoder::new(&mut session);
        let t = Term::func_with("%", vec![int_var("x"), Term::int(2)]);
        assert_eq!(encoder.term_to_smt(&t).unwrap(), "(mod x 2)");
    }

    #[test]
    fn select_uses_the_per_type_heap_of_the_field() {
        let mut session = Session::new();
        let mut encoder = SmtEncoder::new(&mut session);
        let t = Term::select(Field::new("balance_f", AbsType::Int));
        assert_eq!(
            encoder.term_to_smt(&t).unwrap(),
            "(select heap_ABS_StdLib_Int balance_f)"
        );
        assert!(session.adts.used_heaps().contains("ABS.StdLib.Int"));
    }

    #[test]
    fn value_of_is_named_by_the_held_type() {
        let mut session = Session::new();
        let mut encoder = SmtEncoder::new(&mut session);
        let fut = Term::Var(ProgVar::new(
            "f",
            AbsType::Future(Box::new(AbsType::Bool)),
        ));
        assert_eq!(
            encoder.term_to_smt(&Term::value_of(fut)).unwrap(),
            "(valueOf_ABS_StdLib_Bool f)"
        );
    }

    #[test]
    fn updates_do_not_render() {
        let mut session = Session::new();
        let mut encoder = SmtEncoder::new(&mut session);
        let t = Term::UpdateOn {
            update: Box::new(crate::data::updates::UpdateElement::Empty),
            target: Box::new(int_var("x")),
        };
        assert!(matches!(
            encoder.term_to_smt(&t),
            Err(ProverError::UpdateNotTranslatable)
        ));
    }

    #[test]
    fn script_blocks_appear_in_order() {
        let mut session = Session::new();
        let ante = Formula::predicate(">=", vec![int_var("x"), Term::int(0)]);
        let succ = Formula::predicate(">=", vec![int_var("x"), Term::int(-1)]);
        let script = generate_smt(&mut session, &ante, &succ, false).unwrap();
        let order = [
            "; HEADER",
            "; data type declaration",
            "; generics declaration",
            "; HEAPS DECLARATION",
            "; WILDCARDS",
            "; PARAMETRIC FUNCTIONS",
            "; FUNCTIONS",
            "; FIELDS BLOCK",
            "; Variable Declaration",
            "; OBJECTS",
            "; PROOF OBLIGATION",
            "(check-sat)",
            "(exit)",
        ];
        let mut last = 0;
        for marker in order {
            let pos = script[last..]
                .find(marker)
                .unwrap_or_else(|| panic!("missing `{marker}` in script:\n{script}"));
            last += pos;
        }
        assert!(script.contains("(assert (>= x 0))"));
        assert!(script.contains("(assert (not (>= x (- 1))))"));
        assert!(!script.contains("(get-model)"));
    }

    #[test]
    fn model_dump_is_optional() {
        let mut session = Session::new();
        let ante = Formula::True;
        let succ = Formula::False;
        let script = generate_smt(&mut session, &ante, &succ, true).unwrap();
        assert!(script.contains("(get-model)"));
    }
}
