// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Per-run state: declaration registries, generic instantiations, fresh-name
//! allocation, and the placeholder map of the pattern compiler.
//!
//! One `Session` per verification run. Sessions are plain values owned by
//! the caller, so independent obligations can be verified concurrently with
//! independent sessions.

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::Exp;
use crate::data::terms::{ProgVar, Term, VarKind};
use crate::data::types::AbsType;
use crate::error::{ProverError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorDecl {
    pub name: String,
    pub args: Vec<AbsType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTypeDecl {
    pub qualified_name: String,
    /// Type-parameter names; empty for monomorphic types.
    pub type_params: Vec<String>,
    pub constructors: Vec<ConstructorDecl>,
}

impl DataTypeDecl {
    pub fn is_parametric(&self) -> bool {
        !self.type_params.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDecl {
    pub qualified_name: String,
    pub extends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub qualified_name: String,
    pub type_params: Vec<String>,
    pub params: Vec<(String, AbsType)>,
    pub result: AbsType,
    pub body: Exp,
    pub requires: Option<Exp>,
    pub ensures: Option<Exp>,
}

impl FunctionDecl {
    /// Contract functions are declared opaquely and axiomatized by their
    /// pre/postconditions instead of being defined by their body.
    pub fn has_contract(&self) -> bool {
        self.requires.is_some() || self.ensures.is_some()
    }
}

/// Solver-side name of a user function: stdlib functions keep their simple
/// name, user functions use the dash-joined qualified name.
pub fn smt_function_name(qualified: &str) -> String {
    if let Some(simple) = qualified.strip_prefix("ABS.") {
        simple
            .rsplit('.')
            .next()
            .unwrap_or(simple)
            .to_string()
    } else {
        qualified.replace('.', "-")
    }
}

/// Declaration registry for algebraic data types, interfaces, exceptions,
/// objects, and the per-type heaps they induce.
#[derive(Debug, Clone, Default)]
pub struct AdtRepos {
    /// Monomorphic data types by qualified name.
    pub dtypes: BTreeMap<String, DataTypeDecl>,
    /// Parametric data-type declarations by qualified name; instantiated on
    /// demand through `add_generic`.
    pub parametric: BTreeMap<String, DataTypeDecl>,
    /// Opaque sorts declared with `declare-sort`.
    pub primitives: BTreeSet<String>,
    /// Exception constructor names; together they form the exception type.
    pub exceptions: Vec<String>,
    pub interfaces: BTreeMap<String, InterfaceDecl>,
    /// Object creation sites: fresh object name to the interfaces the
    /// created class implements.
    pub objects: BTreeMap<String, Vec<AbsType>>,
    /// Sort names with a heap declaration.
    pub heap_types: BTreeSet<String>,
    used_heaps: BTreeSet<String>,
    /// Concrete generic instantiations keyed by mangled sort name, so
    /// structural equality deduplicates.
    concrete_generics: BTreeMap<String, AbsType>,
}

impl AdtRepos {
    pub fn new() -> Self {
        let mut repos = AdtRepos::default();
        for builtin in ["ABS.StdLib.Int", "ABS.StdLib.Bool", "ABS.StdLib.Float", "ABS.StdLib.Fut"]
        {
            repos.heap_types.insert(builtin.to_string());
        }
        repos
    }

    pub fn register_data_type(&mut self, decl: DataTypeDecl) {
        self.heap_types.insert(decl.qualified_name.clone());
        if decl.is_parametric() {
            self.parametric.insert(decl.qualified_name.clone(), decl);
        } else {
            self.dtypes.insert(decl.qualified_name.clone(), decl);
        }
    }

    pub fn register_primitive(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.heap_types.insert(name.clone());
        self.primitives.insert(name);
    }

    pub fn register_exception(&mut self, constructor: impl Into<String>) {
        self.exceptions.push(constructor.into());
    }

    pub fn register_interface(&mut self, decl: InterfaceDecl) {
        self.interfaces.insert(decl.qualified_name.clone(), decl);
    }

    pub fn is_known_generic(&self, ty: &AbsType) -> bool {
        self.concrete_generics.contains_key(&ty.generic_sort_name())
    }

    /// Whether a sort name is a registered concrete-generic instantiation.
    pub fn is_known_generic_sort(&self, sort: &str) -> bool {
        self.concrete_generics.contains_key(sort)
    }

    pub fn concrete_generics(&self) -> impl Iterator<Item = &AbsType> {
        self.concrete_generics.values()
    }

    /// Registers a concrete generic instantiation, recursing into type
    /// arguments and into the instantiated constructor argument types. One
    /// registration per distinct instantiation.
    pub fn add_generic(&mut self, ty: &AbsType) {
        if !ty.is_concrete_generic() || self.is_known_generic(ty) {
            return;
        }
        let sort = ty.generic_sort_name();
        self.concrete_generics.insert(sort.clone(), ty.clone());

        for arg in ty.type_args() {
            self.add_generic(arg);
        }
        if let Some(decl) = self.parametric.get(&ty.qualified_name()).cloned() {
            let binding: BTreeMap<String, AbsType> = decl
                .type_params
                .iter()
                .cloned()
                .zip(ty.type_args().iter().cloned())
                .collect();
            for ctor in &decl.constructors {
                for arg in &ctor.args {
                    let bound = arg.apply_binding(&binding);
                    self.add_generic(&bound);
                }
            }
        } else {
            log::warn!("no parametric declaration for {}", ty.qualified_name());
        }
        self.heap_types.insert(sort.clone());
        self.used_heaps.insert(sort);
    }

    /// Heap/sort family name of a type, used to key per-type heaps and the
    /// `valueOf_` family. Object references live in the `Int` family.
    pub fn lib_prefix(&self, ty: &AbsType) -> Result<String> {
        match ty {
            AbsType::Unknown | AbsType::Heap => Err(ProverError::UnknownTypeTranslation(
                ty.to_string(),
            )),
            AbsType::Param(_) | AbsType::Bounded(_) => Ok("UNBOUND".to_string()),
            AbsType::Bool | AbsType::Int | AbsType::Float | AbsType::Str => {
                Ok(ty.qualified_name())
            }
            AbsType::Unit => Ok("ABS.StdLib.Int".to_string()),
            AbsType::Future(_) => Ok("ABS.StdLib.Fut".to_string()),
            AbsType::Interface(_) => Ok("ABS.StdLib.Int".to_string()),
            AbsType::Data { name, .. } => {
                if ty.is_generic() {
                    if ty.has_unknown() {
                        return Err(ProverError::UnknownTypeTranslation(ty.to_string()));
                    }
                    return Ok(ty.generic_sort_name());
                }
                if self.dtypes.contains_key(name)
                    || self.primitives.contains(name)
                    || name.starts_with("ABS.StdLib")
                {
                    Ok(name.clone())
                } else {
                    Ok("ABS.StdLib.Int".to_string())
                }
            }
        }
    }

    pub fn mark_heap_used(&mut self, prefix: impl Into<String>) {
        self.used_heaps.insert(prefix.into());
    }

    pub fn used_heaps(&self) -> &BTreeSet<String> {
        &self.used_heaps
    }
}

/// User-function registry.
#[derive(Debug, Clone, Default)]
pub struct FunctionRepos {
    pub known: BTreeMap<String, FunctionDecl>,
    /// Parametric instantiations discovered while encoding, keyed by mangled
    /// name; each is defined once per distinct type-argument tuple.
    instantiations: BTreeMap<String, (String, BTreeMap<String, AbsType>)>,
}

impl FunctionRepos {
    pub fn register(&mut self, decl: FunctionDecl) {
        self.known.insert(decl.qualified_name.clone(), decl);
    }

    pub fn record_instantiation(
        &mut self,
        mangled: String,
        qualified: String,
        binding: BTreeMap<String, AbsType>,
    ) {
        self.instantiations
            .entry(mangled)
            .or_insert((qualified, binding));
    }

    pub fn instantiations(
        &self,
    ) -> impl Iterator<Item = (&String, &(String, BTreeMap<String, AbsType>))> {
        self.instantiations.iter()
    }

    pub fn by_qualified(&self, qualified: &str) -> Option<&FunctionDecl> {
        self.known.get(qualified)
    }

    /// Looks a function up by its solver-side name.
    pub fn by_smt_name(&self, name: &str) -> Option<&FunctionDecl> {
        self.known
            .values()
            .find(|d| smt_function_name(&d.qualified_name) == name)
    }

    /// Parametric functions are type-parameterized and contract-free; they
    /// are concretized per instantiation instead of declared once.
    pub fn is_parametric(&self, smt_name: &str) -> bool {
        self.by_smt_name(smt_name)
            .map(|d| !d.type_params.is_empty() && !d.has_contract())
            .unwrap_or(false)
    }

    /// Derives the type-parameter instantiation of a call from the concrete
    /// argument types.
    pub fn type_param_binding(
        decl: &FunctionDecl,
        arg_types: &[AbsType],
    ) -> Result<BTreeMap<String, AbsType>> {
        let mut map = BTreeMap::new();
        for ((_, declared), actual) in decl.params.iter().zip(arg_types.iter()) {
            unify(declared, actual, &mut map);
        }
        let mut binding = BTreeMap::new();
        for param in &decl.type_params {
            match map.get(param) {
                Some(ty) => {
                    binding.insert(param.clone(), ty.clone());
                }
                None => {
                    return Err(ProverError::ParameterTypeTranslation(format!(
                        "type parameter `{}` of `{}` cannot be resolved from the call",
                        param, decl.qualified_name
                    )))
                }
            }
        }
        Ok(binding)
    }

    /// Mangled solver name of a parametric-function instantiation:
    /// `<base>_<type>..` over the resolved type parameters in declaration
    /// order.
    pub fn concretized_name(decl: &FunctionDecl, binding: &BTreeMap<String, AbsType>) -> String {
        let base = smt_function_name(&decl.qualified_name);
        let suffix = decl
            .type_params
            .iter()
            .filter_map(|p| binding.get(p))
            .map(AbsType::generic_sort_name)
            .collect::<Vec<_>>()
            .join("_");
        format!("{base}_{suffix}")
    }
}

fn unify(declared: &AbsType, actual: &AbsType, map: &mut BTreeMap<String, AbsType>) {
    match (declared, actual) {
        (AbsType::Param(name) | AbsType::Bounded(name), _) => {
            map.entry(name.clone()).or_insert_with(|| actual.clone());
        }
        (AbsType::Data { args: da, .. }, AbsType::Data { args: aa, .. }) => {
            for (d, a) in da.iter().zip(aa.iter()) {
                unify(d, a, map);
            }
        }
        (AbsType::Future(d), AbsType::Future(a)) => unify(d, a, map),
        _ => {}
    }
}

/// Per-run state threaded through translation, pattern compilation, and
/// encoding.
#[derive(Debug, Clone, Default)]
pub struct Session {
    counter: usize,
    pp_counter: usize,
    /// Placeholder variables resolved to selector chains during pattern
    /// compilation; scoped per top-level case.
    pub placeholders: BTreeMap<ProgVar, Term>,
    pub adts: AdtRepos,
    pub functions: FunctionRepos,
}

impl Session {
    pub fn new() -> Self {
        Session {
            adts: AdtRepos::new(),
            ..Session::default()
        }
    }

    fn next(&mut self) -> usize {
        self.counter += 1;
        self.counter
    }

    pub fn fresh_var(&mut self, ty: AbsType) -> ProgVar {
        ProgVar::new(format!("_v{}", self.next()), ty)
    }

    pub fn fresh_placeholder(&mut self, ty: AbsType) -> ProgVar {
        ProgVar {
            name: format!("_ph{}", self.next()),
            ty,
            kind: VarKind::Placeholder,
        }
    }

    pub fn fresh_wildcard_var(&mut self, ty: AbsType) -> ProgVar {
        ProgVar {
            name: format!("_w{}", self.next()),
            ty,
            kind: VarKind::WildCard,
        }
    }

    /// Fresh object identifier for a `new C(..)` site. The `NEW` prefix
    /// marks the symbol as an object function for the encoder.
    pub fn fresh_object(&mut self, class_simple_name: &str) -> String {
        format!("NEW{}_{}", self.next(), class_simple_name)
    }

    pub fn fresh_pp(&mut self) -> usize {
        self.pp_counter += 1;
        self.pp_counter
    }

    pub fn reset_placeholders(&mut self) {
        self.placeholders.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_decl() -> DataTypeDecl {
        DataTypeDecl {
            qualified_name: "ABS.StdLib.Pair".into(),
            type_params: vec!["A".into(), "B".into()],
            constructors: vec![ConstructorDecl {
                name: "ABS.StdLib.Pair".into(),
                args: vec![AbsType::Param("A".into()), AbsType::Param("B".into())],
            }],
        }
    }

    #[test]
    fn generic_instantiations_deduplicate_structurally() {
        let mut adts = AdtRepos::new();
        adts.register_data_type(pair_decl());
        let pair = AbsType::data_with("ABS.StdLib.Pair", vec![AbsType::Int, AbsType::Bool]);
        adts.add_generic(&pair);
        adts.add_generic(&pair.clone());
        assert_eq!(adts.concrete_generics().count(), 1);
        assert!(adts.is_known_generic(&pair));
    }

    #[test]
    fn nested_generic_registers_inner_instantiation() {
        let mut adts = AdtRepos::new();
        adts.register_data_type(pair_decl());
        adts.register_data_type(DataTypeDecl {
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
        let pair = AbsType::data_with("ABS.StdLib.Pair", vec![AbsType::Int, AbsType::Bool]);
        let list_of_pairs = AbsType::data_with("ABS.StdLib.List", vec![pair.clone()]);
        adts.add_generic(&list_of_pairs);
        assert!(adts.is_known_generic(&pair));
        assert!(adts.is_known_generic(&list_of_pairs));
        assert_eq!(adts.concrete_generics().count(), 2);
    }

    #[test]
    fn lib_prefix_families() {
        let mut adts = AdtRepos::new();
        adts.register_data_type(DataTypeDecl {
            qualified_name: "M.Color".into(),
            type_params: vec![],
            constructors: vec![],
        });
        assert_eq!(adts.lib_prefix(&AbsType::Int).unwrap(), "ABS.StdLib.Int");
        assert_eq!(adts.lib_prefix(&AbsType::data("M.Color")).unwrap(), "M.Color");
        assert_eq!(
            adts.lib_prefix(&AbsType::Interface("M.I".into())).unwrap(),
            "ABS.StdLib.Int"
        );
        assert_eq!(
            adts.lib_prefix(&AbsType::Param("A".into())).unwrap(),
            "UNBOUND"
        );
        assert!(adts.lib_prefix(&AbsType::Unknown).is_err());
    }

    #[test]
    fn smt_function_names() {
        assert_eq!(smt_function_name("ABS.StdLib.abs"), "abs");
        assert_eq!(smt_function_name("M.Lib.f"), "M-Lib-f");
    }

    #[test]
    fn parametric_binding_from_call_site() {
        let decl = FunctionDecl {
            qualified_name: "M.head".into(),
            type_params: vec!["A".into()],
            params: vec![(
                "xs".into(),
                AbsType::data_with("ABS.StdLib.List", vec![AbsType::Param("A".into())]),
            )],
            result: AbsType::Param("A".into()),
            body: Exp::Null,
            requires: None,
            ensures: None,
        };
        let binding = FunctionRepos::type_param_binding(
            &decl,
            &[AbsType::data_with("ABS.StdLib.List", vec![AbsType::Int])],
        )
        .unwrap();
        assert_eq!(binding["A"], AbsType::Int);
        assert_eq!(
            FunctionRepos::concretized_name(&decl, &binding),
            "M-head_ABS.StdLib.Int"
        );
        assert!(FunctionRepos::type_param_binding(&decl, &[]).is_err());
    }
}
