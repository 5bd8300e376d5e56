// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Source-language types as seen by the logic engine.
//!
//! Every type that can flow into a proof obligation is a value of [`AbsType`].
//! Types are compared structurally; `Data` carries its qualified name plus
//! type arguments, so `List<Int>` and `List<Rat>` are distinct values and a
//! generic instantiation registry can key on the type itself.

use std::collections::BTreeMap;
use std::fmt;

pub const STDLIB_PREFIX: &str = "ABS.StdLib.";

/// A fully elaborated source type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AbsType {
    Bool,
    Int,
    Float,
    Str,
    Unit,
    /// Algebraic data type, possibly with type arguments.
    Data { name: String, args: Vec<AbsType> },
    /// Interface (reference) type. Object references are modeled as `Int`
    /// at the solver level.
    Interface(String),
    Future(Box<AbsType>),
    /// An uninstantiated type parameter, e.g. the `A` of `fun<A>`.
    Param(String),
    /// A bounded placeholder that stands for "some type we never resolve";
    /// rendered as the opaque `UNBOUND` sort.
    Bounded(String),
    /// The heap sort itself. Only heap program variables carry it.
    Heap,
    Unknown,
}

impl AbsType {
    pub fn data(name: impl Into<String>) -> Self {
        AbsType::Data {
            name: name.into(),
            args: vec![],
        }
    }

    pub fn data_with(name: impl Into<String>, args: Vec<AbsType>) -> Self {
        AbsType::Data {
            name: name.into(),
            args,
        }
    }

    /// Qualified name the way the source language spells it.
    pub fn qualified_name(&self) -> String {
        match self {
            AbsType::Bool => format!("{STDLIB_PREFIX}Bool"),
            AbsType::Int => format!("{STDLIB_PREFIX}Int"),
            AbsType::Float => format!("{STDLIB_PREFIX}Float"),
            AbsType::Str => format!("{STDLIB_PREFIX}String"),
            AbsType::Unit => format!("{STDLIB_PREFIX}Unit"),
            AbsType::Data { name, .. } => name.clone(),
            AbsType::Interface(name) => name.clone(),
            AbsType::Future(_) => format!("{STDLIB_PREFIX}Fut"),
            AbsType::Param(name) => name.clone(),
            AbsType::Bounded(_) => "Unbound Type".to_string(),
            AbsType::Heap => "Heap".to_string(),
            AbsType::Unknown => "<UNKNOWN>".to_string(),
        }
    }

    /// Last segment of the qualified name.
    pub fn simple_name(&self) -> String {
        let qualified = self.qualified_name();
        qualified
            .rsplit('.')
            .next()
            .unwrap_or(&qualified)
            .to_string()
    }

    pub fn type_args(&self) -> &[AbsType] {
        match self {
            AbsType::Data { args, .. } => args,
            _ => &[],
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, AbsType::Bool)
    }

    pub fn is_interface(&self) -> bool {
        matches!(self, AbsType::Interface(_))
    }

    pub fn is_future(&self) -> bool {
        matches!(self, AbsType::Future(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, AbsType::Unknown)
    }

    /// A data type that takes type arguments.
    pub fn is_generic(&self) -> bool {
        matches!(self, AbsType::Data { args, .. } if !args.is_empty())
    }

    /// A generic data type whose arguments are all fully resolved.
    pub fn is_concrete_generic(&self) -> bool {
        self.is_generic() && !self.has_unbound() && !self.has_unknown()
    }

    pub fn has_unknown(&self) -> bool {
        self.any(&mut |t| matches!(t, AbsType::Unknown))
    }

    /// Whether any node is a type parameter or bounded placeholder.
    pub fn has_unbound(&self) -> bool {
        self.any(&mut |t| matches!(t, AbsType::Param(_) | AbsType::Bounded(_)))
    }

    /// Visits this type and every nested type argument, outside-in.
    pub fn for_each(&self, f: &mut impl FnMut(&AbsType)) {
        f(self);
        match self {
            AbsType::Data { args, .. } => {
                for arg in args {
                    arg.for_each(f);
                }
            }
            AbsType::Future(inner) => inner.for_each(f),
            _ => {}
        }
    }

    pub fn any(&self, pred: &mut impl FnMut(&AbsType) -> bool) -> bool {
        let mut found = false;
        self.for_each(&mut |t| found |= pred(t));
        found
    }

    /// Collects every nested type matching `pred`, outside-in.
    pub fn collect(&self, pred: impl Fn(&AbsType) -> bool) -> Vec<AbsType> {
        let mut out = Vec::new();
        self.for_each(&mut |t| {
            if pred(t) {
                out.push(t.clone());
            }
        });
        out
    }

    /// Substitutes `Param`/`Bounded` occurrences by their bound types.
    /// Names absent from the map are left as-is.
    pub fn apply_binding(&self, binding: &BTreeMap<String, AbsType>) -> AbsType {
        match self {
            AbsType::Param(name) | AbsType::Bounded(name) => binding
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            AbsType::Data { name, args } => AbsType::Data {
                name: name.clone(),
                args: args.iter().map(|a| a.apply_binding(binding)).collect(),
            },
            AbsType::Future(inner) => AbsType::Future(Box::new(inner.apply_binding(binding))),
            _ => self.clone(),
        }
    }

    /// Sort name of a concrete-generic instantiation, e.g.
    /// `ABS.StdLib.Pair_ABS.StdLib.Int_ABS.StdLib.Bool`.
    pub fn generic_sort_name(&self) -> String {
        match self {
            AbsType::Data { name, args } if !args.is_empty() => {
                let mut out = name.clone();
                for arg in args {
                    out.push('_');
                    out.push_str(&arg.generic_sort_name());
                }
                out
            }
            _ => self.qualified_name(),
        }
    }

    /// Mangling suffix used for constructor/selector names of this
    /// instantiation: the sort names of the type arguments, `_`-joined.
    pub fn generic_suffix(&self) -> String {
        self.type_args()
            .iter()
            .map(|a| a.generic_sort_name())
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for AbsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbsType::Data { name, args } if !args.is_empty() => {
                write!(f, "{}<", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            AbsType::Future(inner) => write!(f, "Fut<{inner}>"),
            _ => write!(f, "{}", self.qualified_name()),
        }
    }
}

/// Mangled constructor name for a constructor of a generic instantiation,
/// e.g. `ABS.StdLib.Cons` at `List<Int>` becomes
/// `ABS.StdLib.Cons_ABS.StdLib.Int_ABS.StdLib.List_ABS.StdLib.Int`.
/// Non-generic types leave the name untouched.
pub fn generic_constructor_name(constructor: &str, ty: &AbsType) -> String {
    if ty.is_concrete_generic() {
        format!("{}_{}", constructor, ty.generic_suffix())
    } else {
        constructor.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_int_bool() -> AbsType {
        AbsType::data_with(
            "ABS.StdLib.Pair",
            vec![AbsType::Int, AbsType::Bool],
        )
    }

    #[test]
    fn generic_predicates() {
        let list_a = AbsType::data_with("ABS.StdLib.List", vec![AbsType::Param("A".into())]);
        assert!(list_a.is_generic());
        assert!(!list_a.is_concrete_generic());
        assert!(list_a.has_unbound());
        assert!(pair_int_bool().is_concrete_generic());
        assert!(!AbsType::Int.is_generic());
    }

    #[test]
    fn binding_application() {
        let list_a = AbsType::data_with("ABS.StdLib.List", vec![AbsType::Param("A".into())]);
        let binding = BTreeMap::from([("A".to_string(), AbsType::Int)]);
        let bound = list_a.apply_binding(&binding);
        assert_eq!(
            bound,
            AbsType::data_with("ABS.StdLib.List", vec![AbsType::Int])
        );
        assert!(bound.is_concrete_generic());
    }

    #[test]
    fn sort_name_mangling() {
        assert_eq!(
            pair_int_bool().generic_sort_name(),
            "ABS.StdLib.Pair_ABS.StdLib.Int_ABS.StdLib.Bool"
        );
        let nested = AbsType::data_with("ABS.StdLib.List", vec![pair_int_bool()]);
        assert_eq!(
            nested.generic_sort_name(),
            "ABS.StdLib.List_ABS.StdLib.Pair_ABS.StdLib.Int_ABS.StdLib.Bool"
        );
    }

    #[test]
    fn constructor_mangling_only_for_concrete_generics() {
        assert_eq!(
            generic_constructor_name("ABS.StdLib.Pair", &pair_int_bool()),
            "ABS.StdLib.Pair_ABS.StdLib.Int_ABS.StdLib.Bool"
        );
        assert_eq!(
            generic_constructor_name("ABS.StdLib.True", &AbsType::Bool),
            "ABS.StdLib.True"
        );
    }
}
