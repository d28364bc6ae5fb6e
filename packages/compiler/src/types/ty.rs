//! Type Model
//!
//! The normalized DSL type lattice: canonical named types with generics,
//! tuples, records, function shapes for closure targets, generics
//! placeholders and the dynamic top. Host-language spellings are aliased
//! onto the canonical set before any comparison.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical DSL types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeName {
    Boolean,
    Integer,
    Float,
    String,
    Duration,
    MemoryUnit,
    Path,
    List,
    Set,
    Map,
    Bag,
    Iterable,
    Channel,
    Value,
    Regex,
}

impl TypeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeName::Boolean => "Boolean",
            TypeName::Integer => "Integer",
            TypeName::Float => "Float",
            TypeName::String => "String",
            TypeName::Duration => "Duration",
            TypeName::MemoryUnit => "MemoryUnit",
            TypeName::Path => "Path",
            TypeName::List => "List",
            TypeName::Set => "Set",
            TypeName::Map => "Map",
            TypeName::Bag => "Bag",
            TypeName::Iterable => "Iterable",
            TypeName::Channel => "Channel",
            TypeName::Value => "Value",
            TypeName::Regex => "Regex",
        }
    }
}

/// Normalize a written type name onto the canonical set.
pub fn normalize_name(name: &str) -> Option<TypeName> {
    let short = name.rsplit('.').next().unwrap_or(name);
    match short {
        "Boolean" | "boolean" | "bool" => Some(TypeName::Boolean),
        "Integer" | "int" | "long" | "Long" | "short" | "Short" | "BigInteger" => {
            Some(TypeName::Integer)
        }
        "Float" | "float" | "double" | "Double" | "BigDecimal" | "Number" => {
            Some(TypeName::Float)
        }
        "String" | "GString" | "CharSequence" => Some(TypeName::String),
        "Duration" => Some(TypeName::Duration),
        "MemoryUnit" => Some(TypeName::MemoryUnit),
        "Path" | "File" => Some(TypeName::Path),
        "List" | "ArrayList" => Some(TypeName::List),
        "Set" | "HashSet" | "LinkedHashSet" => Some(TypeName::Set),
        "Map" | "HashMap" | "LinkedHashMap" => Some(TypeName::Map),
        "Bag" => Some(TypeName::Bag),
        "Iterable" | "Collection" => Some(TypeName::Iterable),
        "Channel" | "DataflowWriteChannel" | "DataflowReadChannel" => Some(TypeName::Channel),
        "Value" | "DataflowVariable" => Some(TypeName::Value),
        "Pattern" | "Regex" => Some(TypeName::Regex),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    /// Unknown; assignable in both directions.
    Dynamic,
    /// Unresolved generics parameter.
    Placeholder(String),
    Tuple(Vec<Type>),
    /// Structurally-named tuple, e.g. multi-output process returns.
    Record(Vec<(String, Type)>),
    /// Functional-interface shape targeted by closures.
    Function { params: Vec<Type>, ret: Box<Type> },
    Named { name: TypeName, args: Vec<Type>, nullable: bool },
}

impl Type {
    pub fn named(name: TypeName) -> Type {
        Type::Named { name, args: Vec::new(), nullable: false }
    }

    pub fn of(name: TypeName, args: Vec<Type>) -> Type {
        Type::Named { name, args, nullable: false }
    }

    pub fn placeholder(name: &str) -> Type {
        Type::Placeholder(name.to_string())
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Type {
        Type::Function { params, ret: Box::new(ret) }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Type::Dynamic)
    }

    pub fn is(&self, name: TypeName) -> bool {
        matches!(self, Type::Named { name: n, .. } if *n == name)
    }

    pub fn type_args(&self) -> &[Type] {
        match self {
            Type::Named { args, .. } => args,
            _ => &[],
        }
    }

    /// First generic argument, `Dynamic` when absent.
    pub fn item_type(&self) -> Type {
        self.type_args().first().cloned().unwrap_or(Type::Dynamic)
    }

    pub fn with_nullable(self) -> Type {
        match self {
            Type::Named { name, args, .. } => Type::Named { name, args, nullable: true },
            other => other,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Dynamic => write!(f, "?"),
            Type::Placeholder(name) => write!(f, "{}", name),
            Type::Tuple(elements) => {
                write!(f, "(")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            Type::Record(fields) => {
                write!(f, "Record(")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                write!(f, ")")
            }
            Type::Function { params, ret } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            Type::Named { name, args, nullable } => {
                write!(f, "{}", name.as_str())?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    write!(f, ">")?;
                }
                if *nullable {
                    write!(f, "?")?;
                }
                Ok(())
            }
        }
    }
}

/// Direct supertype edges of the normalized lattice.
fn is_supertype(target: TypeName, source: TypeName) -> bool {
    match target {
        TypeName::Iterable => matches!(
            source,
            TypeName::List | TypeName::Set | TypeName::Bag | TypeName::Channel
        ),
        // Restricted numeric widening.
        TypeName::Float => source == TypeName::Integer,
        // Paths, durations and memory sizes are habitually written as
        // strings in scripts and configs.
        TypeName::Path | TypeName::Duration | TypeName::MemoryUnit => {
            source == TypeName::String
        }
        _ => false,
    }
}

/// `target ← source` assignability.
pub fn assignable(target: &Type, source: &Type) -> bool {
    match (target, source) {
        (Type::Dynamic, _) | (_, Type::Dynamic) => true,
        (Type::Placeholder(_), _) | (_, Type::Placeholder(_)) => true,
        (t, s) if t == s => true,
        (Type::Tuple(t), Type::Tuple(s)) => {
            t.len() == s.len() && t.iter().zip(s).all(|(a, b)| assignable(a, b))
        }
        (Type::Record(t), Type::Record(s)) => t.iter().all(|(name, ty)| {
            s.iter()
                .find(|(n, _)| n == name)
                .map(|(_, sty)| assignable(ty, sty))
                .unwrap_or(false)
        }),
        (Type::Function { params: tp, ret: tr }, Type::Function { params: sp, ret: sr }) => {
            tp.len() == sp.len()
                && tp.iter().zip(sp).all(|(a, b)| assignable(b, a))
                && assignable(tr, sr)
        }
        (
            Type::Named { name: tn, args: ta, .. },
            Type::Named { name: sn, args: sa, .. },
        ) => {
            if tn == sn {
                // Parameter-by-parameter generics check; a bare target
                // accepts any instantiation.
                return ta.is_empty()
                    || sa.is_empty()
                    || (ta.len() == sa.len()
                        && ta.iter().zip(sa).all(|(a, b)| assignable(a, b)));
            }
            is_supertype(*tn, *sn)
        }
        _ => false,
    }
}

/// Generics bindings collected while matching arguments to parameters.
pub type Bindings = HashMap<String, Type>;

/// Connect placeholders in `param` to the concrete shapes of `arg`,
/// covariantly, descending into generics arguments. First binding wins.
pub fn connect(param: &Type, arg: &Type, bindings: &mut Bindings) {
    match (param, arg) {
        (Type::Placeholder(name), concrete) => {
            if !concrete.is_dynamic() {
                bindings.entry(name.clone()).or_insert_with(|| concrete.clone());
            }
        }
        (Type::Named { args: pa, .. }, Type::Named { args: aa, .. }) => {
            for (p, a) in pa.iter().zip(aa.iter()) {
                connect(p, a, bindings);
            }
        }
        (Type::Tuple(ps), Type::Tuple(aas)) => {
            for (p, a) in ps.iter().zip(aas.iter()) {
                connect(p, a, bindings);
            }
        }
        (Type::Function { params: pp, ret: pr }, Type::Function { params: ap, ret: ar }) => {
            for (p, a) in pp.iter().zip(ap.iter()) {
                connect(p, a, bindings);
            }
            connect(pr, ar, bindings);
        }
        (Type::Record(pf), Type::Record(af)) => {
            for (name, p) in pf {
                if let Some((_, a)) = af.iter().find(|(n, _)| n == name) {
                    connect(p, a, bindings);
                }
            }
        }
        _ => {}
    }
}

/// Apply collected bindings; unbound placeholders degrade to dynamic.
pub fn substitute(ty: &Type, bindings: &Bindings) -> Type {
    match ty {
        Type::Placeholder(name) => bindings.get(name).cloned().unwrap_or(Type::Dynamic),
        Type::Dynamic => Type::Dynamic,
        Type::Tuple(elements) => {
            Type::Tuple(elements.iter().map(|e| substitute(e, bindings)).collect())
        }
        Type::Record(fields) => Type::Record(
            fields
                .iter()
                .map(|(n, t)| (n.clone(), substitute(t, bindings)))
                .collect(),
        ),
        Type::Function { params, ret } => Type::Function {
            params: params.iter().map(|p| substitute(p, bindings)).collect(),
            ret: Box::new(substitute(ret, bindings)),
        },
        Type::Named { name, args, nullable } => Type::Named {
            name: *name,
            args: args.iter().map(|a| substitute(a, bindings)).collect(),
            nullable: *nullable,
        },
    }
}
