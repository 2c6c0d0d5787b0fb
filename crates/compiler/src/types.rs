//! The type lattice
//!
//! Containers are monomorphic after semantic analysis. `Any` enters only
//! at module boundaries (`json.loads`, argparse result dicts, heap
//! operations over caller-chosen element types) and joins with everything.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Float,
    Bool,
    Str,
    Bytes,
    NoneType,
    List(Box<Type>),
    Dict(Box<Type>, Box<Type>),
    Set(Box<Type>),
    Tuple(Vec<Type>),
    Optional(Box<Type>),
    Any,
    /// An imported module name, usable only for attribute access.
    Module(String),
    /// A user-defined function, usable only in call position.
    Func(String),
    /// Opaque runtime handles keyed by kind.
    Handle(HandleKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Match,
    ArgParser,
    DefaultDict,
    Namespace,
    Array,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Bool => write!(f, "bool"),
            Type::Str => write!(f, "str"),
            Type::Bytes => write!(f, "bytes"),
            Type::NoneType => write!(f, "None"),
            Type::List(t) => write!(f, "list[{}]", t),
            Type::Dict(k, v) => write!(f, "dict[{}, {}]", k, v),
            Type::Set(t) => write!(f, "set[{}]", t),
            Type::Tuple(ts) => {
                write!(f, "tuple[")?;
                for (i, t) in ts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, "]")
            }
            Type::Optional(t) => write!(f, "{} | None", t),
            Type::Any => write!(f, "Any"),
            Type::Module(name) => write!(f, "module '{}'", name),
            Type::Func(name) => write!(f, "function '{}'", name),
            Type::Handle(kind) => write!(f, "handle[{:?}]", kind),
        }
    }
}

impl Type {
    pub fn list_of(t: Type) -> Type {
        Type::List(Box::new(t))
    }

    pub fn dict_of(k: Type, v: Type) -> Type {
        Type::Dict(Box::new(k), Box::new(v))
    }

    pub fn set_of(t: Type) -> Type {
        Type::Set(Box::new(t))
    }

    pub fn optional(t: Type) -> Type {
        Type::Optional(Box::new(t))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float | Type::Bool | Type::Any)
    }

    pub fn is_sized(&self) -> bool {
        matches!(
            self,
            Type::Str
                | Type::Bytes
                | Type::List(_)
                | Type::Dict(..)
                | Type::Set(_)
                | Type::Tuple(_)
                | Type::Any
        )
    }

    /// The least upper bound of two types, used for container literals,
    /// conditional expressions and `and`/`or` chains. Unrelated types join
    /// to Any; Int and Float join to Float.
    pub fn join(&self, other: &Type) -> Type {
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (Type::Any, _) | (_, Type::Any) => Type::Any,
            (Type::Int, Type::Float) | (Type::Float, Type::Int) => Type::Float,
            (Type::Bool, Type::Int) | (Type::Int, Type::Bool) => Type::Int,
            (Type::NoneType, t) | (t, Type::NoneType) => Type::optional(t.clone()),
            (Type::Optional(a), Type::Optional(b)) => Type::optional(a.join(b)),
            (Type::Optional(a), b) | (b, Type::Optional(a)) => Type::optional(a.join(b)),
            (Type::List(a), Type::List(b)) => Type::list_of(a.join(b)),
            (Type::Set(a), Type::Set(b)) => Type::set_of(a.join(b)),
            (Type::Dict(ka, va), Type::Dict(kb, vb)) => Type::dict_of(ka.join(kb), va.join(vb)),
            _ => Type::Any,
        }
    }

    /// Whether a value of type `self` is acceptable where `expected` is
    /// required. Lenient across Any in either direction (dynamic values
    /// must be narrowable, and shims that take Any accept everything);
    /// Int promotes to Float.
    pub fn compatible_with(&self, expected: &Type) -> bool {
        if self == expected || matches!(self, Type::Any) || matches!(expected, Type::Any) {
            return true;
        }
        match (self, expected) {
            (Type::Int, Type::Float) | (Type::Bool, Type::Int) | (Type::Bool, Type::Float) => true,
            (Type::NoneType, Type::Optional(_)) => true,
            (t, Type::Optional(inner)) => t.compatible_with(inner),
            (Type::Optional(inner), t) => inner.compatible_with(t),
            (Type::List(a), Type::List(b)) | (Type::Set(a), Type::Set(b)) => a.compatible_with(b),
            (Type::Tuple(a), Type::List(b)) => a.iter().all(|t| t.compatible_with(b)),
            (Type::Dict(ka, va), Type::Dict(kb, vb)) => {
                ka.compatible_with(kb) && va.compatible_with(vb)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_numeric_tower() {
        assert_eq!(Type::Int.join(&Type::Float), Type::Float);
        assert_eq!(Type::Bool.join(&Type::Int), Type::Int);
        assert_eq!(Type::Int.join(&Type::Int), Type::Int);
    }

    #[test]
    fn join_with_none_is_optional() {
        assert_eq!(
            Type::Handle(HandleKind::Match).join(&Type::NoneType),
            Type::optional(Type::Handle(HandleKind::Match))
        );
    }

    #[test]
    fn join_unrelated_is_any() {
        assert_eq!(Type::Int.join(&Type::Str), Type::Any);
        assert_eq!(
            Type::list_of(Type::Int).join(&Type::list_of(Type::Str)),
            Type::list_of(Type::Any)
        );
    }

    #[test]
    fn compatibility_is_lenient_across_any() {
        assert!(Type::Any.compatible_with(&Type::Int));
        assert!(Type::Str.compatible_with(&Type::Any));
        assert!(Type::Int.compatible_with(&Type::Float));
        assert!(!Type::Str.compatible_with(&Type::Int));
        assert!(Type::list_of(Type::Int).compatible_with(&Type::list_of(Type::Any)));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Type::list_of(Type::Int).to_string(), "list[int]");
        assert_eq!(Type::dict_of(Type::Str, Type::Any).to_string(), "dict[str, Any]");
        assert_eq!(Type::optional(Type::Str).to_string(), "str | None");
    }
}
