use serde::{Deserialize, Serialize};
use std::fmt;

use triogui_dataset::Value;

/// Declared type of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Str,
    Int,
    Float,
    Bool,
    /// Fixed-choice enumeration
    Choice(Vec<String>),
    /// A schema class, possibly abstract
    Class(String),
    List(Box<TypeRef>),
    Optional(Box<TypeRef>),
}

impl TypeRef {
    pub fn class(name: impl Into<String>) -> Self {
        TypeRef::Class(name.into())
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn optional(inner: TypeRef) -> Self {
        TypeRef::Optional(Box::new(inner))
    }

    /// `(element type, is list)`: optional wrappers removed, then one list level.
    ///
    /// `list<list<float>>` is a list whose elements are `list<float>`.
    pub fn normalized(&self) -> (TypeRef, bool) {
        match self.required() {
            TypeRef::List(inner) => (inner.required().clone(), true),
            other => (other.clone(), false),
        }
    }

    /// The type with every optional wrapper stripped
    pub fn required(&self) -> &TypeRef {
        match self {
            TypeRef::Optional(inner) => inner.required(),
            other => other,
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            TypeRef::Str | TypeRef::Int | TypeRef::Float | TypeRef::Bool | TypeRef::Choice(_)
        )
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeRef::Class(name) => Some(name),
            _ => None,
        }
    }

    /// Whether a present value has the shape this type describes.
    ///
    /// Class membership is not checked here; that needs the oracle.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeRef::Optional(inner), v) => inner.admits(v),
            (TypeRef::Str, Value::Str(_)) => true,
            (TypeRef::Int, Value::Int(_)) => true,
            (TypeRef::Float, Value::Float(_) | Value::Int(_)) => true,
            (TypeRef::Bool, Value::Bool(_)) => true,
            (TypeRef::Choice(_), Value::Choice(_) | Value::Str(_)) => true,
            (TypeRef::Class(_), Value::Object(_)) => true,
            (TypeRef::List(inner), Value::List(items)) => items.iter().all(|v| inner.admits(v)),
            _ => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Str => write!(f, "str"),
            TypeRef::Int => write!(f, "int"),
            TypeRef::Float => write!(f, "float"),
            TypeRef::Bool => write!(f, "bool"),
            TypeRef::Choice(options) => write!(f, "choice({})", options.join("|")),
            TypeRef::Class(name) => write!(f, "{}", name),
            TypeRef::List(inner) => write!(f, "list<{}>", inner),
            TypeRef::Optional(inner) => write!(f, "{}?", inner),
        }
    }
}

/// Field metadata as the schema declares it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default)]
    pub description: String,

    /// Alternative spellings accepted when looking the field up
    #[serde(default)]
    pub synonyms: Vec<String>,

    /// Value set on instantiation; `None` leaves the field absent
    #[serde(default)]
    pub default: Option<Value>,
}

impl FieldMeta {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            description: String::new(),
            synonyms: Vec::new(),
            default: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.push(synonym.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn is_list(&self) -> bool {
        self.ty.normalized().1
    }

    pub fn is_optional(&self) -> bool {
        matches!(self.ty, TypeRef::Optional(_))
    }

    /// Name or synonym match, ignoring ASCII case
    pub fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.synonyms.iter().any(|s| s.eq_ignore_ascii_case(name))
    }
}
