use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A node value inside a dataset.
///
/// Absence is never a variant: an unset field is `None` in its parent
/// [`Object`], so every `Value` is a present value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// A literal out of a fixed-choice enumeration
    Choice(String),
    Object(Object),
    List(Vec<Value>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Choice(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Runtime type of an object value
    pub fn type_name(&self) -> Option<&str> {
        self.as_object().map(|obj| obj.type_name.as_str())
    }

    /// Scalars serialize as a single token
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Object(_) | Value::List(_))
    }

    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "str",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Choice(_) => "choice",
            Value::Object(_) => "object",
            Value::List(_) => "list",
        }
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

/// A composite value: a concrete type name and its ordered fields.
///
/// Field order follows the schema that instantiated the object, which is
/// also the order fields are written back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub type_name: String,
    #[serde(default)]
    pub fields: IndexMap<String, Option<Value>>,
}

impl Object {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field assignment
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), Some(value));
        self
    }

    /// Builder-style declaration of an unset field
    pub fn with_absent(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), None);
        self
    }

    /// Present value of a field (`None` when unset or unknown)
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name).and_then(Option::as_mut)
    }

    /// Slot of a field, creating an empty one for a name not seen yet
    pub fn slot_mut(&mut self, name: &str) -> &mut Option<Value> {
        self.fields.entry(name.to_string()).or_insert(None)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Option<Value>) {
        self.fields.insert(name.into(), value);
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Fields that currently hold a value, in order
    pub fn present(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.as_str(), v)))
    }

    pub fn is_blank(&self) -> bool {
        self.present().next().is_none()
    }
}
