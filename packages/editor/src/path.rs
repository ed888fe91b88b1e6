//! # Path Accessor
//!
//! Addressed reads and writes into a value tree.
//!
//! A [`Path`] is a sequence of field names and list indices relative to an
//! anchor's root object, written `milieu.rho` or `sondes[1].points[0]`.
//!
//! ## Semantics
//!
//! - field steps answer to synonyms; every accessor resolves them through
//!   the schema to the canonical field name
//! - `get` fails with [`PathError::BrokenPath`] when an *intermediate* step
//!   is absent, and yields `Ok(None)` when only the final step is
//! - `set` materializes absent intermediates from the schema (a default
//!   instance, or a one-element list for list fields) before writing
//! - `set` with an absent value touches nothing
//! - lists are never auto-extended; append before setting a new index

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use triogui_dataset::{Object, Value};
use triogui_schema::{SchemaError, SchemaOracle, TypeRef};

pub type PathResult<T> = Result<T, PathError>;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Broken path {path}: nothing at '{step}'")]
    BrokenPath { path: String, step: String },

    #[error("Index {index} out of range at {path} (len {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("{path} is not an object")]
    NotAComposite { path: String },

    #[error("{path} is not a list")]
    NotAList { path: String },

    #[error("{path} expects {expected}, got {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Invalid path syntax: {0}")]
    InvalidSyntax(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Field(String),
    Index(usize),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Field(name) => write!(f, "{}", name),
            Step::Index(i) => write!(f, "[{}]", i),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<Step>);

impl Path {
    /// The anchor's root object
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.0.push(Step::Field(name.into()));
        self
    }

    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Step::Index(i));
        self
    }

    /// Copy of this path extended by one step
    pub fn join(&self, step: Step) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Step> {
        self.0.last()
    }

    /// Path of the first `n` steps
    pub fn prefix(&self, n: usize) -> Self {
        Self(self.0[..n.min(self.0.len())].to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, step) in self.0.iter().enumerate() {
            match step {
                Step::Field(name) if i > 0 => write!(f, ".{}", name)?,
                other => write!(f, "{}", other)?,
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "<root>" {
            return Ok(Path::root());
        }

        let mut steps = Vec::new();
        for segment in s.split('.') {
            let (name, mut rest) = match segment.find('[') {
                Some(at) => segment.split_at(at),
                None => (segment, ""),
            };
            // Only a leading segment may start with an index
            if name.is_empty() && (!steps.is_empty() || rest.is_empty()) {
                return Err(PathError::InvalidSyntax(s.to_string()));
            }
            if !name.is_empty() {
                steps.push(Step::Field(name.to_string()));
            }
            while let Some(stripped) = rest.strip_prefix('[') {
                let close = stripped
                    .find(']')
                    .ok_or_else(|| PathError::InvalidSyntax(s.to_string()))?;
                let index = stripped[..close]
                    .parse()
                    .map_err(|_| PathError::InvalidSyntax(s.to_string()))?;
                steps.push(Step::Index(index));
                rest = &stripped[close + 1..];
            }
            if !rest.is_empty() {
                return Err(PathError::InvalidSyntax(s.to_string()));
            }
        }
        Ok(Path(steps))
    }
}

/// Read the value at `path`.
///
/// `Ok(None)` means the final step exists in its parent but holds nothing.
pub fn get<'a, S: SchemaOracle + ?Sized>(
    schema: &S,
    root: &'a Value,
    path: &Path,
) -> PathResult<Option<&'a Value>> {
    let Some((last, parents)) = path.steps().split_last() else {
        return Ok(Some(root));
    };

    let mut current = root;
    for (depth, step) in parents.iter().enumerate() {
        current = match child(schema, current, step, path, depth)? {
            Some(value) => value,
            None => {
                return Err(PathError::BrokenPath {
                    path: path.to_string(),
                    step: path.prefix(depth + 1).to_string(),
                })
            }
        };
    }
    child(schema, current, last, path, parents.len())
}

/// Mutable access; every step must hold a value
pub fn get_mut<'a, S: SchemaOracle + ?Sized>(
    schema: &S,
    root: &'a mut Value,
    path: &Path,
) -> PathResult<&'a mut Value> {
    let mut current = root;
    for (depth, step) in path.steps().iter().enumerate() {
        current = child_mut(schema, current, step, path, depth)?;
    }
    Ok(current)
}

/// Write `value` at `path`, materializing absent intermediates.
///
/// Returns whether anything was written.
pub fn set<S: SchemaOracle + ?Sized>(
    schema: &S,
    root: &mut Value,
    path: &Path,
    value: Option<Value>,
) -> PathResult<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    let Some((last, parents)) = path.steps().split_last() else {
        *root = value;
        return Ok(true);
    };

    let mut current = root;
    let mut declared: Option<TypeRef> = None;
    for (depth, step) in parents.iter().enumerate() {
        let (next, ty) = materialized_child(schema, current, step, declared.as_ref(), path, depth)?;
        current = next;
        declared = ty;
    }

    let depth = parents.len();
    match last {
        Step::Field(name) => {
            let obj = current.as_object_mut().ok_or_else(|| PathError::NotAComposite {
                path: path.prefix(depth).to_string(),
            })?;
            let meta = schema.field(&obj.type_name, name)?;
            check_admits(schema, &meta.ty, &value, path)?;
            let key = meta.name.clone();
            obj.set(key, Some(value));
        }
        Step::Index(i) => {
            let element = declared.as_ref().map(|ty| ty.normalized().0);
            if let Some(element) = &element {
                check_admits(schema, element, &value, path)?;
            }
            let items = current.as_list_mut().ok_or_else(|| PathError::NotAList {
                path: path.prefix(depth).to_string(),
            })?;
            let len = items.len();
            let slot = items.get_mut(*i).ok_or_else(|| PathError::IndexOutOfRange {
                path: path.prefix(depth).to_string(),
                index: *i,
                len,
            })?;
            *slot = value;
        }
    }
    Ok(true)
}

fn child<'a, S: SchemaOracle + ?Sized>(
    schema: &S,
    value: &'a Value,
    step: &Step,
    path: &Path,
    depth: usize,
) -> PathResult<Option<&'a Value>> {
    match step {
        Step::Field(name) => {
            let obj = value.as_object().ok_or_else(|| PathError::NotAComposite {
                path: path.prefix(depth).to_string(),
            })?;
            Ok(obj.get(field_key(schema, obj, name)?))
        }
        Step::Index(i) => {
            let items = value.as_list().ok_or_else(|| PathError::NotAList {
                path: path.prefix(depth).to_string(),
            })?;
            items
                .get(*i)
                .map(Some)
                .ok_or_else(|| PathError::IndexOutOfRange {
                    path: path.prefix(depth).to_string(),
                    index: *i,
                    len: items.len(),
                })
        }
    }
}

fn child_mut<'a, S: SchemaOracle + ?Sized>(
    schema: &S,
    value: &'a mut Value,
    step: &Step,
    path: &Path,
    depth: usize,
) -> PathResult<&'a mut Value> {
    match step {
        Step::Field(name) => {
            let obj = value.as_object_mut().ok_or_else(|| PathError::NotAComposite {
                path: path.prefix(depth).to_string(),
            })?;
            let key = field_key(schema, obj, name)?;
            obj.get_mut(key).ok_or_else(|| PathError::BrokenPath {
                path: path.to_string(),
                step: path.prefix(depth + 1).to_string(),
            })
        }
        Step::Index(i) => {
            let items = value.as_list_mut().ok_or_else(|| PathError::NotAList {
                path: path.prefix(depth).to_string(),
            })?;
            let len = items.len();
            items.get_mut(*i).ok_or_else(|| PathError::IndexOutOfRange {
                path: path.prefix(depth).to_string(),
                index: *i,
                len,
            })
        }
    }
}

fn field_key<'s, S: SchemaOracle + ?Sized>(
    schema: &'s S,
    obj: &Object,
    name: &str,
) -> PathResult<&'s str> {
    Ok(&schema.field(&obj.type_name, name)?.name)
}

/// Step into a child for writing, creating it from the schema when absent
fn materialized_child<'a, S: SchemaOracle + ?Sized>(
    schema: &S,
    value: &'a mut Value,
    step: &Step,
    declared: Option<&TypeRef>,
    path: &Path,
    depth: usize,
) -> PathResult<(&'a mut Value, Option<TypeRef>)> {
    match step {
        Step::Field(name) => {
            let obj = value.as_object_mut().ok_or_else(|| PathError::NotAComposite {
                path: path.prefix(depth).to_string(),
            })?;
            let meta = schema.field(&obj.type_name, name)?;
            let key = meta.name.clone();
            let ty = meta.ty.clone();

            let slot = obj.slot_mut(&key);
            if slot.is_none() {
                let (element, is_list) = ty.normalized();
                let fresh = schema.default_for(&element)?;
                tracing::debug!(
                    "[PathAccessor] materialize {} as {}",
                    path.prefix(depth + 1),
                    ty
                );
                *slot = Some(if is_list { Value::List(vec![fresh]) } else { fresh });
            }
            match slot.as_mut() {
                Some(child) => Ok((child, Some(ty))),
                None => Err(PathError::BrokenPath {
                    path: path.to_string(),
                    step: path.prefix(depth + 1).to_string(),
                }),
            }
        }
        Step::Index(i) => {
            let element = declared.map(|ty| ty.normalized().0);
            let items = value.as_list_mut().ok_or_else(|| PathError::NotAList {
                path: path.prefix(depth).to_string(),
            })?;
            let len = items.len();
            let child = items.get_mut(*i).ok_or_else(|| PathError::IndexOutOfRange {
                path: path.prefix(depth).to_string(),
                index: *i,
                len,
            })?;
            Ok((child, element))
        }
    }
}

fn check_admits<S: SchemaOracle + ?Sized>(
    schema: &S,
    ty: &TypeRef,
    value: &Value,
    path: &Path,
) -> PathResult<()> {
    if admits(schema, ty, value) {
        Ok(())
    } else {
        Err(PathError::TypeMismatch {
            path: path.to_string(),
            expected: ty.to_string(),
            found: value
                .type_name()
                .map(str::to_string)
                .unwrap_or_else(|| value.kind().to_string()),
        })
    }
}

/// Shape check that also holds class values to the declared base, at any list depth
fn admits<S: SchemaOracle + ?Sized>(schema: &S, ty: &TypeRef, value: &Value) -> bool {
    match (ty.required(), value) {
        (TypeRef::List(inner), Value::List(items)) => {
            items.iter().all(|item| admits(schema, inner, item))
        }
        (TypeRef::Class(base), Value::Object(obj)) => schema.is_subtype(&obj.type_name, base),
        (other, value) => other.admits(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triogui_schema::fixtures::trust_catalog;

    fn problem() -> Value {
        let schema = trust_catalog();
        Value::Object(schema.instantiate("Pb_conduction").unwrap())
    }

    #[test]
    fn test_path_display_and_parse() {
        let path = Path::root().field("sondes").index(2).field("points");
        assert_eq!(path.to_string(), "sondes[2].points");
        assert_eq!("sondes[2].points".parse::<Path>().unwrap(), path);
        assert_eq!("".parse::<Path>().unwrap(), Path::root());
        assert_eq!(Path::root().to_string(), "<root>");

        assert!("a[x]".parse::<Path>().is_err());
        assert!("a..b".parse::<Path>().is_err());
    }

    #[test]
    fn test_get_absent_final_step() {
        let schema = trust_catalog();
        let root = problem();
        let value = get(&schema, &root, &Path::root().field("milieu")).unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_get_through_absent_intermediate_is_broken() {
        let schema = trust_catalog();
        let root = problem();
        let err = get(&schema, &root, &Path::root().field("milieu").field("rho")).unwrap_err();
        assert!(matches!(err, PathError::BrokenPath { step, .. } if step == "milieu"));
    }

    #[test]
    fn test_set_materializes_intermediates() {
        let schema = trust_catalog();
        let mut root = problem();
        let path = Path::root().field("milieu").field("rho");

        set(&schema, &mut root, &path, Some(Value::Float(2.0))).unwrap();

        assert_eq!(get(&schema, &root, &path).unwrap(), Some(&Value::Float(2.0)));
        let milieu = get(&schema, &root, &Path::root().field("milieu")).unwrap().unwrap();
        assert_eq!(milieu.type_name(), Some("Solide"));
    }

    #[test]
    fn test_set_absent_value_is_noop() {
        let schema = trust_catalog();
        let mut root = problem();
        let before = root.clone();

        let written = set(&schema, &mut root, &Path::root().field("milieu").field("rho"), None).unwrap();

        assert!(!written);
        assert_eq!(root, before);
    }

    #[test]
    fn test_set_materializes_list_field() {
        let schema = trust_catalog();
        let mut root = problem();
        let path = Path::root()
            .field("conduction")
            .field("boundary_conditions")
            .index(0)
            .field("bord");

        set(&schema, &mut root, &path, Some(Value::str("left"))).unwrap();

        let list = get(&schema, &root, &path.prefix(2)).unwrap().unwrap();
        assert_eq!(list.as_list().map(<[Value]>::len), Some(1));
        assert_eq!(get(&schema, &root, &path).unwrap(), Some(&Value::str("left")));
    }

    #[test]
    fn test_set_never_extends_lists() {
        let schema = trust_catalog();
        let mut root = Value::Object(
            Object::new("Sonde").with("points", Value::List(vec![Value::Float(1.0)])),
        );
        let path = Path::root().field("points").index(1);

        let err = set(&schema, &mut root, &path, Some(Value::Float(2.0))).unwrap_err();
        assert!(matches!(err, PathError::IndexOutOfRange { index: 1, len: 1, .. }));

        set(&schema, &mut root, &path.prefix(1).index(0), Some(Value::Float(3.0))).unwrap();
        assert_eq!(get(&schema, &root, &path.prefix(1).index(0)).unwrap(), Some(&Value::Float(3.0)));
    }

    #[test]
    fn test_set_rejects_wrong_shape() {
        let schema = trust_catalog();
        let mut root = problem();

        let err = set(
            &schema,
            &mut root,
            &Path::root().field("milieu"),
            Some(Value::Object(Object::new("VDF"))),
        )
        .unwrap_err();
        assert!(matches!(err, PathError::TypeMismatch { .. }));

        let err = set(&schema, &mut root, &Path::root().field("nope"), Some(Value::Int(1))).unwrap_err();
        assert!(matches!(err, PathError::Schema(SchemaError::UnknownField { .. })));
    }

    #[test]
    fn test_set_root_replaces_value() {
        let schema = trust_catalog();
        let mut root = problem();
        let replacement = Value::Object(schema.instantiate("Pb_hydraulique").unwrap());

        set(&schema, &mut root, &Path::root(), Some(replacement.clone())).unwrap();
        assert_eq!(root, replacement);
    }

    #[test]
    fn test_set_field_by_synonym_uses_canonical_name() {
        let schema = trust_catalog();
        let mut root = Value::Object(schema.instantiate("Solide").unwrap());

        set(&schema, &mut root, &Path::root().field("lambda_u"), Some(Value::Float(4.0))).unwrap();
        assert_eq!(
            get(&schema, &root, &Path::root().field("lambda")).unwrap(),
            Some(&Value::Float(4.0))
        );
        assert_eq!(
            get(&schema, &root, &Path::root().field("lambda_u")).unwrap(),
            Some(&Value::Float(4.0))
        );
    }

    #[test]
    fn test_get_mut_follows_synonyms() {
        let schema = trust_catalog();
        let mut root = problem();
        let conditions = Path::root().field("conduction").field("conditions_limites");
        set(
            &schema,
            &mut root,
            &conditions.clone().index(0).field("bord"),
            Some(Value::str("left")),
        )
        .unwrap();

        let list = get_mut(&schema, &mut root, &conditions).unwrap();
        assert_eq!(list.as_list().map(<[Value]>::len), Some(1));

        let canonical = Path::root().field("conduction").field("boundary_conditions");
        assert_eq!(
            get(&schema, &root, &conditions).unwrap(),
            get(&schema, &root, &canonical).unwrap()
        );
    }

    #[test]
    fn test_unknown_field_is_rejected_on_read() {
        let schema = trust_catalog();
        let root = problem();
        let err = get(&schema, &root, &Path::root().field("nope")).unwrap_err();
        assert!(matches!(err, PathError::Schema(SchemaError::UnknownField { .. })));
    }

    #[test]
    fn test_set_row_of_nested_list() {
        let schema = trust_catalog();
        let mut root = Value::Object(Object::new("Sonde").with(
            "segments",
            Value::List(vec![Value::List(vec![Value::Float(1.0), Value::Float(2.0)])]),
        ));
        let row = Path::root().field("segments").index(0);

        let replacement = Value::List(vec![Value::Float(3.0), Value::Float(4.0)]);
        set(&schema, &mut root, &row, Some(replacement.clone())).unwrap();
        assert_eq!(get(&schema, &root, &row).unwrap(), Some(&replacement));

        let cell = row.clone().index(1);
        set(&schema, &mut root, &cell, Some(Value::Float(5.0))).unwrap();
        assert_eq!(get(&schema, &root, &cell).unwrap(), Some(&Value::Float(5.0)));

        let err = set(&schema, &mut root, &row, Some(Value::Float(6.0))).unwrap_err();
        assert!(matches!(err, PathError::TypeMismatch { .. }));
    }

    #[test]
    fn test_set_materializes_nested_list_field() {
        let schema = trust_catalog();
        let mut root = Value::Object(schema.instantiate("Sonde").unwrap());
        let row = Path::root().field("segments").index(0);

        set(&schema, &mut root, &row, Some(Value::List(vec![Value::Float(1.0)]))).unwrap();

        assert_eq!(
            get(&schema, &root, &row.prefix(1)).unwrap(),
            Some(&Value::List(vec![Value::List(vec![Value::Float(1.0)])]))
        );
    }

    #[test]
    fn test_get_mut_requires_every_step() {
        let schema = trust_catalog();
        let mut root = problem();
        assert!(get_mut(&schema, &mut root, &Path::root().field("milieu")).is_err());
        assert!(get_mut(&schema, &mut root, &Path::root()).is_ok());
    }
}
