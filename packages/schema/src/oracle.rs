use triogui_dataset::{Object, Value};

use crate::error::{SchemaError, SchemaResult};
use crate::types::{FieldMeta, TypeRef};

/// Type introspection the editor is driven by
///
/// Implementors provide the four primitives; everything the editor needs
/// beyond that (subtype checks, type choices, instantiation) is derived.
pub trait SchemaOracle {
    /// Ordered field set, inherited fields first
    fn fields_of(&self, type_name: &str) -> SchemaResult<&[FieldMeta]>;

    /// Strict descendants, concrete or not
    fn subclasses_of(&self, type_name: &str) -> SchemaResult<&[String]>;

    fn parent_of(&self, type_name: &str) -> SchemaResult<Option<&str>>;

    fn is_concrete(&self, type_name: &str) -> SchemaResult<bool>;

    fn has_type(&self, type_name: &str) -> bool {
        self.fields_of(type_name).is_ok()
    }

    /// `(element type, is list)` of a field
    fn true_type(&self, field: &FieldMeta) -> (TypeRef, bool) {
        field.ty.normalized()
    }

    /// Field lookup by name or synonym
    fn field(&self, type_name: &str, name: &str) -> SchemaResult<&FieldMeta> {
        self.fields_of(type_name)?
            .iter()
            .find(|f| f.answers_to(name))
            .ok_or_else(|| SchemaError::unknown_field(type_name, name))
    }

    /// `sub` is `base` or one of its descendants
    fn is_subtype(&self, sub: &str, base: &str) -> bool {
        let mut current = Some(sub);
        // Catalogs reject cycles, so the walk terminates
        while let Some(name) = current {
            if name == base {
                return true;
            }
            current = self.parent_of(name).ok().flatten();
        }
        false
    }

    fn has_subclasses(&self, type_name: &str) -> bool {
        self.subclasses_of(type_name)
            .map(|subs| !subs.is_empty())
            .unwrap_or(false)
    }

    /// Types selectable for a node declared as `base`
    fn choices_for(&self, base: &str) -> SchemaResult<Vec<String>> {
        let mut choices = Vec::new();
        if self.is_concrete(base)? {
            choices.push(base.to_string());
        }
        for sub in self.subclasses_of(base)? {
            if self.is_concrete(sub)? {
                choices.push(sub.clone());
            }
        }
        Ok(choices)
    }

    /// Fresh object of a concrete type: defaults applied, other fields absent
    fn instantiate(&self, type_name: &str) -> SchemaResult<Object> {
        if !self.is_concrete(type_name)? {
            return Err(SchemaError::AbstractType(type_name.to_string()));
        }
        let mut obj = Object::new(type_name);
        for field in self.fields_of(type_name)? {
            obj.set(field.name.clone(), field.default.clone());
        }
        Ok(obj)
    }

    /// Default element for a declared type, used by list append
    fn default_for(&self, ty: &TypeRef) -> SchemaResult<Value> {
        Ok(match ty {
            TypeRef::Str => Value::str(""),
            TypeRef::Int => Value::Int(0),
            TypeRef::Float => Value::Float(0.0),
            TypeRef::Bool => Value::Bool(false),
            TypeRef::Choice(options) => {
                Value::Choice(options.first().cloned().unwrap_or_default())
            }
            TypeRef::Class(name) => {
                let concrete = self
                    .choices_for(name)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| SchemaError::AbstractType(name.clone()))?;
                Value::Object(self.instantiate(&concrete)?)
            }
            TypeRef::List(_) => Value::List(Vec::new()),
            TypeRef::Optional(inner) => self.default_for(inner)?,
        })
    }
}
