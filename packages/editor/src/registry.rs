//! # Entity Registry Sync
//!
//! Keeps a list of named dataset members (domains, problems, schemes, ...)
//! in step with the document's declarations.
//!
//! ## Lifecycle
//!
//! ```text
//!            set identifier / set type
//!   Blank ───────────────────────────► PartiallyNamed
//!                                           │ both set: add_declaration
//!                                           ▼
//!                                       Declared ──► rename_declaration
//!                                           │   └──► retype_declaration
//!                                           ▼ delete: remove_declaration
//!                                        Deleted
//! ```
//!
//! While an entity is not declared the registry owns its object. Once it is
//! declared the document owns it and the entity keeps only the identifier,
//! so there is never a second copy to drift.

use serde::{Deserialize, Serialize};

use triogui_dataset::{Dataset, DocumentOps, Entry, Value};
use triogui_schema::SchemaOracle;

use crate::config::{EntityKind, EntityKindConfig};
use crate::errors::{EditorResult, SyncViolation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Blank,
    PartiallyNamed,
    Declared,
}

/// One editable `(identifier, object)` pair
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    identifier: Option<String>,

    /// Held only while undeclared
    object: Option<Value>,

    declared: bool,

    /// Whether the document carries an explicit `Read` entry for it
    explicit_entry: bool,
}

impl Entity {
    pub fn state(&self) -> EntityState {
        if self.declared {
            EntityState::Declared
        } else if self.identifier.is_none() && self.object.is_none() {
            EntityState::Blank
        } else {
            EntityState::PartiallyNamed
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn is_declared(&self) -> bool {
        self.declared
    }

    pub fn has_explicit_entry(&self) -> bool {
        self.explicit_entry
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityRegistry {
    kind: EntityKind,
    config: EntityKindConfig,
    entities: Vec<Entity>,
}

impl EntityRegistry {
    pub fn new(kind: EntityKind, config: EntityKindConfig) -> Self {
        Self {
            kind,
            config,
            entities: Vec::new(),
        }
    }

    /// Rebuild from the declarations of a loaded dataset
    pub fn from_document<S: SchemaOracle + ?Sized>(
        kind: EntityKind,
        config: EntityKindConfig,
        schema: &S,
        doc: &Dataset,
    ) -> Self {
        let entities = doc
            .declarations()
            .filter(|(_, declaration)| {
                declaration
                    .object
                    .type_name()
                    .is_some_and(|type_name| schema.is_subtype(type_name, &config.base))
            })
            .map(|(identifier, declaration)| Entity {
                identifier: Some(identifier.to_string()),
                object: None,
                declared: true,
                explicit_entry: declaration.read_entry.is_some(),
            })
            .collect();

        Self {
            kind,
            config,
            entities,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn config(&self) -> &EntityKindConfig {
        &self.config
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Index of the declared entity with this identifier
    pub fn position_of(&self, identifier: &str) -> Option<usize> {
        self.entities
            .iter()
            .position(|e| e.declared && e.identifier.as_deref() == Some(identifier))
    }

    /// Identifiers other entries may refer to
    pub fn declared_identifiers(&self) -> impl Iterator<Item = &str> {
        self.entities
            .iter()
            .filter(|e| e.declared)
            .filter_map(|e| e.identifier.as_deref())
    }

    /// Authoritative object of an entity, wherever it currently lives
    pub fn object<'a, D: DocumentOps + ?Sized>(
        &'a self,
        index: usize,
        doc: &'a D,
    ) -> Option<&'a Value> {
        let entity = self.entities.get(index)?;
        if entity.declared {
            let identifier = entity.identifier.as_deref()?;
            doc.declaration(identifier).map(|declaration| &declaration.object)
        } else {
            entity.object.as_ref()
        }
    }

    /// Append a new entity; fixed-type kinds start with their object
    pub fn add<S: SchemaOracle + ?Sized>(&mut self, schema: &S) -> EditorResult<usize> {
        let object = match &self.config.fixed_type {
            Some(fixed) => Some(Value::Object(schema.instantiate(fixed)?)),
            None => None,
        };

        self.entities.push(Entity {
            object,
            ..Entity::default()
        });
        tracing::debug!("[EntityRegistry] add {} #{}", self.kind, self.entities.len() - 1);
        Ok(self.entities.len() - 1)
    }

    /// Set, change or clear an entity's identifier.
    ///
    /// Returns whether anything changed.
    pub fn set_identifier<D: DocumentOps + ?Sized>(
        &mut self,
        doc: &mut D,
        index: usize,
        text: &str,
    ) -> EditorResult<bool> {
        let kind = self.kind;
        let trimmed = text.trim();
        let new = (!trimmed.is_empty()).then(|| trimmed.to_string());
        let entity = self.entity_mut(index)?;

        if entity.identifier == new {
            return Ok(false);
        }
        if let Some(identifier) = &new {
            if doc.declaration(identifier).is_some() {
                return Err(SyncViolation::DuplicateIdentifier(identifier.clone()).into());
            }
        }

        if entity.declared {
            let Some(old) = entity.identifier.clone() else {
                return Err(SyncViolation::NotDeclared {
                    kind: kind.name(),
                    index,
                }
                .into());
            };
            match &new {
                Some(identifier) => {
                    doc.rename_declaration(&old, identifier)?;
                    tracing::debug!("[EntityRegistry] rename {} {} -> {}", kind, old, identifier);
                }
                None => {
                    // Clearing the name takes the object back out of the document
                    let declaration = doc.remove_declaration(&old)?;
                    if let Some(read) = declaration.read_entry {
                        doc.remove_entry_by_id(read)?;
                    }
                    entity.object = Some(declaration.object);
                    entity.declared = false;
                    entity.explicit_entry = false;
                    tracing::debug!("[EntityRegistry] undeclare {} {}", kind, old);
                }
            }
            entity.identifier = new;
            return Ok(true);
        }

        entity.identifier = new;
        Self::declare_if_complete(kind, entity, doc)?;
        Ok(true)
    }

    /// Select the concrete type of an entity.
    ///
    /// A fresh instance replaces the object, discarding its field values.
    pub fn set_type<S: SchemaOracle + ?Sized, D: DocumentOps + ?Sized>(
        &mut self,
        schema: &S,
        doc: &mut D,
        index: usize,
        type_name: &str,
    ) -> EditorResult<bool> {
        let kind = self.kind;
        if let Some(fixed) = &self.config.fixed_type {
            if fixed != type_name {
                return Err(SyncViolation::FixedType {
                    kind: kind.name(),
                    fixed: fixed.clone(),
                }
                .into());
            }
        }
        if !schema.choices_for(&self.config.base)?.iter().any(|t| t == type_name) {
            return Err(SyncViolation::TypeOutsideKind {
                kind: kind.name(),
                type_name: type_name.to_string(),
            }
            .into());
        }

        let current = self.object(index, &*doc).and_then(Value::type_name);
        if current == Some(type_name) {
            return Ok(false);
        }
        let fresh = Value::Object(schema.instantiate(type_name)?);
        let keeps_read = self.config.supports_explicit_read(type_name);
        let entity = self.entity_mut(index)?;

        if !entity.declared {
            entity.object = Some(fresh);
            Self::declare_if_complete(kind, entity, doc)?;
            return Ok(true);
        }

        let identifier = entity.identifier.clone().unwrap_or_default();
        doc.retype_declaration(&identifier, fresh)?;
        tracing::debug!("[EntityRegistry] retype {} {} -> {}", kind, identifier, type_name);

        if entity.explicit_entry && !keeps_read {
            if let Some(read) = doc.declaration(&identifier).and_then(|d| d.read_entry) {
                doc.remove_entry_by_id(read)?;
            }
            doc.link_read_entry(&identifier, None)?;
            entity.explicit_entry = false;
        }
        Ok(true)
    }

    /// Toggle the explicit `Read id { ... }` form of a declared entity
    pub fn set_explicit_entry<D: DocumentOps + ?Sized>(
        &mut self,
        doc: &mut D,
        index: usize,
        enabled: bool,
    ) -> EditorResult<bool> {
        let kind = self.kind;
        let type_name = self
            .object(index, &*doc)
            .and_then(Value::type_name)
            .map(str::to_string);
        let supported = type_name
            .as_deref()
            .is_some_and(|t| self.config.supports_explicit_read(t));
        let entity = self.entity_mut(index)?;

        let (true, Some(identifier)) = (entity.declared, entity.identifier.clone()) else {
            return Err(SyncViolation::NotDeclared {
                kind: kind.name(),
                index,
            }
            .into());
        };
        if !supported {
            return Err(SyncViolation::ExplicitEntryUnsupported(type_name.unwrap_or_default()).into());
        }
        if entity.explicit_entry == enabled {
            return Ok(false);
        }

        if enabled {
            let read = doc.add_entry(Entry::read(identifier.clone()));
            doc.link_read_entry(&identifier, Some(read))?;
        } else {
            let read = doc
                .declaration(&identifier)
                .and_then(|d| d.read_entry)
                .ok_or_else(|| SyncViolation::MissingEntry(identifier.clone()))?;
            doc.remove_entry_by_id(read)?;
            doc.link_read_entry(&identifier, None)?;
        }
        entity.explicit_entry = enabled;
        tracing::debug!("[EntityRegistry] explicit read for {} = {}", identifier, enabled);
        Ok(true)
    }

    /// Remove an entity from the registry and, if declared, from the document
    pub fn delete<D: DocumentOps + ?Sized>(&mut self, doc: &mut D, index: usize) -> EditorResult<()> {
        self.entity_mut(index)?;
        let entity = self.entities.remove(index);

        if let (true, Some(identifier)) = (entity.declared, entity.identifier.as_deref()) {
            let declaration = doc.remove_declaration(identifier)?;
            if let Some(read) = declaration.read_entry {
                doc.remove_entry_by_id(read)?;
            }
        }
        tracing::debug!("[EntityRegistry] delete {} #{}", self.kind, index);
        Ok(())
    }

    fn entity_mut(&mut self, index: usize) -> EditorResult<&mut Entity> {
        let kind = self.kind;
        self.entities.get_mut(index).ok_or_else(|| {
            SyncViolation::NoSuchEntity {
                kind: kind.name(),
                index,
            }
            .into()
        })
    }

    fn declare_if_complete<D: DocumentOps + ?Sized>(
        kind: EntityKind,
        entity: &mut Entity,
        doc: &mut D,
    ) -> EditorResult<()> {
        let (Some(identifier), Some(object)) = (&entity.identifier, &entity.object) else {
            return Ok(());
        };
        doc.add_declaration(object.clone(), identifier)?;
        tracing::debug!("[EntityRegistry] declare {} {}", kind, identifier);
        entity.object = None;
        entity.declared = true;
        Ok(())
    }
}
