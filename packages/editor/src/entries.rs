//! Anonymous entry lists: mesh readers, partitions, scatters and mesh
//! generators. They are written straight into the entry list, never
//! declared, and tracked by [`EntryId`] so unrelated inserts and removals
//! cannot shift them.

use triogui_dataset::{Dataset, DocumentOps, Entry, EntryId, Value};
use triogui_schema::SchemaOracle;

use crate::config::{EntryListConfig, EntryListKind};
use crate::errors::{EditorResult, SyncViolation};

#[derive(Debug, Clone, PartialEq)]
pub struct EntryList {
    kind: EntryListKind,
    config: EntryListConfig,
    ids: Vec<EntryId>,
}

impl EntryList {
    pub fn new(kind: EntryListKind, config: EntryListConfig) -> Self {
        Self {
            kind,
            config,
            ids: Vec::new(),
        }
    }

    /// Pick up the entries of a loaded dataset whose type falls under the base
    pub fn from_document<S: SchemaOracle + ?Sized>(
        kind: EntryListKind,
        config: EntryListConfig,
        schema: &S,
        doc: &Dataset,
    ) -> Self {
        let ids = doc
            .slots()
            .iter()
            .filter(|slot| {
                slot.entry
                    .type_name()
                    .is_some_and(|type_name| schema.is_subtype(type_name, &config.base))
            })
            .map(|slot| slot.id)
            .collect();
        Self { kind, config, ids }
    }

    pub fn kind(&self) -> EntryListKind {
        self.kind
    }

    pub fn base(&self) -> &str {
        &self.config.base
    }

    pub fn ids(&self) -> &[EntryId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.ids.contains(&id)
    }

    pub fn object<'a, D: DocumentOps + ?Sized>(&self, index: usize, doc: &'a D) -> Option<&'a Value> {
        let id = self.ids.get(index)?;
        doc.entry_by_id(*id).and_then(Entry::as_value)
    }

    /// Insert a fresh entry of `type_name` before the terminator
    pub fn add<S: SchemaOracle + ?Sized, D: DocumentOps + ?Sized>(
        &mut self,
        schema: &S,
        doc: &mut D,
        type_name: &str,
    ) -> EditorResult<usize> {
        self.check_type(schema, type_name)?;
        let fresh = schema.instantiate(type_name)?;
        let id = doc.add_entry(Entry::object(fresh));
        self.ids.push(id);
        tracing::debug!("[EntryList] add {} {}", self.kind.name(), type_name);
        Ok(self.ids.len() - 1)
    }

    /// Replace an entry in place with a fresh instance of another type
    pub fn set_type<S: SchemaOracle + ?Sized, D: DocumentOps + ?Sized>(
        &mut self,
        schema: &S,
        doc: &mut D,
        index: usize,
        type_name: &str,
    ) -> EditorResult<bool> {
        self.check_type(schema, type_name)?;
        let id = self.id(index)?;
        if self.object(index, &*doc).and_then(Value::type_name) == Some(type_name) {
            return Ok(false);
        }

        let position = doc
            .entry_position(id)
            .ok_or_else(|| SyncViolation::MissingEntry(format!("{} #{}", self.kind.name(), index)))?;
        let fresh = schema.instantiate(type_name)?;
        doc.replace_entry(position, Entry::object(fresh))?;
        tracing::debug!("[EntryList] retype {} #{} -> {}", self.kind.name(), index, type_name);
        Ok(true)
    }

    pub fn remove<D: DocumentOps + ?Sized>(&mut self, doc: &mut D, index: usize) -> EditorResult<()> {
        let id = self.id(index)?;
        doc.remove_entry_by_id(id)?;
        self.ids.remove(index);
        tracing::debug!("[EntryList] remove {} #{}", self.kind.name(), index);
        Ok(())
    }

    fn id(&self, index: usize) -> EditorResult<EntryId> {
        self.ids.get(index).copied().ok_or_else(|| {
            SyncViolation::NoSuchEntity {
                kind: self.kind.name(),
                index,
            }
            .into()
        })
    }

    fn check_type<S: SchemaOracle + ?Sized>(&self, schema: &S, type_name: &str) -> EditorResult<()> {
        if schema.choices_for(&self.config.base)?.iter().any(|t| t == type_name) {
            Ok(())
        } else {
            Err(SyncViolation::TypeOutsideKind {
                kind: self.kind.name(),
                type_name: type_name.to_string(),
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::errors::EditorError;
    use triogui_schema::fixtures::trust_catalog;

    fn meshes() -> EntryList {
        let config = EditorConfig::default();
        EntryList::new(
            EntryListKind::Mesh,
            config.entry_lists[&EntryListKind::Mesh].clone(),
        )
    }

    #[test]
    fn test_add_and_retype_in_place() {
        let schema = trust_catalog();
        let mut doc = Dataset::scratch(2);
        let mut list = meshes();

        let i = list.add(&schema, &mut doc, "Read_file").unwrap();
        let id = list.ids()[i];
        assert_eq!(doc.position_of(id), Some(1));

        assert!(list.set_type(&schema, &mut doc, i, "Read_med").unwrap());
        assert_eq!(doc.position_of(id), Some(1));
        assert_eq!(list.object(i, &doc).and_then(Value::type_name), Some("Read_med"));
        assert!(!list.set_type(&schema, &mut doc, i, "Read_med").unwrap());
    }

    #[test]
    fn test_ids_survive_unrelated_removal() {
        let schema = trust_catalog();
        let mut doc = Dataset::scratch(2);
        let mut list = meshes();
        let a = list.add(&schema, &mut doc, "Read_file").unwrap();
        let b = list.add(&schema, &mut doc, "Read_med").unwrap();

        list.remove(&mut doc, a).unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list.object(b - 1, &doc).and_then(Value::type_name), Some("Read_med"));
        assert_eq!(doc.entry_count(), 3);
    }

    #[test]
    fn test_type_outside_base_rejected() {
        let schema = trust_catalog();
        let mut doc = Dataset::scratch(2);
        let mut list = meshes();

        let err = list.add(&schema, &mut doc, "Partition").unwrap_err();
        assert!(matches!(
            err,
            EditorError::InvalidRegistrySync(SyncViolation::TypeOutsideKind { .. })
        ));
        let err = list.add(&schema, &mut doc, "Lecture_base").unwrap_err();
        assert!(matches!(
            err,
            EditorError::InvalidRegistrySync(SyncViolation::TypeOutsideKind { .. })
        ));
        assert_eq!(doc.entry_count(), 2);
    }

    #[test]
    fn test_from_document() {
        let schema = trust_catalog();
        let mut doc = Dataset::scratch(2);
        let mut list = meshes();
        list.add(&schema, &mut doc, "Read_file").unwrap();
        doc.add_entry(Entry::object(schema.instantiate("Scatter").unwrap()));

        let config = EditorConfig::default();
        let reloaded = EntryList::from_document(
            EntryListKind::Mesh,
            config.entry_lists[&EntryListKind::Mesh].clone(),
            &schema,
            &doc,
        );
        assert_eq!(reloaded, list);
    }
}
