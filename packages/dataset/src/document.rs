//! # Document Operations
//!
//! The narrow mutation contract the editor drives a dataset through.
//!
//! Registries and association lists never reach into a [`Dataset`]
//! directly; every structural change goes through [`DocumentOps`], which
//! keeps the declarations index and the entry list consistent and makes
//! the sequence of document calls observable in tests.

use crate::dataset::{Dataset, Declaration, Entry, EntryId};
use crate::error::{DatasetError, DatasetResult};
use crate::value::Value;

pub trait DocumentOps {
    /// Register a named object
    fn add_declaration(&mut self, object: Value, identifier: &str) -> DatasetResult<()>;

    /// Change a declaration's identifier, keeping its object and read entry
    fn rename_declaration(&mut self, old: &str, new: &str) -> DatasetResult<()>;

    /// Replace a declared object, keeping its identifier
    fn retype_declaration(&mut self, identifier: &str, object: Value) -> DatasetResult<()>;

    /// Unregister a named object and hand it back
    fn remove_declaration(&mut self, identifier: &str) -> DatasetResult<Declaration>;

    /// Insert an entry before the trailing terminator
    fn add_entry(&mut self, entry: Entry) -> EntryId;

    /// Remove the first entry structurally equal to `entry`
    fn remove_entry(&mut self, entry: &Entry) -> DatasetResult<Entry>;

    fn remove_entry_by_id(&mut self, id: EntryId) -> DatasetResult<Entry>;

    fn index_of_entry(&self, entry: &Entry) -> Option<usize>;

    fn entry_by_id(&self, id: EntryId) -> Option<&Entry>;

    /// Current position of an entry
    fn entry_position(&self, id: EntryId) -> Option<usize>;

    /// Replace the entry at `index` in place; the slot keeps its [`EntryId`]
    fn replace_entry(&mut self, index: usize, entry: Entry) -> DatasetResult<Entry>;

    /// Record (or clear) the explicit read entry of a declaration
    fn link_read_entry(&mut self, identifier: &str, entry: Option<EntryId>) -> DatasetResult<()>;

    fn declaration(&self, identifier: &str) -> Option<&Declaration>;

    /// Position of a declaration's read entry, if it has one
    fn declaration_entry_index(&self, identifier: &str) -> Option<usize>;
}

impl DocumentOps for Dataset {
    fn add_declaration(&mut self, object: Value, identifier: &str) -> DatasetResult<()> {
        Dataset::require_object(&object)?;
        if self.is_declared(identifier) {
            return Err(DatasetError::DuplicateDeclaration(identifier.to_string()));
        }

        tracing::debug!("[Document] declare {} as {:?}", identifier, object.type_name());
        self.declarations_mut().insert(
            identifier.to_string(),
            Declaration {
                object,
                read_entry: None,
            },
        );
        Ok(())
    }

    fn rename_declaration(&mut self, old: &str, new: &str) -> DatasetResult<()> {
        if old == new {
            return Ok(());
        }
        if self.is_declared(new) {
            return Err(DatasetError::DuplicateDeclaration(new.to_string()));
        }
        let index = self
            .declarations_mut()
            .get_index_of(old)
            .ok_or_else(|| DatasetError::UnknownDeclaration(old.to_string()))?;

        // Keep the declaration at its original position
        let declarations = self.declarations_mut();
        if let Some((_, declaration)) = declarations.shift_remove_index(index) {
            declarations.shift_insert(index, new.to_string(), declaration);
        }

        for slot in self.slots_mut() {
            if let Entry::Read { identifier } = &mut slot.entry {
                if identifier == old {
                    *identifier = new.to_string();
                }
            }
        }

        tracing::debug!("[Document] rename {} -> {}", old, new);
        Ok(())
    }

    fn retype_declaration(&mut self, identifier: &str, object: Value) -> DatasetResult<()> {
        Dataset::require_object(&object)?;
        let declaration = self
            .declared_mut(identifier)
            .ok_or_else(|| DatasetError::UnknownDeclaration(identifier.to_string()))?;

        tracing::debug!(
            "[Document] retype {}: {:?} -> {:?}",
            identifier,
            declaration.object.type_name(),
            object.type_name()
        );
        declaration.object = object;
        Ok(())
    }

    fn remove_declaration(&mut self, identifier: &str) -> DatasetResult<Declaration> {
        tracing::debug!("[Document] remove declaration {}", identifier);
        self.declarations_mut()
            .shift_remove(identifier)
            .ok_or_else(|| DatasetError::UnknownDeclaration(identifier.to_string()))
    }

    fn add_entry(&mut self, entry: Entry) -> EntryId {
        self.insert_entry(entry)
    }

    fn remove_entry(&mut self, entry: &Entry) -> DatasetResult<Entry> {
        let index = self
            .index_of_entry(entry)
            .ok_or(DatasetError::EntryNotFound)?;
        Ok(self.take_entry(index))
    }

    fn remove_entry_by_id(&mut self, id: EntryId) -> DatasetResult<Entry> {
        let index = self.position_of(id).ok_or(DatasetError::StaleEntry(id))?;
        Ok(self.take_entry(index))
    }

    fn index_of_entry(&self, entry: &Entry) -> Option<usize> {
        self.entries().position(|candidate| candidate == entry)
    }

    fn entry_by_id(&self, id: EntryId) -> Option<&Entry> {
        self.entry(id)
    }

    fn entry_position(&self, id: EntryId) -> Option<usize> {
        self.position_of(id)
    }

    fn replace_entry(&mut self, index: usize, entry: Entry) -> DatasetResult<Entry> {
        let len = self.entry_count();
        let slot = self
            .slot_at_mut(index)
            .ok_or_else(|| DatasetError::out_of_range(index, len))?;
        Ok(std::mem::replace(&mut slot.entry, entry))
    }

    fn link_read_entry(&mut self, identifier: &str, entry: Option<EntryId>) -> DatasetResult<()> {
        let declaration = self
            .declared_mut(identifier)
            .ok_or_else(|| DatasetError::UnknownDeclaration(identifier.to_string()))?;
        declaration.read_entry = entry;
        Ok(())
    }

    fn declaration(&self, identifier: &str) -> Option<&Declaration> {
        self.declared(identifier)
    }

    fn declaration_entry_index(&self, identifier: &str) -> Option<usize> {
        self.declared(identifier)
            .and_then(|declaration| declaration.read_entry)
            .and_then(|id| self.position_of(id))
    }
}
