//! # Association Lists
//!
//! Back-references between declared identifiers: `Associate pb dom`,
//! `Discretize pb dis`, `Solve pb`.
//!
//! Each tuple goes through
//! `[absent, absent] -> [one set] -> [both set, entry added] -> [edited, entry replaced] -> [deleted, entry removed]`.
//! The document holds exactly one entry per complete tuple, found again by
//! structural equality with the tuple's previous value.

use serde::{Deserialize, Serialize};

use triogui_dataset::{Dataset, DocumentOps, Entry, Object, Value};

use crate::errors::{EditorError, EditorResult, SyncViolation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssociationKind {
    Associate,
    Discretize,
    Solve,
}

impl AssociationKind {
    pub const ALL: [AssociationKind; 3] = [
        AssociationKind::Associate,
        AssociationKind::Discretize,
        AssociationKind::Solve,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            AssociationKind::Associate => "Associate",
            AssociationKind::Discretize => "Discretize",
            AssociationKind::Solve => "Solve",
        }
    }

    /// Field names of the tuple, in order
    pub fn slots(self) -> &'static [&'static str] {
        match self {
            AssociationKind::Associate => &["objet_1", "objet_2"],
            AssociationKind::Discretize => &["problem_name", "dis"],
            AssociationKind::Solve => &["pb"],
        }
    }
}

pub type Tuple = Vec<Option<String>>;

#[derive(Debug, Clone, PartialEq)]
pub struct AssociationList {
    kind: AssociationKind,
    tuples: Vec<Tuple>,
}

impl AssociationList {
    pub fn new(kind: AssociationKind) -> Self {
        Self {
            kind,
            tuples: Vec::new(),
        }
    }

    /// Collect the complete tuples already present in a dataset
    pub fn from_document(kind: AssociationKind, doc: &Dataset) -> Self {
        let tuples = doc
            .entries()
            .filter(|entry| entry.type_name() == Some(kind.type_name()))
            .filter_map(|entry| entry.as_value().and_then(Value::as_object))
            .map(|obj| {
                kind.slots()
                    .iter()
                    .map(|slot| obj.get(slot).and_then(Value::as_str).map(str::to_string))
                    .collect()
            })
            .collect();
        Self { kind, tuples }
    }

    pub fn kind(&self) -> AssociationKind {
        self.kind
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Append an empty tuple; the document is untouched until it is complete
    pub fn add(&mut self) -> usize {
        self.tuples.push(vec![None; self.kind.slots().len()]);
        self.tuples.len() - 1
    }

    /// Set one side of a tuple. Returns whether anything changed.
    pub fn set_slot<D: DocumentOps + ?Sized>(
        &mut self,
        doc: &mut D,
        index: usize,
        slot: usize,
        text: &str,
    ) -> EditorResult<bool> {
        let kind = self.kind;
        let old = self.tuple(index)?.clone();
        if slot >= old.len() {
            return Err(SyncViolation::NoSuchEntity {
                kind: "association slot",
                index: slot,
            }
            .into());
        }

        let trimmed = text.trim();
        let mut new = old.clone();
        new[slot] = (!trimmed.is_empty()).then(|| trimmed.to_string());
        if new == old {
            return Ok(false);
        }

        match (entry_for(kind, &old), entry_for(kind, &new)) {
            (Some(old_entry), Some(new_entry)) => {
                let position = locate(doc, kind, &old_entry)?;
                doc.replace_entry(position, new_entry)?;
                tracing::debug!("[Associations] replace {} at {}", kind.type_name(), position);
            }
            (Some(old_entry), None) => {
                locate(doc, kind, &old_entry)?;
                doc.remove_entry(&old_entry)?;
                tracing::debug!("[Associations] remove incomplete {}", kind.type_name());
            }
            (None, Some(new_entry)) => {
                doc.add_entry(new_entry);
                tracing::debug!("[Associations] add {}", kind.type_name());
            }
            (None, None) => {}
        }

        self.tuples[index] = new;
        Ok(true)
    }

    /// Delete a tuple and its entry, if it had one
    pub fn remove<D: DocumentOps + ?Sized>(&mut self, doc: &mut D, index: usize) -> EditorResult<()> {
        let kind = self.kind;
        if let Some(entry) = entry_for(kind, self.tuple(index)?) {
            locate(doc, kind, &entry)?;
            doc.remove_entry(&entry)?;
        }
        self.tuples.remove(index);
        tracing::debug!("[Associations] delete {} #{}", kind.type_name(), index);
        Ok(())
    }

    pub fn is_solved(&self, identifier: &str) -> bool {
        self.kind == AssociationKind::Solve
            && self
                .tuples
                .iter()
                .any(|tuple| tuple.first().and_then(Option::as_deref) == Some(identifier))
    }

    /// Per-problem solve switch over the `Solve` list
    pub fn set_solved<D: DocumentOps + ?Sized>(
        &mut self,
        doc: &mut D,
        identifier: &str,
        on: bool,
    ) -> EditorResult<bool> {
        if self.kind != AssociationKind::Solve {
            return Err(EditorError::not_available("set_solved", self.kind.type_name()));
        }
        if self.is_solved(identifier) == on {
            return Ok(false);
        }

        if on {
            let index = self.add();
            self.set_slot(doc, index, 0, identifier)
        } else {
            let index = self
                .tuples
                .iter()
                .position(|tuple| tuple.first().and_then(Option::as_deref) == Some(identifier))
                .ok_or_else(|| SyncViolation::MissingEntry(identifier.to_string()))?;
            self.remove(doc, index)?;
            Ok(true)
        }
    }

    fn tuple(&self, index: usize) -> EditorResult<&Tuple> {
        self.tuples.get(index).ok_or_else(|| {
            SyncViolation::NoSuchEntity {
                kind: self.kind.type_name(),
                index,
            }
            .into()
        })
    }
}

/// The entry a complete tuple stands for
fn entry_for(kind: AssociationKind, tuple: &[Option<String>]) -> Option<Entry> {
    let mut obj = Object::new(kind.type_name());
    for (slot, value) in kind.slots().iter().zip(tuple) {
        obj.set(*slot, Some(Value::str(value.as_deref()?)));
    }
    Some(Entry::object(obj))
}

fn locate<D: DocumentOps + ?Sized>(
    doc: &D,
    kind: AssociationKind,
    entry: &Entry,
) -> EditorResult<usize> {
    doc.index_of_entry(entry)
        .ok_or_else(|| SyncViolation::MissingEntry(kind.type_name().to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn associate(a: &str, b: &str) -> Entry {
        entry_for(
            AssociationKind::Associate,
            &[Some(a.to_string()), Some(b.to_string())],
        )
        .unwrap()
    }

    #[test]
    fn test_entry_added_once_complete() {
        let mut doc = Dataset::scratch(2);
        let mut list = AssociationList::new(AssociationKind::Associate);
        let i = list.add();

        list.set_slot(&mut doc, i, 0, "domain1").unwrap();
        assert_eq!(list.tuples()[i], vec![Some("domain1".to_string()), None]);
        assert_eq!(doc.entry_count(), 2);

        list.set_slot(&mut doc, i, 1, "domain2").unwrap();
        assert_eq!(doc.entry_count(), 3);
        assert_eq!(doc.index_of_entry(&associate("domain1", "domain2")), Some(1));
    }

    #[test]
    fn test_edit_replaces_in_place() {
        let mut doc = Dataset::scratch(2);
        let mut list = AssociationList::new(AssociationKind::Associate);
        let a = list.add();
        let b = list.add();
        list.set_slot(&mut doc, a, 0, "pb").unwrap();
        list.set_slot(&mut doc, a, 1, "dom").unwrap();
        list.set_slot(&mut doc, b, 0, "pb").unwrap();
        list.set_slot(&mut doc, b, 1, "sch").unwrap();

        list.set_slot(&mut doc, a, 1, "dom2").unwrap();

        assert_eq!(doc.index_of_entry(&associate("pb", "dom2")), Some(1));
        assert_eq!(doc.index_of_entry(&associate("pb", "sch")), Some(2));
        assert_eq!(doc.index_of_entry(&associate("pb", "dom")), None);
    }

    #[test]
    fn test_incomplete_edit_removes_entry() {
        let mut doc = Dataset::scratch(2);
        let mut list = AssociationList::new(AssociationKind::Discretize);
        let i = list.add();
        list.set_slot(&mut doc, i, 0, "pb").unwrap();
        list.set_slot(&mut doc, i, 1, "dis").unwrap();

        list.set_slot(&mut doc, i, 1, "  ").unwrap();

        assert_eq!(doc.entry_count(), 2);
        assert_eq!(list.tuples()[i], vec![Some("pb".to_string()), None]);
    }

    #[test]
    fn test_remove_and_missing_entry() {
        let mut doc = Dataset::scratch(2);
        let mut list = AssociationList::new(AssociationKind::Associate);
        let i = list.add();
        list.set_slot(&mut doc, i, 0, "pb").unwrap();
        list.set_slot(&mut doc, i, 1, "dom").unwrap();

        // Entry removed behind the list's back
        doc.remove_entry(&associate("pb", "dom")).unwrap();
        let err = list.remove(&mut doc, i).unwrap_err();
        assert!(matches!(
            err,
            EditorError::InvalidRegistrySync(SyncViolation::MissingEntry(_))
        ));

        doc.add_entry(associate("pb", "dom"));
        list.remove(&mut doc, i).unwrap();
        assert!(list.is_empty());
        assert_eq!(doc.entry_count(), 2);
    }

    #[test]
    fn test_solve_switch() {
        let mut doc = Dataset::scratch(2);
        let mut solve = AssociationList::new(AssociationKind::Solve);

        assert!(solve.set_solved(&mut doc, "pb", true).unwrap());
        assert!(!solve.set_solved(&mut doc, "pb", true).unwrap());
        assert!(solve.is_solved("pb"));
        assert_eq!(doc.entries().nth(1).and_then(Entry::type_name), Some("Solve"));

        assert!(solve.set_solved(&mut doc, "pb", false).unwrap());
        assert!(!solve.is_solved("pb"));
        assert_eq!(doc.entry_count(), 2);

        let mut associate = AssociationList::new(AssociationKind::Associate);
        assert!(associate.set_solved(&mut doc, "pb", true).is_err());
    }

    #[test]
    fn test_from_document() {
        let mut doc = Dataset::scratch(2);
        doc.add_entry(associate("pb", "dom"));
        doc.add_entry(associate("pb", "sch"));

        let list = AssociationList::from_document(AssociationKind::Associate, &doc);
        assert_eq!(list.len(), 2);
        assert_eq!(
            list.tuples()[1],
            vec![Some("pb".to_string()), Some("sch".to_string())]
        );
    }
}
