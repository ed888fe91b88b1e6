//! # Dataset Document
//!
//! The in-memory form of a simulation input deck.
//!
//! A dataset is two structures kept side by side:
//! - **Entries**: the ordered token-level statements (`Dimension 2`,
//!   `Associate pb dom`, `Read dis { ... }`, `Fin`)
//! - **Declarations**: named objects (`Pb_conduction pb`) indexed by
//!   identifier, each optionally linked to the `Read` entry that carries
//!   its body
//!
//! Links from declarations to entries are [`EntryId`]s, never positions, so
//! inserting or removing an unrelated entry cannot invalidate them and a
//! cloned dataset stays self-consistent.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, DatasetResult};
use crate::value::{Object, Value};

/// Entry types that close a dataset; new entries are inserted before them
pub const DEFAULT_TERMINATORS: &[&str] = &["Fin", "End"];

/// Stable identity of an entry, independent of its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub u64);

/// One statement of the dataset, in document order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entry {
    /// Anonymous keyword object (`Associate`, `Solve`, `Read_file`, ...)
    Object(Value),

    /// Explicit `Read <identifier> { ... }` of a declared object
    Read { identifier: String },
}

impl Entry {
    pub fn object(obj: Object) -> Self {
        Entry::Object(Value::Object(obj))
    }

    pub fn read(identifier: impl Into<String>) -> Self {
        Entry::Read {
            identifier: identifier.into(),
        }
    }

    /// Type of an object entry (`None` for reads)
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Entry::Object(value) => value.type_name(),
            Entry::Read { .. } => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Entry::Object(value) => Some(value),
            Entry::Read { .. } => None,
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.type_name()
            .is_some_and(|name| DEFAULT_TERMINATORS.iter().any(|t| t.eq_ignore_ascii_case(name)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySlot {
    pub id: EntryId,
    pub entry: Entry,
}

/// A named object registered in the declarations index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub object: Value,

    /// Explicit `Read` entry carrying this object's body, if any
    #[serde(default)]
    pub read_entry: Option<EntryId>,
}

/// The editable dataset
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    entries: Vec<EntrySlot>,
    declarations: IndexMap<String, Declaration>,
    next_entry_id: u64,
}

impl Dataset {
    /// Empty dataset (no dimension, no terminator)
    pub fn new() -> Self {
        Self::default()
    }

    /// Dataset created "from scratch": a dimension and a terminator
    pub fn scratch(dimension: i64) -> Self {
        let mut dataset = Self::new();
        dataset.push_entry(Entry::object(
            Object::new("Dimension").with("dim", Value::Int(dimension)),
        ));
        dataset.push_entry(Entry::object(Object::new("Fin")));
        dataset
    }

    /// Append an entry at the very end, ignoring terminators.
    ///
    /// Used when rebuilding a dataset in source order.
    pub fn push_entry(&mut self, entry: Entry) -> EntryId {
        let id = self.allocate_id();
        self.entries.push(EntrySlot { id, entry });
        id
    }

    /// Insert an entry before the trailing terminator (or at the end if none)
    pub fn insert_entry(&mut self, entry: Entry) -> EntryId {
        let id = self.allocate_id();
        let position = self
            .entries
            .iter()
            .rposition(|slot| slot.entry.is_terminator())
            .unwrap_or(self.entries.len());
        self.entries.insert(position, EntrySlot { id, entry });
        id
    }

    fn allocate_id(&mut self) -> EntryId {
        let id = EntryId(self.next_entry_id);
        self.next_entry_id += 1;
        id
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().map(|slot| &slot.entry)
    }

    pub fn slots(&self) -> &[EntrySlot] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| &slot.entry)
    }

    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.entries
            .iter_mut()
            .find(|slot| slot.id == id)
            .map(|slot| &mut slot.entry)
    }

    /// Current position of an entry
    pub fn position_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|slot| slot.id == id)
    }

    pub fn id_at(&self, index: usize) -> Option<EntryId> {
        self.entries.get(index).map(|slot| slot.id)
    }

    pub(crate) fn take_entry(&mut self, index: usize) -> Entry {
        self.entries.remove(index).entry
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [EntrySlot] {
        &mut self.entries
    }

    pub(crate) fn slot_at_mut(&mut self, index: usize) -> Option<&mut EntrySlot> {
        self.entries.get_mut(index)
    }

    /// First object entry of the given type
    pub fn find_entry_of_type(&self, type_name: &str) -> Option<EntryId> {
        self.entries
            .iter()
            .find(|slot| slot.entry.type_name() == Some(type_name))
            .map(|slot| slot.id)
    }

    pub fn declarations(&self) -> impl Iterator<Item = (&str, &Declaration)> {
        self.declarations.iter().map(|(id, decl)| (id.as_str(), decl))
    }

    pub fn declared(&self, identifier: &str) -> Option<&Declaration> {
        self.declarations.get(identifier)
    }

    pub fn declared_mut(&mut self, identifier: &str) -> Option<&mut Declaration> {
        self.declarations.get_mut(identifier)
    }

    pub fn is_declared(&self, identifier: &str) -> bool {
        self.declarations.contains_key(identifier)
    }

    pub(crate) fn declarations_mut(&mut self) -> &mut IndexMap<String, Declaration> {
        &mut self.declarations
    }

    /// Readable index: identifier, declared object and position of its read entry
    pub fn declarations_index(&self) -> Vec<(&str, &Value, Option<usize>)> {
        self.declarations
            .iter()
            .map(|(id, decl)| {
                let position = decl.read_entry.and_then(|entry| self.position_of(entry));
                (id.as_str(), &decl.object, position)
            })
            .collect()
    }

    /// Resolve the root object a node path is relative to
    pub fn root(&self, anchor: &Anchor) -> Option<&Value> {
        match anchor {
            Anchor::Entry(id) => self.entry(*id).and_then(Entry::as_value),
            Anchor::Declaration(identifier) => self.declared(identifier).map(|decl| &decl.object),
        }
    }

    pub fn root_mut(&mut self, anchor: &Anchor) -> Option<&mut Value> {
        match anchor {
            Anchor::Entry(id) => match self.entry_mut(*id) {
                Some(Entry::Object(value)) => Some(value),
                _ => None,
            },
            Anchor::Declaration(identifier) => {
                self.declared_mut(identifier).map(|decl| &mut decl.object)
            }
        }
    }

    pub(crate) fn require_object(value: &Value) -> DatasetResult<()> {
        match value {
            Value::Object(_) => Ok(()),
            other => Err(DatasetError::NotAnObject(other.kind())),
        }
    }
}

/// Root of a node path: an entry or a declared object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Entry(EntryId),
    Declaration(String),
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anchor::Entry(id) => write!(f, "entry#{}", id.0),
            Anchor::Declaration(identifier) => write!(f, "{}", identifier),
        }
    }
}
