//! # Triogui Editor
//!
//! Schema-driven editing engine for simulation datasets.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ schema: SchemaOracle (fields, subtypes)     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditSession                         │
//! │  - Node editor over any Path in the tree    │
//! │  - Entity registries ⇄ declarations         │
//! │  - Association and entry lists ⇄ entries    │
//! │  - Commit / undo over whole-state clones    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ dataset: Dataset + DocumentOps → tokens     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The dataset is the source of truth**: a declared object lives only in the document
//! 2. **Message passing**: nodes describe what they accept, callers send an [`EditAction`]
//! 3. **Atomic commits**: a failed change leaves the session untouched
//! 4. **No-ops are free**: a change that alters nothing is never recorded
//!
//! ## Usage
//!
//! ```rust,ignore
//! use triogui_editor::{EditSession, EditorConfig, EntityKind, EditAction, NodeAddress};
//!
//! let mut session = EditSession::new(catalog, EditorConfig::load(".")?);
//!
//! let pb = session.add_entity(EntityKind::Problem)?;
//! session.set_entity_identifier(EntityKind::Problem, pb, "pb")?;
//! session.set_entity_type(EntityKind::Problem, pb, "Pb_conduction")?;
//!
//! let milieu = NodeAddress::declaration("pb", "milieu".parse()?);
//! session.apply(&milieu, EditAction::SelectType("Solide".into()))?;
//!
//! println!("{}", session.serialize());
//! session.undo();
//! ```

mod associations;
mod config;
mod entries;
mod errors;
mod history;
mod keywords;
mod node;
pub mod path;
mod registry;
mod session;

pub use associations::{AssociationKind, AssociationList, Tuple};
pub use config::{
    EditorConfig, EntityKind, EntityKindConfig, EntryListConfig, EntryListKind,
    DEFAULT_CONFIG_NAME,
};
pub use entries::EntryList;
pub use errors::{EditorError, EditorResult, SyncViolation};
pub use history::{Checkpoint, History};
pub use keywords::{dimension, set_dimension, set_write_xyz, write_xyz};
pub use node::{
    display_scalar, Classification, CommitPolicy, EditAction, Node, NodeEditor, NodeMode,
    RootType, ScalarDraft, ScalarInput, ScalarKind,
};
pub use path::{Path, PathError, PathResult, Step};
pub use registry::{Entity, EntityRegistry, EntityState};
pub use session::{EditSession, NodeAddress, SessionState};

// Re-export the document model for convenience
pub use triogui_dataset::{Anchor, Dataset, DocumentOps, Entry, EntryId, Object, Value};
