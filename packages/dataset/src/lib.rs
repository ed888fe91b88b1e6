//! # Triogui Dataset
//!
//! Value tree and document model for simulation input decks.
//!
//! ```text
//! Dataset
//!   ├─ entries       Dimension 2 | Associate pb dom | Read dis {..} | Fin
//!   └─ declarations  pb -> Pb_conduction { .. }, dis -> VEFPreP1B { .. }
//!          │
//!          ▼
//!     Serializer ──► "Dimension 2\nPb_conduction pb\n...\nFin\n"
//! ```
//!
//! All structural edits go through [`DocumentOps`]; the editor crate never
//! touches the entry list or the declarations index directly.

pub mod dataset;
pub mod document;
pub mod error;
pub mod serializer;
pub mod value;

pub use dataset::{Anchor, Dataset, Declaration, Entry, EntryId, EntrySlot, DEFAULT_TERMINATORS};
pub use document::DocumentOps;
pub use error::{DatasetError, DatasetResult};
pub use serializer::{Serializer, SerializerOptions};
pub use value::{Object, Value};
