//! Singleton keyword switches: the `Dimension` entry and the
//! `EcritureLectureSpecial 0` entry that turns off the xyz file.

use triogui_dataset::{Dataset, DatasetError, DocumentOps, Entry, Object, Value};

use crate::errors::{EditorError, EditorResult};

const DIMENSION: &str = "Dimension";
const WRITE_SPECIAL: &str = "EcritureLectureSpecial";

pub fn dimension(doc: &Dataset) -> Option<i64> {
    let id = doc.find_entry_of_type(DIMENSION)?;
    doc.entry(id)
        .and_then(Entry::as_value)
        .and_then(Value::as_object)
        .and_then(|obj| obj.get("dim"))
        .and_then(Value::as_int)
}

/// Set the space dimension, editing the existing entry in place
pub fn set_dimension(doc: &mut Dataset, dim: i64) -> EditorResult<bool> {
    if !(2..=3).contains(&dim) {
        return Err(EditorError::malformed(dim.to_string(), "a dimension of 2 or 3"));
    }
    if dimension(doc) == Some(dim) {
        return Ok(false);
    }

    let entry = Entry::object(Object::new(DIMENSION).with("dim", Value::Int(dim)));
    match doc.find_entry_of_type(DIMENSION).and_then(|id| doc.position_of(id)) {
        Some(position) => {
            doc.replace_entry(position, entry)?;
        }
        None => {
            doc.add_entry(entry);
        }
    }
    tracing::debug!("[Keywords] dimension = {}", dim);
    Ok(true)
}

fn xyz_switch() -> Entry {
    Entry::object(Object::new(WRITE_SPECIAL).with("type", Value::str("0")))
}

/// Whether the xyz file is written; on unless `EcritureLectureSpecial 0` is present
pub fn write_xyz(doc: &Dataset) -> bool {
    doc.index_of_entry(&xyz_switch()).is_none()
}

pub fn set_write_xyz(doc: &mut Dataset, enabled: bool) -> EditorResult<bool> {
    let disabled = xyz_switch();
    let existing = doc.find_entry_of_type(WRITE_SPECIAL);

    let changed = match (enabled, existing) {
        (true, Some(id)) if doc.entry(id) == Some(&disabled) => {
            doc.remove_entry_by_id(id)?;
            true
        }
        (true, _) => false,
        (false, Some(id)) if doc.entry(id) == Some(&disabled) => false,
        (false, Some(id)) => {
            let position = doc.position_of(id).ok_or(DatasetError::StaleEntry(id))?;
            doc.replace_entry(position, disabled)?;
            true
        }
        (false, None) => {
            doc.add_entry(disabled);
            true
        }
    };

    if changed {
        tracing::debug!("[Keywords] write xyz = {}", enabled);
    }
    Ok(changed)
}
