//! # Edit Session
//!
//! Single-threaded editing façade over one dataset.
//!
//! Every mutation goes through [`EditSession::commit`]:
//!
//! ```text
//!   live state ──clone──► working copy ──change──► Ok  ──► changed? ──► install + record
//!                                          │                  └─ no ──► drop (nothing recorded)
//!                                          └──► Err ──► drop (live state untouched)
//! ```
//!
//! The session state bundles the dataset with the registries, association
//! lists and entry lists built on top of it, so an undo restores all of
//! them together.

use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;

use indexmap::IndexMap;
use triogui_dataset::{Anchor, Dataset, Serializer};
use triogui_schema::SchemaOracle;

use crate::associations::{AssociationKind, AssociationList};
use crate::config::{EditorConfig, EntityKind, EntryListKind};
use crate::entries::EntryList;
use crate::errors::{EditorError, EditorResult};
use crate::history::History;
use crate::keywords;
use crate::node::{EditAction, Node, NodeEditor, RootType};
use crate::path::Path;
use crate::registry::EntityRegistry;

/// Where a node lives: the root object it hangs off and the path below it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddress {
    pub anchor: Anchor,
    pub path: Path,
}

impl NodeAddress {
    pub fn new(anchor: Anchor, path: Path) -> Self {
        Self { anchor, path }
    }

    pub fn root(anchor: Anchor) -> Self {
        Self::new(anchor, Path::root())
    }

    pub fn declaration(identifier: impl Into<String>, path: Path) -> Self {
        Self::new(Anchor::Declaration(identifier.into()), path)
    }
}

/// Everything one checkpoint captures
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub dataset: Dataset,
    pub registries: IndexMap<EntityKind, EntityRegistry>,
    pub associations: IndexMap<AssociationKind, AssociationList>,
    pub entry_lists: IndexMap<EntryListKind, EntryList>,
}

impl SessionState {
    /// Build the registries and lists that mirror `dataset`
    pub fn from_dataset<S: SchemaOracle + ?Sized>(
        schema: &S,
        config: &EditorConfig,
        dataset: Dataset,
    ) -> Self {
        let registries = config
            .entity_kinds
            .iter()
            .map(|(kind, kind_config)| {
                (
                    *kind,
                    EntityRegistry::from_document(*kind, kind_config.clone(), schema, &dataset),
                )
            })
            .collect();

        let associations = AssociationKind::ALL
            .iter()
            .map(|kind| (*kind, AssociationList::from_document(*kind, &dataset)))
            .collect();

        let entry_lists = config
            .entry_lists
            .iter()
            .map(|(kind, list_config)| {
                (
                    *kind,
                    EntryList::from_document(*kind, list_config.clone(), schema, &dataset),
                )
            })
            .collect();

        Self {
            dataset,
            registries,
            associations,
            entry_lists,
        }
    }

    /// How the root object behind `anchor` is declared
    fn root_type(&self, anchor: &Anchor) -> RootType {
        match anchor {
            Anchor::Declaration(identifier) => self
                .registries
                .values()
                .find(|registry| registry.position_of(identifier).is_some())
                .filter(|registry| registry.config().fixed_type.is_none())
                .map(|registry| RootType::Polymorphic {
                    base: registry.config().base.clone(),
                })
                .unwrap_or(RootType::Resolved),
            Anchor::Entry(id) => self
                .entry_lists
                .values()
                .find(|list| list.contains(*id))
                .map(|list| RootType::Polymorphic {
                    base: list.base().to_string(),
                })
                .unwrap_or(RootType::Resolved),
        }
    }

    /// Route a root-level type selection to whoever owns the anchor
    fn select_root_type<S: SchemaOracle + ?Sized>(
        &mut self,
        schema: &S,
        anchor: &Anchor,
        type_name: &str,
    ) -> Option<EditorResult<bool>> {
        match anchor {
            Anchor::Declaration(identifier) => {
                let registry = self
                    .registries
                    .values_mut()
                    .find(|registry| registry.position_of(identifier).is_some())?;
                let index = registry.position_of(identifier)?;
                Some(registry.set_type(schema, &mut self.dataset, index, type_name))
            }
            Anchor::Entry(id) => {
                let list = self.entry_lists.values_mut().find(|list| list.contains(*id))?;
                let index = list.ids().iter().position(|candidate| candidate == id)?;
                Some(list.set_type(schema, &mut self.dataset, index, type_name))
            }
        }
    }

    fn registry_mut(&mut self, kind: EntityKind) -> EditorResult<(&mut EntityRegistry, &mut Dataset)> {
        let registry = self
            .registries
            .get_mut(&kind)
            .ok_or_else(|| EditorError::Config(format!("no configuration for {}", kind)))?;
        Ok((registry, &mut self.dataset))
    }

    fn associations_mut(
        &mut self,
        kind: AssociationKind,
    ) -> EditorResult<(&mut AssociationList, &mut Dataset)> {
        let list = self
            .associations
            .get_mut(&kind)
            .ok_or_else(|| EditorError::Config(format!("no association list {}", kind.type_name())))?;
        Ok((list, &mut self.dataset))
    }

    fn entry_list_mut(&mut self, kind: EntryListKind) -> EditorResult<(&mut EntryList, &mut Dataset)> {
        let list = self
            .entry_lists
            .get_mut(&kind)
            .ok_or_else(|| EditorError::Config(format!("no configuration for {}", kind.name())))?;
        Ok((list, &mut self.dataset))
    }
}

/// Editing session: live state, schema, config and undo history
pub struct EditSession<S: SchemaOracle> {
    schema: S,
    config: EditorConfig,
    state: SessionState,
    history: History<SessionState>,
}

impl<S: SchemaOracle> EditSession<S> {
    /// Session over a dataset created from scratch (`Dimension 2`, `Fin`)
    pub fn new(schema: S, config: EditorConfig) -> Self {
        Self::with_dataset(schema, config, Dataset::scratch(2))
    }

    pub fn with_dataset(schema: S, config: EditorConfig, dataset: Dataset) -> Self {
        let state = SessionState::from_dataset(&schema, &config, dataset);
        let history = History::with_max_levels(state.clone(), config.history_limit);
        Self {
            schema,
            config,
            state,
            history,
        }
    }

    /// Replace the edited dataset and start a fresh history
    pub fn load(&mut self, dataset: Dataset) {
        self.state = SessionState::from_dataset(&self.schema, &self.config, dataset);
        self.history.reset(self.state.clone());
        tracing::info!(
            "[EditSession] loaded dataset ({} entries)",
            self.state.dataset.entry_count()
        );
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn dataset(&self) -> &Dataset {
        &self.state.dataset
    }

    /// Apply `change` to a copy of the live state and keep it only if it
    /// succeeded and actually changed something.
    fn commit<R>(
        &mut self,
        label: impl Into<String>,
        change: impl FnOnce(&S, &EditorConfig, &mut SessionState) -> EditorResult<R>,
    ) -> EditorResult<R> {
        let label = label.into();
        let mut working = self.state.clone();

        let result = match change(&self.schema, &self.config, &mut working) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!("[EditSession] {} rejected: {}", label, e);
                return Err(e);
            }
        };

        if working == self.state {
            tracing::debug!("[EditSession] {} changed nothing", label);
            return Ok(result);
        }

        self.history.record(working.clone(), label.clone());
        self.state = working;
        tracing::debug!(
            "[EditSession] committed {} (depth {})",
            label,
            self.history.depth()
        );
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Node editing
    // ------------------------------------------------------------------

    /// Classified node at `address`
    pub fn node(&self, address: &NodeAddress) -> EditorResult<Node> {
        let root = self
            .state
            .dataset
            .root(&address.anchor)
            .ok_or_else(|| EditorError::UnknownAnchor(address.anchor.to_string()))?;
        let root_type = self.state.root_type(&address.anchor);
        NodeEditor::new(&self.schema).locate(root, &root_type, &address.path)
    }

    /// Send one action to the node at `address`.
    ///
    /// Returns whether the session changed (and a checkpoint was recorded).
    pub fn apply(&mut self, address: &NodeAddress, action: EditAction) -> EditorResult<bool> {
        let label = format!("{} at {}{}", action.name(), address.anchor, path_suffix(&address.path));

        self.commit(label, |schema, _, state| {
            if let (true, EditAction::SelectType(type_name)) = (address.path.is_root(), &action) {
                if let Some(result) = state.select_root_type(schema, &address.anchor, type_name) {
                    return result;
                }
            }

            let root_type = state.root_type(&address.anchor);
            let root = state
                .dataset
                .root_mut(&address.anchor)
                .ok_or_else(|| EditorError::UnknownAnchor(address.anchor.to_string()))?;
            NodeEditor::new(schema).apply(root, &root_type, &address.path, &action)
        })
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Restore the previous checkpoint. Returns false at the floor.
    pub fn undo(&mut self) -> bool {
        let description = self.history.undo_description().map(str::to_string);
        match self.history.undo() {
            Some(previous) => {
                self.state = previous.clone();
                tracing::debug!("[EditSession] undo {}", description.unwrap_or_default());
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn history_depth(&self) -> usize {
        self.history.depth()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.history.undo_description()
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    pub fn registry(&self, kind: EntityKind) -> Option<&EntityRegistry> {
        self.state.registries.get(&kind)
    }

    pub fn add_entity(&mut self, kind: EntityKind) -> EditorResult<usize> {
        self.commit(format!("Add {}", kind), |schema, _, state| {
            let (registry, _) = state.registry_mut(kind)?;
            registry.add(schema)
        })
    }

    pub fn set_entity_identifier(
        &mut self,
        kind: EntityKind,
        index: usize,
        text: &str,
    ) -> EditorResult<bool> {
        self.commit(format!("Name {}", kind), |_, _, state| {
            let (registry, dataset) = state.registry_mut(kind)?;
            registry.set_identifier(dataset, index, text)
        })
    }

    pub fn set_entity_type(
        &mut self,
        kind: EntityKind,
        index: usize,
        type_name: &str,
    ) -> EditorResult<bool> {
        self.commit(format!("Set {} type to {}", kind, type_name), |schema, _, state| {
            let (registry, dataset) = state.registry_mut(kind)?;
            registry.set_type(schema, dataset, index, type_name)
        })
    }

    pub fn set_entity_explicit_entry(
        &mut self,
        kind: EntityKind,
        index: usize,
        enabled: bool,
    ) -> EditorResult<bool> {
        self.commit(format!("Toggle {} read entry", kind), |_, _, state| {
            let (registry, dataset) = state.registry_mut(kind)?;
            registry.set_explicit_entry(dataset, index, enabled)
        })
    }

    pub fn delete_entity(&mut self, kind: EntityKind, index: usize) -> EditorResult<()> {
        self.commit(format!("Delete {}", kind), |_, _, state| {
            let (registry, dataset) = state.registry_mut(kind)?;
            registry.delete(dataset, index)
        })
    }

    /// Anchor of a declared entity, for node editing
    pub fn entity_anchor(&self, kind: EntityKind, index: usize) -> Option<Anchor> {
        let entity = self.registry(kind)?.entity(index)?;
        if !entity.is_declared() {
            return None;
        }
        entity
            .identifier()
            .map(|identifier| Anchor::Declaration(identifier.to_string()))
    }

    // ------------------------------------------------------------------
    // Associations
    // ------------------------------------------------------------------

    pub fn associations(&self, kind: AssociationKind) -> Option<&AssociationList> {
        self.state.associations.get(&kind)
    }

    pub fn add_association(&mut self, kind: AssociationKind) -> EditorResult<usize> {
        self.commit(format!("Add {}", kind.type_name()), |_, _, state| {
            let (list, _) = state.associations_mut(kind)?;
            Ok(list.add())
        })
    }

    pub fn set_association_slot(
        &mut self,
        kind: AssociationKind,
        index: usize,
        slot: usize,
        text: &str,
    ) -> EditorResult<bool> {
        self.commit(format!("Edit {}", kind.type_name()), |_, _, state| {
            let (list, dataset) = state.associations_mut(kind)?;
            list.set_slot(dataset, index, slot, text)
        })
    }

    pub fn remove_association(&mut self, kind: AssociationKind, index: usize) -> EditorResult<()> {
        self.commit(format!("Remove {}", kind.type_name()), |_, _, state| {
            let (list, dataset) = state.associations_mut(kind)?;
            list.remove(dataset, index)
        })
    }

    pub fn is_solved(&self, identifier: &str) -> bool {
        self.associations(AssociationKind::Solve)
            .is_some_and(|list| list.is_solved(identifier))
    }

    pub fn set_solved(&mut self, identifier: &str, on: bool) -> EditorResult<bool> {
        self.commit(format!("Solve {}", identifier), |_, _, state| {
            let (list, dataset) = state.associations_mut(AssociationKind::Solve)?;
            list.set_solved(dataset, identifier, on)
        })
    }

    // ------------------------------------------------------------------
    // Anonymous entries
    // ------------------------------------------------------------------

    pub fn entry_list(&self, kind: EntryListKind) -> Option<&EntryList> {
        self.state.entry_lists.get(&kind)
    }

    pub fn add_list_entry(&mut self, kind: EntryListKind, type_name: &str) -> EditorResult<usize> {
        self.commit(format!("Add {} {}", kind.name(), type_name), |schema, _, state| {
            let (list, dataset) = state.entry_list_mut(kind)?;
            list.add(schema, dataset, type_name)
        })
    }

    pub fn retype_list_entry(
        &mut self,
        kind: EntryListKind,
        index: usize,
        type_name: &str,
    ) -> EditorResult<bool> {
        self.commit(format!("Set {} type to {}", kind.name(), type_name), |schema, _, state| {
            let (list, dataset) = state.entry_list_mut(kind)?;
            list.set_type(schema, dataset, index, type_name)
        })
    }

    pub fn remove_list_entry(&mut self, kind: EntryListKind, index: usize) -> EditorResult<()> {
        self.commit(format!("Remove {}", kind.name()), |_, _, state| {
            let (list, dataset) = state.entry_list_mut(kind)?;
            list.remove(dataset, index)
        })
    }

    pub fn list_entry_anchor(&self, kind: EntryListKind, index: usize) -> Option<Anchor> {
        self.entry_list(kind)?.ids().get(index).map(|id| Anchor::Entry(*id))
    }

    // ------------------------------------------------------------------
    // Keywords
    // ------------------------------------------------------------------

    pub fn dimension(&self) -> Option<i64> {
        keywords::dimension(&self.state.dataset)
    }

    pub fn set_dimension(&mut self, dim: i64) -> EditorResult<bool> {
        self.commit(format!("Dimension {}", dim), |_, _, state| {
            keywords::set_dimension(&mut state.dataset, dim)
        })
    }

    pub fn write_xyz(&self) -> bool {
        keywords::write_xyz(&self.state.dataset)
    }

    pub fn set_write_xyz(&mut self, enabled: bool) -> EditorResult<bool> {
        self.commit("Write xyz", |_, _, state| {
            keywords::set_write_xyz(&mut state.dataset, enabled)
        })
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    pub fn tokens(&self) -> Vec<String> {
        self.serializer().tokens(&self.state.dataset)
    }

    pub fn serialize(&self) -> String {
        self.serializer().serialize(&self.state.dataset)
    }

    /// Write the serialized dataset to disk
    pub fn save(&self, path: impl AsRef<FsPath>) -> EditorResult<()> {
        std::fs::write(path.as_ref(), self.serialize())?;
        tracing::info!("[EditSession] saved {}", path.as_ref().display());
        Ok(())
    }

    fn serializer(&self) -> Serializer {
        Serializer::with_options(self.config.serializer.clone())
    }
}

fn path_suffix(path: &Path) -> String {
    if path.is_root() {
        String::new()
    } else {
        format!(".{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Classification, ScalarInput};
    use triogui_dataset::Value;
    use triogui_schema::fixtures::trust_catalog;
    use triogui_schema::SchemaCatalog;

    fn session() -> EditSession<SchemaCatalog> {
        EditSession::new(trust_catalog(), EditorConfig::default())
    }

    fn declared_problem(session: &mut EditSession<SchemaCatalog>) -> Anchor {
        let i = session.add_entity(EntityKind::Problem).unwrap();
        session.set_entity_identifier(EntityKind::Problem, i, "pb").unwrap();
        session
            .set_entity_type(EntityKind::Problem, i, "Pb_conduction")
            .unwrap();
        session.entity_anchor(EntityKind::Problem, i).unwrap()
    }

    #[test]
    fn test_new_session_starts_at_floor() {
        let mut session = session();
        assert_eq!(session.history_depth(), 1);
        assert!(!session.can_undo());
        assert!(!session.undo());
        assert_eq!(session.dimension(), Some(2));
    }

    #[test]
    fn test_rejected_edit_records_nothing() {
        let mut session = session();
        let before = session.state().clone();

        assert!(session.set_dimension(7).is_err());
        assert_eq!(session.state(), &before);
        assert_eq!(session.history_depth(), 1);
    }

    #[test]
    fn test_noop_records_nothing() {
        let mut session = session();
        assert!(!session.set_dimension(2).unwrap());
        assert_eq!(session.history_depth(), 1);
    }

    #[test]
    fn test_root_select_type_retypes_declaration() {
        let mut session = session();
        let anchor = declared_problem(&mut session);
        let depth = session.history_depth();

        let root = session.node(&NodeAddress::root(anchor.clone())).unwrap();
        assert_eq!(root.classification(), Classification::Polymorphic);

        let changed = session
            .apply(
                &NodeAddress::root(anchor.clone()),
                EditAction::SelectType("Pb_hydraulique".into()),
            )
            .unwrap();
        assert!(changed);
        assert_eq!(session.history_depth(), depth + 1);
        assert_eq!(
            session.dataset().root(&anchor).and_then(Value::type_name),
            Some("Pb_hydraulique")
        );
    }

    #[test]
    fn test_field_edit_and_undo() {
        let mut session = session();
        let anchor = declared_problem(&mut session);
        let address = NodeAddress::new(anchor.clone(), "milieu".parse().unwrap());

        session.apply(&address, EditAction::SelectType("Solide".into())).unwrap();
        let rho = NodeAddress::new(anchor.clone(), "milieu.rho".parse().unwrap());
        session
            .apply(&rho, EditAction::SetScalar(ScalarInput::Text("1000".into())))
            .unwrap();
        assert_eq!(session.node(&rho).unwrap().scalar(), Some(&Value::Float(1000.0)));
        assert_eq!(session.undo_description(), Some("set_scalar at pb.milieu.rho"));

        assert!(session.undo());
        assert_eq!(session.node(&rho).unwrap().scalar(), None);
    }

    #[test]
    fn test_unknown_anchor() {
        let session = session();
        let err = session
            .node(&NodeAddress::declaration("nowhere", Path::root()))
            .unwrap_err();
        assert!(matches!(err, EditorError::UnknownAnchor(_)));
    }

    #[test]
    fn test_list_entry_root_is_polymorphic() {
        let mut session = session();
        let i = session.add_list_entry(EntryListKind::Mesh, "Read_file").unwrap();
        let anchor = session.list_entry_anchor(EntryListKind::Mesh, i).unwrap();

        session
            .apply(&NodeAddress::root(anchor.clone()), EditAction::SelectType("Read_med".into()))
            .unwrap();
        assert_eq!(
            session.dataset().root(&anchor).and_then(Value::type_name),
            Some("Read_med")
        );

        assert!(session.undo());
        assert_eq!(
            session.dataset().root(&anchor).and_then(Value::type_name),
            Some("Read_file")
        );
    }

    #[test]
    fn test_load_resets_history_and_rebuilds_registries() {
        let mut session = session();
        declared_problem(&mut session);
        let dataset = session.dataset().clone();

        session.load(dataset);
        assert_eq!(session.history_depth(), 1);
        let problems = session.registry(EntityKind::Problem).unwrap();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems.entity(0).and_then(|e| e.identifier()), Some("pb"));
    }

    #[test]
    fn test_history_limit_from_config() {
        let config = EditorConfig {
            history_limit: 2,
            ..EditorConfig::default()
        };
        let mut session = EditSession::new(trust_catalog(), config);
        session.set_dimension(3).unwrap();
        session.set_dimension(2).unwrap();
        session.set_dimension(3).unwrap();

        assert_eq!(session.history_depth(), 2);
        assert!(session.undo());
        assert!(!session.undo());
        assert_eq!(session.dimension(), Some(2));
    }
}
