//! End-to-end editing scenarios through an EditSession
//!
//! This tests:
//! - Entity naming and declaration
//! - List duplication and rejected scalar input
//! - Association tuples and type switching
//! - Undo back to the starting state

use triogui_editor::{
    AssociationKind, Classification, EditAction, EditSession, EditorConfig, EditorError,
    EntityKind, EntityState, EntryListKind, NodeAddress, ScalarInput, Value,
};
use triogui_schema::fixtures::trust_catalog;
use triogui_schema::{SchemaCatalog, SchemaOracle};

/// Route `[Area]` debug logs to the test harness, shown for failing tests
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn session() -> EditSession<SchemaCatalog> {
    init_logging();
    EditSession::new(trust_catalog(), EditorConfig::default())
}

fn problem(session: &mut EditSession<SchemaCatalog>, name: &str) -> anyhow::Result<usize> {
    let i = session.add_entity(EntityKind::Problem)?;
    session.set_entity_identifier(EntityKind::Problem, i, name)?;
    session.set_entity_type(EntityKind::Problem, i, "Pb_conduction")?;
    Ok(i)
}

fn at(identifier: &str, path: &str) -> anyhow::Result<NodeAddress> {
    Ok(NodeAddress::declaration(identifier, path.parse()?))
}

fn text(s: &str) -> EditAction {
    EditAction::SetScalar(ScalarInput::Text(s.to_string()))
}

#[test]
fn test_naming_then_typing_declares_entity() -> anyhow::Result<()> {
    let mut session = session();
    let i = session.add_entity(EntityKind::Problem)?;

    session.set_entity_identifier(EntityKind::Problem, i, "pb1")?;
    let registry = session.registry(EntityKind::Problem).unwrap();
    assert_eq!(registry.entity(i).unwrap().state(), EntityState::PartiallyNamed);
    assert_eq!(session.dataset().declarations().count(), 0);

    session.set_entity_type(EntityKind::Problem, i, "Pb_conduction")?;
    let registry = session.registry(EntityKind::Problem).unwrap();
    assert_eq!(registry.entity(i).unwrap().state(), EntityState::Declared);

    let declaration = session.dataset().declared("pb1").unwrap();
    assert_eq!(
        declaration.object,
        Value::Object(trust_catalog().instantiate("Pb_conduction")?)
    );
    Ok(())
}

#[test]
fn test_duplicate_list_item() -> anyhow::Result<()> {
    let mut session = session();
    problem(&mut session, "pb")?;

    session.apply(&at("pb", "conduction")?, EditAction::Initialize)?;
    let conditions = at("pb", "conduction.boundary_conditions")?;
    session.apply(&conditions, EditAction::Initialize)?;
    session.apply(&conditions, EditAction::Append)?;
    session.apply(&at("pb", "conduction.boundary_conditions[0].bord")?, text("left"))?;
    session.apply(&at("pb", "conduction.boundary_conditions[1].bord")?, text("right"))?;

    let before = session.node(&conditions)?;
    assert_eq!(before.classification(), Classification::List);
    let depth = session.history_depth();

    assert!(session.apply(&conditions, EditAction::Duplicate(0))?);

    let after = session.node(&conditions)?;
    assert_eq!(after.children().len(), 3);
    assert_eq!(after.children()[0], before.children()[0]);
    assert_eq!(after.children()[1], before.children()[1]);

    let first = session.node(&at("pb", "conduction.boundary_conditions[0].bord")?)?;
    let copy = session.node(&at("pb", "conduction.boundary_conditions[2].bord")?)?;
    assert_eq!(copy.scalar(), first.scalar());
    assert_eq!(session.history_depth(), depth + 1);
    Ok(())
}

#[test]
fn test_malformed_number_keeps_value() -> anyhow::Result<()> {
    let mut session = session();
    problem(&mut session, "pb")?;
    session.apply(&at("pb", "milieu")?, EditAction::SelectType("Solide".into()))?;
    let rho = at("pb", "milieu.rho")?;
    session.apply(&rho, text("2.5"))?;

    let depth = session.history_depth();
    let could_undo = session.can_undo();

    let err = session.apply(&rho, text("abc")).unwrap_err();
    assert!(matches!(err, EditorError::MalformedScalarInput { .. }));
    assert_eq!(session.node(&rho)?.scalar(), Some(&Value::Float(2.5)));
    assert_eq!(session.history_depth(), depth);
    assert_eq!(session.can_undo(), could_undo);
    Ok(())
}

#[test]
fn test_association_entry_added_when_complete() -> anyhow::Result<()> {
    let mut session = session();
    let i = session.add_association(AssociationKind::Associate)?;
    let entries = session.dataset().entry_count();

    session.set_association_slot(AssociationKind::Associate, i, 0, "domain1")?;
    let list = session.associations(AssociationKind::Associate).unwrap();
    assert_eq!(list.tuples()[i], vec![Some("domain1".to_string()), None]);
    assert_eq!(session.dataset().entry_count(), entries);

    session.set_association_slot(AssociationKind::Associate, i, 1, "domain2")?;
    assert_eq!(session.dataset().entry_count(), entries + 1);
    assert!(session.serialize().contains("Associate domain1 domain2\n"));
    Ok(())
}

#[test]
fn test_type_switch_keeps_identifier() -> anyhow::Result<()> {
    let mut session = session();
    let i = problem(&mut session, "pb1")?;
    let root = NodeAddress::root(session.entity_anchor(EntityKind::Problem, i).unwrap());

    session.apply(&root, EditAction::SelectType("Pb_hydraulique".into()))?;

    assert_eq!(
        session.registry(EntityKind::Problem).unwrap().entity(i).unwrap().identifier(),
        Some("pb1")
    );
    let node = session.node(&root)?;
    let labels: Vec<&str> = node.children().iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["milieu", "postraitement", "navier_stokes_standard"]);
    Ok(())
}

#[test]
fn test_undo_everything_restores_start() -> anyhow::Result<()> {
    let mut session = session();
    let start = session.state().clone();

    let pb = problem(&mut session, "pb")?;
    let dom = session.add_entity(EntityKind::Domain)?;
    session.set_entity_identifier(EntityKind::Domain, dom, "dom")?;
    let a = session.add_association(AssociationKind::Associate)?;
    session.set_association_slot(AssociationKind::Associate, a, 0, "pb")?;
    session.set_association_slot(AssociationKind::Associate, a, 1, "dom")?;
    session.add_list_entry(EntryListKind::Mesh, "Read_file")?;
    session.set_solved("pb", true)?;
    session.set_dimension(3)?;
    session.delete_entity(EntityKind::Problem, pb)?;

    assert_ne!(session.state(), &start);
    while session.undo() {}

    assert_eq!(session.state(), &start);
    assert_eq!(session.serialize(), "Dimension 2\nFin\n");
    Ok(())
}

#[test]
fn test_serialized_dataset() -> anyhow::Result<()> {
    let mut session = session();
    let dom = session.add_entity(EntityKind::Domain)?;
    session.set_entity_identifier(EntityKind::Domain, dom, "dom")?;
    problem(&mut session, "pb")?;
    session.apply(&at("pb", "milieu")?, EditAction::SelectType("Solide".into()))?;
    session.apply(&at("pb", "milieu.rho")?, text("2"))?;

    let a = session.add_association(AssociationKind::Associate)?;
    session.set_association_slot(AssociationKind::Associate, a, 0, "pb")?;
    session.set_association_slot(AssociationKind::Associate, a, 1, "dom")?;
    session.set_solved("pb", true)?;

    assert_eq!(
        session.serialize(),
        "Dimension 2\n\
         Domaine dom\n\
         Pb_conduction pb\n\
         Associate pb dom\n\
         Solve pb\n\
         Read pb { milieu Solide { rho 2 } }\n\
         Fin\n"
    );
    Ok(())
}
