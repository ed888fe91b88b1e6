//! TRUST-like catalog shared by tests and benches

use crate::catalog::SchemaCatalog;

const TRUST_SCHEMA: &str = include_str!("../fixtures/trust_schema.json");

/// Problems, media, schemes, discretizations, mesh readers and the
/// keyword objects that tie them together
pub fn trust_catalog() -> SchemaCatalog {
    match SchemaCatalog::from_json(TRUST_SCHEMA) {
        Ok(catalog) => catalog,
        Err(e) => panic!("fixture catalog is invalid: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::SchemaOracle;
    use crate::types::TypeRef;

    #[test]
    fn test_fixture_builds() {
        let catalog = trust_catalog();

        assert_eq!(
            catalog.choices_for("Pb_base").unwrap(),
            vec!["Pb_conduction", "Pb_hydraulique"]
        );
        assert_eq!(
            catalog.choices_for("Discretisation_base").unwrap(),
            vec!["VDF", "VEFPreP1B"]
        );
        assert_eq!(catalog.choices_for("Partition").unwrap(), vec!["Partition"]);
    }

    #[test]
    fn test_fixture_field_shapes() {
        let catalog = trust_catalog();

        let field = catalog.field("Conduction", "conditions_limites").unwrap();
        assert_eq!(catalog.true_type(field), (TypeRef::class("Condlim_base"), true));

        let field = catalog.field("Sonde", "points").unwrap();
        assert!(field.is_list());
        assert!(!field.is_optional());

        let field = catalog.field("Sonde", "segments").unwrap();
        assert_eq!(catalog.true_type(field), (TypeRef::list(TypeRef::Float), true));
    }
}
