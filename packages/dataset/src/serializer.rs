use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, Entry, DEFAULT_TERMINATORS};
use crate::value::{Object, Value};

/// Layout knobs for the token form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializerOptions {
    /// Entry types emitted before declarations
    #[serde(default = "default_preamble")]
    pub preamble_types: Vec<String>,

    /// Entry types that close the dataset; implicit reads go before the first one
    #[serde(default = "default_terminators")]
    pub terminator_types: Vec<String>,
}

fn default_preamble() -> Vec<String> {
    vec!["Dimension".to_string()]
}

fn default_terminators() -> Vec<String> {
    DEFAULT_TERMINATORS.iter().map(|t| t.to_string()).collect()
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            preamble_types: default_preamble(),
            terminator_types: default_terminators(),
        }
    }
}

/// Serializer converts a dataset back to its token form
///
/// Statements come out in three groups:
/// - preamble keywords (`Dimension 2`)
/// - declarations (`Pb_conduction pb`)
/// - every other entry in document order, with an implicit
///   `Read id { ... }` for each declaration that has a body but no
///   explicit read, placed just before the terminator
pub struct Serializer {
    options: SerializerOptions,
}

impl Serializer {
    pub fn new() -> Self {
        Self::with_options(SerializerOptions::default())
    }

    pub fn with_options(options: SerializerOptions) -> Self {
        Self { options }
    }

    /// Flat token stream
    pub fn tokens(&self, doc: &Dataset) -> Vec<String> {
        self.statements(doc).into_iter().flatten().collect()
    }

    /// One statement per line
    pub fn serialize(&self, doc: &Dataset) -> String {
        let mut output = String::new();
        for statement in self.statements(doc) {
            output.push_str(&statement.join(" "));
            output.push('\n');
        }
        output
    }

    fn statements(&self, doc: &Dataset) -> Vec<Vec<String>> {
        let mut statements = Vec::new();

        // Preamble
        for entry in doc.entries().filter(|e| self.is_preamble(e)) {
            statements.push(self.serialize_entry(doc, entry));
        }

        // Declarations
        for (identifier, declaration) in doc.declarations() {
            let type_name = declaration.object.type_name().unwrap_or_default();
            statements.push(vec![type_name.to_string(), identifier.to_string()]);
        }

        // Body
        let mut implicit_reads_written = false;
        for entry in doc.entries().filter(|e| !self.is_preamble(e)) {
            if !implicit_reads_written && self.is_terminator(entry) {
                self.serialize_implicit_reads(doc, &mut statements);
                implicit_reads_written = true;
            }
            statements.push(self.serialize_entry(doc, entry));
        }
        if !implicit_reads_written {
            self.serialize_implicit_reads(doc, &mut statements);
        }

        statements
    }

    fn is_preamble(&self, entry: &Entry) -> bool {
        entry
            .type_name()
            .is_some_and(|name| self.options.preamble_types.iter().any(|t| t == name))
    }

    fn is_terminator(&self, entry: &Entry) -> bool {
        entry.type_name().is_some_and(|name| {
            self.options
                .terminator_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(name))
        })
    }

    fn serialize_implicit_reads(&self, doc: &Dataset, statements: &mut Vec<Vec<String>>) {
        for (identifier, declaration) in doc.declarations() {
            if declaration.read_entry.is_some() {
                continue;
            }
            if let Some(obj) = declaration.object.as_object() {
                if !obj.is_blank() {
                    statements.push(self.serialize_read(identifier, Some(obj)));
                }
            }
        }
    }

    fn serialize_entry(&self, doc: &Dataset, entry: &Entry) -> Vec<String> {
        match entry {
            Entry::Read { identifier } => {
                let obj = doc
                    .declared(identifier)
                    .and_then(|declaration| declaration.object.as_object());
                self.serialize_read(identifier, obj)
            }
            Entry::Object(Value::Object(obj)) => {
                let mut tokens = vec![obj.type_name.clone()];
                for (_, value) in obj.present() {
                    self.serialize_positional(value, &mut tokens);
                }
                tokens
            }
            Entry::Object(value) => {
                let mut tokens = Vec::new();
                self.serialize_positional(value, &mut tokens);
                tokens
            }
        }
    }

    fn serialize_read(&self, identifier: &str, obj: Option<&Object>) -> Vec<String> {
        let mut tokens = vec!["Read".to_string(), identifier.to_string()];
        match obj {
            Some(obj) => self.serialize_body(obj, &mut tokens),
            None => tokens.extend(["{".to_string(), "}".to_string()]),
        }
        tokens
    }

    /// Keyword form: `{ name value ... }`
    fn serialize_body(&self, obj: &Object, tokens: &mut Vec<String>) {
        tokens.push("{".to_string());
        for (name, value) in obj.present() {
            match value {
                Value::Bool(true) => tokens.push(name.to_string()),
                Value::Bool(false) => {}
                other => {
                    tokens.push(name.to_string());
                    self.serialize_value(other, tokens);
                }
            }
        }
        tokens.push("}".to_string());
    }

    fn serialize_positional(&self, value: &Value, tokens: &mut Vec<String>) {
        match value {
            Value::Bool(flag) => tokens.push(if *flag { "1" } else { "0" }.to_string()),
            other => self.serialize_value(other, tokens),
        }
    }

    fn serialize_value(&self, value: &Value, tokens: &mut Vec<String>) {
        match value {
            Value::Str(s) | Value::Choice(s) => tokens.push(s.clone()),
            Value::Int(i) => tokens.push(i.to_string()),
            Value::Float(f) => tokens.push(f.to_string()),
            Value::Bool(flag) => tokens.push(if *flag { "1" } else { "0" }.to_string()),
            Value::Object(obj) => {
                tokens.push(obj.type_name.clone());
                self.serialize_body(obj, tokens);
            }
            Value::List(items) if items.iter().all(Value::is_scalar) => {
                tokens.push(items.len().to_string());
                for item in items {
                    self.serialize_value(item, tokens);
                }
            }
            Value::List(items) => {
                tokens.push("{".to_string());
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        tokens.push(",".to_string());
                    }
                    self.serialize_value(item, tokens);
                }
                tokens.push("}".to_string());
            }
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentOps;

    fn scheme() -> Object {
        Object::new("Schema_euler_explicite")
            .with("tmax", Value::Float(5.0))
            .with_absent("dt_impr")
            .with("facsec", Value::Int(1))
    }

    #[test]
    fn test_scratch_output() {
        let doc = Dataset::scratch(2);
        assert_eq!(Serializer::new().serialize(&doc), "Dimension 2\nFin\n");
    }

    #[test]
    fn test_declarations_follow_preamble() {
        let mut doc = Dataset::scratch(3);
        doc.add_declaration(Object::new("Domaine").into(), "dom").unwrap();
        doc.add_declaration(Object::new("Pb_conduction").into(), "pb").unwrap();
        doc.add_entry(Entry::object(
            Object::new("Associate")
                .with("objet_1", Value::str("pb"))
                .with("objet_2", Value::str("dom")),
        ));

        let out = Serializer::new().serialize(&doc);
        assert_eq!(
            out,
            "Dimension 3\nDomaine dom\nPb_conduction pb\nAssociate pb dom\nFin\n"
        );
    }

    #[test]
    fn test_implicit_read_before_terminator() {
        let mut doc = Dataset::scratch(2);
        doc.add_declaration(scheme().into(), "sch").unwrap();
        doc.add_declaration(Object::new("Domaine").into(), "dom").unwrap();

        let tokens = Serializer::new().tokens(&doc);
        let expected: Vec<String> = [
            "Dimension", "2", "Schema_euler_explicite", "sch", "Domaine", "dom", "Read", "sch",
            "{", "tmax", "5", "facsec", "1", "}", "Fin",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_explicit_read_replaces_implicit() {
        let mut doc = Dataset::scratch(2);
        let dis = Object::new("VEFPreP1B")
            .with("p0", Value::Bool(true))
            .with("p1", Value::Bool(false));
        doc.add_declaration(dis.into(), "dis").unwrap();
        let read = doc.add_entry(Entry::read("dis"));
        doc.link_read_entry("dis", Some(read)).unwrap();

        let out = Serializer::new().serialize(&doc);
        assert_eq!(out, "Dimension 2\nVEFPreP1B dis\nRead dis { p0 }\nFin\n");
    }

    #[test]
    fn test_nested_values() {
        let post = Object::new("Postraitement")
            .with(
                "sondes",
                Value::List(vec![
                    Object::new("Sonde").with("nom", Value::str("s1")).into(),
                    Object::new("Sonde").with("nom", Value::str("s2")).into(),
                ]),
            )
            .with("coords", Value::List(vec![Value::Float(0.5), Value::Float(1.5)]));

        let mut doc = Dataset::new();
        doc.add_declaration(post.into(), "post").unwrap();

        let out = Serializer::new().serialize(&doc);
        assert_eq!(
            out,
            "Postraitement post\nRead post { sondes { Sonde { nom s1 } , Sonde { nom s2 } } coords 2 0.5 1.5 }\n"
        );
    }

    #[test]
    fn test_positional_flags() {
        let mut doc = Dataset::new();
        doc.push_entry(Entry::object(
            Object::new("EcritureLectureSpecial").with("type", Value::Bool(false)),
        ));
        assert_eq!(Serializer::new().serialize(&doc), "EcritureLectureSpecial 0\n");
    }

    #[test]
    fn test_options_from_json() {
        let options: SerializerOptions =
            serde_json::from_str(r#"{"preambleTypes": []}"#).unwrap();
        assert!(options.preamble_types.is_empty());
        assert_eq!(options.terminator_types, vec!["Fin", "End"]);

        let doc = Dataset::scratch(2);
        let out = Serializer::with_options(options).serialize(&doc);
        assert_eq!(out, "Dimension 2\nFin\n");
    }
}
