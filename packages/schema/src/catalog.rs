//! # Schema Catalog
//!
//! In-memory [`SchemaOracle`] built from flat class records.
//!
//! ```text
//! ClassDef records (JSON or builder)
//!        │
//!        ▼  build(): duplicate / parent / cycle checks
//! ClassInfo { fields: inherited + own, descendants }
//! ```
//!
//! Inheritance is resolved once at build time, so lookups are plain map
//! reads.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{SchemaError, SchemaResult};
use crate::oracle::SchemaOracle;
use crate::types::FieldMeta;

/// One class as written in a catalog file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,

    #[serde(default)]
    pub parent: Option<String>,

    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,

    #[serde(default)]
    pub description: String,

    /// Own fields; inherited ones are added at build time
    #[serde(default)]
    pub fields: Vec<FieldMeta>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            is_abstract: false,
            description: String::new(),
            fields: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn field(mut self, field: FieldMeta) -> Self {
        self.fields.push(field);
        self
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    classes: Vec<ClassDef>,
}

#[derive(Debug, Clone)]
struct ClassInfo {
    parent: Option<String>,
    is_abstract: bool,
    description: String,
    fields: Vec<FieldMeta>,
    descendants: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    classes: IndexMap<String, ClassInfo>,
}

impl SchemaCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Parse a `{ "classes": [ ... ] }` document
    pub fn from_json(source: &str) -> SchemaResult<Self> {
        let file: CatalogFile = serde_json::from_str(source)?;
        Self::from_defs(file.classes)
    }

    pub fn load(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("[SchemaCatalog] loading {}", path.as_ref().display());
        Self::from_json(&source)
    }

    pub fn from_defs(defs: Vec<ClassDef>) -> SchemaResult<Self> {
        let mut raw: IndexMap<String, ClassDef> = IndexMap::new();
        for def in defs {
            if raw.contains_key(&def.name) {
                return Err(SchemaError::DuplicateClass(def.name));
            }
            raw.insert(def.name.clone(), def);
        }

        // Validate first
        for def in raw.values() {
            if let Some(parent) = &def.parent {
                if !raw.contains_key(parent) {
                    return Err(SchemaError::UnknownParent {
                        class: def.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
            ancestors(&raw, &def.name)?;
        }

        let mut classes = IndexMap::new();
        for def in raw.values() {
            let chain = ancestors(&raw, &def.name)?;
            let mut fields: Vec<FieldMeta> = Vec::new();
            for ancestor in chain.iter().rev().chain(std::iter::once(&def.name)) {
                for field in &raw[ancestor.as_str()].fields {
                    match fields.iter_mut().find(|f| f.name == field.name) {
                        Some(existing) => *existing = field.clone(),
                        None => fields.push(field.clone()),
                    }
                }
            }

            classes.insert(
                def.name.clone(),
                ClassInfo {
                    parent: def.parent.clone(),
                    is_abstract: def.is_abstract,
                    description: def.description.clone(),
                    fields,
                    descendants: Vec::new(),
                },
            );
        }

        for name in raw.keys() {
            for ancestor in ancestors(&raw, name)? {
                if let Some(info) = classes.get_mut(&ancestor) {
                    info.descendants.push(name.clone());
                }
            }
        }

        tracing::debug!("[SchemaCatalog] built {} classes", classes.len());
        Ok(Self { classes })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn description_of(&self, type_name: &str) -> SchemaResult<&str> {
        Ok(&self.info(type_name)?.description)
    }

    fn info(&self, type_name: &str) -> SchemaResult<&ClassInfo> {
        self.classes
            .get(type_name)
            .ok_or_else(|| SchemaError::UnknownType(type_name.to_string()))
    }
}

/// Parent chain of a class, nearest first
fn ancestors(raw: &IndexMap<String, ClassDef>, name: &str) -> SchemaResult<Vec<String>> {
    let mut chain = Vec::new();
    let mut current = raw.get(name).and_then(|def| def.parent.clone());
    while let Some(parent) = current {
        if parent == name || chain.contains(&parent) {
            return Err(SchemaError::InheritanceCycle(name.to_string()));
        }
        current = raw.get(&parent).and_then(|def| def.parent.clone());
        chain.push(parent);
    }
    Ok(chain)
}

impl SchemaOracle for SchemaCatalog {
    fn fields_of(&self, type_name: &str) -> SchemaResult<&[FieldMeta]> {
        Ok(&self.info(type_name)?.fields)
    }

    fn subclasses_of(&self, type_name: &str) -> SchemaResult<&[String]> {
        Ok(&self.info(type_name)?.descendants)
    }

    fn parent_of(&self, type_name: &str) -> SchemaResult<Option<&str>> {
        Ok(self.info(type_name)?.parent.as_deref())
    }

    fn is_concrete(&self, type_name: &str) -> SchemaResult<bool> {
        Ok(!self.info(type_name)?.is_abstract)
    }
}

#[derive(Debug, Default)]
pub struct CatalogBuilder {
    defs: Vec<ClassDef>,
}

impl CatalogBuilder {
    pub fn class(mut self, def: ClassDef) -> Self {
        self.defs.push(def);
        self
    }

    pub fn build(self) -> SchemaResult<SchemaCatalog> {
        SchemaCatalog::from_defs(self.defs)
    }
}
