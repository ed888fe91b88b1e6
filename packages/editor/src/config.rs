use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use triogui_dataset::SerializerOptions;

use crate::errors::{EditorError, EditorResult};

pub const DEFAULT_CONFIG_NAME: &str = "triogui.config.json";

/// Kinds of named, declared dataset members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Domain,
    Problem,
    Scheme,
    Discretization,
    CoupledProblem,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Domain,
        EntityKind::Problem,
        EntityKind::Scheme,
        EntityKind::Discretization,
        EntityKind::CoupledProblem,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Domain => "domain",
            EntityKind::Problem => "problem",
            EntityKind::Scheme => "scheme",
            EntityKind::Discretization => "discretization",
            EntityKind::CoupledProblem => "coupled problem",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kinds of anonymous entries managed as lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryListKind {
    Mesh,
    Partition,
    Scatter,
    Mailler,
}

impl EntryListKind {
    pub const ALL: [EntryListKind; 4] = [
        EntryListKind::Mesh,
        EntryListKind::Partition,
        EntryListKind::Scatter,
        EntryListKind::Mailler,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntryListKind::Mesh => "mesh",
            EntryListKind::Partition => "partition",
            EntryListKind::Scatter => "scatter",
            EntryListKind::Mailler => "mailler",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityKindConfig {
    /// Types selectable for this kind are the concrete descendants of `base`
    pub base: String,

    /// Kinds without a type selector always use this type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_type: Option<String>,

    /// Concrete types that may also be written as `Read id { ... }`
    #[serde(default)]
    pub explicit_read_types: Vec<String>,
}

impl EntityKindConfig {
    pub fn selectable(base: &str) -> Self {
        Self {
            base: base.to_string(),
            fixed_type: None,
            explicit_read_types: Vec::new(),
        }
    }

    pub fn fixed(type_name: &str) -> Self {
        Self {
            base: type_name.to_string(),
            fixed_type: Some(type_name.to_string()),
            explicit_read_types: Vec::new(),
        }
    }

    pub fn supports_explicit_read(&self, type_name: &str) -> bool {
        self.explicit_read_types.iter().any(|t| t == type_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryListConfig {
    pub base: String,
}

/// Editor configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum retained undo checkpoints (0 = unlimited)
    #[serde(default)]
    pub history_limit: usize,

    #[serde(default = "default_entity_kinds")]
    pub entity_kinds: IndexMap<EntityKind, EntityKindConfig>,

    #[serde(default = "default_entry_lists")]
    pub entry_lists: IndexMap<EntryListKind, EntryListConfig>,

    #[serde(default)]
    pub serializer: SerializerOptions,
}

fn default_entity_kinds() -> IndexMap<EntityKind, EntityKindConfig> {
    let mut discretization = EntityKindConfig::selectable("Discretisation_base");
    discretization.explicit_read_types.push("VEFPreP1B".to_string());

    IndexMap::from([
        (EntityKind::Domain, EntityKindConfig::fixed("Domaine")),
        (EntityKind::Problem, EntityKindConfig::selectable("Pb_base")),
        (EntityKind::Scheme, EntityKindConfig::selectable("Schema_temps_base")),
        (EntityKind::Discretization, discretization),
        (EntityKind::CoupledProblem, EntityKindConfig::fixed("Probleme_couple")),
    ])
}

fn default_entry_lists() -> IndexMap<EntryListKind, EntryListConfig> {
    let list = |base: &str| EntryListConfig {
        base: base.to_string(),
    };
    IndexMap::from([
        (EntryListKind::Mesh, list("Lecture_base")),
        (EntryListKind::Partition, list("Partition")),
        (EntryListKind::Scatter, list("Scatter")),
        (EntryListKind::Mailler, list("Mailler")),
    ])
}

impl EditorConfig {
    /// Load config from a directory
    pub fn load(dir: impl AsRef<Path>) -> EditorResult<Self> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: EditorConfig = serde_json::from_str(&content).map_err(|e| {
                EditorError::Config(format!("{}: {}", config_path.display(), e))
            })?;
            tracing::info!("[EditorConfig] loaded {}", config_path.display());
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(EditorConfig::default())
        }
    }

    pub fn entity_kind(&self, kind: EntityKind) -> EditorResult<&EntityKindConfig> {
        self.entity_kinds
            .get(&kind)
            .ok_or_else(|| EditorError::Config(format!("no configuration for {}", kind)))
    }

    pub fn entry_list(&self, kind: EntryListKind) -> EditorResult<&EntryListConfig> {
        self.entry_lists
            .get(&kind)
            .ok_or_else(|| EditorError::Config(format!("no configuration for {}", kind.name())))
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 0,
            entity_kinds: default_entity_kinds(),
            entry_lists: default_entry_lists(),
            serializer: SerializerOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "historyLimit": 50,
            "entityKinds": {
                "problem": { "base": "Pb_base" },
                "discretization": {
                    "base": "Discretisation_base",
                    "explicitReadTypes": ["VEFPreP1B", "VEF"]
                }
            },
            "serializer": { "terminatorTypes": ["Fin"] }
        }"#;

        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.entity_kinds.len(), 2);
        assert!(config.entity_kinds[&EntityKind::Discretization].supports_explicit_read("VEF"));
        assert_eq!(config.entry_lists.len(), 4);
        assert_eq!(config.serializer.terminator_types, vec!["Fin"]);
        assert_eq!(config.serializer.preamble_types, vec!["Dimension"]);
        assert!(config.entity_kind(EntityKind::Domain).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.history_limit, 0);
        assert_eq!(
            config.entity_kinds[&EntityKind::Domain].fixed_type.as_deref(),
            Some("Domaine")
        );
        assert_eq!(config.entry_lists[&EntryListKind::Mesh].base, "Lecture_base");
    }

    #[test]
    fn test_load_missing_file_falls_back_to_default() {
        let dir = std::env::temp_dir().join(format!("triogui-config-missing-{}", std::process::id()));
        let config = EditorConfig::load(&dir).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = std::env::temp_dir().join(format!("triogui-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(DEFAULT_CONFIG_NAME), r#"{ "historyLimit": 3 }"#).unwrap();

        let config = EditorConfig::load(&dir).unwrap();
        assert_eq!(config.history_limit, 3);
        assert_eq!(config.entity_kinds.len(), 5);

        std::fs::write(dir.join(DEFAULT_CONFIG_NAME), "{ not json").unwrap();
        assert!(matches!(EditorConfig::load(&dir), Err(EditorError::Config(_))));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
