//! Store configuration model and loader.
//!
//! Parses the hierarchical `config.yaml` document — stores, category
//! trees, policies, and modes — into the in-memory registry. Parsing and
//! validation are pure transforms; reading and writing the file itself is
//! the job of the storage adapter's config capability.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::DomainError;
use crate::types::{CategoryPath, Slug, MAX_DESCRIPTION_LENGTH};

/// Store name every deployment is expected to have.
pub const DEFAULT_STORE_NAME: &str = "default";

/// Adapter tag of the built-in filesystem adapter.
pub const FILESYSTEM_KIND: &str = "filesystem";

/// Category governance mode for a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryMode {
    #[default]
    Free,
    Subcategories,
    Strict,
}

/// Per-category policy block as declared in configuration. Unset fields
/// inherit from ancestors and ultimately the system defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ttl_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_content_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory_creation: Option<bool>,
}

/// Declared permission overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<bool>,
}

/// One node of a store's declared category tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<PolicyConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subcategories: BTreeMap<String, CategoryConfig>,
}

fn default_kind() -> String {
    FILESYSTEM_KIND.to_string()
}

/// Registry entry for one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDefinition {
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub category_mode: CategoryMode,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub categories: BTreeMap<String, CategoryConfig>,
    #[serde(default, skip_serializing_if = "serde_yaml::Mapping::is_empty")]
    pub properties: serde_yaml::Mapping,
}

impl Default for StoreDefinition {
    fn default() -> Self {
        StoreDefinition {
            kind: default_kind(),
            description: None,
            category_mode: CategoryMode::default(),
            categories: BTreeMap::new(),
            properties: serde_yaml::Mapping::new(),
        }
    }
}

impl StoreDefinition {
    /// The per-store metadata persisted inside the store itself.
    pub fn to_store_data(&self) -> StoreData {
        StoreData {
            description: self.description.clone(),
            category_mode: self.category_mode,
            categories: self.categories.clone(),
        }
    }

    /// Value of a string property, if present.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties
            .get(&serde_yaml::Value::String(key.to_string()))
            .and_then(|v| v.as_str())
    }
}

/// Per-store metadata persisted by the store capability (store.yaml).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub category_mode: CategoryMode,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub categories: BTreeMap<String, CategoryConfig>,
}

/// The in-memory registry: store name to definition.
pub type Registry = BTreeMap<Slug, StoreDefinition>;

/// Top-level shape of config.yaml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    stores: BTreeMap<String, StoreDefinition>,
}

/// Parse and validate a config.yaml document into a registry.
pub fn parse_registry(text: &str) -> Result<Registry, DomainError> {
    let registry = parse_registry_lenient(text)?;
    if registry.is_empty() {
        return Err(DomainError::InvalidArguments {
            reason: "config must declare at least one store".to_string(),
        });
    }
    Ok(registry)
}

/// Like [`parse_registry`] but tolerates an empty store map. Used by
/// adapters for read-modify-write cycles on a registry being built up.
pub(crate) fn parse_registry_lenient(text: &str) -> Result<Registry, DomainError> {
    let doc: ConfigDocument =
        serde_yaml::from_str(text).map_err(|e| DomainError::ConfigReadFailed {
            reason: format!("config.yaml: {e}"),
        })?;

    let mut registry = Registry::new();
    for (name, definition) in doc.stores {
        let slug = Slug::new(&name).map_err(|_| DomainError::InvalidStoreName {
            name: name.clone(),
            reason: "store names must be valid slugs".to_string(),
        })?;
        validate_category_tree(&definition.categories, &name)?;
        registry.insert(slug, definition);
    }
    Ok(registry)
}

/// Render a registry back to config.yaml text.
pub fn render_registry(registry: &Registry) -> Result<String, DomainError> {
    let doc = ConfigDocument {
        stores: registry
            .iter()
            .map(|(name, def)| (name.to_string(), def.clone()))
            .collect(),
    };
    serde_yaml::to_string(&doc).map_err(|e| DomainError::SerializeFailed {
        reason: format!("config.yaml: {e}"),
    })
}

fn validate_category_tree(
    categories: &BTreeMap<String, CategoryConfig>,
    store: &str,
) -> Result<(), DomainError> {
    for (segment, node) in categories {
        Slug::new(segment).map_err(|_| DomainError::InvalidPath {
            path: segment.clone(),
            reason: format!("category segment declared in store '{store}' is not a valid slug"),
        })?;
        if let Some(description) = &node.description {
            let length = description.chars().count();
            if length > MAX_DESCRIPTION_LENGTH {
                return Err(DomainError::DescriptionTooLong {
                    length,
                    limit: MAX_DESCRIPTION_LENGTH,
                });
            }
        }
        validate_category_tree(&node.subcategories, store)?;
    }
    Ok(())
}

/// Look up the declared node for a category path. Root has no node.
pub fn find_category<'a>(
    categories: &'a BTreeMap<String, CategoryConfig>,
    path: &CategoryPath,
) -> Option<&'a CategoryConfig> {
    let mut segments = path.segments().iter();
    let first = segments.next()?;
    let mut node = categories.get(first.as_str())?;
    for segment in segments {
        node = node.subcategories.get(segment.as_str())?;
    }
    Some(node)
}

/// Whether a category path is declared in configuration. Declared
/// categories are protected from deletion and description changes.
pub fn is_declared(categories: &BTreeMap<String, CategoryConfig>, path: &CategoryPath) -> bool {
    !path.is_root() && find_category(categories, path).is_some()
}

/// All declared category paths, parents before children.
pub fn declared_paths(categories: &BTreeMap<String, CategoryConfig>) -> Vec<CategoryPath> {
    fn walk(
        categories: &BTreeMap<String, CategoryConfig>,
        prefix: &CategoryPath,
        out: &mut Vec<CategoryPath>,
    ) {
        for (segment, node) in categories {
            let slug = match Slug::new(segment) {
                Ok(slug) => slug,
                Err(_) => continue,
            };
            let path = prefix.join(slug);
            out.push(path.clone());
            walk(&node.subcategories, &path, out);
        }
    }
    let mut out = Vec::new();
    walk(categories, &CategoryPath::root(), &mut out);
    out
}

/// Resolve the data directory: `CORTEX_DATA_DIR` wins, then
/// `~/.cortex/data`, then `./cortex-data` when no home exists.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CORTEX_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    match dirs::home_dir() {
        Some(mut home) => {
            home.push(".cortex");
            home.push("data");
            home
        }
        None => PathBuf::from("cortex-data"),
    }
}

/// A minimal starter registry with one free-mode filesystem store.
pub fn starter_registry() -> Registry {
    let mut registry = Registry::new();
    registry.insert(
        Slug::new(DEFAULT_STORE_NAME).expect("default store name is a slug"),
        StoreDefinition::default(),
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SAMPLE: &str = r#"
stores:
  default:
    kind: filesystem
    category_mode: subcategories
    categories:
      standards:
        description: Engineering standards
        policies:
          max_content_length: 5000
        subcategories:
          typescript:
            policies:
              permissions:
                delete: false
      standup:
        policies:
          default_ttl_days: 7
"#;

    #[test]
    fn parses_a_nested_store_tree() {
        let registry = parse_registry(SAMPLE).unwrap();
        let store = registry.get(&Slug::new("default").unwrap()).unwrap();
        assert_eq!(store.category_mode, CategoryMode::Subcategories);

        let standards = store.categories.get("standards").unwrap();
        assert_eq!(
            standards.description.as_deref(),
            Some("Engineering standards")
        );
        assert_eq!(
            standards.policies.as_ref().unwrap().max_content_length,
            Some(5000)
        );
        assert!(standards.subcategories.contains_key("typescript"));
    }

    #[test]
    fn rejects_an_empty_store_map() {
        assert!(parse_registry("stores: {}").is_err());
        assert!(parse_registry("").is_err());
    }

    #[test]
    fn rejects_invalid_store_names() {
        let err = parse_registry("stores:\n  Bad_Name:\n    kind: filesystem\n").unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidStoreName);
    }

    #[test]
    fn round_trips_through_render() {
        let registry = parse_registry(SAMPLE).unwrap();
        let rendered = render_registry(&registry).unwrap();
        let reparsed = parse_registry(&rendered).unwrap();
        assert_eq!(registry, reparsed);
    }

    #[test]
    fn finds_declared_nodes_by_path() {
        let registry = parse_registry(SAMPLE).unwrap();
        let store = registry.get(&Slug::new("default").unwrap()).unwrap();

        let path = CategoryPath::parse("standards/typescript").unwrap();
        assert!(find_category(&store.categories, &path).is_some());
        assert!(is_declared(&store.categories, &path));

        let missing = CategoryPath::parse("standards/go").unwrap();
        assert!(find_category(&store.categories, &missing).is_none());
        assert!(!is_declared(&store.categories, &CategoryPath::root()));
    }

    #[test]
    fn declared_paths_walk_parents_first() {
        let registry = parse_registry(SAMPLE).unwrap();
        let store = registry.get(&Slug::new("default").unwrap()).unwrap();
        let paths: Vec<String> = declared_paths(&store.categories)
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(
            paths,
            vec![
                "standards".to_string(),
                "standards/typescript".to_string(),
                "standup".to_string(),
            ]
        );
    }

    #[test]
    #[serial]
    fn data_dir_honors_the_environment() {
        std::env::set_var("CORTEX_DATA_DIR", "/tmp/cortex-test-data");
        assert_eq!(default_data_dir(), PathBuf::from("/tmp/cortex-test-data"));
        std::env::remove_var("CORTEX_DATA_DIR");
        assert!(default_data_dir().ends_with("data") || default_data_dir().ends_with("cortex-data"));
    }
}
