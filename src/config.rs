//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/flatree/flatree.toml`
//! 3. Explicit config file (`--config <file>`)
//! 4. Environment variables: `FLATREE_*` prefix, `__` between table and key
//! 5. Command-line flags (applied by the CLI layer)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{ApplicationError, FieldSelector};
use crate::domain::collection::SortOrder;
use crate::domain::{DuplicatePolicy, RecordKey};
use crate::util::path::expand_path;

/// Default upper bound on items accepted by `shuffle`.
pub const DEFAULT_MAX_ITEMS: usize = 1_000_000;

/// Default upper bound on the depth of a rendered tree.
pub const DEFAULT_MAX_DEPTH: usize = 1_000;

/// How flat records are read and turned into trees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TreeSettings {
    /// Field holding the record id
    pub id_field: String,
    /// Field holding the parent reference
    pub parent_field: String,
    /// Field the children array is written to
    pub children_field: String,
    /// Optional field set to the record id on output
    pub key_field: Option<String>,
    /// Parent value that marks a top-level record ("null", "0", ...)
    pub root: String,
    /// Duplicate id handling
    pub duplicates: DuplicatePolicy,
    /// Numeric field to sort records by before building
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    /// Field shown next to the id in `tree show`
    pub label_field: Option<String>,
    /// Drop null and empty-string fields from emitted records
    pub drop_empty: bool,
    /// Deepest tree `tree build` / `tree show` will render
    pub max_depth: usize,
}

impl Default for TreeSettings {
    fn default() -> Self {
        let fields = FieldSelector::default();
        Self {
            id_field: fields.id_field,
            parent_field: fields.parent_field,
            children_field: fields.children_field,
            key_field: fields.key_field,
            root: "null".into(),
            duplicates: DuplicatePolicy::FirstWins,
            sort_by: None,
            sort_order: SortOrder::Asc,
            label_field: None,
            drop_empty: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl TreeSettings {
    pub fn selector(&self) -> FieldSelector {
        FieldSelector {
            id_field: self.id_field.clone(),
            parent_field: self.parent_field.clone(),
            children_field: self.children_field.clone(),
            key_field: self.key_field.clone(),
            drop_empty: self.drop_empty,
        }
    }

    /// The sentinel root value as a key.
    pub fn root_key(&self) -> RecordKey {
        match self.root.parse::<RecordKey>() {
            Ok(key) => key,
            Err(never) => match never {},
        }
    }
}

/// Shuffle defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShuffleSettings {
    /// Fixed seed for reproducible output; random when unset
    pub seed: Option<u64>,
    /// Reject inputs longer than this
    pub max_items: usize,
}

impl Default for ShuffleSettings {
    fn default() -> Self {
        Self {
            seed: None,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

/// Raw tree settings for intermediate parsing (`None` → inherit from base).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawTreeSettings {
    pub id_field: Option<String>,
    pub parent_field: Option<String>,
    pub children_field: Option<String>,
    pub key_field: Option<String>,
    pub root: Option<String>,
    pub duplicates: Option<DuplicatePolicy>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub label_field: Option<String>,
    pub drop_empty: Option<bool>,
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawShuffleSettings {
    pub seed: Option<u64>,
    pub max_items: Option<usize>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub tree: RawTreeSettings,
    pub shuffle: RawShuffleSettings,
}

/// Unified configuration for flatree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    pub tree: TreeSettings,
    pub shuffle: ShuffleSettings,
}

/// Get the XDG config directory for flatree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "flatree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("flatree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl TreeSettings {
    fn merge_with(&self, overlay: &RawTreeSettings) -> Self {
        Self {
            id_field: overlay.id_field.clone().unwrap_or_else(|| self.id_field.clone()),
            parent_field: overlay
                .parent_field
                .clone()
                .unwrap_or_else(|| self.parent_field.clone()),
            children_field: overlay
                .children_field
                .clone()
                .unwrap_or_else(|| self.children_field.clone()),
            key_field: overlay.key_field.clone().or_else(|| self.key_field.clone()),
            root: overlay.root.clone().unwrap_or_else(|| self.root.clone()),
            duplicates: overlay.duplicates.unwrap_or(self.duplicates),
            sort_by: overlay.sort_by.clone().or_else(|| self.sort_by.clone()),
            sort_order: overlay.sort_order.unwrap_or(self.sort_order),
            label_field: overlay
                .label_field
                .clone()
                .or_else(|| self.label_field.clone()),
            drop_empty: overlay.drop_empty.unwrap_or(self.drop_empty),
            max_depth: overlay.max_depth.unwrap_or(self.max_depth),
        }
    }
}

impl ShuffleSettings {
    fn merge_with(&self, overlay: &RawShuffleSettings) -> Self {
        Self {
            seed: overlay.seed.or(self.seed),
            max_items: overlay.max_items.unwrap_or(self.max_items),
        }
    }
}

impl Settings {
    /// Scalar options: overlay wins if Some, otherwise keep base.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            tree: self.tree.merge_with(&overlay.tree),
            shuffle: self.shuffle.merge_with(&overlay.shuffle),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file given on the command line; must exist
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("loading global config: {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        // 3. Explicit config file
        if let Some(path) = explicit {
            let path = expand_path(path);
            if !path.is_file() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            debug!("loading config: {}", path.display());
            current = current.merge_with(&load_raw_settings(&path)?);
        }

        // 4. Environment variables
        Self::apply_env_overrides(current)
    }

    /// Apply FLATREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("FLATREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("tree.id_field") {
            settings.tree.id_field = val;
        }
        if let Ok(val) = config.get_string("tree.parent_field") {
            settings.tree.parent_field = val;
        }
        if let Ok(val) = config.get_string("tree.children_field") {
            settings.tree.children_field = val;
        }
        if let Ok(val) = config.get_string("tree.key_field") {
            settings.tree.key_field = Some(val);
        }
        if let Ok(val) = config.get_string("tree.root") {
            settings.tree.root = val;
        }
        if let Ok(val) = config.get_string("tree.duplicates") {
            settings.tree.duplicates = parse_duplicate_policy(&val)?;
        }
        if let Ok(val) = config.get_string("tree.sort_by") {
            settings.tree.sort_by = Some(val);
        }
        if let Ok(val) = config.get_string("tree.sort_order") {
            settings.tree.sort_order = parse_sort_order(&val)?;
        }
        if let Ok(val) = config.get_string("tree.label_field") {
            settings.tree.label_field = Some(val);
        }
        if let Ok(val) = config.get::<bool>("tree.drop_empty") {
            settings.tree.drop_empty = val;
        }
        if let Ok(val) = config.get::<usize>("tree.max_depth") {
            settings.tree.max_depth = val;
        }
        if let Ok(val) = config.get::<u64>("shuffle.seed") {
            settings.shuffle.seed = Some(val);
        }
        if let Ok(val) = config.get::<usize>("shuffle.max_items") {
            settings.shuffle.max_items = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# flatree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/flatree/flatree.toml
#   File:   --config <file>
#   Env:    FLATREE_<TABLE>__<KEY>, e.g. FLATREE_TREE__ROOT=0

[tree]
# Field names in the input records
# id_field = "id"
# parent_field = "parentId"
# children_field = "children"

# Also emit this field, set to the record id, on every output node
# key_field = "key"

# Parent value of top-level records ("null", "0", ...)
# root = "null"

# Duplicate ids: "first-wins" (later duplicates dropped) or "reject"
# duplicates = "first-wins"

# Sort records by a numeric field before building ("asc" or "desc")
# sort_by = "order"
# sort_order = "asc"

# Field shown next to the id in `flatree tree show`
# label_field = "name"

# Leave null and "" fields out of emitted records
# drop_empty = false

# Refuse to render trees deeper than this
# max_depth = 1000

[shuffle]
# Fixed seed for reproducible shuffles
# seed = 42

# Reject inputs with more items than this
# max_items = 1000000
"#
        .to_string()
    }
}

fn parse_duplicate_policy(value: &str) -> Result<DuplicatePolicy, ApplicationError> {
    match value.trim() {
        "first-wins" => Ok(DuplicatePolicy::FirstWins),
        "reject" => Ok(DuplicatePolicy::Reject),
        other => Err(ApplicationError::Config {
            message: format!("unknown duplicates policy: {other}"),
        }),
    }
}

fn parse_sort_order(value: &str) -> Result<SortOrder, ApplicationError> {
    match value.trim() {
        "asc" => Ok(SortOrder::Asc),
        "desc" => Ok(SortOrder::Desc),
        other => Err(ApplicationError::Config {
            message: format!("unknown sort order: {other}"),
        }),
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
