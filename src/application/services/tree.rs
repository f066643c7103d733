//! Tree service
//!
//! Loads flat JSON record files and answers tree questions about them:
//! the nested forest, ancestor chains, descendant sets and a health report.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::TreeSettings;
use crate::domain::collection::{duplicates, sort_by_field};
use crate::domain::{
    build_tree, fold_forest, forest_depth, DomainError, FlatRecord, Node, RecordKey, TreeIndex,
};
use crate::infrastructure::traits::FileSystem;

/// Structural health of a record file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeReport {
    pub records: usize,
    pub top_level: usize,
    /// Depth of the deepest tree; 0 when a cycle prevents building
    pub depth: usize,
    /// Ids carried by more than one record
    pub duplicates: Vec<RecordKey>,
    /// Records whose parent does not exist
    pub orphans: Vec<RecordKey>,
    /// A record on a parent cycle, if any
    pub cycle: Option<String>,
}

impl TreeReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty() && self.orphans.is_empty() && self.cycle.is_none()
    }
}

/// Service for building and tracing trees from record files.
pub struct TreeService {
    fs: Arc<dyn FileSystem>,
    settings: TreeSettings,
}

impl TreeService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: TreeSettings) -> Self {
        Self { fs, settings }
    }

    /// Read and parse a JSON array of records.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<Vec<FlatRecord>> {
        if !self.fs.is_file(path) {
            return Err(ApplicationError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read records", path)?;
        let records = self.parse(path, &content)?;
        debug!("load: {} records from {}", records.len(), path.display());
        Ok(records)
    }

    /// Parse record text; `source` only labels errors.
    pub fn parse(&self, source: &Path, content: &str) -> ApplicationResult<Vec<FlatRecord>> {
        let mut document: Value =
            serde_json::from_str(content).map_err(|e| ApplicationError::InvalidInput {
                path: source.to_path_buf(),
                message: e.to_string(),
            })?;

        if let (Some(field), Value::Array(items)) = (&self.settings.sort_by, &mut document) {
            sort_by_field(items, field, self.settings.sort_order);
        }

        Ok(self.settings.selector().parse(&document)?)
    }

    /// Forest of the records below the configured root value.
    pub fn build(&self, path: &Path) -> ApplicationResult<Vec<Node<FlatRecord>>> {
        let records = self.load(path)?;
        Ok(build_tree(
            &records,
            &self.settings.root_key(),
            self.settings.duplicates,
        )?)
    }

    /// `build`, refusing forests deeper than `max_depth`. JSON and diagram
    /// rendering recurse once per level.
    fn build_renderable(&self, path: &Path) -> ApplicationResult<Vec<Node<FlatRecord>>> {
        let forest = self.build(path)?;
        let depth = forest_depth(&forest);
        if depth > self.settings.max_depth {
            return Err(DomainError::InvalidArgument(format!(
                "tree depth {} exceeds max_depth {}",
                depth, self.settings.max_depth
            ))
            .into());
        }
        Ok(forest)
    }

    /// `build` rendered as pretty nested JSON.
    pub fn build_json(&self, path: &Path) -> ApplicationResult<String> {
        let forest = self.build_renderable(path)?;
        to_pretty_json(&self.settings.selector().render_forest(&forest))
    }

    /// `build` rendered as one diagram per top-level record.
    pub fn diagram(&self, path: &Path) -> ApplicationResult<Vec<Tree<String>>> {
        let forest = self.build_renderable(path)?;
        Ok(fold_forest(&forest, |record, leaves: Vec<Tree<String>>| {
            Tree::new(self.label(record)).with_leaves(leaves)
        }))
    }

    /// Ancestors of `id`, nearest first.
    #[instrument(level = "debug", skip(self))]
    pub fn ancestors(&self, path: &Path, id: &RecordKey) -> ApplicationResult<Vec<FlatRecord>> {
        let records = self.load(path)?;
        let root = self.settings.root_key();
        let index = TreeIndex::build(&records, Some(&root), self.settings.duplicates)?;
        Ok(index.ancestors(id)?.into_iter().cloned().collect())
    }

    /// Everything below `id`, parent before children.
    #[instrument(level = "debug", skip(self))]
    pub fn descendants(&self, path: &Path, id: &RecordKey) -> ApplicationResult<Vec<FlatRecord>> {
        let records = self.load(path)?;
        let index = TreeIndex::build(&records, None, self.settings.duplicates)?;
        Ok(index.descendants(id)?.into_iter().cloned().collect())
    }

    /// Flat records rendered as pretty JSON.
    pub fn records_json(&self, records: &[FlatRecord]) -> ApplicationResult<String> {
        to_pretty_json(&self.settings.selector().render_records(records))
    }

    /// Duplicates, orphans and cycles without failing on any of them.
    #[instrument(level = "debug", skip(self))]
    pub fn check(&self, path: &Path) -> ApplicationResult<TreeReport> {
        let records = self.load(path)?;
        let ids: Vec<RecordKey> = records.iter().map(|r| r.key.clone()).collect();
        let root = self.settings.root_key();
        let index = TreeIndex::build(&records, Some(&root), Default::default())?;

        let (cycle, depth) = match index.to_forest() {
            Ok(forest) => (None, forest_depth(&forest)),
            Err(DomainError::CyclicReference { id }) => (Some(id), 0),
            Err(e) => return Err(e.into()),
        };

        Ok(TreeReport {
            records: records.len(),
            top_level: index.roots().len(),
            depth,
            duplicates: duplicates(&ids),
            orphans: index.orphans().into_iter().map(|r| r.key.clone()).collect(),
            cycle,
        })
    }

    fn label(&self, record: &FlatRecord) -> String {
        let label = self
            .settings
            .label_field
            .as_ref()
            .and_then(|field| record.payload.get(field))
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        match label {
            Some(label) => format!("{} {}", record.key, label),
            None => record.key.to_string(),
        }
    }
}

fn to_pretty_json(value: &Value) -> ApplicationResult<String> {
    serde_json::to_string_pretty(value).map_err(ApplicationError::Serialize)
}
