//! Domain layer: records, trees and shuffling
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod collection;
pub mod error;
pub mod record;
pub mod shuffle;
pub mod tree;

pub use error::{DomainError, DomainResult};
pub use record::{FlatRecord, Record, RecordKey};
pub use shuffle::{random_in_range, shuffle, shuffled, shuffled_from_iter};
pub use tree::{
    ancestor_path, build_tree, descendant_set, fold_forest, for_each_node, forest_depth,
    DuplicatePolicy, Node, TreeIndex,
};
