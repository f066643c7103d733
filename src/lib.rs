//! flatree: trees from flat parent-linked records, plus unbiased shuffling.
//!
//! Layers, innermost first:
//! - `domain`: records, tree index and traversals, Fisher-Yates shuffle
//! - `application`: JSON field mapping and services
//! - `infrastructure`: filesystem seam and service wiring
//! - `cli`: argument parsing and output

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
