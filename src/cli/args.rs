//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::config::TreeSettings;
use crate::domain::collection::SortOrder;
use crate::domain::DuplicatePolicy;

/// Flat parent-linked records to trees: build, trace ancestors/descendants, and shuffle
#[derive(Parser, Debug)]
#[command(name = "flatree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log verbosity: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file, layered over the global config
    #[arg(short, long, global = true, env = "FLATREE_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and trace trees from a JSON array of flat records
    Tree {
        #[command(subcommand)]
        command: TreeCommands,
    },

    /// Shuffle items (arguments, or stdin lines when none are given)
    Shuffle {
        /// Items to shuffle
        items: Vec<String>,
        /// Seed for a reproducible order
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Random integer between MIN and MAX, inclusive
    #[command(allow_negative_numbers = true)]
    Random {
        min: i64,
        max: i64,
        /// Seed for a reproducible draw
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Field selection flags shared by all tree commands; unset flags keep the configured value.
#[derive(Args, Debug, Clone, Default)]
pub struct FieldArgs {
    /// Parent value of top-level records ("null", "0", ...)
    #[arg(long)]
    pub root: Option<String>,
    /// Field holding the record id
    #[arg(long)]
    pub id_field: Option<String>,
    /// Field holding the parent reference
    #[arg(long)]
    pub parent_field: Option<String>,
    /// Field the children array is written to
    #[arg(long)]
    pub children_field: Option<String>,
    /// Also emit this field, set to the record id
    #[arg(long)]
    pub key_field: Option<String>,
    /// Fail on duplicate ids instead of keeping the first
    #[arg(long)]
    pub strict: bool,
    /// Leave null and empty-string fields out of the output
    #[arg(long)]
    pub drop_empty: bool,
    /// Refuse to render trees deeper than this
    #[arg(long)]
    pub max_depth: Option<usize>,
}

impl FieldArgs {
    pub fn apply(&self, settings: &mut TreeSettings) {
        if let Some(root) = &self.root {
            settings.root = root.clone();
        }
        if let Some(field) = &self.id_field {
            settings.id_field = field.clone();
        }
        if let Some(field) = &self.parent_field {
            settings.parent_field = field.clone();
        }
        if let Some(field) = &self.children_field {
            settings.children_field = field.clone();
        }
        if let Some(field) = &self.key_field {
            settings.key_field = Some(field.clone());
        }
        if self.strict {
            settings.duplicates = DuplicatePolicy::Reject;
        }
        if self.drop_empty {
            settings.drop_empty = true;
        }
        if let Some(depth) = self.max_depth {
            settings.max_depth = depth;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum TreeCommands {
    /// Print the nested forest as JSON
    Build {
        /// JSON file with an array of records
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[command(flatten)]
        fields: FieldArgs,
        /// Sort records by this numeric field before building
        #[arg(long)]
        sort_by: Option<String>,
        /// Sort descending
        #[arg(long, requires = "sort_by")]
        desc: bool,
    },

    /// Print the forest as a tree diagram
    Show {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[command(flatten)]
        fields: FieldArgs,
        /// Field printed next to each id
        #[arg(long)]
        label: Option<String>,
    },

    /// Print the ancestors of a record, nearest first
    Ancestors {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Record id
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Print every record below a record, parent before children
    Descendants {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Record id
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Report duplicates, orphans and cycles
    Check {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[command(flatten)]
        fields: FieldArgs,
    },
}

impl TreeCommands {
    /// Layer this command's flags over the configured tree settings.
    pub fn apply(&self, settings: &mut TreeSettings) {
        match self {
            TreeCommands::Build {
                fields,
                sort_by,
                desc,
                ..
            } => {
                fields.apply(settings);
                if let Some(field) = sort_by {
                    settings.sort_by = Some(field.clone());
                    settings.sort_order = if *desc { SortOrder::Desc } else { SortOrder::Asc };
                }
            }
            TreeCommands::Show { fields, label, .. } => {
                fields.apply(settings);
                if let Some(label) = label {
                    settings.label_field = Some(label.clone());
                }
            }
            TreeCommands::Ancestors { fields, .. }
            | TreeCommands::Descendants { fields, .. }
            | TreeCommands::Check { fields, .. } => fields.apply(settings),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Show the global config file location
    Path,
    /// Print a commented config template
    Template,
}
