//! Command dispatch: settings, service wiring and output

use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands, TreeCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::RecordKey;
use crate::infrastructure::{InfraError, ServiceContainer};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Tree { command }) => cmd_tree(cli, command),
        Some(Commands::Shuffle { items, seed }) => cmd_shuffle(cli, items, *seed),
        Some(Commands::Random { min, max, seed }) => cmd_random(cli, *min, *max, *seed),
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => {
            Cli::command()
                .print_help()
                .map_err(|e| InfraError::io("print help", e))?;
            Ok(())
        }
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let settings = Settings::load(cli.config.as_deref())?;
    debug!("settings: {:?}", settings);
    Ok(settings)
}

#[instrument(level = "debug", skip(cli))]
fn cmd_tree(cli: &Cli, command: &TreeCommands) -> CliResult<()> {
    let mut settings = load_settings(cli)?;
    command.apply(&mut settings.tree);
    let container = ServiceContainer::new(settings);
    let service = &container.tree;

    match command {
        TreeCommands::Build { file, .. } => {
            output::info(&service.build_json(file)?);
        }
        TreeCommands::Show { file, .. } => {
            let diagrams = service.diagram(file)?;
            if diagrams.is_empty() {
                output::warning("no records below the configured root");
            }
            for diagram in diagrams {
                output::info(&diagram);
            }
        }
        TreeCommands::Ancestors { file, id, .. } => {
            let path = service.ancestors(file, &RecordKey::from_text(id))?;
            output::info(&service.records_json(&path)?);
        }
        TreeCommands::Descendants { file, id, .. } => {
            let below = service.descendants(file, &RecordKey::from_text(id))?;
            output::info(&service.records_json(&below)?);
        }
        TreeCommands::Check { file, .. } => {
            let report = service.check(file)?;
            output::header(&format!("{}", file.display()));
            output::detail(&format!("records:   {}", report.records));
            output::detail(&format!("top-level: {}", report.top_level));
            output::detail(&format!("depth:     {}", report.depth));

            if report.is_clean() {
                output::success("no duplicates, orphans or cycles");
                return Ok(());
            }
            for id in &report.duplicates {
                output::failure(&format!("duplicate id: {}", id));
            }
            for id in &report.orphans {
                output::failure(&format!("orphan: {}", id));
            }
            if let Some(id) = &report.cycle {
                output::failure(&format!("cycle through: {}", id));
            }
            return Err(CliError::Unhealthy(format!(
                "{} failed tree checks",
                file.display()
            )));
        }
    }
    Ok(())
}

#[instrument(level = "debug", skip(cli))]
fn cmd_shuffle(cli: &Cli, items: &[String], seed: Option<u64>) -> CliResult<()> {
    let container = ServiceContainer::new(load_settings(cli)?);
    let shuffled = if items.is_empty() {
        container.shuffle.shuffle_lines(io::stdin().lock(), seed)?
    } else {
        container.shuffle.shuffle_items(items.iter().cloned(), seed)?
    };
    for item in shuffled {
        output::info(&item);
    }
    Ok(())
}

fn cmd_random(cli: &Cli, min: i64, max: i64, seed: Option<u64>) -> CliResult<()> {
    let container = ServiceContainer::new(load_settings(cli)?);
    output::info(&container.shuffle.random(min, max, seed)?);
    Ok(())
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => match global_config_path() {
            Some(path) => {
                let state = if path.exists() { "" } else { " (not present)" };
                output::info(&format!("{}{}", path.display(), state));
            }
            None => output::warning("no home directory; global config disabled"),
        },
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}
