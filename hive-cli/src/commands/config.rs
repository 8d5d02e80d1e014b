use crate::config::ConfigLoader;
use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use hive_core::HiveConfig;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// List the files and directories hive reads and writes
    #[command(alias = "path")]
    Paths,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    let config = ConfigLoader::load()?;

    match args.command {
        ConfigCommands::Show => print!("{}", toml::to_string_pretty(&config)?),
        ConfigCommands::Paths => println!(
            "{}",
            locations_table(&locations(
                &config,
                ConfigLoader::user_config_path(),
                ConfigLoader::project_config_path(),
            ))
        ),
    }
    Ok(())
}

/// Labelled locations in the order they are consulted
fn locations(
    config: &HiveConfig,
    user: PathBuf,
    project: PathBuf,
) -> Vec<(&'static str, PathBuf)> {
    vec![
        ("User config", user),
        ("Project config", project),
        ("References file", config.paths.references_file.clone()),
        ("Cache root", config.paths.cache_dir.clone()),
    ]
}

fn status(path: &Path) -> Cell {
    if path.exists() {
        Cell::new("present").fg(Color::Green)
    } else {
        Cell::new("missing").fg(Color::DarkGrey)
    }
}

fn locations_table(locations: &[(&'static str, PathBuf)]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Location").fg(Color::Cyan),
        Cell::new("Path").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
    ]);

    for (label, path) in locations {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(path.display()),
            status(path),
        ]);
    }

    table
}
