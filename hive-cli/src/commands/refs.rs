//! Package reference management commands

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use hive_core::{PackageError, PackageReference, ReferenceMap, ReferenceStore};
use uuid::Uuid;

use crate::config::ConfigLoader;

/// Package reference arguments
#[derive(Args)]
pub struct RefsArgs {
    #[command(subcommand)]
    pub command: RefsCommands,
}

/// Package reference subcommands
#[derive(Subcommand)]
pub enum RefsCommands {
    /// List stored package references
    List,
    /// Add a package reference
    Add {
        /// Provider: builtin, local or git-tag
        #[arg(long)]
        provider: String,
        /// Configuration entry, repeatable
        #[arg(short = 'c', long = "config", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        configuration: Vec<(String, String)>,
    },
    /// Show a package reference
    Show {
        /// Package reference id
        id: Uuid,
    },
    /// Replace an existing package reference
    Update {
        /// Package reference id
        id: Uuid,
        /// Provider: builtin, local or git-tag
        #[arg(long)]
        provider: String,
        /// Configuration entry, repeatable
        #[arg(short = 'c', long = "config", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        configuration: Vec<(String, String)>,
    },
    /// Remove a package reference
    Remove {
        /// Package reference id
        id: Uuid,
    },
    /// List the available versions of a package
    Versions {
        /// Package reference id
        id: Uuid,
    },
}

/// Run package reference command
pub async fn run(args: RefsArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = super::store(&config, super::environment(&config));

    match args.command {
        RefsCommands::List => list_references(&store).await,
        RefsCommands::Add {
            provider,
            configuration,
        } => add_reference(&store, build_reference(provider, configuration)).await,
        RefsCommands::Show { id } => show_reference(&store, id).await,
        RefsCommands::Update {
            id,
            provider,
            configuration,
        } => update_reference(&store, id, build_reference(provider, configuration)).await,
        RefsCommands::Remove { id } => remove_reference(&store, id).await,
        RefsCommands::Versions { id } => list_versions(&store, id).await,
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn build_reference(provider: String, configuration: Vec<(String, String)>) -> PackageReference {
    configuration
        .into_iter()
        .fold(PackageReference::new(provider), |reference, (key, value)| {
            reference.with(key, value)
        })
}

fn format_configuration(reference: &PackageReference) -> String {
    reference
        .configuration
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn references_table(references: &ReferenceMap) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Provider").fg(Color::Cyan),
        Cell::new("Configuration").fg(Color::Cyan),
    ]);

    for (id, reference) in references {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(&reference.provider),
            Cell::new(format_configuration(reference)),
        ]);
    }

    table
}

async fn list_references(store: &ReferenceStore) -> Result<()> {
    let references = store.get_all().await?;

    if references.is_empty() {
        println!("No package references");
        println!();
        println!("To add one:");
        println!(
            "  hive refs add --provider local -c path=/path/to/extension -c version=v0.1.0 -c entrypoint=build.sh"
        );
        return Ok(());
    }

    println!("{}", references_table(&references));
    Ok(())
}

async fn add_reference(store: &ReferenceStore, reference: PackageReference) -> Result<()> {
    // Unknown providers are stored as-is and reported when used
    if let Err(e) = reference.provider() {
        tracing::warn!("{}", e);
    }

    let id = store.put(reference).await?;
    println!("{id}");
    Ok(())
}

async fn show_reference(store: &ReferenceStore, id: Uuid) -> Result<()> {
    let reference = store
        .get(id)
        .await?
        .ok_or(PackageError::PackageNotFound { id })?;

    println!("Id:            {id}");
    println!("Provider:      {}", reference.provider);
    if reference.configuration.is_empty() {
        println!("Configuration: (none)");
    } else {
        println!("Configuration:");
        for (key, value) in &reference.configuration {
            println!("  {key} = {value}");
        }
    }
    Ok(())
}

async fn update_reference(
    store: &ReferenceStore,
    id: Uuid,
    reference: PackageReference,
) -> Result<()> {
    if !store.try_update(id, reference).await? {
        return Err(PackageError::PackageNotFound { id }.into());
    }
    println!("Updated package reference: {id}");
    Ok(())
}

async fn remove_reference(store: &ReferenceStore, id: Uuid) -> Result<()> {
    store.delete(id).await?;
    println!("Removed package reference: {id}");
    Ok(())
}

async fn list_versions(store: &ReferenceStore, id: Uuid) -> Result<()> {
    let cancel = super::cancel_on_ctrl_c();
    let versions = store
        .get_versions(id, &cancel)
        .await?
        .ok_or(PackageError::PackageNotFound { id })?;

    if versions.is_empty() {
        println!("No versions found");
    }
    for version in versions {
        println!("{version}");
    }
    Ok(())
}
