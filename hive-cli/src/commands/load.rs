//! Restore and load all stored packages

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use hive_core::{BUILTIN_ID, ExtensionHive, HiveConfig, LoadReport};
use hive_extension_api::DescribeCapability;
use std::io::Write;

use crate::config::ConfigLoader;

/// Run load command
pub async fn run() -> Result<()> {
    let config = ConfigLoader::load()?;
    let (hive, report) = load_hive(&config).await?;

    if hive.get_extensions().next().is_none() {
        println!("No extensions found");
    } else {
        println!("{}", extensions_table(&hive));
    }

    print_failures(&report);
    Ok(())
}

/// Load every stored package, printing progress to stderr
pub(crate) async fn load_hive(
    config: &HiveConfig,
) -> Result<(ExtensionHive<DescribeCapability>, LoadReport)> {
    let environment = super::environment(config);
    let store = super::store(config, environment.clone());
    let references = store.get_all().await?;

    let cancel = super::cancel_on_ctrl_c();
    let mut hive = ExtensionHive::<DescribeCapability>::new(environment);

    let progress = |fraction: f64| {
        eprint!("\rLoading packages... {:>3.0}%", fraction * 100.0);
        let _ = std::io::stderr().flush();
    };
    let result = hive.load_packages(&references, &progress, &cancel).await;
    eprintln!();

    Ok((hive, result?))
}

fn extensions_table(hive: &ExtensionHive<DescribeCapability>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Type").fg(Color::Cyan),
        Cell::new("Package").fg(Color::Cyan),
    ]);

    for entry in hive.snapshot().entries() {
        let package = if entry.package_id() == BUILTIN_ID {
            "builtin".to_string()
        } else {
            entry.package_id().to_string()
        };
        table.add_row(vec![Cell::new(entry.full_name()), Cell::new(package)]);
    }

    table
}

fn print_failures(report: &LoadReport) {
    if report.failed.is_empty() {
        return;
    }

    println!();
    println!("{} package(s) failed to load:", report.failed.len());
    for failure in &report.failed {
        println!(
            "  ✗ {} ({}): {}",
            failure.id, failure.reference.provider, failure.error
        );
    }
}
