//! Instantiate an extension and print its description

use anyhow::Result;
use clap::Args;
use std::time::Duration;

use crate::config::ConfigLoader;

/// Run arguments
#[derive(Args)]
pub struct RunArgs {
    /// Full name of the extension type, e.g. hive.HostInfo
    pub type_name: String,
}

/// Run an extension
pub async fn run(args: RunArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let (mut hive, _report) = super::load::load_hive(&config).await?;

    {
        let instance = hive.get_instance(&args.type_name)?;
        println!("{}", instance.describe());
    }

    for handle in hive.unload() {
        if !handle
            .wait_for_reclamation(10, Duration::from_millis(50))
            .await
        {
            tracing::warn!(module = %handle.name(), "Package was not reclaimed after unload");
        }
    }

    Ok(())
}
