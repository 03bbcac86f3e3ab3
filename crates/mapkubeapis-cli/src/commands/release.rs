//! Release command - map the deprecated APIs of a stored Helm release

use console::style;
use mapkubeapis_kube::{MapOptions, StorageKind, map_release};

use super::GlobalArgs;
use crate::display;
use crate::error::Result;

/// Run the release command
pub async fn run(name: &str, dry_run: bool, global: &GlobalArgs) -> Result<()> {
    let storage_kind: StorageKind = global.storage.parse()?;
    let mapper = global.mapper()?;

    let client = global.connect_options().connect().await?;
    let cluster_version = global.cluster_version(Some(client.clone())).await?;
    let storage = storage_kind.driver(client);

    let mut options = MapOptions::new(name, &global.namespace);
    if dry_run {
        options = options.dry_run();
    }

    let outcome = map_release(storage.as_ref(), &mapper, &cluster_version, &options).await?;

    display::print_report(&outcome.report);

    match outcome.written {
        Some(revision) => eprintln!(
            "{} Release {} mapped: revision {} superseded by revision {}",
            style("✓").green().bold(),
            style(name).cyan(),
            outcome.release.version,
            style(revision).yellow()
        ),
        None if dry_run && outcome.report.has_mappings() => {
            eprintln!(
                "{} Dry run: release {} revision {} not updated",
                style("→").blue(),
                style(name).cyan(),
                outcome.release.version
            );
            print!("{}", outcome.report.manifest);
        }
        None => eprintln!(
            "{} Release {} has no deprecated or removed APIs",
            style("✓").green().bold(),
            style(name).cyan()
        ),
    }

    Ok(())
}
