//! Manifest command - map a manifest file or stdin without release storage

use console::style;
use std::io::Read;
use std::path::Path;

use super::GlobalArgs;
use crate::display;
use crate::error::Result;

/// Run the manifest command
pub async fn run(path: &Path, output: Option<&Path>, global: &GlobalArgs) -> Result<()> {
    let mapper = global.mapper()?;
    let manifest = read_manifest(path)?;
    let cluster_version = global.cluster_version(None).await?;

    let report = mapper.map_for(&manifest, &cluster_version)?;

    display::print_report(&report);

    match output {
        Some(out) => {
            std::fs::write(out, &report.manifest)?;
            eprintln!(
                "{} Mapped manifest written to {}",
                style("✓").green().bold(),
                style(out.display()).cyan()
            );
        }
        None => print!("{}", report.manifest),
    }

    Ok(())
}

/// Read the manifest from a file, or stdin for `-`
fn read_manifest(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut manifest = String::new();
        std::io::stdin().read_to_string(&mut manifest)?;
        Ok(manifest)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}
