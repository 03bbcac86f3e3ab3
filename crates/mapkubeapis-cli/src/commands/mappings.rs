//! Mappings command - list the effective mapping table

use console::style;

use super::GlobalArgs;
use crate::display::api_summary;
use crate::error::{CliError, Result};

/// Run the mappings command
pub fn run(output_json: bool, global: &GlobalArgs) -> Result<()> {
    let mapper = global.mapper()?;
    let table = mapper.table();

    if output_json {
        let json =
            serde_json::to_string_pretty(table).map_err(|e| CliError::other(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    println!(
        "{:<45} {:<45} {:<14} {:<12}",
        style("DEPRECATED").bold(),
        style("SUPPORTED").bold(),
        style("DEPRECATED IN").bold(),
        style("REMOVED IN").bold()
    );

    for rule in table.iter() {
        println!(
            "{:<45} {:<45} {:<14} {:<12}",
            api_summary(&rule.deprecated_api),
            api_summary(&rule.new_api),
            rule.deprecated_in_version.as_deref().unwrap_or("-"),
            rule.removed_in_version.as_deref().unwrap_or("-")
        );
    }

    println!("\n{} mapping(s)", table.len());

    Ok(())
}
