//! Brand table listing.

use console::style;

use crate::config::Config;

/// Print every brand with its keyword variants.
pub fn cmd_brands(config: &Config) -> anyhow::Result<()> {
    let table = config.brand_table()?;
    let origin = if config.brands.is_empty() {
        "built-in".to_string()
    } else {
        config
            .source_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "config".to_string())
    };

    println!("{} {} brands ({})", style("→").cyan(), table.len(), origin);
    for entry in table.entries() {
        println!(
            "  {} {}",
            style(&entry.name).bold(),
            style(entry.variants.join(", ")).dim()
        );
    }
    Ok(())
}
