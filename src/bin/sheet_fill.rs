use anyhow::{Context, Result};
use clap::Parser;

use charsheet_overlay::config::{FillArgs, init_logging};
use charsheet_overlay::{FillOptions, fill_card};

fn main() -> Result<()> {
    let args = FillArgs::parse();
    init_logging();

    let options = FillOptions::from(args);
    let out = fill_card(&options)
        .with_context(|| format!("filling {} failed", options.template.display()))?;

    println!();
    println!("Generated: {}", out.display());
    Ok(())
}
