use anyhow::{Context, Result};
use clap::Parser;

use charsheet_overlay::config::{LocateArgs, LocateMode, init_logging};
use charsheet_overlay::error::require_file;
use charsheet_overlay::{export_grid_pdf, pick_positions};

fn main() -> Result<()> {
    let args = LocateArgs::parse();
    init_logging();

    require_file("template PDF", &args.pdf)?;
    let pdf = args.pdf.clone();

    match args.mode() {
        LocateMode::Grid { out, step } => {
            export_grid_pdf(&pdf, &out, step)
                .with_context(|| format!("grid export from {} failed", pdf.display()))?;
            println!();
            println!("Generated: {}", out.display());
        }
        LocateMode::Pick(options) => {
            let saved = pick_positions(&options)
                .with_context(|| format!("picking on {} failed", pdf.display()))?;
            match saved {
                Some(positions) => {
                    println!();
                    println!("Generated: {} ({} fields)", options.out.display(), positions.len());
                }
                None => println!("No positions picked; {} not written", options.out.display()),
            }
        }
    }

    Ok(())
}
