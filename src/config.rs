//! Command-line configuration shared by both tools, and logging setup.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;

use crate::fields::{AlignmentGroups, parse_field_list};
use crate::fill::FillOptions;
use crate::overlay::FontChoice;
use crate::picker::PickOptions;

pub const DEFAULT_TEMPLATE: &str = "template.pdf";
pub const DEFAULT_OUTPUT_DIR: &str = "output_card";

/// Record field positions on a character-sheet template, or export a
/// coordinate grid to read them off by eye.
#[derive(Parser, Debug)]
#[command(name = "sheet-locate", version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["grid_out", "pick_positions"])))]
pub struct LocateArgs {
    /// Template PDF
    #[arg(long, env = "CARD_TEMPLATE_PDF", default_value = DEFAULT_TEMPLATE)]
    pub pdf: PathBuf,

    /// Comma-separated field names, in picking order
    #[arg(long)]
    pub keys: Option<String>,

    /// Open the picker and write coordinates JSON here
    #[arg(long, value_name = "PATH")]
    pub pick_positions: Option<PathBuf>,

    /// Font size stored with every picked position
    #[arg(long, default_value_t = 12, value_parser = clap::value_parser!(u32).range(1..))]
    pub pick_font_size: u32,

    /// Render multiplier for the picker image (higher is sharper)
    #[arg(long, default_value_t = 2.0, value_parser = parse_scale)]
    pub pick_scale: f32,

    /// Write a copy of the template with a coordinate grid here
    #[arg(long, value_name = "PATH")]
    pub grid_out: Option<PathBuf>,

    /// Grid spacing in points
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..))]
    pub grid_step: u32,

    /// Column groups aligned on save, e.g. "a,b,c;d,e,f"
    #[arg(long, value_parser = parse_groups)]
    pub align_groups: Option<AlignmentGroups>,

    /// Directory holding the pdfium shared library
    #[arg(long, env = "PDFIUM_LIB_DIR", value_name = "DIR")]
    pub pdfium_lib: Option<PathBuf>,

    /// TrueType font for on-screen labels
    #[arg(long, env = "CARD_UI_FONT", value_name = "PATH")]
    pub ui_font: Option<PathBuf>,
}

pub enum LocateMode {
    Grid { out: PathBuf, step: u32 },
    Pick(PickOptions),
}

impl LocateArgs {
    pub fn mode(self) -> LocateMode {
        if let Some(out) = self.grid_out {
            return LocateMode::Grid {
                out,
                step: self.grid_step,
            };
        }
        LocateMode::Pick(PickOptions {
            pdf: self.pdf,
            // clap's required group guarantees one of the two is present
            out: self.pick_positions.unwrap_or_default(),
            fields: parse_field_list(self.keys.as_deref()),
            font_size: self.pick_font_size,
            render_scale: self.pick_scale,
            groups: self.align_groups.unwrap_or_default(),
            pdfium_dir: self.pdfium_lib,
            ui_font: self.ui_font,
        })
    }
}

/// Fill a character-sheet template with values from a data file.
#[derive(Parser, Debug)]
#[command(name = "sheet-fill", version, about, long_about = None)]
pub struct FillArgs {
    /// Template PDF
    #[arg(long, env = "CARD_TEMPLATE_PDF", default_value = DEFAULT_TEMPLATE)]
    pub pdf: PathBuf,

    /// Data JSON: object of field name to value
    #[arg(long)]
    pub data: PathBuf,

    /// Coordinates JSON: object of field name to [x, y, size]
    #[arg(long)]
    pub positions: PathBuf,

    /// Output PDF; derived from the data when omitted
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Directory for derived output names
    #[arg(long, env = "CARD_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Preferred overlay font
    #[arg(long, value_enum, default_value_t = FontChoice::Song)]
    pub font: FontChoice,
}

impl From<FillArgs> for FillOptions {
    fn from(args: FillArgs) -> Self {
        FillOptions {
            template: args.pdf,
            data: args.data,
            positions: args.positions,
            out: args.out,
            output_dir: args.output_dir,
            font: args.font,
        }
    }
}

fn parse_scale(value: &str) -> Result<f32, String> {
    let scale: f32 = value.parse().map_err(|_| format!("{value:?} is not a number"))?;
    if scale.is_finite() && scale > 0.0 {
        Ok(scale)
    } else {
        Err("scale must be a positive number".to_string())
    }
}

fn parse_groups(value: &str) -> Result<AlignmentGroups, String> {
    value.parse().map_err(|err: crate::CardError| err.to_string())
}

/// Compact log lines on stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
