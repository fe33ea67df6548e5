//! Card filler: data + coordinates + template → filled PDF.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::info;

use crate::error::{Result, require_file};
use crate::overlay::{FontChoice, OverlayFont, collect_items, compose};
use crate::pdf::Template;
use crate::positions::{PositionMap, load_json_object, load_positions};
use crate::sanitize::default_output_path;

#[derive(Debug, Clone)]
pub struct FillOptions {
    pub template: PathBuf,
    pub data: PathBuf,
    pub positions: PathBuf,
    /// Explicit output path; derived from the data when `None`.
    pub out: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub font: FontChoice,
}

/// Runs a complete fill and returns the path written.
pub fn fill_card(options: &FillOptions) -> Result<PathBuf> {
    require_file("template PDF", &options.template)?;
    require_file("data JSON", &options.data)?;
    require_file("coordinates JSON", &options.positions)?;

    let data = load_json_object(&options.data)?;
    let positions = load_positions(&options.positions)?;
    let out = match &options.out {
        Some(out) => out.clone(),
        None => default_output_path(&data, &options.output_dir)?,
    };

    fill_first_page(&options.template, &out, &data, &positions, options.font)?;
    Ok(out)
}

/// Stamps `data` at `positions` onto page 1 of the template at `template`.
pub fn fill_first_page(
    template: &Path,
    out: &Path,
    data: &Map<String, Value>,
    positions: &PositionMap,
    font: FontChoice,
) -> Result<()> {
    let mut template = Template::load(template)?;
    let items = collect_items(data, positions);
    let font = OverlayFont::register_or_fallback(font, &items);
    info!(items = items.len(), ?font, "composing overlay");
    let overlay = compose(template.media_box(), &items, font);
    template.stamp_first_page(overlay)?;
    template.save(out)
}
