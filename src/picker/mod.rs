//! Interactive position picker.

pub mod raster;
pub mod state;
pub mod view;
pub mod window;

use std::path::PathBuf;

use tracing::info;

use crate::error::{Result, require_file};
use crate::fields::AlignmentGroups;
use crate::positions::PositionMap;
use raster::PageRaster;
use state::PickerSession;
use view::{Canvas, load_label_font};

#[derive(Debug, Clone)]
pub struct PickOptions {
    pub pdf: PathBuf,
    pub out: PathBuf,
    pub fields: Vec<String>,
    pub font_size: u32,
    pub render_scale: f32,
    pub groups: AlignmentGroups,
    pub pdfium_dir: Option<PathBuf>,
    pub ui_font: Option<PathBuf>,
}

/// Opens the picker on page 1 of the template and returns what was saved,
/// if anything. The coordinates file is written when the last field is
/// picked and again on exit whenever at least one position exists.
pub fn pick_positions(options: &PickOptions) -> Result<Option<PositionMap>> {
    require_file("template PDF", &options.pdf)?;

    let mut raster = PageRaster::render(
        &options.pdf,
        options.render_scale,
        options.pdfium_dir.as_deref(),
    )?;
    let image = raster.load()?;
    let mut canvas = Canvas::new(image, load_label_font(options.ui_font.as_deref()))?;
    let mut session = PickerSession::new(
        options.fields.clone(),
        raster.geometry,
        options.font_size,
        options.groups.clone(),
    );
    info!(fields = options.fields.len(), "picking started");

    window::run(&mut session, &mut canvas, |session| {
        session.save(&options.out).map(|_| ())
    })?;

    let saved = session.save(&options.out)?;
    raster.cleanup();
    Ok(saved)
}
