//! Rasterizing page 1 of the template for the picker viewer.

use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use pdfium_render::prelude::*;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::coords::PageGeometry;
use crate::error::{CardError, Result};

/// Rendered first page, held in a temporary PNG for the session.
pub struct PageRaster {
    file: Option<NamedTempFile>,
    pub geometry: PageGeometry,
}

impl PageRaster {
    /// Renders page 1 at `scale` pixels per point. The pdfium document is
    /// released before this returns; only the temporary image outlives it.
    pub fn render(pdf: &Path, scale: f32, library_dir: Option<&Path>) -> Result<Self> {
        let pdfium = bind_pdfium(library_dir)?;
        let document = pdfium
            .load_pdf_from_file(pdf, None)
            .map_err(|err| CardError::Render(err.to_string()))?;
        let page = document
            .pages()
            .get(0)
            .map_err(|_| CardError::MissingPage)?;
        let width = page.width().value as f64;
        let height = page.height().value as f64;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|err| CardError::Render(err.to_string()))?;
        let (px_width, px_height) = (bitmap.width() as u32, bitmap.height() as u32);
        let image = RgbaImage::from_raw(px_width, px_height, bitmap.as_rgba_bytes())
            .ok_or_else(|| CardError::Render("bitmap size does not match its pixels".to_string()))?;

        let file = tempfile::Builder::new()
            .prefix("sheet-locate-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(file.path(), ImageFormat::Png)?;
        debug!(path = %file.path().display(), "page raster written");

        let geometry = PageGeometry::from_render(width, height, px_width);
        info!(
            width,
            height,
            px_width,
            px_height,
            scale = geometry.scale,
            "page rendered"
        );
        Ok(PageRaster {
            file: Some(file),
            geometry,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(NamedTempFile::path)
    }

    pub fn load(&self) -> Result<RgbaImage> {
        let path = self
            .path()
            .ok_or_else(|| CardError::Render("page raster already removed".to_string()))?;
        Ok(image::open(path)?.to_rgba8())
    }

    /// Removes the temporary image. Failure is logged and otherwise ignored.
    pub fn cleanup(&mut self) {
        if let Some(file) = self.file.take() {
            let path: PathBuf = file.path().to_path_buf();
            if let Err(err) = file.close() {
                warn!(path = %path.display(), error = %err, "could not remove page raster");
            }
        }
    }
}

impl Drop for PageRaster {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn bind_pdfium(library_dir: Option<&Path>) -> Result<Pdfium> {
    let bindings = match library_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            .or_else(|err| {
                warn!(dir = %dir.display(), error = %err, "pdfium not found there, trying system library");
                Pdfium::bind_to_system_library()
            }),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|err| CardError::Render(format!("cannot load pdfium: {err}")))?;
    Ok(Pdfium::new(bindings))
}
