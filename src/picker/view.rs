//! Off-screen drawing for the picker: the page image with its grid and
//! markers, plus the scrolled viewport and status strip shown in the window.

use std::fs;
use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings};
use image::RgbaImage;
use tiny_skia::{IntSize, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};
use tracing::{debug, warn};

use crate::coords::{Axis, PageGeometry};
use crate::error::{CardError, Result};
use crate::picker::state::PickerSession;

/// Height of the hint/readout strip under the page.
pub const STATUS_HEIGHT: usize = 44;

const MARKER_RADIUS: f32 = 5.0;
const MINOR_LINE: [u8; 3] = [0xD9, 0xD9, 0xD9];
const MAJOR_LINE: [u8; 3] = [0xB0, 0xB0, 0xB0];
const BORDER: [u8; 3] = [0x90, 0x90, 0x90];
const GRID_LABEL: [u8; 3] = [0x66, 0x66, 0x66];
const MARKER: [u8; 3] = [0xFF, 0x00, 0x00];
const CROSSHAIR: [u8; 3] = [0x7A, 0x7A, 0x7A];
const STATUS_BG: [u8; 3] = [0xF0, 0xF0, 0xF0];
const STATUS_TEXT: [u8; 3] = [0x20, 0x20, 0x20];

const LABEL_FONT_CANDIDATES: &[&str] = &[
    "C:/Windows/Fonts/msyh.ttc",
    "C:/Windows/Fonts/simsun.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/STHeiti Light.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];

/// Loads the font used for on-screen labels: `explicit` if given (from
/// `--ui-font` or `CARD_UI_FONT`), else the first well-known system font
/// that parses. `None` means labels are skipped.
pub fn load_label_font(explicit: Option<&Path>) -> Option<Font> {
    let candidates = explicit
        .map(Path::to_path_buf)
        .into_iter()
        .chain(LABEL_FONT_CANDIDATES.iter().map(PathBuf::from));
    for path in candidates {
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                if explicit == Some(path.as_path()) {
                    warn!(path = %path.display(), error = %err, "cannot read UI font");
                }
                continue;
            }
        };
        match Font::from_bytes(bytes, FontSettings::default()) {
            Ok(font) => {
                debug!(path = %path.display(), "label font loaded");
                return Some(font);
            }
            Err(err) => debug!(path = %path.display(), error = err, "font rejected"),
        }
    }
    warn!("no usable UI font found, on-screen labels are disabled");
    None
}

/// Region of the composed page currently shown, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    pub fn to_canvas(&self, mx: f64, my: f64) -> (f64, f64) {
        ((self.x + mx).floor(), (self.y + my).floor())
    }

    pub fn scroll_by(&mut self, dx: f64, dy: f64, canvas_width: usize, canvas_height: usize) {
        self.x += dx;
        self.y += dy;
        self.clamp(canvas_width, canvas_height);
    }

    pub fn clamp(&mut self, canvas_width: usize, canvas_height: usize) {
        let max_x = canvas_width.saturating_sub(self.width) as f64;
        let max_y = canvas_height.saturating_sub(self.height) as f64;
        self.x = self.x.clamp(0.0, max_x);
        self.y = self.y.clamp(0.0, max_y);
    }
}

/// The page image with grid and markers burned in, as `0RGB` pixels.
pub struct Canvas {
    page: Pixmap,
    frame: Vec<u32>,
    width: usize,
    height: usize,
    font: Option<Font>,
}

impl Canvas {
    pub fn new(image: RgbaImage, font: Option<Font>) -> Result<Self> {
        let (width, height) = image.dimensions();
        let size = IntSize::from_wh(width, height)
            .ok_or_else(|| CardError::Render("page raster is empty".to_string()))?;
        let page = Pixmap::from_vec(image.into_raw(), size)
            .ok_or_else(|| CardError::Render("page raster has a bad layout".to_string()))?;
        Ok(Canvas {
            page,
            frame: Vec::new(),
            width: width as usize,
            height: height as usize,
            font,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Rebuilds the frame from the clean page, the grid and every marker.
    pub fn redraw(&mut self, session: &PickerSession) {
        let geometry = *session.geometry();
        let mut pixmap = self.page.clone();
        self.stroke_grid(&mut pixmap, &geometry);

        let markers: Vec<(String, f32, f32)> = session
            .positions()
            .iter()
            .map(|(field, record)| {
                let (px, py) = geometry.pdf_to_pixel(record.x, record.y);
                (field.to_string(), px as f32, py as f32)
            })
            .collect();
        for (_, px, py) in &markers {
            stroke_circle(&mut pixmap, *px, *py);
        }

        self.frame = pixmap
            .data()
            .chunks_exact(4)
            .map(|rgba| rgb(&[rgba[0], rgba[1], rgba[2]]))
            .collect();

        for label in grid_labels(&geometry, self.width as f64, self.height as f64) {
            self.text(label.x, label.y, 11.0, &label.text, GRID_LABEL);
        }
        for (field, px, py) in &markers {
            self.text(*px as i32 + 8, *py as i32 + 5, 13.0, field, MARKER);
        }
    }

    /// Draws one new marker without rebuilding the frame.
    pub fn add_marker(&mut self, field: &str, px: i64, py: i64) {
        let mut pixmap = self.frame_pixmap();
        stroke_circle(&mut pixmap, px as f32, py as f32);
        self.frame = pixmap
            .data()
            .chunks_exact(4)
            .map(|rgba| rgb(&[rgba[0], rgba[1], rgba[2]]))
            .collect();
        self.text(px as i32 + 8, py as i32 + 5, 13.0, field, MARKER);
    }

    /// Copies the visible region plus a crosshair and the status strip into
    /// a window buffer of `viewport.width × (viewport.height + STATUS_HEIGHT)`.
    pub fn blit(
        &self,
        viewport: &Viewport,
        cursor: Option<(f64, f64)>,
        status: [&str; 2],
        buffer: &mut Vec<u32>,
    ) {
        let (view_w, view_h) = (viewport.width, viewport.height);
        buffer.clear();
        buffer.resize(view_w * (view_h + STATUS_HEIGHT), rgb(&STATUS_BG));
        let (ox, oy) = (viewport.x as usize, viewport.y as usize);

        for row in 0..view_h {
            let src_y = oy + row;
            if src_y >= self.height {
                break;
            }
            let start = src_y * self.width + ox.min(self.width);
            let end = (src_y * self.width + self.width).min(start + view_w);
            let dst = row * view_w;
            buffer[dst..dst + (end - start)].copy_from_slice(&self.frame[start..end]);
        }

        if let Some((mx, my)) = cursor {
            let (mx, my) = (mx as usize, my as usize);
            let color = rgb(&CROSSHAIR);
            if mx < view_w && my < view_h {
                for row in 0..view_h {
                    buffer[row * view_w + mx] = color;
                }
                buffer[my * view_w..(my + 1) * view_w].fill(color);
            }
        }

        if let Some(font) = &self.font {
            let (buf_w, buf_h) = (view_w, view_h + STATUS_HEIGHT);
            let top = view_h as i32;
            draw_text(font, buffer, buf_w, buf_h, 6, top + 18, 14.0, status[0], STATUS_TEXT);
            draw_text(font, buffer, buf_w, buf_h, 6, top + 38, 14.0, status[1], STATUS_TEXT);
        }
    }

    fn text(&mut self, x: i32, baseline: i32, px: f32, text: &str, color: [u8; 3]) {
        if let Some(font) = &self.font {
            draw_text(font, &mut self.frame, self.width, self.height, x, baseline, px, text, color);
        }
    }

    fn frame_pixmap(&self) -> Pixmap {
        let mut pixmap = self.page.clone();
        for (dst, pixel) in pixmap.data_mut().chunks_exact_mut(4).zip(&self.frame) {
            dst[0] = (pixel >> 16) as u8;
            dst[1] = (pixel >> 8) as u8;
            dst[2] = *pixel as u8;
            dst[3] = 0xFF;
        }
        pixmap
    }

    fn stroke_grid(&self, pixmap: &mut Pixmap, geometry: &PageGeometry) {
        let (w, h) = (self.width as f32, self.height as f32);
        let mut minor = PathBuilder::new();
        let mut major = PathBuilder::new();
        for line in geometry.grid_lines(Axis::Vertical, w as f64) {
            let builder = if line.major { &mut major } else { &mut minor };
            builder.move_to(line.offset_px as f32, 0.0);
            builder.line_to(line.offset_px as f32, h);
        }
        for line in geometry.grid_lines(Axis::Horizontal, h as f64) {
            let builder = if line.major { &mut major } else { &mut minor };
            builder.move_to(0.0, line.offset_px as f32);
            builder.line_to(w, line.offset_px as f32);
        }
        for (builder, color, width) in [(minor, MINOR_LINE, 0.8), (major, MAJOR_LINE, 1.2)] {
            if let Some(path) = builder.finish() {
                pixmap.stroke_path(&path, &paint(color), &stroke(width), Transform::identity(), None);
            }
        }
        if let Some(rect) = Rect::from_xywh(0.0, 0.0, w, h) {
            let border = PathBuilder::from_rect(rect);
            pixmap.stroke_path(&border, &paint(BORDER), &stroke(1.5), Transform::identity(), None);
        }
    }
}

struct GridLabel {
    x: i32,
    y: i32,
    text: String,
}

fn grid_labels(geometry: &PageGeometry, width: f64, height: f64) -> Vec<GridLabel> {
    let vertical = geometry
        .grid_lines(Axis::Vertical, width)
        .into_iter()
        .filter_map(|line| {
            line.label.map(|value| GridLabel {
                x: line.offset_px as i32 + 2,
                y: 12,
                text: value.to_string(),
            })
        });
    let horizontal = geometry
        .grid_lines(Axis::Horizontal, height)
        .into_iter()
        .filter_map(|line| {
            line.label.map(|value| GridLabel {
                x: 2,
                y: line.offset_px as i32 + 12,
                text: value.to_string(),
            })
        });
    vertical.chain(horizontal).collect()
}

fn stroke_circle(pixmap: &mut Pixmap, cx: f32, cy: f32) {
    if let Some(circle) = PathBuilder::from_circle(cx, cy, MARKER_RADIUS) {
        pixmap.stroke_path(&circle, &paint(MARKER), &stroke(2.0), Transform::identity(), None);
    }
}

fn paint(color: [u8; 3]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], 0xFF);
    paint.anti_alias = true;
    paint
}

fn stroke(width: f32) -> Stroke {
    Stroke {
        width,
        ..Stroke::default()
    }
}

fn rgb(color: &[u8; 3]) -> u32 {
    (u32::from(color[0]) << 16) | (u32::from(color[1]) << 8) | u32::from(color[2])
}

fn blend(dst: u32, color: [u8; 3], coverage: u8) -> u32 {
    let alpha = u32::from(coverage);
    let mix = |shift: u32, src: u8| {
        let d = (dst >> shift) & 0xFF;
        (u32::from(src) * alpha + d * (255 - alpha)) / 255
    };
    (mix(16, color[0]) << 16) | (mix(8, color[1]) << 8) | mix(0, color[2])
}

#[allow(clippy::too_many_arguments)]
fn draw_text(
    font: &Font,
    buffer: &mut [u32],
    width: usize,
    height: usize,
    x: i32,
    baseline: i32,
    px: f32,
    text: &str,
    color: [u8; 3],
) {
    let mut pen_x = x as f32;
    for ch in text.chars() {
        let (metrics, coverage) = font.rasterize(ch, px);
        let left = pen_x.round() as i32 + metrics.xmin;
        let top = baseline - metrics.height as i32 - metrics.ymin;
        for gy in 0..metrics.height {
            for gx in 0..metrics.width {
                let alpha = coverage[gy * metrics.width + gx];
                if alpha == 0 {
                    continue;
                }
                let (tx, ty) = (left + gx as i32, top + gy as i32);
                if tx < 0 || ty < 0 || tx as usize >= width || ty as usize >= height {
                    continue;
                }
                let idx = ty as usize * width + tx as usize;
                buffer[idx] = blend(buffer[idx], color, alpha);
            }
        }
        pen_x += metrics.advance_width;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::AlignmentGroups;

    fn blank_session(width_px: u32) -> PickerSession {
        PickerSession::new(
            vec!["a".to_string(), "b".to_string()],
            PageGeometry::from_render(100.0, 200.0, width_px),
            12,
            AlignmentGroups::default(),
        )
    }

    fn white(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn viewport_clamps_to_canvas() {
        let mut viewport = Viewport {
            x: 0.0,
            y: 0.0,
            width: 100,
            height: 50,
        };
        viewport.scroll_by(500.0, -20.0, 300, 400);
        assert_eq!((viewport.x, viewport.y), (200.0, 0.0));
        assert_eq!(viewport.to_canvas(10.4, 5.6), (210.0, 5.0));
    }

    #[test]
    fn redraw_places_marker_at_stored_position() {
        let mut session = blank_session(200);
        let mut canvas = Canvas::new(white(200, 400), None).unwrap();
        session.pick(120.0, 60.0);
        canvas.redraw(&session);
        // circle outline passes through (cx + r, cy)
        let pixel = canvas.frame[60 * 200 + 125];
        assert!((pixel >> 16) & 0xFF > 0xC0 && pixel & 0xFF < 0x80, "{pixel:06x}");
    }

    #[test]
    fn blit_fills_window_buffer() {
        let session = blank_session(200);
        let mut canvas = Canvas::new(white(200, 400), None).unwrap();
        canvas.redraw(&session);
        let viewport = Viewport {
            x: 50.0,
            y: 100.0,
            width: 120,
            height: 80,
        };
        let mut buffer = Vec::new();
        canvas.blit(&viewport, Some((10.0, 10.0)), ["", ""], &mut buffer);
        assert_eq!(buffer.len(), 120 * (80 + STATUS_HEIGHT));
        assert_eq!(buffer[10 * 120 + 60], rgb(&CROSSHAIR));
    }

    #[test]
    fn blend_extremes() {
        assert_eq!(blend(0xFFFFFF, [0, 0, 0], 255), 0x000000);
        assert_eq!(blend(0x123456, [0, 0, 0], 0), 0x123456);
    }
}
