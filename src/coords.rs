//! Mapping between PDF point space (origin bottom-left, y up) and the
//! rendered raster (origin top-left, y down, `scale` pixels per point).

/// Minor grid spacing in the picker viewer, PDF points.
pub const MINOR_GRID_STEP: f64 = 25.0;
/// Labeled grid spacing in the picker viewer, PDF points.
pub const MAJOR_GRID_STEP: f64 = 100.0;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Page width in points.
    pub width: f64,
    /// Page height in points.
    pub height: f64,
    /// Raster pixels per point.
    pub scale: f64,
}

impl PageGeometry {
    /// `scale` comes from the rendered image, not the requested multiplier,
    /// so rounding in the renderer is accounted for.
    pub fn from_render(width: f64, height: f64, image_width_px: u32) -> Self {
        PageGeometry {
            width,
            height,
            scale: image_width_px as f64 / width,
        }
    }

    /// Canvas pixel → PDF point, unrounded.
    pub fn pixel_to_pdf(&self, cx: f64, cy: f64) -> (f64, f64) {
        (cx / self.scale, self.height - cy / self.scale)
    }

    /// Canvas pixel → stored position (rounded to 2 decimals, not clamped).
    pub fn pick(&self, cx: f64, cy: f64) -> (f64, f64) {
        let (x, y) = self.pixel_to_pdf(cx, cy);
        (round2(x), round2(y))
    }

    /// Stored position → canvas pixel, for redrawing markers.
    pub fn pdf_to_pixel(&self, x: f64, y: f64) -> (i64, i64) {
        (
            (x * self.scale).round() as i64,
            ((self.height - y) * self.scale).round() as i64,
        )
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }

    /// Live readout text for the cursor at canvas pixel `(cx, cy)`.
    pub fn readout(&self, cx: f64, cy: f64) -> String {
        let (x, y) = self.pixel_to_pdf(cx, cy);
        if self.contains(x, y) {
            format!("x={x:.2}, y={y:.2}")
        } else {
            "x=—, y=—".to_string()
        }
    }

    /// Viewer grid lines along one raster axis of `extent_px` pixels.
    pub fn grid_lines(&self, axis: Axis, extent_px: f64) -> Vec<GridLine> {
        let minor_px = MINOR_GRID_STEP * self.scale;
        let major_px = MAJOR_GRID_STEP * self.scale;
        if minor_px <= 0.0 || !minor_px.is_finite() {
            return Vec::new();
        }
        let mut lines = Vec::new();
        let mut k = 0u32;
        loop {
            let offset_px = k as f64 * minor_px;
            if offset_px > extent_px + 0.1 {
                break;
            }
            let ratio = offset_px / major_px;
            let major = (ratio - ratio.round()).abs() < 1e-6;
            let label = (major && k > 0).then(|| {
                let value = match axis {
                    Axis::Vertical => offset_px / self.scale,
                    Axis::Horizontal => self.height - offset_px / self.scale,
                };
                value.round() as i64
            });
            lines.push(GridLine {
                offset_px,
                major,
                label,
            });
            k += 1;
        }
        lines
    }
}

/// Which family of grid lines: vertical lines sit at x offsets, horizontal
/// lines at y offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridLine {
    pub offset_px: f64,
    pub major: bool,
    /// PDF-space coordinate printed beside major lines (none at the origin).
    pub label: Option<i64>,
}
