//! Ruled coordinate grid burned onto page 1, for reading positions by eye.

use std::path::Path;

use lopdf::content::Operation;
use lopdf::{Object, dictionary};
use tracing::info;

use crate::error::{CardError, Result};
use crate::pdf::{FontResource, OverlayPage, PageBox, Template};

const FONT_RESOURCE: &str = "F1";
const LINE_GRAY: f32 = 0.85;
const LABEL_GRAY: f32 = 0.4;
const HEADER_GRAY: f32 = 0.2;

/// Offsets `0, step, 2·step, …` up to and including `extent`.
pub fn grid_offsets(extent: f64, step: u32) -> Vec<f64> {
    if step == 0 {
        return Vec::new();
    }
    let count = (extent / step as f64).floor() as u64 + 1;
    (0..count).map(|k| (k * step as u64) as f64).collect()
}

/// Grid lines, axis labels and a size header sized to `media_box`.
pub fn grid_overlay(media_box: PageBox, step: u32) -> OverlayPage {
    let (width, height) = (media_box.width(), media_box.height());
    let mut page = OverlayPage::new(media_box);
    page.fonts.push((
        FONT_RESOURCE.to_string(),
        FontResource::Simple(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        }),
    ));

    let ops = &mut page.operations;
    ops.push(Operation::new("w", vec![Object::Real(0.5)]));
    ops.push(gray("G", LINE_GRAY));
    for x in grid_offsets(width, step) {
        ops.push(Operation::new("m", vec![real(x), real(0.0)]));
        ops.push(Operation::new("l", vec![real(x), real(height)]));
    }
    for y in grid_offsets(height, step) {
        ops.push(Operation::new("m", vec![real(0.0), real(y)]));
        ops.push(Operation::new("l", vec![real(width), real(y)]));
    }
    ops.push(Operation::new("S", vec![]));

    ops.push(gray("g", LABEL_GRAY));
    for x in grid_offsets(width, step) {
        ops.extend(label(x + 1.0, height - 8.0, 6, &format!("{}", x as i64)));
    }
    for y in grid_offsets(height, step) {
        ops.extend(label(2.0, y + 1.0, 6, &format!("{}", y as i64)));
    }

    ops.push(gray("g", HEADER_GRAY));
    let header = format!("size: {} x {}  step: {}", width as i64, height as i64, step);
    ops.extend(label(6.0, height - 18.0, 8, &header));
    page
}

/// Writes a copy of the template with the grid on page 1.
pub fn export_grid_pdf(template: &Path, out: &Path, step: u32) -> Result<()> {
    if step == 0 {
        return Err(CardError::Config("grid step must be positive".to_string()));
    }
    let mut template = Template::load(template)?;
    let overlay = grid_overlay(template.media_box(), step);
    info!(step, "drawing grid");
    template.stamp_first_page(overlay)?;
    template.save(out)
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn gray(operator: &str, level: f32) -> Operation {
    Operation::new(operator, vec![Object::Real(level)])
}

fn label(x: f64, y: f64, size: i64, text: &str) -> [Operation; 5] {
    [
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), size.into()],
        ),
        Operation::new("Td", vec![real(x), real(y)]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}
