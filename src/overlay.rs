//! Text overlay composition for the card filler.

use clap::ValueEnum;
use lopdf::content::Operation;
use lopdf::{Object, StringFormat, dictionary};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{CardError, Result};
use crate::pdf::{FontResource, OverlayPage, PageBox};
use crate::positions::PositionMap;

const FONT_RESOURCE: &str = "F1";

/// One string to draw, in PDF points.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: u32,
}

/// Font the filler tries first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FontChoice {
    /// Adobe-GB1 `STSong-Light`, covers Chinese and Latin text.
    #[default]
    Song,
    /// Standard Helvetica, Latin-1 only.
    Helvetica,
}

/// A font that has been accepted for the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayFont {
    Song,
    Helvetica,
}

impl OverlayFont {
    /// Registers `choice` for `items`, or fails when it cannot encode them.
    pub fn register(choice: FontChoice, items: &[OverlayItem]) -> Result<Self> {
        let font = match choice {
            FontChoice::Song => OverlayFont::Song,
            FontChoice::Helvetica => OverlayFont::Helvetica,
        };
        if font == OverlayFont::Song {
            if let Some(item) = items.iter().find(|item| item.text.chars().any(|c| c.len_utf16() > 1)) {
                return Err(CardError::Font(format!(
                    "STSong-Light cannot encode {:?} outside the BMP",
                    item.text
                )));
            }
        }
        Ok(font)
    }

    /// Preferred font, or Helvetica if it cannot be registered.
    pub fn register_or_fallback(choice: FontChoice, items: &[OverlayItem]) -> Self {
        match Self::register(choice, items) {
            Ok(font) => font,
            Err(err) => {
                warn!(error = %err, "falling back to Helvetica");
                OverlayFont::Helvetica
            }
        }
    }

    pub fn resource(&self) -> FontResource {
        match self {
            OverlayFont::Song => FontResource::Composite {
                font: dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type0",
                    "BaseFont" => "STSong-Light",
                    "Encoding" => "UniGB-UCS2-H",
                },
                descendant: dictionary! {
                    "Type" => "Font",
                    "Subtype" => "CIDFontType0",
                    "BaseFont" => "STSong-Light",
                    "CIDSystemInfo" => dictionary! {
                        "Registry" => Object::string_literal("Adobe"),
                        "Ordering" => Object::string_literal("GB1"),
                        "Supplement" => 2,
                    },
                    "FontDescriptor" => dictionary! {
                        "Type" => "FontDescriptor",
                        "FontName" => "STSong-Light",
                        "Flags" => 6,
                        "FontBBox" => vec![(-25).into(), (-254).into(), 1000.into(), 880.into()],
                        "ItalicAngle" => 0,
                        "Ascent" => 880,
                        "Descent" => -120,
                        "CapHeight" => 880,
                        "StemV" => 93,
                    },
                    "DW" => 1000,
                },
            },
            OverlayFont::Helvetica => FontResource::Simple(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            }),
        }
    }

    /// Encodes `text` as a show-text operand for this font.
    pub fn encode(&self, text: &str) -> Object {
        match self {
            OverlayFont::Song => {
                let bytes = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
                Object::String(bytes, StringFormat::Hexadecimal)
            }
            OverlayFont::Helvetica => {
                let bytes = text
                    .chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                    .collect();
                Object::String(bytes, StringFormat::Literal)
            }
        }
    }
}

/// String form of a data value. JSON spelling is kept on purpose: `true`
/// stays `true` and `null` shows nothing, rather than `True` / `None`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pairs each positioned field with its trimmed data value, dropping
/// fields whose value is missing or blank.
pub fn collect_items(data: &Map<String, Value>, positions: &PositionMap) -> Vec<OverlayItem> {
    positions
        .iter()
        .filter_map(|(field, record)| {
            let text = data.get(field).map(display_value).unwrap_or_default();
            let text = text.trim();
            if text.is_empty() {
                debug!(field, "no value, skipped");
                return None;
            }
            Some(OverlayItem {
                text: text.to_string(),
                x: record.x,
                y: record.y,
                font_size: record.font_size,
            })
        })
        .collect()
}

/// Builds the overlay page with one text draw per item.
pub fn compose(media_box: PageBox, items: &[OverlayItem], font: OverlayFont) -> OverlayPage {
    let mut page = OverlayPage::new(media_box);
    page.fonts.push((FONT_RESOURCE.to_string(), font.resource()));
    page.operations.push(Operation::new("g", vec![0.into()]));
    for item in items {
        page.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), (item.font_size as i64).into()],
            ),
            Operation::new(
                "Tm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    Object::Real(item.x as f32),
                    Object::Real(item.y as f32),
                ],
            ),
            Operation::new("Tj", vec![font.encode(&item.text)]),
            Operation::new("ET", vec![]),
        ]);
    }
    page
}
