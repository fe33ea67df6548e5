#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

/// Writes a `pages`-page template of `width`×`height` points to `dir`.
/// Each page shows "page N"; every page carries its own MediaBox.
pub fn write_template(dir: &Path, pages: usize, width: i64, height: i64) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let mut kids: Vec<Object> = Vec::new();
    for n in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 18.into()]),
                Operation::new("Td", vec![50.into(), 50.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("page {n}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join("template.pdf");
    doc.save(&path).unwrap();
    path
}

pub fn write_json(dir: &Path, name: &str, value: serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    path
}

pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// Operations of the overlay stream, appended last to `page_id`'s contents.
pub fn overlay_operations(doc: &Document, page_id: ObjectId) -> Vec<Operation> {
    let page = doc.get_dictionary(page_id).unwrap();
    let contents = page.get(b"Contents").unwrap().as_array().unwrap();
    let stream_id = contents.last().unwrap().as_reference().unwrap();
    let stream = doc.get_object(stream_id).unwrap().as_stream().unwrap();
    let bytes = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    Content::decode(&bytes).unwrap().operations
}

/// Font resources of `page_id`, which the stamped page holds inline.
pub fn page_fonts(doc: &Document, page_id: ObjectId) -> lopdf::Dictionary {
    let page = doc.get_dictionary(page_id).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    resources.get(b"Font").unwrap().as_dict().unwrap().clone()
}

/// Shown strings with the position of the text matrix in effect.
pub fn shown_text(operations: &[Operation]) -> Vec<(String, f64, f64)> {
    let mut at = (0.0, 0.0);
    let mut shown = Vec::new();
    for op in operations {
        match op.operator.as_str() {
            "Tm" => at = (number(&op.operands[4]), number(&op.operands[5])),
            "Td" => at = (number(&op.operands[0]), number(&op.operands[1])),
            "Tj" => {
                if let Object::String(bytes, format) = &op.operands[0] {
                    let text = match format {
                        lopdf::StringFormat::Hexadecimal => {
                            let units: Vec<u16> = bytes
                                .chunks_exact(2)
                                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                                .collect();
                            String::from_utf16_lossy(&units)
                        }
                        lopdf::StringFormat::Literal => {
                            bytes.iter().map(|&b| b as char).collect()
                        }
                    };
                    shown.push((text, at.0, at.1));
                }
            }
            _ => {}
        }
    }
    shown
}

pub fn number(object: &Object) -> f64 {
    match object {
        Object::Integer(i) => *i as f64,
        Object::Real(f) => *f as f64,
        other => panic!("not a number: {other:?}"),
    }
}
