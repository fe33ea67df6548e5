//! Template access and stamping an overlay onto the first page.
//!
//! The template's existing page content is wrapped in `q`/`Q` and the
//! overlay's operators are appended after it as one more content stream.
//! Overlay fonts join the page's font resources under fresh names, so they
//! never shadow the template's own.

use std::fs;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

use crate::error::{CardError, Result};

/// Prefix for overlay font resources merged into the page.
const FONT_PREFIX: &str = "Card";

/// Lower-left and upper-right corners of a page box, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl PageBox {
    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }
}

/// A drawing sized to the template's first page, plus the fonts it uses.
#[derive(Debug, Clone)]
pub struct OverlayPage {
    pub media_box: PageBox,
    pub operations: Vec<Operation>,
    /// Resource name → font dictionary. Names are local to the overlay and
    /// are rewritten on merge; CID descendants become their own objects.
    pub fonts: Vec<(String, FontResource)>,
}

#[derive(Debug, Clone)]
pub enum FontResource {
    Simple(Dictionary),
    /// Type0 font whose single descendant is stored as its own object.
    Composite { font: Dictionary, descendant: Dictionary },
}

impl OverlayPage {
    pub fn new(media_box: PageBox) -> Self {
        OverlayPage {
            media_box,
            operations: Vec::new(),
            fonts: Vec::new(),
        }
    }
}

pub struct Template {
    doc: Document,
    first_page: ObjectId,
    media_box: PageBox,
}

impl Template {
    pub fn load(path: &Path) -> Result<Self> {
        let doc = Document::load(path)?;
        let template = Self::from_document(doc)?;
        info!(
            path = %path.display(),
            pages = template.page_count(),
            width = template.media_box.width(),
            height = template.media_box.height(),
            "template loaded"
        );
        Ok(template)
    }

    pub fn from_document(doc: Document) -> Result<Self> {
        let first_page = *doc.get_pages().get(&1).ok_or(CardError::MissingPage)?;
        let page = doc.get_dictionary(first_page)?;
        let raw = inherited(&doc, page, b"MediaBox").ok_or_else(|| {
            CardError::InvalidPageBox("first page has no MediaBox".to_string())
        })?;
        let media_box = page_box(&doc, raw)?;
        Ok(Template {
            doc,
            first_page,
            media_box,
        })
    }

    pub fn media_box(&self) -> PageBox {
        self.media_box
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Draws `overlay` on top of page 1. Other pages are not touched.
    pub fn stamp_first_page(&mut self, overlay: OverlayPage) -> Result<()> {
        let page_id = self.first_page;

        let mut resources = self.page_resources(page_id)?;
        let mut fonts = match resources.get(b"Font") {
            Ok(raw) => resolve(&self.doc, raw)?.as_dict()?.clone(),
            Err(_) => Dictionary::new(),
        };
        let mut renamed = Vec::new();
        for (name, font) in overlay.fonts {
            let font = match font {
                FontResource::Simple(dict) => dict,
                FontResource::Composite {
                    mut font,
                    descendant,
                } => {
                    let descendant_id = self.doc.add_object(descendant);
                    font.set(
                        "DescendantFonts",
                        Object::Array(vec![Object::Reference(descendant_id)]),
                    );
                    font
                }
            };
            let font_id = self.doc.add_object(font);
            let resource = unused_name(&fonts, &format!("{FONT_PREFIX}{name}"));
            fonts.set(resource.clone(), Object::Reference(font_id));
            renamed.push((name, resource));
        }
        resources.set("Font", Object::Dictionary(fonts));

        let mut operations = Vec::with_capacity(overlay.operations.len() + 2);
        operations.push(Operation::new("q", vec![]));
        operations.extend(overlay.operations);
        operations.push(Operation::new("Q", vec![]));
        for op in operations.iter_mut().filter(|op| op.operator == "Tf") {
            if let Some(Object::Name(current)) = op.operands.first_mut() {
                if let Some((_, resource)) = renamed
                    .iter()
                    .find(|(name, _)| name.as_bytes() == current.as_slice())
                {
                    *current = resource.clone().into_bytes();
                }
            }
        }
        let draw = self.doc.add_object(Stream::new(
            Dictionary::new(),
            Content { operations }.encode()?,
        ));

        // Separators on both sides: the template's last stream may end
        // mid-line, and streams are concatenated when read.
        let mut contents = self.page_contents(page_id)?;
        let push_state = self.doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let pop_state = self.doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
        contents.insert(0, Object::Reference(push_state));
        contents.push(Object::Reference(pop_state));
        contents.push(Object::Reference(draw));

        let page = self.doc.get_object_mut(page_id)?.as_dict_mut()?;
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(contents));
        debug!(fonts = ?renamed, "overlay merged onto page 1");
        Ok(())
    }

    /// Serializes fully in memory before touching `path`, so a failed run
    /// leaves no partial file behind.
    pub fn save(mut self, path: &Path) -> Result<()> {
        let mut buffer = Vec::new();
        self.doc.save_to(&mut buffer)?;
        fs::write(path, buffer)?;
        info!(path = %path.display(), "PDF written");
        Ok(())
    }

    // Resolved (possibly inherited) resources, copied so shared
    // dictionaries of other pages stay untouched.
    fn page_resources(&self, page_id: ObjectId) -> Result<Dictionary> {
        let page = self.doc.get_dictionary(page_id)?;
        let Some(raw) = inherited(&self.doc, page, b"Resources") else {
            return Ok(Dictionary::new());
        };
        Ok(resolve(&self.doc, raw)?.as_dict()?.clone())
    }

    fn page_contents(&self, page_id: ObjectId) -> Result<Vec<Object>> {
        let page = self.doc.get_dictionary(page_id)?;
        let contents = match page.get(b"Contents") {
            Ok(contents) => contents,
            Err(_) => return Ok(Vec::new()),
        };
        match contents {
            Object::Array(items) => Ok(items.clone()),
            Object::Reference(id) => match self.doc.get_object(*id)? {
                Object::Array(items) => Ok(items.clone()),
                _ => Ok(vec![Object::Reference(*id)]),
            },
            other => Err(CardError::Malformed(format!("page Contents is {other:?}"))),
        }
    }
}

/// `base`, or `base_1`, `base_2`, ... if the name is already taken.
fn unused_name(dict: &Dictionary, base: &str) -> String {
    let mut name = base.to_string();
    let mut suffix = 1;
    while dict.has(name.as_bytes()) {
        name = format!("{base}_{suffix}");
        suffix += 1;
    }
    name
}

/// Follows references until a direct object is reached.
pub fn resolve<'a>(doc: &'a Document, mut object: &'a Object) -> Result<&'a Object> {
    // Bounded so a reference cycle cannot spin forever.
    for _ in 0..32 {
        match object {
            Object::Reference(id) => object = doc.get_object(*id)?,
            direct => return Ok(direct),
        }
    }
    Err(CardError::Malformed("reference chain too deep".to_string()))
}

/// Looks up `key` on the page, then up its `Parent` chain.
fn inherited<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = dict;
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn page_box(doc: &Document, raw: &Object) -> Result<PageBox> {
    let items = resolve(doc, raw)?
        .as_array()
        .map_err(|_| CardError::InvalidPageBox("MediaBox is not an array".to_string()))?;
    let numbers: Vec<f64> = items
        .iter()
        .map(|item| resolve(doc, item).ok().and_then(number))
        .collect::<Option<_>>()
        .ok_or_else(|| CardError::InvalidPageBox(format!("non-numeric entry in {items:?}")))?;
    let [a, b, c, d] = numbers[..] else {
        return Err(CardError::InvalidPageBox(format!(
            "expected 4 numbers, got {}",
            numbers.len()
        )));
    };
    let page_box = PageBox {
        llx: a.min(c),
        lly: b.min(d),
        urx: a.max(c),
        ury: b.max(d),
    };
    if page_box.width() <= 0.0 || page_box.height() <= 0.0 {
        return Err(CardError::InvalidPageBox(format!("{page_box:?} has no area")));
    }
    Ok(page_box)
}

pub fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use lopdf::dictionary;

    fn helvetica_overlay(media_box: PageBox) -> OverlayPage {
        let mut overlay = OverlayPage::new(media_box);
        overlay.fonts.push((
            "F1".to_string(),
            FontResource::Simple(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
            }),
        ));
        overlay.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Tj", vec![Object::string_literal("stamp")]),
            Operation::new("ET", vec![]),
        ]);
        overlay
    }

    fn stamped(pages: usize) -> Template {
        let mut template = Template::from_document(template(pages, 595, 842)).unwrap();
        let overlay = helvetica_overlay(template.media_box());
        template.stamp_first_page(overlay).unwrap();
        template
    }

    fn page_fonts(doc: &Document, page_id: ObjectId) -> Dictionary {
        let page = doc.get_dictionary(page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        resources.get(b"Font").unwrap().as_dict().unwrap().clone()
    }

    #[test]
    fn media_box_is_inherited_from_page_tree() {
        let template = Template::from_document(template(2, 595, 842)).unwrap();
        assert_eq!(template.media_box().width(), 595.0);
        assert_eq!(template.media_box().height(), 842.0);
        assert_eq!(template.page_count(), 2);
    }

    #[test]
    fn empty_document_has_no_first_page() {
        let doc = Document::with_version("1.7");
        assert!(Template::from_document(doc).is_err());
    }

    #[test]
    fn overlay_operators_join_page_content() {
        let template = stamped(2);
        let doc = template.document();
        let pages = doc.get_pages();
        let page = doc.get_dictionary(pages[&1]).unwrap();

        let contents = page.get(b"Contents").unwrap().as_array().unwrap();
        assert_eq!(contents.len(), 4);
        let content = doc.get_page_content(pages[&1]).unwrap();
        let ops = Content::decode(&content).unwrap().operations;
        assert_eq!(ops.first().unwrap().operator, "q");
        assert_eq!(ops.last().unwrap().operator, "Q");
        assert!(!ops.iter().any(|op| op.operator == "Do"));
        let shows = ops.iter().filter(|op| op.operator == "Tj").count();
        assert_eq!(shows, 2, "template text and overlay text");

        let fonts = page_fonts(doc, pages[&1]);
        assert!(fonts.has(b"F1"), "template fonts must stay available");
        assert!(fonts.has(b"CardF1"));
    }

    #[test]
    fn save_restore_operators_balance() {
        let template = stamped(1);
        let doc = template.document();
        let content = doc.get_page_content(doc.get_pages()[&1]).unwrap();
        let ops = Content::decode(&content).unwrap().operations;
        let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert!(operators.contains(&"ET"), "{operators:?}");
        let saves = operators.iter().filter(|op| **op == "q").count();
        let restores = operators.iter().filter(|op| **op == "Q").count();
        assert_eq!(saves, 2);
        assert_eq!(saves, restores);
    }

    #[test]
    fn overlay_font_operand_follows_rename() {
        let template = stamped(1);
        let doc = template.document();
        let ops = overlay_operations(doc, doc.get_pages()[&1]);
        let tf = ops.iter().find(|op| op.operator == "Tf").unwrap();
        assert!(matches!(&tf.operands[0], Object::Name(name) if name == b"CardF1"));
    }

    #[test]
    fn other_pages_keep_their_objects() {
        let original = template(3, 595, 842);
        let before: Vec<_> = original
            .get_pages()
            .values()
            .skip(1)
            .map(|id| original.get_page_content(*id).unwrap())
            .collect();
        let mut template = Template::from_document(original).unwrap();
        let overlay = helvetica_overlay(template.media_box());
        template.stamp_first_page(overlay).unwrap();

        let doc = template.document();
        let after: Vec<_> = doc
            .get_pages()
            .values()
            .skip(1)
            .map(|id| doc.get_page_content(*id).unwrap())
            .collect();
        assert_eq!(before, after);
        let second = doc.get_dictionary(doc.get_pages()[&2]).unwrap();
        assert!(!second.has(b"Resources"), "page 2 still inherits resources");
    }

    #[test]
    fn font_names_avoid_collisions() {
        let mut template = Template::from_document(template(1, 100, 100)).unwrap();
        template.stamp_first_page(helvetica_overlay(template.media_box())).unwrap();
        template.stamp_first_page(helvetica_overlay(template.media_box())).unwrap();
        let doc = template.document();
        let page_id = doc.get_pages()[&1];
        let fonts = page_fonts(doc, page_id);
        assert!(fonts.has(b"F1") && fonts.has(b"CardF1") && fonts.has(b"CardF1_1"));

        let ops = overlay_operations(doc, page_id);
        let tf = ops.iter().find(|op| op.operator == "Tf").unwrap();
        assert!(matches!(&tf.operands[0], Object::Name(name) if name == b"CardF1_1"));
    }

    #[test]
    fn saves_reloadable_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        stamped(2).save(&path).unwrap();
        let reloaded = Document::load(&path).unwrap();
        assert_eq!(reloaded.get_pages().len(), 2);
    }
}
