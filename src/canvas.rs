//! Markup drawing surface over a loaded PDF document.
//!
//! Operations are buffered as a separate content stream and appended to
//! the page's `/Contents` on save, wrapped in `q`/`Q` so the original
//! page's graphics state is untouched. If nothing was drawn, the document
//! round-trips without a new stream.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::annotator::AnnotateError;
use crate::layout::Rect;
use crate::text_index::resolve_inherited;

/// Resource name for the caption font registered on save.
const CAPTION_FONT_KEY: &[u8] = b"COF1";

/// Circle-from-Béziers control point distance, as a fraction of radius.
const ARC_K: f32 = 0.5523;

type Rgb = (f32, f32, f32);

#[derive(Debug)]
pub struct PdfCanvas {
    doc: Document,
    page_id: ObjectId,
    width: f32,
    height: f32,
    ops: Vec<Operation>,
    caption_font: Option<String>,
}

impl PdfCanvas {
    /// Load a document from bytes and attach to its first page.
    pub fn open(bytes: &[u8]) -> Result<Self, AnnotateError> {
        let doc = Document::load_mem(bytes).map_err(AnnotateError::DocumentOpen)?;
        let page_id = *doc
            .get_pages()
            .get(&1)
            .ok_or(AnnotateError::EmptyDocument)?;
        let (width, height) = media_box_size(&doc, page_id);
        Ok(Self {
            doc,
            page_id,
            width,
            height,
            ops: Vec::new(),
            caption_font: None,
        })
    }

    pub fn page_width(&self) -> f32 {
        self.width
    }

    pub fn page_height(&self) -> f32 {
        self.height
    }

    pub fn page_id(&self) -> ObjectId {
        self.page_id
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn stroke_rect(&mut self, rect: &Rect, color: Rgb, line_width: f32) {
        self.ops.push(Operation::new(
            "RG",
            vec![color.0.into(), color.1.into(), color.2.into()],
        ));
        self.ops.push(Operation::new("w", vec![line_width.into()]));
        self.ops.push(Operation::new(
            "re",
            vec![
                rect.x0.into(),
                rect.y0.into(),
                rect.width().into(),
                rect.height().into(),
            ],
        ));
        self.ops.push(Operation::new("S", vec![]));
    }

    pub fn fill_rect(&mut self, rect: &Rect, color: Rgb) {
        self.ops.push(Operation::new(
            "rg",
            vec![color.0.into(), color.1.into(), color.2.into()],
        ));
        self.ops.push(Operation::new(
            "re",
            vec![
                rect.x0.into(),
                rect.y0.into(),
                rect.width().into(),
                rect.height().into(),
            ],
        ));
        self.ops.push(Operation::new("f", vec![]));
    }

    pub fn polyline(&mut self, points: &[(f32, f32)], color: Rgb, line_width: f32) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.ops.push(Operation::new(
            "RG",
            vec![color.0.into(), color.1.into(), color.2.into()],
        ));
        self.ops.push(Operation::new("w", vec![line_width.into()]));
        self.ops
            .push(Operation::new("m", vec![first.0.into(), first.1.into()]));
        for point in rest {
            self.ops
                .push(Operation::new("l", vec![point.0.into(), point.1.into()]));
        }
        self.ops.push(Operation::new("S", vec![]));
    }

    /// Filled circle approximated by four Bézier quarter arcs.
    pub fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Rgb) {
        let (cx, cy) = center;
        let k = ARC_K * radius;
        self.ops.push(Operation::new(
            "rg",
            vec![color.0.into(), color.1.into(), color.2.into()],
        ));
        self.ops
            .push(Operation::new("m", vec![(cx + radius).into(), cy.into()]));
        let arcs = [
            [
                (cx + radius, cy + k),
                (cx + k, cy + radius),
                (cx, cy + radius),
            ],
            [
                (cx - k, cy + radius),
                (cx - radius, cy + k),
                (cx - radius, cy),
            ],
            [
                (cx - radius, cy - k),
                (cx - k, cy - radius),
                (cx, cy - radius),
            ],
            [
                (cx + k, cy - radius),
                (cx + radius, cy - k),
                (cx + radius, cy),
            ],
        ];
        for [c1, c2, end] in arcs {
            self.ops.push(Operation::new(
                "c",
                vec![
                    c1.0.into(),
                    c1.1.into(),
                    c2.0.into(),
                    c2.1.into(),
                    end.0.into(),
                    end.1.into(),
                ],
            ));
        }
        self.ops.push(Operation::new("f", vec![]));
    }

    /// Draw wrapped caption lines starting at `(x, top_y)` going down.
    /// Registers `font` as a page resource on save.
    pub fn text_lines(
        &mut self,
        x: f32,
        top_y: f32,
        lines: &[String],
        font: &str,
        font_size: f32,
        leading: f32,
        color: Rgb,
    ) {
        if lines.is_empty() {
            return;
        }
        self.caption_font = Some(font.to_string());
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "rg",
            vec![color.0.into(), color.1.into(), color.2.into()],
        ));
        self.ops.push(Operation::new(
            "Tf",
            vec![Object::Name(CAPTION_FONT_KEY.to_vec()), font_size.into()],
        ));
        self.ops.push(Operation::new("TL", vec![leading.into()]));
        self.ops.push(Operation::new(
            "Td",
            vec![x.into(), (top_y - font_size).into()],
        ));
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                self.ops.push(Operation::new("T*", vec![]));
            }
            self.ops
                .push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
        }
        self.ops.push(Operation::new("ET", vec![]));
    }

    /// Serialize the document, appending the buffered markup stream to the
    /// page if anything was drawn.
    pub fn save(mut self) -> Result<Vec<u8>, AnnotateError> {
        if !self.ops.is_empty() {
            if let Some(font) = self.caption_font.take() {
                self.register_caption_font(&font)
                    .map_err(AnnotateError::Render)?;
            }
            self.append_markup_stream().map_err(AnnotateError::Render)?;
        }
        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(AnnotateError::Serialize)?;
        Ok(out)
    }

    fn append_markup_stream(&mut self) -> Result<(), lopdf::Error> {
        let mut operations = Vec::with_capacity(self.ops.len() + 2);
        operations.push(Operation::new("q", vec![]));
        operations.append(&mut self.ops);
        operations.push(Operation::new("Q", vec![]));
        let encoded = Content { operations }.encode()?;
        let stream_id = self.doc.add_object(Stream::new(dictionary! {}, encoded));

        let page = self.doc.get_dictionary_mut(self.page_id)?;
        let contents = match page.get(b"Contents") {
            Ok(Object::Array(items)) => {
                let mut items = items.clone();
                items.push(stream_id.into());
                items
            }
            Ok(existing) => vec![existing.clone(), stream_id.into()],
            Err(_) => vec![stream_id.into()],
        };
        page.set("Contents", contents);
        Ok(())
    }

    /// Make the caption base font available as `/COF1` in the page's
    /// font resources, creating dictionaries as needed.
    fn register_caption_font(&mut self, base_font: &str) -> Result<(), lopdf::Error> {
        let font_id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base_font,
            "Encoding" => "WinAnsiEncoding",
        });

        // An indirect /Resources may be shared between pages, so pull a
        // copy inline before touching it.
        let mut resources = match resolve_inherited(&self.doc, self.page_id, b"Resources") {
            Some(Object::Reference(id)) => self
                .doc
                .get_object(*id)
                .and_then(Object::as_dict)
                .cloned()
                .unwrap_or_default(),
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => lopdf::Dictionary::new(),
        };

        let mut fonts = match resources.get(b"Font") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(Object::Reference(id)) => self
                .doc
                .get_object(*id)
                .and_then(Object::as_dict)
                .cloned()
                .unwrap_or_default(),
            _ => lopdf::Dictionary::new(),
        };
        fonts.set(CAPTION_FONT_KEY, font_id);
        resources.set("Font", fonts);

        let page = self.doc.get_dictionary_mut(self.page_id)?;
        page.set("Resources", resources);
        Ok(())
    }
}

fn media_box_size(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    // US Letter when the document is missing its MediaBox.
    let fallback = (612.0, 792.0);
    let Some(media_box) = resolve_inherited(doc, page_id, b"MediaBox") else {
        return fallback;
    };
    let media_box = match media_box {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(resolved) => resolved,
            Err(_) => return fallback,
        },
        other => other,
    };
    let Ok(values) = media_box.as_array() else {
        return fallback;
    };
    let nums: Vec<f32> = values
        .iter()
        .filter_map(|v| match v {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        })
        .collect();
    if nums.len() == 4 {
        (nums[2] - nums[0], nums[3] - nums[1])
    } else {
        fallback
    }
}
