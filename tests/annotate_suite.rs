//! End-to-end annotation tests over synthesized single-page documents.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use pdf_callout::text_index::TextIndex;
use pdf_callout::{AnnotationJob, Annotator, SourceMetadata};

const PAGE_WIDTH: f32 = 612.0;

/// Build a US Letter page with one 12pt Helvetica text block, one line
/// per entry, starting at (72, 700).
fn build_pdf(lines: &[&str]) -> Vec<u8> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 12.into()]),
        Operation::new("TL", vec![14.into()]),
        Operation::new("Td", vec![72.into(), 700.into()]),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
    }
    operations.push(Operation::new("ET", vec![]));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        Content { operations }.encode().expect("encode"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save");
    bytes
}

fn job(document: Vec<u8>, quotes: &[&str], metadata: SourceMetadata) -> AnnotationJob {
    AnnotationJob {
        document,
        quotes: quotes.iter().map(|q| q.to_string()).collect(),
        metadata,
        criterion: "distinguished".to_string(),
    }
}

/// Decode the markup stream the annotator appended to page 1.
fn markup_ops(bytes: &[u8]) -> Vec<Operation> {
    let doc = Document::load_mem(bytes).expect("reload");
    let page_id = *doc.get_pages().get(&1).expect("page 1");
    let page = doc.get_dictionary(page_id).expect("page dict");
    let contents = page
        .get(b"Contents")
        .expect("contents")
        .as_array()
        .expect("contents array")
        .clone();
    let last = contents.last().expect("appended stream");
    let stream = doc
        .get_object(last.as_reference().expect("reference"))
        .expect("stream object")
        .as_stream()
        .expect("stream");
    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    Content::decode(&data).expect("decode").operations
}

fn op_f32(op: &Operation, idx: usize) -> f32 {
    match &op.operands[idx] {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r,
        other => panic!("non-numeric operand {other:?}"),
    }
}

/// All `re` rectangles followed by the given paint operator, as
/// (x, y, w, h).
fn rects_painted_with(ops: &[Operation], paint: &str) -> Vec<(f32, f32, f32, f32)> {
    let mut rects = Vec::new();
    for window in ops.windows(2) {
        if window[0].operator == "re" && window[1].operator == paint {
            rects.push((
                op_f32(&window[0], 0),
                op_f32(&window[0], 1),
                op_f32(&window[0], 2),
                op_f32(&window[0], 3),
            ));
        }
    }
    rects
}

#[test]
fn venue_gets_highlight_label_and_connector() {
    let bytes = build_pdf(&["The gala was performed at Lincoln Center last spring."]);
    let reference = Document::load_mem(&bytes).expect("load");
    let page_id = *reference.get_pages().get(&1).expect("page");
    let index = TextIndex::from_page(&reference, page_id).expect("index");
    let target = index.find_first("Lincoln Center").expect("target on page");

    let metadata = SourceMetadata {
        venue: Some("Lincoln Center".to_string()),
        ..SourceMetadata::default()
    };
    let annotated = Annotator::with_defaults()
        .annotate(&job(bytes, &[], metadata))
        .expect("annotate");
    assert_eq!(annotated.result.criterion_id, "distinguished");

    let ops = markup_ops(&annotated.bytes);

    // Stroked highlight over the matched text.
    let highlights = rects_painted_with(&ops, "S");
    let hit = highlights
        .iter()
        .find(|(x, y, w, h)| {
            (x - target.x0).abs() < 0.1
                && (y - target.y0).abs() < 0.1
                && (w - target.width()).abs() < 0.1
                && (h - target.height()).abs() < 0.1
        });
    assert!(hit.is_some(), "no highlight at {target:?} in {highlights:?}");

    // Venue label sits in the left margin, top-aligned with the match.
    let labels = rects_painted_with(&ops, "f");
    let label = labels
        .iter()
        .find(|(_, _, w, h)| *w == 60.0 && *h == 30.0)
        .expect("label box");
    assert_eq!(label.0, 10.0);
    assert!((label.1 + label.3 - target.y1).abs() < 0.1);

    // Caption text in the markup stream.
    assert!(ops.iter().any(|op| {
        op.operator == "Tj"
            && matches!(&op.operands[0], Object::String(s, _) if s.starts_with(b"Venue"))
    }));

    // Three-segment connector through the left gutter, ending on the
    // highlight's left edge at mid height.
    let move_idx = ops
        .iter()
        .position(|op| op.operator == "m" && op_f32(op, 0) == 70.0)
        .expect("connector start at label edge");
    let segments: Vec<&Operation> = ops[move_idx + 1..]
        .iter()
        .take_while(|op| op.operator == "l")
        .collect();
    assert_eq!(segments.len(), 3);
    assert_eq!(op_f32(segments[0], 0), 40.0);
    assert_eq!(op_f32(segments[1], 0), 40.0);
    let end = segments[2];
    assert!((op_f32(end, 0) - target.x0).abs() < 0.1);
    assert!((op_f32(end, 1) - target.mid_y()).abs() < 0.1);

    // Marker dot at the connector end.
    assert!(ops.iter().any(|op| op.operator == "c"));
}

#[test]
fn quotes_take_the_right_margin() {
    let bytes = build_pdf(&["She delivered a stirring performance that night."]);
    let annotated = Annotator::with_defaults()
        .annotate(&job(bytes, &["a stirring performance"], SourceMetadata::default()))
        .expect("annotate");

    let ops = markup_ops(&annotated.bytes);
    let labels = rects_painted_with(&ops, "f");
    let label = labels
        .iter()
        .find(|(_, _, w, h)| *w == 60.0 && *h == 30.0)
        .expect("label box");
    assert_eq!(label.0, PAGE_WIDTH - 70.0);
    assert_eq!(label.0 + label.2, PAGE_WIDTH - 10.0);
}

#[test]
fn colliding_labels_do_not_overlap() {
    let bytes = build_pdf(&[
        "first quoted passage sits here",
        "second quoted passage sits here",
    ]);
    let annotated = Annotator::with_defaults()
        .annotate(&job(
            bytes,
            &["first quoted passage", "second quoted passage"],
            SourceMetadata::default(),
        ))
        .expect("annotate");

    let ops = markup_ops(&annotated.bytes);
    let labels: Vec<_> = rects_painted_with(&ops, "f")
        .into_iter()
        .filter(|(_, _, w, h)| *w == 60.0 && *h == 30.0)
        .collect();
    assert_eq!(labels.len(), 2);
    let (_, y_a, _, h_a) = labels[0];
    let (_, y_b, _, h_b) = labels[1];
    let overlap = y_a < y_b + h_b && y_b < y_a + h_a;
    assert!(!overlap, "labels overlap: {labels:?}");
}

#[test]
fn unmatched_targets_leave_document_unmarked() {
    let bytes = build_pdf(&["Nothing relevant on this page."]);
    let page_count_before = Document::load_mem(&bytes).expect("load").get_pages().len();

    let metadata = SourceMetadata {
        venue: Some("Carnegie Hall".to_string()),
        ..SourceMetadata::default()
    };
    let annotated = Annotator::with_defaults()
        .annotate(&job(bytes, &["absent quote"], metadata))
        .expect("annotate");

    let doc = Document::load_mem(&annotated.bytes).expect("reload");
    assert_eq!(doc.get_pages().len(), page_count_before);
    let page_id = *doc.get_pages().get(&1).expect("page");
    let page = doc.get_dictionary(page_id).expect("dict");
    // Original single stream, nothing appended.
    assert!(page.get(b"Contents").expect("contents").as_reference().is_ok());
    let media_box = page.get(b"MediaBox").expect("media box").as_array().expect("array");
    assert_eq!(media_box.len(), 4);
}

#[test]
fn absent_target_does_not_shift_surviving_labels() {
    let bytes = build_pdf(&[
        "first quoted passage sits here",
        "second quoted passage sits here",
    ]);
    let annotator = Annotator::with_defaults();

    let without = annotator
        .annotate(&job(
            bytes.clone(),
            &["first quoted passage", "second quoted passage"],
            SourceMetadata::default(),
        ))
        .expect("annotate without absentee");
    let with = annotator
        .annotate(&job(
            bytes,
            &[
                "first quoted passage",
                "no such text anywhere",
                "second quoted passage",
            ],
            SourceMetadata::default(),
        ))
        .expect("annotate with absentee");

    let labels_without: Vec<_> = rects_painted_with(&markup_ops(&without.bytes), "f")
        .into_iter()
        .filter(|(_, _, w, h)| *w == 60.0 && *h == 30.0)
        .collect();
    let labels_with: Vec<_> = rects_painted_with(&markup_ops(&with.bytes), "f")
        .into_iter()
        .filter(|(_, _, w, h)| *w == 60.0 && *h == 30.0)
        .collect();
    assert_eq!(labels_without.len(), 2);
    assert_eq!(labels_without, labels_with);
}

#[test]
fn annotation_is_deterministic() {
    let bytes = build_pdf(&["performed at Lincoln Center"]);
    let metadata = SourceMetadata {
        venue: Some("Lincoln Center".to_string()),
        ..SourceMetadata::default()
    };
    let annotator = Annotator::with_defaults();
    let first = annotator
        .annotate(&job(bytes.clone(), &["performed"], metadata.clone()))
        .expect("first run");
    let second = annotator
        .annotate(&job(bytes, &["performed"], metadata))
        .expect("second run");
    assert_eq!(first.bytes, second.bytes);
}

#[test]
fn mixed_job_places_both_margins() {
    let bytes = build_pdf(&["The troupe performed at Lincoln Center to ovations."]);
    let metadata = SourceMetadata {
        venue: Some("Lincoln Center".to_string()),
        ..SourceMetadata::default()
    };
    let annotated = Annotator::with_defaults()
        .annotate(&job(bytes, &["to ovations"], metadata))
        .expect("annotate");

    let ops = markup_ops(&annotated.bytes);
    let labels: Vec<_> = rects_painted_with(&ops, "f")
        .into_iter()
        .filter(|(_, _, w, h)| *w == 60.0 && *h == 30.0)
        .collect();
    assert_eq!(labels.len(), 2);
    assert!(labels.iter().any(|(x, ..)| *x == 10.0));
    assert!(labels.iter().any(|(x, ..)| *x == PAGE_WIDTH - 70.0));
}
