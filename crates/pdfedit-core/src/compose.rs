//! Bake annotations, text patches, rotations and images into new PDF bytes
//!
//! Per page the order is fixed: rotation, patches (whiteout then redraw),
//! free-text boxes, images on top. Everything is drawn into one extra content
//! stream appended after the page's own content, which is wrapped in `q`/`Q`.
//! Output depends only on the inputs: pages are walked in page order, entities
//! in their slice order, and fonts are added in a stable order.

use crate::config::ComposeConfig;
use crate::coords::Rect;
use crate::error::{PdfEditError, Result};
use crate::fonts::{encode_win_ansi, FontVariant};
use crate::images::embed_image;
use crate::layout::{
    align_offset, available_width, estimate_box_height, measure_runs, wrap_lines,
};
use crate::model::{
    on_page, AnnotationSet, ImageAnnotation, OnPage, PageRotations, TextAnnotation, TextPatch,
    TextStyle,
};
use crate::page::{append_overlay, install_resources, page_geometry, set_rotation, PageGeometry};
use crate::runs::Run;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

/// Composite using the entities stored in an [`AnnotationSet`]
pub fn composite_set(
    source: &[u8],
    set: &AnnotationSet,
    rotations: &PageRotations,
    config: &ComposeConfig,
) -> Result<Vec<u8>> {
    composite(
        source,
        set.annotations(),
        set.patches(),
        rotations,
        set.images(),
        config,
    )
}

/// Produce new document bytes with every edit baked in.
///
/// Fails only when `source` cannot be parsed or the result cannot be
/// written. Entities on pages the document does not have are skipped, and an
/// image that cannot be embedded is skipped with a warning.
#[instrument(skip_all, fields(bytes = source.len(), annotations = annotations.len(), patches = patches.len(), images = images.len()))]
pub fn composite(
    source: &[u8],
    annotations: &[TextAnnotation],
    patches: &[TextPatch],
    rotations: &PageRotations,
    images: &[ImageAnnotation],
    config: &ComposeConfig,
) -> Result<Vec<u8>> {
    let mut doc =
        Document::load_mem(source).map_err(|e| PdfEditError::ParseError(e.to_string()))?;

    if annotations.is_empty() && patches.is_empty() && images.is_empty() && rotations.is_empty() {
        debug!("no edits, returning source unchanged");
        return Ok(source.to_vec());
    }

    let pages = doc.get_pages();
    let page_count = pages.len() as u32;
    warn_out_of_range(annotations, page_count, "annotation");
    warn_out_of_range(patches, page_count, "patch");
    warn_out_of_range(images, page_count, "image");

    let mut fonts = FontCache::default();
    let mut skipped_images = 0usize;

    for (&page_num, &page_id) in &pages {
        let geometry = page_geometry(&doc, page_id);
        let delta = rotations.degrees(page_num);
        if delta != 0 {
            set_rotation(&mut doc, page_id, geometry.rotate + delta)?;
            debug!(page = page_num, delta, "rotated page");
        }

        let mut canvas = PageCanvas::new(geometry, config);
        for patch in on_page(patches, page_num) {
            canvas.draw_patch(patch);
        }
        for annotation in on_page(annotations, page_num) {
            canvas.draw_annotation(annotation);
        }
        for image in on_page(images, page_num) {
            match embed_image(&mut doc, &image.data) {
                Ok(xobject_id) => canvas.draw_image(image, xobject_id),
                Err(e) => {
                    warn!(page = page_num, image = image.id, error = %e, "skipping image");
                    skipped_images += 1;
                }
            }
        }

        if canvas.ops.is_empty() {
            continue;
        }

        let font_resources: Vec<(String, ObjectId)> = canvas
            .fonts
            .iter()
            .map(|variant| (variant.resource_name(), fonts.get_or_add(&mut doc, *variant)))
            .collect();
        let content = Content {
            operations: canvas.ops,
        }
        .encode()
        .map_err(|e| PdfEditError::OperationError(e.to_string()))?;

        install_resources(&mut doc, page_id, &font_resources, &canvas.xobjects)?;
        append_overlay(&mut doc, page_id, content)?;
        debug!(page = page_num, "drew overlay");
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| PdfEditError::OperationError(e.to_string()))?;

    info!(
        pages = page_count,
        skipped_images,
        output_bytes = output.len(),
        "composite complete"
    );
    Ok(output)
}

fn warn_out_of_range<T: OnPage>(items: &[T], page_count: u32, kind: &str) {
    for item in items {
        if item.page() == 0 || item.page() > page_count {
            warn!(kind, id = item.id(), page = item.page(), page_count, "skipping entity on missing page");
        }
    }
}

/// One Type1 font object per variant, shared by every page of the document
#[derive(Default)]
struct FontCache {
    ids: BTreeMap<FontVariant, ObjectId>,
}

impl FontCache {
    fn get_or_add(&mut self, doc: &mut Document, variant: FontVariant) -> ObjectId {
        *self.ids.entry(variant).or_insert_with(|| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => variant.base_font(),
                "Encoding" => "WinAnsiEncoding",
            })
        })
    }
}

/// Whiteout rectangle of a patch, in PDF points
pub fn patch_cover_rect(patch: &TextPatch, geometry: &PageGeometry, config: &ComposeConfig) -> Rect {
    let bbox = geometry.to_points(&patch.bbox);
    let pad = config.patch_cover_padding;
    Rect::new(
        bbox.x - pad,
        bbox.y - pad,
        bbox.width + 2.0 * pad,
        bbox.height + 2.0 * pad,
    )
}

/// Background rectangle painted behind a free-text annotation, in PDF points.
/// Its height is always the estimated one.
pub fn annotation_box(annotation: &TextAnnotation, geometry: &PageGeometry, config: &ComposeConfig) -> Rect {
    let canonical_width = annotation.width.unwrap_or(config.default_annotation_width);
    let width = canonical_width * geometry.width();
    let height = estimate_box_height(&annotation.runs(), width, annotation.style.font_size, config);
    let top = geometry
        .to_points(&Rect::new(annotation.x, annotation.y, canonical_width, 0.0))
        .y;
    let left = geometry.media_box[0].min(geometry.media_box[2]) + annotation.x * geometry.width();
    Rect::new(left, top - height, width, height)
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn op(operator: &str, operands: Vec<Object>) -> Operation {
    Operation::new(operator, operands)
}

/// Baseline inside a band of height `band` starting at `bottom`
fn baseline_in(bottom: f64, band: f64, font_size: f64) -> f64 {
    bottom + ((band - font_size) / 2.0).max(0.0) + font_size * 0.2
}

struct PageCanvas<'a> {
    geometry: PageGeometry,
    config: &'a ComposeConfig,
    ops: Vec<Operation>,
    fonts: BTreeSet<FontVariant>,
    xobjects: Vec<(String, ObjectId)>,
}

impl<'a> PageCanvas<'a> {
    fn new(geometry: PageGeometry, config: &'a ComposeConfig) -> Self {
        Self {
            geometry,
            config,
            ops: Vec::new(),
            fonts: BTreeSet::new(),
            xobjects: Vec::new(),
        }
    }

    fn fill_white(&mut self, rect: &Rect) {
        self.ops.extend([
            op("q", vec![]),
            op("rg", vec![real(1.0), real(1.0), real(1.0)]),
            op(
                "re",
                vec![real(rect.x), real(rect.y), real(rect.width), real(rect.height)],
            ),
            op("f", vec![]),
            op("Q", vec![]),
        ]);
    }

    fn draw_patch(&mut self, patch: &TextPatch) {
        let cover = patch_cover_rect(patch, &self.geometry, self.config);
        self.fill_white(&cover);

        // A patch replaces a single detected line
        let runs: Vec<Run> = patch
            .runs()
            .into_iter()
            .map(|r| {
                let flags = r.flags();
                Run::new(r.text.replace('\n', " "), flags)
            })
            .collect();

        let bbox = self.geometry.to_points(&patch.bbox);
        let size = patch.style.font_size;
        let width = measure_runs(&runs, patch.style.font_family, size);
        let x = bbox.x + align_offset(patch.style.text_align, width, bbox.width);
        let baseline = baseline_in(bbox.y, bbox.height, size);
        self.draw_line(&runs, &patch.style, x, baseline);
    }

    fn draw_annotation(&mut self, annotation: &TextAnnotation) {
        let background = annotation_box(annotation, &self.geometry, self.config);
        self.fill_white(&background);

        let style = &annotation.style;
        let size = style.font_size;
        let line_height = size * self.config.line_height_factor;
        let available = available_width(background.width, self.config);
        let left = background.x + self.config.horizontal_padding;
        let top = background.y + background.height - self.config.vertical_padding / 2.0;

        let lines = wrap_lines(&annotation.runs(), available, size, self.config);
        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let line_bottom = top - line_height * (i + 1) as f64;
            let width = measure_runs(line, style.font_family, size);
            let x = left + align_offset(style.text_align, width, available);
            self.draw_line(line, style, x, baseline_in(line_bottom, line_height, size));
        }
    }

    /// Draw runs left to right from `x`, then stroke their decorations
    fn draw_line(&mut self, runs: &[Run], style: &TextStyle, x: f64, baseline: f64) {
        let size = style.font_size;
        let (r, g, b) = style.rgb();
        let color = || vec![Object::Real(r), Object::Real(g), Object::Real(b)];

        let mut decorations = Vec::new();
        let mut cursor = x;
        self.ops.push(op("BT", vec![]));
        self.ops.push(op("rg", color()));
        for run in runs.iter().filter(|r| !r.text.is_empty()) {
            let variant = run.font_variant(style.font_family);
            self.fonts.insert(variant);
            let width = variant.text_width(&run.text, size);
            self.ops.extend([
                op(
                    "Tf",
                    vec![Object::Name(variant.resource_name().into_bytes()), real(size)],
                ),
                op(
                    "Tm",
                    vec![real(1.0), real(0.0), real(0.0), real(1.0), real(cursor), real(baseline)],
                ),
                op(
                    "Tj",
                    vec![Object::String(encode_win_ansi(&run.text), StringFormat::Literal)],
                ),
            ]);
            if run.underline {
                decorations.push((cursor, width, baseline - size * 0.1));
            }
            if run.strike {
                decorations.push((cursor, width, baseline + size * 0.3));
            }
            cursor += width;
        }
        self.ops.push(op("ET", vec![]));

        if decorations.is_empty() {
            return;
        }
        self.ops.push(op("q", vec![]));
        self.ops.push(op("RG", color()));
        self.ops.push(op(
            "w",
            vec![real(size * self.config.decoration_thickness_factor)],
        ));
        for (start, width, y) in decorations {
            self.ops.extend([
                op("m", vec![real(start), real(y)]),
                op("l", vec![real(start + width), real(y)]),
                op("S", vec![]),
            ]);
        }
        self.ops.push(op("Q", vec![]));
    }

    fn draw_image(&mut self, image: &ImageAnnotation, xobject_id: ObjectId) {
        let name = format!("PEImg{}_{}", xobject_id.0, xobject_id.1);
        let rect = self.geometry.to_points(&image.rect());
        self.ops.extend([
            op("q", vec![]),
            op(
                "cm",
                vec![
                    real(rect.width),
                    real(0.0),
                    real(0.0),
                    real(rect.height),
                    real(rect.x),
                    real(rect.y),
                ],
            ),
            op("Do", vec![Object::Name(name.clone().into_bytes())]),
            op("Q", vec![]),
        ]);
        self.xobjects.push((name, xobject_id));
    }
}
