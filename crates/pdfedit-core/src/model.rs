//! Annotation model for a single document
//!
//! Every positional field is normalized to `[0, 1]` relative to the unrotated
//! page (canonical space). Entities live in an [`AnnotationSet`], one per
//! document, which hands out ids and keeps insertion order.

use crate::coords::{normalize_degrees, Rect, Rotation};
use crate::error::{PdfEditError, Result};
use crate::fonts::{FontFamily, FontVariant};
use crate::runs::{concat_text, resolve_runs, Run, RunFlags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type EntityId = u64;

/// Text a freshly placed annotation starts with
pub const PLACEHOLDER_TEXT: &str = "Type here";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    /// Size in points (one CSS px is treated as one point)
    pub font_size: f64,
    /// Hex color, `#RRGGBB` or `#RGB`
    pub color: String,
    pub font_family: FontFamily,
    pub text_align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            strike: false,
            font_size: 12.0,
            color: "#000000".to_string(),
            font_family: FontFamily::Sans,
            text_align: TextAlign::Left,
        }
    }
}

impl TextStyle {
    pub fn base_flags(&self) -> RunFlags {
        RunFlags {
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            strike: self.strike,
        }
    }

    pub fn font_variant(&self) -> FontVariant {
        FontVariant::resolve(self.font_family, self.bold, self.italic)
    }

    pub fn rgb(&self) -> (f32, f32, f32) {
        parse_hex_color(&self.color)
    }
}

/// Parse a hex color string ("#FF0000", "FF0000" or "#F00") to RGB floats in `0..=1`.
/// Anything unparseable is black.
pub fn parse_hex_color(color: &str) -> (f32, f32, f32) {
    let hex = color.trim().trim_start_matches('#');
    let channel = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0) as f32 / 255.0;
    match hex.len() {
        3 if hex.is_ascii() => {
            let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
            (expand(0), expand(1), expand(2))
        }
        n if n >= 6 && hex.is_ascii() => (channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6])),
        _ => (0.0, 0.0, 0.0),
    }
}

/// Anything that sits on exactly one page of a document
pub trait OnPage {
    fn id(&self) -> EntityId;
    /// 1-based page number
    fn page(&self) -> u32;
}

/// Freestanding text box layered on top of a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub id: EntityId,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    /// Falls back to `ComposeConfig::default_annotation_width`
    #[serde(default)]
    pub width: Option<f64>,
    /// Derived from the estimated layout when absent
    #[serde(default)]
    pub height: Option<f64>,
    pub text: String,
    #[serde(default)]
    pub markup: Option<String>,
    #[serde(default)]
    pub style: TextStyle,
}

impl TextAnnotation {
    /// New annotation at a canonical point, holding the placeholder text
    pub fn placed(page: u32, x: f64, y: f64, style: TextStyle) -> Self {
        Self {
            id: 0,
            page,
            x,
            y,
            width: None,
            height: None,
            text: PLACEHOLDER_TEXT.to_string(),
            markup: None,
            style,
        }
    }

    pub fn runs(&self) -> Vec<Run> {
        resolve_runs(self.markup.as_deref(), &self.text, self.style.base_flags())
    }

    /// Text that would actually be drawn
    pub fn effective_text(&self) -> String {
        concat_text(&self.runs())
    }

    /// Empty (whitespace only) or still showing the placeholder
    pub fn is_placeholder(&self) -> bool {
        let text = self.effective_text();
        let trimmed = text.trim();
        trimmed.is_empty() || trimmed == PLACEHOLDER_TEXT
    }
}

impl OnPage for TextAnnotation {
    fn id(&self) -> EntityId {
        self.id
    }
    fn page(&self) -> u32 {
        self.page
    }
}

/// Replacement of an existing glyph run, baked as whiteout plus redraw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPatch {
    pub id: EntityId,
    /// Owning document, assigned by whoever stores the patch
    #[serde(default)]
    pub doc_id: u64,
    pub page: u32,
    /// Detected glyph bbox; fixed once the patch exists
    pub bbox: Rect,
    pub original_text: String,
    pub new_text: String,
    #[serde(default)]
    pub markup: Option<String>,
    #[serde(default)]
    pub style: TextStyle,
}

impl TextPatch {
    pub fn detected(page: u32, bbox: Rect, original_text: impl Into<String>, style: TextStyle) -> Self {
        let original_text = original_text.into();
        Self {
            id: 0,
            doc_id: 0,
            page,
            bbox,
            new_text: original_text.clone(),
            original_text,
            markup: None,
            style,
        }
    }

    pub fn runs(&self) -> Vec<Run> {
        resolve_runs(self.markup.as_deref(), &self.new_text, self.style.base_flags())
    }

    /// The replacement reads the same as what was detected
    pub fn is_reverted(&self) -> bool {
        concat_text(&self.runs()) == self.original_text
    }
}

impl OnPage for TextPatch {
    fn id(&self) -> EntityId {
        self.id
    }
    fn page(&self) -> u32 {
        self.page
    }
}

/// Placed raster image (signature, stamp)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnnotation {
    pub id: EntityId,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Raw PNG or JPEG bytes, shared rather than copied
    #[serde(with = "payload_base64")]
    pub data: Arc<[u8]>,
}

impl ImageAnnotation {
    pub fn new(page: u32, rect: Rect, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id: 0,
            page,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            data: data.into(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Change the width keeping the current height/width ratio
    pub fn resize_to_width(&mut self, width: f64) {
        if self.width <= 0.0 || width <= 0.0 {
            return;
        }
        let ratio = self.height / self.width;
        self.width = width;
        self.height = width * ratio;
    }
}

impl OnPage for ImageAnnotation {
    fn id(&self) -> EntityId {
        self.id
    }
    fn page(&self) -> u32 {
        self.page
    }
}

mod payload_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S: Serializer>(data: &Arc<[u8]>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Arc<[u8]>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Arc::from)
            .map_err(serde::de::Error::custom)
    }
}

/// Page number -> additive rotation delta, always kept normalized to `0..360`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRotations(BTreeMap<u32, i64>);

impl PageRotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` degrees to the page's current delta
    pub fn rotate(&mut self, page: u32, delta: i64) {
        let next = normalize_degrees(self.degrees(page) + delta);
        if next == 0 {
            self.0.remove(&page);
        } else {
            self.0.insert(page, next);
        }
    }

    pub fn set(&mut self, page: u32, degrees: i64) {
        self.0.remove(&page);
        self.rotate(page, degrees);
    }

    pub fn degrees(&self, page: u32) -> i64 {
        self.0.get(&page).copied().unwrap_or(0)
    }

    pub fn get(&self, page: u32) -> Rotation {
        Rotation::from_degrees(self.degrees(page))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, i64)> + '_ {
        self.0.iter().map(|(p, d)| (*p, *d))
    }
}

impl FromIterator<(u32, i64)> for PageRotations {
    fn from_iter<T: IntoIterator<Item = (u32, i64)>>(iter: T) -> Self {
        let mut rotations = PageRotations::new();
        for (page, degrees) in iter {
            rotations.rotate(page, degrees);
        }
        rotations
    }
}

/// All edits attached to one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    next_id: EntityId,
    annotations: Vec<TextAnnotation>,
    patches: Vec<TextPatch>,
    images: Vec<ImageAnnotation>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_annotation(&mut self, mut annotation: TextAnnotation) -> EntityId {
        let id = self.allocate();
        annotation.id = id;
        self.annotations.push(annotation);
        id
    }

    pub fn add_patch(&mut self, mut patch: TextPatch) -> EntityId {
        let id = self.allocate();
        patch.id = id;
        self.patches.push(patch);
        id
    }

    pub fn add_image(&mut self, mut image: ImageAnnotation) -> EntityId {
        let id = self.allocate();
        image.id = id;
        self.images.push(image);
        id
    }

    /// Mutate an annotation in place. Returns false if no such id.
    pub fn update_annotation(&mut self, id: EntityId, f: impl FnOnce(&mut TextAnnotation)) -> bool {
        match self.annotations.iter_mut().find(|a| a.id == id) {
            Some(annotation) => {
                f(annotation);
                annotation.id = id;
                true
            }
            None => false,
        }
    }

    /// Mutate a patch in place; its page and bbox stay as detected
    pub fn update_patch(&mut self, id: EntityId, f: impl FnOnce(&mut TextPatch)) -> bool {
        match self.patches.iter_mut().find(|p| p.id == id) {
            Some(patch) => {
                let (page, bbox, doc_id) = (patch.page, patch.bbox, patch.doc_id);
                f(patch);
                patch.id = id;
                patch.page = page;
                patch.bbox = bbox;
                patch.doc_id = doc_id;
                true
            }
            None => false,
        }
    }

    pub fn update_image(&mut self, id: EntityId, f: impl FnOnce(&mut ImageAnnotation)) -> bool {
        match self.images.iter_mut().find(|i| i.id == id) {
            Some(image) => {
                f(image);
                image.id = id;
                true
            }
            None => false,
        }
    }

    pub fn remove_annotation(&mut self, id: EntityId) -> bool {
        remove_by_id(&mut self.annotations, id)
    }

    pub fn remove_patch(&mut self, id: EntityId) -> bool {
        remove_by_id(&mut self.patches, id)
    }

    pub fn remove_image(&mut self, id: EntityId) -> bool {
        remove_by_id(&mut self.images, id)
    }

    pub fn annotations(&self) -> &[TextAnnotation] {
        &self.annotations
    }

    pub fn patches(&self) -> &[TextPatch] {
        &self.patches
    }

    pub fn images(&self) -> &[ImageAnnotation] {
        &self.images
    }

    pub fn annotation(&self, id: EntityId) -> Option<&TextAnnotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn patch(&self, id: EntityId) -> Option<&TextPatch> {
        self.patches.iter().find(|p| p.id == id)
    }

    pub fn image(&self, id: EntityId) -> Option<&ImageAnnotation> {
        self.images.iter().find(|i| i.id == id)
    }

    /// Stamp every patch with its owning document
    pub fn assign_doc_id(&mut self, doc_id: u64) {
        for patch in &mut self.patches {
            patch.doc_id = doc_id;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty() && self.patches.is_empty() && self.images.is_empty()
    }

    pub fn len(&self) -> usize {
        self.annotations.len() + self.patches.len() + self.images.len()
    }

    /// Drop annotations left empty or at the placeholder, and patches whose
    /// text went back to the original. Returns how many entities were removed.
    pub fn prune_after_edit(&mut self) -> usize {
        let before = self.annotations.len() + self.patches.len();
        self.annotations.retain(|a| !a.is_placeholder());
        self.patches.retain(|p| !p.is_reverted());
        before - (self.annotations.len() + self.patches.len())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PdfEditError::SerializationError(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PdfEditError::SerializationError(e.to_string()))
    }
}

/// Items of `items` on `page`, in insertion order
pub fn on_page<T: OnPage>(items: &[T], page: u32) -> impl Iterator<Item = &T> {
    items.iter().filter(move |item| item.page() == page)
}

fn remove_by_id<T: OnPage>(items: &mut Vec<T>, id: EntityId) -> bool {
    match items.iter().position(|item| item.id() == id) {
        Some(pos) => {
            items.remove(pos);
            true
        }
        None => false,
    }
}
