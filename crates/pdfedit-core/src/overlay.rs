//! Display-space overlay list for the editing surface

use crate::config::ComposeConfig;
use crate::coords::{to_canonical, to_display, Rect, Rotation};
use crate::layout::estimate_box_height;
use crate::model::{on_page, AnnotationSet, EntityId, PageRotations, TextAnnotation};
use crate::page::PageGeometry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    Patch,
    Text,
    Image,
}

/// One positioned box, normalized to the displayed (rotated) page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayItem {
    pub kind: OverlayKind,
    pub id: EntityId,
    pub rect: Rect,
}

/// Rotation the page is shown at: its own /Rotate plus the user's delta
pub fn display_rotation(geometry: &PageGeometry, rotations: &PageRotations, page: u32) -> Rotation {
    Rotation::from_degrees(geometry.rotate + rotations.degrees(page))
}

/// Canonical box of a free-text annotation, filling in width and height
pub fn annotation_rect(annotation: &TextAnnotation, geometry: &PageGeometry, config: &ComposeConfig) -> Rect {
    let width = annotation.width.unwrap_or(config.default_annotation_width);
    let height = annotation.height.unwrap_or_else(|| {
        let points = estimate_box_height(
            &annotation.runs(),
            width * geometry.width(),
            annotation.style.font_size,
            config,
        );
        points / geometry.height().max(f64::EPSILON)
    });
    Rect::new(annotation.x, annotation.y, width, height)
}

/// Overlay items for `page`: patches first, then text, then images on top
pub fn project_page(
    set: &AnnotationSet,
    rotations: &PageRotations,
    page: u32,
    geometry: &PageGeometry,
    config: &ComposeConfig,
) -> Vec<OverlayItem> {
    let rotation = display_rotation(geometry, rotations, page);

    let patches = on_page(set.patches(), page).map(|p| OverlayItem {
        kind: OverlayKind::Patch,
        id: p.id,
        rect: to_display(p.bbox, rotation),
    });
    let texts = on_page(set.annotations(), page).map(|a| OverlayItem {
        kind: OverlayKind::Text,
        id: a.id,
        rect: to_display(annotation_rect(a, geometry, config), rotation),
    });
    let images = on_page(set.images(), page).map(|i| OverlayItem {
        kind: OverlayKind::Image,
        id: i.id,
        rect: to_display(i.rect(), rotation),
    });

    patches.chain(texts).chain(images).collect()
}

/// A rect the user dragged or resized on screen, converted for storage
pub fn display_to_canonical(
    display_rect: Rect,
    geometry: &PageGeometry,
    rotations: &PageRotations,
    page: u32,
) -> Rect {
    to_canonical(display_rect, display_rotation(geometry, rotations, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageAnnotation, TextPatch, TextStyle};
    use proptest::prelude::*;

    fn letter() -> PageGeometry {
        PageGeometry {
            media_box: [0.0, 0.0, 612.0, 792.0],
            rotate: 0,
        }
    }

    fn populated() -> AnnotationSet {
        let mut set = AnnotationSet::new();
        set.add_image(ImageAnnotation::new(1, Rect::new(0.5, 0.5, 0.2, 0.1), vec![0u8]));
        set.add_annotation(TextAnnotation {
            text: "note".into(),
            ..TextAnnotation::placed(1, 0.1, 0.1, TextStyle::default())
        });
        set.add_patch(TextPatch::detected(1, Rect::new(0.2, 0.2, 0.3, 0.02), "old", TextStyle::default()));
        set.add_annotation(TextAnnotation::placed(2, 0.1, 0.1, TextStyle::default()));
        set
    }

    #[test]
    fn test_order_is_patch_text_image() {
        let items = project_page(&populated(), &PageRotations::new(), 1, &letter(), &ComposeConfig::default());
        let kinds: Vec<OverlayKind> = items.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![OverlayKind::Patch, OverlayKind::Text, OverlayKind::Image]);
    }

    #[test]
    fn test_missing_height_is_estimated() {
        let config = ComposeConfig::default();
        let items = project_page(&populated(), &PageRotations::new(), 2, &letter(), &config);
        assert_eq!(items.len(), 1);
        let expected = (12.0 * config.line_height_factor + config.vertical_padding) / 792.0;
        assert!((items[0].rect.height - expected).abs() < 1e-9);
        assert!((items[0].rect.width - config.default_annotation_width).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_delta_applies() {
        let mut rotations = PageRotations::new();
        rotations.rotate(1, 90);
        let items = project_page(&populated(), &rotations, 1, &letter(), &ComposeConfig::default());
        let image = items.iter().find(|i| i.kind == OverlayKind::Image).unwrap();
        assert!(image.rect.approx_eq(&Rect::new(0.4, 0.5, 0.1, 0.2), 1e-9));
    }

    #[test]
    fn test_source_rotation_stacks_with_delta() {
        let geometry = PageGeometry { rotate: 270, ..letter() };
        let mut rotations = PageRotations::new();
        rotations.rotate(1, 90);
        assert_eq!(display_rotation(&geometry, &rotations, 1), Rotation::Deg0);
    }

    #[test]
    fn test_drag_round_trip_through_storage() {
        let mut rotations = PageRotations::new();
        rotations.rotate(1, 90);
        let observed = Rect::new(0.3, 0.6, 0.2, 0.1);
        let stored = display_to_canonical(observed, &letter(), &rotations, 1);
        let shown = to_display(stored, display_rotation(&letter(), &rotations, 1));
        assert!(shown.approx_eq(&observed, 1e-9));
    }

    proptest! {
        /// Property: an empty page projects to nothing at any rotation
        #[test]
        fn empty_page_projects_nothing(page in 1u32..20, delta in prop::sample::select(vec![0i64, 90, 180, 270, -90, 450])) {
            let mut rotations = PageRotations::new();
            rotations.rotate(page, delta);
            let items = project_page(&AnnotationSet::new(), &rotations, page, &letter(), &ComposeConfig::default());
            prop_assert!(items.is_empty());
        }
    }
}
