//! Bounding-box overlays on the rendered preview.

use image::{imageops::FilterType, DynamicImage, Rgba, RgbaImage};
use serde::Serialize;

use crate::category::{category_style, CategoryStyle};
use crate::detect::DetectedObject;
use crate::geometry::{to_overlay_rect, CaptureDimensions, OverlayRect};
use crate::present::filter::FilterState;

const BORDER_PX: u32 = 2;
const BADGE_PX: u32 = 8;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundingBoxOverlay {
    pub original_index: usize,
    pub label: String,
    pub parent: String,
    pub rect: OverlayRect,
    #[serde(skip)]
    pub style: &'static CategoryStyle,
}

impl BoundingBoxOverlay {
    pub fn new(original_index: usize, object: &DetectedObject, scaling_factor: Option<f64>) -> Self {
        Self {
            original_index,
            label: object.name.clone(),
            parent: object.parent.clone(),
            rect: to_overlay_rect(&object.bounding_box, scaling_factor),
            style: category_style(&object.parent),
        }
    }
}

/// Overlays that pass the filter, in service order.
pub fn visible_overlays(
    objects: &[DetectedObject],
    filter: &FilterState,
    scaling_factor: Option<f64>,
) -> Vec<BoundingBoxOverlay> {
    objects
        .iter()
        .enumerate()
        .filter(|(index, object)| filter.passes(*index, &object.parent))
        .map(|(index, object)| BoundingBoxOverlay::new(index, object, scaling_factor))
        .collect()
}

/// Resize `source` to the preview size and draw the overlays on it.
pub fn render_preview(
    source: &DynamicImage,
    dimensions: &CaptureDimensions,
    overlays: &[BoundingBoxOverlay],
) -> RgbaImage {
    let preview = dimensions.preview_dimension;
    let mut canvas = if preview.is_empty()
        || (source.width(), source.height()) == (preview.width, preview.height)
    {
        source.to_rgba8()
    } else {
        source
            .resize_exact(preview.width, preview.height, FilterType::Triangle)
            .to_rgba8()
    };
    draw_overlays(&mut canvas, overlays);
    canvas
}

pub fn draw_overlays(canvas: &mut RgbaImage, overlays: &[BoundingBoxOverlay]) {
    for overlay in overlays {
        let [r, g, b] = overlay.style.rgb;
        let color = Rgba([r, g, b, 255]);
        let Some(bbox) = clip_rect(&overlay.rect, canvas.dimensions()) else {
            log::debug!("overlay #{} lies outside the preview", overlay.original_index);
            continue;
        };
        draw_rect(canvas, bbox, color, BORDER_PX);
        let [x0, y0, x1, y1] = bbox;
        fill_rect(
            canvas,
            [x0, y0, (x0 + BADGE_PX).min(x1), (y0 + BADGE_PX).min(y1)],
            color,
        );
    }
}

/// Clip a preview rectangle to integer pixel corners inside the canvas.
fn clip_rect(rect: &OverlayRect, (w, h): (u32, u32)) -> Option<[u32; 4]> {
    if w == 0 || h == 0 || rect.width <= 0.0 || rect.height <= 0.0 {
        return None;
    }
    let max_x = f64::from(w - 1);
    let max_y = f64::from(h - 1);
    let x0 = rect.left.max(0.0);
    let y0 = rect.top.max(0.0);
    let x1 = (rect.left + rect.width).min(max_x);
    let y1 = (rect.top + rect.height).min(max_y);
    if x0 > max_x || y0 > max_y || x1 < x0 || y1 < y0 {
        return None;
    }
    Some([x0 as u32, y0 as u32, x1 as u32, y1 as u32])
}

fn draw_rect(img: &mut RgbaImage, [x0, y0, x1, y1]: [u32; 4], color: Rgba<u8>, thickness: u32) {
    for t in 0..thickness {
        let (xx0, yy0) = (x0.saturating_add(t), y0.saturating_add(t));
        let (xx1, yy1) = (x1.saturating_sub(t), y1.saturating_sub(t));
        if xx0 > xx1 || yy0 > yy1 {
            break;
        }
        for x in xx0..=xx1 {
            img.put_pixel(x, yy0, color);
            img.put_pixel(x, yy1, color);
        }
        for y in yy0..=yy1 {
            img.put_pixel(xx0, y, color);
            img.put_pixel(xx1, y, color);
        }
    }
}

fn fill_rect(img: &mut RgbaImage, [x0, y0, x1, y1]: [u32; 4], color: Rgba<u8>) {
    for y in y0..=y1 {
        for x in x0..=x1 {
            img.put_pixel(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, Dimension};

    fn object(parent: &str, bbox: [f64; 4]) -> DetectedObject {
        let [left, top, right, bottom] = bbox;
        DetectedObject {
            name: parent.to_string(),
            parent: parent.to_string(),
            confidence: 0.5,
            bounding_box: BoundingBox {
                top,
                left,
                right,
                bottom,
            },
        }
    }

    fn objects() -> Vec<DetectedObject> {
        vec![
            object("human", [400.0, 100.0, 800.0, 300.0]),
            object("animal", [0.0, 0.0, 40.0, 40.0]),
            object("human", [100.0, 100.0, 200.0, 200.0]),
        ]
    }

    #[test]
    fn overlays_scale_with_capture_factor() {
        let overlays = visible_overlays(&objects(), &FilterState::default(), Some(0.25));
        assert_eq!(overlays.len(), 3);
        assert_eq!(
            overlays[0].rect,
            OverlayRect {
                top: 25.0,
                left: 100.0,
                width: 100.0,
                height: 50.0,
            }
        );
        assert_eq!(overlays[0].style.colors.border, "border-pink-400");
    }

    #[test]
    fn filters_combine_with_and_semantics() {
        let by_category = FilterState::default().select_category("human");
        let shown: Vec<usize> = visible_overlays(&objects(), &by_category, None)
            .iter()
            .map(|o| o.original_index)
            .collect();
        assert_eq!(shown, vec![0, 2]);

        let both = by_category.select_object(2);
        let shown: Vec<usize> = visible_overlays(&objects(), &both, None)
            .iter()
            .map(|o| o.original_index)
            .collect();
        assert_eq!(shown, vec![2]);

        let only_object = FilterState::default().select_object(1);
        assert_eq!(visible_overlays(&objects(), &only_object, None).len(), 1);
    }

    #[test]
    fn render_preview_draws_border_in_category_colour() {
        let source = DynamicImage::new_rgb8(1200, 800);
        let dims = CaptureDimensions::new(Dimension::new(1200, 800), Dimension::new(300, 200));
        let overlays = visible_overlays(&objects()[..1], &FilterState::default(), Some(dims.scaling_factor()));
        let canvas = render_preview(&source, &dims, &overlays);
        assert_eq!(canvas.dimensions(), (300, 200));

        let pink = Rgba([244, 114, 182, 255]);
        assert_eq!(canvas.get_pixel(150, 25), &pink);
        assert_eq!(canvas.get_pixel(200, 75), &pink);
        assert_eq!(canvas.get_pixel(150, 50), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn boxes_outside_canvas_are_skipped() {
        let mut canvas = RgbaImage::new(10, 10);
        let overlays = visible_overlays(&[object("food", [50.0, 50.0, 60.0, 60.0])], &FilterState::default(), None);
        draw_overlays(&mut canvas, &overlays);
        assert!(canvas.pixels().all(|p| p == &Rgba([0, 0, 0, 0])));
    }
}
