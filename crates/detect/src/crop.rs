use image::DynamicImage;

use shelflife_core::BoundingBox;

/// Pixels of breathing room added around a detection before OCR. Date
/// stamps often sit just outside the tight box.
pub const DEFAULT_PADDING: u32 = 10;

/// Cut a padded region out of `img`, clamping to the image bounds.
///
/// Never fails: a box that falls entirely outside the image yields an
/// empty image, and downstream stages treat that like any other crop with
/// no readable text in it.
pub fn crop_region(img: &DynamicImage, bbox: BoundingBox, padding: u32) -> DynamicImage {
    let x1 = bbox.x1.saturating_sub(padding);
    let y1 = bbox.y1.saturating_sub(padding);
    let x2 = bbox.x2.saturating_add(padding).min(img.width());
    let y2 = bbox.y2.saturating_add(padding).min(img.height());

    if x2 <= x1 || y2 <= y1 {
        return DynamicImage::new_rgb8(0, 0);
    }
    img.crop_imm(x1, y1, x2 - x1, y2 - y1)
}
